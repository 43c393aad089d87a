// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the engine's zone filter and keyed-set construction.
//! End-to-end reconciliation behavior is covered by `tests/sync_scenarios.rs`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::Level;

use super::*;
use crate::config::Server;

fn test_server(name: &str) -> Server {
    Server {
        name: name.to_string(),
        url: format!("https://{name}.example.net:5380"),
        api_key: "secret".to_string(),
        verify_ssl: false,
    }
}

fn engine_with(zones_to_sync: Vec<String>, sync_reverse_zones: bool) -> SyncEngine {
    let config = Arc::new(Config {
        servers: vec![test_server("ns1"), test_server("ns2")],
        sync_interval: Duration::from_secs(300),
        db_path: PathBuf::from(":memory:"),
        log_level: Level::INFO,
        zones_to_sync,
        sync_reverse_zones,
    });
    let mirror = Mirror::open_in_memory().expect("open mirror");
    SyncEngine::new(config, mirror, HashMap::new())
}

fn a_record(name: &str, record_type: &str, ip: &str) -> DnsRecord {
    let mut rdata = BTreeMap::new();
    rdata.insert("ipAddress".to_string(), ip.to_string());
    DnsRecord::new(name, record_type, 300, rdata)
}

#[test]
fn test_should_sync_zone_rejects_internal_zones() {
    let engine = engine_with(Vec::new(), true);
    assert!(!engine.should_sync_zone("127.in-addr.arpa"));
    assert!(!engine.should_sync_zone("localhost"));
}

#[test]
fn test_should_sync_zone_empty_allowlist_admits_all() {
    let engine = engine_with(Vec::new(), false);
    assert!(engine.should_sync_zone("example.com"));
    assert!(engine.should_sync_zone("0.0.10.in-addr.arpa"));
}

#[test]
fn test_should_sync_zone_allowlist_filters() {
    let engine = engine_with(vec!["example.com".to_string()], false);
    assert!(engine.should_sync_zone("example.com"));
    assert!(!engine.should_sync_zone("other.com"));
    // Reverse zones are not admitted past the allow-list while reverse
    // syncing is disabled
    assert!(!engine.should_sync_zone("0.0.10.in-addr.arpa"));
}

#[test]
fn test_should_sync_zone_reverse_zones_bypass_allowlist_when_enabled() {
    let engine = engine_with(vec!["example.com".to_string()], true);
    assert!(engine.should_sync_zone("0.0.10.in-addr.arpa"));
    assert!(!engine.should_sync_zone("other.com"));
}

#[test]
fn test_keyed_drops_excluded_types() {
    let records = vec![
        a_record("www", "A", "1.2.3.4"),
        DnsRecord::new("example.com", "SOA", 3600, BTreeMap::new()),
        DnsRecord::new("example.com", "NS", 3600, BTreeMap::new()),
        DnsRecord::new("example.com", "RRSIG", 3600, BTreeMap::new()),
    ];

    let by_key = keyed(records, "example.com");
    assert_eq!(by_key.len(), 1);
    let (key, record) = by_key.iter().next().expect("one entry");
    assert_eq!(key.record_type, "A");
    assert_eq!(record.name, "www");
}

#[test]
fn test_keyed_uses_zone_relative_names() {
    let records = vec![a_record("www.example.com", "A", "1.2.3.4")];
    let by_key = keyed(records, "example.com");
    let key = by_key.keys().next().expect("one entry");
    assert_eq!(key.name, "www");
}
