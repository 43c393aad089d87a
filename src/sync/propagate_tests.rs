// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for the shared-mode union. Full propagation behavior is
//! covered by `tests/sync_scenarios.rs`.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::Level;

use crate::config::{Config, Server};
use crate::mirror::Mirror;
use crate::record::DnsRecord;
use crate::sync::SyncEngine;

fn test_server(name: &str) -> Server {
    Server {
        name: name.to_string(),
        url: format!("https://{name}.example.net:5380"),
        api_key: "secret".to_string(),
        verify_ssl: false,
    }
}

fn engine() -> SyncEngine {
    let config = Arc::new(Config {
        servers: vec![test_server("ns1"), test_server("ns2")],
        sync_interval: Duration::from_secs(300),
        db_path: PathBuf::from(":memory:"),
        log_level: Level::INFO,
        zones_to_sync: Vec::new(),
        sync_reverse_zones: false,
    });
    let mirror = Mirror::open_in_memory().expect("open mirror");
    SyncEngine::new(config, mirror, HashMap::new())
}

fn a_record(name: &str, ttl: u32, ip: &str) -> DnsRecord {
    let mut rdata = BTreeMap::new();
    rdata.insert("ipAddress".to_string(), ip.to_string());
    DnsRecord::new(name, "A", ttl, rdata)
}

#[test]
fn test_union_merges_distinct_records() {
    let engine = engine();
    engine
        .mirror
        .add_or_update_record("ns1", "example.com", &a_record("a", 300, "1.1.1.1"))
        .expect("upsert");
    engine
        .mirror
        .add_or_update_record("ns2", "example.com", &a_record("b", 300, "2.2.2.2"))
        .expect("upsert");

    let union = engine.union_for_zone("example.com").expect("union");
    let mut names: Vec<_> = union.iter().map(|record| record.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_union_first_occurrence_wins_per_key() {
    let engine = engine();
    // Same key on both servers, differing TTL: configured server order
    // decides which instance represents the key
    engine
        .mirror
        .add_or_update_record("ns1", "example.com", &a_record("a", 300, "1.1.1.1"))
        .expect("upsert");
    engine
        .mirror
        .add_or_update_record("ns2", "example.com", &a_record("a", 900, "1.1.1.1"))
        .expect("upsert");

    let union = engine.union_for_zone("example.com").expect("union");
    assert_eq!(union.len(), 1);
    assert_eq!(union[0].ttl, 300);
}

#[test]
fn test_union_excludes_keys_tombstoned_anywhere() {
    let engine = engine();
    let record = a_record("www", 300, "1.2.3.4");
    // ns1 deleted the record; ns2's view still carries it
    engine
        .mirror
        .mark_record_as_deleted("ns1", "example.com", &record)
        .expect("tombstone");
    engine
        .mirror
        .add_or_update_record("ns2", "example.com", &record)
        .expect("upsert");

    let union = engine.union_for_zone("example.com").expect("union");
    assert!(union.is_empty());
}

#[test]
fn test_union_excludes_excluded_types() {
    let engine = engine();
    engine
        .mirror
        .add_or_update_record(
            "ns1",
            "example.com",
            &DnsRecord::new("example.com", "SOA", 3600, BTreeMap::new()),
        )
        .expect("upsert");
    engine
        .mirror
        .add_or_update_record("ns1", "example.com", &a_record("a", 300, "1.1.1.1"))
        .expect("upsert");

    let union = engine.union_for_zone("example.com").expect("union");
    assert_eq!(union.len(), 1);
    assert_eq!(union[0].record_type, "A");
}
