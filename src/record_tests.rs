// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `record.rs`

use std::collections::BTreeMap;

use super::*;

fn rdata(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn test_canonical_name_strips_zone_suffix() {
    assert_eq!(canonical_name("www.example.com", "example.com"), "www");
    assert_eq!(
        canonical_name("a.b.example.com", "example.com"),
        "a.b"
    );
}

#[test]
fn test_canonical_name_apex_becomes_at() {
    assert_eq!(canonical_name("example.com", "example.com"), "@");
}

#[test]
fn test_canonical_name_unrelated_name_unchanged() {
    assert_eq!(canonical_name("www.other.net", "example.com"), "www.other.net");
    // A name merely containing the zone is not a suffix match
    assert_eq!(
        canonical_name("example.com.evil.net", "example.com"),
        "example.com.evil.net"
    );
}

#[test]
fn test_canonical_rdata_sorts_keys() {
    let record = DnsRecord::new(
        "mail",
        "MX",
        3600,
        rdata(&[("preference", "10"), ("exchange", "mx1.example.com")]),
    );
    assert_eq!(
        record.canonical_rdata(),
        r#"{"exchange":"mx1.example.com","preference":"10"}"#
    );
}

#[test]
fn test_record_key_ignores_ttl() {
    let a = DnsRecord::new("www", "A", 300, rdata(&[("ipAddress", "1.2.3.4")]));
    let b = DnsRecord::new("www", "A", 7200, rdata(&[("ipAddress", "1.2.3.4")]));
    assert_eq!(a.key("example.com"), b.key("example.com"));
}

#[test]
fn test_record_key_differs_on_rdata() {
    let a = DnsRecord::new("www", "A", 300, rdata(&[("ipAddress", "1.2.3.4")]));
    let b = DnsRecord::new("www", "A", 300, rdata(&[("ipAddress", "9.9.9.9")]));
    assert_ne!(a.key("example.com"), b.key("example.com"));
}

#[test]
fn test_record_key_matches_across_qualified_and_relative_names() {
    let remote = DnsRecord::new(
        "www.example.com",
        "A",
        300,
        rdata(&[("ipAddress", "1.2.3.4")]),
    );
    let local = DnsRecord::new("www", "A", 300, rdata(&[("ipAddress", "1.2.3.4")]));
    assert_eq!(remote.key("example.com"), local.key("example.com"));
}

#[test]
fn test_records_equal_suppresses_ttl_drift_below_threshold() {
    let a = DnsRecord::new("x", "A", 300, rdata(&[("ipAddress", "1.2.3.4")]));
    let b = DnsRecord::new("x", "A", 150, rdata(&[("ipAddress", "1.2.3.4")]));
    assert!(records_equal(&a, &b, "example.com"));
    // Exactly at the threshold is a real change
    let c = DnsRecord::new("x", "A", 600, rdata(&[("ipAddress", "1.2.3.4")]));
    assert!(!records_equal(&a, &c, "example.com"));
}

#[test]
fn test_records_equal_requires_matching_key() {
    let a = DnsRecord::new("x", "A", 300, rdata(&[("ipAddress", "1.2.3.4")]));
    let b = DnsRecord::new("x", "A", 300, rdata(&[("ipAddress", "5.6.7.8")]));
    assert!(!records_equal(&a, &b, "example.com"));
}

#[test]
fn test_is_excluded_type() {
    for excluded in ["SOA", "NS", "RRSIG", "DNSKEY", "AXFR"] {
        assert!(is_excluded_type(excluded), "{excluded} should be excluded");
    }
    for included in ["A", "AAAA", "CNAME", "MX", "TXT", "PTR"] {
        assert!(!is_excluded_type(included), "{included} should sync");
    }
}

#[test]
fn test_is_reverse_zone() {
    assert!(is_reverse_zone("0.0.10.in-addr.arpa"));
    assert!(is_reverse_zone("8.b.d.0.1.0.0.2.ip6.arpa"));
    assert!(!is_reverse_zone("example.com"));
}

#[test]
fn test_is_internal_zone() {
    assert!(is_internal_zone("127.in-addr.arpa"));
    assert!(is_internal_zone("0.in-addr.arpa"));
    assert!(is_internal_zone("255.in-addr.arpa"));
    assert!(is_internal_zone("localhost"));
    assert!(is_internal_zone(
        "1.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.ip6.arpa"
    ));
    assert!(!is_internal_zone("0.0.10.in-addr.arpa"));
    assert!(!is_internal_zone("example.com"));
}

#[test]
fn test_reverse_zone_for_network_class_c() {
    assert_eq!(
        reverse_zone_for_network("10.0.0.0", "255.255.255.0"),
        Some("0.0.10.in-addr.arpa".to_string())
    );
}

#[test]
fn test_reverse_zone_for_network_normalizes_host_bits() {
    // A scope reported with host bits set still derives the network's zone
    assert_eq!(
        reverse_zone_for_network("192.168.1.57", "255.255.255.0"),
        Some("1.168.192.in-addr.arpa".to_string())
    );
}

#[test]
fn test_reverse_zone_for_network_invalid_input() {
    assert_eq!(reverse_zone_for_network("not-an-ip", "255.255.255.0"), None);
    assert_eq!(reverse_zone_for_network("10.0.0.0", "bogus"), None);
    // Non-contiguous masks are rejected
    assert_eq!(reverse_zone_for_network("10.0.0.0", "255.0.255.0"), None);
}

#[test]
fn test_deserialize_coerces_scalar_rdata() {
    let record: DnsRecord = serde_json::from_str(
        r#"{
            "name": "mail.example.com",
            "type": "MX",
            "ttl": 3600,
            "rData": {"preference": 10, "exchange": "mx1.example.com"}
        }"#,
    )
    .expect("record should deserialize");
    assert_eq!(record.rdata["preference"], "10");
    assert_eq!(record.rdata["exchange"], "mx1.example.com");
}

#[test]
fn test_deserialize_rejects_nested_rdata() {
    let result: Result<DnsRecord, _> = serde_json::from_str(
        r#"{"name": "x", "type": "A", "ttl": 300, "rData": {"ipAddress": ["1.2.3.4"]}}"#,
    );
    assert!(result.is_err());
}
