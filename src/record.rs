// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS record value object and cross-server identity.
//!
//! Records are matched across servers (and across local and remote views of
//! one server) by a [`RecordKey`]: canonical zone-relative name, record type,
//! and the sorted-JSON serialization of the rdata map. TTL is deliberately
//! not part of the key; a pure TTL change is an update, not a replace, and
//! TTL drift below [`TTL_THRESHOLD_SECS`] is suppressed entirely.
//!
//! This module also classifies zones (reverse, internal) and derives reverse
//! zones from DHCP scope networks.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::{
    EXCLUDED_RECORD_TYPES, INTERNAL_ZONES, IPV6_ALL_ZEROS_REVERSE_SUFFIX, TTL_THRESHOLD_SECS,
};

/// A single DNS resource record as exchanged with the fleet and the mirror.
///
/// `rdata` keys are fixed by `record_type` (the upstream wire mapping);
/// values are kept as strings so canonical JSON is stable regardless of how
/// the upstream formats numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Record name, either zone-relative, `@`, or fully qualified
    pub name: String,

    /// Record type code (e.g. "A", "CNAME", "MX")
    #[serde(rename = "type")]
    pub record_type: String,

    /// Time-to-live in seconds
    pub ttl: u32,

    /// Type-specific record data
    #[serde(rename = "rData", deserialize_with = "coerce_string_map")]
    pub rdata: BTreeMap<String, String>,
}

impl DnsRecord {
    /// Construct a record from its parts.
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
        rdata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            ttl,
            rdata,
        }
    }

    /// The canonical JSON serialization of this record's rdata: keys sorted
    /// lexicographically (`BTreeMap` ordering), no whitespace.
    #[must_use]
    pub fn canonical_rdata(&self) -> String {
        // BTreeMap<String, String> serialization cannot fail
        serde_json::to_string(&self.rdata).unwrap_or_default()
    }

    /// The identity used for cross-server matching, relative to `zone`.
    #[must_use]
    pub fn key(&self, zone: &str) -> RecordKey {
        RecordKey {
            name: canonical_name(&self.name, zone),
            record_type: self.record_type.clone(),
            rdata: self.canonical_rdata(),
        }
    }
}

/// The canonical `(name, type, sorted-json rdata)` identity of a record
/// within a zone.
///
/// Matching by this key (not by name and type alone) means a TXT or MX with
/// changed rdata is treated as delete + add, which is the semantics the
/// upstream API expects for multi-valued types.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Zone-relative record name (`@` for the apex)
    pub name: String,
    /// Record type code
    pub record_type: String,
    /// Canonical JSON of the rdata map
    pub rdata: String,
}

/// Normalize a record name relative to its zone: a trailing `.<zone>` suffix
/// is stripped, and a name equal to the zone itself becomes `@`.
#[must_use]
pub fn canonical_name(name: &str, zone: &str) -> String {
    if name == zone {
        return "@".to_string();
    }
    name.strip_suffix(&format!(".{zone}"))
        .unwrap_or(name)
        .to_string()
}

/// Whether two records are the same for reconciliation purposes: identical
/// keys and a TTL delta below the suppression threshold.
///
/// TTL below threshold does not trigger an update push; upstreams that
/// report a counted-down TTL would otherwise cause churn every tick.
#[must_use]
pub fn records_equal(a: &DnsRecord, b: &DnsRecord, zone: &str) -> bool {
    a.key(zone) == b.key(zone) && a.ttl.abs_diff(b.ttl) < TTL_THRESHOLD_SECS
}

/// Whether `record_type` is excluded from reconciliation. Excluded types
/// are never mirrored, tombstoned, or propagated.
#[must_use]
pub fn is_excluded_type(record_type: &str) -> bool {
    EXCLUDED_RECORD_TYPES.contains(&record_type)
}

/// Whether `zone` is a reverse (`in-addr.arpa` / `ip6.arpa`) zone.
#[must_use]
pub fn is_reverse_zone(zone: &str) -> bool {
    zone.ends_with(".in-addr.arpa") || zone.ends_with(".ip6.arpa")
}

/// Whether `zone` is a reverse zone for loopback, broadcast, or all-zeros
/// space. Internal zones are never synced regardless of configuration.
#[must_use]
pub fn is_internal_zone(zone: &str) -> bool {
    INTERNAL_ZONES.contains(&zone) || zone.ends_with(IPV6_ALL_ZEROS_REVERSE_SUFFIX)
}

/// Derive the reverse zone for an IPv4 DHCP scope.
///
/// Parses `network_address`/`subnet_mask`, normalizes to the network
/// address, and returns its reverse pointer with the host octet label
/// dropped (`10.0.0.0`/`255.255.255.0` becomes `0.0.10.in-addr.arpa`).
///
/// Returns `None` when the address or mask does not parse; the caller skips
/// that scope.
#[must_use]
pub fn reverse_zone_for_network(network_address: &str, subnet_mask: &str) -> Option<String> {
    let address: Ipv4Addr = network_address.parse().ok()?;
    let mask: Ipv4Addr = subnet_mask.parse().ok()?;
    let network = Ipv4Network::with_netmask(address, mask).ok()?;
    let [a, b, c, _] = network.network().octets();
    Some(format!("{c}.{b}.{a}.in-addr.arpa"))
}

/// Deserialize an rdata map, coercing scalar JSON values to their string
/// form. The upstream reports some fields (MX preference, SOA serial) as
/// numbers; the model keeps a string map so canonical JSON is stable.
fn coerce_string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "unsupported rdata value for '{key}': {other}"
                    )))
                }
            };
            Ok((key, text))
        })
        .collect()
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
