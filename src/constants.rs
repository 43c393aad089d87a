// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the TechniSync daemon.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// Record Policy Constants
// ============================================================================

/// Record types that are never mirrored, tombstoned, or propagated.
///
/// SOA and NS are owned by each server's own zone provisioning; the DNSSEC
/// and transaction/transfer pseudo-types must never be replicated between
/// servers that sign or transfer independently.
pub const EXCLUDED_RECORD_TYPES: &[&str] = &[
    "SOA", "NS", "RRSIG", "NSEC", "NSEC3", "DNSKEY", "DS", "CDS", "CDNSKEY", "TSIG", "TKEY",
    "AXFR", "IXFR",
];

/// TTL delta (seconds) below which two otherwise-identical records are
/// considered equal. Suppresses churn from upstreams that report a counted
/// down TTL.
pub const TTL_THRESHOLD_SECS: u32 = 300;

// ============================================================================
// Zone Classification Constants
// ============================================================================

/// Reverse zones for loopback, broadcast, and all-zeros space. These are
/// local to every server and never synced regardless of configuration.
pub const INTERNAL_ZONES: &[&str] = &[
    "0.in-addr.arpa",
    "127.in-addr.arpa",
    "255.in-addr.arpa",
    "localhost",
];

/// Suffix of the IPv6 all-zeros reverse zone (`::/128` reverse pointer minus
/// its leading label). Zones ending in this are internal.
pub const IPV6_ALL_ZEROS_REVERSE_SUFFIX: &str =
    ".0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.0.ip6.arpa";

// ============================================================================
// Scheduler Constants
// ============================================================================

/// Default tick period when no `sync_interval` is configured (5 minutes)
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// Sleep after a failed tick, replacing the normal interval for that cycle
pub const FAILURE_BACKOFF_SECS: u64 = 60;

// ============================================================================
// Upstream API Constants
// ============================================================================

/// Per-request timeout for calls to the Technitium HTTP API. The tick is
/// serial, so a hung server would otherwise stall the whole loop.
pub const API_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Zone type passed to `zones/create`
pub const ZONE_TYPE_PRIMARY: &str = "Primary";

// ============================================================================
// Storage & Logging Constants
// ============================================================================

/// Default mirror store path when no `db_path` is configured
pub const DEFAULT_DB_PATH: &str = "./data/dns_sync.db";

/// Fixed log file receiving formatted output alongside the console
pub const LOG_FILE_NAME: &str = "technisync.log";

/// Default log level when no `log_level` is configured
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
