// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-tick change accounting.
//!
//! Every write issued against a managed server is counted per
//! (server, zone). At end-of-tick the engine emits a human-readable summary
//! and clears the tracker. The counts are purely observability; nothing in
//! the engine branches on them.

use std::collections::BTreeMap;

use tracing::info;

/// The kind of upstream write being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A record (or zone) was created on a server
    Add,
    /// A record was updated in place on a server
    Update,
    /// A record was deleted from a server
    Delete,
}

/// Counters for one (server, zone).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChangeCounts {
    /// Records added
    pub added: u64,
    /// Records updated
    pub updated: u64,
    /// Records deleted
    pub deleted: u64,
}

/// Two-level `server -> zone -> counts` accumulator.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    changes: BTreeMap<String, BTreeMap<String, ChangeCounts>>,
}

impl ChangeTracker {
    /// Count one write of `kind` against `(server, zone)`.
    pub fn track(&mut self, server: &str, zone: &str, kind: ChangeKind) {
        let counts = self
            .changes
            .entry(server.to_string())
            .or_default()
            .entry(zone.to_string())
            .or_default();
        match kind {
            ChangeKind::Add => counts.added += 1,
            ChangeKind::Update => counts.updated += 1,
            ChangeKind::Delete => counts.deleted += 1,
        }
    }

    /// The accumulated counts for `(server, zone)`, if any write was counted.
    #[must_use]
    pub fn counts(&self, server: &str, zone: &str) -> Option<ChangeCounts> {
        self.changes.get(server)?.get(zone).copied()
    }

    /// Whether no write has been counted this tick.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Emit the end-of-tick summary. `servers` is the configured fleet, so
    /// servers with no changes are reported too.
    pub fn log_summary(&self, servers: &[String]) {
        info!("=== Sync Summary ===");
        for server in servers {
            match self.changes.get(server) {
                Some(zones) if !zones.is_empty() => {
                    info!("Changes for server {server}:");
                    for (zone, counts) in zones {
                        info!("  Zone {zone}:");
                        if counts.added > 0 {
                            info!("    Add: {}", counts.added);
                        }
                        if counts.updated > 0 {
                            info!("    Update: {}", counts.updated);
                        }
                        if counts.deleted > 0 {
                            info!("    Delete: {}", counts.deleted);
                        }
                    }
                }
                _ => info!("No changes for server {server}"),
            }
        }
        if self.is_empty() {
            info!("No changes were made during this sync.");
        }
        info!("=== End of Sync Summary ===");
    }

    /// Reset the tracker for the next tick.
    pub fn clear(&mut self) {
        self.changes.clear();
    }
}

#[cfg(test)]
#[path = "changes_tests.rs"]
mod changes_tests;
