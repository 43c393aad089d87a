// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The reconciliation engine.
//!
//! Each tick runs two phases over the whole fleet:
//!
//! 1. **Ingest**: pull each server's truth into the mirror, detecting
//!    adds, updates, and deletions (tombstones). All ingest completes
//!    before any propagation begins; propagation reads a mirror that must
//!    reflect this tick's observations.
//! 2. **Propagate**: push the mirror's authoritative view back out,
//!    per zone: the owner's view when the zone has an ownership row, the
//!    union of all servers' views otherwise.
//!
//! Upstream call failures are logged and skipped at the unit of work that
//! issued them; mirror failures abort the tick and the scheduler's back-off
//! retries from scratch.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, error, info};

use crate::client::DnsApi;
use crate::config::Config;
use crate::errors::MirrorError;
use crate::mirror::Mirror;
use crate::record::{
    is_excluded_type, is_internal_zone, is_reverse_zone, records_equal, DnsRecord, RecordKey,
};
use crate::sync::changes::{ChangeKind, ChangeTracker};

pub mod changes;
mod propagate;
mod reverse;

/// The two-phase diff-and-propagate engine. One instance per daemon; the
/// mirror has a single writer and it is this.
pub struct SyncEngine {
    config: Arc<Config>,
    mirror: Mirror,
    clients: HashMap<String, Arc<dyn DnsApi>>,
    changes: ChangeTracker,
}

impl SyncEngine {
    /// Build an engine over the configured fleet.
    ///
    /// `clients` maps server names to their API clients; every configured
    /// server must have one.
    pub fn new(
        config: Arc<Config>,
        mirror: Mirror,
        clients: HashMap<String, Arc<dyn DnsApi>>,
    ) -> Self {
        Self {
            config,
            mirror,
            clients,
            changes: ChangeTracker::default(),
        }
    }

    /// Run one full reconciliation tick: ingest every server, propagate
    /// every zone, then log and reset the change summary.
    ///
    /// # Errors
    ///
    /// Returns an error only on a mirror failure; upstream failures are
    /// logged and skipped.
    pub async fn sync(&mut self) -> Result<()> {
        let server_names: Vec<String> = self
            .config
            .servers
            .iter()
            .map(|server| server.name.clone())
            .collect();

        for server in &server_names {
            info!("Syncing records for server: {server}");
            self.sync_server(server).await?;
        }

        self.propagate_changes().await?;

        self.changes.log_summary(&server_names);
        self.changes.clear();
        Ok(())
    }

    /// Ingest one server: list its zones, ingest each zone passing the
    /// filter, then derive reverse zones from its DHCP scopes when enabled.
    ///
    /// An upstream fetch failure aborts this server's ingest only;
    /// propagation proceeds with whatever is in the mirror. Mirror
    /// failures propagate and abort the tick.
    async fn sync_server(&mut self, server: &str) -> Result<(), MirrorError> {
        let Some(client) = self.clients.get(server).map(Arc::clone) else {
            error!("No client configured for server {server}");
            return Ok(());
        };

        let zones = match client.get_zones().await {
            Ok(zones) => zones,
            Err(error) => {
                error!("Error syncing server {server}: {error}");
                return Ok(());
            }
        };
        debug!(server, zone_count = zones.len(), "fetched zone list");

        for zone in zones {
            if self.should_sync_zone(&zone.name) {
                self.sync_zone(server, &zone.name).await?;
            }
        }

        if self.config.sync_reverse_zones {
            self.sync_dhcp_scopes(server).await?;
        }
        Ok(())
    }

    /// Whether a zone from a server's zone list should be ingested.
    ///
    /// Internal zones never sync. An empty allow-list admits everything
    /// else; otherwise the zone must be allow-listed, or be a reverse zone
    /// while reverse syncing is enabled.
    fn should_sync_zone(&self, zone: &str) -> bool {
        if is_internal_zone(zone) {
            return false;
        }
        if self.config.zones_to_sync.is_empty() {
            return true;
        }
        self.config.zone_allowed(zone) || (self.config.sync_reverse_zones && is_reverse_zone(zone))
    }

    /// Phase 1 for one (server, zone): diff the server's records against the
    /// mirror, upserting observations and tombstoning vanished records.
    ///
    /// Upstream failures abort this zone's ingest only; the next tick
    /// retries. Mirror failures propagate.
    pub(crate) async fn sync_zone(&mut self, server: &str, zone: &str) -> Result<(), MirrorError> {
        info!("Syncing zone {zone} for server {server}");
        let client = match self.clients.get(server) {
            Some(client) => Arc::clone(client),
            None => {
                error!("No client configured for server {server}");
                return Ok(());
            }
        };

        let remote = match client.get_records(zone).await {
            Ok(records) => records,
            Err(error) => {
                error!("Error syncing zone {zone} for server {server}: {error}");
                return Ok(());
            }
        };
        let local = self.mirror.get_records(server, zone)?;
        let tombstones = self.mirror.get_deleted_records(server, zone)?;
        debug!(
            server,
            zone,
            remote = remote.len(),
            local = local.len(),
            tombstones = tombstones.len(),
            "ingest sets fetched"
        );

        let remote_by_key = keyed(remote, zone);
        let local_by_key = keyed(local, zone);
        let tombstones_by_key = keyed(tombstones, zone);

        for (key, remote_record) in &remote_by_key {
            if tombstones_by_key.contains_key(key) {
                // The record was tombstoned locally but has reappeared
                // upstream: the mirror's deletion wins, revert the remote.
                debug!(server, zone, name = %remote_record.name, "deleting re-appeared tombstoned record");
                match client.delete_record(zone, remote_record).await {
                    Ok(()) => self.changes.track(server, zone, ChangeKind::Delete),
                    Err(error) => {
                        error!("Error syncing zone {zone} for server {server}: {error}");
                        return Ok(());
                    }
                }
            } else if !local_by_key.contains_key(key) {
                // New upstream record: a pure observation, not a pushed change.
                debug!(server, zone, name = %remote_record.name, "recording new remote record");
                self.mirror.add_or_update_record(server, zone, remote_record)?;
            } else if !records_equal(remote_record, &local_by_key[key], zone) {
                debug!(server, zone, name = %remote_record.name, "refreshing changed remote record");
                self.mirror.add_or_update_record(server, zone, remote_record)?;
            }
        }

        for (key, local_record) in &local_by_key {
            if !remote_by_key.contains_key(key) && !tombstones_by_key.contains_key(key) {
                // Vanished upstream: tombstone so phase 2 deletes it fleet-wide.
                debug!(server, zone, name = %local_record.name, "tombstoning vanished record");
                self.mirror.mark_record_as_deleted(server, zone, local_record)?;
                self.changes.track(server, zone, ChangeKind::Delete);
            }
        }

        self.mirror.update_zone_sync(zone, server)?;
        Ok(())
    }
}

/// Index records by their zone-relative key, dropping excluded types.
/// Deterministic (sorted) iteration order.
fn keyed(records: Vec<DnsRecord>, zone: &str) -> BTreeMap<RecordKey, DnsRecord> {
    records
        .into_iter()
        .filter(|record| !is_excluded_type(&record.record_type))
        .map(|record| (record.key(zone), record))
        .collect()
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
