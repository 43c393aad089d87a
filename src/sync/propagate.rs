// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Phase 2: push the mirror's authoritative view back out to the fleet.
//!
//! For each zone ever observed, a target record set is chosen by ownership:
//! the owner's mirror view when an ownership row exists (authoritative
//! mode), or the key-deduplicated union of every server's mirror view
//! (shared mode). Each server is then diffed against the target and
//! converged with deletes issued before adds, so identity collisions (same
//! name and type, different rdata) never double-populate a zone.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};

use crate::errors::MirrorError;
use crate::record::{is_excluded_type, is_internal_zone, is_reverse_zone, records_equal, DnsRecord};
use crate::sync::changes::ChangeKind;
use crate::sync::{keyed, SyncEngine};

impl SyncEngine {
    /// Propagate every observed zone to every server it belongs on.
    ///
    /// # Errors
    ///
    /// Returns an error only on a mirror failure; upstream failures are
    /// logged and the propagation continues with the next unit of work.
    pub(crate) async fn propagate_changes(&mut self) -> Result<(), MirrorError> {
        info!("Propagating changes across all servers");
        let server_names: Vec<String> = self
            .config
            .servers
            .iter()
            .map(|server| server.name.clone())
            .collect();

        for zone in self.mirror.get_all_zones()? {
            if is_internal_zone(&zone) {
                continue;
            }

            match self.mirror.get_zone_owner(&zone)? {
                Some(owner) => {
                    // Authoritative mode: the owner's view overwrites every
                    // other server's copy of the zone.
                    let target = self.mirror.get_records(&owner, &zone)?;
                    for server in &server_names {
                        if *server == owner {
                            continue;
                        }
                        if is_reverse_zone(&zone) {
                            self.ensure_reverse_zone_exists(server, &zone).await;
                        }
                        self.update_server_records(server, &zone, &target).await?;
                    }
                }
                None => {
                    // Shared mode: the union of all views, first occurrence
                    // (in configured server order) wins per key.
                    let target = self.union_for_zone(&zone)?;
                    for server in &server_names {
                        if is_reverse_zone(&zone) {
                            self.ensure_reverse_zone_exists(server, &zone).await;
                        }
                        self.update_server_records(server, &zone, &target).await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Converge one server's copy of `zone` onto `target`.
    ///
    /// Anything present upstream but absent from the target (or matching a
    /// tombstone) is deleted; anything in the target but absent upstream is
    /// added; a key match with a drifted TTL or rdata is updated in place,
    /// passing the upstream's rdata as the old value. Each call is
    /// independently caught so one failure does not abort the zone.
    pub(crate) async fn update_server_records(
        &mut self,
        server: &str,
        zone: &str,
        target: &[DnsRecord],
    ) -> Result<(), MirrorError> {
        info!("Updating records for server {server} in zone {zone}");
        let Some(client) = self.clients.get(server).map(Arc::clone) else {
            error!("No client configured for server {server}");
            return Ok(());
        };

        let current = match client.get_records(zone).await {
            Ok(records) => records,
            Err(error) => {
                error!("Failed to get records for server {server} in zone {zone}: {error}");
                return Ok(());
            }
        };
        let tombstones = self.mirror.get_deleted_records(server, zone)?;

        let current_by_key = keyed(current, zone);
        let target_by_key = keyed(target.to_vec(), zone);
        let tombstones_by_key = keyed(tombstones, zone);

        // Deletes first.
        for (key, current_record) in &current_by_key {
            if !target_by_key.contains_key(key) || tombstones_by_key.contains_key(key) {
                match client.delete_record(zone, current_record).await {
                    Ok(()) => self.changes.track(server, zone, ChangeKind::Delete),
                    Err(error) => error!("Error deleting record from server {server}: {error}"),
                }
            }
        }

        for (key, record) in &target_by_key {
            if tombstones_by_key.contains_key(key) {
                continue;
            }
            match current_by_key.get(key) {
                None => match client.add_record(zone, record).await {
                    Ok(()) => self.changes.track(server, zone, ChangeKind::Add),
                    Err(error) => error!("Error adding record to server {server}: {error}"),
                },
                Some(current_record) if !records_equal(record, current_record, zone) => {
                    match client
                        .update_record(zone, record, &current_record.rdata)
                        .await
                    {
                        Ok(()) => self.changes.track(server, zone, ChangeKind::Update),
                        Err(error) => error!("Error updating record on server {server}: {error}"),
                    }
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// The shared-mode target for `zone`: every server's mirror view,
    /// deduplicated by record key with the first occurrence winning.
    ///
    /// A key tombstoned on any server is excluded: the deleting server's
    /// view must win over servers whose copy has not been ingested since,
    /// or the deletion would resurrect through the union on the next tick.
    fn union_for_zone(&self, zone: &str) -> Result<Vec<DnsRecord>, MirrorError> {
        let tombstoned: HashSet<_> = self
            .mirror
            .get_all_deleted_records(zone)?
            .iter()
            .map(|record| record.key(zone))
            .collect();

        let mut seen = HashSet::new();
        let mut union = Vec::new();
        for server in &self.config.servers {
            for record in self.mirror.get_records(&server.name, zone)? {
                if is_excluded_type(&record.record_type) {
                    continue;
                }
                let key = record.key(zone);
                if tombstoned.contains(&key) {
                    continue;
                }
                if seen.insert(key) {
                    union.push(record);
                }
            }
        }
        Ok(union)
    }

    /// Create `zone` on `server` when its zone list does not contain it.
    /// Failures are logged; the caller proceeds regardless.
    pub(crate) async fn ensure_reverse_zone_exists(&mut self, server: &str, zone: &str) {
        let Some(client) = self.clients.get(server).map(Arc::clone) else {
            error!("No client configured for server {server}");
            return;
        };

        match client.get_zones().await {
            Ok(zones) if zones.iter().any(|existing| existing.name == zone) => {}
            Ok(_) => {
                info!("Creating reverse zone {zone} on server {server}");
                match client.create_zone(zone).await {
                    Ok(()) => self.changes.track(server, zone, ChangeKind::Add),
                    Err(error) => error!(
                        "Error ensuring reverse zone {zone} exists on server {server}: {error}"
                    ),
                }
            }
            Err(error) => {
                error!("Error ensuring reverse zone {zone} exists on server {server}: {error}");
            }
        }
    }
}

#[cfg(test)]
#[path = "propagate_tests.rs"]
mod propagate_tests;
