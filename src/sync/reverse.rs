// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reverse zones derived from DHCP scopes.
//!
//! Reverse (`in-addr.arpa`) zones are not edited by operators; they follow
//! the DHCP scopes that allocate the addresses. After ingesting a server's
//! forward zones, the engine lists that server's scopes, derives the
//! reverse zone for each, makes sure the zone exists fleet-wide, and pins
//! the zone's ownership to the scope-hosting server so its view is the one
//! propagated.

use std::sync::Arc;

use tracing::{error, warn};

use crate::errors::MirrorError;
use crate::record::reverse_zone_for_network;
use crate::sync::SyncEngine;

impl SyncEngine {
    /// Derive, create, own, and ingest the reverse zone of every DHCP scope
    /// hosted on `server`.
    ///
    /// A scope whose network does not parse is skipped. A scope-listing
    /// failure aborts this server's scope pass only. Mirror failures
    /// propagate.
    pub(crate) async fn sync_dhcp_scopes(&mut self, server: &str) -> Result<(), MirrorError> {
        let Some(client) = self.clients.get(server).map(Arc::clone) else {
            error!("No client configured for server {server}");
            return Ok(());
        };

        let scopes = match client.get_dhcp_scopes().await {
            Ok(scopes) => scopes,
            Err(error) => {
                error!("Error syncing DHCP scopes for server {server}: {error}");
                return Ok(());
            }
        };

        for scope in scopes {
            let Some(reverse_zone) =
                reverse_zone_for_network(&scope.network_address, &scope.subnet_mask)
            else {
                warn!(
                    "Skipping DHCP scope '{}' on {server}: invalid network {}/{}",
                    scope.name, scope.network_address, scope.subnet_mask
                );
                continue;
            };

            let server_names: Vec<String> = self
                .config
                .servers
                .iter()
                .map(|entry| entry.name.clone())
                .collect();
            for target in &server_names {
                self.ensure_reverse_zone_exists(target, &reverse_zone).await;
            }

            // The scope host allocates these addresses, so its view of the
            // reverse zone is authoritative. Last derivation wins.
            self.mirror.set_zone_owner(&reverse_zone, server)?;
            self.sync_zone(server, &reverse_zone).await?;
        }
        Ok(())
    }
}
