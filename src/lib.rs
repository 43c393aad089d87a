// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # TechniSync - Multi-Master Reconciliation for Technitium DNS Fleets
//!
//! TechniSync keeps a fleet of authoritative Technitium DNS servers
//! converged on a single view per zone. Operators may edit records on any
//! server; TechniSync polls every server at a configured cadence, folds
//! per-server changes into a durable local mirror, and propagates each
//! zone's authoritative state back out to the rest of the fleet.
//!
//! ## Overview
//!
//! The core is the two-phase reconciliation engine built on the mirror:
//!
//! 1. **Ingest** - pull each server's truth into the mirror, detecting
//!    adds, updates, and deletions (soft-delete tombstones)
//! 2. **Propagate** - push each zone's authoritative view to every server:
//!    the designated owner's view for owned zones, the union of all views
//!    for shared zones
//!
//! Reverse (`in-addr.arpa`) zones are derived from DHCP scopes and their
//! ownership is pinned to the scope-hosting server.
//!
//! ## Modules
//!
//! - [`config`] - YAML + environment configuration, loaded once at startup
//! - [`record`] - record value object, cross-server identity, zone helpers
//! - [`mirror`] - durable SQLite mirror store with tombstones and ownership
//! - [`client`] - the Technitium HTTP API client and the [`client::DnsApi`] seam
//! - [`sync`] - the reconciliation engine
//! - [`logging`] - console + file logging with API-token redaction

pub mod client;
pub mod config;
pub mod constants;
pub mod errors;
pub mod logging;
pub mod mirror;
pub mod record;
pub mod sync;
