// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Durable local mirror of every managed server's view.
//!
//! The mirror is a single-writer SQLite database holding per-(server, zone)
//! record state, soft-delete tombstones, per-zone ownership, and
//! per-(server, zone) last-sync timestamps. One [`Mirror`] instance owns the
//! connection for the lifetime of the process; all writes commit
//! immediately.
//!
//! Schema evolution: at startup the `dns_records` table is inspected via
//! `PRAGMA table_info`. If the required column set is a subset of the live
//! columns the table is kept; otherwise it is dropped and recreated. The
//! ownership and zone-sync tables are created if absent and never
//! destructively migrated.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::errors::MirrorError;
use crate::record::DnsRecord;

/// Columns the current `dns_records` layout requires. An existing table
/// missing any of these is dropped and recreated.
const RECORDS_REQUIRED_COLUMNS: &[&str] = &[
    "id",
    "server",
    "zone",
    "name",
    "type",
    "ttl",
    "rdata",
    "created_at",
    "updated_at",
    "last_operation",
];

const CREATE_RECORDS_SQL: &str = "
    CREATE TABLE dns_records (
        id              INTEGER PRIMARY KEY,
        server          TEXT NOT NULL,
        zone            TEXT NOT NULL,
        name            TEXT NOT NULL,
        type            TEXT NOT NULL,
        ttl             INTEGER NOT NULL,
        rdata           TEXT NOT NULL,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL,
        last_operation  TEXT NOT NULL,
        UNIQUE(server, zone, name, type)
    );
";

const CREATE_OWNERSHIP_SQL: &str = "
    CREATE TABLE IF NOT EXISTS zone_ownership (
        id          INTEGER PRIMARY KEY,
        zone        TEXT NOT NULL UNIQUE,
        owner       TEXT NOT NULL,
        created_at  TEXT NOT NULL
    );
";

const CREATE_ZONE_SYNC_SQL: &str = "
    CREATE TABLE IF NOT EXISTS zone_sync (
        id           INTEGER PRIMARY KEY,
        zone         TEXT NOT NULL,
        server       TEXT NOT NULL,
        last_synced  TEXT NOT NULL,
        UNIQUE(zone, server)
    );
";

/// The durable mirror store. Single writer; one instance per database.
pub struct Mirror {
    conn: Connection,
}

impl Mirror {
    /// Open (creating if necessary) the mirror database at `path` and bring
    /// the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MirrorError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an in-memory mirror. Used by tests; semantics are identical to
    /// the on-disk store apart from durability.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, MirrorError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, MirrorError> {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")?;
        let mirror = Self { conn };
        mirror.migrate_records_table()?;
        mirror.conn.execute_batch(CREATE_OWNERSHIP_SQL)?;
        mirror.conn.execute_batch(CREATE_ZONE_SYNC_SQL)?;
        Ok(mirror)
    }

    /// Inspect the live `dns_records` columns and keep the table only when
    /// every required column is present. Older layouts are dropped.
    fn migrate_records_table(&self) -> Result<(), MirrorError> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(dns_records)")?;
        let live: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        let required_present = RECORDS_REQUIRED_COLUMNS
            .iter()
            .all(|column| live.contains(*column));
        if required_present {
            debug!("dns_records table layout is current");
            return Ok(());
        }

        if !live.is_empty() {
            warn!("dns_records table has an incompatible layout, dropping and recreating");
        }
        self.conn.execute_batch("DROP TABLE IF EXISTS dns_records;")?;
        self.conn.execute_batch(CREATE_RECORDS_SQL)?;
        Ok(())
    }

    /// All non-tombstoned records mirrored for `(server, zone)`.
    ///
    /// # Errors
    ///
    /// Returns an error on a query failure or when a stored rdata column is
    /// not valid JSON.
    pub fn get_records(&self, server: &str, zone: &str) -> Result<Vec<DnsRecord>, MirrorError> {
        self.query_records(
            server,
            zone,
            "SELECT name, type, ttl, rdata FROM dns_records
             WHERE server = ?1 AND zone = ?2 AND last_operation != 'DELETE'",
        )
    }

    /// Tombstone rows for `(server, zone)`: records previously mirrored and
    /// since removed upstream, retained so propagation can issue matching
    /// deletes elsewhere.
    ///
    /// # Errors
    ///
    /// Returns an error on a query failure or when a stored rdata column is
    /// not valid JSON.
    pub fn get_deleted_records(
        &self,
        server: &str,
        zone: &str,
    ) -> Result<Vec<DnsRecord>, MirrorError> {
        self.query_records(
            server,
            zone,
            "SELECT name, type, ttl, rdata FROM dns_records
             WHERE server = ?1 AND zone = ?2 AND last_operation = 'DELETE'",
        )
    }

    fn query_records(
        &self,
        server: &str,
        zone: &str,
        sql: &str,
    ) -> Result<Vec<DnsRecord>, MirrorError> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![server, zone], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, record_type, ttl, rdata_json) = row?;
            let rdata: BTreeMap<String, String> = serde_json::from_str(&rdata_json)
                .map_err(|source| MirrorError::CorruptRdata {
                    server: server.to_string(),
                    zone: zone.to_string(),
                    name: name.clone(),
                    record_type: record_type.clone(),
                    source,
                })?;
            records.push(DnsRecord::new(name, record_type, ttl, rdata));
        }
        Ok(records)
    }

    /// Tombstone rows for `zone` across every server. Propagation uses
    /// these to keep a deletion anywhere from being resurrected by another
    /// server's not-yet-ingested view.
    ///
    /// # Errors
    ///
    /// Returns an error on a query failure or when a stored rdata column is
    /// not valid JSON.
    pub fn get_all_deleted_records(&self, zone: &str) -> Result<Vec<DnsRecord>, MirrorError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT name, type, ttl, rdata, server FROM dns_records
             WHERE zone = ?1 AND last_operation = 'DELETE'",
        )?;
        let rows = stmt.query_map(params![zone], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (name, record_type, ttl, rdata_json, server) = row?;
            let rdata: BTreeMap<String, String> = serde_json::from_str(&rdata_json)
                .map_err(|source| MirrorError::CorruptRdata {
                    server,
                    zone: zone.to_string(),
                    name: name.clone(),
                    record_type: record_type.clone(),
                    source,
                })?;
            records.push(DnsRecord::new(name, record_type, ttl, rdata));
        }
        Ok(records)
    }

    /// Upsert a record by its `(server, zone, name, type)` identity with
    /// `last_operation = ADD`. An existing row keeps its `created_at`.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn add_or_update_record(
        &self,
        server: &str,
        zone: &str,
        record: &DnsRecord,
    ) -> Result<(), MirrorError> {
        self.upsert_record(server, zone, record, "ADD")
    }

    /// Upsert a record by identity with `last_operation = DELETE`, creating
    /// or refreshing its tombstone.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn mark_record_as_deleted(
        &self,
        server: &str,
        zone: &str,
        record: &DnsRecord,
    ) -> Result<(), MirrorError> {
        self.upsert_record(server, zone, record, "DELETE")
    }

    fn upsert_record(
        &self,
        server: &str,
        zone: &str,
        record: &DnsRecord,
        operation: &str,
    ) -> Result<(), MirrorError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO dns_records
                 (server, zone, name, type, ttl, rdata, created_at, updated_at, last_operation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)
             ON CONFLICT(server, zone, name, type) DO UPDATE SET
                 ttl = excluded.ttl,
                 rdata = excluded.rdata,
                 updated_at = excluded.updated_at,
                 last_operation = excluded.last_operation",
        )?;
        stmt.execute(params![
            server,
            zone,
            record.name,
            record.record_type,
            record.ttl,
            record.canonical_rdata(),
            now,
            operation,
        ])?;
        Ok(())
    }

    /// The owning server for `zone`, when the zone is in authoritative mode.
    ///
    /// # Errors
    ///
    /// Returns an error on a query failure.
    pub fn get_zone_owner(&self, zone: &str) -> Result<Option<String>, MirrorError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT owner FROM zone_ownership WHERE zone = ?1")?;
        Ok(stmt
            .query_row(params![zone], |row| row.get(0))
            .optional()?)
    }

    /// Record `owner` as the authoritative server for `zone`. Upserts, so a
    /// later derivation for the same zone wins; ownership is never cleared.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn set_zone_owner(&self, zone: &str, owner: &str) -> Result<(), MirrorError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO zone_ownership (zone, owner, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(zone) DO UPDATE SET owner = excluded.owner",
        )?;
        stmt.execute(params![zone, owner, now])?;
        Ok(())
    }

    /// Every distinct zone observed in any mirror row, tombstoned or not.
    ///
    /// # Errors
    ///
    /// Returns an error on a query failure.
    pub fn get_all_zones(&self) -> Result<Vec<String>, MirrorError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT DISTINCT zone FROM dns_records")?;
        let zones = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<_, _>>()?;
        Ok(zones)
    }

    /// Advance the last successful ingest timestamp for `(zone, server)`.
    ///
    /// # Errors
    ///
    /// Returns an error when the write fails.
    pub fn update_zone_sync(&self, zone: &str, server: &str) -> Result<(), MirrorError> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO zone_sync (zone, server, last_synced)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(zone, server) DO UPDATE SET last_synced = excluded.last_synced",
        )?;
        stmt.execute(params![zone, server, now])?;
        Ok(())
    }

    /// The last successful ingest timestamp for `(zone, server)`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error on a query failure.
    pub fn get_zone_sync(
        &self,
        zone: &str,
        server: &str,
    ) -> Result<Option<DateTime<Utc>>, MirrorError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT last_synced FROM zone_sync WHERE zone = ?1 AND server = ?2")?;
        let raw: Option<String> = stmt
            .query_row(params![zone, server], |row| row.get(0))
            .optional()?;
        Ok(raw
            .and_then(|text| DateTime::parse_from_rfc3339(&text).ok())
            .map(|parsed| parsed.with_timezone(&Utc)))
    }
}

#[cfg(test)]
#[path = "mirror_tests.rs"]
mod mirror_tests;
