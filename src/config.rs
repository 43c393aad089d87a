// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Daemon configuration.
//!
//! Configuration is loaded once at startup from an optional YAML file and
//! overridden by environment variables, then passed into the engine as an
//! immutable value. Recognized options:
//!
//! | Option | Environment | Effect |
//! |---|---|---|
//! | `servers[]` | `SERVER<i>_URL` / `SERVER<i>_API_KEY` | Managed fleet; at least one required |
//! | `sync_interval` | `SYNC_INTERVAL` | Tick period in seconds, default 300 |
//! | `db_path` | `DB_PATH` | Mirror store path, default `./data/dns_sync.db` |
//! | `log_level` | `LOG_LEVEL` | Severity name, default `INFO` |
//! | `zones_to_sync` | `ZONES_TO_SYNC` | Forward-zone allow-list; empty means all |
//! | `sync_reverse_zones` | `SYNC_REVERSE_ZONES` | Enable DHCP-derived reverse zones, default off |
//!
//! `SERVER<i>_*` variables are scanned for `i = 1, 2, …` until the first
//! gap; each pair adds or overrides `server<i>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::Level;

use crate::constants::{DEFAULT_DB_PATH, DEFAULT_LOG_LEVEL, DEFAULT_SYNC_INTERVAL_SECS};
use crate::errors::ConfigError;

/// One managed DNS server.
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    /// Server name used in logs, the mirror, and ownership rows
    pub name: String,
    /// Base URL of the management API (e.g. `https://dns1.example.net:5380`)
    pub url: String,
    /// API token appended to every request
    pub api_key: String,
    /// Verify the server's TLS certificate. Off by default for
    /// compatibility with self-signed deployments.
    #[serde(default)]
    pub verify_ssl: bool,
}

/// The raw YAML file shape. Every field is optional; defaults and
/// environment overrides are applied in [`Config::from_sources`].
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    servers: Vec<Server>,
    sync_interval: Option<u64>,
    db_path: Option<PathBuf>,
    log_level: Option<String>,
    #[serde(default)]
    zones_to_sync: Vec<String>,
    sync_reverse_zones: Option<bool>,
}

/// Immutable daemon configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// The managed fleet; never empty
    pub servers: Vec<Server>,
    /// Tick period
    pub sync_interval: Duration,
    /// Mirror store path
    pub db_path: PathBuf,
    /// Log severity
    pub log_level: Level,
    /// Forward-zone allow-list; empty means all non-internal zones
    pub zones_to_sync: Vec<String>,
    /// Derive reverse zones from DHCP scopes and ingest them
    pub sync_reverse_zones: bool,
}

impl Config {
    /// Load configuration from `path` (ignored when absent) and the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed,
    /// when no servers end up configured, or when an option value is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
                path: path.display().to_string(),
                source,
            })?
        } else {
            ConfigFile::default()
        };

        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(file, &env)
    }

    /// Merge the file shape with environment overrides and validate.
    fn from_sources(file: ConfigFile, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let servers = merge_servers(file.servers, env);
        if servers.is_empty() {
            return Err(ConfigError::NoServers);
        }

        let sync_interval = match env.get("SYNC_INTERVAL") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                option: "SYNC_INTERVAL".to_string(),
                value: raw.clone(),
            })?,
            None => file.sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
        };

        let db_path = env
            .get("DB_PATH")
            .map(PathBuf::from)
            .or(file.db_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        let level_name = env
            .get("LOG_LEVEL")
            .cloned()
            .or(file.log_level)
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_level = parse_log_level(&level_name)?;

        let zones_to_sync = match env.get("ZONES_TO_SYNC") {
            Some(raw) => split_zone_list(raw),
            None => file
                .zones_to_sync
                .into_iter()
                .map(|zone| zone.trim().to_string())
                .filter(|zone| !zone.is_empty())
                .collect(),
        };

        let sync_reverse_zones = match env.get("SYNC_REVERSE_ZONES") {
            Some(raw) => raw.trim().eq_ignore_ascii_case("true"),
            None => file.sync_reverse_zones.unwrap_or(false),
        };

        Ok(Self {
            servers,
            sync_interval: Duration::from_secs(sync_interval),
            db_path,
            log_level,
            zones_to_sync,
            sync_reverse_zones,
        })
    }

    /// Whether `zone` passes the forward-zone allow-list. An empty list
    /// admits every zone.
    #[must_use]
    pub fn zone_allowed(&self, zone: &str) -> bool {
        self.zones_to_sync.is_empty() || self.zones_to_sync.iter().any(|allowed| allowed == zone)
    }
}

/// Apply `SERVER<i>_URL` / `SERVER<i>_API_KEY` pairs on top of the file's
/// server list, scanning from 1 until the first index with either variable
/// missing. A pair whose name matches an existing server overrides it.
fn merge_servers(mut servers: Vec<Server>, env: &HashMap<String, String>) -> Vec<Server> {
    for index in 1.. {
        let url = env.get(&format!("SERVER{index}_URL"));
        let api_key = env.get(&format!("SERVER{index}_API_KEY"));
        let (Some(url), Some(api_key)) = (url, api_key) else {
            break;
        };

        let name = format!("server{index}");
        if let Some(existing) = servers.iter_mut().find(|server| server.name == name) {
            existing.url = url.clone();
            existing.api_key = api_key.clone();
        } else {
            servers.push(Server {
                name,
                url: url.clone(),
                api_key: api_key.clone(),
                verify_ssl: false,
            });
        }
    }
    servers
}

/// Parse a standard severity name, accepting the common aliases the
/// original deployment used (`WARNING`, `CRITICAL`).
fn parse_log_level(name: &str) -> Result<Level, ConfigError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "TRACE" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel {
            level: name.to_string(),
        }),
    }
}

fn split_zone_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|zone| !zone.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
