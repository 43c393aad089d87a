// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for TechniSync.
//!
//! This module provides specialized error types for:
//! - Technitium HTTP API operations (zone and record management)
//! - The local mirror store
//! - Startup configuration validation
//!
//! Upstream API failures are call-level: the engine logs them with context
//! and continues with the next unit of work. Mirror failures abort the
//! current tick. Configuration failures are fatal at startup.

use thiserror::Error;

/// Errors that can occur when calling the Technitium HTTP API.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network-level failure: connection refused, DNS failure, timeout,
    /// or a non-2xx HTTP status surfaced by the transport.
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        /// The API endpoint path that was being called
        endpoint: String,
        /// The underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered 2xx but the response body was not valid JSON of
    /// the expected shape.
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        /// The API endpoint path that was being called
        endpoint: String,
        /// What failed to decode
        reason: String,
    },

    /// The API envelope carried a `status` other than `"ok"`.
    #[error("API error from {endpoint}: {message}")]
    Api {
        /// The API endpoint path that was being called
        endpoint: String,
        /// The server's `errorMessage`, or a placeholder when absent
        message: String,
    },

    /// The configured server URL could not be parsed.
    #[error("Invalid server URL '{url}': {source}")]
    InvalidUrl {
        /// The offending URL string
        url: String,
        /// The parse failure
        #[source]
        source: url::ParseError,
    },
}

impl ApiError {
    /// Returns true if this error is transient and the next tick may succeed.
    ///
    /// Everything except a bad server URL is transient: network errors,
    /// timeouts, non-2xx statuses, malformed bodies, and non-`ok` envelopes
    /// all recover by retrying on the next tick.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidUrl { .. })
    }
}

/// Errors from the local mirror store.
///
/// Any mirror failure aborts the current tick; the scheduler back-off
/// retries from scratch.
#[derive(Error, Debug)]
pub enum MirrorError {
    /// SQLite-level failure (I/O, constraint, schema)
    #[error("mirror database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored rdata column did not round-trip through JSON
    #[error("corrupt rdata for {server}/{zone} {name} {record_type}: {source}")]
    CorruptRdata {
        /// Server the row belongs to
        server: String,
        /// Zone the row belongs to
        zone: String,
        /// Record name
        name: String,
        /// Record type
        record_type: String,
        /// The JSON decode failure
        #[source]
        source: serde_json::Error,
    },
}

/// Errors detected while loading configuration. All are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Path that failed to read
        path: String,
        /// The I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The config file exists but is not valid YAML of the expected shape
    #[error("failed to parse config file '{path}': {source}")]
    Yaml {
        /// Path that failed to parse
        path: String,
        /// The YAML decode failure
        #[source]
        source: serde_yaml::Error,
    },

    /// No servers were configured via file or environment
    #[error("no servers configured: provide `servers` in the config file or SERVER1_URL/SERVER1_API_KEY")]
    NoServers,

    /// `log_level` is not a recognized severity name
    #[error("invalid log level '{level}'")]
    InvalidLogLevel {
        /// The unrecognized level string
        level: String,
    },

    /// A numeric option did not parse
    #[error("invalid value '{value}' for {option}")]
    InvalidValue {
        /// Option name as configured
        option: String,
        /// The offending value
        value: String,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
