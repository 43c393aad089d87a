// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Logging initialization with API-token redaction.
//!
//! Formatted output goes to the console and to a fixed `technisync.log`
//! file. Both sinks sit behind a redacting writer that rewrites `token=…`
//! and `api_key=…` substrings to `[REDACTED]` before any byte reaches the
//! sink, so a request URL or error string can never leak a credential into
//! the logs.
//!
//! Respects `RUST_LOG` if set, otherwise uses the configured log level.

use std::io;
use std::sync::LazyLock;

use regex::Regex;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::constants::LOG_FILE_NAME;

static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"token=[^&\s]+").expect("static pattern"));
static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"api_key=[^&\s]+").expect("static pattern"));

/// Strip API credentials from a log line.
#[must_use]
pub fn redact(message: &str) -> String {
    let message = TOKEN_PATTERN.replace_all(message, "token=[REDACTED]");
    API_KEY_PATTERN
        .replace_all(&message, "api_key=[REDACTED]")
        .into_owned()
}

/// A writer that redacts credentials before forwarding to the inner sink.
pub struct RedactingWriter<W> {
    inner: W,
}

impl<W: io::Write> io::Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(redact(&text).as_bytes())?;
        // Report the original length; the redaction may change the byte count
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A [`MakeWriter`] adapter wrapping every produced writer in
/// [`RedactingWriter`].
pub struct RedactingMakeWriter<M> {
    inner: M,
}

impl<M> RedactingMakeWriter<M> {
    /// Wrap `inner` so all its writers redact credentials.
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for RedactingMakeWriter<M> {
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
        }
    }
}

/// Initialize the global subscriber: console layer plus `technisync.log`
/// file layer, both redacting.
///
/// The returned guard flushes the file appender's background worker; hold
/// it for the life of the process.
pub fn init(level: Level) -> WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let file_appender = tracing_appender::rolling::never(".", LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(RedactingMakeWriter::new(io::stdout)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(RedactingMakeWriter::new(file_writer)),
        )
        .init();

    guard
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod logging_tests;
