// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! TechniSync daemon entry point.
//!
//! Loads configuration, opens the mirror, builds one API client per
//! configured server, and drives the reconciliation engine on a fixed
//! interval. A failed tick is followed by a fixed 60 second back-off
//! instead of the normal interval. The mirror connection is released on
//! every exit path; the loop exits cleanly on Ctrl-C between ticks.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use technisync::client::{DnsApi, TechnitiumClient};
use technisync::config::Config;
use technisync::constants::FAILURE_BACKOFF_SECS;
use technisync::logging;
use technisync::mirror::Mirror;
use technisync::sync::SyncEngine;
use tokio::time::Duration;
use tracing::{error, info};

/// Multi-master reconciliation daemon for Technitium DNS server fleets.
#[derive(Debug, Parser)]
#[command(name = "technisync", version, about)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configuration errors are fatal before logging exists; anyhow prints
    // them on stderr.
    let config = Arc::new(Config::load(&cli.config)?);

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("technisync")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(config))
}

async fn async_main(config: Arc<Config>) -> Result<()> {
    let _log_guard = logging::init(config.log_level);
    info!("Starting TechniSync");

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let mirror = Mirror::open(&config.db_path)
        .with_context(|| format!("failed to open mirror at {}", config.db_path.display()))?;
    info!("Mirror initialized at {}", config.db_path.display());

    let mut clients: HashMap<String, Arc<dyn DnsApi>> = HashMap::new();
    for server in &config.servers {
        let client = TechnitiumClient::new(server)
            .with_context(|| format!("failed to build client for server {}", server.name))?;
        clients.insert(server.name.clone(), Arc::new(client));
    }

    let mut engine = SyncEngine::new(Arc::clone(&config), mirror, clients);

    loop {
        let sleep_for = match engine.sync().await {
            Ok(()) => {
                info!(
                    "Sync completed. Waiting for {} seconds.",
                    config.sync_interval.as_secs()
                );
                config.sync_interval
            }
            Err(error) => {
                error!("Error during sync: {error:#}");
                Duration::from_secs(FAILURE_BACKOFF_SECS)
            }
        };

        tokio::select! {
            () = tokio::time::sleep(sleep_for) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, exiting");
                break;
            }
        }
    }

    Ok(())
}
