// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wayru config sync (wayru-config)
//!
//! Polls the remote configuration endpoint, fingerprints its sections,
//! renders changes into UCI, restarts affected services, and rolls back
//! in layers when rendering or restarts fail.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod fingerprint;
mod renderer;
mod rollback;
mod services;
mod sync;

use config::SyncConfig;
use fingerprint::HashStore;
use renderer::ScriptRenderer;
use rollback::RollbackStore;
use services::InitdServiceControl;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sync::{SyncCore, SyncService};
use wayru_core::{logging, shutdown::spawn_signal_handlers, Scheduler, ShutdownRegistry};
use wayru_http::HttpClient;
use wayru_ipc::{IpcClient, TokenManager};

const DEFAULT_CONFIG_PATH: &str = "/etc/wayru/config-sync.toml";

fn parse_args() -> Option<PathBuf> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("wayru-config {}", env!("CARGO_PKG_VERSION"));
                return None;
            }
            "--help" | "-h" | "help" => {
                println!("wayru-config {}", env!("CARGO_PKG_VERSION"));
                println!("Wayru config sync - applies remote configuration to the device");
                println!();
                println!("USAGE:");
                println!("    wayru-config [--config <path>]");
                println!();
                println!("OPTIONS:");
                println!("    -c, --config <path>  Configuration file (default: {DEFAULT_CONFIG_PATH})");
                println!("    -h, --help           Print help information");
                println!("    -v, --version        Print version information");
                return None;
            }
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                } else {
                    eprintln!("error: --config requires a path");
                    std::process::exit(1);
                }
            }
            other => {
                eprintln!("error: unexpected argument '{other}'");
                eprintln!("Usage: wayru-config [--config <path>]");
                std::process::exit(1);
            }
        }
    }
    Some(config_path)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let Some(config_path) = parse_args() else {
        return Ok(());
    };

    let config = SyncConfig::load(&config_path)?;
    if !config.enabled {
        println!("wayru-config is disabled in configuration");
        return Ok(());
    }

    let _log_guard = logging::setup_logging(config.log_path.as_deref())?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.config_endpoint,
        hash_dir = %config.hash_dir.display(),
        "starting wayru-config"
    );

    let registry = Arc::new(ShutdownRegistry::new());
    spawn_signal_handlers(Arc::clone(&registry))?;

    let scheduler = Arc::new(Scheduler::new());
    {
        let registry = Arc::clone(&registry);
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            registry.requested().await;
            scheduler.shutdown();
        });
    }

    let http = HttpClient::new()?;
    let mut tokens = TokenManager::new(IpcClient::new(wayru_ipc::socket_path(&config.temp_path)));

    // Try for an initial token; operation retries on each cycle anyway
    if tokens.refresh_access_token().await.is_ok() {
        tracing::info!("initial access token acquired");
    } else {
        tracing::warn!("failed to acquire initial token, will retry during operation");
    }

    let service = SyncService {
        core: SyncCore {
            hashes: HashStore::new(&config.hash_dir),
            rollback: RollbackStore::new(&config.rollback_dir),
            renderer: ScriptRenderer::new(
                config.renderer_script.clone(),
                config.temp_path.join("wayru-config"),
            ),
            services: InitdServiceControl::new(config.dev_env),
        },
        http,
        endpoint: config.config_endpoint.clone(),
        tokens,
    };
    let service = Arc::new(tokio::sync::Mutex::new(service));

    {
        let service = Arc::clone(&service);
        let interval = Duration::from_secs(config.sync_interval.max(1));
        let task = scheduler.schedule_repeating(interval, interval, move || {
            let service = Arc::clone(&service);
            Box::pin(async move {
                if let Some(report) = service.lock().await.run_cycle().await {
                    if !report.unchanged {
                        for result in &report.results {
                            tracing::info!(service = %result.name, ok = result.ok, "sync result");
                        }
                    }
                }
            })
        });
        if task.is_none() {
            registry.run_cleanups("failed to schedule config sync task");
            std::process::exit(1);
        }
    }

    tracing::info!(interval_s = config.sync_interval, "config sync scheduled, starting main loop");
    let code = scheduler.run().await;
    tracing::info!(code, reason = %registry.shutdown_reason(), "scheduler main loop ended");

    registry.run_cleanups(&registry.shutdown_reason());
    Ok(())
}
