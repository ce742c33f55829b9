// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wayru log collector (wayru-collector)
//!
//! Tails the syslog stream, pools and batches records, and ships them to
//! the logging backend under the bearer token fetched from the agent
//! over local IPC.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod batch;
mod config;
mod ingest;
mod pool;
mod queue;
mod sender;

use batch::{BatchConfig, Collector};
use config::CollectorConfig;
use sender::HttpBatchSender;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{logging, shutdown::spawn_signal_handlers, Scheduler, ShutdownRegistry};
use wayru_http::HttpClient;
use wayru_ipc::{IpcClient, TokenManager};

const DEFAULT_CONFIG_PATH: &str = "/etc/wayru/collector.toml";

fn parse_args() -> Option<PathBuf> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("wayru-collector {}", env!("CARGO_PKG_VERSION"));
                return None;
            }
            "--help" | "-h" | "help" => {
                println!("wayru-collector {}", env!("CARGO_PKG_VERSION"));
                println!("Wayru log collector - ships syslog batches to the backend");
                println!();
                println!("USAGE:");
                println!("    wayru-collector [--config <path>]");
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
                eprintln!("Usage: wayru-collector [--config <path>]");
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

    let config = CollectorConfig::load(&config_path)?;
    if !config.enabled {
        println!("wayru-collector is disabled in configuration");
        return Ok(());
    }

    let _log_guard = logging::setup_logging(config.log_path.as_deref())?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        queue_size = config.queue_size,
        batch_size = config.batch_size,
        "starting wayru-collector"
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

    // Syslog stream
    let (log_tx, log_rx) = tokio::sync::mpsc::channel(config.queue_size);
    if let Err(e) = ingest::spawn_logread(log_tx) {
        tracing::error!(error = %e, "failed to start syslog reader");
        registry.run_cleanups("syslog reader unavailable");
        std::process::exit(1);
    }
    let log_rx = Arc::new(tokio::sync::Mutex::new(log_rx));

    // Batch machinery
    let batch_config = BatchConfig {
        batch_size: config.batch_size,
        batch_timeout: Duration::from_secs(config.batch_timeout_secs),
        max_retries: config.http_retries,
        retry_delay: Duration::from_secs(config.retry_delay_secs),
    };
    let collector = Arc::new(tokio::sync::Mutex::new(Collector::new(
        config.queue_size,
        batch_config,
    )));

    let http = HttpClient::with_timeout(Duration::from_secs(config.http_timeout_secs))?;
    let tokens = TokenManager::new(IpcClient::new(wayru_ipc::socket_path(&config.temp_path)));
    let http_sender = Arc::new(tokio::sync::Mutex::new(HttpBatchSender::new(
        http,
        config.logs_endpoint.clone(),
        tokens,
    )));

    // Collect task: drain the stream, fill the pool, drive the batch FSM
    {
        let collector = Arc::clone(&collector);
        let http_sender = Arc::clone(&http_sender);
        let log_rx = Arc::clone(&log_rx);
        let interval = Duration::from_secs(config.collect_interval_secs.max(1));
        let task = scheduler.schedule_repeating(interval, interval, move || {
            let collector = Arc::clone(&collector);
            let http_sender = Arc::clone(&http_sender);
            let log_rx = Arc::clone(&log_rx);
            Box::pin(async move {
                let mut collector = collector.lock().await;
                {
                    let mut rx = log_rx.lock().await;
                    while let Ok(record) = rx.try_recv() {
                        collector.enqueue(
                            &record.program,
                            &record.message,
                            &record.facility.to_string(),
                            &record.severity.to_string(),
                            record.timestamp,
                        );
                    }
                }
                let mut sender = http_sender.lock().await;
                collector.run_cycle(&mut *sender).await;
            })
        });
        if task.is_none() {
            registry.run_cleanups("failed to schedule collect task");
            std::process::exit(1);
        }
    }

    tracing::info!("collection system initialized, starting scheduler main loop");
    let code = scheduler.run().await;
    tracing::info!(code, reason = %registry.shutdown_reason(), "scheduler main loop ended");

    // Final flush before unwinding
    {
        let mut collector = collector.lock().await;
        let mut sender = http_sender.lock().await;
        collector.flush(&mut *sender).await;
        tracing::info!(dropped = collector.dropped(), "collector drained");
    }

    registry.run_cleanups(&registry.shutdown_reason());
    Ok(())
}
