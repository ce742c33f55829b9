// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wayru agent (wayru-agent)
//!
//! Edge representative of the fleet-management plane: registers the
//! device, keeps the access token fresh, pumps MQTT, streams NDS events,
//! reports status, applies updates, and serves the local IPC surface.
//!
//! Architecture:
//! - One current-thread runtime; all periodic work multiplexes over the
//!   cooperative scheduler, one callback at a time
//! - IPC connections are served on spawned tasks and never block the loop

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod access_token;
mod certs;
mod commands;
mod config;
mod device_context;
mod device_info;
mod device_status;
mod diagnostic;
mod firmware;
mod monitoring;
mod mqtt;
mod nds;
mod package_update;
mod reboot;
mod registration;
mod server;
mod shell;
mod site_clients;
mod speedtest;
mod time_sync;

use config::AgentConfig;
use fs2::FileExt;
use parking_lot::Mutex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{
    logging, shutdown::spawn_signal_handlers, CredentialStore, Scheduler, SharedStatus,
    ShutdownRegistry, SystemClock,
};
use wayru_http::HttpClient;

const DEFAULT_CONFIG_PATH: &str = "/etc/wayru/agent.toml";

fn parse_args() -> Option<PathBuf> {
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("wayru-agent {}", env!("CARGO_PKG_VERSION"));
                return None;
            }
            "--help" | "-h" | "help" => {
                println!("wayru-agent {}", env!("CARGO_PKG_VERSION"));
                println!("Wayru device agent - edge daemon for the fleet management plane");
                println!();
                println!("USAGE:");
                println!("    wayru-agent [--config <path>]");
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
                eprintln!("Usage: wayru-agent [--config <path>]");
                std::process::exit(1);
            }
        }
    }
    Some(config_path)
}

/// Run cleanups and exit with the initialisation-failure code.
fn fatal(registry: &ShutdownRegistry, reason: &str) -> ! {
    tracing::error!(reason, "initialisation failed");
    registry.run_cleanups(reason);
    std::process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let Some(config_path) = parse_args() else {
        return Ok(());
    };

    let config = AgentConfig::load(&config_path)?;
    if !config.enabled {
        println!("wayru-agent is disabled in configuration");
        return Ok(());
    }

    let _log_guard = logging::setup_logging(config.log_path.as_deref())?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting wayru-agent");

    // One agent per device: hold a pid lock under the runtime dir
    std::fs::create_dir_all(config.runtime_dir())?;
    let lock_path = config.runtime_dir().join("wayru-agent.pid");
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    if lock_file.try_lock_exclusive().is_err() {
        eprintln!("wayru-agent is already running");
        std::process::exit(1);
    }
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let registry = Arc::new(ShutdownRegistry::new());
    spawn_signal_handlers(Arc::clone(&registry))?;

    let scheduler = Arc::new(Scheduler::new());
    {
        // Exit requests (signals, MQTT exhaustion) stop the loop; the
        // running callback completes first
        let registry = Arc::clone(&registry);
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move {
            registry.requested().await;
            scheduler.shutdown();
        });
    }

    let http = HttpClient::new()?;
    let clock = SystemClock;

    // Device facts
    let info = match device_info::init_device_info(&config).await {
        Ok(info) => Arc::new(info),
        Err(e) => fatal(&registry, &format!("device facts unavailable: {e}")),
    };
    tracing::info!(mac = %info.mac, model = %info.model, "device facts collected");

    // Diagnostic gate
    let led = diagnostic::led_for(&config);
    if !diagnostic::run_bootstrap_checks(&http, &config).await {
        led.update(false, "Diagnostic tests failed");
        fatal(&registry, "Diagnostic tests failed");
    }

    // Registration
    let store = CredentialStore::new(&config.data_path);
    let registration = match registration::init_registration(&store, &http, &config, &info).await {
        Ok(registration) => Arc::new(registration),
        Err(e) => fatal(&registry, &format!("registration failed: {e}")),
    };

    // Access token
    let token = match access_token::init_access_token(&store, &http, &config, &registration, &clock)
        .await
    {
        Ok(token) => Arc::new(Mutex::new(token)),
        Err(e) => fatal(&registry, &format!("access token unavailable: {e}")),
    };

    // Close out any update attempt from the previous boot
    let package_deps = package_update::PackageUpdateDeps {
        http: http.clone(),
        devices_api: config.devices_api.clone(),
        token: Arc::clone(&token),
        registration: Arc::clone(&registration),
        info: Arc::clone(&info),
        temp_path: config.temp_path.clone(),
        scripts_path: config.scripts_path.clone(),
    };
    package_update::check_package_update_completion(&package_deps).await;
    {
        let bearer = token.lock().token.clone();
        firmware::firmware_upgrade_on_boot(
            &http,
            &config.accounting_api,
            &bearer,
            &registration,
            &info,
        )
        .await;
    }

    // Certificate gate
    if config.dev_env {
        tracing::info!("dev mode: skipping certificate bootstrap");
    } else {
        let bearer = token.lock().token.clone();
        if let Err(e) = certs::ensure_certificates(&http, &config, &bearer).await {
            fatal(&registry, &format!("certificate bootstrap failed: {e}"));
        }
    }

    // Device context (site binding)
    let site = device_context::SharedSite::default();
    let context_deps = device_context::DeviceContextDeps {
        http: http.clone(),
        accounting_api: config.accounting_api.clone(),
        token: Arc::clone(&token),
        registration: Arc::clone(&registration),
        site: Arc::clone(&site),
    };
    device_context::init_device_context(&context_deps).await;

    // MQTT client
    let mqtt_username = Arc::new(Mutex::new(token.lock().token.clone()));
    let settings = mqtt::MqttSettings {
        client_id: registration.wayru_device_id.clone(),
        broker_url: config.mqtt_broker_url.clone(),
        data_path: config.data_path.clone(),
        keepalive: Duration::from_secs(config.mqtt_keepalive),
    };
    let transport = match mqtt::RumqttcTransport::new(settings, Arc::clone(&mqtt_username)) {
        Ok(transport) => transport,
        Err(e) => fatal(&registry, &format!("MQTT client initialisation failed: {e}")),
    };
    let status_led = Arc::clone(&led);
    let mqtt: mqtt::SharedMqtt = Arc::new(tokio::sync::Mutex::new(mqtt::MqttService::new(
        transport,
        Arc::clone(&registry),
        Box::new(move |ok, reason| status_led.update(ok, reason)),
    )));

    // Command topic
    {
        let command_deps = Arc::new(commands::CommandDeps {
            http: http.clone(),
            accounting_api: config.accounting_api.clone(),
            token: Arc::clone(&token),
            codename: info.name.clone(),
            os_version: info.os_version.clone(),
            wayru_device_id: registration.wayru_device_id.clone(),
        });
        let topic = commands::command_topic(&registration.wayru_device_id);
        if let Err(e) =
            mqtt.lock().await.subscribe(&topic, 1, commands::handler(command_deps)).await
        {
            tracing::error!(error = %e, "command subscription failed");
        }
    }

    // Site membership topics
    {
        let site_id = site.lock().as_ref().map(|s| s.id.clone());
        site_clients::init_site_clients(&mqtt, site_id.as_deref()).await;
    }

    // Access-token service; MQTT credentials follow each rotation
    let subscribers: Arc<Mutex<Vec<access_token::TokenSubscriber>>> =
        Arc::new(Mutex::new(Vec::new()));
    {
        let cell = Arc::clone(&mqtt_username);
        subscribers.lock().push(Box::new(move |fresh: &str| {
            *cell.lock() = fresh.to_string();
            tracing::info!("mqtt client credentials refreshed");
        }));
    }
    let token_cleanup = access_token::start(access_token::TokenServiceDeps {
        scheduler: Arc::clone(&scheduler),
        http: http.clone(),
        store: store.clone(),
        accounting_api: config.accounting_api.clone(),
        access_interval: config.access_interval,
        registration: Arc::clone(&registration),
        token: Arc::clone(&token),
        subscribers: Arc::clone(&subscribers),
        clock,
    });
    registry.register("access-token-service", move || token_cleanup());

    // MQTT pump
    {
        let mqtt = Arc::clone(&mqtt);
        let interval = Duration::from_secs(config.mqtt_task_interval.max(1));
        if scheduler
            .schedule_repeating(Duration::ZERO, interval, move || {
                let mqtt = Arc::clone(&mqtt);
                Box::pin(async move {
                    mqtt.lock().await.tick().await;
                })
            })
            .is_none()
        {
            fatal(&registry, "failed to schedule MQTT pump");
        }
    }

    // NDS pump
    let nds_client = nds::init_nds_client(&config).await;
    let _ = nds::start(
        &scheduler,
        &config,
        nds::NdsDeps {
            client: nds_client,
            site: Arc::clone(&site),
            info: Arc::clone(&info),
            mqtt: Arc::clone(&mqtt),
        },
    );

    // Device status reporter
    let status = SharedStatus::new();
    let _ = device_status::start(
        &scheduler,
        config.device_status_interval,
        device_status::DeviceStatusReporter::new(
            http.clone(),
            config.main_api.clone(),
            Arc::clone(&token),
            Arc::clone(&info),
            registration.wayru_device_id.clone(),
            status.clone(),
        ),
    );

    // Device context refresh
    let _ = device_context::start(&scheduler, config.device_context_interval, context_deps);

    // Updaters
    let _ = firmware::start(
        &scheduler,
        &config,
        firmware::FirmwareServiceDeps {
            http: http.clone(),
            accounting_api: config.accounting_api.clone(),
            token: Arc::clone(&token),
            registration: Arc::clone(&registration),
            info: Arc::clone(&info),
        },
    );
    let _ = package_update::start(&scheduler, &config, package_deps);

    // Monitoring and speed test
    monitoring::start(
        &scheduler,
        &config,
        monitoring::MonitoringDeps {
            registration: Arc::clone(&registration),
            mqtt: Arc::clone(&mqtt),
            interval_min: config.monitoring_interval_min,
            interval_max: config.monitoring_interval_max,
        },
    );
    speedtest::start(
        &scheduler,
        &config,
        speedtest::SpeedTestDeps {
            registration: Arc::clone(&registration),
            mqtt: Arc::clone(&mqtt),
            scripts_path: config.scripts_path.clone(),
            latency_attempts: config.speed_test_latency_attempts,
            interval_min: config.speed_test_interval_min,
            interval_max: config.speed_test_interval_max,
        },
    );

    // Housekeeping services
    let _ = reboot::start(&scheduler, &config);
    let _ = time_sync::start(&scheduler, &config);
    let _ = diagnostic::start(
        &scheduler,
        &config,
        diagnostic::DiagnosticDeps {
            http: http.clone(),
            accounting_api: config.accounting_api.clone(),
            led: Arc::clone(&led),
        },
    );

    // Local IPC surface
    let ipc = server::IpcServer::new(
        wayru_ipc::socket_path(&config.temp_path),
        Arc::clone(&token),
        Arc::clone(&info),
        Arc::clone(&registration),
    );
    if let Err(e) = ipc.start() {
        fatal(&registry, &format!("IPC server failed to start: {e}"));
    }
    let _ = server::start_health_task(&scheduler, Arc::clone(&ipc), Duration::from_secs(30));
    {
        let ipc = Arc::clone(&ipc);
        registry.register("ipc-server", move || ipc.stop());
    }
    {
        let lock_path = lock_path.clone();
        registry.register("pid-lock", move || {
            let _ = std::fs::remove_file(&lock_path);
        });
    }

    tracing::info!("services scheduled, starting scheduler main loop");
    let code = scheduler.run().await;
    tracing::info!(code, reason = %registry.shutdown_reason(), "scheduler main loop ended");

    registry.run_cleanups(&registry.shutdown_reason());
    Ok(())
}
