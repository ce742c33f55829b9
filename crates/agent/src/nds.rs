// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NDS event pump.
//!
//! OpenNDS binauth events arrive over a named FIFO, one per line. Each
//! tick drains up to one buffer, annotates lines with the gateway MAC,
//! and publishes the batch to the accounting topic and, when the device
//! belongs to a site, to the site clients topic.

use crate::config::AgentConfig;
use crate::device_context::SharedSite;
use crate::mqtt::SharedMqtt;
use crate::shell::{run_script, run_status};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use parking_lot::Mutex;
use std::io::Read;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{DeviceInfo, Scheduler};

const NDS_FIFO: &str = "nds-fifo";
const FIFO_BUFFER_SIZE: usize = 512;
const SET_BINAUTH_SCRIPT: &str = "nds-set-binauth.lua";
const BINAUTH_SCRIPT: &str = "nds-binauth.sh";

pub const ACCOUNTING_TOPIC: &str = "accounting/nds";

pub struct NdsClient {
    fifo: Option<std::fs::File>,
    pub opennds_installed: bool,
}

pub fn fifo_path(config: &AgentConfig) -> PathBuf {
    config.runtime_dir().join(NDS_FIFO)
}

fn open_fifo(config: &AgentConfig) -> std::io::Result<std::fs::File> {
    let dir = config.runtime_dir();
    std::fs::create_dir_all(&dir)?;

    let path = fifo_path(config);
    match nix::unistd::mkfifo(&path, Mode::from_bits_truncate(0o666)) {
        Ok(()) => tracing::debug!(path = %path.display(), "nds fifo created"),
        Err(nix::errno::Errno::EEXIST) => {}
        Err(e) => return Err(e.into()),
    }

    std::fs::OpenOptions::new()
        .read(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(&path)
}

pub async fn init_nds_client(config: &AgentConfig) -> NdsClient {
    if config.dev_env {
        return NdsClient { fifo: None, opennds_installed: false };
    }

    let opennds_installed = matches!(
        run_status("opkg list-installed | grep -q opennds").await,
        Ok(0)
    );
    if !opennds_installed {
        tracing::warn!("OpenNDS is not installed");
        return NdsClient { fifo: None, opennds_installed };
    }

    let fifo = match open_fifo(config) {
        Ok(file) => {
            tracing::info!("nds fifo opened");
            Some(file)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to open nds fifo");
            None
        }
    };

    // Point the OpenNDS binauth hook at our event script
    let binauth = format!(
        "{}/{SET_BINAUTH_SCRIPT} {}/{BINAUTH_SCRIPT}",
        config.scripts_path.display(),
        config.scripts_path.display()
    );
    match run_script(&binauth).await {
        Ok(output) => tracing::debug!(output = %output.trim(), "binauth configured"),
        Err(e) => tracing::error!(error = %e, "failed to configure binauth"),
    }

    NdsClient { fifo, opennds_installed }
}

/// Split a FIFO chunk into per-line events annotated with the gateway MAC.
pub fn format_events(buffer: &str, gateway_mac: &str) -> Vec<String> {
    buffer
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| format!("{line}, gatewaymac={gateway_mac}"))
        .collect()
}

/// Drain up to one buffer from the FIFO. EAGAIN and zero reads are
/// normal idle ticks.
fn read_chunk(file: &mut std::fs::File) -> Option<String> {
    let mut buffer = [0u8; FIFO_BUFFER_SIZE];
    match file.read(&mut buffer) {
        Ok(0) => None,
        Ok(n) => Some(String::from_utf8_lossy(&buffer[..n]).into_owned()),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => None,
        Err(e) => {
            tracing::error!(error = %e, "failed to read from nds fifo");
            None
        }
    }
}

pub struct NdsDeps {
    pub client: NdsClient,
    pub site: SharedSite,
    pub info: Arc<DeviceInfo>,
    pub mqtt: SharedMqtt,
}

/// Periodic FIFO drain. Not started in dev mode or without OpenNDS.
pub fn start(
    scheduler: &Scheduler,
    config: &AgentConfig,
    deps: NdsDeps,
) -> Option<wayru_core::TaskId> {
    if config.dev_env {
        tracing::info!("NDS service not started (dev mode)");
        return None;
    }
    if !deps.client.opennds_installed || deps.client.fifo.is_none() {
        tracing::warn!("NDS service not started (OpenNDS missing or fifo unavailable)");
        return None;
    }

    let interval = Duration::from_secs(config.nds_interval);
    let deps = Arc::new(Mutex::new(deps));
    scheduler.schedule_repeating(interval, interval, move || {
        let deps = Arc::clone(&deps);
        Box::pin(async move {
            let (payload, site_topic) = {
                let mut guard = deps.lock();
                let mac = guard.info.mac.clone();
                let site_id = guard.site.lock().as_ref().map(|s| s.id.clone());
                let Some(fifo) = guard.client.fifo.as_mut() else {
                    return;
                };
                let Some(chunk) = read_chunk(fifo) else {
                    return;
                };
                let events = format_events(&chunk, &mac);
                if events.is_empty() {
                    return;
                }
                let payload = serde_json::to_vec(&events).unwrap_or_default();
                (payload, site_id.map(|id| format!("site/{id}/clients")))
            };

            let mqtt = { deps.lock().mqtt.clone() };
            let mut mqtt = mqtt.lock().await;
            mqtt.publish(ACCOUNTING_TOPIC, payload.clone(), 0).await;
            if let Some(topic) = site_topic {
                mqtt.publish(&topic, payload, 0).await;
            }
        })
    })
}

#[cfg(test)]
#[path = "nds_tests.rs"]
mod tests;
