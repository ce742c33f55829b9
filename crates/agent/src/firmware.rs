// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Firmware updater.
//!
//! The check endpoint returns a tri-state `update_available`: 0 none,
//! 1 an update exists but only notifies, 2 download and apply. This is
//! distinct from the package updater, whose check returns a boolean.

use crate::access_token::SharedToken;
use crate::config::AgentConfig;
use crate::shell::run_script;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{DeviceInfo, Registration, Scheduler};
use wayru_http::HttpClient;

const FIRMWARE_CHECK_ENDPOINT: &str = "/firmware-updates/check-updates";
const FIRMWARE_ON_BOOT_ENDPOINT: &str = "/firmware-updates/on-boot";
const FIRMWARE_IMAGE_FILE: &str = "firmware-update.bin";
const SYSUPGRADE_SCRIPT: &str = "run_sysupgrade.sh";

#[derive(Debug, Deserialize)]
struct FirmwareCheckReply {
    /// 0 = none, 1 = notify only, 2 = download and apply
    update_available: u8,
    #[serde(default)]
    download_link: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    new_version: Option<String>,
}

/// SHA-256 of a downloaded artifact against the expected hex digest.
pub fn verify_checksum(path: &Path, expected: &str) -> std::io::Result<bool> {
    let contents = std::fs::read(path)?;
    let digest = format!("{:x}", Sha256::digest(&contents));
    Ok(digest.eq_ignore_ascii_case(expected.trim()))
}

/// One firmware check cycle. Shared by the periodic task and the
/// `check_firmware_update` MQTT command; publishes no MQTT response.
pub async fn send_firmware_check_request(
    http: &HttpClient,
    accounting_api: &str,
    token: &str,
    codename: &str,
    version: &str,
    wayru_device_id: &str,
) {
    let url = format!("{accounting_api}{FIRMWARE_CHECK_ENDPOINT}");
    let body = serde_json::json!({
        "codename": codename,
        "version": version,
        "wayru_device_id": wayru_device_id,
    });

    let response = match http.post_json(&url, Some(token), &body).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            tracing::warn!(status = response.status, "firmware check rejected");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "firmware check request failed");
            return;
        }
    };

    let reply: FirmwareCheckReply = match response.json() {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse firmware check response");
            return;
        }
    };

    match reply.update_available {
        0 => tracing::debug!("no firmware update available"),
        1 => tracing::info!(
            version = reply.new_version.as_deref().unwrap_or("unknown"),
            "firmware update available (notify only)"
        ),
        2 => apply_firmware_update(http, token, &reply).await,
        other => tracing::error!(value = other, "unknown update_available value received"),
    }
}

async fn apply_firmware_update(http: &HttpClient, token: &str, reply: &FirmwareCheckReply) {
    let (Some(link), Some(checksum)) = (&reply.download_link, &reply.checksum) else {
        tracing::error!("firmware update missing download link or checksum");
        return;
    };

    let image_path = std::env::temp_dir().join(FIRMWARE_IMAGE_FILE);
    if let Err(e) = http.download(link, Some(token), &image_path).await {
        tracing::error!(error = %e, "firmware download failed");
        return;
    }

    match verify_checksum(&image_path, checksum) {
        Ok(true) => {}
        Ok(false) => {
            tracing::error!("firmware checksum mismatch, aborting upgrade");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "could not hash firmware image");
            return;
        }
    }

    tracing::info!(
        version = reply.new_version.as_deref().unwrap_or("unknown"),
        "firmware verified, running sysupgrade"
    );
    // sysupgrade reboots the device on success; this call does not return
    // in the happy path
    let command = format!("{SYSUPGRADE_SCRIPT} {}", image_path.display());
    if let Err(e) = run_script(&command).await {
        tracing::error!(error = %e, "sysupgrade script failed to start");
    }
}

/// Best-effort on-boot report so the control plane can close out a
/// firmware upgrade attempt.
pub async fn firmware_upgrade_on_boot(
    http: &HttpClient,
    accounting_api: &str,
    token: &str,
    registration: &Registration,
    info: &DeviceInfo,
) {
    let url = format!("{accounting_api}{FIRMWARE_ON_BOOT_ENDPOINT}");
    let body = serde_json::json!({
        "wayru_device_id": registration.wayru_device_id,
        "version": info.os_version,
    });
    match http.post_json(&url, Some(token), &body).await {
        Ok(response) if response.is_success() => {
            tracing::debug!("firmware on-boot report delivered")
        }
        Ok(response) => tracing::warn!(status = response.status, "firmware on-boot report rejected"),
        Err(e) => tracing::warn!(error = %e, "firmware on-boot report failed"),
    }
}

pub struct FirmwareServiceDeps {
    pub http: HttpClient,
    pub accounting_api: String,
    pub token: SharedToken,
    pub registration: Arc<Registration>,
    pub info: Arc<DeviceInfo>,
}

/// Periodic firmware check. Returns the task id, or None when disabled.
pub fn start(
    scheduler: &Scheduler,
    config: &AgentConfig,
    deps: FirmwareServiceDeps,
) -> Option<wayru_core::TaskId> {
    if !config.firmware_update_enabled {
        tracing::info!("firmware update service disabled");
        return None;
    }
    let interval = Duration::from_secs(config.firmware_update_interval);
    let deps = Arc::new(deps);
    scheduler.schedule_repeating(interval, interval, move || {
        let deps = Arc::clone(&deps);
        Box::pin(async move {
            let token = deps.token.lock().token.clone();
            send_firmware_check_request(
                &deps.http,
                &deps.accounting_api,
                &token,
                &deps.info.name,
                &deps.info.os_version,
                &deps.registration.wayru_device_id,
            )
            .await;
        })
    })
}

#[cfg(test)]
#[path = "firmware_tests.rs"]
mod tests;
