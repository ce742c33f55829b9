// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package updater for the services bundle itself.
//!
//! Check, signed download, checksum verify, marker, opkg upgrade. The
//! marker file survives the restart the upgrade causes; the next boot
//! compares it with the running version and closes the loop with a
//! `completed` or failure report.

use crate::access_token::SharedToken;
use crate::config::AgentConfig;
use crate::firmware::verify_checksum;
use crate::shell::run_script;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{DeviceInfo, Registration, Scheduler};
use wayru_http::HttpClient;

pub const PACKAGE_NAME: &str = "wayru-os-services";
const PACKAGE_CHECK_ENDPOINT: &str = "/packages/check";
const PACKAGE_STATUS_ENDPOINT: &str = "/packages/status";
const PACKAGE_FILE: &str = "package-update.ipk";
const MARKER_FILE: &str = "wayru-os-services-update-marker";
const OPKG_SCRIPT: &str = "run_opkg_upgrade.sh";

pub fn marker_path(temp_path: &Path) -> PathBuf {
    temp_path.join(MARKER_FILE)
}

#[derive(Debug, Deserialize)]
struct PackageCheckReply {
    /// Boolean here; the firmware endpoint's tri-state does not apply.
    update_available: bool,
    #[serde(default)]
    download_link: Option<String>,
    #[serde(default)]
    checksum: Option<String>,
    #[serde(default)]
    new_version: Option<String>,
}

#[derive(Clone)]
pub struct PackageUpdateDeps {
    pub http: HttpClient,
    pub devices_api: String,
    pub token: SharedToken,
    pub registration: Arc<Registration>,
    pub info: Arc<DeviceInfo>,
    pub temp_path: PathBuf,
    pub scripts_path: PathBuf,
}

async fn send_package_status(
    deps: &PackageUpdateDeps,
    status: &str,
    new_version: Option<&str>,
    error_message: Option<&str>,
) {
    let url = format!("{}{PACKAGE_STATUS_ENDPOINT}", deps.devices_api);
    let mut body = serde_json::json!({
        "package_name": PACKAGE_NAME,
        "architecture": deps.info.arch,
        "current_version": deps.info.os_services_version,
        "device_id": deps.registration.wayru_device_id,
        "package_status": status,
    });
    if let Some(version) = new_version {
        body["new_version"] = version.into();
    }
    if let Some(message) = error_message {
        body["error_message"] = message.into();
    }

    let token = deps.token.lock().token.clone();
    match deps.http.post_json(&url, Some(&token), &body).await {
        Ok(response) if response.is_success() => {}
        Ok(response) => {
            tracing::error!(status = response.status, "package status report rejected")
        }
        Err(e) => tracing::error!(error = %e, "package status request failed"),
    }
}

/// On boot: when the marker exists, the upgrade either took (running
/// version matches the marker) or failed. Report and remove the marker
/// either way.
pub async fn check_package_update_completion(deps: &PackageUpdateDeps) {
    let marker = marker_path(&deps.temp_path);
    let target = match std::fs::read_to_string(&marker) {
        Ok(contents) => contents.trim().to_string(),
        Err(_) => {
            tracing::debug!("no update marker found");
            return;
        }
    };

    if target == deps.info.os_services_version {
        tracing::info!(version = %target, "package update completed successfully");
        send_package_status(deps, "completed", Some(&target), None).await;
    } else {
        tracing::error!(
            target = %target,
            running = %deps.info.os_services_version,
            "package update failed"
        );
    }

    if let Err(e) = std::fs::remove_file(&marker) {
        tracing::warn!(error = %e, "could not remove update marker");
    }
}

/// One periodic check-and-apply cycle.
async fn package_update_cycle(deps: &PackageUpdateDeps) {
    let url = format!("{}{PACKAGE_CHECK_ENDPOINT}", deps.devices_api);
    let body = serde_json::json!({
        "package_name": PACKAGE_NAME,
        "architecture": deps.info.arch,
        "current_version": deps.info.os_services_version,
        "device_id": deps.registration.wayru_device_id,
    });

    let token = deps.token.lock().token.clone();
    let response = match deps.http.post_json(&url, Some(&token), &body).await {
        Ok(response) if response.is_success() => response,
        Ok(response) => {
            tracing::warn!(status = response.status, "package check rejected");
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "package check request failed");
            return;
        }
    };

    let reply: PackageCheckReply = match response.json() {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, "failed to parse package check response");
            return;
        }
    };

    if !reply.update_available {
        tracing::debug!("no package update available");
        return;
    }

    let (Some(link), Some(checksum), Some(new_version)) =
        (&reply.download_link, &reply.checksum, &reply.new_version)
    else {
        send_package_status(deps, "error", None, Some("incomplete update descriptor")).await;
        return;
    };

    tracing::info!(version = %new_version, "package update available, applying");
    send_package_status(deps, "in_progress", Some(new_version), None).await;

    let package_path = deps.temp_path.join(PACKAGE_FILE);
    if let Err(e) = deps.http.download(link, Some(&token), &package_path).await {
        tracing::error!(error = %e, "package download failed");
        send_package_status(deps, "error", Some(new_version), Some("download failed")).await;
        return;
    }

    match verify_checksum(&package_path, checksum) {
        Ok(true) => {}
        Ok(false) => {
            tracing::error!("package checksum mismatch, aborting");
            send_package_status(deps, "error", Some(new_version), Some("checksum mismatch")).await;
            return;
        }
        Err(e) => {
            tracing::error!(error = %e, "could not hash package file");
            send_package_status(deps, "error", Some(new_version), Some("checksum unreadable"))
                .await;
            return;
        }
    }

    // Marker goes down before the upgrade so the post-restart boot can
    // tell whether it took
    if let Err(e) = std::fs::write(marker_path(&deps.temp_path), new_version) {
        tracing::error!(error = %e, "could not write update marker");
        send_package_status(deps, "error", Some(new_version), Some("marker write failed")).await;
        return;
    }

    let command =
        format!("{}/{OPKG_SCRIPT} {}", deps.scripts_path.display(), package_path.display());
    match run_script(&command).await {
        Ok(output) => tracing::info!(output = %output.trim(), "opkg upgrade invoked"),
        Err(e) => {
            tracing::error!(error = %e, "opkg upgrade script failed to start");
            send_package_status(deps, "error", Some(new_version), Some("upgrade script failed"))
                .await;
        }
    }
}

/// Periodic package check. Returns the task id, or None when disabled.
pub fn start(
    scheduler: &Scheduler,
    config: &AgentConfig,
    deps: PackageUpdateDeps,
) -> Option<wayru_core::TaskId> {
    if !config.package_update_enabled {
        tracing::info!("package update service disabled");
        return None;
    }
    let interval = Duration::from_secs(config.package_update_interval);
    let deps = Arc::new(deps);
    scheduler.schedule_repeating(interval, interval, move || {
        let deps = Arc::clone(&deps);
        Box::pin(async move {
            package_update_cycle(&deps).await;
        })
    })
}

#[cfg(test)]
#[path = "package_update_tests.rs"]
mod tests;
