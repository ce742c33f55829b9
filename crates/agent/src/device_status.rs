// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device-status reporter.
//!
//! Periodic POST of device facts; the response carries the lifecycle
//! status consumed by LED and captive-portal side effects. The reporter
//! is the sole writer of the transient `on_boot` flag.

use crate::access_token::SharedToken;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{DeviceInfo, DeviceStatus, Scheduler, SharedStatus};
use wayru_http::HttpClient;

const DEVICE_STATUS_ENDPOINT: &str = "/api/nfnode/device-status";

pub struct DeviceStatusReporter {
    http: HttpClient,
    main_api: String,
    token: SharedToken,
    info: Arc<DeviceInfo>,
    wayru_device_id: String,
    status: SharedStatus,
    /// True until the first parsed status response.
    on_boot: bool,
}

impl DeviceStatusReporter {
    pub fn new(
        http: HttpClient,
        main_api: String,
        token: SharedToken,
        info: Arc<DeviceInfo>,
        wayru_device_id: String,
        status: SharedStatus,
    ) -> Self {
        Self { http, main_api, token, info, wayru_device_id, status, on_boot: true }
    }

    pub fn on_boot(&self) -> bool {
        self.on_boot
    }

    /// Request body; field names are part of the backend contract.
    pub fn body(&self) -> serde_json::Value {
        let mut body = json!({
            "on_boot": self.on_boot,
            "mac": self.info.mac,
            "name": self.info.name,
            "brand": self.info.brand,
            "model": self.info.model,
            "public_ip": self.info.public_ip,
            "os_name": self.info.os_name,
            "os_version": self.info.os_version,
            "os_services_version": self.info.os_services_version,
            "did_public_key": self.info.did_public_key,
            "wayru_device_id": self.wayru_device_id,
        });
        // Odyssey boards have no stable local device id
        if self.info.model != "Odyssey" {
            body["device_id"] = self.info.device_id.clone().into();
        }
        body
    }

    /// One report cycle. Never fatal; unknown on failure.
    pub async fn tick(&mut self) {
        let url = format!("{}{DEVICE_STATUS_ENDPOINT}", self.main_api);
        let token = self.token.lock().token.clone();
        let body = self.body();

        let response = match self.http.post_json(&url, Some(&token), &body).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::error!(status = response.status, "device status rejected");
                self.status.set(DeviceStatus::Unknown);
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "error requesting device status");
                self.status.set(DeviceStatus::Unknown);
                return;
            }
        };

        match parse_status(&response.body) {
            Some(status) => {
                tracing::debug!(code = status.code(), "device status response");
                self.status.set(status);
                self.on_boot = false;
            }
            None => {
                tracing::error!("deviceStatus field missing or invalid");
                self.status.set(DeviceStatus::Unknown);
            }
        }
    }
}

pub fn parse_status(body: &str) -> Option<DeviceStatus> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let code = json.get("deviceStatus")?.as_i64()?;
    Some(DeviceStatus::from_code(code))
}

/// Periodic reporter task.
pub fn start(
    scheduler: &Scheduler,
    interval_secs: u64,
    reporter: DeviceStatusReporter,
) -> Option<wayru_core::TaskId> {
    let interval = Duration::from_secs(interval_secs);
    let reporter = Arc::new(tokio::sync::Mutex::new(reporter));
    // First report goes out promptly so the boot flag reaches the plane
    scheduler.schedule_repeating(Duration::from_secs(1), interval, move || {
        let reporter = Arc::clone(&reporter);
        Box::pin(async move {
            reporter.lock().await.tick().await;
        })
    })
}

#[cfg(test)]
#[path = "device_status_tests.rs"]
mod tests;
