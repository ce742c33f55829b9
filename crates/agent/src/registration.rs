// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! First-boot registration with the control plane.

use crate::config::AgentConfig;
use anyhow::{Context, Result};
use serde::Serialize;
use wayru_core::{store, CredentialStore, DeviceInfo, Registration};
use wayru_http::HttpClient;

#[derive(Serialize)]
struct RegisterBody<'a> {
    mac: &'a str,
    model: &'a str,
    brand: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    openwisp_device_id: Option<&'a str>,
}

/// Adopt the persisted registration, or register the device once and
/// persist the result. Registration is immutable for the life of the
/// device; failure here is fatal to bootstrap.
pub async fn init_registration(
    store: &CredentialStore,
    http: &HttpClient,
    config: &AgentConfig,
    info: &DeviceInfo,
) -> Result<Registration> {
    if let Some(registration) = store.load::<Registration>(store::REGISTRATION_FILE)? {
        tracing::info!(device = %registration.wayru_device_id, "adopted persisted registration");
        return Ok(registration);
    }

    let url = format!("{}/access/register", config.accounting_api);
    let body = RegisterBody {
        mac: &info.mac,
        model: &info.model,
        brand: &info.brand,
        openwisp_device_id: (!info.device_id.is_empty()).then_some(info.device_id.as_str()),
    };

    let response = http
        .post_json(&url, None, &body)
        .await
        .context("registration request failed")?;
    if !response.is_success() {
        anyhow::bail!("registration rejected with status {}", response.status);
    }

    let registration: Registration =
        response.json().context("failed to parse registration response")?;
    store.save(store::REGISTRATION_FILE, &registration)?;
    tracing::info!(device = %registration.wayru_device_id, "device registered");
    Ok(registration)
}
