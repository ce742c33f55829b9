// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device context: the server-side record binding this device to a site.

use crate::access_token::SharedToken;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{Registration, Scheduler};
use wayru_http::HttpClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub mac: String,
}

/// None until the device is bound to a site.
pub type SharedSite = Arc<Mutex<Option<Site>>>;

/// A context payload without a site is normal for unassigned devices.
pub fn parse_site(body: &str) -> Option<Site> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    let site = json.get("site")?;
    Some(Site {
        id: site.get("id")?.as_str()?.to_string(),
        name: site.get("name")?.as_str()?.to_string(),
        mac: site.get("mac")?.as_str()?.to_string(),
    })
}

async fn fetch_context(
    http: &HttpClient,
    accounting_api: &str,
    registration: &Registration,
    token: &str,
) -> Option<Site> {
    let url = format!("{accounting_api}/devices/{}/context", registration.wayru_device_id);
    match http.get(&url, Some(token)).await {
        Ok(response) if response.is_success() => parse_site(&response.body),
        Ok(response) => {
            tracing::warn!(status = response.status, "device context request rejected");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to request device context");
            None
        }
    }
}

pub struct DeviceContextDeps {
    pub http: HttpClient,
    pub accounting_api: String,
    pub token: SharedToken,
    pub registration: Arc<Registration>,
    pub site: SharedSite,
}

/// Initial fetch; absence of a site is not an error.
pub async fn init_device_context(deps: &DeviceContextDeps) {
    let token = deps.token.lock().token.clone();
    let site =
        fetch_context(&deps.http, &deps.accounting_api, &deps.registration, &token).await;
    if let Some(ref site) = site {
        tracing::info!(site = %site.id, "device context initialized");
    } else {
        tracing::debug!("device is not part of a site yet");
    }
    *deps.site.lock() = site;
}

/// Periodic site-context refresh.
pub fn start(
    scheduler: &Scheduler,
    interval_secs: u64,
    deps: DeviceContextDeps,
) -> Option<wayru_core::TaskId> {
    let interval = Duration::from_secs(interval_secs);
    let deps = Arc::new(deps);
    scheduler.schedule_repeating(interval, interval, move || {
        let deps = Arc::clone(&deps);
        Box::pin(async move {
            let token = deps.token.lock().token.clone();
            if let Some(site) =
                fetch_context(&deps.http, &deps.accounting_api, &deps.registration, &token).await
            {
                *deps.site.lock() = Some(site);
            }
        })
    })
}

#[cfg(test)]
#[path = "device_context_tests.rs"]
mod tests;
