// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Access-token lifecycle: acquire, persist, refresh, propagate.
//!
//! The token lives in a shared cell mutated only by this service between
//! scheduler ticks; MQTT credentials and the IPC server read it through
//! the cell or through refresh subscribers.

use crate::config::AgentConfig;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{store, AccessToken, Clock, CredentialStore, Registration, Scheduler, SystemClock,
    EXPIRY_MARGIN_SECS};
use wayru_http::HttpClient;

/// Retry delay after any refresh failure, regardless of access_interval.
const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Token cell shared with MQTT and the IPC server.
pub type SharedToken = Arc<Mutex<AccessToken>>;

/// Refresh subscribers receive each new token before the next refresh is
/// scheduled.
pub type TokenSubscriber = Box<dyn FnMut(&str) + Send>;

#[derive(Serialize)]
struct TokenRequestBody<'a> {
    wayru_device_id: &'a str,
    access_key: &'a str,
}

async fn request_access_token(
    http: &HttpClient,
    accounting_api: &str,
    registration: &Registration,
) -> Result<AccessToken> {
    let url = format!("{accounting_api}/access");
    let body = TokenRequestBody {
        wayru_device_id: &registration.wayru_device_id,
        access_key: &registration.access_key,
    };
    let response = http.post_json(&url, None, &body).await.context("token request failed")?;
    if !response.is_success() {
        anyhow::bail!("token request rejected with status {}", response.status);
    }
    response.json().context("failed to parse access token response")
}

/// On init: adopt the persisted token when it is clear of the expiry
/// margin; otherwise mint a fresh one and persist it.
pub async fn init_access_token(
    store: &CredentialStore,
    http: &HttpClient,
    config: &AgentConfig,
    registration: &Registration,
    clock: &impl Clock,
) -> Result<AccessToken> {
    if let Some(token) = store.load::<AccessToken>(store::ACCESS_TOKEN_FILE)? {
        if token.is_usable(clock.epoch_secs()) {
            tracing::info!("adopted persisted access token");
            return Ok(token);
        }
    }

    let token = request_access_token(http, &config.accounting_api, registration).await?;
    store.save(store::ACCESS_TOKEN_FILE, &token)?;
    tracing::info!("access token initialized");
    Ok(token)
}

/// Delay until the next refresh: the steady-state interval, or sooner if
/// the token would cross its expiry margin first.
pub fn calculate_next_delay(expires_at: i64, access_interval_secs: u64, now: i64) -> Duration {
    let next_run = expires_at - EXPIRY_MARGIN_SECS;
    if next_run <= now {
        return Duration::ZERO;
    }
    let until_margin = (next_run - now) as u64;
    Duration::from_secs(until_margin.min(access_interval_secs))
}

pub struct TokenServiceDeps {
    pub scheduler: Arc<Scheduler>,
    pub http: HttpClient,
    pub store: CredentialStore,
    pub accounting_api: String,
    pub access_interval: u64,
    pub registration: Arc<Registration>,
    pub token: SharedToken,
    pub subscribers: Arc<Mutex<Vec<TokenSubscriber>>>,
    pub clock: SystemClock,
}

struct RefreshCtx {
    deps: TokenServiceDeps,
    task_id: Mutex<wayru_core::TaskId>,
}

/// Start the periodic refresh. Returns the shared context whose pending
/// task the shutdown registry can cancel.
pub fn start(deps: TokenServiceDeps) -> Arc<dyn Fn() + Send + Sync> {
    let initial = {
        let token = deps.token.lock();
        calculate_next_delay(
            token.expires_at_seconds,
            deps.access_interval,
            deps.clock.epoch_secs(),
        )
    };
    tracing::info!(delay_s = initial.as_secs(), "starting access token service");

    let ctx = Arc::new(RefreshCtx { deps, task_id: Mutex::new(0) });
    schedule_refresh(Arc::clone(&ctx), initial);

    // Cleanup closure for the shutdown registry
    Arc::new(move || {
        let id = *ctx.task_id.lock();
        if id != 0 {
            ctx.deps.scheduler.cancel(id);
        }
    })
}

fn schedule_refresh(ctx: Arc<RefreshCtx>, delay: Duration) {
    let scheduler = Arc::clone(&ctx.deps.scheduler);
    let ctx_for_task = Arc::clone(&ctx);
    let id = scheduler.schedule_once(delay, move || {
        let ctx = Arc::clone(&ctx_for_task);
        Box::pin(async move {
            let next = run_refresh(&ctx).await;
            schedule_refresh(Arc::clone(&ctx), next);
        })
    });
    *ctx.task_id.lock() = id.unwrap_or(0);
}

/// One refresh cycle; returns the delay until the next one.
async fn run_refresh(ctx: &RefreshCtx) -> Duration {
    let deps = &ctx.deps;
    let fresh =
        match request_access_token(&deps.http, &deps.accounting_api, &deps.registration).await {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(error = %e, "failed to request access token");
                return REFRESH_RETRY_DELAY;
            }
        };

    if let Err(e) = deps.store.save(store::ACCESS_TOKEN_FILE, &fresh) {
        tracing::error!(error = %e, "failed to save access token");
        return REFRESH_RETRY_DELAY;
    }

    let expires_at = fresh.expires_at_seconds;
    let token_str = fresh.token.clone();
    *deps.token.lock() = fresh;

    // Deliver the new token to every subscriber before re-arming
    for subscriber in deps.subscribers.lock().iter_mut() {
        subscriber(&token_str);
    }
    tracing::info!("access token refreshed");

    calculate_next_delay(expires_at, deps.access_interval, deps.clock.epoch_secs())
}

#[cfg(test)]
#[path = "access_token_tests.rs"]
mod tests;
