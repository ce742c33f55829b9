// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostics: bootstrap reachability gate and the periodic sweep that
//! drives the LED collaborator.

use crate::config::AgentConfig;
use crate::shell::run_script;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::Scheduler;
use wayru_http::HttpClient;

const LED_SCRIPT: &str = "set-led.sh";

/// LED collaborator. Production writes GPIO through a helper script;
/// dev mode logs.
pub trait LedControl: Send + Sync {
    fn update(&self, ok: bool, reason: &str);
}

pub struct LogLed;

impl LedControl for LogLed {
    fn update(&self, ok: bool, reason: &str) {
        tracing::info!(ok, reason, "led status");
    }
}

pub struct ScriptLed {
    scripts_path: std::path::PathBuf,
}

impl ScriptLed {
    pub fn new(scripts_path: std::path::PathBuf) -> Self {
        Self { scripts_path }
    }
}

impl LedControl for ScriptLed {
    fn update(&self, ok: bool, reason: &str) {
        tracing::info!(ok, reason, "led status");
        let command = format!(
            "{}/{LED_SCRIPT} {}",
            self.scripts_path.display(),
            if ok { "on" } else { "off" }
        );
        // Fire and forget; the sweep must not block on GPIO
        tokio::spawn(async move {
            let _ = run_script(&command).await;
        });
    }
}

pub fn led_for(config: &AgentConfig) -> Arc<dyn LedControl> {
    if config.dev_env {
        Arc::new(LogLed)
    } else {
        Arc::new(ScriptLed::new(config.scripts_path.clone()))
    }
}

async fn dns_resolves(host: &str) -> bool {
    tokio::net::lookup_host((host, 443)).await.map(|mut a| a.next().is_some()).unwrap_or(false)
}

fn api_host(url: &str) -> &str {
    url.trim_start_matches("https://").trim_start_matches("http://").split('/').next().unwrap_or("")
}

/// Bootstrap gate: DNS, internet, and control-plane reachability. A
/// device that cannot reach the plane must not start services.
pub async fn run_bootstrap_checks(http: &HttpClient, config: &AgentConfig) -> bool {
    if config.dev_env {
        return true;
    }

    let host = api_host(&config.accounting_api);
    if !dns_resolves(host).await {
        tracing::error!(host, "DNS resolution failed");
        return false;
    }

    match http.get(&config.accounting_api, None).await {
        Ok(_) => {
            tracing::info!("control plane reachable");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "control plane unreachable");
            false
        }
    }
}

pub struct DiagnosticDeps {
    pub http: HttpClient,
    pub accounting_api: String,
    pub led: Arc<dyn LedControl>,
}

/// Periodic sweep: reachability drives the LED.
pub fn start(
    scheduler: &Scheduler,
    config: &AgentConfig,
    deps: DiagnosticDeps,
) -> Option<wayru_core::TaskId> {
    let interval = Duration::from_secs(config.diagnostic_interval);
    let deps = Arc::new(deps);
    scheduler.schedule_repeating(interval, interval, move || {
        let deps = Arc::clone(&deps);
        Box::pin(async move {
            let host = api_host(&deps.accounting_api).to_string();
            let ok = dns_resolves(&host).await
                && deps.http.get(&deps.accounting_api, None).await.is_ok();
            deps.led.update(ok, if ok { "diagnostics passed" } else { "diagnostics failed" });
        })
    })
}

#[cfg(test)]
#[path = "diagnostic_tests.rs"]
mod tests;
