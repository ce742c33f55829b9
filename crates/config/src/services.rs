// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service restart collaborator.
//!
//! Restart order is strict: wifi reload, opennds, wayru-collector,
//! wayru-agent, wayru-config, with settling pauses between services.

use crate::fingerprint::Section;
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait ServiceControl: Send + Sync {
    /// Restart (or reload) one service. True on success.
    async fn restart(&self, section: Section) -> bool;
}

/// What happened to each affected service, in restart order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RestartReport {
    pub succeeded: Vec<Section>,
    pub failed: Vec<Section>,
}

impl RestartReport {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Restart the affected services in the strict order.
pub async fn restart_services(
    control: &dyn ServiceControl,
    affected: &[Section],
) -> RestartReport {
    let mut report = RestartReport::default();
    for section in Section::ALL {
        if !affected.contains(&section) {
            continue;
        }
        if control.restart(section).await {
            tracing::info!(service = section.name(), "service restarted");
            report.succeeded.push(section);
        } else {
            tracing::error!(service = section.name(), "service restart failed");
            report.failed.push(section);
        }
    }
    report
}

/// Production control: wifi reload plus init.d reload-then-restart.
pub struct InitdServiceControl {
    dev_mode: bool,
}

impl InitdServiceControl {
    pub fn new(dev_mode: bool) -> Self {
        Self { dev_mode }
    }

    async fn run(command: &str) -> bool {
        match tokio::process::Command::new("sh").arg("-c").arg(command).status().await {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::error!(command, error = %e, "failed to spawn restart command");
                false
            }
        }
    }
}

#[async_trait]
impl ServiceControl for InitdServiceControl {
    async fn restart(&self, section: Section) -> bool {
        if self.dev_mode {
            tracing::info!(service = section.name(), "dev mode: would restart");
            return true;
        }
        let ok = match section {
            Section::Wireless => {
                let ok = Self::run("wifi reload").await;
                // Allow the radio to stabilize
                tokio::time::sleep(Duration::from_secs(1)).await;
                ok
            }
            other => {
                let name = other.name();
                let reloaded = Self::run(&format!("/etc/init.d/{name} reload")).await;
                let ok = if reloaded {
                    true
                } else {
                    tracing::warn!(service = name, "reload failed, trying restart");
                    Self::run(&format!("/etc/init.d/{name} restart")).await
                };
                tokio::time::sleep(Duration::from_secs(2)).await;
                ok
            }
        };
        ok
    }
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod tests;
