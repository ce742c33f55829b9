// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled reboot.

use crate::config::AgentConfig;
use crate::shell::run_status;
use std::time::Duration;
use wayru_core::Scheduler;

pub fn start(scheduler: &Scheduler, config: &AgentConfig) -> Option<wayru_core::TaskId> {
    if !config.reboot_enabled {
        tracing::info!("reboot service disabled");
        return None;
    }
    let delay = Duration::from_secs(config.reboot_interval);
    let dev_env = config.dev_env;
    tracing::info!(delay_s = delay.as_secs(), "reboot scheduled");
    scheduler.schedule_once(delay, move || {
        Box::pin(async move {
            if dev_env {
                tracing::info!("dev mode: skipping reboot");
                return;
            }
            tracing::info!("scheduled reboot firing");
            if let Err(e) = run_status("reboot").await {
                tracing::error!(error = %e, "reboot command failed");
            }
        })
    })
}
