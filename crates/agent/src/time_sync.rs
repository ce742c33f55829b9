// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic one-shot NTP sync against the configured server.

use crate::config::AgentConfig;
use crate::shell::run_status;
use std::time::Duration;
use wayru_core::Scheduler;

pub fn start(scheduler: &Scheduler, config: &AgentConfig) -> Option<wayru_core::TaskId> {
    if config.dev_env || config.time_sync_server.is_empty() {
        tracing::info!("time sync service not started");
        return None;
    }
    let interval = Duration::from_secs(config.time_sync_interval);
    let server = config.time_sync_server.clone();
    scheduler.schedule_repeating(Duration::from_secs(30), interval, move || {
        let server = server.clone();
        Box::pin(async move {
            let command = format!("ntpd -n -q -p {server}");
            match run_status(&command).await {
                Ok(0) => tracing::debug!(server = %server, "time synchronized"),
                Ok(code) => tracing::warn!(server = %server, code, "time sync failed"),
                Err(e) => tracing::error!(error = %e, "time sync command failed"),
            }
        })
    })
}
