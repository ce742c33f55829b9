// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monitoring: periodic device metrics published over MQTT.
//!
//! The cadence is drawn uniformly from the configured interval range and
//! re-drawn after every run so a fleet does not phase-lock.

use crate::config::AgentConfig;
use crate::mqtt::SharedMqtt;
use crate::shell::run_script;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{Clock, Registration, Scheduler, SystemClock};

pub const MONITORING_TOPIC: &str = "monitoring/device-data";

pub struct MonitoringDeps {
    pub registration: Arc<Registration>,
    pub mqtt: SharedMqtt,
    pub interval_min: u64,
    pub interval_max: u64,
}

/// Uniform draw from [min, max] seconds; degenerate ranges collapse to min.
pub fn draw_interval(min_secs: u64, max_secs: u64) -> Duration {
    if max_secs <= min_secs {
        return Duration::from_secs(min_secs);
    }
    Duration::from_secs(rand::thread_rng().gen_range(min_secs..=max_secs))
}

async fn collect_metrics(registration: &Registration) -> serde_json::Value {
    let clock = SystemClock;
    let meminfo = std::fs::read_to_string("/proc/meminfo").unwrap_or_default();
    let loadavg = std::fs::read_to_string("/proc/loadavg").unwrap_or_default();
    let wifi_clients = run_script("iw dev 2>/dev/null | grep -c Interface")
        .await
        .ok()
        .and_then(|out| out.trim().parse::<i64>().ok())
        .unwrap_or(0);

    serde_json::json!({
        "device_id": registration.wayru_device_id,
        "timestamp": clock.epoch_secs(),
        "wifi_clients": wifi_clients,
        "memory_total": meminfo_kb(&meminfo, "MemTotal"),
        "memory_free": meminfo_kb(&meminfo, "MemFree"),
        "cpu_load": loadavg.split_whitespace().next().and_then(|v| v.parse::<f64>().ok()).unwrap_or(0.0),
    })
}

pub fn meminfo_kb(contents: &str, key: &str) -> i64 {
    contents
        .lines()
        .find(|line| line.starts_with(key))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse().ok())
        .unwrap_or(0)
}

/// Self-rescheduling monitoring task (one-shot chain so each run draws a
/// fresh interval).
pub fn start(scheduler: &Arc<Scheduler>, config: &AgentConfig, deps: MonitoringDeps) {
    if !config.monitoring_enabled {
        tracing::info!("monitoring service disabled");
        return;
    }
    let deps = Arc::new(deps);
    let initial = draw_interval(deps.interval_min, deps.interval_max);
    tracing::info!(interval_s = initial.as_secs(), "starting monitoring service");
    schedule_next(Arc::clone(scheduler), deps, initial);
}

fn schedule_next(scheduler: Arc<Scheduler>, deps: Arc<MonitoringDeps>, delay: Duration) {
    let sched = Arc::clone(&scheduler);
    let _ = scheduler.schedule_once(delay, move || {
        let deps = Arc::clone(&deps);
        let sched = Arc::clone(&sched);
        Box::pin(async move {
            let metrics = collect_metrics(&deps.registration).await;
            tracing::info!("publishing device data to monitoring/device-data");
            deps.mqtt
                .lock()
                .await
                .publish(MONITORING_TOPIC, metrics.to_string().into_bytes(), 0)
                .await;

            let next = draw_interval(deps.interval_min, deps.interval_max);
            schedule_next(Arc::clone(&sched), deps, next);
        })
    });
}

#[cfg(test)]
#[path = "monitoring_tests.rs"]
mod tests;
