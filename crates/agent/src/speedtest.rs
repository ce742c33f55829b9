// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Speed test: run the collaborator script on a randomized cadence and
//! publish its JSON result.

use crate::config::AgentConfig;
use crate::monitoring::draw_interval;
use crate::mqtt::SharedMqtt;
use crate::shell::run_script;
use std::sync::Arc;
use std::time::Duration;
use wayru_core::{Registration, Scheduler};

const SPEEDTEST_SCRIPT: &str = "speedtest.sh";

pub fn result_topic(wayru_device_id: &str) -> String {
    format!("device/{wayru_device_id}/speed-test")
}

pub struct SpeedTestDeps {
    pub registration: Arc<Registration>,
    pub mqtt: SharedMqtt,
    pub scripts_path: std::path::PathBuf,
    pub latency_attempts: u32,
    pub interval_min: u64,
    pub interval_max: u64,
}

pub fn start(scheduler: &Arc<Scheduler>, config: &AgentConfig, deps: SpeedTestDeps) {
    if !config.speed_test_enabled {
        tracing::info!("speed test service disabled");
        return;
    }
    let deps = Arc::new(deps);
    let initial = draw_interval(deps.interval_min, deps.interval_max);
    tracing::info!(interval_s = initial.as_secs(), "starting speed test service");
    schedule_next(Arc::clone(scheduler), deps, initial);
}

fn schedule_next(scheduler: Arc<Scheduler>, deps: Arc<SpeedTestDeps>, delay: Duration) {
    let sched = Arc::clone(&scheduler);
    let _ = scheduler.schedule_once(delay, move || {
        let deps = Arc::clone(&deps);
        let sched = Arc::clone(&sched);
        Box::pin(async move {
            run_speed_test(&deps).await;
            let next = draw_interval(deps.interval_min, deps.interval_max);
            schedule_next(Arc::clone(&sched), deps, next);
        })
    });
}

async fn run_speed_test(deps: &SpeedTestDeps) {
    let command = format!(
        "{}/{SPEEDTEST_SCRIPT} {}",
        deps.scripts_path.display(),
        deps.latency_attempts
    );
    let output = match run_script(&command).await {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(error = %e, "speed test script failed to start");
            return;
        }
    };

    // The script emits one JSON object; anything else is a failed run
    let Ok(result) = serde_json::from_str::<serde_json::Value>(output.trim()) else {
        tracing::error!("speed test produced no valid result");
        return;
    };

    let topic = result_topic(&deps.registration.wayru_device_id);
    tracing::info!(topic = %topic, "publishing speed test result");
    deps.mqtt.lock().await.publish(&topic, result.to_string().into_bytes(), 1).await;
}

#[cfg(test)]
#[path = "speedtest_tests.rs"]
mod tests;
