// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration.
//!
//! Loaded once at startup from a TOML file; every field has a default so
//! a missing file yields a runnable dev configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentConfig {
    /// Dev shortcuts: skip privileged I/O, use synthetic facts.
    pub dev_env: bool,
    /// When false the process exits 0 immediately.
    pub enabled: bool,

    pub main_api: String,
    pub accounting_api: String,
    pub devices_api: String,

    /// Steady-state token refresh interval (s).
    pub access_interval: u64,
    pub device_status_interval: u64,

    pub monitoring_enabled: bool,
    pub monitoring_interval_min: u64,
    pub monitoring_interval_max: u64,

    pub firmware_update_enabled: bool,
    pub firmware_update_interval: u64,

    pub package_update_enabled: bool,
    pub package_update_interval: u64,

    pub speed_test_enabled: bool,
    pub speed_test_interval_min: u64,
    pub speed_test_interval_max: u64,
    pub speed_test_latency_attempts: u32,

    pub device_context_interval: u64,

    pub mqtt_broker_url: String,
    pub mqtt_keepalive: u64,
    pub mqtt_task_interval: u64,

    pub reboot_enabled: bool,
    pub reboot_interval: u64,

    pub diagnostic_interval: u64,
    pub nds_interval: u64,

    pub time_sync_server: String,
    pub time_sync_interval: u64,

    pub data_path: PathBuf,
    pub scripts_path: PathBuf,
    pub temp_path: PathBuf,

    /// Log file; stderr only when unset.
    pub log_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            dev_env: false,
            enabled: true,
            main_api: "https://api.wayru.io".into(),
            accounting_api: "https://accounting.wayru.io".into(),
            devices_api: "https://devices.wayru.io".into(),
            access_interval: 6 * 3600,
            device_status_interval: 300,
            monitoring_enabled: true,
            monitoring_interval_min: 5 * 60,
            monitoring_interval_max: 10 * 60,
            firmware_update_enabled: true,
            firmware_update_interval: 6 * 3600,
            package_update_enabled: true,
            package_update_interval: 3600,
            speed_test_enabled: false,
            speed_test_interval_min: 6 * 3600,
            speed_test_interval_max: 12 * 3600,
            speed_test_latency_attempts: 5,
            device_context_interval: 3600,
            mqtt_broker_url: "mqtts://mqtt.wayru.io".into(),
            mqtt_keepalive: 60,
            mqtt_task_interval: 1,
            reboot_enabled: false,
            reboot_interval: 7 * 24 * 3600,
            diagnostic_interval: 600,
            nds_interval: 5,
            time_sync_server: "pool.ntp.org".into(),
            time_sync_interval: 12 * 3600,
            data_path: PathBuf::from("/etc/wayru"),
            scripts_path: PathBuf::from("/usr/share/wayru-os-services/scripts"),
            temp_path: PathBuf::from("/tmp"),
            log_path: None,
        }
    }
}

impl AgentConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Read { path: path.to_path_buf(), source: e }),
        };
        toml::from_str(&contents).map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })
    }

    /// Shared temp directory for the FIFO and the IPC socket.
    pub fn runtime_dir(&self) -> PathBuf {
        self.temp_path.join("wayru-os-services")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
