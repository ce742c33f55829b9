// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Collector configuration.

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

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    pub enabled: bool,
    /// Pool and queue capacity.
    pub queue_size: usize,
    pub batch_size: usize,
    pub batch_timeout_secs: u64,
    pub http_retries: u32,
    pub retry_delay_secs: u64,
    pub http_timeout_secs: u64,
    /// Collect-task cadence.
    pub collect_interval_secs: u64,
    pub logs_endpoint: String,
    pub temp_path: PathBuf,
    pub log_path: Option<PathBuf>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            queue_size: 256,
            batch_size: 50,
            batch_timeout_secs: 10,
            http_retries: 2,
            retry_delay_secs: 2,
            http_timeout_secs: 30,
            collect_interval_secs: 1,
            logs_endpoint: "https://logs.wayru.io/api/logs".into(),
            temp_path: PathBuf::from("/tmp"),
            log_path: None,
        }
    }
}

impl CollectorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Read { path: path.to_path_buf(), source: e }),
        };
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_size == 0 {
            return Err(ConfigError::Invalid("queue_size must be positive".into()));
        }
        if self.batch_size == 0 || self.batch_size > self.queue_size {
            return Err(ConfigError::Invalid(
                "batch_size must be positive and no larger than queue_size".into(),
            ));
        }
        if self.logs_endpoint.is_empty() {
            return Err(ConfigError::Invalid("logs_endpoint must be set".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
