// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Config-sync daemon configuration.

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
pub struct SyncConfig {
    pub enabled: bool,
    pub dev_env: bool,
    /// Remote configuration endpoint.
    pub config_endpoint: String,
    /// Poll cadence (s).
    pub sync_interval: u64,
    pub hash_dir: PathBuf,
    pub rollback_dir: PathBuf,
    pub renderer_script: PathBuf,
    pub temp_path: PathBuf,
    pub log_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dev_env: false,
            config_endpoint: "https://api.wayru.io/api/device-config".into(),
            sync_interval: 300,
            hash_dir: PathBuf::from("/etc/wayru-config/hashes"),
            rollback_dir: PathBuf::from("/etc/wayru-config/rollback"),
            renderer_script: PathBuf::from("/usr/share/wayru-os-services/scripts/render-uci.sh"),
            temp_path: PathBuf::from("/tmp"),
            log_path: None,
        }
    }
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Read { path: path.to_path_buf(), source: e }),
        };
        toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse { path: path.to_path_buf(), source: e })
    }
}
