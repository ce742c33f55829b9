// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential store: small JSON blobs persisted under the data directory.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Seconds before expiry at which a token stops being considered usable.
pub const EXPIRY_MARGIN_SECS: i64 = 3600;

pub const ACCESS_TOKEN_FILE: &str = "access-token.json";
pub const REGISTRATION_FILE: &str = "registration.json";

/// Short-lived bearer credential issued by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    pub issued_at_seconds: i64,
    pub expires_at_seconds: i64,
}

impl AccessToken {
    /// Usable means not merely unexpired but clear of the refresh margin.
    pub fn is_usable(&self, now_secs: i64) -> bool {
        now_secs < self.expires_at_seconds - EXPIRY_MARGIN_SECS
    }

    pub fn is_valid(&self, now_secs: i64) -> bool {
        !self.token.is_empty() && now_secs < self.expires_at_seconds
    }
}

/// Per-device identity established at registration; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub wayru_device_id: String,
    pub access_key: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persist/load small JSON files under a data directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    data_dir: PathBuf,
}

impl CredentialStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// Load a JSON file. `Ok(None)` when the file does not exist yet.
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.path(name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io { path, source: e }),
        };
        let value =
            serde_json::from_str(&contents).map_err(|e| StoreError::Json { path, source: e })?;
        Ok(Some(value))
    }

    /// Write a JSON file, creating the data directory if needed.
    pub fn save<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| StoreError::Io { path: self.data_dir.clone(), source: e })?;
        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| StoreError::Json { path: path.clone(), source: e })?;
        std::fs::write(&path, json).map_err(|e| StoreError::Io { path, source: e })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
