// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rollback store: the last fully-applied configuration, whole and per
//! section, used as the source for both rollback tiers.

use crate::fingerprint::Section;
use serde_json::Value;
use std::path::PathBuf;

/// Per-file size bound.
pub const MAX_ROLLBACK_BYTES: usize = 2 * 1024 * 1024;

const FULL_CONFIG_FILE: &str = "config.json";

pub struct RollbackStore {
    dir: PathBuf,
}

impl RollbackStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn write(&self, name: &str, value: &Value) -> std::io::Result<()> {
        let serialized = value.to_string();
        if serialized.len() > MAX_ROLLBACK_BYTES {
            tracing::warn!(file = name, bytes = serialized.len(), "rollback payload too large");
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(name), serialized)
    }

    fn read(&self, name: &str) -> Option<Value> {
        let contents = std::fs::read_to_string(self.dir.join(name)).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn save_full(&self, doc: &Value) -> std::io::Result<()> {
        self.write(FULL_CONFIG_FILE, doc)
    }

    pub fn load_full(&self) -> Option<Value> {
        self.read(FULL_CONFIG_FILE)
    }

    pub fn save_section(&self, section: Section, value: &Value) -> std::io::Result<()> {
        self.write(section.rollback_file(), value)
    }

    pub fn load_section(&self, section: Section) -> Option<Value> {
        self.read(section.rollback_file())
    }
}

/// Wrap a last-good section in a minimal container mirroring the input
/// document shape, so the renderer sees what it always sees.
pub fn wrap_section(section: Section, value: &Value) -> Value {
    match section {
        Section::Wireless => serde_json::json!({ "wireless": value }),
        Section::Opennds => serde_json::json!({ "opennds": value }),
        _ => serde_json::json!({ "wayru": [value] }),
    }
}

#[cfg(test)]
#[path = "rollback_tests.rs"]
mod tests;
