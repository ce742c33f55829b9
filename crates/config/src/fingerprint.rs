// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Section fingerprints.
//!
//! The remote document splits into named sections; each gets a content
//! hash over a canonical rendering, persisted per section so change
//! detection survives restarts.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Configuration sections, in service-restart order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Wireless,
    Opennds,
    Collector,
    Agent,
    ConfigDaemon,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Wireless,
        Section::Opennds,
        Section::Collector,
        Section::Agent,
        Section::ConfigDaemon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Section::Wireless => "wireless",
            Section::Opennds => "opennds",
            Section::Agent => "wayru-agent",
            Section::Collector => "wayru-collector",
            Section::ConfigDaemon => "wayru-config",
        }
    }

    pub fn hash_file(&self) -> String {
        format!("{}.hash", self.name())
    }

    pub fn rollback_file(&self) -> &'static str {
        match self {
            Section::Wireless => "wireless_config.json",
            Section::Opennds => "opennds_config.json",
            Section::Agent => "agent_config.json",
            Section::Collector => "collector_config.json",
            Section::ConfigDaemon => "config_config.json",
        }
    }

    /// The `meta_config` key identifying this service in the `wayru`
    /// array, for the per-service sections.
    fn meta_config(&self) -> Option<&'static str> {
        match self {
            Section::Wireless | Section::Opennds => None,
            other => Some(other.name()),
        }
    }
}

/// Deterministic rendering: objects serialize with sorted keys.
pub fn canonical_json(value: &Value) -> String {
    fn write(value: &Value, out: &mut String) {
        match value {
            Value::Object(map) => {
                out.push('{');
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str(&Value::String((*key).clone()).to_string());
                    out.push(':');
                    if let Some(child) = map.get(*key) {
                        write(child, out);
                    }
                }
                out.push('}');
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write(item, out);
                }
                out.push(']');
            }
            other => out.push_str(&other.to_string()),
        }
    }
    let mut out = String::new();
    write(value, &mut out);
    out
}

pub fn fingerprint(value: &Value) -> String {
    format!("{:x}", Sha256::digest(canonical_json(value).as_bytes()))
}

/// Carve one section out of the remote document.
pub fn extract_section(doc: &Value, section: Section) -> Option<Value> {
    match section.meta_config() {
        None => doc.get(section.name()).cloned(),
        Some(meta) => doc
            .get("wayru")?
            .as_array()?
            .iter()
            .find(|entry| entry.get("meta_config").and_then(Value::as_str) == Some(meta))
            .cloned(),
    }
}

/// Per-section hash files under the hash directory.
pub struct HashStore {
    dir: PathBuf,
}

impl HashStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, section: Section) -> PathBuf {
        self.dir.join(section.hash_file())
    }

    pub fn load(&self, section: Section) -> Option<String> {
        std::fs::read_to_string(self.path(section))
            .ok()
            .map(|contents| contents.trim().to_string())
            .filter(|hash| !hash.is_empty())
    }

    pub fn save(&self, section: Section, hash: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path(section), hash)
    }

    /// Forget a section so the next cycle re-reads it from disk.
    pub fn reset(&self, section: Section) {
        let _ = std::fs::remove_file(self.path(section));
    }

    pub fn reset_all(&self) {
        for section in Section::ALL {
            self.reset(section);
        }
    }
}

/// A section whose fingerprint differs from the persisted one.
pub struct AffectedSection {
    pub section: Section,
    pub value: Value,
    pub new_hash: String,
}

/// Compare every section of `doc` against the hash store.
pub fn affected_sections(doc: &Value, hashes: &HashStore) -> Vec<AffectedSection> {
    let mut affected = Vec::new();
    for section in Section::ALL {
        let Some(value) = extract_section(doc, section) else {
            continue;
        };
        let new_hash = fingerprint(&value);
        if hashes.load(section).as_deref() != Some(new_hash.as_str()) {
            affected.push(AffectedSection { section, value, new_hash });
        }
    }
    affected
}

#[cfg(test)]
#[path = "fingerprint_tests.rs"]
mod tests;
