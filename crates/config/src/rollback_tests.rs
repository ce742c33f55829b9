// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn full_config_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = RollbackStore::new(dir.path());
    assert!(store.load_full().is_none());

    let doc = json!({ "wireless": { "ssid": "wayru" } });
    store.save_full(&doc).unwrap();
    assert_eq!(store.load_full(), Some(doc));
}

#[test]
fn sections_round_trip_under_their_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = RollbackStore::new(dir.path());

    let value = json!({ "meta_config": "wayru-agent", "access_interval": 60 });
    store.save_section(Section::Agent, &value).unwrap();
    assert!(dir.path().join("agent_config.json").exists());
    assert_eq!(store.load_section(Section::Agent), Some(value));
    assert!(store.load_section(Section::Wireless).is_none());
}

#[test]
fn oversized_payloads_are_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = RollbackStore::new(dir.path());

    let huge = json!({ "blob": "x".repeat(MAX_ROLLBACK_BYTES + 1) });
    store.save_full(&huge).unwrap();
    assert!(store.load_full().is_none());
}

#[test]
fn wrapped_sections_mirror_the_document_shape() {
    let wireless = json!({ "ssid": "wayru" });
    assert_eq!(wrap_section(Section::Wireless, &wireless), json!({ "wireless": { "ssid": "wayru" } }));

    let agent = json!({ "meta_config": "wayru-agent" });
    assert_eq!(
        wrap_section(Section::Agent, &agent),
        json!({ "wayru": [ { "meta_config": "wayru-agent" } ] })
    );
}
