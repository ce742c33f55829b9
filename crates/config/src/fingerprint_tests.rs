// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

pub(crate) fn sample_doc() -> Value {
    json!({
        "wireless": { "ssid": "wayru", "channel": 6 },
        "opennds": { "gatewayname": "wayru", "maxclients": 250 },
        "wayru": [
            { "meta_config": "wayru-agent", "access_interval": 21600 },
            { "meta_config": "wayru-collector", "batch_size": 50 },
            { "meta_config": "wayru-config", "interval": 300 },
        ],
    })
}

#[test]
fn canonicalisation_is_key_order_independent() {
    let a = json!({ "b": 1, "a": { "y": 2, "x": 3 } });
    let b = json!({ "a": { "x": 3, "y": 2 }, "b": 1 });
    assert_eq!(canonical_json(&a), canonical_json(&b));
    assert_eq!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn different_content_hashes_differently() {
    let a = json!({ "ssid": "wayru" });
    let b = json!({ "ssid": "other" });
    assert_ne!(fingerprint(&a), fingerprint(&b));
}

#[test]
fn sections_extract_from_their_homes() {
    let doc = sample_doc();
    assert_eq!(
        extract_section(&doc, Section::Wireless),
        Some(json!({ "ssid": "wayru", "channel": 6 }))
    );
    let agent = extract_section(&doc, Section::Agent).unwrap();
    assert_eq!(agent["meta_config"], "wayru-agent");
    let collector = extract_section(&doc, Section::Collector).unwrap();
    assert_eq!(collector["batch_size"], 50);
}

#[test]
fn missing_sections_extract_as_none() {
    let doc = json!({ "wireless": {} });
    assert!(extract_section(&doc, Section::Opennds).is_none());
    assert!(extract_section(&doc, Section::Agent).is_none());
}

#[test]
fn hash_store_round_trips_and_resets() {
    let dir = tempfile::tempdir().unwrap();
    let store = HashStore::new(dir.path());

    assert!(store.load(Section::Wireless).is_none());
    store.save(Section::Wireless, "abc123").unwrap();
    assert_eq!(store.load(Section::Wireless).as_deref(), Some("abc123"));

    store.reset(Section::Wireless);
    assert!(store.load(Section::Wireless).is_none());
}

#[test]
fn first_sight_marks_every_present_section_affected() {
    let dir = tempfile::tempdir().unwrap();
    let store = HashStore::new(dir.path());
    let affected = affected_sections(&sample_doc(), &store);
    assert_eq!(affected.len(), 5);
}

#[test]
fn only_changed_sections_are_affected() {
    let dir = tempfile::tempdir().unwrap();
    let store = HashStore::new(dir.path());
    let doc = sample_doc();

    for item in affected_sections(&doc, &store) {
        store.save(item.section, &item.new_hash).unwrap();
    }
    assert!(affected_sections(&doc, &store).is_empty());

    let mut changed = doc.clone();
    changed["wireless"]["channel"] = serde_json::json!(11);
    let affected = affected_sections(&changed, &store);
    assert_eq!(affected.len(), 1);
    assert_eq!(affected[0].section, Section::Wireless);
}

#[test]
fn hash_file_names_follow_the_section() {
    assert_eq!(Section::Wireless.hash_file(), "wireless.hash");
    assert_eq!(Section::Agent.hash_file(), "wayru-agent.hash");
    assert_eq!(Section::Agent.rollback_file(), "agent_config.json");
    assert_eq!(Section::ConfigDaemon.rollback_file(), "config_config.json");
}
