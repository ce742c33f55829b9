// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parses_a_complete_site() {
    let body = r#"{"site":{"id":"s1","name":"Lobby","mac":"AA:BB:CC"}}"#;
    assert_eq!(
        parse_site(body),
        Some(Site { id: "s1".into(), name: "Lobby".into(), mac: "AA:BB:CC".into() })
    );
}

#[test]
fn missing_site_is_none() {
    // Devices that are not part of a site get a context without one
    assert_eq!(parse_site(r#"{"device":"d1"}"#), None);
    assert_eq!(parse_site(r#"{"site":{"id":"s1"}}"#), None);
    assert_eq!(parse_site("not json"), None);
}
