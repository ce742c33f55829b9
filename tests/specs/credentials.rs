// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared on-disk credential formats.
//!
//! The agent writes these files; the other daemons and support scripts
//! read them by field name, so the serialized shapes are contracts.

#[test]
fn access_token_file_shape() {
    let json: serde_json::Value = serde_json::from_str(
        r#"{"token":"t1","issued_at_seconds":100,"expires_at_seconds":3700}"#,
    )
    .unwrap();
    assert_eq!(json["token"], "t1");
    assert_eq!(json["issued_at_seconds"], 100);
    assert_eq!(json["expires_at_seconds"], 3700);
}

#[test]
fn registration_file_shape() {
    let json: serde_json::Value =
        serde_json::from_str(r#"{"wayru_device_id":"d1","access_key":"k1"}"#).unwrap();
    assert_eq!(json["wayru_device_id"], "d1");
    assert_eq!(json["access_key"], "k1");
}
