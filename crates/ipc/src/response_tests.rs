// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_info() -> DeviceInfo {
    DeviceInfo {
        device_id: "dev-1".into(),
        mac: "AA:BB:CC:DD:EE:FF".into(),
        name: "ap-lobby".into(),
        brand: "GL.iNet".into(),
        model: "GL-MT300N".into(),
        arch: "mips_24kc".into(),
        os_name: "OpenWrt".into(),
        os_version: "23.05".into(),
        os_services_version: "1.2.3".into(),
        public_ip: "203.0.113.9".into(),
        did_public_key: "z6Mk...".into(),
    }
}

/// Collaborators parse these replies by field name; renames break them.
#[test]
fn access_token_reply_field_names() {
    let reply = AccessTokenReply { token: "t1".into(), issued_at: 100, expires_at: 3700, valid: 1 };
    let json = serde_json::to_value(Response::AccessToken(reply)).unwrap();
    assert_eq!(json["token"], "t1");
    assert_eq!(json["issued_at"], 100);
    assert_eq!(json["expires_at"], 3700);
    assert_eq!(json["valid"], 1);
}

#[test]
fn device_info_reply_field_names() {
    let json = serde_json::to_value(DeviceInfoReply::from(&sample_info())).unwrap();
    for field in [
        "device_id",
        "mac",
        "name",
        "brand",
        "model",
        "arch",
        "public_ip",
        "os_name",
        "os_version",
        "os_services_version",
        "did_public_key",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}");
    }
}

#[test]
fn registration_reply_field_names() {
    let reply = RegistrationReply { wayru_device_id: "d1".into(), access_key: "k1".into() };
    let json = serde_json::to_value(reply).unwrap();
    assert_eq!(json["wayru_device_id"], "d1");
    assert_eq!(json["access_key"], "k1");
}

#[test]
fn status_reply_field_names() {
    let reply = StatusReply {
        service: "wayru-agent".into(),
        running: 1,
        access_token_available: 1,
        device_info_available: 1,
        registration_available: 0,
    };
    let json = serde_json::to_value(reply).unwrap();
    assert_eq!(json["service"], "wayru-agent");
    assert_eq!(json["running"], 1);
    assert_eq!(json["registration_available"], 0);
}

#[test]
fn error_response_shape() {
    let json =
        serde_json::to_value(Response::Error { error: "not ready".into(), code: -2 }).unwrap();
    assert_eq!(json["error"], "not ready");
    assert_eq!(json["code"], -2);
}
