// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn methods_serialize_with_snake_case_tags() {
    let json = serde_json::to_value(Request::GetAccessToken).unwrap();
    assert_eq!(json["method"], "get_access_token");

    let json = serde_json::to_value(Request::Ping).unwrap();
    assert_eq!(json["method"], "ping");
}

#[test]
fn methods_deserialize_from_tags() {
    let request: Request =
        serde_json::from_str(r#"{"method":"get_device_info"}"#).unwrap();
    assert_eq!(request, Request::GetDeviceInfo);

    let request: Request = serde_json::from_str(r#"{"method":"get_status"}"#).unwrap();
    assert_eq!(request, Request::GetStatus);
}

#[test]
fn unknown_method_is_rejected() {
    let result: Result<Request, _> = serde_json::from_str(r#"{"method":"reboot"}"#);
    assert!(result.is_err());
}
