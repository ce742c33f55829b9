// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use wayru_core::AccessToken;

fn reporter(model: &str) -> DeviceStatusReporter {
    DeviceStatusReporter::new(
        HttpClient::new().unwrap(),
        "http://127.0.0.1:1".into(),
        Arc::new(Mutex::new(AccessToken {
            token: "t".into(),
            issued_at_seconds: 0,
            expires_at_seconds: 0,
        })),
        Arc::new(DeviceInfo {
            device_id: "dev-1".into(),
            mac: "AA:BB".into(),
            name: "board".into(),
            brand: "Wayru".into(),
            model: model.into(),
            arch: "arm".into(),
            os_name: "OpenWrt".into(),
            os_version: "23.05".into(),
            os_services_version: "1.0.0".into(),
            public_ip: "1.2.3.4".into(),
            did_public_key: "pk".into(),
        }),
        "d1".into(),
        SharedStatus::new(),
    )
}

#[test]
fn first_body_carries_on_boot_true() {
    let r = reporter("Generic");
    let body = r.body();
    assert_eq!(body["on_boot"], true);
    assert_eq!(body["device_id"], "dev-1");
    assert_eq!(body["wayru_device_id"], "d1");
}

#[test]
fn odyssey_body_omits_device_id() {
    let r = reporter("Odyssey");
    let body = r.body();
    assert!(body.get("device_id").is_none());
    assert_eq!(body["mac"], "AA:BB");
}

#[test]
fn parse_status_reads_device_status_codes() {
    assert_eq!(parse_status(r#"{"deviceStatus":4}"#), Some(DeviceStatus::Ready));
    assert_eq!(parse_status(r#"{"deviceStatus":-1}"#), Some(DeviceStatus::Unknown));
    assert_eq!(parse_status(r#"{"deviceStatus":"ready"}"#), None);
    assert_eq!(parse_status(r#"{"other":1}"#), None);
    assert_eq!(parse_status("not json"), None);
}

#[tokio::test]
async fn failed_report_leaves_on_boot_set_and_status_unknown() {
    // The endpoint is unroutable, so the tick fails at the transport
    let mut r = reporter("Generic");
    r.tick().await;
    assert!(r.on_boot());
    assert_eq!(r.body()["on_boot"], true);
}
