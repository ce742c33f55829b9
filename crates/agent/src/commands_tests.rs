// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn command_topic_embeds_device_id() {
    assert_eq!(command_topic("d1"), "device/d1/command");
}

#[test]
fn firmware_command_needs_no_response_topic() {
    let parsed = parse_command(br#"{"command":"check_firmware_update"}"#);
    assert_eq!(parsed, Some(ParsedCommand::FirmwareCheck));
}

#[test]
fn shell_command_requires_id_and_response_topic() {
    let parsed = parse_command(
        br#"{"command":"ls /tmp","command_id":"abc","response_topic":"device/d1/out"}"#,
    );
    assert_eq!(
        parsed,
        Some(ParsedCommand::Shell {
            command: "ls /tmp".into(),
            command_id: "abc".into(),
            response_topic: "device/d1/out".into(),
        })
    );

    // Missing either field drops the command
    assert_eq!(parse_command(br#"{"command":"ls","command_id":"abc"}"#), None);
    assert_eq!(parse_command(br#"{"command":"ls","response_topic":"t"}"#), None);
}

#[test]
fn malformed_payloads_are_rejected() {
    assert_eq!(parse_command(b"not json"), None);
    assert_eq!(parse_command(br#"{"no_command":true}"#), None);
}

#[tokio::test]
async fn shell_commands_publish_their_output() {
    let deps = Arc::new(CommandDeps {
        http: wayru_http::HttpClient::new().unwrap(),
        accounting_api: "http://127.0.0.1:1".into(),
        token: Arc::new(parking_lot::Mutex::new(wayru_core::AccessToken {
            token: "t".into(),
            issued_at_seconds: 0,
            expires_at_seconds: 0,
        })),
        codename: "board".into(),
        os_version: "1.0".into(),
        wayru_device_id: "d1".into(),
    });

    let mut handle = handler(deps);
    let out = handle(
        "device/d1/command",
        br#"{"command":"echo hi","command_id":"abc","response_topic":"device/d1/out"}"#,
    )
    .await;

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].topic, "device/d1/out");
    let body: serde_json::Value = serde_json::from_slice(&out[0].payload).unwrap();
    assert_eq!(body["command_id"], "abc");
    assert_eq!(body["result"].as_str().unwrap().trim(), "hi");
}
