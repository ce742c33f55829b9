// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use wayru_core::AccessToken;

fn test_server(dir: &std::path::Path, token: AccessToken) -> Arc<IpcServer> {
    IpcServer::new(
        dir.join("wayru-agent.sock"),
        Arc::new(Mutex::new(token)),
        Arc::new(DeviceInfo {
            device_id: "dev-1".into(),
            mac: "AA:BB".into(),
            name: "board".into(),
            brand: "Wayru".into(),
            model: "GL-MT300N".into(),
            arch: "mips_24kc".into(),
            os_name: "OpenWrt".into(),
            os_version: "23.05".into(),
            os_services_version: "1.0.0".into(),
            public_ip: "1.2.3.4".into(),
            did_public_key: "pk".into(),
        }),
        Arc::new(Registration { wayru_device_id: "d1".into(), access_key: "k1".into() }),
    )
}

fn fresh_token() -> AccessToken {
    AccessToken {
        token: "t1".into(),
        issued_at_seconds: 0,
        expires_at_seconds: i64::MAX,
    }
}

#[tokio::test]
async fn serves_ping_and_token() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path(), fresh_token());
    server.start().unwrap();

    let client = IpcClient::new(server.socket_path().clone());
    assert!(client.ping().await);

    let reply = client.get_access_token().await.unwrap();
    assert_eq!(reply.token, "t1");
    assert_eq!(reply.valid, 1);

    server.stop();
}

#[tokio::test]
async fn missing_token_is_a_typed_error() {
    let dir = tempfile::tempdir().unwrap();
    let empty = AccessToken { token: String::new(), issued_at_seconds: 0, expires_at_seconds: 0 };
    let server = test_server(dir.path(), empty);
    server.start().unwrap();

    let client = IpcClient::new(server.socket_path().clone());
    let result = client.get_access_token().await;
    assert!(matches!(result, Err(wayru_ipc::ProtocolError::Remote { code: -1, .. })));

    // Status still answers, with the token flagged unavailable
    let status = client.get_status().await.unwrap();
    assert_eq!(status.service, "wayru-agent");
    assert_eq!(status.running, 1);
    assert_eq!(status.access_token_available, 0);

    server.stop();
}

#[tokio::test]
async fn serves_device_info_and_registration() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path(), fresh_token());
    server.start().unwrap();

    let client = IpcClient::new(server.socket_path().clone());
    let info = client.get_device_info().await.unwrap();
    assert_eq!(info.mac, "AA:BB");
    assert_eq!(info.os_services_version, "1.0.0");

    let registration = client.get_registration().await.unwrap();
    assert_eq!(registration.wayru_device_id, "d1");
    assert_eq!(registration.access_key, "k1");

    server.stop();
}

#[tokio::test]
async fn reinit_rebinds_the_socket() {
    let dir = tempfile::tempdir().unwrap();
    let server = test_server(dir.path(), fresh_token());
    server.start().unwrap();

    server.reinit().unwrap();
    let client = IpcClient::new(server.socket_path().clone());
    assert!(client.ping().await);

    server.stop();
    assert!(!server.socket_path().exists());
}

#[tokio::test]
async fn expired_token_is_served_but_flagged_invalid() {
    let dir = tempfile::tempdir().unwrap();
    let expired =
        AccessToken { token: "old".into(), issued_at_seconds: 0, expires_at_seconds: 1 };
    let server = test_server(dir.path(), expired);
    server.start().unwrap();

    let client = IpcClient::new(server.socket_path().clone());
    let reply = client.get_access_token().await.unwrap();
    assert_eq!(reply.token, "old");
    assert_eq!(reply.valid, 0);

    server.stop();
}
