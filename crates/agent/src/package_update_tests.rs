// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use wayru_core::AccessToken;

fn deps(temp: &Path) -> PackageUpdateDeps {
    PackageUpdateDeps {
        http: HttpClient::new().unwrap(),
        // Unroutable: status reports fail fast and are ignored by the code
        devices_api: "http://127.0.0.1:1".into(),
        token: Arc::new(Mutex::new(AccessToken {
            token: "t".into(),
            issued_at_seconds: 0,
            expires_at_seconds: 0,
        })),
        registration: Arc::new(Registration {
            wayru_device_id: "d1".into(),
            access_key: "k1".into(),
        }),
        info: Arc::new(DeviceInfo {
            device_id: "dev".into(),
            mac: "m".into(),
            name: "n".into(),
            brand: "b".into(),
            model: "mo".into(),
            arch: "mips_24kc".into(),
            os_name: "OpenWrt".into(),
            os_version: "23.05".into(),
            os_services_version: "1.2.3".into(),
            public_ip: "ip".into(),
            did_public_key: String::new(),
        }),
        temp_path: temp.to_path_buf(),
        scripts_path: PathBuf::from("/nonexistent"),
    }
}

#[test]
fn marker_path_is_under_temp() {
    assert_eq!(
        marker_path(Path::new("/tmp")),
        PathBuf::from("/tmp/wayru-os-services-update-marker")
    );
}

#[test]
fn package_reply_parses_boolean_flag() {
    let reply: PackageCheckReply = serde_json::from_str(
        r#"{"update_available":true,"download_link":"l","checksum":"c","new_version":"1.2.4"}"#,
    )
    .unwrap();
    assert!(reply.update_available);

    let none: PackageCheckReply = serde_json::from_str(r#"{"update_available":false}"#).unwrap();
    assert!(!none.update_available);
}

#[tokio::test]
async fn completion_check_removes_marker_when_version_matches() {
    let dir = tempfile::tempdir().unwrap();
    let deps = deps(dir.path());
    std::fs::write(marker_path(dir.path()), "1.2.3\n").unwrap();

    check_package_update_completion(&deps).await;
    assert!(!marker_path(dir.path()).exists());
}

#[tokio::test]
async fn completion_check_removes_marker_on_mismatch_too() {
    let dir = tempfile::tempdir().unwrap();
    let deps = deps(dir.path());
    std::fs::write(marker_path(dir.path()), "9.9.9").unwrap();

    check_package_update_completion(&deps).await;
    assert!(!marker_path(dir.path()).exists());
}

#[tokio::test]
async fn completion_check_is_a_no_op_without_marker() {
    let dir = tempfile::tempdir().unwrap();
    let deps = deps(dir.path());
    check_package_update_completion(&deps).await;
    assert!(!marker_path(dir.path()).exists());
}
