// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const RELEASE: &str = r#"DISTRIB_ID='OpenWrt'
DISTRIB_ARCH="mips_24kc"
DISTRIB_TARGET="ramips/mt76x8"
NAME="OpenWrt"
VERSION="23.05.2"
"#;

#[test]
fn parses_release_values() {
    assert_eq!(parse_release_value(RELEASE, "DISTRIB_ARCH").as_deref(), Some("mips_24kc"));
    assert_eq!(parse_release_value(RELEASE, "VERSION").as_deref(), Some("23.05.2"));
    assert_eq!(parse_release_value(RELEASE, "MISSING"), None);
}

#[tokio::test]
async fn dev_env_uses_synthetic_facts() {
    let config = crate::config::AgentConfig { dev_env: true, ..Default::default() };
    let info = init_device_info(&config).await.unwrap();
    assert_eq!(info.device_id, "dev-device");
    assert!(!info.mac.is_empty());
}
