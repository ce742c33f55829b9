// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device fact gathering.
//!
//! Facts are collected once at startup and immutable for the process
//! lifetime. Gathering itself is collaborator territory (helper scripts
//! and well-known files); dev mode substitutes synthetic facts so the
//! agent runs on a workstation.

use crate::config::AgentConfig;
use crate::shell::run_script;
use anyhow::{Context, Result};
use parking_lot::Mutex;
use wayru_core::{retry, DeviceInfo};

const FACTS_MAX_ATTEMPTS: u32 = 3;
const FACTS_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(2);

pub async fn init_device_info(config: &AgentConfig) -> Result<DeviceInfo> {
    if config.dev_env {
        return Ok(dev_facts());
    }

    // Device facts gate the whole bootstrap; a board that cannot report
    // its identity cannot register.
    let slot: Mutex<Option<DeviceInfo>> = Mutex::new(None);
    let slot_ref = &slot;
    let ok = retry(FACTS_MAX_ATTEMPTS, FACTS_RETRY_DELAY, move || async move {
        match collect_facts(config).await {
            Ok(facts) => {
                *slot_ref.lock() = Some(facts);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "device fact collection failed");
                false
            }
        }
    })
    .await;

    if !ok {
        anyhow::bail!("could not read device facts after {FACTS_MAX_ATTEMPTS} attempts");
    }
    let info = slot.lock().take();
    info.context("device facts missing after successful collection")
}

async fn collect_facts(config: &AgentConfig) -> Result<DeviceInfo> {
    let scripts = &config.scripts_path;

    let device_id = script_line(&format!("{}/get-uuid.sh", scripts.display())).await?;
    let mac = script_line("cat /sys/class/net/br-lan/address").await?;
    let model = read_first_line("/tmp/sysinfo/model").unwrap_or_else(|| "unknown".into());
    let brand = model.split_whitespace().next().unwrap_or("unknown").to_string();
    let name = read_release_value("OPENWRT_BOARD").unwrap_or_else(|| model.clone());
    let arch = read_arch().unwrap_or_else(|| "unknown".into());
    let os_name = read_release_value("NAME").unwrap_or_else(|| "OpenWrt".into());
    let os_version = read_release_value("VERSION").unwrap_or_else(|| "unknown".into());
    let os_services_version = read_first_line(config.data_path.join("services-version"))
        .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
    let public_ip = script_line(&format!("{}/get-public-ip.sh", scripts.display()))
        .await
        .unwrap_or_default();
    let did_public_key =
        read_first_line(config.data_path.join("did-key/key.pub")).unwrap_or_default();

    if mac.is_empty() {
        anyhow::bail!("empty MAC address");
    }

    Ok(DeviceInfo {
        device_id,
        mac,
        name,
        brand,
        model,
        arch,
        os_name,
        os_version,
        os_services_version,
        public_ip,
        did_public_key,
    })
}

async fn script_line(command: &str) -> Result<String> {
    let output = run_script(command).await?;
    Ok(output.lines().next().unwrap_or("").trim().to_string())
}

fn read_first_line(path: impl AsRef<std::path::Path>) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let line = contents.lines().next()?.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Pull a quoted value out of /etc/os-release.
fn read_release_value(key: &str) -> Option<String> {
    let contents = std::fs::read_to_string("/etc/os-release").ok()?;
    parse_release_value(&contents, key)
}

fn parse_release_value(contents: &str, key: &str) -> Option<String> {
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix(key) {
            if let Some(value) = rest.strip_prefix('=') {
                return Some(value.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}

/// `<arch>_<subtarget>` from /etc/openwrt_release.
fn read_arch() -> Option<String> {
    let contents = std::fs::read_to_string("/etc/openwrt_release").ok()?;
    let arch = parse_release_value(&contents, "DISTRIB_ARCH")?;
    let target = parse_release_value(&contents, "DISTRIB_TARGET")?;
    let subtarget = target.split('/').nth(1).unwrap_or("generic");
    Some(format!("{arch}_{subtarget}"))
}

fn dev_facts() -> DeviceInfo {
    DeviceInfo {
        device_id: "dev-device".into(),
        mac: "00:11:22:33:44:55".into(),
        name: "dev-board".into(),
        brand: "Wayru".into(),
        model: "DevBox".into(),
        arch: "x86_64_generic".into(),
        os_name: "OpenWrt".into(),
        os_version: "dev".into(),
        os_services_version: env!("CARGO_PKG_VERSION").to_string(),
        public_ip: "127.0.0.1".into(),
        did_public_key: String::new(),
    }
}

#[cfg(test)]
#[path = "device_info_tests.rs"]
mod tests;
