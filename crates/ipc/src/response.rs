// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use wayru_core::DeviceInfo;

/// Response field names are part of the contract: collaborators parse
/// them by name. Do not rename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum Response {
    Pong,
    AccessToken(AccessTokenReply),
    DeviceInfo(DeviceInfoReply),
    Registration(RegistrationReply),
    Status(StatusReply),
    Error { error: String, code: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenReply {
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
    /// 1 when the token is inside its validity window
    pub valid: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfoReply {
    pub device_id: String,
    pub mac: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub arch: String,
    pub public_ip: String,
    pub os_name: String,
    pub os_version: String,
    pub os_services_version: String,
    pub did_public_key: String,
}

impl From<&DeviceInfo> for DeviceInfoReply {
    fn from(info: &DeviceInfo) -> Self {
        Self {
            device_id: info.device_id.clone(),
            mac: info.mac.clone(),
            name: info.name.clone(),
            brand: info.brand.clone(),
            model: info.model.clone(),
            arch: info.arch.clone(),
            public_ip: info.public_ip.clone(),
            os_name: info.os_name.clone(),
            os_version: info.os_version.clone(),
            os_services_version: info.os_services_version.clone(),
            did_public_key: info.did_public_key.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistrationReply {
    pub wayru_device_id: String,
    pub access_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReply {
    pub service: String,
    pub running: u8,
    pub access_token_available: u8,
    pub device_info_available: u8,
    pub registration_available: u8,
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
