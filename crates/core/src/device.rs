// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device facts and lifecycle status shared across services.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Facts collected once at startup; immutable for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: String,
    pub mac: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub arch: String,
    pub os_name: String,
    pub os_version: String,
    pub os_services_version: String,
    pub public_ip: String,
    pub did_public_key: String,
}

/// Lifecycle status reported by the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Unknown,
    Initial,
    SetupPending,
    SetupApproved,
    MintPending,
    Ready,
    Banned,
}

impl DeviceStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => DeviceStatus::Initial,
            1 => DeviceStatus::SetupPending,
            2 => DeviceStatus::SetupApproved,
            3 => DeviceStatus::MintPending,
            4 => DeviceStatus::Ready,
            5 => DeviceStatus::Banned,
            _ => DeviceStatus::Unknown,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            DeviceStatus::Unknown => -1,
            DeviceStatus::Initial => 0,
            DeviceStatus::SetupPending => 1,
            DeviceStatus::SetupApproved => 2,
            DeviceStatus::MintPending => 3,
            DeviceStatus::Ready => 4,
            DeviceStatus::Banned => 5,
        }
    }
}

/// Process-wide device status cell. Written by the device-status reporter,
/// read by LED and captive-portal side effects.
#[derive(Clone, Default)]
pub struct SharedStatus {
    inner: Arc<Mutex<DeviceStatus>>,
}

impl SharedStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> DeviceStatus {
        *self.inner.lock()
    }

    pub fn set(&self, status: DeviceStatus) {
        *self.inner.lock() = status;
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
