// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Request from a sibling daemon to the agent.
///
/// All methods are argumentless.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Request {
    /// Health check
    Ping,

    /// Current bearer token and its validity window
    GetAccessToken,

    /// Device facts collected at agent startup
    GetDeviceInfo,

    /// Persisted registration identity
    GetRegistration,

    /// Service liveness and per-method availability
    GetStatus,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
