// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local IPC protocol for the wayru-agent service.
//!
//! The agent exposes an object-oriented RPC surface over a unix-domain
//! socket; sibling daemons (collector, config-sync) query it for the
//! shared access token and device identity.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod request;
mod response;
mod token;
mod wire;

pub use client::IpcClient;
pub use request::Request;
pub use response::{
    AccessTokenReply, DeviceInfoReply, RegistrationReply, Response, StatusReply,
};
pub use token::{TokenManager, TokenSource, MAX_CONSECUTIVE_HTTP_FAILURES};
pub use wire::{read_message, write_message, ProtocolError, MAX_FRAME_BYTES};

use std::path::{Path, PathBuf};

/// Service name the agent registers under; also the socket file name.
pub const SERVICE_NAME: &str = "wayru-agent";

/// Socket path under the shared temp directory.
pub fn socket_path(temp_path: &Path) -> PathBuf {
    temp_path.join("wayru-os-services").join(format!("{SERVICE_NAME}.sock"))
}
