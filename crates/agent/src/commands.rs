// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-topic dispatch.
//!
//! The device listens on `device/<wayru_device_id>/command`. The special
//! command `check_firmware_update` runs a firmware check; anything else
//! is executed as a shell command and its output published to the
//! requested response topic.

use crate::access_token::SharedToken;
use crate::firmware;
use crate::mqtt::{MessageHandler, OutboundMessage};
use crate::shell::run_script;
use std::sync::Arc;
use wayru_http::HttpClient;

pub const CHECK_FIRMWARE_UPDATE: &str = "check_firmware_update";

pub struct CommandDeps {
    pub http: HttpClient,
    pub accounting_api: String,
    pub token: SharedToken,
    /// Firmware codename (board name) and running OS version.
    pub codename: String,
    pub os_version: String,
    pub wayru_device_id: String,
}

pub fn command_topic(wayru_device_id: &str) -> String {
    format!("device/{wayru_device_id}/command")
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParsedCommand {
    FirmwareCheck,
    Shell { command: String, command_id: String, response_topic: String },
}

/// Extract a command from the topic payload. Custom commands must carry
/// both `command_id` and `response_topic` to be dispatched.
pub fn parse_command(payload: &[u8]) -> Option<ParsedCommand> {
    let json: serde_json::Value = serde_json::from_slice(payload).ok()?;
    let command = json.get("command")?.as_str()?.to_string();

    if command == CHECK_FIRMWARE_UPDATE {
        return Some(ParsedCommand::FirmwareCheck);
    }

    let command_id = json.get("command_id")?.as_str()?.to_string();
    let response_topic = json.get("response_topic")?.as_str()?.to_string();
    Some(ParsedCommand::Shell { command, command_id, response_topic })
}

/// Build the MQTT handler for the command topic.
pub fn handler(deps: Arc<CommandDeps>) -> MessageHandler {
    Box::new(move |_topic, payload| {
        let deps = Arc::clone(&deps);
        let payload = payload.to_vec();
        Box::pin(async move {
            let Some(parsed) = parse_command(&payload) else {
                tracing::error!("failed to parse command topic payload");
                return Vec::new();
            };

            match parsed {
                ParsedCommand::FirmwareCheck => {
                    tracing::info!("received firmware update command");
                    let token = deps.token.lock().token.clone();
                    firmware::send_firmware_check_request(
                        &deps.http,
                        &deps.accounting_api,
                        &token,
                        &deps.codename,
                        &deps.os_version,
                        &deps.wayru_device_id,
                    )
                    .await;
                    Vec::new()
                }
                ParsedCommand::Shell { command, command_id, response_topic } => {
                    tracing::info!(command = %command, "executing command");
                    let result = match run_script(&command).await {
                        Ok(output) => output,
                        Err(e) => format!("Error executing command: {e}"),
                    };
                    let response = serde_json::json!({
                        "command_id": command_id,
                        "result": result,
                    });
                    vec![OutboundMessage::json(response_topic, &response, 0)]
                }
            }
        })
    })
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
