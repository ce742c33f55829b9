// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell collaborator: run a command line and capture its output.

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Run `command` through `sh -c`, returning combined stdout output.
///
/// A non-zero exit status is not an error here; callers that care inspect
/// the output or use [`run_status`].
pub async fn run_script(command: &str) -> Result<String, ShellError> {
    tracing::debug!(command, "running script");
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await
        .map_err(|e| ShellError::Spawn { command: command.to_string(), source: e })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if text.is_empty() {
        text = String::from_utf8_lossy(&output.stderr).into_owned();
    }
    Ok(text)
}

/// Run `command` through `sh -c`, returning its exit code.
pub async fn run_status(command: &str) -> Result<i32, ShellError> {
    tracing::debug!(command, "running command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .map_err(|e| ShellError::Spawn { command: command.to_string(), source: e })?;
    Ok(status.code().unwrap_or(-1))
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
