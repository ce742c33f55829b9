// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renderer collaborator: translates configuration JSON into UCI
//! settings without restarting services.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("renderer failed: {0}")]
pub struct RendererError(pub String);

#[async_trait]
pub trait ConfigRenderer: Send + Sync {
    /// Apply `config` to UCI. Must not restart any service.
    async fn apply(&self, config: &Value) -> Result<(), RendererError>;
}

/// Production renderer: hands the JSON to the renderer script.
pub struct ScriptRenderer {
    script: PathBuf,
    work_dir: PathBuf,
}

impl ScriptRenderer {
    pub fn new(script: PathBuf, work_dir: PathBuf) -> Self {
        Self { script, work_dir }
    }
}

#[async_trait]
impl ConfigRenderer for ScriptRenderer {
    async fn apply(&self, config: &Value) -> Result<(), RendererError> {
        std::fs::create_dir_all(&self.work_dir)
            .map_err(|e| RendererError(format!("cannot create work dir: {e}")))?;
        let input = self.work_dir.join("render-input.json");
        std::fs::write(&input, config.to_string())
            .map_err(|e| RendererError(format!("cannot write renderer input: {e}")))?;

        let command = format!("{} {}", self.script.display(), input.display());
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&command)
            .status()
            .await
            .map_err(|e| RendererError(format!("cannot run renderer: {e}")))?;

        if status.success() {
            tracing::info!("configuration rendered to UCI");
            Ok(())
        } else {
            Err(RendererError(format!("renderer exited with {status}")))
        }
    }
}
