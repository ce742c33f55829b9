// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown registry: ordered cleanup stack and exit requests.
//!
//! Subsystems register cleanup closures as they acquire resources; on
//! exit the stack unwinds in reverse insertion order. Process-termination
//! signals and internal callers (notably MQTT recovery exhaustion) both
//! funnel through `request_exit`.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;

/// Maximum number of registered cleanup entries.
const MAX_CLEANUPS: usize = 16;

type CleanupFn = Box<dyn FnOnce() + Send>;

struct CleanupEntry {
    label: String,
    callback: CleanupFn,
}

#[derive(Default)]
struct Inner {
    cleanups: Vec<CleanupEntry>,
    requested: bool,
    reason: Option<String>,
}

pub struct ShutdownRegistry {
    inner: Mutex<Inner>,
    notify: Notify,
}

impl ShutdownRegistry {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()), notify: Notify::new() }
    }

    /// Push a cleanup onto the stack. Returns false when the stack is full.
    pub fn register(&self, label: &str, callback: impl FnOnce() + Send + 'static) -> bool {
        let mut inner = self.inner.lock();
        if inner.cleanups.len() >= MAX_CLEANUPS {
            tracing::error!(label, "too many cleanup functions registered");
            return false;
        }
        inner.cleanups.push(CleanupEntry { label: label.to_string(), callback: Box::new(callback) });
        true
    }

    /// Ask the main loop to terminate. Idempotent; the first reason wins.
    pub fn request_exit(&self, reason: &str) {
        let mut inner = self.inner.lock();
        if !inner.requested {
            inner.requested = true;
            inner.reason = Some(reason.to_string());
            tracing::info!(reason, "shutdown requested");
        }
        drop(inner);
        self.notify.notify_one();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.inner.lock().requested
    }

    pub fn shutdown_reason(&self) -> String {
        self.inner
            .lock()
            .reason
            .clone()
            .unwrap_or_else(|| "Shutdown requested".to_string())
    }

    /// Wait until `request_exit` has been called.
    pub async fn requested(&self) {
        loop {
            if self.is_shutdown_requested() {
                return;
            }
            self.notify.notified().await;
        }
    }

    /// Run every registered cleanup in reverse insertion order.
    pub fn run_cleanups(&self, reason: &str) {
        tracing::info!(reason, "cleaning up");
        let entries = {
            let mut inner = self.inner.lock();
            std::mem::take(&mut inner.cleanups)
        };
        for entry in entries.into_iter().rev() {
            tracing::debug!(label = %entry.label, "running cleanup");
            (entry.callback)();
        }
    }
}

impl Default for ShutdownRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate SIGINT/SIGTERM into an exit request.
pub fn spawn_signal_handlers(registry: Arc<ShutdownRegistry>) -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => registry.request_exit("Signal received: SIGTERM"),
            _ = sigint.recv() => registry.request_exit("Signal received: SIGINT"),
        }
    });
    Ok(())
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod tests;
