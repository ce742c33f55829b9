// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery policy for the MQTT client.
//!
//! Every loop outcome carries an independent counter and attempt ceiling.
//! Connection-class errors try a lightweight reconnect first; errors that
//! can corrupt client state force a full reinitialisation. Some errors
//! can leave ghost state that persists across an apparently successful
//! reconnect, which is what the health watchdog catches.

use super::transport::LoopOutcome;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const RECONNECT_BASE_DELAY: Duration = Duration::from_secs(30);
pub const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(150);
pub const STABILIZE_DELAY: Duration = Duration::from_secs(1);
pub const OUT_OF_MEMORY_EXTRA_DELAY: Duration = Duration::from_secs(5);

/// Forced full reinit after this long without a successful loop.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(300);

/// Attempt ceiling per outcome kind.
pub fn max_attempts(kind: LoopOutcome) -> u32 {
    match kind {
        LoopOutcome::Success => 0,
        LoopOutcome::NoConnection | LoopOutcome::ConnectionLost | LoopOutcome::SystemError => 5,
        LoopOutcome::ProtocolError | LoopOutcome::InvalidParams | LoopOutcome::Unknown => 3,
        LoopOutcome::OutOfMemory => 2,
    }
}

/// Whether this kind must skip the lightweight reconnect.
pub fn forces_full_reinit(kind: LoopOutcome) -> bool {
    matches!(
        kind,
        LoopOutcome::SystemError
            | LoopOutcome::ProtocolError
            | LoopOutcome::InvalidParams
            | LoopOutcome::OutOfMemory
    )
}

/// Exponential backoff: attempt k sleeps min(30 * 2^(k-1), 150) seconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(31);
    let secs = RECONNECT_BASE_DELAY.as_secs().saturating_mul(1u64 << exp);
    Duration::from_secs(secs).min(RECONNECT_MAX_DELAY)
}

/// Sleep injection point so recovery sequences are testable.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Counters and watchdog state. Lives in the client state struct so the
/// 300 s watchdog survives across task invocations.
#[derive(Default)]
pub struct RecoveryState {
    /// Persists across outcomes; reset only by a successful recovery.
    pub reconnect_attempt: u32,
    counters: HashMap<LoopOutcome, u32>,
    pub last_success: Option<Instant>,
}

impl RecoveryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful loop iteration: reset every counter, stamp the watchdog.
    pub fn record_success(&mut self, now: Instant) {
        self.counters.clear();
        self.last_success = Some(now);
    }

    pub fn record_failure(&mut self, kind: LoopOutcome) -> u32 {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        *counter
    }

    pub fn reset_kind(&mut self, kind: LoopOutcome) {
        self.counters.remove(&kind);
    }

    pub fn count(&self, kind: LoopOutcome) -> u32 {
        self.counters.get(&kind).copied().unwrap_or(0)
    }

    /// True once the watchdog has armed (a first success) and expired.
    pub fn health_expired(&self, now: Instant) -> bool {
        match self.last_success {
            Some(at) => now.duration_since(at) > HEALTH_TIMEOUT,
            None => false,
        }
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
