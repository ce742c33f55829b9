// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-attempt retry over a boolean predicate.

use std::future::Future;
use std::time::Duration;

/// Run `op` up to `attempts` times with a fixed `delay` between attempts.
///
/// Returns true as soon as `op` succeeds; false once every attempt has
/// failed. The delay is skipped after the final attempt.
pub async fn retry<F, Fut>(attempts: u32, delay: Duration, mut op: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=attempts {
        if op().await {
            return true;
        }
        tracing::debug!(attempt, attempts, "retry attempt failed");
        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }
    false
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
