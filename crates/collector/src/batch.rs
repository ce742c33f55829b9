// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch state machine.
//!
//! One batch in flight per process:
//!
//! ```text
//! Idle -> Preparing -> Sending -> Idle            (2xx)
//!                        |  \-> RetryWait -> Sending
//!                        \-> Failed -> Idle       (retries exhausted)
//! ```
//!
//! Idle fills from the queue; size, age, and queue occupancy decide when
//! a batch starts. Each `advance` performs exactly one transition, driven
//! by the periodic collect task.

use crate::pool::{EntryPool, SlotIndex};
use crate::queue::RingQueue;
use async_trait::async_trait;
use std::time::Duration;
use wayru_core::{Clock, SystemClock};

/// Queue occupancy (percent) that forces a batch regardless of age.
pub const URGENT_OCCUPANCY_PERCENT: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Preparing,
    Sending,
    RetryWait,
    Failed,
}

/// Result of one HTTP submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Accepted,
    Unauthorized,
    Failed,
}

/// HTTP collaborator; production attaches the bearer token and reports
/// outcomes to the token manager.
#[async_trait]
pub trait BatchSender: Send {
    async fn send(&mut self, payload: &str) -> SendOutcome;
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            batch_timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_delay: Duration::from_secs(2),
        }
    }
}

struct Batch {
    slots: Vec<SlotIndex>,
    created_at: i64,
    retry_count: u32,
    state: BatchState,
    payload: Option<String>,
}

impl Batch {
    fn new() -> Self {
        Self { slots: Vec::new(), created_at: 0, retry_count: 0, state: BatchState::Idle, payload: None }
    }
}

/// Outcome of one `advance` step, for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    NoChange,
    Started,
    Prepared,
    Sent,
    Retrying,
    Dropped,
}

pub struct Collector<C: Clock = SystemClock> {
    pool: EntryPool,
    queue: RingQueue,
    batch: Batch,
    config: BatchConfig,
    clock: C,
}

impl Collector<SystemClock> {
    pub fn new(queue_size: usize, config: BatchConfig) -> Self {
        Self::with_clock(queue_size, config, SystemClock)
    }
}

impl<C: Clock> Collector<C> {
    pub fn with_clock(queue_size: usize, config: BatchConfig, clock: C) -> Self {
        Self {
            pool: EntryPool::new(queue_size),
            queue: RingQueue::new(queue_size),
            batch: Batch::new(),
            config,
            clock,
        }
    }

    pub fn state(&self) -> BatchState {
        self.batch.state
    }

    pub fn batch_len(&self) -> usize {
        self.batch.slots.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped(&self) -> u64 {
        self.pool.dropped()
    }

    pub fn pool_in_use(&self) -> usize {
        self.pool.in_use_count()
    }

    /// Store one record. False when pool or queue are full (the record
    /// is dropped and counted).
    pub fn enqueue(
        &mut self,
        program: &str,
        message: &str,
        facility: &str,
        priority: &str,
        timestamp: u32,
    ) -> bool {
        let Some(slot) = self.pool.acquire(program, message, facility, priority, timestamp) else {
            return false;
        };
        if !self.queue.push(slot) {
            self.pool.release(slot);
            self.pool.count_drop();
            tracing::debug!("queue full, dropping log");
            return false;
        }
        true
    }

    /// Move queued entries into the open batch. Only fills while Idle so
    /// an in-flight batch is never mutated.
    fn fill_batch(&mut self) {
        if self.batch.state != BatchState::Idle {
            return;
        }
        while self.batch.slots.len() < self.config.batch_size {
            let Some(slot) = self.queue.pop() else {
                break;
            };
            if self.batch.slots.is_empty() {
                self.batch.created_at = self.clock.epoch_secs();
            }
            self.batch.slots.push(slot);
        }
    }

    fn batch_age(&self) -> Duration {
        let age = self.clock.epoch_secs().saturating_sub(self.batch.created_at);
        Duration::from_secs(age.max(0) as u64)
    }

    /// Idle-state start condition: full batch, or a non-empty batch past
    /// its timeout.
    fn should_start(&self) -> bool {
        if self.batch.slots.len() >= self.config.batch_size {
            return true;
        }
        !self.batch.slots.is_empty() && self.batch_age() >= self.config.batch_timeout
    }

    fn build_payload(&self) -> Option<String> {
        let logs: Vec<serde_json::Value> = self
            .batch
            .slots
            .iter()
            .filter_map(|slot| self.pool.get(*slot))
            .map(|entry| {
                serde_json::json!({
                    "program": entry.program,
                    "message": entry.message,
                    "facility": entry.facility,
                    "priority": entry.priority,
                    "timestamp": entry.timestamp,
                })
            })
            .collect();

        serde_json::to_string(&serde_json::json!({
            "logs": logs,
            "count": logs.len(),
            "collector_version": env!("CARGO_PKG_VERSION"),
        }))
        .ok()
    }

    /// Return every batch entry to the pool and reset to Idle.
    fn clear_batch(&mut self) {
        for slot in std::mem::take(&mut self.batch.slots) {
            self.pool.release(slot);
        }
        self.batch.created_at = self.clock.epoch_secs();
        self.batch.retry_count = 0;
        self.batch.state = BatchState::Idle;
        self.batch.payload = None;
    }

    /// One state-machine transition.
    pub async fn advance<S: BatchSender>(&mut self, sender: &mut S) -> StepResult {
        match self.batch.state {
            BatchState::Idle => {
                if self.should_start() {
                    tracing::debug!(count = self.batch.slots.len(), "starting batch");
                    self.batch.state = BatchState::Preparing;
                    return StepResult::Started;
                }
                StepResult::NoChange
            }
            BatchState::Preparing => match self.build_payload() {
                Some(payload) => {
                    tracing::debug!(
                        count = self.batch.slots.len(),
                        bytes = payload.len(),
                        "prepared batch"
                    );
                    self.batch.payload = Some(payload);
                    self.batch.state = BatchState::Sending;
                    StepResult::Prepared
                }
                None => {
                    tracing::error!("failed to encode batch payload");
                    self.batch.state = BatchState::Failed;
                    StepResult::NoChange
                }
            },
            BatchState::Sending => {
                let payload = self.batch.payload.clone().unwrap_or_default();
                match sender.send(&payload).await {
                    SendOutcome::Accepted => {
                        tracing::info!(count = self.batch.slots.len(), "batch delivered");
                        self.clear_batch();
                        StepResult::Sent
                    }
                    outcome => {
                        self.batch.retry_count += 1;
                        if self.batch.retry_count <= self.config.max_retries {
                            tracing::warn!(
                                outcome = ?outcome,
                                retry = self.batch.retry_count,
                                max = self.config.max_retries,
                                "batch send failed, will retry"
                            );
                            self.batch.state = BatchState::RetryWait;
                            StepResult::Retrying
                        } else {
                            tracing::error!(
                                attempts = self.batch.retry_count,
                                "batch send failed after all retries"
                            );
                            self.batch.state = BatchState::Failed;
                            StepResult::NoChange
                        }
                    }
                }
            }
            BatchState::RetryWait => {
                tokio::time::sleep(self.config.retry_delay).await;
                self.batch.state = BatchState::Sending;
                StepResult::NoChange
            }
            BatchState::Failed => {
                tracing::error!(count = self.batch.slots.len(), "dropping failed batch");
                self.clear_batch();
                StepResult::Dropped
            }
        }
    }

    /// One collect-task cycle: fill, advance, and force a flush when the
    /// queue is nearly full.
    pub async fn run_cycle<S: BatchSender>(&mut self, sender: &mut S) {
        self.fill_batch();
        let _ = self.advance(sender).await;

        if self.queue.occupancy_percent() >= URGENT_OCCUPANCY_PERCENT
            && self.batch.state == BatchState::Idle
        {
            tracing::warn!("queue urgent threshold reached, forcing batch processing");
            self.fill_batch();
            if !self.batch.slots.is_empty() {
                self.batch.state = BatchState::Preparing;
                let _ = self.advance(sender).await;
            }
        }
    }

    /// Flush whatever is pending; used at shutdown.
    pub async fn flush<S: BatchSender>(&mut self, sender: &mut S) {
        self.fill_batch();
        if self.batch.slots.is_empty() {
            return;
        }
        if self.batch.state == BatchState::Idle {
            self.batch.state = BatchState::Preparing;
        }
        // Drive to a terminal state
        while !matches!(self.batch.state, BatchState::Idle) {
            if self.advance(sender).await == StepResult::Dropped {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
