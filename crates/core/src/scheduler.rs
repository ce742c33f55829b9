// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative task scheduler
//!
//! Multiplexes one-shot and repeating tasks onto a single loop. Callbacks
//! run to completion one at a time; suspension points exist only between
//! tasks, never within them. Blocking work inside a callback is the
//! documented policy of the services built on top — each callback is
//! expected to finish or quickly reschedule itself.

use crate::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Identifier of a scheduled task. Never zero.
pub type TaskId = u32;

/// Future returned by a task callback.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type TaskFn = Box<dyn FnMut() -> TaskFuture + Send>;

enum TaskKind {
    Once,
    Repeating { interval: Duration },
}

struct Task {
    id: TaskId,
    /// Registration order, used to break ties between equal deadlines.
    seq: u64,
    fires_at: Instant,
    kind: TaskKind,
    callback: TaskFn,
}

#[derive(Default)]
struct State {
    tasks: Vec<Task>,
    next_id: TaskId,
    next_seq: u64,
    /// Id and repeating-flag of the task whose callback is currently running.
    in_flight: Option<(TaskId, bool)>,
    in_flight_cancelled: bool,
    shutdown: bool,
}

/// Single-threaded cooperative timer loop.
///
/// Tasks are owned by the scheduler; their captured context is not. A
/// one-shot task is removed from the registry before its callback runs
/// (so the callback may re-schedule itself), a repeating task re-arms
/// itself before the callback runs so its cadence does not drift with
/// callback duration.
pub struct Scheduler<C: Clock = SystemClock> {
    state: Mutex<State>,
    notify: Notify,
    clock: C,
}

impl Scheduler<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for Scheduler<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Scheduler<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            state: Mutex::new(State { next_id: 1, ..State::default() }),
            notify: Notify::new(),
            clock,
        }
    }

    /// Schedule `callback` to fire once, no earlier than `delay` from now.
    ///
    /// Returns `None` only when the scheduler has shut down.
    pub fn schedule_once<F>(&self, delay: Duration, callback: F) -> Option<TaskId>
    where
        F: FnMut() -> TaskFuture + Send + 'static,
    {
        self.insert(delay, TaskKind::Once, Box::new(callback))
    }

    /// Schedule `callback` to fire after `initial_delay`, then every
    /// `interval`. A zero interval is rejected.
    pub fn schedule_repeating<F>(
        &self,
        initial_delay: Duration,
        interval: Duration,
        callback: F,
    ) -> Option<TaskId>
    where
        F: FnMut() -> TaskFuture + Send + 'static,
    {
        if interval.is_zero() {
            tracing::error!("invalid zero interval for repeating task");
            return None;
        }
        self.insert(initial_delay, TaskKind::Repeating { interval }, Box::new(callback))
    }

    fn insert(&self, delay: Duration, kind: TaskKind, callback: TaskFn) -> Option<TaskId> {
        let mut state = self.state.lock();
        if state.shutdown {
            tracing::error!("scheduler has shut down, rejecting task");
            return None;
        }
        if state.next_id == 0 {
            state.next_id = 1;
        }
        let id = state.next_id;
        state.next_id = state.next_id.wrapping_add(1);
        let seq = state.next_seq;
        state.next_seq += 1;

        let fires_at = self.clock.now() + delay;
        state.tasks.push(Task { id, seq, fires_at, kind, callback });
        drop(state);

        // Wake the loop in case the new deadline is earlier than its sleep
        self.notify.notify_one();
        tracing::debug!(task = id, delay_ms = delay.as_millis() as u64, "scheduled task");
        Some(id)
    }

    /// Cancel a pending task.
    ///
    /// Returns true iff a pending task with that id existed; a repeat call
    /// for the same id returns false. Canceling a repeating task from
    /// within its own callback is allowed and suppresses all further fires.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut state = self.state.lock();
        if let Some(pos) = state.tasks.iter().position(|t| t.id == id) {
            state.tasks.remove(pos);
            tracing::debug!(task = id, "cancelled task");
            return true;
        }
        if state.in_flight == Some((id, true)) && !state.in_flight_cancelled {
            state.in_flight_cancelled = true;
            tracing::debug!(task = id, "cancelled in-flight repeating task");
            return true;
        }
        false
    }

    /// Cancel every registered task and terminate the loop.
    ///
    /// Safe to call from within a task callback; the running callback
    /// completes, then `run` returns.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        let dropped = state.tasks.len();
        state.tasks.clear();
        state.shutdown = true;
        drop(state);
        self.notify.notify_one();
        tracing::info!(cancelled = dropped, "scheduler shut down");
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// Drive the loop until `shutdown` is called or no tasks remain.
    ///
    /// Due tasks fire one at a time, earliest deadline first, registration
    /// order breaking ties. Each callback runs to completion before the
    /// next task is considered.
    pub async fn run(&self) -> i32 {
        tracing::info!("starting scheduler main loop");
        loop {
            let step = self.next_step();
            match step {
                Step::Done => {
                    tracing::info!("scheduler main loop ended");
                    return 0;
                }
                Step::Fire(mut task) => {
                    tracing::debug!(task = task.id, "executing task");
                    (task.callback)().await;
                    self.finish(task);
                }
                Step::Sleep(dur) => {
                    tokio::select! {
                        _ = tokio::time::sleep(dur) => {}
                        _ = self.notify.notified() => {}
                    }
                }
            }
        }
    }

    fn next_step(&self) -> Step {
        let mut state = self.state.lock();
        if state.shutdown {
            state.tasks.clear();
            return Step::Done;
        }
        let next = state
            .tasks
            .iter()
            .enumerate()
            .min_by_key(|(_, t)| (t.fires_at, t.seq))
            .map(|(i, _)| i);
        let Some(idx) = next else {
            return Step::Done;
        };
        let now = self.clock.now();
        if state.tasks[idx].fires_at > now {
            return Step::Sleep(state.tasks[idx].fires_at - now);
        }
        let mut task = state.tasks.remove(idx);
        if let TaskKind::Repeating { interval } = task.kind {
            // Re-arm before the callback runs; the next tick is measured
            // from this fire, not from callback completion.
            task.fires_at = now + interval;
        }
        state.in_flight = Some((task.id, matches!(task.kind, TaskKind::Repeating { .. })));
        state.in_flight_cancelled = false;
        Step::Fire(task)
    }

    fn finish(&self, task: Task) {
        let mut state = self.state.lock();
        let cancelled = std::mem::take(&mut state.in_flight_cancelled);
        state.in_flight = None;
        if matches!(task.kind, TaskKind::Repeating { .. }) && !cancelled && !state.shutdown {
            state.tasks.push(task);
        }
    }
}

enum Step {
    Fire(Task),
    Sleep(Duration),
    Done,
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
