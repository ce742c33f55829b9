// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wayru OS Services core library
//!
//! Shared building blocks for the agent, collector, and config-sync
//! processes: the cooperative task scheduler, the shutdown registry,
//! the clock abstraction, the retry helper, and the small JSON
//! credential store.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod device;
pub mod logging;
pub mod retry;
pub mod scheduler;
pub mod shutdown;
pub mod store;

pub use clock::{Clock, FakeClock, SystemClock};
pub use device::{DeviceInfo, DeviceStatus, SharedStatus};
pub use retry::retry;
pub use scheduler::{Scheduler, TaskFuture, TaskId};
pub use shutdown::ShutdownRegistry;
pub use store::{AccessToken, CredentialStore, Registration, StoreError, EXPIRY_MARGIN_SECS};
