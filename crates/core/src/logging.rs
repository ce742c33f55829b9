// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging setup shared by the three daemons.

use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (wayru.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `x.log` -> `x.log.1` -> `x.log.2` -> `x.log.3`, deleting the
/// oldest. Best-effort: rotation failures are silently ignored so the
/// daemon still starts.
pub fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Initialise tracing with an env filter (default `info`).
///
/// With a log path, output goes to a non-blocking file appender and the
/// returned guard must be held for the life of the process. Without one,
/// output goes to stderr.
pub fn setup_logging(
    log_path: Option<&Path>,
) -> std::io::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_path) = log_path else {
        tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(std::io::stderr)).init();
        return Ok(None);
    };

    rotate_log_if_needed(log_path);

    let parent = log_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let file_name = log_path
        .file_name()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "bad log path"))?;

    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(non_blocking)).init();
    Ok(Some(guard))
}
