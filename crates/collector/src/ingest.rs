// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Syslog ingress.
//!
//! Production tails `logread -f` and parses its line format; the collect
//! task drains parsed records from a channel. Debug-severity records are
//! filtered out before they touch the pool.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Severities at or above this number are dropped (7 = debug).
const DROP_SEVERITY: u8 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub program: String,
    pub message: String,
    pub facility: u8,
    pub severity: u8,
    pub timestamp: u32,
}

pub fn severity_allows(severity: u8) -> bool {
    severity < DROP_SEVERITY
}

fn facility_number(name: &str) -> u8 {
    match name {
        "kern" => 0,
        "user" => 1,
        "mail" => 2,
        "daemon" => 3,
        "auth" => 4,
        "syslog" => 5,
        "lpr" => 6,
        "news" => 7,
        "cron" => 9,
        "authpriv" => 10,
        name if name.starts_with("local") => {
            16 + name.trim_start_matches("local").parse::<u8>().unwrap_or(0)
        }
        _ => 1,
    }
}

fn severity_number(name: &str) -> u8 {
    match name {
        "emerg" | "panic" => 0,
        "alert" => 1,
        "crit" => 2,
        "err" | "error" => 3,
        "warn" | "warning" => 4,
        "notice" => 5,
        "info" => 6,
        _ => 7,
    }
}

/// Parse one `logread` line:
/// `Thu Aug  1 12:00:00 2026 daemon.info wayru-agent[123]: started`
pub fn parse_logread_line(line: &str, now_epoch: u32) -> Option<LogRecord> {
    let mut tokens = line.split_whitespace();
    // Timestamp: weekday, month, day, time, year
    for _ in 0..5 {
        tokens.next()?;
    }
    let facility_severity = tokens.next()?;
    let (facility_name, severity_name) = facility_severity.split_once('.')?;

    let rest = tokens.collect::<Vec<_>>().join(" ");
    let (program_part, message) = match rest.split_once(": ") {
        Some((program, message)) => (program, message.to_string()),
        None => ("unknown", rest.clone()),
    };
    // Strip an optional [pid] suffix
    let program = program_part.split('[').next().unwrap_or("unknown").to_string();

    if message.is_empty() {
        return None;
    }

    Some(LogRecord {
        program,
        message,
        facility: facility_number(facility_name),
        severity: severity_number(severity_name),
        timestamp: now_epoch,
    })
}

/// Spawn `logread -f` and stream parsed records into `tx` until the
/// process or the channel closes.
pub fn spawn_logread(tx: mpsc::Sender<LogRecord>) -> std::io::Result<()> {
    let mut child = tokio::process::Command::new("logread")
        .arg("-f")
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::null())
        .spawn()?;

    let stdout = child.stdout.take().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::BrokenPipe, "logread has no stdout")
    })?;

    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let now = std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_secs() as u32;
                    if let Some(record) = parse_logread_line(&line, now) {
                        if severity_allows(record.severity) && tx.send(record).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(None) => {
                    tracing::warn!("logread stream ended");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "error reading syslog stream");
                    break;
                }
            }
        }
        let _ = child.kill().await;
    });

    Ok(())
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
