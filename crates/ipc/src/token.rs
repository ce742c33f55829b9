// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Token manager for the collector and config-sync processes.
//!
//! Both are clients of the agent's token service over IPC. A cached token
//! gates outbound HTTP through the acceptance flag: it starts false, flips
//! true when a valid token is first obtained, and trips off after repeated
//! consecutive HTTP failures.

use crate::client::IpcClient;
use crate::response::AccessTokenReply;
use crate::wire::ProtocolError;
use async_trait::async_trait;
use wayru_core::{Clock, SystemClock};

/// Consecutive HTTP failures after which request acceptance is disabled.
pub const MAX_CONSECUTIVE_HTTP_FAILURES: u32 = 5;

/// Where tokens come from. Production fetches over IPC; tests script it.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<AccessTokenReply, ProtocolError>;
}

#[async_trait]
impl TokenSource for IpcClient {
    async fn fetch(&self) -> Result<AccessTokenReply, ProtocolError> {
        self.get_access_token().await
    }
}

pub struct TokenManager<S: TokenSource, C: Clock = SystemClock> {
    source: S,
    clock: C,
    token: Option<String>,
    expires_at: i64,
    acceptance: bool,
    consecutive_failures: u32,
}

impl<S: TokenSource> TokenManager<S, SystemClock> {
    pub fn new(source: S) -> Self {
        Self::with_clock(source, SystemClock)
    }
}

impl<S: TokenSource, C: Clock> TokenManager<S, C> {
    pub fn with_clock(source: S, clock: C) -> Self {
        Self {
            source,
            clock,
            token: None,
            expires_at: 0,
            acceptance: false,
            consecutive_failures: 0,
        }
    }

    /// True while the cached token exists and has not expired.
    pub fn is_token_valid(&self) -> bool {
        match &self.token {
            Some(token) => !token.is_empty() && self.clock.epoch_secs() < self.expires_at,
            None => false,
        }
    }

    /// Fetch a fresh token over IPC and cache it. A valid token re-enables
    /// request acceptance.
    pub async fn refresh_access_token(&mut self) -> Result<(), ProtocolError> {
        let reply = self.source.fetch().await?;
        if reply.valid == 0 || reply.token.is_empty() {
            tracing::warn!("agent returned an unusable access token");
            return Err(ProtocolError::UnexpectedResponse);
        }
        self.token = Some(reply.token);
        self.expires_at = reply.expires_at;
        self.acceptance = true;
        self.consecutive_failures = 0;
        tracing::info!("access token refreshed over IPC");
        Ok(())
    }

    /// The cached token, iff still valid.
    pub fn current_token(&self) -> Option<&str> {
        if self.is_token_valid() {
            self.token.as_deref()
        } else {
            None
        }
    }

    /// Gate for outbound HTTP.
    pub fn should_accept_requests(&self) -> bool {
        self.acceptance
    }

    /// Record the outcome of an HTTP call. A 401 invalidates the cached
    /// token so the next cycle refreshes it.
    pub fn report_http_failure(&mut self, status: Option<u16>) {
        if status == Some(401) {
            tracing::warn!("401 from backend, invalidating cached token");
            self.token = None;
        }
        self.consecutive_failures += 1;
        if self.consecutive_failures >= MAX_CONSECUTIVE_HTTP_FAILURES && self.acceptance {
            tracing::warn!(
                failures = self.consecutive_failures,
                "repeated HTTP failures, disabling request acceptance"
            );
            self.acceptance = false;
        }
    }

    pub fn report_http_success(&mut self) {
        self.consecutive_failures = 0;
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
