// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::VecDeque;
use std::sync::Mutex;
use wayru_core::FakeClock;

/// Scripted token source: pops one pre-programmed result per fetch.
struct ScriptedSource {
    replies: Mutex<VecDeque<Result<AccessTokenReply, ProtocolError>>>,
}

impl ScriptedSource {
    fn new(replies: Vec<Result<AccessTokenReply, ProtocolError>>) -> Self {
        Self { replies: Mutex::new(replies.into_iter().collect()) }
    }
}

#[async_trait]
impl TokenSource for ScriptedSource {
    async fn fetch(&self) -> Result<AccessTokenReply, ProtocolError> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ProtocolError::UnexpectedResponse))
    }
}

fn reply(token: &str, expires_at: i64) -> AccessTokenReply {
    AccessTokenReply { token: token.into(), issued_at: 0, expires_at, valid: 1 }
}

fn manager(
    replies: Vec<Result<AccessTokenReply, ProtocolError>>,
    clock: FakeClock,
) -> TokenManager<ScriptedSource, FakeClock> {
    TokenManager::with_clock(ScriptedSource::new(replies), clock)
}

#[tokio::test]
async fn acceptance_starts_disabled() {
    let mgr = manager(vec![], FakeClock::new());
    assert!(!mgr.should_accept_requests());
    assert!(!mgr.is_token_valid());
    assert!(mgr.current_token().is_none());
}

#[tokio::test]
async fn refresh_enables_acceptance_and_caches_token() {
    let clock = FakeClock::new();
    clock.set_epoch_secs(1000);
    let mut mgr = manager(vec![Ok(reply("t1", 5000))], clock);

    mgr.refresh_access_token().await.unwrap();
    assert!(mgr.should_accept_requests());
    assert!(mgr.is_token_valid());
    assert_eq!(mgr.current_token(), Some("t1"));
}

#[tokio::test]
async fn expired_token_is_not_returned() {
    let clock = FakeClock::new();
    clock.set_epoch_secs(1000);
    let mut mgr = manager(vec![Ok(reply("t1", 2000))], clock.clone());
    mgr.refresh_access_token().await.unwrap();

    clock.advance(std::time::Duration::from_secs(2000));
    assert!(!mgr.is_token_valid());
    assert!(mgr.current_token().is_none());
}

#[tokio::test]
async fn invalid_reply_is_an_error() {
    let clock = FakeClock::new();
    let bad = AccessTokenReply { token: "t1".into(), issued_at: 0, expires_at: 5000, valid: 0 };
    let mut mgr = manager(vec![Ok(bad)], clock);
    assert!(mgr.refresh_access_token().await.is_err());
    assert!(!mgr.should_accept_requests());
}

#[tokio::test]
async fn unauthorized_invalidates_cached_token() {
    let clock = FakeClock::new();
    clock.set_epoch_secs(1000);
    let mut mgr = manager(vec![Ok(reply("t1", 5000))], clock);
    mgr.refresh_access_token().await.unwrap();

    mgr.report_http_failure(Some(401));
    assert!(!mgr.is_token_valid());
    // A single failure does not trip the acceptance gate
    assert!(mgr.should_accept_requests());
}

#[tokio::test]
async fn repeated_failures_trip_the_acceptance_gate() {
    let clock = FakeClock::new();
    clock.set_epoch_secs(1000);
    let mut mgr = manager(vec![Ok(reply("t1", 5000)), Ok(reply("t2", 9000))], clock);
    mgr.refresh_access_token().await.unwrap();

    for _ in 0..MAX_CONSECUTIVE_HTTP_FAILURES {
        mgr.report_http_failure(Some(500));
    }
    assert!(!mgr.should_accept_requests());

    // A later successful refresh re-enables acceptance
    mgr.refresh_access_token().await.unwrap();
    assert!(mgr.should_accept_requests());
}

#[tokio::test]
async fn success_resets_the_failure_streak() {
    let clock = FakeClock::new();
    clock.set_epoch_secs(1000);
    let mut mgr = manager(vec![Ok(reply("t1", 5000))], clock);
    mgr.refresh_access_token().await.unwrap();

    for _ in 0..MAX_CONSECUTIVE_HTTP_FAILURES - 1 {
        mgr.report_http_failure(None);
    }
    mgr.report_http_success();
    mgr.report_http_failure(None);
    assert!(mgr.should_accept_requests());
}
