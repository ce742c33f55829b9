// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use wayru_core::FakeClock;

/// Records what the service asked the transport to do.
#[derive(Default)]
struct TransportLog {
    actions: Mutex<Vec<String>>,
}

impl TransportLog {
    fn push(&self, action: impl Into<String>) {
        self.actions.lock().push(action.into());
    }

    fn actions(&self) -> Vec<String> {
        self.actions.lock().clone()
    }

    fn count_of(&self, prefix: &str) -> usize {
        self.actions.lock().iter().filter(|a| a.starts_with(prefix)).count()
    }
}

struct ScriptedTransport {
    polls: VecDeque<PollEvent>,
    reconnect_ok: VecDeque<bool>,
    reinit_ok: VecDeque<bool>,
    log: Arc<TransportLog>,
}

impl ScriptedTransport {
    fn new(polls: Vec<PollEvent>, log: Arc<TransportLog>) -> Self {
        Self { polls: polls.into_iter().collect(), reconnect_ok: VecDeque::new(), reinit_ok: VecDeque::new(), log }
    }

    fn with_recovery(mut self, reconnect: Vec<bool>, reinit: Vec<bool>) -> Self {
        self.reconnect_ok = reconnect.into_iter().collect();
        self.reinit_ok = reinit.into_iter().collect();
        self
    }
}

#[async_trait]
impl MqttTransport for ScriptedTransport {
    async fn poll(&mut self) -> PollEvent {
        self.log.push("poll");
        self.polls.pop_front().unwrap_or(PollEvent::Idle)
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        self.log.push("reconnect");
        if self.reconnect_ok.pop_front().unwrap_or(false) {
            Ok(())
        } else {
            Err(TransportError::Client("scripted failure".into()))
        }
    }

    async fn reinitialize(&mut self) -> Result<(), TransportError> {
        self.log.push("reinit");
        if self.reinit_ok.pop_front().unwrap_or(false) {
            Ok(())
        } else {
            Err(TransportError::Client("scripted failure".into()))
        }
    }

    async fn subscribe(&mut self, topic: &str, _qos: u8) -> Result<(), TransportError> {
        self.log.push(format!("subscribe:{topic}"));
        Ok(())
    }

    async fn publish(
        &mut self,
        topic: &str,
        _payload: Vec<u8>,
        _qos: u8,
    ) -> Result<(), TransportError> {
        self.log.push(format!("publish:{topic}"));
        Ok(())
    }
}

/// Sleeps are recorded, never awaited for real.
#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

struct SharedSleeper(Arc<RecordingSleeper>);

#[async_trait]
impl Sleeper for SharedSleeper {
    async fn sleep(&self, duration: Duration) {
        self.0.delays.lock().push(duration);
    }
}

struct Harness {
    log: Arc<TransportLog>,
    sleeps: Arc<RecordingSleeper>,
    clock: FakeClock,
    shutdown: Arc<ShutdownRegistry>,
    service: MqttService<ScriptedTransport, FakeClock, SharedSleeper>,
}

fn harness(polls: Vec<PollEvent>, reconnect: Vec<bool>, reinit: Vec<bool>) -> Harness {
    let log = Arc::new(TransportLog::default());
    let sleeps = Arc::new(RecordingSleeper::default());
    let clock = FakeClock::new();
    let shutdown = Arc::new(ShutdownRegistry::new());
    let transport =
        ScriptedTransport::new(polls, Arc::clone(&log)).with_recovery(reconnect, reinit);
    let service = MqttService::with_parts(
        transport,
        Arc::clone(&shutdown),
        Box::new(|_, _| {}),
        clock.clone(),
        SharedSleeper(Arc::clone(&sleeps)),
    );
    Harness { log, sleeps, clock, shutdown, service }
}

fn secs(list: &[u64]) -> Vec<Duration> {
    list.iter().map(|s| Duration::from_secs(*s)).collect()
}

#[tokio::test]
async fn success_stream_never_reconnects() {
    let mut h = harness(
        vec![PollEvent::Idle, PollEvent::Idle, PollEvent::Idle],
        vec![],
        vec![],
    );
    for _ in 0..3 {
        h.service.tick().await;
    }
    assert_eq!(h.log.count_of("reconnect"), 0);
    assert_eq!(h.log.count_of("reinit"), 0);
    assert!(h.service.recovery().last_success.is_some());
}

#[tokio::test]
async fn no_connection_recovers_with_exponential_backoff() {
    // Lightweight fails on every attempt; full reinit succeeds on the 5th
    let mut h = harness(
        vec![PollEvent::Failed(LoopOutcome::NoConnection), PollEvent::Idle],
        vec![false; 5],
        vec![false, false, false, false, true],
    );

    h.service.tick().await;
    assert_eq!(h.log.count_of("reconnect"), 5);
    assert_eq!(h.log.count_of("reinit"), 5);
    // 30, 60, 120, 150, 150, then the 1 s stabilize pause
    assert_eq!(*h.sleeps.delays.lock(), secs(&[30, 60, 120, 150, 150, 1]));
    assert!(!h.shutdown.is_shutdown_requested());

    // Next tick succeeds and clears the counter
    h.service.tick().await;
    assert_eq!(h.service.recovery().count(LoopOutcome::NoConnection), 0);
    assert_eq!(h.service.recovery().reconnect_attempt, 0);
}

#[tokio::test]
async fn protocol_error_forces_full_reinit_immediately() {
    let mut h = harness(
        vec![PollEvent::Failed(LoopOutcome::ProtocolError)],
        vec![true; 5], // would succeed, but must not be tried
        vec![true],
    );

    h.service.tick().await;
    assert_eq!(h.log.count_of("reconnect"), 0);
    assert_eq!(h.log.count_of("reinit"), 1);
    assert_eq!(h.sleeps.delays.lock().first().copied(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn out_of_memory_waits_five_extra_seconds() {
    let mut h = harness(
        vec![PollEvent::Failed(LoopOutcome::OutOfMemory)],
        vec![],
        vec![true],
    );

    h.service.tick().await;
    // 5 s pre-recovery delay, then the first 30 s backoff
    let delays = h.sleeps.delays.lock().clone();
    assert_eq!(&delays[..2], &secs(&[5, 30])[..]);
    assert_eq!(h.log.count_of("reconnect"), 0);
}

#[tokio::test]
async fn stale_connection_triggers_forced_reinit() {
    let mut h = harness(
        vec![PollEvent::Idle, PollEvent::Failed(LoopOutcome::NoConnection)],
        vec![true], // lightweight recovery succeeds
        vec![true], // then the watchdog forces a rebuild anyway
    );

    h.service.tick().await;
    assert!(h.service.recovery().last_success.is_some());

    h.clock.advance(recovery::HEALTH_TIMEOUT + Duration::from_secs(1));
    h.service.tick().await;

    // Lightweight reconnect handled the failure, the watchdog then forced
    // a full reinitialisation on top
    assert_eq!(h.log.count_of("reconnect"), 1);
    assert_eq!(h.log.count_of("reinit"), 1);
}

#[tokio::test]
async fn exhaustion_requests_exit_exactly_once() {
    let mut h = harness(
        vec![
            PollEvent::Failed(LoopOutcome::NoConnection),
            PollEvent::Failed(LoopOutcome::NoConnection),
        ],
        vec![false; 10],
        vec![false; 10],
    );

    h.service.tick().await;
    assert!(h.shutdown.is_shutdown_requested());
    assert_eq!(h.shutdown.shutdown_reason(), "MQTT reconnection failed");

    // The pump observes the shutdown request and stops polling
    let polls_before = h.log.count_of("poll");
    h.service.tick().await;
    assert_eq!(h.log.count_of("poll"), polls_before);
    assert_eq!(h.shutdown.shutdown_reason(), "MQTT reconnection failed");
}

#[tokio::test]
async fn reconnect_resubscribes_every_recorded_topic() {
    let mut h = harness(
        vec![PollEvent::Failed(LoopOutcome::ConnectionLost)],
        vec![true],
        vec![],
    );
    for topic in ["device/d1/command", "site/s1/clients/connect"] {
        h.service
            .subscribe(topic, 1, Box::new(|_, _| Box::pin(async { Vec::new() })))
            .await
            .unwrap();
    }

    h.service.tick().await;
    // Initial subscribe + replay after the lightweight reconnect
    assert_eq!(h.log.count_of("subscribe:device/d1/command"), 2);
    assert_eq!(h.log.count_of("subscribe:site/s1/clients/connect"), 2);
}

#[tokio::test]
async fn messages_dispatch_to_matching_handlers_only() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut h = harness(
        vec![PollEvent::Message { topic: "device/d1/command".into(), payload: b"{}".to_vec() }],
        vec![],
        vec![],
    );

    let seen = Arc::clone(&hits);
    h.service
        .subscribe(
            "device/d1/command",
            1,
            Box::new(move |topic, _| {
                seen.lock().push(topic.to_string());
                Box::pin(async {
                    vec![OutboundMessage {
                        topic: "device/d1/out".into(),
                        payload: b"done".to_vec(),
                        qos: 0,
                    }]
                })
            }),
        )
        .await
        .unwrap();

    let other = Arc::clone(&hits);
    h.service
        .subscribe(
            "site/s1/clients/connect",
            1,
            Box::new(move |topic, _| {
                other.lock().push(format!("wrong:{topic}"));
                Box::pin(async { Vec::new() })
            }),
        )
        .await
        .unwrap();

    h.service.tick().await;
    assert_eq!(*hits.lock(), vec!["device/d1/command".to_string()]);
    // The handler's response was published
    assert_eq!(h.log.count_of("publish:device/d1/out"), 1);
}

#[tokio::test]
async fn subscription_table_is_bounded() {
    let mut h = harness(vec![], vec![], vec![]);
    for i in 0..MAX_TOPIC_HANDLERS {
        h.service
            .subscribe(&format!("topic/{i}"), 0, Box::new(|_, _| Box::pin(async { Vec::new() })))
            .await
            .unwrap();
    }
    let overflow = h
        .service
        .subscribe("topic/overflow", 0, Box::new(|_, _| Box::pin(async { Vec::new() })))
        .await;
    assert!(overflow.is_err());
}
