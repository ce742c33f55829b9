// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MQTT client: subscription registry, loop pump, and the recovery
//! state machine built on the error taxonomy in [`recovery`].

pub mod recovery;
pub mod transport;

pub use recovery::{RecoveryState, Sleeper, TokioSleeper};
pub use transport::{
    LoopOutcome, MqttSettings, MqttTransport, PollEvent, RumqttcTransport, TransportError,
};

use recovery::{
    backoff_delay, forces_full_reinit, max_attempts, OUT_OF_MEMORY_EXTRA_DELAY, STABILIZE_DELAY,
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use wayru_core::{Clock, ShutdownRegistry, SystemClock};

/// Bounded subscription table, as on the wire library it replaces.
pub const MAX_TOPIC_HANDLERS: usize = 10;

/// Concrete service handle shared across scheduler tasks. A tokio mutex:
/// ticks hold the guard across await points.
pub type SharedMqtt = Arc<tokio::sync::Mutex<MqttService<RumqttcTransport>>>;

/// A message a handler wants published in response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
}

impl OutboundMessage {
    pub fn json(topic: impl Into<String>, value: &serde_json::Value, qos: u8) -> Self {
        Self { topic: topic.into(), payload: value.to_string().into_bytes(), qos }
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Vec<OutboundMessage>> + Send>>;

/// Topic handlers run synchronously on the loop thread and return any
/// messages to publish in response.
pub type MessageHandler = Box<dyn FnMut(&str, &[u8]) -> HandlerFuture + Send + Sync>;

/// Diagnostic/LED callback: (healthy, reason).
pub type StatusSink = Box<dyn Fn(bool, &str) + Send + Sync>;

struct Subscription {
    topic: String,
    qos: u8,
    handler: MessageHandler,
}

pub struct MqttService<T: MqttTransport, C: Clock = SystemClock, S: Sleeper = TokioSleeper> {
    transport: T,
    subscriptions: Vec<Subscription>,
    recovery: RecoveryState,
    clock: C,
    sleeper: S,
    status_sink: StatusSink,
    shutdown: Arc<ShutdownRegistry>,
}

impl<T: MqttTransport> MqttService<T> {
    pub fn new(transport: T, shutdown: Arc<ShutdownRegistry>, status_sink: StatusSink) -> Self {
        Self::with_parts(transport, shutdown, status_sink, SystemClock, TokioSleeper)
    }
}

impl<T, C, S> MqttService<T, C, S>
where
    T: MqttTransport,
    C: Clock,
    S: Sleeper,
{
    pub fn with_parts(
        transport: T,
        shutdown: Arc<ShutdownRegistry>,
        status_sink: StatusSink,
        clock: C,
        sleeper: S,
    ) -> Self {
        Self {
            transport,
            subscriptions: Vec::new(),
            recovery: RecoveryState::new(),
            clock,
            sleeper,
            status_sink,
            shutdown,
        }
    }

    /// Register a topic handler. The subscription is recorded only when
    /// the transport accepts it, and the table is bounded.
    pub async fn subscribe(
        &mut self,
        topic: &str,
        qos: u8,
        handler: MessageHandler,
    ) -> Result<(), TransportError> {
        if self.subscriptions.len() >= MAX_TOPIC_HANDLERS {
            return Err(TransportError::Client(
                "maximum number of topic handlers reached".into(),
            ));
        }
        self.transport.subscribe(topic, qos).await?;
        tracing::info!(topic, "subscribed to topic");
        self.subscriptions.push(Subscription { topic: topic.to_string(), qos, handler });
        Ok(())
    }

    /// Fire-and-forget publish; failures log but do not change FSM state.
    pub async fn publish(&mut self, topic: &str, payload: Vec<u8>, qos: u8) {
        if let Err(e) = self.transport.publish(topic, payload, qos).await {
            tracing::error!(topic, error = %e, "unable to publish message");
        }
    }

    pub fn recovery(&self) -> &RecoveryState {
        &self.recovery
    }

    /// One pump of the loop: poll, dispatch, classify, recover.
    pub async fn tick(&mut self) {
        if self.shutdown.is_shutdown_requested() {
            tracing::info!("shutdown requested, stopping MQTT pump");
            return;
        }

        let outcome = match self.transport.poll().await {
            PollEvent::Connected => {
                // Clean session: the broker dropped our subscriptions
                self.resubscribe_all().await;
                LoopOutcome::Success
            }
            PollEvent::Message { topic, payload } => {
                self.dispatch(&topic, &payload).await;
                LoopOutcome::Success
            }
            PollEvent::Idle => LoopOutcome::Success,
            PollEvent::Failed(kind) => kind,
        };

        match outcome {
            LoopOutcome::Success => {
                self.recovery.record_success(self.clock.now());
                (self.status_sink)(true, "MQTT successful");
            }
            kind => {
                let count = self.recovery.record_failure(kind);
                tracing::error!(
                    kind = ?kind,
                    count,
                    max = max_attempts(kind),
                    "mqtt loop error"
                );
                if self.recover(kind, forces_full_reinit(kind)).await {
                    self.recovery.reset_kind(kind);
                } else {
                    return;
                }
            }
        }

        // Health watchdog: an apparently connected client that makes no
        // I/O progress gets torn down and rebuilt.
        if self.recovery.health_expired(self.clock.now()) {
            tracing::error!(
                timeout_s = recovery::HEALTH_TIMEOUT.as_secs(),
                "no successful MQTT operations, forcing reconnection"
            );
            let _ = self.recover(LoopOutcome::Unknown, true).await;
        }
    }

    async fn dispatch(&mut self, topic: &str, payload: &[u8]) {
        let mut outbound = Vec::new();
        for sub in &mut self.subscriptions {
            if sub.topic == topic {
                outbound.extend((sub.handler)(topic, payload).await);
            }
        }
        for message in outbound {
            self.publish(&message.topic, message.payload, message.qos).await;
        }
    }

    async fn resubscribe_all(&mut self) {
        tracing::info!(count = self.subscriptions.len(), "resubscribing to topics");
        for sub in &self.subscriptions {
            match self.transport.subscribe(&sub.topic, sub.qos).await {
                Ok(()) => tracing::info!(topic = %sub.topic, "resubscribed to topic"),
                Err(e) => {
                    tracing::error!(topic = %sub.topic, error = %e, "unable to resubscribe")
                }
            }
        }
    }

    /// Bounded recovery with exponential backoff. Returns false after
    /// exhaustion, with the exit request already issued.
    async fn recover(&mut self, kind: LoopOutcome, force_full: bool) -> bool {
        if kind == LoopOutcome::OutOfMemory {
            self.sleeper.sleep(OUT_OF_MEMORY_EXTRA_DELAY).await;
        }

        let max = max_attempts(kind);
        while self.recovery.reconnect_attempt < max {
            self.recovery.reconnect_attempt += 1;
            let delay = backoff_delay(self.recovery.reconnect_attempt);
            tracing::info!(
                attempt = self.recovery.reconnect_attempt,
                max,
                delay_s = delay.as_secs(),
                "attempting reconnection"
            );
            self.sleeper.sleep(delay).await;

            if !force_full {
                match self.transport.reconnect().await {
                    Ok(()) => {
                        tracing::info!("lightweight reconnection successful");
                        self.settle().await;
                        (self.status_sink)(true, "MQTT reconnected");
                        return true;
                    }
                    Err(e) => tracing::error!(error = %e, "lightweight reconnection failed"),
                }
            } else {
                tracing::info!(
                    "skipping lightweight reconnection, error type requires full reinitialization"
                );
            }

            match self.transport.reinitialize().await {
                Ok(()) => {
                    tracing::info!("complete reinitialization successful");
                    self.settle().await;
                    (self.status_sink)(true, "MQTT fully reinitialized");
                    return true;
                }
                Err(e) => tracing::error!(error = %e, "complete reinitialization failed"),
            }
        }

        tracing::error!("all reconnection strategies failed, requesting exit");
        (self.status_sink)(false, "MQTT recovery failed");
        self.shutdown.request_exit("MQTT reconnection failed");
        false
    }

    async fn settle(&mut self) {
        self.sleeper.sleep(STABILIZE_DELAY).await;
        self.resubscribe_all().await;
        self.recovery.reconnect_attempt = 0;
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
