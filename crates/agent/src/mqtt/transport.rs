// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire-level MQTT transport.
//!
//! The production implementation wraps rumqttc with mutual TLS from the
//! credential material under the data path. Recovery logic and the
//! service layer talk to the [`MqttTransport`] trait so tests can script
//! outcomes.

use async_trait::async_trait;
use parking_lot::Mutex;
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS,
    TlsConfiguration, Transport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const MQTT_PORT: u16 = 8883;
pub const MQTT_PASSWORD: &str = "any";
pub const MQTT_CA_FILE: &str = "mqtt-ca.crt";
pub const MQTT_CERT_FILE: &str = "mqtt.crt";
pub const MQTT_KEY_FILE: &str = "mqtt.key";

/// Internal request-channel capacity between client and event loop.
const EVENT_QUEUE_CAPACITY: usize = 10;

/// How long a recovery attempt waits for a fresh CONNACK.
const CONNACK_TIMEOUT: Duration = Duration::from_secs(30);

/// Classified result of one loop-pump iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopOutcome {
    Success,
    NoConnection,
    ConnectionLost,
    SystemError,
    ProtocolError,
    InvalidParams,
    OutOfMemory,
    Unknown,
}

/// One pump iteration as seen by the service layer.
#[derive(Debug)]
pub enum PollEvent {
    /// CONNACK accepted; subscriptions must be replayed (clean session).
    Connected,
    Message { topic: String, payload: Vec<u8> },
    Idle,
    Failed(LoopOutcome),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS material error: {0}")]
    Tls(String),

    #[error("client error: {0}")]
    Client(String),
}

#[async_trait]
pub trait MqttTransport: Send {
    /// Pump the client's I/O once.
    async fn poll(&mut self) -> PollEvent;

    /// Re-establish the session keeping the client handle.
    async fn reconnect(&mut self) -> Result<(), TransportError>;

    /// Tear down and rebuild the client from config, then connect.
    async fn reinitialize(&mut self) -> Result<(), TransportError>;

    async fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), TransportError>;

    async fn publish(&mut self, topic: &str, payload: Vec<u8>, qos: u8)
        -> Result<(), TransportError>;
}

/// Map a connection error onto the recovery taxonomy.
pub fn classify(error: &ConnectionError) -> LoopOutcome {
    use std::io::ErrorKind;
    match error {
        ConnectionError::Io(e) => match e.kind() {
            ErrorKind::ConnectionRefused | ErrorKind::NotConnected | ErrorKind::TimedOut => {
                LoopOutcome::NoConnection
            }
            ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => LoopOutcome::ConnectionLost,
            ErrorKind::OutOfMemory => LoopOutcome::OutOfMemory,
            ErrorKind::InvalidInput => LoopOutcome::InvalidParams,
            _ => LoopOutcome::SystemError,
        },
        ConnectionError::MqttState(_) => LoopOutcome::ProtocolError,
        ConnectionError::NetworkTimeout | ConnectionError::FlushTimeout => LoopOutcome::NoConnection,
        ConnectionError::ConnectionRefused(_) => LoopOutcome::NoConnection,
        ConnectionError::Tls(_) => LoopOutcome::SystemError,
        ConnectionError::NotConnAck(_) => LoopOutcome::ProtocolError,
        ConnectionError::RequestsDone => LoopOutcome::ConnectionLost,
        _ => LoopOutcome::Unknown,
    }
}

pub fn qos_from(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        _ => QoS::ExactlyOnce,
    }
}

/// Connection settings; username changes on token rotation, the rest is
/// fixed at startup.
#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub client_id: String,
    pub broker_url: String,
    pub data_path: PathBuf,
    pub keepalive: Duration,
}

pub struct RumqttcTransport {
    settings: MqttSettings,
    /// Shared with the token-refresh subscriber: rotated in place, read at
    /// every (re)connect. Password stays the literal "any".
    username: Arc<Mutex<String>>,
    client: AsyncClient,
    eventloop: EventLoop,
}

impl RumqttcTransport {
    pub fn new(
        settings: MqttSettings,
        username: Arc<Mutex<String>>,
    ) -> Result<Self, TransportError> {
        let (client, eventloop) = build_client(&settings, &username.lock())?;
        Ok(Self { settings, username, client, eventloop })
    }

    async fn wait_for_connack(&mut self) -> Result<(), TransportError> {
        let deadline = tokio::time::Instant::now() + CONNACK_TIMEOUT;
        loop {
            let event = tokio::time::timeout_at(deadline, self.eventloop.poll())
                .await
                .map_err(|_| TransportError::Client("timed out waiting for CONNACK".into()))?;
            match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        return Ok(());
                    }
                    return Err(TransportError::Client(format!(
                        "broker rejected connection: {:?}",
                        ack.code
                    )));
                }
                Ok(_) => continue,
                Err(e) => return Err(TransportError::Client(e.to_string())),
            }
        }
    }
}

#[async_trait]
impl MqttTransport for RumqttcTransport {
    async fn poll(&mut self) -> PollEvent {
        match self.eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code == ConnectReturnCode::Success {
                    tracing::info!("connected to the broker");
                    PollEvent::Connected
                } else {
                    tracing::error!(code = ?ack.code, "unable to connect to the broker");
                    PollEvent::Failed(LoopOutcome::NoConnection)
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => PollEvent::Message {
                topic: publish.topic.clone(),
                payload: publish.payload.to_vec(),
            },
            Ok(_) => PollEvent::Idle,
            Err(e) => {
                tracing::error!(error = %e, "mqtt loop error");
                PollEvent::Failed(classify(&e))
            }
        }
    }

    async fn reconnect(&mut self) -> Result<(), TransportError> {
        // rumqttc re-dials on the next poll; drive the loop until the
        // broker accepts the session again.
        self.wait_for_connack().await
    }

    async fn reinitialize(&mut self) -> Result<(), TransportError> {
        let username = self.username.lock().clone();
        let (client, eventloop) = build_client(&self.settings, &username)?;
        self.client = client;
        self.eventloop = eventloop;
        self.wait_for_connack().await
    }

    async fn subscribe(&mut self, topic: &str, qos: u8) -> Result<(), TransportError> {
        self.client
            .subscribe(topic, qos_from(qos))
            .await
            .map_err(|e| TransportError::Client(e.to_string()))
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: Vec<u8>,
        qos: u8,
    ) -> Result<(), TransportError> {
        self.client
            .publish(topic, qos_from(qos), false, payload)
            .await
            .map_err(|e| TransportError::Client(e.to_string()))
    }
}

fn build_client(
    settings: &MqttSettings,
    username: &str,
) -> Result<(AsyncClient, EventLoop), TransportError> {
    let host = broker_host(&settings.broker_url);
    let mut options = MqttOptions::new(&settings.client_id, host, MQTT_PORT);
    options.set_credentials(username, MQTT_PASSWORD);
    options.set_keep_alive(settings.keepalive);
    options.set_clean_session(true);

    let tls = tls_config(&settings.data_path)?;
    options.set_transport(Transport::Tls(TlsConfiguration::Rustls(Arc::new(tls))));

    Ok(AsyncClient::new(options, EVENT_QUEUE_CAPACITY))
}

/// Strip any scheme prefix; rumqttc takes a bare host.
fn broker_host(broker_url: &str) -> String {
    let host = broker_url
        .trim_start_matches("mqtts://")
        .trim_start_matches("mqtt://")
        .trim_start_matches("ssl://");
    host.split(':').next().unwrap_or(host).to_string()
}

/// Mutual-TLS config: broker CA plus the device client certificate.
fn tls_config(data_path: &Path) -> Result<rustls::ClientConfig, TransportError> {
    let ca_pem = std::fs::read(data_path.join(MQTT_CA_FILE))?;
    let cert_pem = std::fs::read(data_path.join(MQTT_CERT_FILE))?;
    let key_pem = std::fs::read(data_path.join(MQTT_KEY_FILE))?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut ca_pem.as_slice()) {
        let cert = cert.map_err(|e| TransportError::Tls(format!("bad CA certificate: {e}")))?;
        roots
            .add(cert)
            .map_err(|e| TransportError::Tls(format!("cannot add CA certificate: {e}")))?;
    }

    let certs = rustls_pemfile::certs(&mut cert_pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Tls(format!("bad client certificate: {e}")))?;
    let key = rustls_pemfile::private_key(&mut key_pem.as_slice())
        .map_err(|e| TransportError::Tls(format!("bad private key: {e}")))?
        .ok_or_else(|| TransportError::Tls("no private key found".into()))?;

    rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_client_auth_cert(certs, key)
        .map_err(|e| TransportError::Tls(e.to_string()))
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
