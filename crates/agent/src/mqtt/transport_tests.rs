// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    plain = { "broker.wayru.io", "broker.wayru.io" },
    mqtts = { "mqtts://broker.wayru.io", "broker.wayru.io" },
    mqtt = { "mqtt://broker.wayru.io", "broker.wayru.io" },
    ssl = { "ssl://broker.wayru.io", "broker.wayru.io" },
    with_port = { "mqtts://broker.wayru.io:8883", "broker.wayru.io" },
)]
fn broker_host_strips_scheme_and_port(url: &str, expected: &str) {
    assert_eq!(broker_host(url), expected);
}

#[parameterized(
    refused = { std::io::ErrorKind::ConnectionRefused, LoopOutcome::NoConnection },
    not_connected = { std::io::ErrorKind::NotConnected, LoopOutcome::NoConnection },
    timed_out = { std::io::ErrorKind::TimedOut, LoopOutcome::NoConnection },
    aborted = { std::io::ErrorKind::ConnectionAborted, LoopOutcome::ConnectionLost },
    reset = { std::io::ErrorKind::ConnectionReset, LoopOutcome::ConnectionLost },
    broken_pipe = { std::io::ErrorKind::BrokenPipe, LoopOutcome::ConnectionLost },
    oom = { std::io::ErrorKind::OutOfMemory, LoopOutcome::OutOfMemory },
    invalid_input = { std::io::ErrorKind::InvalidInput, LoopOutcome::InvalidParams },
    other = { std::io::ErrorKind::PermissionDenied, LoopOutcome::SystemError },
)]
fn io_errors_classify_by_kind(kind: std::io::ErrorKind, expected: LoopOutcome) {
    let error = ConnectionError::Io(std::io::Error::new(kind, "test"));
    assert_eq!(classify(&error), expected);
}

#[test]
fn timeouts_classify_as_no_connection() {
    assert_eq!(classify(&ConnectionError::NetworkTimeout), LoopOutcome::NoConnection);
    assert_eq!(classify(&ConnectionError::FlushTimeout), LoopOutcome::NoConnection);
    assert_eq!(classify(&ConnectionError::RequestsDone), LoopOutcome::ConnectionLost);
}

#[test]
fn qos_levels_map_to_rumqttc() {
    assert_eq!(qos_from(0), QoS::AtMostOnce);
    assert_eq!(qos_from(1), QoS::AtLeastOnce);
    assert_eq!(qos_from(2), QoS::ExactlyOnce);
}

#[test]
fn missing_tls_material_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(tls_config(dir.path()), Err(TransportError::Io(_))));
}
