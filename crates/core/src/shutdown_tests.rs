// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn cleanups_run_in_reverse_order() {
    let registry = ShutdownRegistry::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        assert!(registry.register(tag, move || order.lock().push(tag)));
    }

    registry.run_cleanups("test");
    assert_eq!(*order.lock(), vec!["third", "second", "first"]);
}

#[test]
fn cleanups_run_at_most_once() {
    let registry = ShutdownRegistry::new();
    let count = Arc::new(Mutex::new(0));
    let c = Arc::clone(&count);
    registry.register("counter", move || *c.lock() += 1);

    registry.run_cleanups("first pass");
    registry.run_cleanups("second pass");
    assert_eq!(*count.lock(), 1);
}

#[test]
fn registration_is_bounded() {
    let registry = ShutdownRegistry::new();
    for i in 0..MAX_CLEANUPS {
        assert!(registry.register(&format!("cleanup-{i}"), || {}));
    }
    assert!(!registry.register("one too many", || {}));
}

#[test]
fn exit_request_records_first_reason() {
    let registry = ShutdownRegistry::new();
    assert!(!registry.is_shutdown_requested());
    assert_eq!(registry.shutdown_reason(), "Shutdown requested");

    registry.request_exit("MQTT reconnection failed");
    registry.request_exit("later reason");

    assert!(registry.is_shutdown_requested());
    assert_eq!(registry.shutdown_reason(), "MQTT reconnection failed");
}

#[tokio::test]
async fn requested_wakes_waiters() {
    let registry = Arc::new(ShutdownRegistry::new());
    let waiter = {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move { registry.requested().await })
    };

    registry.request_exit("test exit");
    waiter.await.unwrap();
    assert!(registry.is_shutdown_requested());
}
