// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Site membership events from sibling routers on the same site.

use crate::mqtt::SharedMqtt;

pub fn connect_topic(site_id: &str) -> String {
    format!("site/{site_id}/clients/connect")
}

pub fn disconnect_topic(site_id: &str) -> String {
    format!("site/{site_id}/clients/disconnect")
}

/// Subscribe to the site's membership topics. No-op when the device is
/// not part of a site.
pub async fn init_site_clients(mqtt: &SharedMqtt, site_id: Option<&str>) {
    let Some(site_id) = site_id else {
        tracing::debug!("no site id, skipping site client subscriptions");
        return;
    };

    let mut service = mqtt.lock().await;
    for (topic, label) in [
        (connect_topic(site_id), "connect"),
        (disconnect_topic(site_id), "disconnect"),
    ] {
        let event = label.to_string();
        let result = service
            .subscribe(
                &topic,
                1,
                Box::new(move |_topic, payload| {
                    let event = event.clone();
                    let payload = String::from_utf8_lossy(payload).into_owned();
                    Box::pin(async move {
                        tracing::info!(event = %event, payload = %payload, "site client event");
                        Vec::new()
                    })
                }),
            )
            .await;
        if let Err(e) = result {
            tracing::error!(topic = %topic, error = %e, "site client subscription failed");
        }
    }
}

#[cfg(test)]
#[path = "site_clients_tests.rs"]
mod tests;
