// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::location::LocationData;
use module_core::{test_helper::wait_for_event, *};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
#[test_log::test]
pub async fn events_delivered() {
    let event_bus = EventBus::new();
    let mut receiver = event_bus.subscribe();
    let event = Event {
        kind: EventKind::QuitEvent,
    };
    event_bus.publish(&event);
    let received_event = tokio::time::timeout(Duration::from_millis(100), receiver.recv())
        .await
        .expect("Failed to receive event in required time")
        .unwrap();
    assert_eq!(received_event.event_type(), event.event_type());
}

#[tokio::test]
#[test_log::test]
pub async fn wait_for_location_data_event() {
    let event_bus = EventBus::new();
    let ctx = event_bus.context();
    let mut receiver = event_bus.subscribe();
    let data = Arc::new(LocationData {
        location_services_enabled: true,
        ..Default::default()
    });

    ctx.publish_event(EventKind::QuitEvent)
        .expect("Failed to publish quit event");
    ctx.publish_event(EventKind::LocationDataEvent(data.clone()))
        .expect("Failed to publish location data event");

    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LocationDataEvent,
    )
    .await;
    let received = payload_ref!(event.kind, EventKind::LocationDataEvent).unwrap();
    assert_eq!(**received, *data);
}

#[test]
pub fn payload_of_other_variant_is_none() {
    let kind = EventKind::QuitEvent;
    assert!(payload_ref!(kind, EventKind::LocationDataEvent).is_none());
}
