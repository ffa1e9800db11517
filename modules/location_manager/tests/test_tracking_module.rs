// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::clock::UtcTimestampFormatter;
use common::location::{GPS_PROVIDER, NETWORK_PROVIDER};
use common::test_helper::location::{get_fix, get_platform_location};
use location_manager::LocationDataManager;
use location_manager::tracking_module::LocationTracking;
use module_core::test_helper::{stop_module, wait_for_event, wait_for_matching_event};
use module_core::{EventBus, EventKind, EventKindType, Module, payload_ref};
use platform::{StaticPermissions, test_helper::FakePlatform};
use std::sync::Arc;
use std::time::Duration;

fn create_tracking(
    event_bus: &EventBus,
    manager: LocationDataManager,
) -> tokio::task::JoinHandle<Result<(), ()>> {
    let tracking = LocationTracking::new(event_bus.context(), manager);
    tokio::spawn(async move {
        let mut tracking = tracking;
        tracking.run().await
    })
}

fn create_manager(platform: &Arc<FakePlatform>, fine: bool, coarse: bool) -> LocationDataManager {
    LocationDataManager::new(
        platform.clone(),
        Arc::new(StaticPermissions::new(fine, coarse)),
        Arc::new(UtcTimestampFormatter::new()),
    )
}

#[tokio::test]
#[test_log::test]
pub async fn publish_snapshot_after_start() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let platform = FakePlatform::new(&[GPS_PROVIDER, NETWORK_PROVIDER]);
    let manager = create_manager(&platform, true, true);
    let mut handle = create_tracking(&event_bus, manager.clone());

    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LocationDataEvent,
    )
    .await;
    let data = payload_ref!(event.kind, EventKind::LocationDataEvent).unwrap();
    assert!(data.location_services_enabled);
    assert_eq!(data.enabled_providers, vec![GPS_PROVIDER, NETWORK_PROVIDER]);
    assert!(manager.is_running());

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
pub async fn forward_merged_fixes() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let platform = FakePlatform::new(&[GPS_PROVIDER, NETWORK_PROVIDER]);
    let mut handle = create_tracking(&event_bus, create_manager(&platform, true, true));
    wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LocationDataEvent,
    )
    .await;

    platform.emit_location(GPS_PROVIDER, get_platform_location(GPS_PROVIDER, 48.1, 11.5));

    let event = wait_for_matching_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LocationDataEvent,
        |event| {
            payload_ref!(event.kind, EventKind::LocationDataEvent)
                .is_some_and(|data| !data.current_fixes.is_empty())
        },
    )
    .await;
    let data = payload_ref!(event.kind, EventKind::LocationDataEvent).unwrap();
    assert_eq!(data.current_fixes, vec![get_fix(GPS_PROVIDER, 48.1, 11.5)]);

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
pub async fn publish_permission_error() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let platform = FakePlatform::new(&[GPS_PROVIDER]);
    let mut handle = create_tracking(&event_bus, create_manager(&platform, false, false));

    let event = wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LocationDataEvent,
    )
    .await;
    let data = payload_ref!(event.kind, EventKind::LocationDataEvent).unwrap();
    assert_eq!(
        data.error_message.as_deref(),
        Some("Location permissions not granted")
    );
    assert_eq!(platform.active_subscriptions(), 0);

    stop_module(&event_bus, &mut handle).await;
}

#[tokio::test]
#[test_log::test]
pub async fn quit_event_stops_the_manager() {
    let event_bus = EventBus::default();
    let mut receiver = event_bus.subscribe();
    let platform = FakePlatform::new(&[GPS_PROVIDER, NETWORK_PROVIDER]);
    let manager = create_manager(&platform, true, true);
    let mut handle = create_tracking(&event_bus, manager.clone());
    wait_for_event(
        &mut receiver,
        Duration::from_millis(100),
        EventKindType::LocationDataEvent,
    )
    .await;
    assert_eq!(platform.active_subscriptions(), 2);

    stop_module(&event_bus, &mut handle).await;

    assert!(!manager.is_running());
    assert_eq!(platform.active_subscriptions(), 0);
    assert_eq!(platform.gnss_registrations(), 0);
}
