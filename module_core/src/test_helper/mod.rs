// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{Event, EventBus, EventKind, EventKindType};
use tokio::time::timeout;
use tracing::debug;

/// Sends a quit signal to a running module and waits for it to stop gracefully.
///
/// This function publishes a [`QuitEvent`](EventKind::QuitEvent) through the given [`EventBus`],
/// signaling the target module to terminate. It then waits asynchronously for the module’s task
/// (represented by the provided [`tokio::task::JoinHandle`]) to complete within a fixed timeout.
///
/// # Panics
/// This function panics if:
/// - The module does not stop within 100 ms.
/// - The task returns an error (`Err(())`).
pub async fn stop_module(
    event_bus: &EventBus,
    handle: &mut tokio::task::JoinHandle<Result<(), ()>>,
) {
    event_bus.publish(&Event {
        kind: EventKind::QuitEvent,
    });
    timeout(std::time::Duration::from_millis(100), handle)
        .await
        .expect("Module doesn't handle quit event in timeout")
        .expect("Module task panicked")
        .expect("Module returned an error");
}

/// Waits asynchronously for a specific type of [`Event`] to be received on a
/// [`tokio::sync::broadcast::Receiver`] within a given duration.
///
/// The total waiting time is divided into ten polling steps, events of other
/// types are skipped.
///
/// # Panics
///
/// This function panics if no matching event is received within the specified
/// `duration`.
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
) -> Event {
    let deadline = tokio::time::Instant::now() + duration;
    let step_duration = duration / 10;
    while tokio::time::Instant::now() < deadline {
        if let Ok(Ok(event)) = timeout(step_duration, rx.recv()).await {
            debug!("wait_for_event received {:?}", event.event_type());
            if event.event_type() == exp_event {
                return event;
            }
        }
    }
    panic!("Failed to receive event of type {:?}", exp_event);
}

/// Waits for an event of type `exp_event` whose payload satisfies `predicate`.
///
/// # Panics
///
/// Panics if no such event arrives within `duration`.
pub async fn wait_for_matching_event<F>(
    rx: &mut tokio::sync::broadcast::Receiver<Event>,
    duration: std::time::Duration,
    exp_event: EventKindType,
    predicate: F,
) -> Event
where
    F: Fn(&Event) -> bool,
{
    let deadline = tokio::time::Instant::now() + duration;
    while tokio::time::Instant::now() < deadline {
        let remaining = deadline - tokio::time::Instant::now();
        if let Ok(Ok(event)) = timeout(remaining, rx.recv()).await
            && event.event_type() == exp_event
            && predicate(&event)
        {
            return event;
        }
    }
    panic!("Failed to receive matching event of type {:?}", exp_event);
}
