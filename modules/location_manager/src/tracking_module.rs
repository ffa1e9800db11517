// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::LocationDataManager;
use async_trait::async_trait;
use module_core::{EventKind, Module, ModuleCtx};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info};

/// Runs a [`LocationDataManager`] as a module of the event bus.
///
/// The manager is started when the module runs. Every snapshot it publishes is forwarded as
/// [`EventKind::LocationDataEvent`]. A [`EventKind::QuitEvent`] stops the manager and ends the
/// module.
pub struct LocationTracking {
    ctx: ModuleCtx,
    manager: LocationDataManager,
}

impl LocationTracking {
    pub fn new(ctx: ModuleCtx, manager: LocationDataManager) -> Self {
        LocationTracking { ctx, manager }
    }
}

#[async_trait]
impl Module for LocationTracking {
    async fn run(&mut self) -> Result<(), ()> {
        let mut snapshots = self.manager.subscribe();
        self.manager.start();
        info!("LocationTracking module started");

        let mut run = true;
        while run {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        error!("Location snapshot channel closed");
                        run = false;
                        continue;
                    }
                    let data = snapshots.borrow_and_update().clone();
                    debug!("Forwarding snapshot with {} current fixes", data.current_fixes.len());
                    let _ = self.ctx.publish_event(EventKind::LocationDataEvent(data));
                }
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => {
                            if let EventKind::QuitEvent = event.kind {
                                run = false;
                            }
                        }
                        Err(RecvError::Closed) => run = false,
                        Err(e) => {
                            error!("Failed to receive event in module LocationTracking. Error: {e}");
                        }
                    }
                }
            }
        }
        self.manager.stop();
        info!("LocationTracking module stopped");
        Ok(())
    }
}
