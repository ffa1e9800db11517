// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{ListDiff, LocationListModel, StatusView, render_fix};
use async_trait::async_trait;
use common::location::LocationData;
use module_core::{EventKind, Module, ModuleCtx};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info};

pub const NO_CURRENT_DATA: &str = "No current location data";
pub const NO_LAST_KNOWN_DATA: &str = "No last known location data";

/// Shows every [`EventKind::LocationDataEvent`] on the log.
///
/// Only rows that were inserted or changed since the previous snapshot are printed, a
/// list without rows is printed as a placeholder.
pub struct ConsoleView {
    ctx: ModuleCtx,
    status: Option<StatusView>,
    current: LocationListModel,
    last_known: LocationListModel,
    json: bool,
}

impl ConsoleView {
    pub fn new(ctx: ModuleCtx) -> Self {
        ConsoleView {
            ctx,
            status: None,
            current: LocationListModel::new(),
            last_known: LocationListModel::new(),
            json: false,
        }
    }

    /// Additionally prints every snapshot as one JSON line on stdout.
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn status(&self) -> Option<&StatusView> {
        self.status.as_ref()
    }

    pub fn current_fixes(&self) -> &LocationListModel {
        &self.current
    }

    pub fn last_known_fixes(&self) -> &LocationListModel {
        &self.last_known
    }

    /// Updates the status and both lists. Returns the row changes of the current and the
    /// last known fixes.
    pub fn show(&mut self, data: &LocationData) -> (ListDiff, ListDiff) {
        let first = self.status.is_none();
        let status = StatusView::render(data);
        if self.status.as_ref() != Some(&status) {
            for line in status.lines() {
                info!("{line}");
            }
            self.status = Some(status);
        }

        let current_diff = self.current.submit(&data.current_fixes);
        print_list(
            "Current",
            &self.current,
            &current_diff,
            NO_CURRENT_DATA,
            first,
        );
        let last_known_diff = self.last_known.submit(&data.last_known_fixes);
        print_list(
            "Last known",
            &self.last_known,
            &last_known_diff,
            NO_LAST_KNOWN_DATA,
            first,
        );

        if self.json {
            match data.to_json() {
                Ok(json) => println!("{json}"),
                Err(e) => error!("Failed to serialize location data. Error: {e}"),
            }
        }
        (current_diff, last_known_diff)
    }
}

fn print_list(
    title: &str,
    model: &LocationListModel,
    diff: &ListDiff,
    placeholder: &str,
    first: bool,
) {
    if diff.is_empty() && !first {
        return;
    }
    if model.is_empty() {
        info!("{title}: {placeholder}");
        return;
    }
    if !diff.removed.is_empty() {
        debug!("{title}: removed {}", diff.removed.join(", "));
    }
    for fix in model.rows().iter().filter(|fix| {
        diff.inserted.contains(&fix.provider) || diff.changed.contains(&fix.provider)
    }) {
        info!("{title}: {}", render_fix(fix).join(" | "));
    }
}

#[async_trait]
impl Module for ConsoleView {
    async fn run(&mut self) -> Result<(), ()> {
        let mut run = true;
        while run {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => run = false,
                    EventKind::LocationDataEvent(data) => {
                        self.show(&data);
                    }
                },
                Err(RecvError::Closed) => run = false,
                Err(e) => {
                    error!("Failed to receive event in module ConsoleView. Error: {e}");
                }
            }
        }
        Ok(())
    }
}
