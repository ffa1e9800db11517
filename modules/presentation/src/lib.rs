// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Text rendering of the location snapshots.
//!
//! The list models keep the displayed rows of the current and last known fixes and report
//! the minimal set of row changes for every new snapshot.

use common::location::{LocationData, LocationFix};

pub mod console_view;

/// Row changes between two submitted lists, every entry is a provider name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListDiff {
    pub inserted: Vec<String>,
    pub removed: Vec<String>,
    /// Rows of the same provider whose content differs.
    pub changed: Vec<String>,
    /// Rows that kept their provider but changed their position relative to the other rows.
    pub moved: Vec<String>,
}

impl ListDiff {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.moved.is_empty()
    }
}

/// The rows of one fix list.
///
/// Rows are identified by provider. Two rows of the same provider are equal when every
/// field of the fix is equal.
#[derive(Debug, Default)]
pub struct LocationListModel {
    rows: Vec<LocationFix>,
}

impl LocationListModel {
    pub fn new() -> Self {
        LocationListModel::default()
    }

    /// Replaces the rows with `fixes` and returns what changed.
    pub fn submit(&mut self, fixes: &[LocationFix]) -> ListDiff {
        let mut diff = ListDiff::default();

        for old in self.rows.iter() {
            if find(fixes, old.provider.as_str()).is_none() {
                diff.removed.push(old.provider.clone());
            }
        }
        for new in fixes.iter() {
            match find(&self.rows, new.provider.as_str()) {
                None => diff.inserted.push(new.provider.clone()),
                Some(index) if self.rows[index] != *new => {
                    diff.changed.push(new.provider.clone())
                }
                Some(_) => (),
            }
        }

        let old_order: Vec<&str> = self
            .rows
            .iter()
            .map(|row| row.provider.as_str())
            .filter(|provider| find(fixes, provider).is_some())
            .collect();
        let new_order: Vec<&str> = fixes
            .iter()
            .map(|fix| fix.provider.as_str())
            .filter(|provider| find(&self.rows, provider).is_some())
            .collect();
        let stable = longest_common_subsequence(&old_order, &new_order);
        diff.moved = new_order
            .iter()
            .filter(|provider| !stable.contains(provider))
            .map(|provider| provider.to_string())
            .collect();

        self.rows = fixes.to_vec();
        diff
    }

    pub fn rows(&self) -> &[LocationFix] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// An empty model shows the placeholder instead of rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn find(rows: &[LocationFix], provider: &str) -> Option<usize> {
    rows.iter().position(|row| row.provider == provider)
}

/// Returns the longest sequence of providers that keep their relative order.
///
/// On ties the rows at the end of `new` are kept in place, so a provider that was updated
/// last and therefore appended is reported as moved.
fn longest_common_subsequence<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<&'a str> {
    let mut lengths = vec![vec![0usize; new.len() + 1]; old.len() + 1];
    for i in 1..=old.len() {
        for j in 1..=new.len() {
            lengths[i][j] = if old[i - 1] == new[j - 1] {
                lengths[i - 1][j - 1] + 1
            } else {
                lengths[i - 1][j].max(lengths[i][j - 1])
            };
        }
    }

    let mut sequence = Vec::with_capacity(lengths[old.len()][new.len()]);
    let (mut i, mut j) = (old.len(), new.len());
    while i > 0 && j > 0 {
        if old[i - 1] == new[j - 1] {
            sequence.push(old[i - 1]);
            i -= 1;
            j -= 1;
        } else if lengths[i][j - 1] >= lengths[i - 1][j] {
            j -= 1;
        } else {
            i -= 1;
        }
    }
    sequence.reverse();
    sequence
}

/// Renders the text lines of one fix row.
pub fn render_fix(fix: &LocationFix) -> Vec<String> {
    let mut lines = vec![
        format!("Provider: {}", fix.provider),
        format!("Lat: {:.6}, Lng: {:.6}", fix.latitude, fix.longitude),
        format!("Accuracy: {:.1}m", fix.accuracy),
    ];
    if fix.altitude != 0.0 {
        lines.push(format!("Altitude: {:.1}m", fix.altitude));
    }
    if fix.speed > 0.0 {
        lines.push(format!("Speed: {:.1} m/s", fix.speed));
    }
    if fix.bearing > 0.0 {
        lines.push(format!("Bearing: {:.1}°", fix.bearing));
    }
    if let Some(count) = fix.satellite_count {
        lines.push(format!("Satellites: {count}"));
    }
    if fix.is_mock {
        lines.push("⚠️ Mock Location".to_string());
    }
    lines.push(format!("Updated: {}", fix.timestamp));
    lines
}

/// The status header above the fix lists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusView {
    pub location_services: String,
    pub available_providers: String,
    pub enabled_providers: String,
    /// Only shown when the snapshot carries an error.
    pub error: Option<String>,
}

impl StatusView {
    pub fn render(data: &LocationData) -> Self {
        StatusView {
            location_services: format!(
                "Location Services: {}",
                if data.location_services_enabled {
                    "Enabled"
                } else {
                    "Disabled"
                }
            ),
            available_providers: format!(
                "Available Providers: {}",
                data.available_providers.join(", ")
            ),
            enabled_providers: format!(
                "Enabled Providers: {}",
                data.enabled_providers.join(", ")
            ),
            error: data.error_message.clone(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.location_services.clone(),
            self.available_providers.clone(),
            self.enabled_providers.clone(),
        ];
        if let Some(error) = &self.error {
            lines.push(format!("Error: {error}"));
        }
        lines
    }
}
