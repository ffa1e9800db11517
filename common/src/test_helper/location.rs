// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::location::{LocationFix, PlatformLocation};

/// Epoch time of all test fixtures, 2024-05-01 12:30:15 UTC.
pub const FIXTURE_TIME_MS: i64 = 1_714_566_615_000;

/// Formatted [`FIXTURE_TIME_MS`] in UTC.
pub const FIXTURE_TIMESTAMP_UTC: &str = "2024-05-01 12:30:15";

/// Returns a platform reading of `provider` with plausible measurements.
pub fn get_platform_location(provider: &str, latitude: f64, longitude: f64) -> PlatformLocation {
    PlatformLocation {
        provider: Some(provider.to_string()),
        latitude,
        longitude,
        accuracy: 4.5,
        altitude: 102.0,
        bearing: 0.0,
        speed: 0.0,
        time_ms: FIXTURE_TIME_MS,
        is_mock: false,
    }
}

/// Returns the fix that [`get_platform_location`] converts to with a UTC formatter.
pub fn get_fix(provider: &str, latitude: f64, longitude: f64) -> LocationFix {
    LocationFix {
        provider: provider.to_string(),
        latitude,
        longitude,
        accuracy: 4.5,
        altitude: 102.0,
        bearing: 0.0,
        speed: 0.0,
        timestamp: FIXTURE_TIMESTAMP_UTC.to_string(),
        satellite_count: None,
        is_mock: false,
    }
}
