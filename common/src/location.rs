// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::clock::TimestampFormatter;
use serde::{Deserialize, Serialize};

/// Name of the satellite based provider. Only fixes of this provider carry a satellite count.
pub const GPS_PROVIDER: &str = "gps";

/// Name of the cell/wifi based provider.
pub const NETWORK_PROVIDER: &str = "network";

/// Name of the provider that only receives fixes requested by other clients.
pub const PASSIVE_PROVIDER: &str = "passive";

/// Name of the fused provider.
pub const FUSED_PROVIDER: &str = "fused";

/// A raw location reading as it is handed out by the platform location service.
///
/// The platform may omit the provider of a reading, in that case the provider the
/// updates were requested for is used.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformLocation {
    pub provider: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
    pub altitude: f64,
    pub bearing: f32,
    pub speed: f32,
    /// Time of the fix in milliseconds since the unix epoch.
    pub time_ms: i64,
    pub is_mock: bool,
}

impl PlatformLocation {
    /// Creates a reading of `provider` at the given coordinates.
    ///
    /// All optional measurements (accuracy, altitude, bearing and speed) are zero.
    pub fn new(provider: &str, latitude: f64, longitude: f64, time_ms: i64) -> Self {
        PlatformLocation {
            provider: Some(provider.to_string()),
            latitude,
            longitude,
            time_ms,
            ..Default::default()
        }
    }
}

/// One location reading from one provider, ready to be displayed.
///
/// # Fields
///
/// - `provider` – Name of the provider that produced the fix.
/// - `latitude`/`longitude` – Position in decimal degrees.
/// - `accuracy` – Estimated horizontal accuracy in meters.
/// - `altitude` – Altitude in meters, `0.0` if unknown.
/// - `bearing` – Bearing in degrees, `0.0` if unknown or not moving.
/// - `speed` – Speed in meters per second.
/// - `timestamp` – Fix time formatted as `yyyy-MM-dd HH:mm:ss` in local time.
/// - `satellite_count` – Satellites of the last GNSS status, only set for the GNSS provider,
///   [`GPS_PROVIDER`] by default.
/// - `is_mock` – `true` if the platform flagged the fix as simulated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub provider: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
    pub altitude: f64,
    pub bearing: f32,
    pub speed: f32,
    pub timestamp: String,
    pub satellite_count: Option<u32>,
    pub is_mock: bool,
}

impl LocationFix {
    /// Converts a platform reading into a [`LocationFix`].
    ///
    /// # Arguments
    ///
    /// * `location` – The raw platform reading.
    /// * `requested_provider` – The provider the reading was requested for. Used when the
    ///   reading doesn't name its provider.
    /// * `satellite_count` – The latest satellite count. Attached only if the resulting
    ///   provider is `gnss_provider`.
    /// * `gnss_provider` – The provider whose fixes carry the satellite count.
    /// * `formatter` – Formats the epoch time of the reading.
    pub fn from_platform(
        location: &PlatformLocation,
        requested_provider: &str,
        satellite_count: Option<u32>,
        gnss_provider: &str,
        formatter: &dyn TimestampFormatter,
    ) -> Self {
        let provider = match location.provider.as_deref() {
            Some(provider) if !provider.is_empty() => provider.to_string(),
            _ => requested_provider.to_string(),
        };
        let satellite_count = if provider == gnss_provider {
            satellite_count
        } else {
            None
        };
        LocationFix {
            provider,
            latitude: location.latitude,
            longitude: location.longitude,
            accuracy: location.accuracy,
            altitude: location.altitude,
            bearing: location.bearing,
            speed: location.speed,
            timestamp: formatter.format(location.time_ms),
            satellite_count,
            is_mock: location.is_mock,
        }
    }
}

/// The aggregated location state that is published to observers.
///
/// A published value is never changed. Every update creates a new snapshot from the
/// previous one, see [`LocationData::with_fix`] and [`LocationData::with_error`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub location_services_enabled: bool,
    pub available_providers: Vec<String>,
    pub enabled_providers: Vec<String>,
    /// Live fixes, at most one per provider.
    pub current_fixes: Vec<LocationFix>,
    /// Cached fixes collected once at start, at most one per provider.
    pub last_known_fixes: Vec<LocationFix>,
    pub error_message: Option<String>,
}

impl LocationData {
    /// Returns a copy of the snapshot with `fix` merged into the current fixes.
    ///
    /// A previous fix of the same provider is removed and the new fix is appended, so the
    /// current fixes stay unique by provider. The error message is cleared.
    pub fn with_fix(&self, fix: LocationFix) -> LocationData {
        let mut current_fixes: Vec<LocationFix> = self
            .current_fixes
            .iter()
            .filter(|current| current.provider != fix.provider)
            .cloned()
            .collect();
        current_fixes.push(fix);
        LocationData {
            current_fixes,
            error_message: None,
            ..self.clone()
        }
    }

    /// Returns a copy of the snapshot that carries `message` and keeps every other field.
    pub fn with_error(&self, message: impl Into<String>) -> LocationData {
        LocationData {
            error_message: Some(message.into()),
            ..self.clone()
        }
    }

    /// Returns the current fix of `provider` if one was received.
    pub fn current_fix(&self, provider: &str) -> Option<&LocationFix> {
        self.current_fixes.iter().find(|fix| fix.provider == provider)
    }

    /// Returns the last known fix of `provider` if the platform reported one.
    pub fn last_known_fix(&self, provider: &str) -> Option<&LocationFix> {
        self.last_known_fixes
            .iter()
            .find(|fix| fix.provider == provider)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Collapses `fixes` so that only the last fix of every provider remains.
///
/// The relative order of the remaining fixes is kept.
pub fn unique_by_provider(fixes: Vec<LocationFix>) -> Vec<LocationFix> {
    let mut unique: Vec<LocationFix> = Vec::with_capacity(fixes.len());
    for fix in fixes {
        unique.retain(|known| known.provider != fix.provider);
        unique.push(fix);
    }
    unique
}
