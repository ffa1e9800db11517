// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Platform Modul for the location monitor
//!
//! Provides the interfaces of the platform location service and the permission check that the
//! aggregator depends on, a simulated platform for running without location hardware and an
//! in-memory platform for tests.

use common::location::PlatformLocation;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use thiserror::Error;

pub mod simulated_source;
pub mod test_helper;

/// Errors reported by the platform location service.
///
/// None of them is fatal. The aggregator turns them into the error message of the next
/// published snapshot and keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// Neither fine nor coarse location permission is granted.
    #[error("Location permissions not granted")]
    PermissionDenied,

    /// A permission was lost between two calls of the platform.
    #[error("Security exception: {0}")]
    PermissionRevoked(String),

    /// The platform doesn't know the provider.
    #[error("Provider not available: {0}")]
    ProviderUnavailable(String),
}

/// Location permission categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PermissionKind {
    /// Precise location, needed for satellite status.
    Fine,
    /// Approximate location.
    Coarse,
}

/// Answers whether a location permission is currently granted.
pub trait PermissionOracle: Send + Sync {
    fn has_permission(&self, kind: PermissionKind) -> bool;

    /// Returns `true` if fine or coarse location permission is granted.
    fn has_location_permission(&self) -> bool {
        self.has_permission(PermissionKind::Fine) || self.has_permission(PermissionKind::Coarse)
    }
}

/// A [`PermissionOracle`] whose grants are set by the owner, e.g. from the command line.
///
/// Grants can be changed at any time to simulate a user revoking a permission.
#[derive(Debug, Default)]
pub struct StaticPermissions {
    fine: AtomicBool,
    coarse: AtomicBool,
}

impl StaticPermissions {
    pub fn new(fine: bool, coarse: bool) -> Self {
        StaticPermissions {
            fine: AtomicBool::new(fine),
            coarse: AtomicBool::new(coarse),
        }
    }

    pub fn set(&self, kind: PermissionKind, granted: bool) {
        match kind {
            PermissionKind::Fine => self.fine.store(granted, Ordering::SeqCst),
            PermissionKind::Coarse => self.coarse.store(granted, Ordering::SeqCst),
        }
    }
}

impl PermissionOracle for StaticPermissions {
    fn has_permission(&self, kind: PermissionKind) -> bool {
        match kind {
            PermissionKind::Fine => self.fine.load(Ordering::SeqCst),
            PermissionKind::Coarse => self.coarse.load(Ordering::SeqCst),
        }
    }
}

/// Identifies a registration at the platform, either location updates or satellite status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Parameters of a live location subscription.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateRequest {
    /// Minimum time between two fixes.
    pub min_time: Duration,
    /// Minimum distance in meters between two fixes.
    pub min_distance: f32,
}

impl Default for UpdateRequest {
    fn default() -> Self {
        UpdateRequest {
            min_time: Duration::from_millis(1000),
            min_distance: 0.0,
        }
    }
}

/// Receives live updates of one provider subscription.
///
/// The platform may call the methods from any thread and concurrently.
pub trait LocationListener: Send + Sync {
    /// A new fix of the subscribed provider is available.
    fn on_location_changed(&self, location: PlatformLocation);

    /// `provider` was enabled by the user.
    fn on_provider_enabled(&self, provider: &str);

    /// `provider` was disabled by the user.
    fn on_provider_disabled(&self, provider: &str);
}

/// Receives satellite status updates of the GNSS receiver.
pub trait GnssStatusListener: Send + Sync {
    fn on_satellite_status_changed(&self, satellite_count: u32);
}

/// Common interface of the platform location service.
///
/// Every call may be made from any thread. Implementations must not call a listener while
/// holding an internal lock that one of the other methods takes, because listeners call back
/// into the platform.
pub trait LocationPlatform: Send + Sync {
    /// Returns the names of all providers, enabled or not.
    fn all_providers(&self) -> Vec<String>;

    /// Returns the names of the enabled providers.
    fn enabled_providers(&self) -> Vec<String>;

    fn is_provider_enabled(&self, provider: &str) -> bool;

    /// Returns the cached fix of `provider`, `Ok(None)` if the provider never reported one.
    fn last_known_location(
        &self,
        provider: &str,
    ) -> Result<Option<PlatformLocation>, LocationError>;

    /// Subscribes `listener` to live fixes of `provider`.
    ///
    /// Registering the same listener for the same provider again replaces the previous
    /// registration.
    ///
    /// # Errors
    ///
    /// * [`LocationError::PermissionRevoked`] if the location permission is missing.
    /// * [`LocationError::ProviderUnavailable`] if the provider is unknown.
    fn request_location_updates(
        &self,
        provider: &str,
        request: &UpdateRequest,
        listener: Arc<dyn LocationListener>,
    ) -> Result<SubscriptionId, LocationError>;

    /// Releases a location subscription. Unknown ids are ignored.
    fn remove_updates(&self, id: SubscriptionId);

    /// Subscribes `listener` to satellite status updates.
    ///
    /// # Errors
    ///
    /// [`LocationError::PermissionRevoked`] if fine location permission is missing.
    fn register_gnss_status(
        &self,
        listener: Arc<dyn GnssStatusListener>,
    ) -> Result<SubscriptionId, LocationError>;

    /// Releases a satellite status subscription. Unknown ids are ignored.
    fn unregister_gnss_status(&self, id: SubscriptionId);
}

/// Returns `true` if both listeners are the same object.
pub(crate) fn same_listener<T: ?Sized>(lhs: &Arc<T>, rhs: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(lhs), Arc::as_ptr(rhs))
}
