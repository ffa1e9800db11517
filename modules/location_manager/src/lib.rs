// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Location Manager Modul for the location monitor
//!
//! Aggregates the fixes of every location provider into one [`LocationData`] snapshot and
//! publishes it to a single observer.

use common::clock::TimestampFormatter;
use common::location::{
    GPS_PROVIDER, LocationData, LocationFix, NETWORK_PROVIDER, PlatformLocation,
    unique_by_provider,
};
use platform::{
    GnssStatusListener, LocationError, LocationListener, LocationPlatform, PermissionKind,
    PermissionOracle, SubscriptionId, UpdateRequest,
};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub mod tracking_module;

/// Settings of the [`LocationDataManager`].
#[derive(Clone, Debug, PartialEq)]
pub struct TrackingConfig {
    /// Minimal interval between two fixes of one provider.
    pub min_time: Duration,
    /// Minimal distance in meters between two fixes of one provider.
    pub min_distance: f32,
    /// The provider whose fixes carry the satellite count.
    pub gnss_provider: String,
    /// Together with `gnss_provider` decides whether location services are enabled.
    pub network_provider: String,
}

impl TrackingConfig {
    fn update_request(&self) -> UpdateRequest {
        UpdateRequest {
            min_time: self.min_time,
            min_distance: self.min_distance,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        let request = UpdateRequest::default();
        TrackingConfig {
            min_time: request.min_time,
            min_distance: request.min_distance,
            gnss_provider: GPS_PROVIDER.to_string(),
            network_provider: NETWORK_PROVIDER.to_string(),
        }
    }
}

struct TrackingState {
    snapshot: Arc<LocationData>,
    running: bool,
    /// Incremented on every start and stop. Listeners of an older generation are ignored.
    generation: u64,
    subscriptions: Vec<(String, SubscriptionId)>,
    gnss_subscription: Option<SubscriptionId>,
    satellite_count: Option<u32>,
}

struct ManagerCore {
    platform: Arc<dyn LocationPlatform>,
    permissions: Arc<dyn PermissionOracle>,
    formatter: Arc<dyn TimestampFormatter>,
    config: TrackingConfig,
    state: Mutex<TrackingState>,
    publisher: watch::Sender<Arc<LocationData>>,
}

/// Receives the fixes and provider state changes of one provider for one start generation.
struct ProviderListener {
    core: Weak<ManagerCore>,
    provider: String,
    generation: u64,
}

impl LocationListener for ProviderListener {
    fn on_location_changed(&self, location: PlatformLocation) {
        if let Some(core) = self.core.upgrade() {
            core.merge_location(self.generation, &self.provider, &location);
        }
    }

    fn on_provider_enabled(&self, provider: &str) {
        if let Some(core) = self.core.upgrade() {
            info!("Provider {provider} enabled, restarting location updates");
            core.restart(self.generation);
        }
    }

    fn on_provider_disabled(&self, provider: &str) {
        if let Some(core) = self.core.upgrade() {
            info!("Provider {provider} disabled, restarting location updates");
            core.restart(self.generation);
        }
    }
}

struct SatelliteStatusListener {
    core: Weak<ManagerCore>,
    generation: u64,
}

impl GnssStatusListener for SatelliteStatusListener {
    fn on_satellite_status_changed(&self, satellite_count: u32) {
        if let Some(core) = self.core.upgrade() {
            core.update_satellite_count(self.generation, satellite_count);
        }
    }
}

impl ManagerCore {
    fn lock(&self) -> MutexGuard<'_, TrackingState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the snapshot and notifies the observer. Must be called with the state locked.
    fn publish(&self, state: &mut TrackingState, data: LocationData) {
        let data = Arc::new(data);
        state.snapshot = data.clone();
        self.publisher.send_replace(data);
    }

    fn is_current(state: &TrackingState, generation: u64) -> bool {
        state.running && state.generation == generation
    }

    /// Runs the start sequence.
    ///
    /// With `expected_generation` set, the start only happens if tracking is still running in
    /// that generation. This keeps provider state events from restarting a stopped manager.
    fn start(self: &Arc<Self>, expected_generation: Option<u64>) {
        if !self.permissions.has_location_permission() {
            warn!("Location updates not started, no location permission granted");
            let mut state = self.lock();
            if let Some(expected) = expected_generation
                && !Self::is_current(&state, expected)
            {
                return;
            }
            let data = state
                .snapshot
                .with_error(LocationError::PermissionDenied.to_string());
            self.publish(&mut state, data);
            return;
        }

        let (generation, previous_subscriptions, previous_gnss) = {
            let mut state = self.lock();
            if let Some(expected) = expected_generation
                && !Self::is_current(&state, expected)
            {
                debug!("Ignoring restart of generation {expected}");
                return;
            }
            state.generation += 1;
            state.running = true;
            (
                state.generation,
                std::mem::take(&mut state.subscriptions),
                state.gnss_subscription.take(),
            )
        };
        self.release(previous_subscriptions, previous_gnss);

        let available_providers = self.platform.all_providers();
        let enabled_providers = self.platform.enabled_providers();
        let location_services_enabled = self
            .platform
            .is_provider_enabled(&self.config.gnss_provider)
            || self
                .platform
                .is_provider_enabled(&self.config.network_provider);
        debug!(
            "Providers available: {:?}, enabled: {:?}",
            available_providers, enabled_providers
        );

        let gnss_subscription = self.register_gnss_status(generation);
        let last_known_fixes = self.last_known_fixes(&available_providers);

        let mut subscriptions = Vec::with_capacity(enabled_providers.len());
        let mut error_message = None;
        for provider in enabled_providers.iter() {
            match self.request_updates(generation, provider) {
                Ok(id) => subscriptions.push((provider.clone(), id)),
                Err(e) => {
                    warn!("Failed to request location updates of {provider}. Error: {e}");
                    self.publish_error(generation, &e);
                    error_message = Some(e.to_string());
                }
            }
        }

        let mut state = self.lock();
        if !Self::is_current(&state, generation) {
            drop(state);
            debug!("Start of generation {generation} was superseded");
            self.release(subscriptions, gnss_subscription);
            return;
        }
        info!(
            "Location updates started for {} providers",
            subscriptions.len()
        );
        state.subscriptions = subscriptions;
        state.gnss_subscription = gnss_subscription;
        let data = LocationData {
            location_services_enabled,
            available_providers,
            enabled_providers,
            current_fixes: state.snapshot.current_fixes.clone(),
            last_known_fixes,
            error_message,
        };
        self.publish(&mut state, data);
    }

    fn restart(self: &Arc<Self>, generation: u64) {
        self.start(Some(generation));
    }

    fn stop(&self) {
        let (subscriptions, gnss_subscription) = {
            let mut state = self.lock();
            if !state.running {
                return;
            }
            state.running = false;
            state.generation += 1;
            state.satellite_count = None;
            (
                std::mem::take(&mut state.subscriptions),
                state.gnss_subscription.take(),
            )
        };
        info!(
            "Stopping location updates of {} providers",
            subscriptions.len()
        );
        self.release(subscriptions, gnss_subscription);
    }

    fn release(
        &self,
        subscriptions: Vec<(String, SubscriptionId)>,
        gnss_subscription: Option<SubscriptionId>,
    ) {
        for (provider, id) in subscriptions {
            debug!("Removing location updates of {provider}");
            self.platform.remove_updates(id);
        }
        if let Some(id) = gnss_subscription {
            self.platform.unregister_gnss_status(id);
        }
    }

    fn register_gnss_status(self: &Arc<Self>, generation: u64) -> Option<SubscriptionId> {
        if !self.permissions.has_permission(PermissionKind::Fine) {
            debug!("No fine location permission, satellite status is not available");
            return None;
        }
        let listener = Arc::new(SatelliteStatusListener {
            core: Arc::downgrade(self),
            generation,
        });
        match self.platform.register_gnss_status(listener) {
            Ok(id) => Some(id),
            Err(e) => {
                debug!("Satellite status not registered. Error: {e}");
                None
            }
        }
    }

    fn request_updates(
        self: &Arc<Self>,
        generation: u64,
        provider: &str,
    ) -> Result<SubscriptionId, LocationError> {
        if !self.permissions.has_location_permission() {
            return Err(LocationError::PermissionDenied);
        }
        let listener = Arc::new(ProviderListener {
            core: Arc::downgrade(self),
            provider: provider.to_string(),
            generation,
        });
        self.platform
            .request_location_updates(provider, &self.config.update_request(), listener)
    }

    /// Collects the cached fix of every provider. Providers that fail are skipped.
    fn last_known_fixes(&self, providers: &[String]) -> Vec<LocationFix> {
        let satellite_count = self.lock().satellite_count;
        let mut fixes = Vec::new();
        for provider in providers.iter() {
            if !self.permissions.has_location_permission() {
                break;
            }
            match self.platform.last_known_location(provider) {
                Ok(Some(location)) => fixes.push(LocationFix::from_platform(
                    &location,
                    provider,
                    satellite_count,
                    &self.config.gnss_provider,
                    self.formatter.as_ref(),
                )),
                Ok(None) => debug!("No last known location of {provider}"),
                Err(e) => debug!("Skipping last known location of {provider}. Error: {e}"),
            }
        }
        unique_by_provider(fixes)
    }

    fn publish_error(&self, generation: u64, error: &LocationError) {
        let mut state = self.lock();
        if !Self::is_current(&state, generation) {
            return;
        }
        let data = state.snapshot.with_error(error.to_string());
        self.publish(&mut state, data);
    }

    fn merge_location(&self, generation: u64, provider: &str, location: &PlatformLocation) {
        let mut state = self.lock();
        if !Self::is_current(&state, generation) {
            debug!("Discarding location of {provider} from an outdated subscription");
            return;
        }
        let fix = LocationFix::from_platform(
            location,
            provider,
            state.satellite_count,
            &self.config.gnss_provider,
            self.formatter.as_ref(),
        );
        let data = state.snapshot.with_fix(fix);
        self.publish(&mut state, data);
    }

    fn update_satellite_count(&self, generation: u64, satellite_count: u32) {
        let mut state = self.lock();
        if Self::is_current(&state, generation) {
            state.satellite_count = Some(satellite_count);
        }
    }
}

impl Drop for ManagerCore {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        let subscriptions = std::mem::take(&mut state.subscriptions);
        let gnss_subscription = state.gnss_subscription.take();
        self.release(subscriptions, gnss_subscription);
    }
}

/// The single source of truth of the location state.
///
/// The manager subscribes to every enabled provider of the [`LocationPlatform`], merges
/// every fix into the current [`LocationData`] snapshot and publishes the new snapshot to
/// the observer returned by [`LocationDataManager::subscribe`].
///
/// All entry points may be called from any thread. Platform callbacks are serialized by an
/// internal lock, the platform itself is never called while the lock is held.
///
/// Cloning the manager is cheap, all clones share the same state. Subscriptions are released
/// on [`stop`](LocationDataManager::stop) or when the last clone is dropped.
#[derive(Clone)]
pub struct LocationDataManager {
    core: Arc<ManagerCore>,
}

impl LocationDataManager {
    /// Creates a manager with the default [`TrackingConfig`].
    pub fn new(
        platform: Arc<dyn LocationPlatform>,
        permissions: Arc<dyn PermissionOracle>,
        formatter: Arc<dyn TimestampFormatter>,
    ) -> Self {
        LocationDataManager::with_config(
            platform,
            permissions,
            formatter,
            TrackingConfig::default(),
        )
    }

    pub fn with_config(
        platform: Arc<dyn LocationPlatform>,
        permissions: Arc<dyn PermissionOracle>,
        formatter: Arc<dyn TimestampFormatter>,
        config: TrackingConfig,
    ) -> Self {
        let snapshot = Arc::new(LocationData::default());
        let (publisher, _) = watch::channel(snapshot.clone());
        LocationDataManager {
            core: Arc::new(ManagerCore {
                platform,
                permissions,
                formatter,
                config,
                state: Mutex::new(TrackingState {
                    snapshot,
                    running: false,
                    generation: 0,
                    subscriptions: Vec::new(),
                    gnss_subscription: None,
                    satellite_count: None,
                }),
                publisher,
            }),
        }
    }

    /// Starts location updates of every enabled provider.
    ///
    /// Without fine or coarse permission only a snapshot with an error message is
    /// published. Otherwise the providers are read from the platform, the satellite status is
    /// registered (fine permission only), the last known fixes are collected once and every
    /// enabled provider is subscribed. Subscriptions of a previous start are released first,
    /// so calling `start` again re-derives everything from the platform.
    pub fn start(&self) {
        self.core.start(None);
    }

    /// Releases every subscription. No snapshot is published after `stop` returns until the
    /// next [`start`](LocationDataManager::start).
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Returns a receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<LocationData>> {
        self.core.publisher.subscribe()
    }

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> Arc<LocationData> {
        self.core.lock().snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        self.core.lock().running
    }

    /// Returns the satellite count of the last status event since the start.
    pub fn satellite_count(&self) -> Option<u32> {
        self.core.lock().satellite_count
    }
}
