// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    GnssStatusListener, LocationError, LocationListener, LocationPlatform, SubscriptionId,
    UpdateRequest, same_listener,
};
use common::location::PlatformLocation;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::debug;

struct LocationRegistration {
    provider: String,
    listener: Arc<dyn LocationListener>,
}

#[derive(Default)]
struct FakePlatformState {
    providers: Vec<String>,
    enabled: HashSet<String>,
    last_known: HashMap<String, Result<Option<PlatformLocation>, LocationError>>,
    request_failures: HashMap<String, LocationError>,
    gnss_failure: Option<LocationError>,
    registrations: BTreeMap<SubscriptionId, LocationRegistration>,
    gnss_listeners: BTreeMap<SubscriptionId, Arc<dyn GnssStatusListener>>,
    request_log: Vec<(String, UpdateRequest)>,
    next_id: u64,
}

impl FakePlatformState {
    fn next_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }
}

/// An in-memory [`LocationPlatform`] that is driven by the test.
///
/// Fixes, satellite status and provider state changes are only delivered when the test
/// calls [`FakePlatform::emit_location`], [`FakePlatform::emit_satellite_status`] or
/// [`FakePlatform::set_provider_enabled`]. Listeners are called on the calling thread and
/// outside of the internal lock.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakePlatformState>,
}

impl FakePlatform {
    /// Creates a platform that knows `providers`, all of them enabled.
    pub fn new(providers: &[&str]) -> Arc<Self> {
        let platform = FakePlatform::default();
        {
            let mut state = platform.lock();
            for provider in providers {
                state.providers.push(provider.to_string());
                state.enabled.insert(provider.to_string());
            }
        }
        Arc::new(platform)
    }

    fn lock(&self) -> MutexGuard<'_, FakePlatformState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a provider without notifying any listener.
    pub fn add_provider(&self, provider: &str, enabled: bool) {
        let mut state = self.lock();
        if !state.providers.iter().any(|p| p == provider) {
            state.providers.push(provider.to_string());
        }
        if enabled {
            state.enabled.insert(provider.to_string());
        } else {
            state.enabled.remove(provider);
        }
    }

    /// Changes the enabled state of `provider` without notifying any listener.
    pub fn set_enabled_silently(&self, provider: &str, enabled: bool) {
        let mut state = self.lock();
        if enabled {
            state.enabled.insert(provider.to_string());
        } else {
            state.enabled.remove(provider);
        }
    }

    /// Changes the enabled state of `provider` and notifies every registered listener.
    pub fn set_provider_enabled(&self, provider: &str, enabled: bool) {
        self.set_enabled_silently(provider, enabled);
        let listeners: Vec<Arc<dyn LocationListener>> = self
            .lock()
            .registrations
            .values()
            .map(|r| r.listener.clone())
            .collect();
        debug!(
            "FakePlatform notifies {} listeners that {provider} is enabled: {enabled}",
            listeners.len()
        );
        for listener in listeners {
            if enabled {
                listener.on_provider_enabled(provider);
            } else {
                listener.on_provider_disabled(provider);
            }
        }
    }

    pub fn set_last_known(&self, provider: &str, location: PlatformLocation) {
        self.lock()
            .last_known
            .insert(provider.to_string(), Ok(Some(location)));
    }

    /// Lets every last known location query of `provider` fail with `error`.
    pub fn fail_last_known(&self, provider: &str, error: LocationError) {
        self.lock()
            .last_known
            .insert(provider.to_string(), Err(error));
    }

    /// Lets every update request of `provider` fail with `error`.
    pub fn fail_requests(&self, provider: &str, error: LocationError) {
        self.lock()
            .request_failures
            .insert(provider.to_string(), error);
    }

    pub fn clear_request_failure(&self, provider: &str) {
        self.lock().request_failures.remove(provider);
    }

    /// Lets the satellite status registration fail with `error`.
    pub fn fail_gnss_registration(&self, error: LocationError) {
        self.lock().gnss_failure = Some(error);
    }

    /// Delivers `location` to every listener subscribed to `provider`.
    ///
    /// Returns the number of notified listeners.
    pub fn emit_location(&self, provider: &str, location: PlatformLocation) -> usize {
        let listeners: Vec<Arc<dyn LocationListener>> = self
            .lock()
            .registrations
            .values()
            .filter(|r| r.provider == provider)
            .map(|r| r.listener.clone())
            .collect();
        for listener in listeners.iter() {
            listener.on_location_changed(location.clone());
        }
        listeners.len()
    }

    /// Delivers a satellite status to every registered status listener.
    pub fn emit_satellite_status(&self, satellite_count: u32) -> usize {
        let listeners: Vec<Arc<dyn GnssStatusListener>> =
            self.lock().gnss_listeners.values().cloned().collect();
        for listener in listeners.iter() {
            listener.on_satellite_status_changed(satellite_count);
        }
        listeners.len()
    }

    /// Returns the listener currently subscribed to `provider`.
    pub fn listener(&self, provider: &str) -> Option<Arc<dyn LocationListener>> {
        self.lock()
            .registrations
            .values()
            .find(|r| r.provider == provider)
            .map(|r| r.listener.clone())
    }

    /// Returns the currently registered satellite status listener.
    pub fn gnss_listener(&self) -> Option<Arc<dyn GnssStatusListener>> {
        self.lock().gnss_listeners.values().next().cloned()
    }

    /// Number of active location subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.lock().registrations.len()
    }

    /// Providers with an active subscription, sorted by name.
    pub fn subscribed_providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = self
            .lock()
            .registrations
            .values()
            .map(|r| r.provider.clone())
            .collect();
        providers.sort();
        providers
    }

    /// Number of active satellite status registrations.
    pub fn gnss_registrations(&self) -> usize {
        self.lock().gnss_listeners.len()
    }

    /// Every update request that was made, including failed ones.
    pub fn request_log(&self) -> Vec<(String, UpdateRequest)> {
        self.lock().request_log.clone()
    }
}

impl LocationPlatform for FakePlatform {
    fn all_providers(&self) -> Vec<String> {
        self.lock().providers.clone()
    }

    fn enabled_providers(&self) -> Vec<String> {
        let state = self.lock();
        state
            .providers
            .iter()
            .filter(|p| state.enabled.contains(p.as_str()))
            .cloned()
            .collect()
    }

    fn is_provider_enabled(&self, provider: &str) -> bool {
        self.lock().enabled.contains(provider)
    }

    fn last_known_location(
        &self,
        provider: &str,
    ) -> Result<Option<PlatformLocation>, LocationError> {
        let state = self.lock();
        if !state.providers.iter().any(|p| p == provider) {
            return Err(LocationError::ProviderUnavailable(provider.to_string()));
        }
        state.last_known.get(provider).cloned().unwrap_or(Ok(None))
    }

    fn request_location_updates(
        &self,
        provider: &str,
        request: &UpdateRequest,
        listener: Arc<dyn LocationListener>,
    ) -> Result<SubscriptionId, LocationError> {
        let mut state = self.lock();
        state.request_log.push((provider.to_string(), *request));
        if let Some(error) = state.request_failures.get(provider) {
            return Err(error.clone());
        }
        if !state.providers.iter().any(|p| p == provider) {
            return Err(LocationError::ProviderUnavailable(provider.to_string()));
        }
        state
            .registrations
            .retain(|_, r| !(r.provider == provider && same_listener(&r.listener, &listener)));
        let id = state.next_id();
        state.registrations.insert(
            id,
            LocationRegistration {
                provider: provider.to_string(),
                listener,
            },
        );
        Ok(id)
    }

    fn remove_updates(&self, id: SubscriptionId) {
        self.lock().registrations.remove(&id);
    }

    fn register_gnss_status(
        &self,
        listener: Arc<dyn GnssStatusListener>,
    ) -> Result<SubscriptionId, LocationError> {
        let mut state = self.lock();
        if let Some(error) = &state.gnss_failure {
            return Err(error.clone());
        }
        state
            .gnss_listeners
            .retain(|_, known| !same_listener(known, &listener));
        let id = state.next_id();
        state.gnss_listeners.insert(id, listener);
        Ok(id)
    }

    fn unregister_gnss_status(&self, id: SubscriptionId) {
        self.lock().gnss_listeners.remove(&id);
    }
}
