// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    GnssStatusListener, LocationError, LocationListener, LocationPlatform, PermissionKind,
    PermissionOracle, SubscriptionId, UpdateRequest, same_listener,
};
use chrono::Utc;
use common::location::{GPS_PROVIDER, NETWORK_PROVIDER, PASSIVE_PROVIDER, PlatformLocation};
use std::{
    collections::{BTreeMap, HashMap},
    io::{Error, ErrorKind},
    sync::{Arc, Mutex, MutexGuard},
    time::{Duration, Instant},
};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info, warn};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

/// A point of the simulated route in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Waypoint {
            latitude,
            longitude,
        }
    }
}

/// A provider of the simulated platform.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedProvider {
    pub name: String,
    pub enabled: bool,
    /// Reported horizontal accuracy in meters.
    pub accuracy: f32,
}

impl SimulatedProvider {
    /// Creates a provider with the typical accuracy of its kind.
    pub fn new(name: &str, enabled: bool) -> Self {
        let accuracy = match name {
            GPS_PROVIDER => 4.0,
            NETWORK_PROVIDER => 25.0,
            _ => 50.0,
        };
        SimulatedProvider {
            name: name.to_string(),
            enabled,
            accuracy,
        }
    }
}

/// Settings of a [`SimulatedPlatform`].
#[derive(Debug, Clone)]
pub struct SimulatedPlatformConfig {
    pub providers: Vec<SimulatedProvider>,
    /// The route is driven in a loop, from the last waypoint back to the first.
    pub waypoints: Vec<Waypoint>,
    /// Velocity along the route in meters per second.
    pub velocity: f64,
    pub satellite_interval: Duration,
    /// Flag every reading as simulated.
    pub mock: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct UtmPoint {
    x: f64,
    y: f64,
    zone: u8,
    zone_letter: char,
}

fn convert_waypoints(waypoints: &[Waypoint]) -> Result<Vec<UtmPoint>, Error> {
    let mut points = Vec::<UtmPoint>::with_capacity(waypoints.len());
    for pos in waypoints.iter() {
        let zone = lat_lon_to_zone_number(pos.latitude, pos.longitude);
        let Some(zone_letter) = lat_to_zone_letter(pos.latitude) else {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "Waypoint lat: {}, long: {} can't be converted to an UTM zone",
                    pos.latitude, pos.longitude
                ),
            ));
        };
        let (northing, easting, _) = to_utm_wgs84(pos.latitude, pos.longitude, zone);
        points.push(UtmPoint {
            x: northing,
            y: easting,
            zone,
            zone_letter,
        });
    }
    Ok(points)
}

/// Position on the route after a traveled distance.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RoutePosition {
    latitude: f64,
    longitude: f64,
    /// Degrees clockwise from north.
    bearing: f32,
}

/// A closed route in UTM coordinates.
#[derive(Debug)]
struct Route {
    points: Vec<UtmPoint>,
    segment_lengths: Vec<f64>,
    total_length: f64,
}

impl Route {
    fn new(points: Vec<UtmPoint>) -> Self {
        let segment_lengths: Vec<f64> = (0..points.len())
            .map(|i| {
                let p0 = &points[i];
                let p1 = &points[(i + 1) % points.len()];
                ((p1.x - p0.x).powi(2) + (p1.y - p0.y).powi(2)).sqrt()
            })
            .collect();
        let total_length = segment_lengths.iter().sum();
        Route {
            points,
            segment_lengths,
            total_length,
        }
    }

    /// Interpolates the position after `distance` meters, starting at the first waypoint.
    fn position_at(&self, distance: f64) -> Option<RoutePosition> {
        let first = self.points.first()?;
        if self.total_length <= 0.0 {
            let (latitude, longitude) =
                wsg84_utm_to_lat_lon(first.y, first.x, first.zone, first.zone_letter).ok()?;
            return Some(RoutePosition {
                latitude,
                longitude,
                bearing: 0.0,
            });
        }
        let mut remaining = distance.rem_euclid(self.total_length);
        for (i, length) in self.segment_lengths.iter().enumerate() {
            if remaining > *length || *length == 0.0 {
                remaining -= length;
                continue;
            }
            let p0 = &self.points[i];
            let p1 = &self.points[(i + 1) % self.points.len()];
            let ratio = remaining / length;
            let northing = p0.x + (p1.x - p0.x) * ratio;
            let easting = p0.y + (p1.y - p0.y) * ratio;
            let (latitude, longitude) =
                wsg84_utm_to_lat_lon(easting, northing, p0.zone, p0.zone_letter).ok()?;
            let bearing = (p1.y - p0.y).atan2(p1.x - p0.x).to_degrees().rem_euclid(360.0);
            return Some(RoutePosition {
                latitude,
                longitude,
                bearing: bearing as f32,
            });
        }
        None
    }
}

struct Registration {
    provider: String,
    listener: Arc<dyn LocationListener>,
    task: JoinHandle<()>,
}

struct GnssRegistration {
    listener: Arc<dyn GnssStatusListener>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct SimulatedState {
    providers: Vec<SimulatedProvider>,
    last_known: HashMap<String, PlatformLocation>,
    registrations: BTreeMap<SubscriptionId, Registration>,
    gnss: BTreeMap<SubscriptionId, GnssRegistration>,
    next_id: u64,
}

impl SimulatedState {
    fn provider(&self, name: &str) -> Option<&SimulatedProvider> {
        self.providers.iter().find(|p| p.name == name)
    }

    fn next_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }
}

/// State shared between the platform and its reporting tasks.
struct SimulatedCore {
    route: Route,
    velocity: f64,
    mock: bool,
    started: Instant,
    state: Mutex<SimulatedState>,
}

impl SimulatedCore {
    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn traveled_distance(&self) -> f64 {
        self.velocity * self.started.elapsed().as_secs_f64()
    }

    /// Creates a reading of `provider` at the current route position.
    ///
    /// Returns `None` if the provider is unknown or disabled.
    fn reading(&self, provider: &str, distance: f64) -> Option<PlatformLocation> {
        let accuracy = {
            let state = self.lock();
            let known = state.provider(provider)?;
            if !known.enabled {
                return None;
            }
            known.accuracy
        };
        let position = self.route.position_at(distance)?;
        let location = PlatformLocation {
            provider: Some(provider.to_string()),
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy,
            altitude: if provider == GPS_PROVIDER { 95.0 } else { 0.0 },
            bearing: if self.velocity > 0.0 {
                position.bearing
            } else {
                0.0
            },
            speed: self.velocity as f32,
            time_ms: Utc::now().timestamp_millis(),
            is_mock: self.mock,
        };
        self.lock()
            .last_known
            .insert(provider.to_string(), location.clone());
        Some(location)
    }

    fn is_enabled(&self, provider: &str) -> bool {
        self.lock().provider(provider).is_some_and(|p| p.enabled)
    }
}

/// A platform that reports positions along a route in a constant frequency.
///
/// Every subscribed provider reports the current route position at the requested interval,
/// the satellite status is reported while the GPS provider is enabled. Providers that need
/// fine location permission (`gps`, `passive`) fail with
/// [`LocationError::PermissionRevoked`] if only coarse permission is granted.
pub struct SimulatedPlatform {
    runtime: Handle,
    permissions: Arc<dyn PermissionOracle>,
    satellite_interval: Duration,
    core: Arc<SimulatedCore>,
}

impl SimulatedPlatform {
    /// Creates the platform and spawns its reporting tasks on `runtime`.
    ///
    /// Every enabled provider except `passive` starts with a cached fix at the first waypoint.
    ///
    /// # Errors
    ///
    /// `ErrorKind::InvalidData` if no waypoints are given or a waypoint can't be converted
    /// to UTM.
    pub fn new(
        runtime: Handle,
        permissions: Arc<dyn PermissionOracle>,
        config: SimulatedPlatformConfig,
    ) -> Result<Arc<Self>, Error> {
        if config.waypoints.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                "waypoints parameter is empty",
            ));
        }
        let route = Route::new(convert_waypoints(&config.waypoints)?);
        info!(
            "Simulated route with {} waypoints and a length of {:.1} m",
            route.points.len(),
            route.total_length
        );
        let core = Arc::new(SimulatedCore {
            route,
            velocity: config.velocity,
            mock: config.mock,
            started: Instant::now(),
            state: Mutex::new(SimulatedState {
                providers: config.providers,
                ..Default::default()
            }),
        });
        let seeded: Vec<String> = core
            .lock()
            .providers
            .iter()
            .filter(|p| p.enabled && p.name != PASSIVE_PROVIDER)
            .map(|p| p.name.clone())
            .collect();
        for provider in seeded {
            core.reading(&provider, 0.0);
        }
        Ok(Arc::new(SimulatedPlatform {
            runtime,
            permissions,
            satellite_interval: config.satellite_interval,
            core,
        }))
    }

    /// Changes the enabled state of `provider` and notifies every registered listener.
    pub fn set_provider_enabled(&self, provider: &str, enabled: bool) {
        let listeners: Vec<Arc<dyn LocationListener>> = {
            let mut state = self.core.lock();
            let Some(known) = state.providers.iter_mut().find(|p| p.name == provider) else {
                warn!("Can't change state of unknown provider {provider}");
                return;
            };
            known.enabled = enabled;
            state
                .registrations
                .values()
                .map(|r| r.listener.clone())
                .collect()
        };
        info!("Provider {provider} enabled: {enabled}");
        for listener in listeners {
            if enabled {
                listener.on_provider_enabled(provider);
            } else {
                listener.on_provider_disabled(provider);
            }
        }
    }

    fn check_permission(&self, provider: &str) -> Result<(), LocationError> {
        let granted = match provider {
            NETWORK_PROVIDER => self.permissions.has_location_permission(),
            _ => self.permissions.has_permission(PermissionKind::Fine),
        };
        if granted {
            Ok(())
        } else {
            Err(LocationError::PermissionRevoked(format!(
                "\"{provider}\" location provider requires ACCESS_FINE_LOCATION permission."
            )))
        }
    }

    fn is_known(&self, provider: &str) -> bool {
        self.core.lock().provider(provider).is_some()
    }
}

impl Drop for SimulatedPlatform {
    fn drop(&mut self) {
        let mut state = self.core.lock();
        for (_, registration) in std::mem::take(&mut state.registrations) {
            registration.task.abort();
        }
        for (_, registration) in std::mem::take(&mut state.gnss) {
            registration.task.abort();
        }
    }
}

impl LocationPlatform for SimulatedPlatform {
    fn all_providers(&self) -> Vec<String> {
        self.core
            .lock()
            .providers
            .iter()
            .map(|p| p.name.clone())
            .collect()
    }

    fn enabled_providers(&self) -> Vec<String> {
        self.core
            .lock()
            .providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.clone())
            .collect()
    }

    fn is_provider_enabled(&self, provider: &str) -> bool {
        self.core.is_enabled(provider)
    }

    fn last_known_location(
        &self,
        provider: &str,
    ) -> Result<Option<PlatformLocation>, LocationError> {
        if !self.is_known(provider) {
            return Err(LocationError::ProviderUnavailable(provider.to_string()));
        }
        self.check_permission(provider)?;
        Ok(self.core.lock().last_known.get(provider).cloned())
    }

    fn request_location_updates(
        &self,
        provider: &str,
        request: &UpdateRequest,
        listener: Arc<dyn LocationListener>,
    ) -> Result<SubscriptionId, LocationError> {
        if !self.is_known(provider) {
            return Err(LocationError::ProviderUnavailable(provider.to_string()));
        }
        self.check_permission(provider)?;

        let task = self.runtime.spawn(provider_task(
            self.core.clone(),
            provider.to_string(),
            *request,
            listener.clone(),
        ));
        let mut state = self.core.lock();
        let replaced: Vec<SubscriptionId> = state
            .registrations
            .iter()
            .filter(|(_, r)| r.provider == provider && same_listener(&r.listener, &listener))
            .map(|(id, _)| *id)
            .collect();
        for id in replaced {
            if let Some(registration) = state.registrations.remove(&id) {
                registration.task.abort();
            }
        }
        let id = state.next_id();
        state.registrations.insert(
            id,
            Registration {
                provider: provider.to_string(),
                listener,
                task,
            },
        );
        debug!("Location updates of {provider} requested with {request:?}, id {id:?}");
        Ok(id)
    }

    fn remove_updates(&self, id: SubscriptionId) {
        if let Some(registration) = self.core.lock().registrations.remove(&id) {
            registration.task.abort();
            debug!(
                "Location updates of {} removed, id {id:?}",
                registration.provider
            );
        }
    }

    fn register_gnss_status(
        &self,
        listener: Arc<dyn GnssStatusListener>,
    ) -> Result<SubscriptionId, LocationError> {
        if !self.permissions.has_permission(PermissionKind::Fine) {
            return Err(LocationError::PermissionRevoked(
                "GNSS status requires ACCESS_FINE_LOCATION permission.".to_string(),
            ));
        }
        let task = self.runtime.spawn(gnss_status_task(
            self.core.clone(),
            self.satellite_interval,
            listener.clone(),
        ));
        let mut state = self.core.lock();
        let replaced: Vec<SubscriptionId> = state
            .gnss
            .iter()
            .filter(|(_, r)| same_listener(&r.listener, &listener))
            .map(|(id, _)| *id)
            .collect();
        for id in replaced {
            if let Some(registration) = state.gnss.remove(&id) {
                registration.task.abort();
            }
        }
        let id = state.next_id();
        state.gnss.insert(id, GnssRegistration { listener, task });
        Ok(id)
    }

    fn unregister_gnss_status(&self, id: SubscriptionId) {
        if let Some(registration) = self.core.lock().gnss.remove(&id) {
            registration.task.abort();
        }
    }
}

async fn provider_task(
    core: Arc<SimulatedCore>,
    provider: String,
    request: UpdateRequest,
    listener: Arc<dyn LocationListener>,
) {
    let mut timer = tokio::time::interval(request.min_time.max(Duration::from_millis(1)));
    let mut last_reported: Option<f64> = None;
    loop {
        timer.tick().await;
        let distance = core.traveled_distance();
        if let Some(last) = last_reported
            && distance - last < f64::from(request.min_distance)
        {
            continue;
        }
        let Some(location) = core.reading(&provider, distance) else {
            continue;
        };
        last_reported = Some(distance);
        listener.on_location_changed(location);
    }
}

async fn gnss_status_task(
    core: Arc<SimulatedCore>,
    interval: Duration,
    listener: Arc<dyn GnssStatusListener>,
) {
    let mut timer = tokio::time::interval(interval.max(Duration::from_millis(1)));
    let mut ticks: u32 = 0;
    loop {
        timer.tick().await;
        if !core.is_enabled(GPS_PROVIDER) {
            continue;
        }
        listener.on_satellite_status_changed(7 + ticks % 6);
        ticks = ticks.wrapping_add(1);
    }
}
