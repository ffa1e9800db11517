// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use clap::Parser;
use common::clock::LocalTimestampFormatter;
use location_manager::{LocationDataManager, tracking_module::LocationTracking};
use module_core::{Event, EventBus, EventKind, Module};
use platform::simulated_source::{
    SimulatedPlatform, SimulatedPlatformConfig, SimulatedProvider, Waypoint,
};
use platform::{PermissionOracle, StaticPermissions};
use presentation::console_view::ConsoleView;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Grant the fine location permission.
    #[arg(long)]
    fine: bool,
    /// Grant the coarse location permission.
    #[arg(long)]
    coarse: bool,
    #[arg(short, long, value_delimiter = ',', default_value = "gps,network,passive")]
    providers: Vec<String>,
    /// Providers that start disabled.
    #[arg(short, long, value_delimiter = ',')]
    disabled: Vec<String>,
    /// CSV file with a header line and one `longitude,latitude` waypoint per line.
    #[arg(short = 'f', long)]
    track_file: Option<String>,
    /// Velocity along the route in m/s.
    #[arg(long, default_value_t = 10.0)]
    velocity: f64,
    #[arg(long)]
    mock: bool,
    /// Print every snapshot as JSON on stdout.
    #[arg(long)]
    json: bool,
    /// Disable and enable this provider every `toggle_interval` seconds.
    #[arg(long)]
    toggle_provider: Option<String>,
    #[arg(long, default_value_t = 10)]
    toggle_interval: u64,
}

fn read_waypoints_from_file(file_path: &str) -> Result<Vec<Waypoint>, ()> {
    let mut rdr = csv::Reader::from_path(file_path).map_err(|e| {
        error!("Failed to open track file {file_path}. Error: {e}");
    })?;
    let mut waypoints = Vec::new();

    for result in rdr.records() {
        let record = result.map_err(|e| {
            error!("Failed to read track file {file_path}. Error: {e}");
        })?;
        let coordinate = |index: usize| -> Result<f64, ()> {
            let field = record.get(index).ok_or_else(|| {
                error!("Missing column {index} in record {:?}", record.position());
            })?;
            f64::from_str(field.trim()).map_err(|e| {
                error!("Invalid coordinate {field}. Error: {e}");
            })
        };
        let longitude = coordinate(0)?;
        let latitude = coordinate(1)?;
        waypoints.push(Waypoint::new(latitude, longitude));
    }
    debug!("length of waypoints: {}", waypoints.len());
    Ok(waypoints)
}

/// A small loop around a block, used when no track file is given.
fn default_waypoints() -> Vec<Waypoint> {
    vec![
        Waypoint::new(52.520008, 13.404954),
        Waypoint::new(52.520008, 13.409954),
        Waypoint::new(52.523008, 13.409954),
        Waypoint::new(52.523008, 13.404954),
    ]
}

fn create_platform(
    cli: &Cli,
    permissions: Arc<dyn PermissionOracle>,
) -> Result<Arc<SimulatedPlatform>, ()> {
    let waypoints = match &cli.track_file {
        Some(track_file) => read_waypoints_from_file(track_file)?,
        None => default_waypoints(),
    };
    let providers = cli
        .providers
        .iter()
        .map(|name| SimulatedProvider::new(name, !cli.disabled.contains(name)))
        .collect();
    let config = SimulatedPlatformConfig {
        providers,
        waypoints,
        velocity: cli.velocity,
        satellite_interval: Duration::from_secs(1),
        mock: cli.mock,
    };
    SimulatedPlatform::new(tokio::runtime::Handle::current(), permissions, config).map_err(|e| {
        error!("Failed to create SimulatedPlatform. Error: {e}");
    })
}

fn spawn_provider_toggle(
    platform: Arc<SimulatedPlatform>,
    provider: String,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        let mut enabled = true;
        loop {
            ticker.tick().await;
            enabled = !enabled;
            info!("Setting provider {provider} enabled: {enabled}");
            platform.set_provider_enabled(&provider, enabled);
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), ()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let eb = EventBus::default();
    let sender = eb.sender();
    ctrlc::set_handler(move || {
        let _ = sender.send(Event {
            kind: EventKind::QuitEvent,
        });
    })
    .map_err(|e| {
        error!("Failed to install Ctrl-C handler. Error: {e}");
    })?;

    let permissions = Arc::new(StaticPermissions::new(cli.fine, cli.coarse));
    let platform = create_platform(&cli, permissions.clone())?;
    let manager = LocationDataManager::new(
        platform.clone(),
        permissions,
        Arc::new(LocalTimestampFormatter::new()),
    );
    let toggle = cli.toggle_provider.clone().map(|provider| {
        spawn_provider_toggle(
            platform.clone(),
            provider,
            Duration::from_secs(cli.toggle_interval.max(1)),
        )
    });

    let mut console = ConsoleView::new(eb.context()).with_json(cli.json);
    let mut tracking = LocationTracking::new(eb.context(), manager);

    info!("Starting modules...");
    let (console_result, tracking_result) = tokio::join!(console.run(), tracking.run());
    if let Some(toggle) = toggle {
        toggle.abort();
    }
    console_result.and(tracking_result)
}
