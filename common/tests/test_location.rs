// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::clock::UtcTimestampFormatter;
use common::location::{
    GPS_PROVIDER, LocationData, LocationFix, NETWORK_PROVIDER, PlatformLocation,
    unique_by_provider,
};
use common::test_helper::location::{FIXTURE_TIMESTAMP_UTC, get_fix, get_platform_location};

#[test]
pub fn convert_platform_location_to_fix() {
    let location = get_platform_location(NETWORK_PROVIDER, 52.026649, 11.282535);
    let fix = LocationFix::from_platform(
        &location,
        NETWORK_PROVIDER,
        None,
        GPS_PROVIDER,
        &UtcTimestampFormatter::new(),
    );
    assert_eq!(fix, get_fix(NETWORK_PROVIDER, 52.026649, 11.282535));
    assert_eq!(fix.timestamp, FIXTURE_TIMESTAMP_UTC);
}

#[test]
pub fn use_requested_provider_when_location_has_none() {
    let location = PlatformLocation {
        provider: None,
        ..get_platform_location(GPS_PROVIDER, 1.0, 2.0)
    };
    let fix = LocationFix::from_platform(
        &location,
        "fused",
        None,
        GPS_PROVIDER,
        &UtcTimestampFormatter::new(),
    );
    assert_eq!(fix.provider, "fused");
}

#[test]
pub fn attach_satellite_count_only_to_gps_fixes() {
    let formatter = UtcTimestampFormatter::new();
    let gps = LocationFix::from_platform(
        &get_platform_location(GPS_PROVIDER, 1.0, 2.0),
        GPS_PROVIDER,
        Some(9),
        GPS_PROVIDER,
        &formatter,
    );
    let network = LocationFix::from_platform(
        &get_platform_location(NETWORK_PROVIDER, 1.0, 2.0),
        NETWORK_PROVIDER,
        Some(9),
        GPS_PROVIDER,
        &formatter,
    );
    assert_eq!(gps.satellite_count, Some(9));
    assert_eq!(network.satellite_count, None);
}

#[test]
pub fn attach_satellite_count_to_configured_gnss_provider() {
    let formatter = UtcTimestampFormatter::new();
    let gnss = LocationFix::from_platform(
        &get_platform_location("gnss", 1.0, 2.0),
        "gnss",
        Some(11),
        "gnss",
        &formatter,
    );
    let gps = LocationFix::from_platform(
        &get_platform_location(GPS_PROVIDER, 1.0, 2.0),
        GPS_PROVIDER,
        Some(11),
        "gnss",
        &formatter,
    );
    assert_eq!(gnss.satellite_count, Some(11));
    assert_eq!(gps.satellite_count, None);
}

#[test]
pub fn replace_fix_of_same_provider() {
    let data = LocationData::default()
        .with_fix(get_fix(GPS_PROVIDER, 10.0, 20.0))
        .with_fix(get_fix(NETWORK_PROVIDER, 11.0, 21.0))
        .with_fix(get_fix(GPS_PROVIDER, 10.5, 20.5));

    assert_eq!(data.current_fixes.len(), 2);
    assert_eq!(
        data.current_fixes,
        vec![
            get_fix(NETWORK_PROVIDER, 11.0, 21.0),
            get_fix(GPS_PROVIDER, 10.5, 20.5)
        ]
    );
}

#[test]
pub fn merging_a_fix_clears_the_error_and_keeps_other_fields() {
    let data = LocationData {
        location_services_enabled: true,
        available_providers: vec![GPS_PROVIDER.to_string()],
        enabled_providers: vec![GPS_PROVIDER.to_string()],
        last_known_fixes: vec![get_fix(GPS_PROVIDER, 1.0, 1.0)],
        ..Default::default()
    }
    .with_error("Provider not available: gps");
    assert_eq!(
        data.error_message.as_deref(),
        Some("Provider not available: gps")
    );

    let merged = data.with_fix(get_fix(GPS_PROVIDER, 2.0, 2.0));
    assert_eq!(merged.error_message, None);
    assert!(merged.location_services_enabled);
    assert_eq!(merged.available_providers, data.available_providers);
    assert_eq!(merged.last_known_fixes, data.last_known_fixes);
    assert_eq!(merged.current_fix(GPS_PROVIDER).map(|f| f.latitude), Some(2.0));
}

#[test]
pub fn keep_last_fix_per_provider() {
    let fixes = unique_by_provider(vec![
        get_fix(GPS_PROVIDER, 1.0, 1.0),
        get_fix(NETWORK_PROVIDER, 2.0, 2.0),
        get_fix(GPS_PROVIDER, 3.0, 3.0),
    ]);
    assert_eq!(fixes.len(), 2);
    assert_eq!(fixes[1], get_fix(GPS_PROVIDER, 3.0, 3.0));
}

#[test]
pub fn serialize_snapshot_to_json_and_back() {
    let data = LocationData::default().with_fix(get_fix(GPS_PROVIDER, 52.0, 11.0));
    let json = data
        .to_json()
        .unwrap_or_else(|e| panic!("Failed to serialize the snapshot. Reason: {e}"));
    let parsed = LocationData::from_json(&json)
        .unwrap_or_else(|e| panic!("Failed to deserialize the snapshot. Reason: {e}"));
    assert_eq!(parsed, data);
}
