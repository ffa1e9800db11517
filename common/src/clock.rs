// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{DateTime, Local, TimeZone, Utc};

/// Display format of fix timestamps, `yyyy-MM-dd HH:mm:ss`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A trait for turning the epoch time of a fix into the text that is displayed.
///
/// Implementations decide which time zone is used. The aggregator only hands over the
/// milliseconds since the unix epoch that the platform reported.
pub trait TimestampFormatter: Send + Sync {
    /// Formats `epoch_ms` (milliseconds since the unix epoch).
    ///
    /// Times that can't be represented are formatted as an empty string.
    fn format(&self, epoch_ms: i64) -> String;
}

/// A [`TimestampFormatter`] that formats in the local time zone of the system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTimestampFormatter;

impl LocalTimestampFormatter {
    pub fn new() -> Self {
        LocalTimestampFormatter
    }
}

impl TimestampFormatter for LocalTimestampFormatter {
    fn format(&self, epoch_ms: i64) -> String {
        format_in(&Local, epoch_ms)
    }
}

/// A [`TimestampFormatter`] that formats in UTC.
///
/// Useful where the output must not depend on the time zone of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct UtcTimestampFormatter;

impl UtcTimestampFormatter {
    pub fn new() -> Self {
        UtcTimestampFormatter
    }
}

impl TimestampFormatter for UtcTimestampFormatter {
    fn format(&self, epoch_ms: i64) -> String {
        format_in(&Utc, epoch_ms)
    }
}

fn format_in<Tz>(tz: &Tz, epoch_ms: i64) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match DateTime::<Utc>::from_timestamp_millis(epoch_ms) {
        Some(time) => time
            .with_timezone(tz)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        None => String::new(),
    }
}
