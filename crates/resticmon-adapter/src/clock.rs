//! Clock - Timestamps on the shared wall clock
//!
//! Restic records snapshot times with the offset of the host that made
//! them. Every host is assumed to run on the same timezone, so the offset
//! is dropped and only the wall-clock reading is kept.

use chrono::{DateTime, Local, NaiveDateTime};
use resticmon_domain::Timestamp;

const WALL_CLOCK_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// The current local wall-clock time
pub fn wall_clock_now() -> Timestamp {
    from_naive(Local::now().naive_local())
}

/// Parse a restic snapshot time such as `2024-03-01T02:00:13.52+01:00`
pub fn parse_restic_time(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(from_naive(parsed.naive_local()));
    }
    // Fall back to the seconds-resolution prefix
    raw.get(..19)
        .and_then(|prefix| NaiveDateTime::parse_from_str(prefix, WALL_CLOCK_FORMAT).ok())
        .map(from_naive)
}

pub fn from_naive(naive: NaiveDateTime) -> Timestamp {
    Timestamp::from_seconds(naive.and_utc().timestamp())
}

pub fn to_naive(timestamp: Timestamp) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(timestamp.as_seconds(), 0).map(|dt| dt.naive_utc())
}

/// `YYYY-MM-DD HH:MM:SS`, for listings
pub fn display(timestamp: Timestamp) -> String {
    to_naive(timestamp)
        .map(|naive| naive.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.as_seconds().to_string())
}
