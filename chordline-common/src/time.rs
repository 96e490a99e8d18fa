//! Timestamp utilities

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as Unix epoch milliseconds (used in generated mock ids)
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time as Unix epoch seconds
pub fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// ISO 8601 timestamp with millisecond precision and `Z` suffix
pub fn iso_now() -> String {
    to_iso(&Utc::now())
}

/// Render a timestamp the way provider APIs do (`2024-01-01T12:00:00.000Z`)
pub fn to_iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
