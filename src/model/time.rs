//! Timestamp parsing and display formatting.
//!
//! The backend appends a literal `Z` to timestamps that already carry a
//! `+00:00` offset, producing strings like `2025-01-15T10:00:00+00:00Z`.
//! [`parse_timestamp`] strips that artifact before parsing. Naive timestamps
//! (no offset at all) are read as UTC.
//!
//! Two display fallbacks coexist: tables and chart labels render an
//! unparseable timestamp as an empty string, while the task detail header
//! renders `N/A`. Callers pick the one that matches their call site.

use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Trailing `+00:00` with an optional redundant `Z`.
static OFFSET_ARTIFACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+00:00Z?$").expect("offset artifact regex is valid"));

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Placeholder used by the task detail header for missing dates.
pub const NOT_AVAILABLE: &str = "N/A";

/// Replace a trailing `+00:00` / `+00:00Z` with a plain `Z`.
pub fn strip_offset_artifact(raw: &str) -> Cow<'_, str> {
    OFFSET_ARTIFACT_RE.replace(raw, "Z")
}

/// Parse a backend timestamp into UTC. Returns `None` for anything that is
/// not recognisably a date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned = strip_offset_artifact(trimmed);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = cleaned.trim_end_matches('Z');
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(dt.and_utc());
        }
    }

    NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Full local date-time for tables and batch labels; empty when the input is
/// missing or unparseable.
pub fn display_timestamp(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(format_local)
        .unwrap_or_default()
}

/// Same as [`display_timestamp`] but renders [`NOT_AVAILABLE`] instead of an
/// empty string.
pub fn display_timestamp_or_na(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(format_local)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Hour and minute in local time, used for timeseries chart labels.
pub fn display_clock(raw: Option<&str>) -> String {
    raw.and_then(parse_timestamp)
        .map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_default()
}

fn format_local(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn strips_redundant_offset_suffix() {
        assert_eq!(
            strip_offset_artifact("2025-01-15T10:00:00+00:00Z"),
            "2025-01-15T10:00:00Z"
        );
        assert_eq!(
            strip_offset_artifact("2025-01-15T10:00:00+00:00"),
            "2025-01-15T10:00:00Z"
        );
        assert_eq!(
            strip_offset_artifact("2025-01-15T10:00:00+07:00"),
            "2025-01-15T10:00:00+07:00"
        );
    }

    #[test]
    fn parses_malformed_offset() {
        assert_eq!(
            parse_timestamp("2025-01-15T10:00:00.250000+00:00Z").map(|d| d.timestamp()),
            Some(utc(2025, 1, 15, 10, 0, 0).timestamp())
        );
    }

    #[test]
    fn parses_rfc3339_with_other_offset() {
        assert_eq!(
            parse_timestamp("2025-01-15T17:00:00+07:00"),
            Some(utc(2025, 1, 15, 10, 0, 0))
        );
    }

    #[test]
    fn naive_timestamps_are_utc() {
        assert_eq!(
            parse_timestamp("2025-01-15T10:00:00"),
            Some(utc(2025, 1, 15, 10, 0, 0))
        );
        assert_eq!(
            parse_timestamp("2025-01-15 10:00:00.5"),
            Some(utc(2025, 1, 15, 10, 0, 0) + chrono::Duration::milliseconds(500))
        );
        assert_eq!(
            parse_timestamp("2025-01-15"),
            Some(utc(2025, 1, 15, 0, 0, 0))
        );
    }

    #[test]
    fn garbage_does_not_parse() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2025-13-45T99:00:00"), None);
    }

    #[test]
    fn display_fallbacks_differ_by_call_site() {
        assert_eq!(display_timestamp(None), "");
        assert_eq!(display_timestamp(Some("not a date")), "");
        assert_eq!(display_timestamp_or_na(None), "N/A");
        assert_eq!(display_timestamp_or_na(Some("not a date")), "N/A");
        assert_eq!(display_clock(Some("not a date")), "");
    }

    #[test]
    fn display_formats_valid_dates() {
        let shown = display_timestamp(Some("2025-01-15T10:00:00Z"));
        assert_eq!(shown.len(), "2025-01-15 10:00:00".len());
        assert_eq!(display_clock(Some("2025-01-15T10:00:00Z")).len(), 5);
    }
}
