//! Timestamp parsing for trackpoints.
//!
//! Accepts ISO-8601 date-times with or without a UTC offset. A trailing `Z`
//! is read as `+00:00`; date-times without an offset are taken as UTC.
//! Anything else is "no timestamp".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    // ISO-8601 basic format
    "%Y%m%dT%H%M%S%.f%z",
    "%Y%m%dT%H%M%S%.f%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
];

/// Parse a trackpoint time into a UTC instant.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    let normalized = raw.replace('Z', "+00:00");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Milliseconds since the Unix epoch, with sub-millisecond precision kept.
pub fn parse_timestamp_ms(raw: &str) -> Option<f64> {
    parse_timestamp(raw).map(|dt| dt.timestamp_micros() as f64 / 1000.0)
}

/// Render an instant the way imported points carry it: RFC 3339 with `Z`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEW_YEAR_2024_MS: f64 = 1_704_067_200_000.0;

    #[test]
    fn test_zulu_and_explicit_offset_agree() {
        let z = parse_timestamp_ms("2024-01-01T00:00:00Z").unwrap();
        let offset = parse_timestamp_ms("2024-01-01T00:00:00+00:00").unwrap();
        assert_eq!(z, NEW_YEAR_2024_MS);
        assert_eq!(z, offset);
    }

    #[test]
    fn test_non_utc_offset() {
        let ms = parse_timestamp_ms("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(ms, NEW_YEAR_2024_MS);
    }

    #[test]
    fn test_fractional_seconds() {
        let ms = parse_timestamp_ms("2024-01-01T00:00:00.250Z").unwrap();
        assert_eq!(ms, NEW_YEAR_2024_MS + 250.0);
    }

    #[test]
    fn test_naive_is_utc() {
        assert_eq!(parse_timestamp_ms("2024-01-01T00:00:00"), Some(NEW_YEAR_2024_MS));
        assert_eq!(parse_timestamp_ms("2024-01-01 00:00:00"), Some(NEW_YEAR_2024_MS));
        assert_eq!(parse_timestamp_ms("2024-01-01"), Some(NEW_YEAR_2024_MS));
    }

    #[test]
    fn test_basic_format() {
        assert_eq!(parse_timestamp_ms("20240101T000000Z"), Some(NEW_YEAR_2024_MS));
        assert_eq!(parse_timestamp_ms("20240101T020000+0200"), Some(NEW_YEAR_2024_MS));
        assert_eq!(parse_timestamp_ms("20240101T000000.500Z"), Some(NEW_YEAR_2024_MS + 500.0));
        assert_eq!(parse_timestamp_ms("20240101T000000"), Some(NEW_YEAR_2024_MS));
    }

    #[test]
    fn test_unparseable() {
        assert_eq!(parse_timestamp_ms(""), None);
        assert_eq!(parse_timestamp_ms("yesterday"), None);
        assert_eq!(parse_timestamp_ms("2024-13-01T00:00:00Z"), None);
    }

    #[test]
    fn test_format_round_trip() {
        let dt = parse_timestamp("2024-01-01T00:05:00Z").unwrap();
        assert_eq!(format_timestamp(&dt), "2024-01-01T00:05:00Z");
    }
}
