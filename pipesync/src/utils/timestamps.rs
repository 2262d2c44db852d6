//! Timestamp parsing and serde helpers for event payloads.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::{self, Deserializer, Visitor};
use std::fmt;
use thiserror::Error;

/// Represents an event timestamp.
pub type Timestamp = DateTime<Utc>;

/// Errors that can occur during timestamp parsing.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// The timestamp string is empty.
    #[error("Empty timestamp string")]
    EmptyString,

    /// The timestamp value is invalid.
    #[error("Invalid timestamp: {0}")]
    InvalidFormat(String),

    /// Nanosecond precision is not supported.
    #[error("Nanosecond precision timestamps are not supported")]
    NanosecondPrecision,
}

/// Detected precision of a Unix timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnixPrecision {
    /// Seconds (<=10 digits)
    Seconds,
    /// Milliseconds (<=13 digits)
    Milliseconds,
    /// Microseconds (<=16 digits)
    Microseconds,
}

/// Returns the current UTC time as an RFC 3339 string with microseconds.
///
/// # Examples
///
/// ```
/// use pipesync::utils::iso_timestamp;
///
/// let ts = iso_timestamp();
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Detects the precision of a Unix timestamp based on digit count.
///
/// # Errors
///
/// Returns `TimestampError::NanosecondPrecision` if the timestamp has more than 16 digits.
pub fn detect_unix_precision(timestamp: f64) -> Result<UnixPrecision, TimestampError> {
    let int_part = timestamp.abs().trunc() as i64;
    let digit_count = if int_part == 0 {
        1
    } else {
        int_part.to_string().len()
    };

    match digit_count {
        0..=10 => Ok(UnixPrecision::Seconds),
        11..=13 => Ok(UnixPrecision::Milliseconds),
        14..=16 => Ok(UnixPrecision::Microseconds),
        _ => Err(TimestampError::NanosecondPrecision),
    }
}

/// Parses a timestamp string.
///
/// Supports numeric Unix timestamps (seconds, milliseconds, microseconds)
/// and ISO 8601 / RFC 3339 strings, with or without an offset.
///
/// # Errors
///
/// Returns `TimestampError` if the input cannot be parsed.
pub fn parse_timestamp(input: &str) -> Result<Timestamp, TimestampError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(TimestampError::EmptyString);
    }

    if let Ok(num) = trimmed.parse::<f64>() {
        return parse_unix_timestamp(num);
    }

    parse_iso8601(trimmed)
}

/// Parses a Unix timestamp with automatic precision detection.
///
/// Values with a fractional part are treated as seconds.
///
/// # Errors
///
/// Returns `TimestampError` if the value is out of range.
pub fn parse_unix_timestamp(value: f64) -> Result<Timestamp, TimestampError> {
    let invalid = || TimestampError::InvalidFormat(value.to_string());

    if (value - value.trunc()).abs() > f64::EPSILON {
        let secs = value.trunc() as i64;
        let nanos = (value.fract().abs() * 1_000_000_000.0) as u32;
        return Utc.timestamp_opt(secs, nanos).single().ok_or_else(invalid);
    }

    let raw = value as i64;
    match detect_unix_precision(value)? {
        UnixPrecision::Seconds => Utc.timestamp_opt(raw, 0).single().ok_or_else(invalid),
        UnixPrecision::Milliseconds => Utc.timestamp_millis_opt(raw).single().ok_or_else(invalid),
        UnixPrecision::Microseconds => Utc.timestamp_micros(raw).single().ok_or_else(invalid),
    }
}

fn parse_iso8601(s: &str) -> Result<Timestamp, TimestampError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Offset-less forms are taken as UTC.
    let formats = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];

    formats
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| TimestampError::InvalidFormat(s.to_string()))
}

/// Formats a timestamp as an RFC 3339 string with microseconds.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

struct FlexibleTimestamp;

impl<'de> Visitor<'de> for FlexibleTimestamp {
    type Value = Timestamp;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an ISO 8601 string or a Unix timestamp")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_timestamp(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        parse_unix_timestamp(v as f64).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        parse_unix_timestamp(v as f64).map_err(E::custom)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        parse_unix_timestamp(v).map_err(E::custom)
    }
}

/// Serde helper: deserializes a required timestamp from a string or number.
///
/// # Errors
///
/// Fails when the value is neither a parseable string nor a number.
pub fn deserialize_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
    d.deserialize_any(FlexibleTimestamp)
}

/// Serde helper: deserializes an optional timestamp; `null` maps to `None`.
///
/// # Errors
///
/// Fails when a non-null value cannot be parsed.
pub fn deserialize_optional_timestamp<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<Option<Timestamp>, D::Error> {
    #[derive(serde::Deserialize)]
    struct Wrapper(#[serde(deserialize_with = "deserialize_timestamp")] Timestamp);

    let wrapped: Option<Wrapper> = serde::Deserialize::deserialize(d)?;
    Ok(wrapped.map(|Wrapper(ts)| ts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[derive(serde::Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "deserialize_timestamp")]
        at: Timestamp,
        #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
        maybe: Option<Timestamp>,
    }

    #[test]
    fn test_detect_unix_precision() {
        assert_eq!(
            detect_unix_precision(1_696_512_000.0).unwrap(),
            UnixPrecision::Seconds
        );
        assert_eq!(
            detect_unix_precision(1_696_512_000_000.0).unwrap(),
            UnixPrecision::Milliseconds
        );
        assert_eq!(
            detect_unix_precision(1_696_512_000_000_000.0).unwrap(),
            UnixPrecision::Microseconds
        );
    }

    #[test]
    fn test_parse_iso8601() {
        let dt = parse_timestamp("2023-10-05T14:30:00Z").unwrap();
        assert_eq!(dt.year(), 2023);
        assert_eq!(dt.month(), 10);
        assert_eq!(dt.day(), 5);

        let naive = parse_timestamp("2023-10-05T14:30:00.250").unwrap();
        assert_eq!(naive.timestamp_millis(), dt.timestamp_millis() + 250);
    }

    #[test]
    fn test_seconds_and_millis_agree() {
        let secs = parse_timestamp("1696512000").unwrap();
        let millis = parse_unix_timestamp(1_696_512_000_000.0).unwrap();
        assert_eq!(secs, millis);
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(matches!(
            parse_timestamp("  "),
            Err(TimestampError::EmptyString)
        ));
    }

    #[test]
    fn test_serde_helpers() {
        let probe: Probe =
            serde_json::from_str(r#"{"at": 1696512000000, "maybe": "2023-10-05T13:20:00Z"}"#)
                .unwrap();
        assert_eq!(probe.at, probe.maybe.unwrap());

        let probe: Probe = serde_json::from_str(r#"{"at": "2023-10-05T13:20:00Z"}"#).unwrap();
        assert!(probe.maybe.is_none());

        let bad: Result<Probe, _> = serde_json::from_str(r#"{"at": "yesterday"}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_format_round_trip() {
        let dt = parse_timestamp("2023-10-05T14:30:00.123456Z").unwrap();
        assert_eq!(format_iso8601(&dt), "2023-10-05T14:30:00.123456+00:00");
    }
}
