//! Event-time parsing

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::error::NormalizeError;

/// Date-time layouts for the local part, extended then basic notation
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

/// Date-only layouts, read as midnight
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y%m%d"];

/// Parse a timestamp value into epoch seconds.
///
/// Strings are tried as ISO-8601 first (a trailing `Z` is UTC, naive values
/// are read as UTC), then as a numeric epoch. Numbers are taken as epoch
/// seconds. The result is always finite.
pub fn parse_timestamp(value: &Value) -> Result<f64, NormalizeError> {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_iso8601(s.trim()).or_else(|| s.trim().parse::<f64>().ok()),
        _ => None,
    };

    match seconds {
        Some(ts) if ts.is_finite() => Ok(ts),
        _ => Err(NormalizeError::MissingOrInvalidTimestamp(value.to_string())),
    }
}

fn parse_iso8601(s: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(to_epoch_seconds(dt.timestamp(), dt.timestamp_subsec_nanos()));
    }

    let (local, offset_secs) = split_utc_offset(s)?;
    let dt = parse_local(local)?.and_utc();
    Some(to_epoch_seconds(
        dt.timestamp() - i64::from(offset_secs),
        dt.timestamp_subsec_nanos(),
    ))
}

fn parse_local(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Split off a trailing `Z` or `+HH[:MM[:SS]]` / `+HH[MM[SS]]` offset.
///
/// Returns the local part and the offset in seconds east of UTC; a missing
/// offset is UTC. `None` when an offset is present but malformed.
fn split_utc_offset(s: &str) -> Option<(&str, i32)> {
    if let Some(local) = s.strip_suffix(['Z', 'z']) {
        return Some((local, 0));
    }

    // Offsets only follow the time part; dashes before it belong to the date
    let Some(time_start) = s.find(['T', 't', ' ']) else {
        return Some((s, 0));
    };
    let Some(sign_at) = s[time_start..].rfind(['+', '-']).map(|i| time_start + i) else {
        return Some((s, 0));
    };

    let digits: String = s[sign_at + 1..].chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes, seconds) = match digits.len() {
        2 => (&digits[..2], "0", "0"),
        4 => (&digits[..2], &digits[2..4], "0"),
        6 => (&digits[..2], &digits[2..4], &digits[4..6]),
        _ => return None,
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    let seconds: i32 = seconds.parse().ok()?;
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    let magnitude = hours * 3600 + minutes * 60 + seconds;
    let offset = if s.as_bytes()[sign_at] == b'-' {
        -magnitude
    } else {
        magnitude
    };
    Some((&s[..sign_at], offset))
}

fn to_epoch_seconds(secs: i64, nanos: u32) -> f64 {
    secs as f64 + f64::from(nanos) / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso_with_z_suffix() {
        let ts = parse_timestamp(&json!("2025-08-11T09:20:00Z")).unwrap();
        assert_eq!(ts, 1_754_904_000.0);
    }

    #[test]
    fn test_iso_with_offset_and_fraction() {
        let ts = parse_timestamp(&json!("2025-08-11T11:20:00.5+02:00")).unwrap();
        assert_eq!(ts, 1_754_904_000.5);
    }

    #[test]
    fn test_naive_iso_is_utc() {
        let ts = parse_timestamp(&json!("2025-08-11T09:20:00")).unwrap();
        assert_eq!(ts, 1_754_904_000.0);
        let ts = parse_timestamp(&json!("2025-08-11 09:20:00")).unwrap();
        assert_eq!(ts, 1_754_904_000.0);
    }

    #[test]
    fn test_reduced_and_basic_iso_forms() {
        let cases = [
            ("2025-08-11T09:20Z", 1_754_904_000.0),
            ("2025-08-11T09:20", 1_754_904_000.0),
            ("2025-08-11 09:20", 1_754_904_000.0),
            ("2025-08-11", 1_754_870_400.0),
            ("2025-08-11T11:20:00+0200", 1_754_904_000.0),
            ("2025-08-11T11:20+02:00", 1_754_904_000.0),
            ("2025-08-11T04:20:00-05", 1_754_904_000.0),
            ("20250811T092000Z", 1_754_904_000.0),
            ("20250811T112000.25+0200", 1_754_904_000.25),
            ("20250811T0920", 1_754_904_000.0),
            ("20250811", 1_754_870_400.0),
        ];
        for (input, expected) in cases {
            assert_eq!(parse_timestamp(&json!(input)).unwrap(), expected, "{}", input);
        }
    }

    #[test]
    fn test_rejects_malformed_offsets() {
        for input in [
            "2025-08-11T09:20:00+2",
            "2025-08-11T09:20:00+25:00",
            "2025-08-11T09:20:00+02:7a",
            "2025-13-11T09:20:00Z",
        ] {
            assert!(parse_timestamp(&json!(input)).is_err(), "{}", input);
        }
    }

    #[test]
    fn test_numeric_and_numeric_string() {
        assert_eq!(parse_timestamp(&json!(1634567890.123)).unwrap(), 1634567890.123);
        assert_eq!(parse_timestamp(&json!(100)).unwrap(), 100.0);
        assert_eq!(parse_timestamp(&json!(" 101.5 ")).unwrap(), 101.5);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_timestamp(&json!("yesterday")).is_err());
        assert!(parse_timestamp(&json!(null)).is_err());
        assert!(parse_timestamp(&json!(true)).is_err());
        assert!(parse_timestamp(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(parse_timestamp(&json!("NaN")).is_err());
        assert!(parse_timestamp(&json!("inf")).is_err());
    }
}
