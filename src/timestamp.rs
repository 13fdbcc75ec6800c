//! UTC timestamp helpers. Sample times are kept at microsecond resolution throughout the crate,
//! which is the finest resolution miniSEED 2.4 can carry (BTIME + Blockette 1001).

use crate::error::{ExplorerError, ExplorerResult};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parses the timestamp flavours found in FDSN documents: RFC 3339 with offset, naive ISO 8601
/// (interpreted as UTC, with or without trailing `Z`) and plain dates.
pub fn parse_datetime(s: &str) -> ExplorerResult<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = s.trim_end_matches('Z');
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    Err(ExplorerError::Format(format!("unparsable timestamp '{s}'")))
}

/// Formats a timestamp the way FDSN web services expect it in query strings.
pub fn format_fdsn(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Signed number of seconds from `start` to `end`.
pub fn seconds_between(start: &DateTime<Utc>, end: &DateTime<Utc>) -> f64 {
    let delta = *end - *start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

/// `t` shifted by `seconds`, saturating at the ends of the representable range.
pub fn add_seconds(t: &DateTime<Utc>, seconds: f64) -> DateTime<Utc> {
    let offset = Duration::microseconds((seconds * 1e6).round() as i64);
    t.checked_add_signed(offset).unwrap_or(if seconds < 0.0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// Drops anything below one microsecond.
pub fn round_to_micros(t: &DateTime<Utc>) -> DateTime<Utc> {
    let nanos = t.nanosecond();
    let rounded = (nanos + 500) / 1000 * 1000;
    let base = *t - Duration::nanoseconds(nanos as i64);
    base + Duration::nanoseconds(rounded as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn test_add_seconds_saturates() {
        let t = Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 0).unwrap();
        assert_eq!(add_seconds(&t, 1e30), DateTime::<Utc>::MAX_UTC);
        assert_eq!(add_seconds(&t, -1e30), DateTime::<Utc>::MIN_UTC);
        assert_eq!(
            add_seconds(&t, 1.5),
            Utc.with_ymd_and_hms(2019, 11, 1, 0, 0, 1).unwrap() + Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_parse_variants() {
        let expected = Utc.with_ymd_and_hms(2019, 11, 1, 12, 30, 0).unwrap();
        for s in [
            "2019-11-01T12:30:00",
            "2019-11-01T12:30:00Z",
            "2019-11-01T12:30:00.0000",
            "2019-11-01T12:30:00+00:00",
            "2019-11-01 12:30:00.0",
        ] {
            assert_eq!(parse_datetime(s).unwrap(), expected, "{s}");
        }
        let date = parse_datetime("2019-11-01").unwrap();
        assert_eq!(date.day(), 1);
        assert_eq!(date.hour(), 0);
        assert!(parse_datetime("yesterday").is_err());
    }

    #[test]
    fn test_format_and_seconds() {
        let t0 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let t1 = add_seconds(&t0, 20.25);
        assert_eq!(format_fdsn(&t1), "2020-01-01T00:00:20.250000");
        assert!((seconds_between(&t0, &t1) - 20.25).abs() < 1e-9);
        assert!((seconds_between(&t1, &t0) + 20.25).abs() < 1e-9);
    }

    #[test]
    fn test_round_to_micros() {
        let t = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::nanoseconds(1_499);
        assert_eq!(round_to_micros(&t).nanosecond(), 1_000);
    }
}
