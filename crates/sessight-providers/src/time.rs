use chrono::{DateTime, NaiveDateTime, Utc};
use std::time::SystemTime;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an RFC 3339 or naive ISO timestamp into a UTC instant.
///
/// Offsets are applied before the zone is dropped; naive input is taken as
/// UTC already.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Filesystem time as a UTC instant.
pub fn system_time_to_utc(time: SystemTime) -> NaiveDateTime {
    DateTime::<Utc>::from(time).naive_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn expected() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_milli_opt(10, 30, 0, 250)
            .unwrap()
    }

    #[test]
    fn test_zulu_and_offset_forms() {
        assert_eq!(parse_timestamp("2025-01-15T10:30:00.250Z"), Some(expected()));
        assert_eq!(
            parse_timestamp("2025-01-15T12:30:00.250+02:00"),
            Some(expected())
        );
    }

    #[test]
    fn test_naive_forms() {
        assert_eq!(parse_timestamp("2025-01-15T10:30:00.250"), Some(expected()));
        assert_eq!(parse_timestamp("2025-01-15 10:30:00.250"), Some(expected()));
        assert!(parse_timestamp("2025-01-15T10:30:00").is_some());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
