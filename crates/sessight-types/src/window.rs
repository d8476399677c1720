use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current time as a timezone-free UTC instant.
///
/// All stored timestamps share this convention so they compare directly.
pub fn utc_now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// The `days` days ending now.
    pub fn last_days(days: u32) -> Self {
        Self::days_ending_at(utc_now(), days)
    }

    pub fn days_ending_at(end: NaiveDateTime, days: u32) -> Self {
        Self {
            start: end - Duration::days(i64::from(days)),
            end,
        }
    }

    /// Same length, shifted back by `by`.
    pub fn shifted_back(&self, by: Duration) -> Self {
        Self {
            start: self.start - by,
            end: self.end - by,
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_window_is_half_open() {
        let end = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let window = TimeWindow::days_ending_at(end, 7);

        assert_eq!(window.duration(), Duration::days(7));
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));

        let previous = window.shifted_back(window.duration());
        assert_eq!(previous.end, window.start);
    }
}
