//! Wall-clock timestamps pinned to a fixed UTC offset
//!
//! History timestamps are written as `YYYY-MM-DD HH:MM:SS` in one configured
//! offset no matter what the host timezone is, so logs written on different
//! machines stay comparable. The offset is carried by value; nothing here
//! touches process-wide timezone state.

use chrono::{FixedOffset, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Utc};

/// Format used for every persisted and reported timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogClock {
    offset: FixedOffset,
}

impl LogClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current wall-clock time in the pinned offset, truncated to seconds
    pub fn now(&self) -> NaiveDateTime {
        let local = Utc::now().with_timezone(&self.offset).naive_local();
        local.with_nanosecond(0).unwrap_or(local)
    }

    /// Start of a window reaching `hours` back from now.
    ///
    /// Windows too large to represent saturate to the earliest instant, so
    /// they simply cover the whole history.
    pub fn hours_ago(&self, hours: i64) -> NaiveDateTime {
        Self::back_from(self.now(), TimeDelta::try_hours(hours))
    }

    /// Retention cutoff `days` before `now`, saturating like [`LogClock::hours_ago`]
    pub fn days_before(now: NaiveDateTime, days: i64) -> NaiveDateTime {
        Self::back_from(now, TimeDelta::try_days(days))
    }

    fn back_from(now: NaiveDateTime, delta: Option<TimeDelta>) -> NaiveDateTime {
        delta
            .and_then(|d| now.checked_sub_signed(d))
            .unwrap_or(NaiveDateTime::MIN)
    }

    pub fn format(&self, timestamp: &NaiveDateTime) -> String {
        timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn now_string(&self) -> String {
        self.format(&self.now())
    }

    /// True when `now` falls inside the minute starting at `at`
    pub fn is_at_minute(now: &NaiveDateTime, at: NaiveTime) -> bool {
        now.hour() == at.hour() && now.minute() == at.minute()
    }
}

impl Default for LogClock {
    /// UTC+8, the offset the monitor has always logged in
    fn default() -> Self {
        Self::new(FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid offset"))
    }
}

/// Parse an offset such as `+08:00`, `-0530` or `Z`
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset, String> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).ok_or_else(|| "invalid offset".to_string());
    }

    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(format!("offset '{}' must start with '+' or '-'", value)),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("offset '{}' must look like +HH:MM", value));
    }

    let hours: i32 = digits[..2].parse().map_err(|_| format!("bad hours in '{}'", value))?;
    let minutes: i32 = digits[2..].parse().map_err(|_| format!("bad minutes in '{}'", value))?;
    if minutes >= 60 {
        return Err(format!("bad minutes in '{}'", value));
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .ok_or_else(|| format!("offset '{}' is out of range", value))
}

/// Parse a daily `HH:MM` trigger time
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|e| format!("time '{}' must look like HH:MM: {}", value, e))
}

/// Serde adapter for `NaiveDateTime` fields stored as `YYYY-MM-DD HH:MM:SS`
pub mod log_timestamp {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_parse_utc_offset() {
        assert_eq!(parse_utc_offset("+08:00").unwrap().local_minus_utc(), 8 * 3600);
        assert_eq!(parse_utc_offset("-0530").unwrap().local_minus_utc(), -(5 * 3600 + 1800));
        assert_eq!(parse_utc_offset("Z").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("08:00").is_err());
        assert!(parse_utc_offset("+8").is_err());
        assert!(parse_utc_offset("+08:75").is_err());
    }

    #[test]
    fn test_default_clock_is_utc_plus_eight() {
        assert_eq!(LogClock::default().offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_now_differs_by_offset_not_host_timezone() {
        let utc = LogClock::new(FixedOffset::east_opt(0).unwrap());
        let plus8 = LogClock::default();

        let delta = plus8.now() - utc.now();
        // Allow for a second boundary between the two calls.
        assert!((delta.num_seconds() - 8 * 3600).abs() <= 1);
    }

    #[test]
    fn test_format_has_second_precision() {
        let clock = LogClock::default();
        assert_eq!(clock.format(&at(9, 5, 7)), "2024-03-01 09:05:07");
        assert_eq!(clock.now().nanosecond(), 0);
    }

    #[test]
    fn test_huge_window_saturates() {
        let clock = LogClock::default();
        assert_eq!(clock.hours_ago(i64::MAX), NaiveDateTime::MIN);
        assert!(clock.hours_ago(24) < clock.now());
    }

    #[test]
    fn test_is_at_minute() {
        let midnight = parse_time_of_day("00:00").unwrap();
        assert!(LogClock::is_at_minute(&at(0, 0, 0), midnight));
        assert!(LogClock::is_at_minute(&at(0, 0, 59), midnight));
        assert!(!LogClock::is_at_minute(&at(0, 1, 0), midnight));
        assert!(!LogClock::is_at_minute(&at(12, 0, 0), midnight));
    }

    #[test]
    fn test_parse_time_of_day_rejects_garbage() {
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("noon").is_err());
        assert_eq!(parse_time_of_day(" 03:30 ").unwrap().minute(), 30);
    }
}
