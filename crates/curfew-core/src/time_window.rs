//! Daily restriction windows.
//!
//! Times of day are carried as HHMM integers (22:00 is `2200`) and compared
//! numerically. Midnight wrap is handled by [`RestrictionWindow`], not by
//! [`TimeOfDay`] itself.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::TimeParseError;

/// Time of day encoded as HHMM (0..=2359).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Midnight (00:00).
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    /// Creates a TimeOfDay from hour and minute.
    ///
    /// # Panics
    /// Panics if hour >= 24 or minute >= 60.
    pub fn new(hour: u8, minute: u8) -> Self {
        assert!(hour < 24, "hour must be 0-23");
        assert!(minute < 60, "minute must be 0-59");
        Self(hour as u16 * 100 + minute as u16)
    }

    /// Creates a TimeOfDay from an HHMM integer such as `2200`.
    pub fn from_hhmm(value: u16) -> Result<Self, TimeParseError> {
        if value > 2359 {
            return Err(TimeParseError {
                input: value.to_string(),
                reason: "value exceeds 2359",
            });
        }
        if value % 100 >= 60 {
            return Err(TimeParseError {
                input: value.to_string(),
                reason: "minute must be 0-59",
            });
        }
        Ok(Self(value))
    }

    /// Creates from a chrono NaiveTime, dropping seconds.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self(time.hour() as u16 * 100 + time.minute() as u16)
    }

    /// The HHMM integer value.
    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u8 {
        (self.0 / 100) as u8
    }

    pub fn minute(&self) -> u8 {
        (self.0 % 100) as u8
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    /// Parses "HH:MM" (colons are stripped, so "2200" and "22:00" are equal).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| TimeParseError {
            input: s.to_string(),
            reason,
        };

        let digits: String = s.trim().chars().filter(|c| *c != ':').collect();
        if digits.is_empty() {
            return Err(err("empty"));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err("not numeric"));
        }
        if digits.len() > 4 {
            return Err(err("too many digits"));
        }

        let value: u16 = digits.parse().map_err(|_| err("not numeric"))?;
        Self::from_hhmm(value).map_err(|e| err(e.reason))
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = TimeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(time: TimeOfDay) -> Self {
        time.to_string()
    }
}

/// A configured start/end pair.
///
/// The two shapes are read differently:
///
/// - overnight (`start > end`, e.g. 22:00-09:00): the span from `start`
///   through midnight to `end` is when sales are blocked;
/// - intraday (`start <= end`, e.g. 09:00-17:00): `[start, end)` is when
///   sales are allowed, and everything outside it is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestrictionWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl RestrictionWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Returns true if this window crosses midnight.
    pub fn is_overnight(&self) -> bool {
        self.start > self.end
    }

    /// Returns true if a sale may happen at `now`.
    pub fn permits_sale(&self, now: TimeOfDay) -> bool {
        if self.is_overnight() {
            // 22:00-09:00: open from 09:00 until 22:00
            now >= self.end && now < self.start
        } else {
            // 09:00-17:00: open from 09:00 until 17:00
            now >= self.start && now < self.end
        }
    }

    /// Returns true if sales are blocked at `now`.
    pub fn restricts(&self, now: TimeOfDay) -> bool {
        !self.permits_sale(now)
    }
}

impl fmt::Display for RestrictionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Source of the current local time of day.
pub trait Clock: Send + Sync {
    fn current_time(&self) -> TimeOfDay;
}

/// Host wall clock in the process's local timezone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn current_time(&self) -> TimeOfDay {
        TimeOfDay::from_naive_time(chrono::Local::now().time())
    }
}

/// A clock that always reports the same time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub TimeOfDay);

impl Clock for FixedClock {
    fn current_time(&self) -> TimeOfDay {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    // ==================== TimeOfDay Tests ====================

    #[test]
    fn time_of_day_creation() {
        let time = TimeOfDay::new(14, 30);
        assert_eq!(time.hour(), 14);
        assert_eq!(time.minute(), 30);
        assert_eq!(time.value(), 1430);
    }

    #[test]
    #[should_panic(expected = "hour must be 0-23")]
    fn time_of_day_invalid_hour() {
        TimeOfDay::new(24, 0);
    }

    #[test]
    #[should_panic(expected = "minute must be 0-59")]
    fn time_of_day_invalid_minute() {
        TimeOfDay::new(12, 60);
    }

    #[test]
    fn parse_hh_mm() {
        assert_eq!(t("22:00").value(), 2200);
        assert_eq!(t("09:00").value(), 900);
        assert_eq!(t("9:05").value(), 905);
        assert_eq!(t("0000").value(), 0);
        assert_eq!(t(" 23:59 ").value(), 2359);
    }

    #[test]
    fn parse_rejects_garbage() {
        for input in ["", ":", "ab:cd", "22:0x", "-1:00", "24:00", "12:60", "123:456"] {
            assert!(input.parse::<TimeOfDay>().is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn parse_error_keeps_input() {
        let err = "25:00".parse::<TimeOfDay>().unwrap_err();
        assert_eq!(err.input, "25:00");
        assert_eq!(err.reason, "value exceeds 2359");
    }

    #[test]
    fn display_is_zero_padded() {
        assert_eq!(TimeOfDay::new(9, 5).to_string(), "09:05");
        assert_eq!(TimeOfDay::MIDNIGHT.to_string(), "00:00");
    }

    #[test]
    fn comparison_is_numeric() {
        assert!(t("08:00") < t("12:00"));
        assert!(t("23:59") > t("00:00"));
    }

    #[test]
    fn from_naive_time_drops_seconds() {
        let time = NaiveTime::from_hms_opt(21, 7, 59).unwrap();
        assert_eq!(TimeOfDay::from_naive_time(time).value(), 2107);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&TimeOfDay::new(22, 0)).unwrap();
        assert_eq!(json, "\"22:00\"");
        let back: TimeOfDay = serde_json::from_str("\"09:30\"").unwrap();
        assert_eq!(back, TimeOfDay::new(9, 30));
        assert!(serde_json::from_str::<TimeOfDay>("\"99:99\"").is_err());
    }

    // ==================== RestrictionWindow Tests ====================

    #[test]
    fn window_shape() {
        assert!(RestrictionWindow::new(t("22:00"), t("09:00")).is_overnight());
        assert!(!RestrictionWindow::new(t("09:00"), t("17:00")).is_overnight());
    }

    #[test]
    fn overnight_blocks_through_midnight() {
        let window = RestrictionWindow::new(t("22:00"), t("09:00"));

        assert!(window.permits_sale(t("21:59"))); // Before start
        assert!(window.restricts(t("22:00"))); // Start (inclusive)
        assert!(window.restricts(t("23:00")));
        assert!(window.restricts(t("00:00"))); // Midnight
        assert!(window.restricts(t("08:59"))); // Just before end
        assert!(window.permits_sale(t("09:00"))); // End (exclusive)
        assert!(window.permits_sale(t("10:00")));
    }

    #[test]
    fn intraday_allows_only_inside() {
        let window = RestrictionWindow::new(t("09:00"), t("17:00"));

        assert!(window.restricts(t("08:59"))); // Before
        assert!(window.permits_sale(t("09:00"))); // Start (inclusive)
        assert!(window.permits_sale(t("12:00"))); // Middle
        assert!(window.permits_sale(t("16:59"))); // Just before end
        assert!(window.restricts(t("17:00"))); // End (exclusive)
        assert!(window.restricts(t("20:00"))); // After
    }

    #[test]
    fn overnight_exhaustive() {
        let window = RestrictionWindow::new(t("22:00"), t("09:00"));
        for hour in 0..24u8 {
            for minute in 0..60u8 {
                let now = TimeOfDay::new(hour, minute);
                let expected = now.value() >= 2200 || now.value() < 900;
                assert_eq!(window.restricts(now), expected, "at {now}");
            }
        }
    }

    #[test]
    fn intraday_exhaustive() {
        let window = RestrictionWindow::new(t("09:00"), t("17:00"));
        for hour in 0..24u8 {
            for minute in 0..60u8 {
                let now = TimeOfDay::new(hour, minute);
                let expected = now.value() < 900 || now.value() >= 1700;
                assert_eq!(window.restricts(now), expected, "at {now}");
            }
        }
    }

    #[test]
    fn every_hourly_window_matches_set_definition() {
        for start_hour in 0..24u8 {
            for end_hour in (0..24u8).filter(|h| *h != start_hour) {
                let start = TimeOfDay::new(start_hour, 0);
                let end = TimeOfDay::new(end_hour, 30);
                let window = RestrictionWindow::new(start, end);

                for hour in 0..24u8 {
                    for minute in [0u8, 29, 30, 59] {
                        let now = TimeOfDay::new(hour, minute);
                        let expected = if start > end {
                            // [start, 2400) plus [0, end)
                            now >= start || now < end
                        } else {
                            // Outside [start, end)
                            now < start || now >= end
                        };
                        assert_eq!(window.restricts(now), expected, "{window} at {now}");
                        assert_eq!(window.permits_sale(now), !expected, "{window} at {now}");
                    }
                }
            }
        }
    }

    #[test]
    fn window_display() {
        let window = RestrictionWindow::new(t("22:00"), t("9:00"));
        assert_eq!(window.to_string(), "22:00-09:00");
    }

    #[test]
    fn fixed_clock_reports_its_time() {
        let clock = FixedClock(t("13:45"));
        assert_eq!(clock.current_time(), t("13:45"));
    }
}
