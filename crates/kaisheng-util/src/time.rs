//! Time utilities for KaiSheng
//!
//! Wall-clock primitives for recurring downtime windows, plus a `now()`
//! wrapper that honours mock time.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `KAISHENG_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for testing downtime schedules without waiting for the evening.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 22:30:00`)
//!
//! Example:
//! ```bash
//! KAISHENG_MOCK_TIME="2025-12-25 22:30:00" kaisheng status
//! ```

use chrono::{DateTime, Datelike, Days, Local, NaiveDateTime, NaiveTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "KAISHENG_MOCK_TIME";

/// Format accepted by [`MOCK_TIME_ENV_VAR`]
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";


/// Offset between mock time and real time, computed once at first use so
/// mock time advances naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // Internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            let mock_time_str = std::env::var(MOCK_TIME_ENV_VAR).ok()?;
            let Ok(naive_dt) = NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) else {
                tracing::warn!(
                    mock_time = %mock_time_str,
                    expected_format = MOCK_TIME_FORMAT,
                    "Invalid mock time format"
                );
                return None;
            };
            let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() else {
                tracing::warn!(
                    mock_time = %mock_time_str,
                    "Failed to convert mock time to local timezone"
                );
                return None;
            };
            let offset = mock_dt.signed_duration_since(chrono::Local::now());
            tracing::info!(
                mock_time = %mock_time_str,
                offset_secs = offset.num_seconds(),
                "Mock time enabled"
            );
            Some(offset)
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    get_mock_time_offset().is_some()
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    match get_mock_time_offset() {
        Some(offset) => real_now + offset,
        None => real_now,
    }
}

/// Format a DateTime as `HH:MM`.
pub fn format_clock_time(dt: &DateTime<Local>) -> String {
    dt.format("%H:%M").to_string()
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full(dt: &DateTime<Local>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Time of day with minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or_default()
    }

    /// Returns seconds since midnight
    pub fn as_seconds_from_midnight(&self) -> u32 {
        (self.hour as u32) * 3600 + (self.minute as u32) * 60
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_seconds_from_midnight()
            .cmp(&other.as_seconds_from_midnight())
    }
}

/// Days of the week mask (Monday is bit 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DaysOfWeek(u8);

impl DaysOfWeek {
    pub const MONDAY: u8 = 1 << 0;
    pub const TUESDAY: u8 = 1 << 1;
    pub const WEDNESDAY: u8 = 1 << 2;
    pub const THURSDAY: u8 = 1 << 3;
    pub const FRIDAY: u8 = 1 << 4;
    pub const SATURDAY: u8 = 1 << 5;
    pub const SUNDAY: u8 = 1 << 6;

    pub const WEEKDAYS: DaysOfWeek = DaysOfWeek(
        Self::MONDAY | Self::TUESDAY | Self::WEDNESDAY | Self::THURSDAY | Self::FRIDAY,
    );
    pub const WEEKENDS: DaysOfWeek = DaysOfWeek(Self::SATURDAY | Self::SUNDAY);
    pub const ALL_DAYS: DaysOfWeek = DaysOfWeek(0x7F);
    pub const NONE: DaysOfWeek = DaysOfWeek(0);

    pub fn new(mask: u8) -> Self {
        Self(mask & 0x7F)
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        (self.0 & (1 << weekday.num_days_from_monday())) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the days in this mask, Monday first
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .filter(|day| self.contains(*day))
    }
}

impl fmt::Display for DaysOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ALL_DAYS => write!(f, "every day"),
            Self::WEEKDAYS => write!(f, "weekdays"),
            Self::WEEKENDS => write!(f, "weekends"),
            Self::NONE => write!(f, "never"),
            _ => {
                let names: Vec<String> = self.iter().map(|d| d.to_string()).collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}

/// A recurring time window.
///
/// A window whose `end` is before its `start` crosses midnight; the part
/// after midnight belongs to the day the window started on. `start == end`
/// is an empty window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub days: DaysOfWeek,
    pub start: WallClock,
    pub end: WallClock,
}

impl TimeWindow {
    pub fn new(days: DaysOfWeek, start: WallClock, end: WallClock) -> Self {
        Self { days, start, end }
    }

    /// True when the window wraps past midnight (e.g. 22:00 - 07:00)
    pub fn crosses_midnight(&self) -> bool {
        self.end < self.start
    }

    /// Check if the given local datetime falls within this window
    pub fn contains(&self, dt: &DateTime<Local>) -> bool {
        let weekday = dt.weekday();
        let now_secs = dt.time().num_seconds_from_midnight();
        let start_secs = self.start.as_seconds_from_midnight();
        let end_secs = self.end.as_seconds_from_midnight();

        if start_secs < end_secs {
            self.days.contains(weekday) && now_secs >= start_secs && now_secs < end_secs
        } else if start_secs > end_secs {
            // Evening part counts against today, morning part against yesterday
            (now_secs >= start_secs && self.days.contains(weekday))
                || (now_secs < end_secs && self.days.contains(weekday.pred()))
        } else {
            false
        }
    }

    /// Duration remaining in this window from the given time
    pub fn remaining_duration(&self, dt: &DateTime<Local>) -> Option<Duration> {
        let end = self.ends_at(dt)?;
        (end - *dt).to_std().ok()
    }

    /// Instant at which the current occurrence of this window closes.
    ///
    /// Built from the local wall-clock end, so a DST change inside the
    /// window does not shift it.
    pub fn ends_at(&self, dt: &DateTime<Local>) -> Option<DateTime<Local>> {
        if !self.contains(dt) {
            return None;
        }

        let today = dt.date_naive();
        let in_evening_part = self.crosses_midnight()
            && dt.time().num_seconds_from_midnight() >= self.start.as_seconds_from_midnight();
        let end_date = if in_evening_part {
            today.succ_opt()?
        } else {
            today
        };

        local_instant(end_date.and_time(self.end.to_naive_time()))
    }

    /// Next instant strictly after `dt` at which this window opens.
    ///
    /// Looks at most a week ahead, which always covers a recurring window.
    pub fn next_start_after(&self, dt: &DateTime<Local>) -> Option<DateTime<Local>> {
        if self.days.is_empty() || self.start == self.end {
            return None;
        }

        let today = dt.date_naive();
        (0..=7u64)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter(|date| self.days.contains(date.weekday()))
            .filter_map(|date| {
                local_instant(date.and_time(self.start.to_naive_time()))
            })
            .find(|candidate| candidate > dt)
    }
}

/// Map a local wall-clock time to an instant. A time skipped by a DST
/// jump resolves to the same wall time one hour later.
fn local_instant(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&naive).earliest().or_else(|| {
        Local
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest()
    })
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} ({})", self.start, self.end, self.days)
    }
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(hour: u8, minute: u8) -> WallClock {
        WallClock::new(hour, minute).unwrap()
    }

    #[test]
    fn test_wall_clock_ordering() {
        let morning = clock(8, 0);
        let noon = clock(12, 0);
        let evening = clock(18, 30);

        assert!(morning < noon);
        assert!(noon < evening);
        assert!(morning < evening);
    }

    #[test]
    fn test_wall_clock_rejects_out_of_range() {
        assert!(WallClock::new(24, 0).is_none());
        assert!(WallClock::new(23, 60).is_none());
        assert_eq!(clock(7, 5).to_string(), "07:05");
    }

    #[test]
    fn test_days_of_week() {
        let weekdays = DaysOfWeek::WEEKDAYS;
        assert!(weekdays.contains(Weekday::Mon));
        assert!(weekdays.contains(Weekday::Fri));
        assert!(!weekdays.contains(Weekday::Sat));
        assert!(!weekdays.contains(Weekday::Sun));

        let weekends = DaysOfWeek::WEEKENDS;
        assert!(!weekends.contains(Weekday::Mon));
        assert!(weekends.contains(Weekday::Sat));
        assert!(weekends.contains(Weekday::Sun));

        let custom = DaysOfWeek::new(DaysOfWeek::MONDAY | DaysOfWeek::SUNDAY);
        assert_eq!(custom.iter().collect::<Vec<_>>(), vec![Weekday::Mon, Weekday::Sun]);
    }

    #[test]
    fn test_time_window_contains() {
        let window = TimeWindow::new(DaysOfWeek::WEEKDAYS, clock(14, 0), clock(18, 0));

        // Monday at 3 PM - in window
        let dt = Local.with_ymd_and_hms(2025, 12, 29, 15, 0, 0).unwrap();
        assert!(window.contains(&dt));

        // Monday at 10 AM - outside window
        let dt = Local.with_ymd_and_hms(2025, 12, 29, 10, 0, 0).unwrap();
        assert!(!window.contains(&dt));

        // Saturday at 3 PM - wrong day
        let dt = Local.with_ymd_and_hms(2025, 12, 27, 15, 0, 0).unwrap();
        assert!(!window.contains(&dt));
    }

    #[test]
    fn test_time_window_bounds() {
        let window = TimeWindow::new(DaysOfWeek::ALL_DAYS, clock(14, 0), clock(18, 0));

        let start = Local.with_ymd_and_hms(2025, 12, 26, 14, 0, 0).unwrap();
        assert!(window.contains(&start), "start is inclusive");

        let last_second = Local.with_ymd_and_hms(2025, 12, 26, 17, 59, 59).unwrap();
        assert!(window.contains(&last_second));

        let end = Local.with_ymd_and_hms(2025, 12, 26, 18, 0, 0).unwrap();
        assert!(!window.contains(&end), "end is exclusive");
    }

    #[test]
    fn test_overnight_window() {
        // Weeknight bedtime: Sunday through Thursday nights
        let days = DaysOfWeek::new(
            DaysOfWeek::SUNDAY
                | DaysOfWeek::MONDAY
                | DaysOfWeek::TUESDAY
                | DaysOfWeek::WEDNESDAY
                | DaysOfWeek::THURSDAY,
        );
        let window = TimeWindow::new(days, clock(22, 0), clock(7, 0));
        assert!(window.crosses_midnight());

        // Thursday 23:00 - evening part of Thursday's window
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 23, 0, 0).unwrap();
        assert!(window.contains(&dt));

        // Friday 06:00 - morning part of Thursday's window
        let dt = Local.with_ymd_and_hms(2025, 12, 26, 6, 0, 0).unwrap();
        assert!(window.contains(&dt));

        // Friday 23:00 - Friday night is not a school night
        let dt = Local.with_ymd_and_hms(2025, 12, 26, 23, 0, 0).unwrap();
        assert!(!window.contains(&dt));

        // Saturday 06:00 - belongs to Friday's (absent) window
        let dt = Local.with_ymd_and_hms(2025, 12, 27, 6, 0, 0).unwrap();
        assert!(!window.contains(&dt));

        // Monday 06:00 - morning after Sunday night
        let dt = Local.with_ymd_and_hms(2025, 12, 29, 6, 0, 0).unwrap();
        assert!(window.contains(&dt));

        // Thursday 12:00 - daytime is never inside
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 12, 0, 0).unwrap();
        assert!(!window.contains(&dt));
    }

    #[test]
    fn test_empty_window_never_matches() {
        let window = TimeWindow::new(DaysOfWeek::ALL_DAYS, clock(9, 0), clock(9, 0));
        let dt = Local.with_ymd_and_hms(2025, 12, 26, 9, 0, 0).unwrap();
        assert!(!window.contains(&dt));
        assert!(window.next_start_after(&dt).is_none());
    }

    #[test]
    fn test_time_window_remaining() {
        let window = TimeWindow::new(DaysOfWeek::ALL_DAYS, clock(14, 0), clock(18, 0));

        let dt = Local.with_ymd_and_hms(2025, 12, 26, 15, 0, 0).unwrap();
        let remaining = window.remaining_duration(&dt).unwrap();
        assert_eq!(remaining, Duration::from_secs(3 * 3600));

        let dt = Local.with_ymd_and_hms(2025, 12, 26, 17, 59, 30).unwrap();
        assert_eq!(window.remaining_duration(&dt).unwrap(), Duration::from_secs(30));

        let outside = Local.with_ymd_and_hms(2025, 12, 26, 19, 0, 0).unwrap();
        assert!(window.remaining_duration(&outside).is_none());
    }

    #[test]
    fn test_end_follows_wall_clock_across_dst_nights() {
        let window = TimeWindow::new(DaysOfWeek::ALL_DAYS, clock(22, 0), clock(7, 0));

        // Nights with a US or EU clock change, plus an ordinary one
        for (year, month, day) in [(2026, 3, 7), (2026, 3, 28), (2026, 10, 24), (2026, 10, 31), (2026, 6, 10)] {
            let evening = Local.with_ymd_and_hms(year, month, day, 23, 0, 0).unwrap();
            let end = window.ends_at(&evening).unwrap();

            let expected_date = evening.date_naive().succ_opt().unwrap();
            assert_eq!(end.naive_local(), expected_date.and_hms_opt(7, 0, 0).unwrap());
            assert_eq!(
                window.remaining_duration(&evening).unwrap(),
                (end - evening).to_std().unwrap()
            );
        }
    }

    #[test]
    fn test_end_ignores_subsecond_query_time() {
        let window = TimeWindow::new(DaysOfWeek::ALL_DAYS, clock(14, 0), clock(18, 0));
        let dt = Local.with_ymd_and_hms(2025, 12, 26, 17, 59, 30).unwrap()
            + chrono::Duration::milliseconds(500);

        assert_eq!(
            window.ends_at(&dt).unwrap(),
            Local.with_ymd_and_hms(2025, 12, 26, 18, 0, 0).unwrap()
        );
        assert_eq!(window.remaining_duration(&dt).unwrap(), Duration::from_millis(29_500));
    }

    #[test]
    fn test_overnight_remaining_and_end() {
        let window = TimeWindow::new(DaysOfWeek::ALL_DAYS, clock(22, 0), clock(7, 0));

        let evening = Local.with_ymd_and_hms(2025, 12, 26, 23, 0, 0).unwrap();
        assert_eq!(
            window.remaining_duration(&evening).unwrap(),
            Duration::from_secs(8 * 3600)
        );
        assert_eq!(
            window.ends_at(&evening).unwrap(),
            Local.with_ymd_and_hms(2025, 12, 27, 7, 0, 0).unwrap()
        );

        let morning = Local.with_ymd_and_hms(2025, 12, 27, 5, 30, 0).unwrap();
        assert_eq!(
            window.remaining_duration(&morning).unwrap(),
            Duration::from_secs(90 * 60)
        );
    }

    #[test]
    fn test_next_start_after() {
        let window = TimeWindow::new(DaysOfWeek::WEEKDAYS, clock(21, 0), clock(23, 0));

        // Thursday afternoon: opens this evening
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 15, 0, 0).unwrap();
        assert_eq!(
            window.next_start_after(&dt).unwrap(),
            Local.with_ymd_and_hms(2025, 12, 25, 21, 0, 0).unwrap()
        );

        // Friday at exactly 21:00: strictly after, so next Monday
        let dt = Local.with_ymd_and_hms(2025, 12, 26, 21, 0, 0).unwrap();
        assert_eq!(
            window.next_start_after(&dt).unwrap(),
            Local.with_ymd_and_hms(2025, 12, 29, 21, 0, 0).unwrap()
        );

        // A single-day window a week out
        let sundays = TimeWindow::new(
            DaysOfWeek::new(DaysOfWeek::SUNDAY),
            clock(8, 0),
            clock(9, 0),
        );
        let dt = Local.with_ymd_and_hms(2025, 12, 28, 10, 0, 0).unwrap();
        assert_eq!(
            sundays.next_start_after(&dt).unwrap(),
            Local.with_ymd_and_hms(2026, 1, 4, 8, 0, 0).unwrap()
        );

        let never = TimeWindow::new(DaysOfWeek::NONE, clock(8, 0), clock(9, 0));
        assert!(never.next_start_after(&dt).is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(30)), "30s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h 1m 1s");
    }

    #[test]
    fn test_format_clock_time() {
        let dt = Local.with_ymd_and_hms(2025, 12, 25, 14, 30, 45).unwrap();
        assert_eq!(format_clock_time(&dt), "14:30");
        assert_eq!(format_datetime_full(&dt), "2025-12-25 14:30:45");
    }

    #[test]
    fn test_days_display() {
        assert_eq!(DaysOfWeek::WEEKDAYS.to_string(), "weekdays");
        assert_eq!(DaysOfWeek::ALL_DAYS.to_string(), "every day");
        let custom = DaysOfWeek::new(DaysOfWeek::MONDAY | DaysOfWeek::WEDNESDAY);
        assert_eq!(custom.to_string(), "Mon,Wed");
    }

    #[test]
    fn test_parse_mock_time_format() {
        assert!(NaiveDateTime::parse_from_str("2025-12-25 14:30:00", MOCK_TIME_FORMAT).is_ok());

        for invalid in ["2025-12-25", "14:30:00", "2025-12-25T14:30:00", ""] {
            assert!(
                NaiveDateTime::parse_from_str(invalid, MOCK_TIME_FORMAT).is_err(),
                "Expected '{}' to fail parsing",
                invalid
            );
        }
    }

    #[test]
    fn test_now_consistency() {
        let t1 = now();
        std::thread::sleep(Duration::from_millis(20));
        let t2 = now();
        assert!(t2 > t1, "Time should advance forward");
        let _ = is_mock_time_active();
    }
}
