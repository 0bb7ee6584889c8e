//! Clock & Calendar — wall-clock time in the policy timezone, weekday
//! classification, and window arithmetic.
//!
//! All window math happens on the *local* calendar date in the configured
//! policy timezone, never on UTC offsets directly, so DST transitions are
//! handled by the tz database instead of hand-rolled offset tables.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::CalendarError;

/// A non-negative offset, always interpreted as a duration, never a wall
/// time. Zero is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Duration {
    pub hours: u32,
    pub minutes: u32,
}

impl Duration {
    pub fn new(hours: u32, minutes: u32) -> Self {
        Self { hours, minutes }
    }

    pub fn zero() -> Self {
        Self { hours: 0, minutes: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.hours == 0 && self.minutes == 0
    }

    fn as_chrono(&self) -> ChronoDuration {
        ChronoDuration::minutes(i64::from(self.hours) * 60 + i64::from(self.minutes))
    }
}

/// A day-selector token, matched against a given instant's *local* weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DaySelector {
    Everyday,
    Weekday,
    Weekend,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl FromStr for DaySelector {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "everyday" => DaySelector::Everyday,
            "weekday" => DaySelector::Weekday,
            "weekend" => DaySelector::Weekend,
            "monday" | "mon" => DaySelector::Monday,
            "tuesday" | "tue" => DaySelector::Tuesday,
            "wednesday" | "wed" => DaySelector::Wednesday,
            "thursday" | "thu" => DaySelector::Thursday,
            "friday" | "fri" => DaySelector::Friday,
            "saturday" | "sat" => DaySelector::Saturday,
            "sunday" | "sun" => DaySelector::Sunday,
            _ => return Err(()),
        })
    }
}

impl DaySelector {
    /// Whether this selector matches the given weekday.
    pub fn matches(&self, weekday: Weekday) -> bool {
        use Weekday::*;
        match self {
            DaySelector::Everyday => true,
            DaySelector::Weekday => !matches!(weekday, Sat | Sun),
            DaySelector::Weekend => matches!(weekday, Sat | Sun),
            DaySelector::Monday => weekday == Mon,
            DaySelector::Tuesday => weekday == Tue,
            DaySelector::Wednesday => weekday == Wed,
            DaySelector::Thursday => weekday == Thu,
            DaySelector::Friday => weekday == Fri,
            DaySelector::Saturday => weekday == Sat,
            DaySelector::Sunday => weekday == Sun,
        }
    }
}

/// A recurring time interval: start-of-day time, total length, and the set
/// of days it recurs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start_hour: u32,
    pub start_minute: u32,
    pub duration: Duration,
    pub days: BTreeSet<DaySelector>,
}

impl Window {
    /// Parse a `"HH:MM"` string. Round-trips exactly with [`Window::format_start`].
    pub fn parse_start(s: &str) -> Option<(u32, u32)> {
        let (h, m) = s.split_once(':')?;
        let h: u32 = h.parse().ok()?;
        let m: u32 = m.parse().ok()?;
        if h > 23 || m > 59 {
            return None;
        }
        Some((h, m))
    }

    /// Format as `"HH:MM"`, zero-padded.
    pub fn format_start(hour: u32, minute: u32) -> String {
        format!("{:02}:{:02}", hour, minute)
    }

    /// Whether this window is active at instant `t` (in the policy
    /// timezone). A zero-duration window is never active. Day-selector
    /// matching applies to the window's *start* calendar date.
    pub fn is_active_at(&self, t: DateTime<Tz>) -> bool {
        if self.duration.is_zero() {
            return false;
        }
        if self.days.is_empty() {
            return false;
        }

        let tz = t.timezone();
        let local_date = t.date_naive();
        let start_naive_time = NaiveTime::from_hms_opt(self.start_hour, self.start_minute, 0)
            .expect("validated at ingestion: start_hour < 24, start_minute < 60");

        // Form the local wall-clock start on t's date, then on the day
        // before it (a window starting late yesterday may still be active
        // now if it crosses midnight).
        for days_back in [0i64, 1] {
            let candidate_date = local_date - ChronoDuration::days(days_back);
            let naive_start = candidate_date.and_time(start_naive_time);
            let begin = match tz.from_local_datetime(&naive_start).earliest() {
                Some(dt) => dt,
                None => continue, // start falls in a skipped DST hour
            };
            let end = begin + self.duration.as_chrono();

            if t >= begin && t < end {
                let candidate_weekday = candidate_date.weekday();
                if self.days.iter().any(|sel| sel.matches(candidate_weekday)) {
                    return true;
                }
            }
        }
        false
    }
}

/// Abstraction over "now", so tests can inject a fixed instant instead of
/// reading the system clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// Production clock: reads the system time and localizes it to the
/// configured policy timezone.
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        chrono::Utc::now().with_timezone(&self.tz)
    }
}

/// A clock that always returns a fixed instant — used in tests to assert
/// window-boundary behavior deterministically.
pub struct FixedClock(pub DateTime<Tz>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.0
    }
}

/// Parse an IANA timezone name (e.g. `"US/Central"`). Fatal at startup if
/// it fails.
pub fn parse_policy_timezone(name: &str) -> Result<Tz, CalendarError> {
    Tz::from_str(name).map_err(|_| CalendarError::UnknownTimezone(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn central() -> Tz {
        Tz::US__Central
    }

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        central()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn start_time_round_trips() {
        for h in 0..24u32 {
            for m in 0..60u32 {
                let s = Window::format_start(h, m);
                let (ph, pm) = Window::parse_start(&s).unwrap();
                assert_eq!((h, m), (ph, pm));
            }
        }
    }

    #[test]
    fn half_open_boundary() {
        let w = Window {
            start_hour: 9,
            start_minute: 0,
            duration: Duration::new(1, 0),
            days: [DaySelector::Weekday].into_iter().collect(),
        };
        // Tuesday 2026-07-28 is a weekday.
        assert!(w.is_active_at(dt(2026, 7, 28, 9, 0)));
        assert!(!w.is_active_at(dt(2026, 7, 28, 10, 0)));
        assert!(w.is_active_at(dt(2026, 7, 28, 9, 59)));
    }

    #[test]
    fn zero_duration_never_active() {
        let w = Window {
            start_hour: 9,
            start_minute: 0,
            duration: Duration::zero(),
            days: [DaySelector::Everyday].into_iter().collect(),
        };
        assert!(!w.is_active_at(dt(2026, 7, 28, 9, 0)));
    }

    #[test]
    fn wrong_day_never_active() {
        let w = Window {
            start_hour: 9,
            start_minute: 0,
            duration: Duration::new(1, 0),
            days: [DaySelector::Weekday].into_iter().collect(),
        };
        // 2026-08-01 is a Saturday.
        assert!(!w.is_active_at(dt(2026, 8, 1, 9, 30)));
    }

    #[test]
    fn midnight_crossing_window_spans_two_dates() {
        let w = Window {
            start_hour: 23,
            start_minute: 30,
            duration: Duration::new(1, 0),
            days: [DaySelector::Everyday].into_iter().collect(),
        };
        assert!(w.is_active_at(dt(2026, 7, 28, 23, 45)));
        assert!(w.is_active_at(dt(2026, 7, 29, 0, 15)));
        assert!(!w.is_active_at(dt(2026, 7, 29, 0, 30)));
    }
}
