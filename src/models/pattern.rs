//! Availability pattern models.
//!
//! A [`Pattern`] is a named availability template: a weekly rule table
//! (recurring working windows per ISO weekday) plus a dated exception table
//! (holidays, downtime, overtime). Patterns are plain data; the
//! [`WorkingCalendar`](crate::calendar::WorkingCalendar) validates and
//! interprets them.
//!
//! # Time Model
//! All times are naive wall-clock times in facility local time. A window
//! whose `end` is at or before its `start` crosses midnight (overnight
//! shift); `00:00` as an end means end-of-day.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Seconds in a day; the exclusive upper bound of a within-day window.
pub(crate) const DAY_SECONDS: i64 = 86_400;

/// A within-day working window `[start, end)`.
///
/// `end <= start` denotes an overnight window whose tail continues on the
/// following day from `00:00` until `end`. An `end` of `00:00` with a
/// nonzero `start` means the window runs to midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    /// Window start (inclusive).
    pub start: NaiveTime,
    /// Window end (exclusive). `00:00` means midnight at the end of the day.
    pub end: NaiveTime,
}

impl DayWindow {
    /// Creates a new window.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether this window crosses midnight.
    ///
    /// `00:00` as an end is end-of-day, which is overnight only when the
    /// window starts later than `00:00`.
    pub fn is_overnight(&self) -> bool {
        if self.end == NaiveTime::MIN {
            return self.start != NaiveTime::MIN;
        }
        self.end < self.start
    }

    /// Start as seconds from midnight.
    #[inline]
    pub(crate) fn start_seconds(&self) -> i64 {
        i64::from(self.start.num_seconds_from_midnight())
    }

    /// End as seconds from midnight, mapping `00:00` to end-of-day.
    #[inline]
    pub(crate) fn end_seconds(&self) -> i64 {
        if self.end == NaiveTime::MIN && self.start != NaiveTime::MIN {
            DAY_SECONDS
        } else {
            i64::from(self.end.num_seconds_from_midnight())
        }
    }

    /// Total working seconds covered, counting the overnight tail.
    pub(crate) fn total_seconds(&self) -> i64 {
        if self.is_overnight() {
            (DAY_SECONDS - self.start_seconds()) + i64::from(self.end.num_seconds_from_midnight())
        } else {
            self.end_seconds() - self.start_seconds()
        }
    }
}

/// A dated override of the weekly rules.
///
/// - `is_working = false` with no window removes the entire day.
/// - `is_working = false` with a window removes that window from the day.
/// - `is_working = true` with a window adds a working window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateException {
    /// Whether the exception adds (`true`) or removes (`false`) working time.
    pub is_working: bool,
    /// Affected window. Required when `is_working` is `true`.
    pub window: Option<DayWindow>,
}

impl DateException {
    /// Removes the entire day (holiday, full closure).
    pub fn closed_day() -> Self {
        Self {
            is_working: false,
            window: None,
        }
    }

    /// Removes a window from the day (maintenance, partial downtime).
    pub fn downtime(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            is_working: false,
            window: Some(DayWindow::new(start, end)),
        }
    }

    /// Adds a working window to the day (overtime, extra shift).
    pub fn overtime(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            is_working: true,
            window: Some(DayWindow::new(start, end)),
        }
    }
}

/// A named availability template: weekly rules plus dated exceptions.
///
/// Weekdays use ISO numbering, 1 = Monday through 7 = Sunday. A weekday with
/// no rule is non-working.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use timegrid::models::Pattern;
///
/// let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
/// let pattern = Pattern::new("line-1")
///     .with_shift(1, hm(8, 0), hm(17, 0))
///     .with_shift(2, hm(8, 0), hm(17, 0))
///     .with_closure(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap());
/// assert_eq!(pattern.rules.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Pattern identifier.
    pub id: String,
    /// Weekly rules: ISO weekday (1-7) to ordered working windows.
    pub rules: BTreeMap<u8, Vec<DayWindow>>,
    /// Dated exceptions, keyed by calendar date.
    pub exceptions: BTreeMap<NaiveDate, Vec<DateException>>,
}

impl Pattern {
    /// Creates an empty pattern (every day non-working).
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: BTreeMap::new(),
            exceptions: BTreeMap::new(),
        }
    }

    /// Adds a recurring working window on an ISO weekday (1 = Monday).
    pub fn with_shift(mut self, day_of_week: u8, start: NaiveTime, end: NaiveTime) -> Self {
        self.rules
            .entry(day_of_week)
            .or_default()
            .push(DayWindow::new(start, end));
        self
    }

    /// Adds a dated exception entry.
    pub fn with_exception(mut self, date: NaiveDate, exception: DateException) -> Self {
        self.exceptions.entry(date).or_default().push(exception);
        self
    }

    /// Marks a date fully non-working.
    pub fn with_closure(self, date: NaiveDate) -> Self {
        self.with_exception(date, DateException::closed_day())
    }

    /// Removes a window from a specific date.
    pub fn with_downtime(self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        self.with_exception(date, DateException::downtime(start, end))
    }

    /// Adds a working window to a specific date.
    pub fn with_overtime(self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        self.with_exception(date, DateException::overtime(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_overnight_detection() {
        assert!(!DayWindow::new(hm(8, 0), hm(17, 0)).is_overnight());
        assert!(DayWindow::new(hm(22, 0), hm(6, 0)).is_overnight());
        // End-of-day midnight is overnight when the start is later than 00:00
        assert!(DayWindow::new(hm(22, 0), hm(0, 0)).is_overnight());
        assert!(!DayWindow::new(hm(0, 0), hm(0, 0)).is_overnight());
    }

    #[test]
    fn test_window_seconds() {
        let w = DayWindow::new(hm(8, 0), hm(17, 0));
        assert_eq!(w.start_seconds(), 8 * 3600);
        assert_eq!(w.end_seconds(), 17 * 3600);
        assert_eq!(w.total_seconds(), 9 * 3600);

        let to_midnight = DayWindow::new(hm(22, 0), hm(0, 0));
        assert_eq!(to_midnight.end_seconds(), DAY_SECONDS);
        assert_eq!(to_midnight.total_seconds(), 2 * 3600);

        let overnight = DayWindow::new(hm(22, 0), hm(6, 0));
        assert_eq!(overnight.total_seconds(), 8 * 3600);
    }

    #[test]
    fn test_pattern_builder() {
        let p = Pattern::new("shop")
            .with_shift(1, hm(8, 0), hm(12, 0))
            .with_shift(1, hm(13, 0), hm(17, 0))
            .with_shift(6, hm(10, 0), hm(14, 0))
            .with_closure(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .with_overtime(
                NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
                hm(10, 0),
                hm(14, 0),
            );

        assert_eq!(p.id, "shop");
        assert_eq!(p.rules[&1].len(), 2);
        assert_eq!(p.rules[&6].len(), 1);
        assert_eq!(p.exceptions.len(), 2);
    }

    #[test]
    fn test_exception_constructors() {
        let closed = DateException::closed_day();
        assert!(!closed.is_working);
        assert!(closed.window.is_none());

        let down = DateException::downtime(hm(10, 0), hm(12, 0));
        assert!(!down.is_working);
        assert!(down.window.is_some());

        let over = DateException::overtime(hm(18, 0), hm(20, 0));
        assert!(over.is_working);
    }

    #[test]
    fn test_pattern_serde_roundtrip() {
        let p = Pattern::new("serde")
            .with_shift(1, hm(8, 0), hm(17, 0))
            .with_closure(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let json = serde_json::to_string(&p).unwrap();
        let back: Pattern = serde_json::from_str(&json).unwrap();
        assert_eq!(p, back);
    }
}
