//! Working calendar: day-period resolution and lazy time walks.
//!
//! A [`WorkingCalendar`] interprets a [`Pattern`] and answers time
//! arithmetic over working time without materialising any horizon. Queries
//! walk day by day on demand, so a calendar is valid for any date range.
//!
//! # Day-period resolution
//!
//! The periods of a date compose from three sources, in order:
//! 1. The weekly rule windows for that weekday, with overnight windows
//!    contributing only their same-day portion.
//! 2. The overnight tail of the previous weekday's rules, landing at the
//!    start of the date.
//! 3. Dated exceptions: a full-day removal discards all base periods, a
//!    windowed removal subtracts its window (splitting periods as needed),
//!    and a working exception inserts its window, merging with adjacent
//!    periods.
//!
//! The resolver is the single source of truth for "what is working on this
//! day"; the walks and the capacity engine's materialisation both consume
//! it, which is what keeps the datetime and integer layers consistent.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 2.3
//! (machine availability constraints)

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{Error, InfeasibleReason, Result};
use crate::models::{DateException, DayWindow, Pattern, DAY_SECONDS};
use crate::resolution::TimeResolution;
use crate::validation::validate_pattern;

/// Within-day period as seconds from midnight, half-open, end up to 86400.
type SecondsPeriod = (i64, i64);

/// A validated, immutable working calendar.
///
/// Construction consumes a [`Pattern`] and rejects structurally invalid
/// rules and exceptions up front, so every query afterwards is total.
///
/// # Examples
///
/// ```
/// use chrono::{NaiveDate, NaiveTime};
/// use timegrid::{Pattern, WorkingCalendar, MINUTE};
///
/// let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
/// let mut pattern = Pattern::new("line-1");
/// for day in 1..=5 {
///     pattern = pattern.with_shift(day, hm(8, 0), hm(17, 0));
/// }
/// let cal = WorkingCalendar::new(pattern).unwrap();
///
/// let mon_9 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let mon_10 = cal.add_units(mon_9, 60, MINUTE).unwrap();
/// assert_eq!(mon_10, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct WorkingCalendar {
    pattern_id: String,
    /// Rule windows per weekday, index 0 = Monday, sorted by start.
    rules: [Vec<DayWindow>; 7],
    exceptions: BTreeMap<NaiveDate, Vec<DateException>>,
    /// Working seconds in one rule week, overnight tails included.
    weekly_seconds: i64,
    /// First and last dates carrying a working exception window.
    first_added: Option<NaiveDate>,
    last_added: Option<NaiveDate>,
}

impl WorkingCalendar {
    /// Builds a calendar from a pattern, validating it completely.
    ///
    /// Beyond the structural checks of
    /// [`validate_pattern`](crate::validation::validate_pattern), this
    /// rejects overnight tails that collide with the next weekday's windows
    /// and working exceptions whose window overlaps the composed base
    /// periods of their date.
    pub fn new(pattern: Pattern) -> Result<Self> {
        validate_pattern(&pattern).map_err(Error::from)?;

        let mut rules: [Vec<DayWindow>; 7] = Default::default();
        for (&day, windows) in &pattern.rules {
            let mut sorted = windows.clone();
            sorted.sort_by_key(DayWindow::start_seconds);
            rules[usize::from(day) - 1] = sorted;
        }

        let weekly_seconds = rules
            .iter()
            .flatten()
            .map(DayWindow::total_seconds)
            .sum();

        let working_dates: Vec<NaiveDate> = pattern
            .exceptions
            .iter()
            .filter(|(_, entries)| entries.iter().any(|e| e.is_working))
            .map(|(&d, _)| d)
            .collect();

        let calendar = Self {
            pattern_id: pattern.id,
            rules,
            exceptions: pattern.exceptions,
            weekly_seconds,
            first_added: working_dates.first().copied(),
            last_added: working_dates.last().copied(),
        };

        calendar.check_overnight_tails()?;
        for (&date, entries) in &calendar.exceptions {
            calendar.check_exception_day(date, entries)?;
        }
        Ok(calendar)
    }

    /// Pattern identifier this calendar was built from.
    pub fn pattern_id(&self) -> &str {
        &self.pattern_id
    }

    /// Working periods for a date as datetime pairs within
    /// `[date 00:00, date+1 00:00]`, sorted and non-overlapping.
    pub fn periods_for_date(&self, date: NaiveDate) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let midnight = date.and_time(NaiveTime::MIN);
        self.resolve_day(date)
            .into_iter()
            .map(|(s, e)| (midnight + Duration::seconds(s), midnight + Duration::seconds(e)))
            .collect()
    }

    /// Whether a datetime falls inside a working period.
    pub fn is_working_at(&self, dt: NaiveDateTime) -> bool {
        self.periods_for_date(dt.date())
            .iter()
            .any(|&(s, e)| s <= dt && dt < e)
    }

    /// Forward walk: the datetime reached after `units` of working time.
    ///
    /// Starts mid-period if `start` lies inside one, otherwise advances to
    /// the next working edge. Fails with [`Error::Infeasible`] when the
    /// calendar has no weekly working time and the walk runs past its last
    /// working exception.
    pub fn add_units(
        &self,
        start: NaiveDateTime,
        units: i64,
        resolution: TimeResolution,
    ) -> Result<NaiveDateTime> {
        if units < 0 {
            return Err(Error::InvalidOperation(format!(
                "cannot walk {units} units; counts must be non-negative"
            )));
        }
        if units == 0 {
            return Ok(start);
        }

        let mut remaining = units;
        let mut date = start.date();
        let mut cursor = start;

        loop {
            self.guard_forward(date, remaining, units)?;
            for (iv_start, iv_end) in self.periods_for_date(date) {
                if iv_end <= cursor {
                    continue;
                }
                let effective = if iv_start > cursor { iv_start } else { cursor };
                let available = resolution.units_in(iv_end - effective);
                if available <= 0 {
                    continue;
                }
                if remaining <= available {
                    return Ok(effective + Duration::seconds(remaining * resolution.unit_seconds));
                }
                remaining -= available;
                cursor = iv_end;
            }
            date += Duration::days(1);
            cursor = date.and_time(NaiveTime::MIN);
        }
    }

    /// Backward walk: the datetime from which `units` of working time end
    /// exactly at `end`.
    pub fn subtract_units(
        &self,
        end: NaiveDateTime,
        units: i64,
        resolution: TimeResolution,
    ) -> Result<NaiveDateTime> {
        if units < 0 {
            return Err(Error::InvalidOperation(format!(
                "cannot walk {units} units; counts must be non-negative"
            )));
        }
        if units == 0 {
            return Ok(end);
        }

        let mut remaining = units;
        let mut date = end.date();
        let mut cursor = end;

        loop {
            self.guard_backward(date, remaining, units)?;
            for (iv_start, iv_end) in self.periods_for_date(date).into_iter().rev() {
                if iv_start >= cursor {
                    continue;
                }
                let effective = if iv_end < cursor { iv_end } else { cursor };
                let available = resolution.units_in(effective - iv_start);
                if available <= 0 {
                    continue;
                }
                if remaining <= available {
                    return Ok(effective - Duration::seconds(remaining * resolution.unit_seconds));
                }
                remaining -= available;
                cursor = iv_start;
            }
            date -= Duration::days(1);
            cursor = (date + Duration::days(1)).and_time(NaiveTime::MIN);
        }
    }

    /// Working units inside `[from, to)`. Returns 0 when `from >= to`.
    pub fn working_units_between(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
        resolution: TimeResolution,
    ) -> i64 {
        self.working_intervals_in_range(from, to)
            .map(|(s, e)| resolution.units_in(e - s))
            .sum()
    }

    /// Lazily yields each working period clipped to `[from, to)`, in order.
    pub fn working_intervals_in_range(
        &self,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> WorkingIntervals<'_> {
        WorkingIntervals {
            calendar: self,
            range_start: from,
            range_end: to,
            date: from.date(),
            today: Vec::new().into_iter(),
            exhausted: from >= to,
        }
    }

    /// Working units in one rule week at the given resolution.
    ///
    /// Drives the engine's horizon-extension feasibility bound; zero means
    /// all working time comes from dated exceptions.
    pub fn weekly_working_units(&self, resolution: TimeResolution) -> i64 {
        self.weekly_seconds / resolution.unit_seconds
    }

    /// Last date on which an exception adds working time, if any.
    pub(crate) fn last_working_exception_date(&self) -> Option<NaiveDate> {
        self.last_added
    }

    // ── resolver internals ──────────────────────────────────────────

    /// Base periods of a date from weekly rules plus the previous day's
    /// overnight tail, in seconds from midnight.
    fn day_from_rules(&self, date: NaiveDate) -> Vec<SecondsPeriod> {
        let mut periods: Vec<SecondsPeriod> = Vec::new();

        for w in &self.rules[weekday_index(date)] {
            if w.is_overnight() {
                periods.push((w.start_seconds(), DAY_SECONDS));
            } else {
                periods.push((w.start_seconds(), w.end_seconds()));
            }
        }

        let previous = date - Duration::days(1);
        for w in &self.rules[weekday_index(previous)] {
            if w.is_overnight() {
                let tail_end = i64::from(w.end.num_seconds_from_midnight());
                if tail_end > 0 {
                    periods.push((0, tail_end));
                }
            }
        }

        periods.sort_unstable();
        periods
    }

    /// Full resolution for a date: rules, tails, then exceptions.
    fn resolve_day(&self, date: NaiveDate) -> Vec<SecondsPeriod> {
        match self.exceptions.get(&date) {
            None => self.day_from_rules(date),
            Some(entries) => self.apply_exceptions(date, entries),
        }
    }

    fn apply_exceptions(&self, date: NaiveDate, entries: &[DateException]) -> Vec<SecondsPeriod> {
        let full_removal = entries
            .iter()
            .any(|e| !e.is_working && e.window.is_none());

        let mut periods = if full_removal {
            Vec::new()
        } else {
            let mut base = self.day_from_rules(date);
            for entry in entries {
                if let (false, Some(w)) = (entry.is_working, &entry.window) {
                    base = subtract_period(base, (w.start_seconds(), w.end_seconds()));
                }
            }
            base
        };

        for entry in entries {
            if let (true, Some(w)) = (entry.is_working, &entry.window) {
                insert_period(&mut periods, (w.start_seconds(), w.end_seconds()));
            }
        }
        periods
    }

    /// Construction-time check: a working exception window must not overlap
    /// the composed periods of its date.
    fn check_exception_day(&self, date: NaiveDate, entries: &[DateException]) -> Result<()> {
        let full_removal = entries
            .iter()
            .any(|e| !e.is_working && e.window.is_none());

        let mut periods = if full_removal {
            Vec::new()
        } else {
            let mut base = self.day_from_rules(date);
            for entry in entries {
                if let (false, Some(w)) = (entry.is_working, &entry.window) {
                    base = subtract_period(base, (w.start_seconds(), w.end_seconds()));
                }
            }
            base
        };

        for entry in entries {
            if let (true, Some(w)) = (entry.is_working, &entry.window) {
                let (start, end) = (w.start_seconds(), w.end_seconds());
                if periods.iter().any(|&(s, e)| s < end && start < e) {
                    return Err(Error::InvalidException(format!(
                        "pattern '{}', {date}: added window {}-{} overlaps an existing period",
                        self.pattern_id, w.start, w.end
                    )));
                }
                insert_period(&mut periods, (start, end));
            }
        }
        Ok(())
    }

    /// Construction-time check: an overnight tail must not collide with the
    /// following weekday's own windows.
    fn check_overnight_tails(&self) -> Result<()> {
        for prev in 0..7 {
            let day = (prev + 1) % 7;
            for w in &self.rules[prev] {
                if !w.is_overnight() {
                    continue;
                }
                let tail_end = i64::from(w.end.num_seconds_from_midnight());
                if tail_end == 0 {
                    continue;
                }
                if self.rules[day]
                    .iter()
                    .any(|n| n.start_seconds() < tail_end)
                {
                    return Err(Error::InvalidRule(format!(
                        "pattern '{}': overnight tail of weekday {} overlaps weekday {} windows",
                        self.pattern_id,
                        prev + 1,
                        day + 1
                    )));
                }
            }
        }
        Ok(())
    }

    // ── walk termination guards ─────────────────────────────────────

    fn guard_forward(&self, date: NaiveDate, remaining: i64, requested: i64) -> Result<()> {
        if self.weekly_seconds > 0 {
            return Ok(());
        }
        match self.last_added {
            Some(last) if date <= last => Ok(()),
            _ => Err(self.infeasible(remaining, requested)),
        }
    }

    fn guard_backward(&self, date: NaiveDate, remaining: i64, requested: i64) -> Result<()> {
        if self.weekly_seconds > 0 {
            return Ok(());
        }
        match self.first_added {
            Some(first) if date >= first => Ok(()),
            _ => Err(self.infeasible(remaining, requested)),
        }
    }

    fn infeasible(&self, remaining: i64, requested: i64) -> Error {
        Error::Infeasible {
            operation_id: self.pattern_id.clone(),
            work_units_remaining: remaining,
            work_units_requested: requested,
            reason: InfeasibleReason::Horizon,
        }
    }
}

fn weekday_index(date: NaiveDate) -> usize {
    date.weekday().num_days_from_monday() as usize
}

/// Removes `[start, end)` from each period, splitting where needed.
fn subtract_period(periods: Vec<SecondsPeriod>, removal: SecondsPeriod) -> Vec<SecondsPeriod> {
    let (rs, re) = removal;
    let mut result = Vec::with_capacity(periods.len() + 1);
    for (s, e) in periods {
        if e <= rs || re <= s {
            result.push((s, e));
            continue;
        }
        if s < rs {
            result.push((s, rs));
        }
        if re < e {
            result.push((re, e));
        }
    }
    result
}

/// Inserts a period, merging with any adjacent or overlapping neighbours.
fn insert_period(periods: &mut Vec<SecondsPeriod>, addition: SecondsPeriod) {
    periods.push(addition);
    periods.sort_unstable();
    let mut merged: Vec<SecondsPeriod> = Vec::with_capacity(periods.len());
    for &(s, e) in periods.iter() {
        match merged.last_mut() {
            Some(last) if s <= last.1 => last.1 = last.1.max(e),
            _ => merged.push((s, e)),
        }
    }
    *periods = merged;
}

/// Lazy iterator over working periods clipped to a query range.
///
/// Finite and non-restartable; days are resolved on demand, so the range
/// bounds the work, not any pre-built horizon.
pub struct WorkingIntervals<'a> {
    calendar: &'a WorkingCalendar,
    range_start: NaiveDateTime,
    range_end: NaiveDateTime,
    date: NaiveDate,
    today: std::vec::IntoIter<(NaiveDateTime, NaiveDateTime)>,
    exhausted: bool,
}

impl Iterator for WorkingIntervals<'_> {
    type Item = (NaiveDateTime, NaiveDateTime);

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        loop {
            if let Some((s, e)) = self.today.next() {
                let start = if s > self.range_start { s } else { self.range_start };
                let end = if e < self.range_end { e } else { self.range_end };
                if start < end {
                    return Some((start, end));
                }
                continue;
            }
            if self.date > self.range_end.date() {
                self.exhausted = true;
                return None;
            }
            self.today = self.calendar.periods_for_date(self.date).into_iter();
            self.date += Duration::days(1);
        }
    }
}
