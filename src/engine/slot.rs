//! Read-only slot finding.
//!
//! # Algorithm
//!
//! 1. Position a cursor at the later of `earliest_start` and the horizon
//!    begin, then scan forward over the bit vector.
//! 2. Measure each maximal contiguous free run. A non-splittable request
//!    skips runs shorter than the remaining work (it waits for one
//!    contiguous window); a splittable request skips runs shorter than
//!    `min_split` and otherwise consumes greedily.
//! 3. Past the current horizon the engine auto-extends from its calendar,
//!    bounded by the deadline or by a feasibility lookahead proportional
//!    to the requested work.
//!
//! Finding never changes an existing bit and never touches the allocation
//! index, so callers can probe speculatively for free.

use crate::error::{Error, InfeasibleReason, Result};
use crate::models::{AllocationRecord, Span};

use super::CapacityEngine;

/// Extra lookahead weeks granted beyond the proportional estimate.
const LOOKAHEAD_SLACK_WEEKS: i64 = 2;

/// Parameters of one slot search.
///
/// # Examples
///
/// ```
/// use timegrid::SlotRequest;
///
/// let plain = SlotRequest::new("OP-1", 540, 120);
/// let split = SlotRequest::new("OP-2", 540, 120).splittable(30);
/// let bounded = SlotRequest::new("OP-3", 540, 120).with_deadline(2880);
/// assert!(!plain.allow_split);
/// assert!(split.allow_split);
/// assert_eq!(bounded.deadline, Some(2880));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRequest {
    /// Operation asking for capacity.
    pub operation_id: String,
    /// Earliest acceptable unit (absolute). Clamped to the horizon begin.
    pub earliest_start: i64,
    /// Units of work to place.
    pub work_units: i64,
    /// Whether the work may split across non-contiguous free runs.
    pub allow_split: bool,
    /// Smallest usable fragment when splitting.
    pub min_split: i64,
    /// Absolute unit all spans must end by, if any.
    pub deadline: Option<i64>,
}

impl SlotRequest {
    /// Creates a non-splittable request.
    pub fn new(operation_id: impl Into<String>, earliest_start: i64, work_units: i64) -> Self {
        Self {
            operation_id: operation_id.into(),
            earliest_start,
            work_units,
            allow_split: false,
            min_split: 1,
            deadline: None,
        }
    }

    /// Allows splitting into fragments of at least `min_split` units.
    pub fn splittable(mut self, min_split: i64) -> Self {
        self.allow_split = true;
        self.min_split = min_split;
        self
    }

    /// Requires all work to end before `deadline`.
    pub fn with_deadline(mut self, deadline: i64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.work_units < 1 {
            return Err(Error::InvalidOperation(format!(
                "work_units must be at least 1, got {}",
                self.work_units
            )));
        }
        if self.min_split < 1 {
            return Err(Error::InvalidOperation(format!(
                "min_split must be at least 1, got {}",
                self.min_split
            )));
        }
        if let Some(deadline) = self.deadline {
            if deadline <= self.earliest_start {
                return Err(Error::InvalidOperation(format!(
                    "deadline {deadline} is not after earliest start {}",
                    self.earliest_start
                )));
            }
        }
        Ok(())
    }
}

impl CapacityEngine {
    /// Finds the earliest slot satisfying a request, without occupying it.
    ///
    /// Returns a candidate [`AllocationRecord`]; nothing is held until
    /// [`commit`](CapacityEngine::commit). The search may grow the horizon
    /// from the calendar but never changes an existing bit or the
    /// allocation index.
    pub fn find_slot(&mut self, request: &SlotRequest) -> Result<AllocationRecord> {
        request.validate()?;

        let start_pos = request.earliest_start.max(self.horizon_begin());
        let (hard_limit, reason) = match request.deadline {
            Some(deadline) => (deadline, InfeasibleReason::Deadline),
            None => (
                self.lookahead_limit(start_pos, request)?,
                InfeasibleReason::Horizon,
            ),
        };

        let mut remaining = request.work_units;
        let mut spans: Vec<Span> = Vec::new();
        let mut p = start_pos;

        while remaining > 0 {
            if p >= hard_limit {
                return Err(self.infeasible(request, remaining, reason));
            }
            if p >= self.horizon_end() {
                self.extend_to(p + 1)?;
            }
            let scan_end = self.horizon_end().min(hard_limit);

            // Skip occupied and non-working units
            while p < scan_end && !self.bit(p) {
                p += 1;
            }
            if p >= scan_end {
                if scan_end >= hard_limit {
                    return Err(self.infeasible(request, remaining, reason));
                }
                continue; // grow the horizon and keep scanning
            }

            // Measure the maximal free run starting at p
            let mut q = p;
            while q < scan_end && self.bit(q) {
                q += 1;
            }
            if q == self.horizon_end() && q < hard_limit {
                // The run may continue past the current horizon
                self.extend_to(q + 1)?;
                continue;
            }

            let run_len = q - p;
            if !request.allow_split && run_len < remaining {
                p = q;
                continue;
            }
            if request.allow_split && run_len < request.min_split {
                p = q;
                continue;
            }

            let take = run_len.min(remaining);
            spans.push(Span::new(p, p + take));
            remaining -= take;
            p += take;
        }

        Ok(AllocationRecord {
            operation_id: request.operation_id.clone(),
            resource_id: self.resource_id().to_string(),
            start: spans[0].begin,
            finish: spans[spans.len() - 1].end,
            work_units: request.work_units,
            allow_split: request.allow_split,
            spans,
        })
    }

    /// Finds and commits in one step.
    pub fn allocate(&mut self, request: &SlotRequest) -> Result<AllocationRecord> {
        let record = self.find_slot(request)?;
        self.commit(&record)?;
        Ok(record)
    }

    /// Absolute unit past which an unbounded search gives up.
    ///
    /// With weekly working time, allows the proportional number of rule
    /// weeks plus slack past the scan origin and the committed horizon; a
    /// clean week past the horizon holds the weekly maximum contiguous run,
    /// so the slack also settles non-splittable requests that can never
    /// fit. Without weekly working time the last working exception bounds
    /// the search.
    fn lookahead_limit(&self, start_pos: i64, request: &SlotRequest) -> Result<i64> {
        let weekly = self.calendar().weekly_working_units(self.resolution());
        if weekly > 0 {
            let week_units = 7 * self.resolution().day_units();
            let weeks = request.work_units / weekly + LOOKAHEAD_SLACK_WEEKS;
            return Ok(start_pos.max(self.horizon_end()) + weeks * week_units);
        }
        match self.calendar().last_working_exception_date() {
            Some(last) => {
                let end_of_last = (last + chrono::Duration::days(1))
                    .and_time(chrono::NaiveTime::MIN);
                let delta = (end_of_last - self.epoch()).num_seconds();
                let unit = self.resolution().unit_seconds;
                // Round up so the whole final exception window stays in reach
                let limit = delta.div_euclid(unit) + i64::from(delta.rem_euclid(unit) != 0);
                Ok(limit)
            }
            None => Err(self.infeasible(request, request.work_units, InfeasibleReason::Horizon)),
        }
    }

    fn infeasible(&self, request: &SlotRequest, remaining: i64, reason: InfeasibleReason) -> Error {
        Error::Infeasible {
            operation_id: request.operation_id.clone(),
            work_units_remaining: remaining,
            work_units_requested: request.work_units,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{dt, hm, shop_engine};
    use super::*;
    use crate::calendar::WorkingCalendar;
    use crate::models::Pattern;
    use crate::resolution::MINUTE;
    use chrono::NaiveDate;
    use std::sync::Arc;

    #[test]
    fn test_contiguous_slot() {
        let mut engine = shop_engine();
        let record = engine.find_slot(&SlotRequest::new("OP-A", 540, 120)).unwrap();
        assert_eq!(record.start, 540);
        assert_eq!(record.finish, 660);
        assert_eq!(record.spans, vec![Span::new(540, 660)]);
        assert_eq!(record.work_units, 120);
        assert!(!record.allow_split);
    }

    #[test]
    fn test_earliest_start_in_non_working_time() {
        let mut engine = shop_engine();
        // Monday 00:00 is non-working; the slot starts at 08:00
        let record = engine.find_slot(&SlotRequest::new("OP", 0, 60)).unwrap();
        assert_eq!(record.start, 8 * 60);
    }

    #[test]
    fn test_earliest_start_before_horizon_clamped() {
        let mut engine = shop_engine();
        let record = engine.find_slot(&SlotRequest::new("OP", -500, 60)).unwrap();
        assert_eq!(record.start, 8 * 60);
    }

    #[test]
    fn test_splittable_across_holiday() {
        let mut engine = shop_engine();
        // Mon 16:30 leaves 30 free minutes; Tue is closed; rest on Wed
        let record = engine
            .find_slot(&SlotRequest::new("OP-B", 990, 60).splittable(1))
            .unwrap();
        assert_eq!(
            record.spans,
            vec![Span::new(990, 1020), Span::new(2 * 1440 + 480, 2 * 1440 + 510)]
        );
        assert_eq!(record.start, 990);
        assert_eq!(record.finish, 2 * 1440 + 510);
        assert_eq!(record.wall_time(), 2 * 1440 + 510 - 990);
        assert!(record.allow_split);
    }

    #[test]
    fn test_non_splittable_waits_for_large_run() {
        let mut engine = shop_engine();
        // Occupy most of Monday, leaving 30 free minutes at the end
        engine.allocate(&SlotRequest::new("FILL", 480, 510)).unwrap();
        // A 60-unit contiguous request must wait for Wednesday
        let record = engine.find_slot(&SlotRequest::new("OP", 480, 60)).unwrap();
        assert_eq!(record.start, 2 * 1440 + 480);
        assert_eq!(record.spans.len(), 1);
    }

    #[test]
    fn test_min_split_skips_fragment() {
        let mut engine = shop_engine();
        engine.allocate(&SlotRequest::new("FILL", 480, 510)).unwrap();
        // The 30-minute Monday fragment is below min_split=45
        let record = engine
            .find_slot(&SlotRequest::new("OP", 480, 60).splittable(45))
            .unwrap();
        assert_eq!(record.spans, vec![Span::new(2 * 1440 + 480, 2 * 1440 + 540)]);
    }

    #[test]
    fn test_min_split_fragment_used_when_large_enough() {
        let mut engine = shop_engine();
        engine.allocate(&SlotRequest::new("FILL", 480, 510)).unwrap();
        let record = engine
            .find_slot(&SlotRequest::new("OP", 480, 60).splittable(30))
            .unwrap();
        assert_eq!(
            record.spans,
            vec![Span::new(990, 1020), Span::new(2 * 1440 + 480, 2 * 1440 + 510)]
        );
    }

    #[test]
    fn test_deadline_met() {
        let mut engine = shop_engine();
        let record = engine
            .find_slot(&SlotRequest::new("OP", 540, 120).with_deadline(1020))
            .unwrap();
        assert_eq!(record.finish, 660);
    }

    #[test]
    fn test_deadline_infeasible_contiguous() {
        let mut engine = shop_engine();
        // 120 contiguous units cannot end by Monday 10:00 starting at 09:30
        let result = engine.find_slot(&SlotRequest::new("OP", 570, 120).with_deadline(600));
        match result {
            Err(Error::Infeasible {
                operation_id,
                work_units_remaining,
                work_units_requested,
                reason,
            }) => {
                assert_eq!(operation_id, "OP");
                assert_eq!(work_units_remaining, 120);
                assert_eq!(work_units_requested, 120);
                assert_eq!(reason, InfeasibleReason::Deadline);
            }
            other => panic!("expected Infeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_deadline_infeasible_reports_remaining_for_split() {
        let mut engine = shop_engine();
        // Only Monday 16:30-17:00 fits before the deadline at Tuesday noon
        let result = engine.find_slot(
            &SlotRequest::new("OP", 990, 120)
                .splittable(1)
                .with_deadline(1440 + 720),
        );
        match result {
            Err(Error::Infeasible {
                work_units_remaining,
                ..
            }) => assert_eq!(work_units_remaining, 90),
            other => panic!("expected Infeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_find_slot_is_read_only() {
        let mut engine = shop_engine();
        let before = engine.snapshot();
        let free_before = engine.free_count();

        engine.find_slot(&SlotRequest::new("OP", 0, 240)).unwrap();
        assert_eq!(engine.free_count(), free_before);
        assert_eq!(engine.allocation_count(), 0);
        assert!(engine.restore(&before).is_ok());
    }

    #[test]
    fn test_search_extends_past_horizon() {
        let mut engine = shop_engine();
        // More work than the first week holds: forces extension
        let record = engine
            .find_slot(&SlotRequest::new("OP", 0, 3000).splittable(1))
            .unwrap();
        assert!(record.finish > 7 * 1440);
        assert!(engine.horizon_end() > 7 * 1440);
        let total: i64 = record.spans.iter().map(Span::len).sum();
        assert_eq!(total, 3000);
    }

    #[test]
    fn test_run_crossing_horizon_edge_stays_contiguous() {
        // Around-the-clock pattern: the free run crosses the horizon seam
        let mut pattern = Pattern::new("all-day");
        for day in 1..=7 {
            pattern = pattern
                .with_shift(day, hm(0, 0), hm(12, 0))
                .with_shift(day, hm(12, 0), hm(0, 0));
        }
        let calendar = Arc::new(WorkingCalendar::new(pattern).unwrap());
        let mut engine = CapacityEngine::from_calendar(
            calendar,
            dt(1, 0, 0),
            dt(2, 0, 0),
            dt(1, 0, 0),
            MINUTE,
        )
        .unwrap();

        // 2000 contiguous minutes only exist across the day boundary
        let record = engine.find_slot(&SlotRequest::new("OP", 0, 2000)).unwrap();
        assert_eq!(record.spans, vec![Span::new(0, 2000)]);
    }

    #[test]
    fn test_monotonic_finish_in_work_units() {
        let mut engine = shop_engine();
        let mut last_finish = 0;
        for units in [30, 60, 120, 480, 540, 600, 1000] {
            let record = engine
                .find_slot(&SlotRequest::new("OP", 540, units).splittable(1))
                .unwrap();
            assert!(
                record.finish >= last_finish,
                "finish regressed at {units} units"
            );
            last_finish = record.finish;
        }
    }

    #[test]
    fn test_infeasible_on_empty_calendar() {
        let calendar = Arc::new(WorkingCalendar::new(Pattern::new("void")).unwrap());
        let mut engine = CapacityEngine::from_calendar(
            calendar,
            dt(1, 0, 0),
            dt(8, 0, 0),
            dt(1, 0, 0),
            MINUTE,
        )
        .unwrap();
        let result = engine.find_slot(&SlotRequest::new("OP", 0, 1));
        match result {
            Err(Error::Infeasible { reason, .. }) => {
                assert_eq!(reason, InfeasibleReason::Horizon)
            }
            other => panic!("expected Infeasible, got {other:?}"),
        }
    }

    #[test]
    fn test_infeasible_past_last_exception() {
        // Working time only on one Saturday; asking for more must terminate
        let pattern = Pattern::new("sparse").with_overtime(
            NaiveDate::from_ymd_opt(2024, 1, 6).unwrap(),
            hm(10, 0),
            hm(14, 0),
        );
        let calendar = Arc::new(WorkingCalendar::new(pattern).unwrap());
        let mut engine = CapacityEngine::from_calendar(
            calendar,
            dt(1, 0, 0),
            dt(8, 0, 0),
            dt(1, 0, 0),
            MINUTE,
        )
        .unwrap();

        let fits = engine
            .find_slot(&SlotRequest::new("OP", 0, 240))
            .unwrap();
        assert_eq!(fits.start, 5 * 1440 + 600);

        let result = engine.find_slot(&SlotRequest::new("OP", 0, 241).splittable(1));
        assert!(matches!(
            result,
            Err(Error::Infeasible {
                reason: InfeasibleReason::Horizon,
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_contiguous_request_terminates() {
        let mut engine = shop_engine();
        // No 600-minute contiguous run ever exists in a 540-minute day
        let result = engine.find_slot(&SlotRequest::new("OP", 0, 600));
        assert!(matches!(
            result,
            Err(Error::Infeasible {
                reason: InfeasibleReason::Horizon,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_request_arguments() {
        let mut engine = shop_engine();
        assert!(matches!(
            engine.find_slot(&SlotRequest::new("OP", 0, 0)),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            engine.find_slot(&SlotRequest::new("OP", 0, 10).splittable(0)),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            engine.find_slot(&SlotRequest::new("OP", 100, 10).with_deadline(100)),
            Err(Error::InvalidOperation(_))
        ));
    }
}
