//! Executes the canonical JSON dataset against the calendar and engine.
//!
//! The fixture documents are the cross-language portability contract:
//! every implementation loads the same JSON and must reproduce the same
//! literal outputs. `find_slot` rows are read-only probes; `allocate`
//! rows mutate the shared engine in document order.

use std::sync::Arc;

use timegrid::fixtures::{parse_datetime, ExpectedRow, FixtureDocument};
use timegrid::{CapacityEngine, SlotRequest, Span, WorkingCalendar};

const BASELINE: &str = include_str!("data/baseline.json");

fn spans_of(pairs: &[(i64, i64)]) -> Vec<Span> {
    pairs.iter().map(|&(b, e)| Span::new(b, e)).collect()
}

#[test]
fn baseline_dataset_passes() {
    let doc = FixtureDocument::from_json(BASELINE).unwrap();
    let pattern = doc.pattern(&doc.config.pattern_id).unwrap();
    let calendar = Arc::new(WorkingCalendar::new(pattern).unwrap());
    let resolution = doc.config.resolution().unwrap();
    let epoch = doc.config.epoch().unwrap();
    let (horizon_start, horizon_end) = doc.config.horizon().unwrap();

    let mut engine = CapacityEngine::from_calendar(
        calendar.clone(),
        horizon_start,
        horizon_end,
        epoch,
        resolution,
    )
    .unwrap();

    for (row_no, row) in doc.expected.iter().enumerate() {
        match row {
            ExpectedRow::ForwardWalk {
                start,
                units,
                expected,
            } => {
                let start = parse_datetime(start).unwrap();
                let expected = parse_datetime(expected).unwrap();
                let actual = calendar.add_units(start, *units, resolution).unwrap();
                assert_eq!(actual, expected, "forward walk row {row_no}");
            }
            ExpectedRow::BackwardWalk {
                end,
                units,
                expected,
            } => {
                let end = parse_datetime(end).unwrap();
                let expected = parse_datetime(expected).unwrap();
                let actual = calendar.subtract_units(end, *units, resolution).unwrap();
                assert_eq!(actual, expected, "backward walk row {row_no}");
            }
            ExpectedRow::Counting { from, to, expected } => {
                let from = parse_datetime(from).unwrap();
                let to = parse_datetime(to).unwrap();
                let actual = calendar.working_units_between(from, to, resolution);
                assert_eq!(actual, *expected, "counting row {row_no}");
            }
            ExpectedRow::FindSlot {
                operation_id,
                earliest_start,
                work_units,
                allow_split,
                min_split,
                deadline,
                expected_start,
                expected_finish,
                expected_spans,
            }
            | ExpectedRow::Allocate {
                operation_id,
                earliest_start,
                work_units,
                allow_split,
                min_split,
                deadline,
                expected_start,
                expected_finish,
                expected_spans,
            } => {
                let mut request =
                    SlotRequest::new(operation_id.clone(), *earliest_start, *work_units);
                if *allow_split {
                    request = request.splittable(*min_split);
                }
                if let Some(deadline) = deadline {
                    request = request.with_deadline(*deadline);
                }
                let record = if matches!(row, ExpectedRow::Allocate { .. }) {
                    engine.allocate(&request).unwrap()
                } else {
                    engine.find_slot(&request).unwrap()
                };
                assert_eq!(record.start, *expected_start, "slot row {row_no}");
                assert_eq!(record.finish, *expected_finish, "slot row {row_no}");
                assert_eq!(record.spans, spans_of(expected_spans), "slot row {row_no}");
                assert_eq!(record.work_units, *work_units);
            }
        }
    }
}

#[test]
fn baseline_walks_agree_with_engine_ints() {
    let doc = FixtureDocument::from_json(BASELINE).unwrap();
    let pattern = doc.pattern(&doc.config.pattern_id).unwrap();
    let calendar = Arc::new(WorkingCalendar::new(pattern).unwrap());
    let resolution = doc.config.resolution().unwrap();
    let epoch = doc.config.epoch().unwrap();
    let (horizon_start, horizon_end) = doc.config.horizon().unwrap();

    let mut engine = CapacityEngine::from_calendar(
        calendar.clone(),
        horizon_start,
        horizon_end,
        epoch,
        resolution,
    )
    .unwrap();

    // Every forward-walk row must agree with a fresh-engine slot probe
    for row in &doc.expected {
        if let ExpectedRow::ForwardWalk {
            start,
            units,
            expected,
        } = row
        {
            if *units == 0 {
                continue;
            }
            let start = parse_datetime(start).unwrap();
            let expected = parse_datetime(expected).unwrap();
            let request = SlotRequest::new(
                "probe",
                resolution.to_int(start, epoch).unwrap(),
                *units,
            )
            .splittable(1);
            let record = engine.find_slot(&request).unwrap();
            assert_eq!(resolution.to_datetime(record.finish, epoch), expected);
        }
    }
}
