//! Portability fixture schema.
//!
//! Canonical datasets are JSON documents with `rules`, `exceptions`, and
//! `expected` tables plus a `config` header. They are the cross-language
//! ground truth: any implementation loads the same documents and must
//! produce the same literal outputs. This module defines the row types and
//! assembles [`Pattern`]s from them; executing the `expected` rows is the
//! test harness's job.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{DateException, DayWindow, Pattern};
use crate::resolution::{TimeResolution, HOUR, MINUTE};
use crate::validation::validate_pattern;

/// Dataset header: which pattern to run and under which boundary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureConfig {
    /// Pattern the expected rows run against.
    pub pattern_id: String,
    /// Epoch datetime, ISO format.
    pub epoch: String,
    /// Resolution name, `"minute"` or `"hour"`.
    pub resolution: String,
    /// Materialisation horizon start, ISO format.
    pub horizon_start: String,
    /// Materialisation horizon end, ISO format.
    pub horizon_end: String,
}

impl FixtureConfig {
    /// Parses the epoch datetime.
    pub fn epoch(&self) -> Result<NaiveDateTime> {
        parse_datetime(&self.epoch)
    }

    /// Parses the horizon bounds.
    pub fn horizon(&self) -> Result<(NaiveDateTime, NaiveDateTime)> {
        Ok((
            parse_datetime(&self.horizon_start)?,
            parse_datetime(&self.horizon_end)?,
        ))
    }

    /// Looks up the named resolution.
    pub fn resolution(&self) -> Result<TimeResolution> {
        match self.resolution.as_str() {
            "minute" => Ok(MINUTE),
            "hour" => Ok(HOUR),
            other => Err(Error::Parse(format!("unknown resolution '{other}'"))),
        }
    }
}

/// One weekly rule row. Primary key `(pattern_id, day_of_week, start_time)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRow {
    pub pattern_id: String,
    /// ISO weekday, 1 = Monday through 7 = Sunday.
    pub day_of_week: u8,
    /// `"HH:MM"`.
    pub start_time: String,
    /// `"HH:MM"`; earlier than `start_time` encodes an overnight window.
    pub end_time: String,
}

/// One dated exception row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionRow {
    pub pattern_id: String,
    /// `"YYYY-MM-DD"`.
    pub exception_date: String,
    /// 0 removes working time, 1 adds it.
    pub is_working: u8,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// One expected-result row: a query with its literal inputs and outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpectedRow {
    ForwardWalk {
        start: String,
        units: i64,
        expected: String,
    },
    BackwardWalk {
        end: String,
        units: i64,
        expected: String,
    },
    Counting {
        from: String,
        to: String,
        expected: i64,
    },
    FindSlot {
        operation_id: String,
        earliest_start: i64,
        work_units: i64,
        #[serde(default)]
        allow_split: bool,
        #[serde(default = "default_min_split")]
        min_split: i64,
        #[serde(default)]
        deadline: Option<i64>,
        expected_start: i64,
        expected_finish: i64,
        expected_spans: Vec<(i64, i64)>,
    },
    Allocate {
        operation_id: String,
        earliest_start: i64,
        work_units: i64,
        #[serde(default)]
        allow_split: bool,
        #[serde(default = "default_min_split")]
        min_split: i64,
        #[serde(default)]
        deadline: Option<i64>,
        expected_start: i64,
        expected_finish: i64,
        expected_spans: Vec<(i64, i64)>,
    },
}

fn default_min_split() -> i64 {
    1
}

/// A complete fixture document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureDocument {
    pub config: FixtureConfig,
    pub rules: Vec<RuleRow>,
    #[serde(default)]
    pub exceptions: Vec<ExceptionRow>,
    #[serde(default)]
    pub expected: Vec<ExpectedRow>,
}

impl FixtureDocument {
    /// Parses a fixture document from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Assembles and validates the pattern with the given id from the rows.
    pub fn pattern(&self, pattern_id: &str) -> Result<Pattern> {
        let mut pattern = Pattern::new(pattern_id);

        for row in self.rules.iter().filter(|r| r.pattern_id == pattern_id) {
            pattern = pattern.with_shift(
                row.day_of_week,
                parse_time(&row.start_time)?,
                parse_time(&row.end_time)?,
            );
        }

        for row in self
            .exceptions
            .iter()
            .filter(|r| r.pattern_id == pattern_id)
        {
            let date = parse_date(&row.exception_date)?;
            let is_working = match row.is_working {
                0 => false,
                1 => true,
                other => {
                    return Err(Error::Parse(format!(
                        "is_working must be 0 or 1, got {other}"
                    )))
                }
            };
            let window = match (&row.start_time, &row.end_time) {
                (Some(start), Some(end)) => {
                    Some(DayWindow::new(parse_time(start)?, parse_time(end)?))
                }
                (None, None) => None,
                _ => {
                    return Err(Error::Parse(format!(
                        "exception on {} has only one of start_time/end_time",
                        row.exception_date
                    )))
                }
            };
            pattern = pattern.with_exception(date, DateException { is_working, window });
        }

        validate_pattern(&pattern).map_err(Error::from)?;
        Ok(pattern)
    }
}

/// Parses `"HH:MM"`.
pub fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| Error::Parse(format!("invalid time '{s}', expected HH:MM")))
}

/// Parses `"YYYY-MM-DD"`.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::Parse(format!("invalid date '{s}', expected YYYY-MM-DD")))
}

/// Parses an ISO datetime, with or without seconds, `T` or space separated.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    for format in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt);
        }
    }
    Err(Error::Parse(format!(
        "invalid datetime '{s}', expected ISO date and time"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "config": {
            "pattern_id": "shop",
            "epoch": "2024-01-01T00:00",
            "resolution": "minute",
            "horizon_start": "2024-01-01T00:00",
            "horizon_end": "2024-01-08T00:00"
        },
        "rules": [
            {"pattern_id": "shop", "day_of_week": 1, "start_time": "09:00", "end_time": "17:00"},
            {"pattern_id": "shop", "day_of_week": 2, "start_time": "09:00", "end_time": "17:00"},
            {"pattern_id": "other", "day_of_week": 1, "start_time": "00:00", "end_time": "06:00"}
        ],
        "exceptions": [
            {"pattern_id": "shop", "exception_date": "2024-01-02", "is_working": 0},
            {"pattern_id": "shop", "exception_date": "2024-01-06", "is_working": 1,
             "start_time": "10:00", "end_time": "14:00"}
        ],
        "expected": [
            {"kind": "forward_walk", "start": "2024-01-01T09:00", "units": 60,
             "expected": "2024-01-01T10:00"},
            {"kind": "find_slot", "operation_id": "A", "earliest_start": 540,
             "work_units": 120, "expected_start": 540, "expected_finish": 660,
             "expected_spans": [[540, 660]]}
        ]
    }"#;

    #[test]
    fn test_document_parses() {
        let doc = FixtureDocument::from_json(SAMPLE).unwrap();
        assert_eq!(doc.rules.len(), 3);
        assert_eq!(doc.exceptions.len(), 2);
        assert_eq!(doc.expected.len(), 2);
        assert_eq!(doc.config.resolution().unwrap(), MINUTE);
    }

    #[test]
    fn test_pattern_assembly_filters_by_id() {
        let doc = FixtureDocument::from_json(SAMPLE).unwrap();
        let shop = doc.pattern("shop").unwrap();
        assert_eq!(shop.rules.len(), 2);
        assert_eq!(shop.exceptions.len(), 2);

        let other = doc.pattern("other").unwrap();
        assert_eq!(other.rules.len(), 1);
        assert!(other.exceptions.is_empty());
    }

    #[test]
    fn test_expected_row_defaults() {
        let doc = FixtureDocument::from_json(SAMPLE).unwrap();
        match &doc.expected[1] {
            ExpectedRow::FindSlot {
                allow_split,
                min_split,
                deadline,
                ..
            } => {
                assert!(!allow_split);
                assert_eq!(*min_split, 1);
                assert!(deadline.is_none());
            }
            other => panic!("expected FindSlot row, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_time_rejected() {
        assert!(parse_time("9am").is_err());
        assert!(parse_time("25:00").is_err());
        assert!(parse_time("09:00").is_ok());
    }

    #[test]
    fn test_bad_is_working_rejected() {
        let doc = FixtureDocument::from_json(
            &SAMPLE.replace(r#""is_working": 0"#, r#""is_working": 2"#),
        )
        .unwrap();
        assert!(matches!(doc.pattern("shop"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_half_window_rejected() {
        let json = SAMPLE.replace(r#""start_time": "10:00", "#, "");
        let doc = FixtureDocument::from_json(&json).unwrap();
        assert!(matches!(doc.pattern("shop"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_datetime_formats() {
        assert!(parse_datetime("2024-01-01T09:00").is_ok());
        assert!(parse_datetime("2024-01-01T09:00:00").is_ok());
        assert!(parse_datetime("2024-01-01 09:00").is_ok());
        assert!(parse_datetime("bogus").is_err());
    }

    #[test]
    fn test_overnight_rule_row() {
        let json = SAMPLE.replace(
            r#""day_of_week": 1, "start_time": "09:00", "end_time": "17:00""#,
            r#""day_of_week": 1, "start_time": "22:00", "end_time": "06:00""#,
        );
        let doc = FixtureDocument::from_json(&json).unwrap();
        let pattern = doc.pattern("shop").unwrap();
        assert!(pattern.rules[&1][0].is_overnight());
    }
}
