//! Structural validation for availability patterns.
//!
//! Checks a [`Pattern`] before it becomes a calendar. Detects:
//! - Invalid weekday keys
//! - Zero-length windows
//! - Overlapping windows within a day (after overnight splitting)
//! - Working exceptions without a time range
//! - Exception windows that cross midnight
//!
//! All problems are collected and reported together; composition-level
//! conflicts (overnight tails against next-day rules, added windows against
//! base periods) are checked by
//! [`WorkingCalendar::new`](crate::calendar::WorkingCalendar::new), which
//! needs the resolver to see them.

use chrono::NaiveTime;

use crate::models::{DayWindow, Pattern};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A rule uses a weekday outside 1-7.
    InvalidWeekday,
    /// A window covers no time at all.
    ZeroLengthWindow,
    /// Two windows on the same day share time.
    OverlappingWindows,
    /// A working exception carries no time range.
    MissingWindow,
    /// An exception window crosses midnight.
    OvernightException,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the structure of a pattern.
///
/// Checks:
/// 1. Weekday keys are in 1-7 (ISO, Monday = 1)
/// 2. No zero-length rule windows
/// 3. Rule windows within a day do not overlap, counting the same-day
///    portion of overnight windows
/// 4. Every `is_working = true` exception carries a window
/// 5. Exception windows lie within their date (no overnight exceptions;
///    an end of `00:00` is read as midnight at the end of the day)
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_pattern(pattern: &Pattern) -> ValidationResult {
    let mut errors = Vec::new();

    for (&day, windows) in &pattern.rules {
        if !(1..=7).contains(&day) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidWeekday,
                format!("Pattern '{}': weekday {} is not in 1-7", pattern.id, day),
            ));
            continue;
        }

        // Same-day portions: overnight windows contribute [start, midnight).
        let mut portions: Vec<(i64, i64)> = Vec::new();
        for w in windows {
            if window_is_degenerate(w) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ZeroLengthWindow,
                    format!(
                        "Pattern '{}', weekday {}: window {}-{} covers no time",
                        pattern.id, day, w.start, w.end
                    ),
                ));
                continue;
            }
            if w.is_overnight() {
                portions.push((w.start_seconds(), crate::models::DAY_SECONDS));
            } else {
                portions.push((w.start_seconds(), w.end_seconds()));
            }
        }

        portions.sort_unstable();
        for pair in portions.windows(2) {
            if pair[1].0 < pair[0].1 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::OverlappingWindows,
                    format!(
                        "Pattern '{}', weekday {}: overlapping windows",
                        pattern.id, day
                    ),
                ));
            }
        }
    }

    for (date, entries) in &pattern.exceptions {
        for entry in entries {
            match &entry.window {
                None => {
                    if entry.is_working {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::MissingWindow,
                            format!(
                                "Pattern '{}', {date}: working exception without a time range",
                                pattern.id
                            ),
                        ));
                    }
                }
                Some(w) => {
                    if window_is_degenerate(w) {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::ZeroLengthWindow,
                            format!(
                                "Pattern '{}', {date}: exception window {}-{} covers no time",
                                pattern.id, w.start, w.end
                            ),
                        ));
                    } else if w.end < w.start && w.end != NaiveTime::MIN {
                        errors.push(ValidationError::new(
                            ValidationErrorKind::OvernightException,
                            format!(
                                "Pattern '{}', {date}: exception window {}-{} crosses midnight",
                                pattern.id, w.start, w.end
                            ),
                        ));
                    }
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// A window with equal start and end covers nothing. `00:00-00:00` is the
/// degenerate case of the end-of-day encoding.
fn window_is_degenerate(w: &DayWindow) -> bool {
    w.start == w.end
}

impl From<Vec<ValidationError>> for crate::error::Error {
    /// Collapses collected validation errors into the crate taxonomy. The
    /// first error picks the variant; the count of the rest is appended.
    fn from(errors: Vec<ValidationError>) -> Self {
        let Some(first) = errors.first() else {
            return crate::error::Error::InvalidRule("unknown validation failure".into());
        };
        let message = if errors.len() > 1 {
            format!("{} ({} more issues)", first.message, errors.len() - 1)
        } else {
            first.message.clone()
        };
        match first.kind {
            ValidationErrorKind::MissingWindow | ValidationErrorKind::OvernightException => {
                crate::error::Error::InvalidException(message)
            }
            _ => crate::error::Error::InvalidRule(message),
        }
    }
}
