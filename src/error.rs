//! Error taxonomy for the calendar and capacity layers.
//!
//! Every operation rolls state forward only on success. When an error is
//! returned the observable state of the calendar or engine is unchanged.

use chrono::NaiveDateTime;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a slot search could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfeasibleReason {
    /// The search exhausted the window before the caller's deadline.
    Deadline,
    /// The search exhausted the available horizon lookahead.
    Horizon,
}

impl InfeasibleReason {
    /// Stable lowercase name, matching the fixture contract.
    pub fn as_str(&self) -> &'static str {
        match self {
            InfeasibleReason::Deadline => "deadline",
            InfeasibleReason::Horizon => "horizon",
        }
    }
}

/// Errors surfaced by calendar construction, time conversion, and the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A datetime does not land on a resolution unit boundary.
    Misalignment {
        datetime: NaiveDateTime,
        residual_seconds: i64,
        unit_seconds: i64,
    },
    /// A weekly rule is structurally invalid (bad weekday, overlap, zero length).
    InvalidRule(String),
    /// A dated exception is structurally invalid or conflicts with base periods.
    InvalidException(String),
    /// Work cannot be placed before the deadline or within the horizon lookahead.
    Infeasible {
        operation_id: String,
        work_units_remaining: i64,
        work_units_requested: i64,
        reason: InfeasibleReason,
    },
    /// A record addressed to one resource was applied to another engine.
    ResourceMismatch { expected: String, actual: String },
    /// A snapshot cannot be restored into the current bit vector.
    SnapshotSize { expected: usize, actual: usize },
    /// Double commit, release of an unknown record, or invalid call arguments.
    InvalidOperation(String),
    /// Malformed fixture input (unparseable time, date, or document).
    Parse(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Misalignment {
                datetime,
                residual_seconds,
                unit_seconds,
            } => write!(
                f,
                "datetime {datetime} does not align to a {unit_seconds}s unit \
                 (residual {residual_seconds}s); no implicit rounding is performed"
            ),
            Error::InvalidRule(msg) => write!(f, "invalid rule: {msg}"),
            Error::InvalidException(msg) => write!(f, "invalid exception: {msg}"),
            Error::Infeasible {
                operation_id,
                work_units_remaining,
                work_units_requested,
                reason,
            } => write!(
                f,
                "infeasible: operation '{operation_id}' cannot complete, \
                 {work_units_remaining}/{work_units_requested} units remaining \
                 (reason: {})",
                reason.as_str()
            ),
            Error::ResourceMismatch { expected, actual } => write!(
                f,
                "record for resource '{actual}' applied to engine for '{expected}'"
            ),
            Error::SnapshotSize { expected, actual } => write!(
                f,
                "snapshot of {actual} units cannot restore a {expected}-unit engine"
            ),
            Error::InvalidOperation(msg) => write!(f, "invalid operation: {msg}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}
