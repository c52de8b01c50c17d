//! Allocation records and integer spans.
//!
//! An [`AllocationRecord`] is the immutable description of one allocation's
//! footprint on one resource: which integer units it occupies and in what
//! pieces. Records are values; they are self-sufficient for release and may
//! outlive the allocation they describe.

use serde::{Deserialize, Serialize};

/// A contiguous half-open interval `[begin, end)` of absolute integer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// First occupied unit (inclusive).
    pub begin: i64,
    /// One past the last occupied unit (exclusive).
    pub end: i64,
}

impl Span {
    /// Creates a new span.
    pub fn new(begin: i64, end: i64) -> Self {
        debug_assert!(begin < end, "span begin must be before end");
        Self { begin, end }
    }

    /// Number of units covered.
    #[inline]
    pub fn len(&self) -> i64 {
        self.end - self.begin
    }

    /// Whether the span covers no units.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end <= self.begin
    }

    /// Whether two spans share at least one unit.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Whether the span shares at least one unit with `[begin, end)`.
    pub fn overlaps_range(&self, begin: i64, end: i64) -> bool {
        self.begin < end && begin < self.end
    }

    /// Whether an absolute unit falls inside the span.
    #[inline]
    pub fn contains(&self, unit: i64) -> bool {
        self.begin <= unit && unit < self.end
    }
}

/// Immutable record of a committed or candidate allocation.
///
/// Invariants:
/// - the span lengths sum to `work_units`;
/// - spans are sorted, disjoint, and lie within `[start, finish)`;
/// - `start` is the first span's begin and `finish` the last span's end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    /// Operation this allocation serves.
    pub operation_id: String,
    /// Resource the allocation occupies.
    pub resource_id: String,
    /// First occupied unit (absolute).
    pub start: i64,
    /// One past the last occupied unit (absolute, half-open).
    pub finish: i64,
    /// Total units of work covered by the spans.
    pub work_units: i64,
    /// Whether the work was allowed to split across free runs.
    pub allow_split: bool,
    /// Ordered, non-overlapping occupied intervals.
    pub spans: Vec<Span>,
}

impl AllocationRecord {
    /// Elapsed units from start to finish, including non-working gaps.
    #[inline]
    pub fn wall_time(&self) -> i64 {
        self.finish - self.start
    }

    /// Whether this allocation fulfils the required work.
    pub fn is_complete(&self, required_work_units: i64) -> bool {
        self.work_units >= required_work_units
    }

    /// Whether any span shares at least one unit with `[begin, end)`.
    pub fn overlaps_range(&self, begin: i64, end: i64) -> bool {
        self.spans.iter().any(|s| s.overlaps_range(begin, end))
    }
}
