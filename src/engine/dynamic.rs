//! Commit, release, and post-materialisation capacity changes.
//!
//! Release is the exact bitwise inverse of commit for the same record.
//! Dynamic removals report the allocations they disturb and leave the
//! decision to the caller; the engine detects, it never resolves.

use crate::error::{Error, Result};
use crate::models::AllocationRecord;

use super::CapacityEngine;

impl CapacityEngine {
    /// Occupies a candidate record's spans and adds it to the index.
    ///
    /// Rejects records for other resources, records already committed, and
    /// records whose spans are no longer entirely free; a rejected commit
    /// changes nothing.
    pub fn commit(&mut self, record: &AllocationRecord) -> Result<()> {
        self.check_resource(record)?;
        if self.allocations().contains(record) {
            return Err(Error::InvalidOperation(format!(
                "operation '{}' is already committed on '{}'",
                record.operation_id, record.resource_id
            )));
        }
        for span in &record.spans {
            if span.begin < self.horizon_begin() || span.end > self.horizon_end() {
                return Err(Error::InvalidOperation(format!(
                    "span [{}, {}) of operation '{}' lies outside the horizon",
                    span.begin, span.end, record.operation_id
                )));
            }
            for unit in span.begin..span.end {
                if !self.bit(unit) {
                    return Err(Error::InvalidOperation(format!(
                        "unit {unit} needed by operation '{}' is not free",
                        record.operation_id
                    )));
                }
            }
        }

        for span in &record.spans {
            for unit in span.begin..span.end {
                self.set_bit(unit, false);
            }
        }
        self.allocations_mut().push(record.clone());
        Ok(())
    }

    /// Frees a committed record's spans and removes it from the index.
    ///
    /// The record must be live in this engine's index; releasing twice or
    /// releasing a never-committed record is rejected. Spans cleared in the
    /// meantime by [`set_unavailable`](CapacityEngine::set_unavailable) are
    /// restored to free, since the caller kept the record live.
    pub fn release(&mut self, record: &AllocationRecord) -> Result<()> {
        self.check_resource(record)?;
        let position = self
            .allocations()
            .iter()
            .position(|candidate| candidate == record)
            .ok_or_else(|| {
                Error::InvalidOperation(format!(
                    "operation '{}' is not committed on '{}'",
                    record.operation_id, record.resource_id
                ))
            })?;

        for span in &record.spans {
            for unit in span.begin..span.end {
                self.set_bit(unit, true);
            }
        }
        self.allocations_mut().remove(position);
        Ok(())
    }

    /// Removes capacity over `[begin, end)` and reports disturbed
    /// allocations.
    ///
    /// Every free unit in the range becomes occupied. Allocations whose
    /// spans intersect the range are returned but stay committed; the
    /// caller decides whether to release or re-plan them. An empty range
    /// reports nothing.
    pub fn set_unavailable(&mut self, begin: i64, end: i64) -> Result<Vec<AllocationRecord>> {
        if begin >= end {
            return Ok(Vec::new());
        }
        self.extend_to(end)?;

        let conflicts: Vec<AllocationRecord> = self
            .allocations()
            .iter()
            .filter(|record| record.overlaps_range(begin, end))
            .cloned()
            .collect();

        for unit in begin.max(self.horizon_begin())..end {
            self.set_bit(unit, false);
        }
        Ok(conflicts)
    }

    /// Adds capacity over `[begin, end)`.
    ///
    /// Occupied units become free unless a live allocation covers them;
    /// added capacity never overwrites committed work.
    pub fn set_available(&mut self, begin: i64, end: i64) -> Result<()> {
        if begin >= end {
            return Ok(());
        }
        self.extend_to(end)?;

        for unit in begin.max(self.horizon_begin())..end {
            if self.bit(unit) {
                continue;
            }
            let allocated = self
                .allocations()
                .iter()
                .any(|record| record.spans.iter().any(|span| span.contains(unit)));
            if !allocated {
                self.set_bit(unit, true);
            }
        }
        Ok(())
    }

    fn check_resource(&self, record: &AllocationRecord) -> Result<()> {
        if record.resource_id != self.resource_id() {
            return Err(Error::ResourceMismatch {
                expected: self.resource_id().to_string(),
                actual: record.resource_id.clone(),
            });
        }
        Ok(())
    }
}
