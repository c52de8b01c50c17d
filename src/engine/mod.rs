//! Capacity engine: integer-domain occupancy state per resource.
//!
//! A [`CapacityEngine`] materialises a [`WorkingCalendar`] into a
//! free/occupied bit vector over an integer unit horizon and thereafter
//! operates purely in integers; datetimes never re-enter. It supports
//! read-only slot finding, commit/release with exact inverse semantics,
//! dynamic capacity mutation with allocation-conflict detection,
//! checkpoint/restore for speculative search, and on-demand horizon
//! extension from the retained calendar.
//!
//! # Modules
//!
//! - **`slot`**: [`SlotRequest`] and the read-only slot finder
//! - **`dynamic`**: commit/release and post-materialisation capacity changes
//!
//! # Concurrency
//!
//! An engine is a single-threaded, cooperative component. Callers that
//! branch a search take a [`snapshot`](CapacityEngine::snapshot) (or clone
//! the engine; the calendar is shared behind an `Arc`) and give each branch
//! its own state.

mod dynamic;
mod slot;

pub use slot::SlotRequest;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::calendar::WorkingCalendar;
use crate::error::{Error, Result};
use crate::models::AllocationRecord;
use crate::resolution::TimeResolution;

/// Horizon growth chunk: at least one week of units per extension.
const EXTEND_CHUNK_DAYS: i64 = 7;

/// Mutable occupancy state for one resource.
///
/// `bits[i]` covers absolute unit `horizon_begin + i`; `true` is free,
/// `false` is occupied or non-working.
#[derive(Debug, Clone)]
pub struct CapacityEngine {
    resource_id: String,
    horizon_begin: i64,
    bits: Vec<bool>,
    calendar: Arc<WorkingCalendar>,
    resolution: TimeResolution,
    epoch: NaiveDateTime,
    /// Live allocations, consulted for conflict detection and release.
    allocations: Vec<AllocationRecord>,
}

/// Opaque immutable capture of an engine's occupancy and allocation index.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    horizon_begin: i64,
    bits: Vec<bool>,
    allocations: Vec<AllocationRecord>,
}

impl CapacityEngine {
    /// Materialises a calendar into capacity state over
    /// `[horizon_start, horizon_end)`.
    ///
    /// Both datetimes must align to the resolution relative to the epoch;
    /// so must every working period boundary inside the horizon
    /// ([`Error::Misalignment`] otherwise). The calendar, resolution, and
    /// epoch are retained for on-demand horizon extension.
    pub fn from_calendar(
        calendar: Arc<WorkingCalendar>,
        horizon_start: NaiveDateTime,
        horizon_end: NaiveDateTime,
        epoch: NaiveDateTime,
        resolution: TimeResolution,
    ) -> Result<Self> {
        if horizon_start > horizon_end {
            return Err(Error::InvalidOperation(format!(
                "horizon start {horizon_start} is after horizon end {horizon_end}"
            )));
        }
        let begin = resolution.to_int(horizon_start, epoch)?;
        let end = resolution.to_int(horizon_end, epoch)?;

        let mut bits = vec![false; (end - begin) as usize];
        fill_from_calendar(
            &mut bits,
            begin,
            &calendar,
            resolution,
            epoch,
            horizon_start,
            horizon_end,
        )?;

        Ok(Self {
            resource_id: calendar.pattern_id().to_string(),
            horizon_begin: begin,
            bits,
            calendar,
            resolution,
            epoch,
            allocations: Vec::new(),
        })
    }

    /// Resource this engine tracks.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// First unit of the horizon (inclusive).
    #[inline]
    pub fn horizon_begin(&self) -> i64 {
        self.horizon_begin
    }

    /// One past the last unit of the horizon.
    #[inline]
    pub fn horizon_end(&self) -> i64 {
        self.horizon_begin + self.bits.len() as i64
    }

    /// Number of free units currently in the horizon.
    pub fn free_count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Free state of an absolute unit, or `None` outside the horizon.
    pub fn is_free(&self, unit: i64) -> Option<bool> {
        if unit < self.horizon_begin || unit >= self.horizon_end() {
            return None;
        }
        Some(self.bits[(unit - self.horizon_begin) as usize])
    }

    /// Live allocation records, in commit order.
    pub fn allocations(&self) -> &[AllocationRecord] {
        &self.allocations
    }

    /// Number of live allocations.
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    /// Captures the full observable state.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            horizon_begin: self.horizon_begin,
            bits: self.bits.clone(),
            allocations: self.allocations.clone(),
        }
    }

    /// Restores a snapshot taken from this engine.
    ///
    /// A snapshot with a different horizon origin, or one longer than the
    /// current bit vector, is rejected with [`Error::SnapshotSize`]. A
    /// shorter snapshot truncates the vector, retracting any horizon
    /// extension that happened after the capture; the engine is then
    /// indistinguishable from its state at `snapshot()` time.
    pub fn restore(&mut self, snapshot: &EngineSnapshot) -> Result<()> {
        if snapshot.horizon_begin != self.horizon_begin || snapshot.bits.len() > self.bits.len() {
            return Err(Error::SnapshotSize {
                expected: self.bits.len(),
                actual: snapshot.bits.len(),
            });
        }
        self.bits.truncate(snapshot.bits.len());
        self.bits.copy_from_slice(&snapshot.bits);
        self.allocations = snapshot.allocations.clone();
        Ok(())
    }

    /// Grows the horizon so it covers at least `needed_end`, materialising
    /// the new region from the retained calendar. Never touches existing
    /// bits or the allocation index.
    pub(crate) fn extend_to(&mut self, needed_end: i64) -> Result<()> {
        let current_end = self.horizon_end();
        if needed_end <= current_end {
            return Ok(());
        }
        let chunk = EXTEND_CHUNK_DAYS * self.resolution.day_units();
        let new_end = needed_end.max(current_end + chunk);

        let dt_from = self.resolution.to_datetime(current_end, self.epoch);
        let dt_to = self.resolution.to_datetime(new_end, self.epoch);

        let grow_by = (new_end - current_end) as usize;
        let mut extension = vec![false; grow_by];
        fill_from_calendar(
            &mut extension,
            current_end,
            &self.calendar,
            self.resolution,
            self.epoch,
            dt_from,
            dt_to,
        )?;
        self.bits.extend(extension);
        Ok(())
    }

    /// Bit at an absolute unit. Caller guarantees the unit is in range.
    #[inline]
    pub(crate) fn bit(&self, unit: i64) -> bool {
        self.bits[(unit - self.horizon_begin) as usize]
    }

    #[inline]
    pub(crate) fn set_bit(&mut self, unit: i64, free: bool) {
        self.bits[(unit - self.horizon_begin) as usize] = free;
    }

    pub(crate) fn calendar(&self) -> &WorkingCalendar {
        &self.calendar
    }

    pub(crate) fn resolution(&self) -> TimeResolution {
        self.resolution
    }

    pub(crate) fn epoch(&self) -> NaiveDateTime {
        self.epoch
    }

    pub(crate) fn allocations_mut(&mut self) -> &mut Vec<AllocationRecord> {
        &mut self.allocations
    }
}

/// Sets the working bits of `[dt_from, dt_to)` in a zeroed slice whose
/// index 0 corresponds to absolute unit `offset`.
fn fill_from_calendar(
    bits: &mut [bool],
    offset: i64,
    calendar: &WorkingCalendar,
    resolution: TimeResolution,
    epoch: NaiveDateTime,
    dt_from: NaiveDateTime,
    dt_to: NaiveDateTime,
) -> Result<()> {
    let len = bits.len() as i64;
    for (iv_start, iv_end) in calendar.working_intervals_in_range(dt_from, dt_to) {
        let start = resolution.to_int(iv_start, epoch)? - offset;
        let end = resolution.to_int(iv_end, epoch)? - offset;
        for i in start.max(0)..end.min(len) {
            bits[i as usize] = true;
        }
    }
    Ok(())
}
