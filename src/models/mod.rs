//! Core domain models.
//!
//! Provides the value types shared by the calendar and engine layers:
//! availability patterns ([`Pattern`], [`DayWindow`], [`DateException`]) and
//! allocation descriptions ([`AllocationRecord`], [`Span`]).
//!
//! Patterns live in wall-clock time; allocation records live in integer
//! units. The [`resolution`](crate::resolution) boundary is the only place
//! the two meet.

mod allocation;
mod pattern;

pub use allocation::{AllocationRecord, Span};
pub use pattern::{DateException, DayWindow, Pattern};

pub(crate) use pattern::DAY_SECONDS;
