//! Finite-capacity scheduling primitives.
//!
//! Provides the mechanical foundations a finite-capacity scheduler builds
//! on: a horizon-free working calendar and an integer-domain capacity
//! engine. Dispatching policy, resource selection, and optimisation
//! strategies live in the layers above; this crate answers "when" and
//! "whether it fits", never "what next".
//!
//! # Modules
//!
//! - **`models`**: Value types: [`Pattern`], [`DayWindow`],
//!   [`DateException`], [`AllocationRecord`], [`Span`]
//! - **`calendar`**: [`WorkingCalendar`]: day-period resolution over
//!   weekly rules and dated exceptions, lazy forward/backward/counting
//!   walks
//! - **`resolution`**: [`TimeResolution`], the strict datetime to integer
//!   boundary
//! - **`engine`**: [`CapacityEngine`]: per-resource free/occupied state,
//!   slot finding, commit/release, dynamic mutation, snapshot/restore
//! - **`validation`**: Structural pattern checks
//! - **`fixtures`**: The JSON portability schema shared across
//!   implementations
//!
//! # Architecture
//!
//! Calendar rules and exceptions feed the day-period resolver; the lazy
//! walks consume it directly in datetimes, and the engine materialises it
//! through a [`TimeResolution`] into an integer bit vector. Past that
//! boundary the engine works purely in integers, which keeps speculative
//! search (snapshot, branch, restore) cheap. Both layers resolve periods
//! through the same code path, so the datetime walk and the integer walk
//! agree to the unit.
//!
//! All datetimes are zone-naive facility local time.
//!
//! # Reference
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Herroelen & Leus (2005), "Project scheduling under uncertainty"

pub mod calendar;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod resolution;
pub mod validation;

pub use calendar::{WorkingCalendar, WorkingIntervals};
pub use engine::{CapacityEngine, EngineSnapshot, SlotRequest};
pub use error::{Error, InfeasibleReason, Result};
pub use models::{AllocationRecord, DateException, DayWindow, Pattern, Span};
pub use resolution::{TimeResolution, HOUR, MINUTE};
