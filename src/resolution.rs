//! Time resolution: the datetime to integer boundary.
//!
//! A [`TimeResolution`] converts between naive wall-clock datetimes and
//! dimensionless unit counts relative to an epoch. Conversion is strict:
//! a datetime that does not land on a unit boundary is rejected, never
//! rounded. Above this boundary the engine works purely in integers;
//! resolution is a performance parameter, not a semantic one.

use chrono::{Duration, NaiveDateTime};

use crate::error::{Error, Result};

/// Immutable unit definition for the integer time domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeResolution {
    /// Seconds per unit.
    pub unit_seconds: i64,
    /// Human-readable unit name.
    pub label: &'static str,
}

/// One unit per minute.
pub const MINUTE: TimeResolution = TimeResolution {
    unit_seconds: 60,
    label: "minute",
};

/// One unit per hour.
pub const HOUR: TimeResolution = TimeResolution {
    unit_seconds: 3600,
    label: "hour",
};

impl TimeResolution {
    /// Converts a datetime to whole units from the epoch.
    ///
    /// Fails with [`Error::Misalignment`] when the datetime does not land
    /// exactly on a unit boundary. Datetimes before the epoch yield
    /// negative unit counts.
    pub fn to_int(&self, dt: NaiveDateTime, epoch: NaiveDateTime) -> Result<i64> {
        let delta_seconds = (dt - epoch).num_seconds();
        let residual = delta_seconds.rem_euclid(self.unit_seconds);
        if residual != 0 {
            return Err(Error::Misalignment {
                datetime: dt,
                residual_seconds: residual,
                unit_seconds: self.unit_seconds,
            });
        }
        Ok(delta_seconds.div_euclid(self.unit_seconds))
    }

    /// Converts a unit count back to a naive datetime.
    pub fn to_datetime(&self, units: i64, epoch: NaiveDateTime) -> NaiveDateTime {
        epoch + Duration::seconds(units * self.unit_seconds)
    }

    /// Whole units contained in a duration, truncating any partial unit.
    #[inline]
    pub(crate) fn units_in(&self, duration: Duration) -> i64 {
        duration.num_seconds().div_euclid(self.unit_seconds)
    }

    /// Units in one calendar day.
    #[inline]
    pub(crate) fn day_units(&self) -> i64 {
        crate::models::DAY_SECONDS / self.unit_seconds
    }
}
