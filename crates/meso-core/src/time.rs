//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a signed integer `Tick` counting simulated
//! milliseconds.  Using an integer tick as the canonical time unit means all
//! event arithmetic is exact (no floating-point drift) and comparisons are
//! O(1).  Seconds appear only inside f64 travel-time formulas which convert
//! back to ticks immediately via [`Tick::from_secs_f64`].
//!
//! `Tick` is signed on purpose: queue block times start at `-1` and the
//! entry-block sentinel is `Tick::MIN`, mirroring how the headway bookkeeping
//! counts "never blocked" and "blocked forever" at the two extremes.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// Ticks per simulated second (1 tick = 1 ms).
pub const TICKS_PER_SECOND: i64 = 1_000;

/// An absolute simulation time in ticks (milliseconds).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub i64);

impl Tick {
    pub const ZERO: Tick = Tick(0);
    /// "Earlier than any event" sentinel.
    pub const MIN: Tick = Tick(i64::MIN);
    /// "Never" sentinel — also the block time of an unblocked vehicle.
    pub const MAX: Tick = Tick(i64::MAX);

    /// Convert a duration in seconds to ticks, rounding to the nearest tick
    /// (plain truncation would turn 1.13 s into 1129 ticks).
    #[inline]
    pub fn from_secs_f64(secs: f64) -> Tick {
        Tick((secs * TICKS_PER_SECOND as f64).round() as i64)
    }

    /// This time as fractional seconds.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / TICKS_PER_SECOND as f64
    }

    /// Addition that sticks to `Tick::MAX`/`Tick::MIN` instead of wrapping.
    ///
    /// Block-time arithmetic offsets `Tick::MAX` ("not blocked") by headways;
    /// plain `+` would overflow there.
    #[inline]
    pub fn saturating_add(self, rhs: Tick) -> Tick {
        Tick(self.0.saturating_add(rhs.0))
    }
}

impl Add for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: Tick) -> Tick {
        Tick(self.0 + rhs.0)
    }
}

impl AddAssign for Tick {
    #[inline]
    fn add_assign(&mut self, rhs: Tick) {
        self.0 += rhs.0;
    }
}

impl Sub for Tick {
    type Output = Tick;
    #[inline]
    fn sub(self, rhs: Tick) -> Tick {
        Tick(self.0 - rhs.0)
    }
}

impl Mul<i64> for Tick {
    type Output = Tick;
    /// Scale a duration-valued tick (e.g. a headway times a vehicle count).
    #[inline]
    fn mul(self, rhs: i64) -> Tick {
        Tick(self.0 * rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}
