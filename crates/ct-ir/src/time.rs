//! Session time representation.

use core::fmt;
use core::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// A position on the session clock, in milliseconds from chart start.
///
/// Never negative: construction and subtraction clamp at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionTimeMs(f64);

impl SessionTimeMs {
    /// The zero position (chart start).
    pub const ZERO: Self = Self(0.0);

    /// Create a timestamp, clamping negative and non-finite input to zero.
    pub fn new(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Self(ms)
        } else {
            Self(0.0)
        }
    }

    /// Raw millisecond value.
    pub const fn as_ms(self) -> f64 {
        self.0
    }

    /// Signed distance `self - earlier` in milliseconds.
    pub fn delta_ms(self, earlier: SessionTimeMs) -> f64 {
        self.0 - earlier.0
    }

    /// Subtract milliseconds, stopping at zero.
    pub fn saturating_sub(self, ms: f64) -> Self {
        Self::new(self.0 - ms)
    }

    /// The later of two timestamps.
    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }

    /// The earlier of two timestamps.
    pub fn min(self, other: Self) -> Self {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }
}

impl Add<f64> for SessionTimeMs {
    type Output = SessionTimeMs;

    fn add(self, ms: f64) -> Self {
        Self::new(self.0 + ms)
    }
}

impl AddAssign<f64> for SessionTimeMs {
    fn add_assign(&mut self, ms: f64) {
        *self = *self + ms;
    }
}

impl Sub<f64> for SessionTimeMs {
    type Output = SessionTimeMs;

    fn sub(self, ms: f64) -> Self {
        self.saturating_sub(ms)
    }
}

impl From<f64> for SessionTimeMs {
    fn from(ms: f64) -> Self {
        Self::new(ms)
    }
}

impl fmt::Display for SessionTimeMs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}ms", self.0)
    }
}

/// Duration of one microbeat (an eighth of a quarter-note beat) at `tempo` BPM.
///
/// 120 BPM gives 250ms. Returns 0 for tempos that are not positive and finite.
pub fn microbeat_duration_ms(tempo: f64) -> f64 {
    if tempo.is_finite() && tempo > 0.0 {
        30_000.0 / tempo
    } else {
        0.0
    }
}
