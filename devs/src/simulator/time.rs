use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Simulated time, a total order over the non-negative reals extended with
/// positive infinity.  `Time` doubles as the duration type: a time-advance
/// returned by a model is a `Time` measured from the current instant, and an
/// infinite time-advance passivates the model.  The ordering is total
/// (`f64::total_cmp`), so `Time` can key the event table directly; NaN is
/// excluded by construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(f64);

impl Time {
    pub const ZERO: Time = Time(0.0);
    pub const INFINITY: Time = Time(f64::INFINITY);

    /// Builds a `Time` from its floating point representation.
    ///
    /// # Panics
    ///
    /// Panics if `value` is NaN.
    pub fn new(value: f64) -> Self {
        assert!(!value.is_nan(), "simulation time cannot be NaN");
        Time(value)
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }

    pub fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }
}

impl Default for Time {
    fn default() -> Self {
        Time::ZERO
    }
}

impl From<f64> for Time {
    fn from(value: f64) -> Self {
        Time::new(value)
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Time {}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time(self.0 + rhs.0)
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        self.0 += rhs.0;
    }
}

impl Sub for Time {
    type Output = Time;

    /// The difference between two finite times is a finite duration.
    fn sub(self, rhs: Time) -> Time {
        debug_assert!(
            self.is_finite() && rhs.is_finite(),
            "time difference requires finite operands"
        );
        Time(self.0 - rhs.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinity_ordering() {
        assert!(Time::new(1e300) < Time::INFINITY);
        assert!(Time::ZERO < Time::new(0.5));
        assert_eq!(Time::INFINITY, Time::INFINITY);
    }

    #[test]
    fn advance_arithmetic() {
        assert_eq!(Time::new(2.0) + Time::new(0.5), Time::new(2.5));
        assert_eq!(Time::new(3.0) + Time::INFINITY, Time::INFINITY);
        assert_eq!(Time::new(3.0) - Time::new(1.0), Time::new(2.0));
    }
}
