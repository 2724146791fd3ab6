use std::{
    fmt,
    ops::{Add, AddAssign, Sub},
};

/// Number of clock ticks in one virtual-time unit.
const TICKS_PER_UNIT: f64 = 1e6;

macro_rules! time_unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);

            /// The smallest representable amount of virtual time, in virtual-time units.
            pub const RESOLUTION: f64 = 1.0 / TICKS_PER_UNIT;

            pub const fn new(ticks: u64) -> Self {
                Self(ticks)
            }

            pub const fn into_ticks(self) -> u64 {
                self.0
            }

            /// Converts an amount of virtual-time units, rounding to the nearest tick. Returns
            /// `None` for negative or non-finite values and for values beyond the clock's range.
            pub fn try_from_units(units: f64) -> Option<Self> {
                if !(units.is_finite() && units >= 0.0) {
                    return None;
                }
                let ticks = (units * TICKS_PER_UNIT).round();
                // `u64::MAX as f64` is 2^64, the first value that does not fit
                (ticks < u64::MAX as f64).then(|| Self(ticks as u64))
            }

            /// Like [`Self::try_from_units`], for values already known to be in range.
            ///
            /// # Panics
            ///
            /// Panics if `units` cannot be represented.
            pub fn from_units(units: f64) -> Self {
                Self::try_from_units(units)
                    .unwrap_or_else(|| panic!("invalid virtual time {units}"))
            }

            pub fn into_units(self) -> f64 {
                self.0 as f64 / TICKS_PER_UNIT
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // Six digits is exactly the clock resolution
                write!(f, "{:.6}", self.into_units())
            }
        }
    };
}

time_unit!(Time);
time_unit!(Delta);

/// Rounds a virtual-time value to `digits` decimal digits.
///
/// Arrival processes use this to quantize arrival instants the way the trace files are written.
pub fn round_units(units: f64, digits: u32) -> f64 {
    let scale = 10_f64.powi(digits as i32);
    (units * scale).round() / scale
}

impl Add<Delta> for Time {
    type Output = Time;

    fn add(self, rhs: Delta) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Time> for Time {
    type Output = Delta;

    fn sub(self, rhs: Time) -> Self::Output {
        Delta::new(self.0 - rhs.0)
    }
}

impl AddAssign<Delta> for Time {
    fn add_assign(&mut self, rhs: Delta) {
        *self = Self(self.0 + rhs.0)
    }
}
