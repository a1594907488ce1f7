//! Monotonic time helpers.
//!
//! Timestamps mirror `struct timespec` as read from `CLOCK_MONOTONIC` so the
//! calibrator can work on the raw seconds/nanoseconds split.

use crate::error::{ProcclockError, ProcclockResult};
use std::fmt;
use std::time::Duration;

/// Nanoseconds per second.
pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Nanoseconds per microsecond.
pub const NANOS_PER_MICRO: u64 = 1_000;

/// Microseconds per second.
pub const MICROS_PER_SEC: u64 = 1_000_000;

/// A monotonic clock reading split into seconds and nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    /// Whole seconds.
    pub sec: i64,
    /// Nanoseconds within the second (`0..1_000_000_000`).
    pub nsec: i64,
}

impl Timestamp {
    /// Create a timestamp from a seconds/nanoseconds pair.
    #[must_use]
    pub const fn new(sec: i64, nsec: i64) -> Self {
        Self { sec, nsec }
    }

    /// Nanoseconds elapsed from `start` to `self`.
    ///
    /// Borrows one second when the readings straddle a second boundary.
    /// A reading earlier than `start` yields zero.
    #[must_use]
    pub fn nanos_since(&self, start: &Timestamp) -> u64 {
        let delta = if self.sec > start.sec {
            (self.sec - 1 - start.sec) * NANOS_PER_SEC + self.nsec + (NANOS_PER_SEC - start.nsec)
        } else {
            self.nsec - start.nsec
        };
        u64::try_from(delta).unwrap_or(0)
    }
}

/// The measured real duration of one scheduler tick.
///
/// Invariant: `tick_us() >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibratedTick {
    tick_ns: u64,
    tick_us: u64,
}

impl CalibratedTick {
    /// Build a tick from an averaged nanosecond measurement.
    ///
    /// # Errors
    ///
    /// Returns [`ProcclockError::Calibration`] if the tick is below one microsecond.
    pub fn from_nanos(tick_ns: u64) -> ProcclockResult<Self> {
        let tick_us = tick_ns / NANOS_PER_MICRO;
        if tick_us == 0 {
            return Err(ProcclockError::Calibration { tick_ns });
        }
        Ok(Self { tick_ns, tick_us })
    }

    /// Tick length in nanoseconds.
    #[must_use]
    pub fn tick_ns(&self) -> u64 {
        self.tick_ns
    }

    /// Tick length in whole microseconds.
    #[must_use]
    pub fn tick_us(&self) -> u64 {
        self.tick_us
    }

    /// Tick length as a [`Duration`] for sleeping.
    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.tick_ns)
    }
}

impl fmt::Display for CalibratedTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", humantime::format_duration(self.as_duration()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanos_same_second() {
        let start = Timestamp::new(5, 100);
        let end = Timestamp::new(5, 1_600);
        assert_eq!(end.nanos_since(&start), 1_500);
    }

    #[test]
    fn test_nanos_across_second_boundary() {
        let start = Timestamp::new(9, 999_999_500);
        let end = Timestamp::new(10, 700);
        assert_eq!(end.nanos_since(&start), 1_200);
    }

    #[test]
    fn test_nanos_across_several_seconds() {
        let start = Timestamp::new(1, 900_000_000);
        let end = Timestamp::new(3, 100_000_000);
        assert_eq!(end.nanos_since(&start), 1_200_000_000);
    }

    #[test]
    fn test_nanos_backwards_clamps_to_zero() {
        let start = Timestamp::new(2, 500);
        let end = Timestamp::new(2, 100);
        assert_eq!(end.nanos_since(&start), 0);
    }

    #[test]
    fn test_tick_from_nanos() {
        let tick = CalibratedTick::from_nanos(57_400).unwrap();
        assert_eq!(tick.tick_ns(), 57_400);
        assert_eq!(tick.tick_us(), 57);
        assert_eq!(tick.as_duration(), Duration::from_nanos(57_400));
        assert_eq!(tick.to_string(), "57us 400ns");
    }

    #[test]
    fn test_tick_below_one_microsecond_fails() {
        assert_eq!(
            CalibratedTick::from_nanos(999),
            Err(ProcclockError::Calibration { tick_ns: 999 })
        );
        assert!(CalibratedTick::from_nanos(0).is_err());
        assert!(CalibratedTick::from_nanos(1_000).is_ok());
    }
}
