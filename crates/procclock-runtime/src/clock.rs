//! Monotonic clock and sleep primitives.
//!
//! The calibrator and the duty-cycle loop only see these traits, so tests can
//! drive them with a scripted clock instead of real sleeps.

use procclock_common::error::{ProcclockError, ProcclockResult};
use procclock_common::time::Timestamp;
use std::time::Duration;

/// Blocks the calling thread for a requested interval.
pub trait Sleeper {
    /// Sleep for roughly `duration`. Implementations may overshoot.
    fn sleep(&mut self, duration: Duration);
}

/// A monotonic clock that can also sleep.
pub trait ClockSource: Sleeper {
    /// Read the current monotonic time.
    ///
    /// # Errors
    ///
    /// Returns [`ProcclockError::Clock`] if the clock cannot be read.
    fn now(&mut self) -> ProcclockResult<Timestamp>;
}

/// `CLOCK_MONOTONIC` with `clock_nanosleep` (or `std::thread::sleep` off Linux).
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Sleeper for MonotonicClock {
    #[cfg(target_os = "linux")]
    fn sleep(&mut self, duration: Duration) {
        use nix::time::{clock_nanosleep, ClockId, ClockNanosleepFlags};
        use nix::sys::time::TimeSpec;

        // Relative sleep. An interrupted sleep is not resumed: the only
        // signal we handle terminates the process.
        let _ = clock_nanosleep(
            ClockId::CLOCK_MONOTONIC,
            ClockNanosleepFlags::empty(),
            &TimeSpec::from_duration(duration),
        );
    }

    #[cfg(not(target_os = "linux"))]
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl ClockSource for MonotonicClock {
    fn now(&mut self) -> ProcclockResult<Timestamp> {
        use nix::time::{clock_gettime, ClockId};

        let ts = clock_gettime(ClockId::CLOCK_MONOTONIC)
            .map_err(|e| ProcclockError::Clock(format!("clock_gettime failed: {e}")))?;
        Ok(Timestamp::new(i64::from(ts.tv_sec()), i64::from(ts.tv_nsec())))
    }
}
