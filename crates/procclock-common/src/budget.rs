//! Execution budget derived from the command-line inputs.

use crate::error::{ProcclockError, ProcclockResult};
use crate::time::{CalibratedTick, MICROS_PER_SEC};

/// Exclusive upper bound for the duty-cycle frequency.
pub const MAX_FREQUENCY_HZ: u64 = MICROS_PER_SEC / 2;

/// How long the target may run per cycle and how often cycles start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionBudget {
    on_duration_us: u64,
    frequency_hz: u64,
    period_us: u64,
}

impl ExecutionBudget {
    /// Validate raw inputs and derive the cycle period.
    ///
    /// # Errors
    ///
    /// Returns [`ProcclockError::Validation`] if either value is not positive
    /// or the frequency is not below [`MAX_FREQUENCY_HZ`].
    pub fn new(on_duration_us: i64, frequency_hz: i64) -> ProcclockResult<Self> {
        let (Ok(on_duration_us), Ok(frequency_hz)) =
            (u64::try_from(on_duration_us), u64::try_from(frequency_hz))
        else {
            return Err(non_positive());
        };
        if on_duration_us == 0 || frequency_hz == 0 {
            return Err(non_positive());
        }
        if frequency_hz >= MAX_FREQUENCY_HZ {
            return Err(ProcclockError::Validation(format!(
                "frequency must be less than {MAX_FREQUENCY_HZ} Hz, got {frequency_hz}"
            )));
        }

        Ok(Self {
            on_duration_us,
            frequency_hz,
            period_us: MICROS_PER_SEC / frequency_hz,
        })
    }

    /// Microseconds the target should run per cycle.
    #[must_use]
    pub fn on_duration_us(&self) -> u64 {
        self.on_duration_us
    }

    /// Cycles per second.
    #[must_use]
    pub fn frequency_hz(&self) -> u64 {
        self.frequency_hz
    }

    /// Cycle length in microseconds.
    #[must_use]
    pub fn period_us(&self) -> u64 {
        self.period_us
    }

    /// Returns true if `tick` is coarser than the requested on-duration or period.
    ///
    /// The scheduler still runs in that case, it just ticks at the calibrated
    /// granularity instead of the requested one.
    #[must_use]
    pub fn exceeds_precision_of(&self, tick: &CalibratedTick) -> bool {
        tick.tick_us() > self.period_us || tick.tick_us() > self.on_duration_us
    }
}

fn non_positive() -> ProcclockError {
    ProcclockError::Validation("time and frequency need to be positive, non-zero".into())
}

/// Validate a raw process identifier.
///
/// Zero and negative values address process groups in `kill(2)` and are rejected.
///
/// # Errors
///
/// Returns [`ProcclockError::Validation`] for non-positive or out-of-range values.
pub fn validate_pid(raw: i64) -> ProcclockResult<i32> {
    match i32::try_from(raw) {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(ProcclockError::Validation(format!(
            "process ID must be a positive integer, got {raw}"
        ))),
    }
}
