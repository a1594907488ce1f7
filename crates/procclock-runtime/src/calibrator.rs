//! Clock calibration.
//!
//! Sleep primitives overshoot their request by a platform-dependent margin.
//! Instead of trusting the nominal interval, the calibrator measures what a
//! minimal sleep really costs and hands that to the scheduler as its tick.

use crate::clock::{ClockSource, MonotonicClock};
use procclock_common::budget::ExecutionBudget;
use procclock_common::config::CalibrationConfig;
use procclock_common::error::{ProcclockError, ProcclockResult};
use procclock_common::time::CalibratedTick;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Measures the real length of a nominal sleep.
#[derive(Debug)]
pub struct Calibrator<C: ClockSource> {
    clock: C,
    iterations: u32,
    nominal_sleep: Duration,
}

impl Calibrator<MonotonicClock> {
    /// Create a calibrator on the system monotonic clock.
    #[must_use]
    pub fn from_config(config: &CalibrationConfig) -> Self {
        Self::new(MonotonicClock, config.iterations, config.nominal_sleep)
    }
}

impl<C: ClockSource> Calibrator<C> {
    /// Create a calibrator on an arbitrary clock.
    pub fn new(clock: C, iterations: u32, nominal_sleep: Duration) -> Self {
        Self {
            clock,
            iterations,
            nominal_sleep,
        }
    }

    /// Run the measurement and derive the tick.
    ///
    /// # Errors
    ///
    /// - [`ProcclockError::Config`] if the iteration count is zero.
    /// - [`ProcclockError::Clock`] if the clock cannot be read.
    /// - [`ProcclockError::Calibration`] if the averaged tick is below 1us.
    pub fn calibrate(&mut self) -> ProcclockResult<CalibratedTick> {
        if self.iterations == 0 {
            return Err(ProcclockError::Config(
                "calibration needs at least one iteration".into(),
            ));
        }

        debug!(
            iterations = self.iterations,
            nominal_ns = self.nominal_sleep.as_nanos(),
            "Calibrating sleep granularity"
        );

        let mut total_ns: u64 = 0;
        for _ in 0..self.iterations {
            let start = self.clock.now()?;
            self.clock.sleep(self.nominal_sleep);
            let end = self.clock.now()?;
            total_ns = total_ns.saturating_add(end.nanos_since(&start));
        }

        let tick_ns = total_ns / u64::from(self.iterations);
        let tick = CalibratedTick::from_nanos(tick_ns)?;

        info!(
            tick = %tick,
            tick_ns = tick.tick_ns(),
            tick_us = tick.tick_us(),
            "Clock calibrated"
        );
        Ok(tick)
    }
}

/// Warn when the tick is coarser than the requested timing.
///
/// This is degraded precision, not an error. Returns whether it warned.
pub fn warn_if_imprecise(budget: &ExecutionBudget, tick: &CalibratedTick) -> bool {
    if !budget.exceeds_precision_of(tick) {
        return false;
    }
    warn!(
        tick_us = tick.tick_us(),
        on_duration_us = budget.on_duration_us(),
        period_us = budget.period_us(),
        "Requirements too high for system, ticking approx. every {} us instead",
        tick.tick_us()
    );
    true
}
