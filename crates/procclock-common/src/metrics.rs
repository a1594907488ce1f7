//! Run statistics for the duty-cycle loop.
//!
//! Plain counters, updated once per tick without allocating.

use std::time::Duration;

/// Counters collected while throttling a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Total ticks executed.
    ticks: u64,
    /// Ticks slept with the target running.
    running_ticks: u64,
    /// Successful resume signals.
    resumes: u64,
    /// Successful suspend signals.
    suspends: u64,
    /// Scheduled elapsed time in microseconds.
    elapsed_us: u64,
}

impl RunStats {
    /// Create empty statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed tick of `tick_us` microseconds.
    ///
    /// `was_running` is the target state while the tick slept.
    pub fn record_tick(&mut self, was_running: bool, tick_us: u64) {
        self.ticks += 1;
        if was_running {
            self.running_ticks += 1;
        }
        self.elapsed_us = self.elapsed_us.saturating_add(tick_us);
    }

    /// Record a successful resume.
    pub fn record_resume(&mut self) {
        self.resumes += 1;
    }

    /// Record a successful suspend.
    pub fn record_suspend(&mut self) {
        self.suspends += 1;
    }

    /// Total ticks executed.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Successful resume signals.
    #[must_use]
    pub fn resumes(&self) -> u64 {
        self.resumes
    }

    /// Successful suspend signals.
    #[must_use]
    pub fn suspends(&self) -> u64 {
        self.suspends
    }

    /// Scheduled elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.elapsed_us)
    }

    /// Fraction of ticks the target spent running, if any tick ran.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duty_ratio(&self) -> Option<f64> {
        if self.ticks == 0 {
            None
        } else {
            Some(self.running_ticks as f64 / self.ticks as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = RunStats::new();
        assert_eq!(stats.ticks(), 0);
        assert_eq!(stats.duty_ratio(), None);
        assert_eq!(stats.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_record_ticks() {
        let mut stats = RunStats::new();
        stats.record_resume();
        for _ in 0..3 {
            stats.record_tick(true, 100);
        }
        stats.record_suspend();
        stats.record_tick(false, 100);

        assert_eq!(stats.ticks(), 4);
        assert_eq!(stats.resumes(), 1);
        assert_eq!(stats.suspends(), 1);
        assert_eq!(stats.elapsed(), Duration::from_micros(400));
        assert_eq!(stats.duty_ratio(), Some(0.75));
    }
}
