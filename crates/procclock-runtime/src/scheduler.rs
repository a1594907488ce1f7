//! Duty-cycle scheduler.
//!
//! Every tick performs exactly one of three actions, checked in this order:
//! 1. Resume the target if it is stopped and a full period has passed since
//!    the last resume
//! 2. Suspend the target if it is running and has used its on-duration
//! 3. Otherwise, if running, add one tick to its runtime
//!
//! then sleeps for the calibrated tick and advances the elapsed time by one
//! tick. Time is counted in ticks rather than read from a clock, so the
//! scheduler stays consistent with the calibration even when sleeps jitter.

use crate::clock::{MonotonicClock, Sleeper};
use crate::dispatcher::{ProcessControl, SignalDispatcher};
use crate::target::TargetProcess;
use procclock_common::budget::ExecutionBudget;
use procclock_common::config::SchedulerConfig;
use procclock_common::error::DispatchError;
use procclock_common::metrics::RunStats;
use procclock_common::time::CalibratedTick;
use tracing::{debug, info, trace, warn};

/// The action taken on one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// STOPPED → RUNNING.
    Resumed,
    /// RUNNING → STOPPED.
    Suspended,
    /// Running; runtime advanced by one tick.
    Accumulated,
    /// Stopped; waiting for the next period.
    Waited,
}

/// Why the scheduler loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A signal could not be delivered; the target is treated as gone.
    TargetLost(DispatchError),
    /// The configured tick limit was reached and the target left running.
    TickLimit,
}

/// Elapsed-time bookkeeping owned by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerState {
    /// On-time accumulated since the last resume.
    pub runtime_us: u64,
    /// Total scheduled time since start.
    pub us_since_start: u64,
    /// `us_since_start` at the last resume.
    pub last_go_us: u64,
}

/// Drives the target through resume/suspend cycles.
pub struct DutyCycleScheduler<'t, C: ProcessControl, S: Sleeper> {
    target: &'t TargetProcess,
    budget: ExecutionBudget,
    tick: CalibratedTick,
    control: C,
    sleeper: S,
    state: SchedulerState,
    stats: RunStats,
    tick_limit: Option<u64>,
    stats_interval: u64,
}

impl<'t> DutyCycleScheduler<'t, SignalDispatcher, MonotonicClock> {
    /// Create a scheduler that signals the real target and sleeps on the monotonic clock.
    pub fn with_defaults(target: &'t TargetProcess, budget: ExecutionBudget, tick: CalibratedTick) -> Self {
        Self::new(target, budget, tick, SignalDispatcher, MonotonicClock)
    }
}

impl<'t, C: ProcessControl, S: Sleeper> DutyCycleScheduler<'t, C, S> {
    /// Create a scheduler with explicit process control and sleep backends.
    pub fn new(
        target: &'t TargetProcess,
        budget: ExecutionBudget,
        tick: CalibratedTick,
        control: C,
        sleeper: S,
    ) -> Self {
        Self {
            target,
            budget,
            tick,
            control,
            sleeper,
            state: SchedulerState::default(),
            stats: RunStats::new(),
            tick_limit: None,
            stats_interval: 0,
        }
    }

    /// Apply loop settings from configuration.
    #[must_use]
    pub fn with_config(mut self, config: &SchedulerConfig) -> Self {
        self.tick_limit = config.tick_limit();
        self.stats_interval = config.stats_interval;
        self
    }

    /// Stop after `limit` ticks.
    #[must_use]
    pub fn tick_limit(mut self, limit: u64) -> Self {
        self.tick_limit = Some(limit);
        self
    }

    /// Current elapsed-time bookkeeping.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Statistics collected so far.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Decide and perform this tick's action without sleeping.
    ///
    /// # Errors
    ///
    /// Returns the dispatch failure if a resume or suspend could not be delivered.
    pub fn step(&mut self) -> Result<TickAction, DispatchError> {
        let running = self.target.is_running();

        if !running && self.state.us_since_start - self.state.last_go_us >= self.budget.period_us() {
            self.target.resume_with(&self.control)?;
            self.state.last_go_us = self.state.us_since_start;
            self.state.runtime_us = 0;
            self.stats.record_resume();
            Ok(TickAction::Resumed)
        } else if running && self.state.runtime_us >= self.budget.on_duration_us() {
            self.target.suspend_with(&self.control)?;
            self.stats.record_suspend();
            Ok(TickAction::Suspended)
        } else if running {
            self.state.runtime_us += self.tick.tick_us();
            Ok(TickAction::Accumulated)
        } else {
            Ok(TickAction::Waited)
        }
    }

    /// Run one full tick: act, sleep, advance time.
    ///
    /// # Errors
    ///
    /// Returns the dispatch failure from [`Self::step`]; no sleep happens in that case.
    pub fn run_tick(&mut self) -> Result<TickAction, DispatchError> {
        let action = self.step()?;

        self.sleeper.sleep(self.tick.as_duration());
        self.state.us_since_start += self.tick.tick_us();
        self.stats
            .record_tick(self.target.is_running(), self.tick.tick_us());

        trace!(
            ?action,
            state = %self.target.state(),
            us_since_start = self.state.us_since_start,
            runtime_us = self.state.runtime_us,
            "Tick complete"
        );
        Ok(action)
    }

    /// Run until the target is lost or the tick limit is reached.
    ///
    /// Without a tick limit this only returns when a signal fails.
    pub fn run(&mut self) -> RunOutcome {
        info!(
            pid = self.target.pid(),
            on_duration_us = self.budget.on_duration_us(),
            period_us = self.budget.period_us(),
            tick_us = self.tick.tick_us(),
            "Entering duty-cycle loop"
        );

        loop {
            if self.tick_limit.is_some_and(|limit| self.stats.ticks() >= limit) {
                return self.finish_at_limit();
            }

            if let Err(e) = self.run_tick() {
                warn!(
                    pid = e.pid(),
                    action = %e.action(),
                    state = %self.target.state(),
                    error = %e,
                    target_gone = e.is_target_gone(),
                    "Lost process"
                );
                self.log_stats();
                return RunOutcome::TargetLost(e);
            }

            if self.stats_interval > 0 && self.stats.ticks() % self.stats_interval == 0 {
                self.log_stats();
            }
        }
    }

    /// Leave the target running and report the limit.
    fn finish_at_limit(&mut self) -> RunOutcome {
        info!(ticks = self.stats.ticks(), "Tick limit reached");

        if !self.target.is_running() {
            debug!(pid = self.target.pid(), "Resuming target before exit");
            if let Err(e) = self.target.resume_with(&self.control) {
                warn!(pid = e.pid(), state = %self.target.state(), error = %e, "Lost process");
                self.log_stats();
                return RunOutcome::TargetLost(e);
            }
            self.stats.record_resume();
        }

        self.log_stats();
        RunOutcome::TickLimit
    }

    fn log_stats(&self) {
        info!(
            ticks = self.stats.ticks(),
            resumes = self.stats.resumes(),
            suspends = self.stats.suspends(),
            elapsed_ms = self.stats.elapsed().as_millis(),
            duty_ratio = self.stats.duty_ratio().unwrap_or(0.0),
            "Run statistics"
        );
    }
}
