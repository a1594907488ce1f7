//! Handle to the throttled process.
//!
//! The running flag is shared between the duty-cycle loop and the interrupt
//! handler. It is an atomic so the handler, which runs on the same thread
//! between any two instructions of the loop, always reads a whole value.

use crate::dispatcher::ProcessControl;
use procclock_common::error::DispatchError;
use procclock_common::state::RunState;
use std::sync::atomic::{AtomicBool, Ordering};

/// Target process identifier plus its last known run state.
#[derive(Debug)]
pub struct TargetProcess {
    pid: i32,
    running: AtomicBool,
}

impl TargetProcess {
    /// Create a handle for `pid`, assumed to be running.
    #[must_use]
    pub const fn new(pid: i32) -> Self {
        Self {
            pid,
            running: AtomicBool::new(true),
        }
    }

    /// Target process identifier.
    #[must_use]
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Whether the last delivered signal left the target running.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> RunState {
        RunState::from_running(self.is_running())
    }

    /// Send `SIGCONT` and mark the target running on success.
    ///
    /// # Errors
    ///
    /// Returns the dispatch failure; the flag is left unchanged.
    pub fn resume_with<C: ProcessControl + ?Sized>(&self, control: &C) -> Result<(), DispatchError> {
        control.resume(self.pid)?;
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Send `SIGSTOP` and mark the target stopped.
    ///
    /// The flag is cleared before the signal goes out, so an interrupt landing
    /// between the two sees a stopped target and resumes it. On failure the
    /// flag is restored.
    ///
    /// # Errors
    ///
    /// Returns the dispatch failure.
    pub fn suspend_with<C: ProcessControl + ?Sized>(&self, control: &C) -> Result<(), DispatchError> {
        self.running.store(false, Ordering::Release);
        if let Err(e) = control.suspend(self.pid) {
            self.running.store(true, Ordering::Release);
            return Err(e);
        }
        Ok(())
    }
}
