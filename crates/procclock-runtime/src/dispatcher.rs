//! Signal dispatch to the throttled process.
//!
//! Each operation is a single `kill(2)` call. Failures are classified but
//! never retried; the caller decides whether they are fatal.

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use procclock_common::error::DispatchError;
use procclock_common::state::ControlAction;

/// Process-control operations procclock needs.
pub trait ProcessControl {
    /// Continue a stopped process (`SIGCONT`).
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the signal could not be delivered.
    fn resume(&self, pid: i32) -> Result<(), DispatchError>;

    /// Stop a process (`SIGSTOP`).
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the signal could not be delivered.
    fn suspend(&self, pid: i32) -> Result<(), DispatchError>;

    /// Check that a process exists and may be signalled (null signal).
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] if the process is gone or not signallable.
    fn probe(&self, pid: i32) -> Result<(), DispatchError>;
}

/// [`ProcessControl`] backed by real POSIX signals.
///
/// Stateless and allocation-free, so it is usable from a signal handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalDispatcher;

impl SignalDispatcher {
    fn send(pid: i32, signal: Option<Signal>, action: ControlAction) -> Result<(), DispatchError> {
        kill(Pid::from_raw(pid), signal).map_err(|errno| classify(pid, action, errno))
    }
}

impl ProcessControl for SignalDispatcher {
    fn resume(&self, pid: i32) -> Result<(), DispatchError> {
        Self::send(pid, Some(Signal::SIGCONT), ControlAction::Resume)
    }

    fn suspend(&self, pid: i32) -> Result<(), DispatchError> {
        Self::send(pid, Some(Signal::SIGSTOP), ControlAction::Suspend)
    }

    fn probe(&self, pid: i32) -> Result<(), DispatchError> {
        Self::send(pid, None, ControlAction::Probe)
    }
}

/// Map a `kill(2)` errno onto a [`DispatchError`].
#[must_use]
pub fn classify(pid: i32, action: ControlAction, errno: Errno) -> DispatchError {
    match errno {
        Errno::ESRCH => DispatchError::TargetGone { pid, action },
        Errno::EPERM => DispatchError::PermissionDenied { pid, action },
        other => DispatchError::Os {
            pid,
            action,
            errno: other as i32,
        },
    }
}
