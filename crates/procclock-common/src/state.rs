//! Run state of the throttled target.
//!
//! The target alternates between two states:
//! RUNNING → STOPPED → RUNNING → ...
//!
//! Only a successful `SIGSTOP` moves it to STOPPED and only a
//! successful `SIGCONT` moves it back to RUNNING.

use std::fmt;

/// Run state of the target process as last observed by procclock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunState {
    /// Target has been resumed (or was never suspended).
    #[default]
    Running,
    /// Target has been suspended.
    Stopped,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

impl RunState {
    /// Map the shared `is_running` flag to a state.
    #[must_use]
    pub fn from_running(is_running: bool) -> Self {
        if is_running {
            Self::Running
        } else {
            Self::Stopped
        }
    }

    /// Returns true for [`RunState::Running`].
    #[must_use]
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

/// Process-control operation procclock performs on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    /// `SIGCONT`.
    Resume,
    /// `SIGSTOP`.
    Suspend,
    /// Null signal, existence check only.
    Probe,
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resume => write!(f, "resume"),
            Self::Suspend => write!(f, "suspend"),
            Self::Probe => write!(f, "probe"),
        }
    }
}
