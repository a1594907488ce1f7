use crate::state::ControlAction;
use thiserror::Error;

/// procclock error types covering startup validation, calibration, and signal delivery.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcclockError {
    /// Malformed or out-of-range input, or a target that does not exist at startup.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The monotonic clock could not be read.
    #[error("clock error: {0}")]
    Clock(String),

    /// The measured tick is too fine to schedule with.
    #[error("calibration failed: measured interval of {tick_ns}ns is below 1us")]
    Calibration {
        /// Averaged nanoseconds per nominal sleep.
        tick_ns: u64,
    },

    /// A process-control signal could not be delivered.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Failure to deliver a resume, suspend, or probe signal to the target.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The target no longer exists (`ESRCH`).
    #[error("{action} of process {pid} failed: no such process")]
    TargetGone {
        /// Target process identifier.
        pid: i32,
        /// Operation that failed.
        action: ControlAction,
    },

    /// The caller may not signal the target (`EPERM`).
    #[error("{action} of process {pid} failed: permission denied")]
    PermissionDenied {
        /// Target process identifier.
        pid: i32,
        /// Operation that failed.
        action: ControlAction,
    },

    /// Any other `kill(2)` failure.
    #[error("{action} of process {pid} failed: os error {errno}")]
    Os {
        /// Target process identifier.
        pid: i32,
        /// Operation that failed.
        action: ControlAction,
        /// Raw errno value.
        errno: i32,
    },
}

impl DispatchError {
    /// Process the failed signal was addressed to.
    #[must_use]
    pub fn pid(&self) -> i32 {
        match *self {
            Self::TargetGone { pid, .. } | Self::PermissionDenied { pid, .. } | Self::Os { pid, .. } => {
                pid
            }
        }
    }

    /// Operation that failed.
    #[must_use]
    pub fn action(&self) -> ControlAction {
        match *self {
            Self::TargetGone { action, .. }
            | Self::PermissionDenied { action, .. }
            | Self::Os { action, .. } => action,
        }
    }

    /// Returns true if the target has exited.
    #[must_use]
    pub fn is_target_gone(&self) -> bool {
        matches!(self, Self::TargetGone { .. })
    }
}

/// Convenience type alias for procclock operations.
pub type ProcclockResult<T> = Result<T, ProcclockError>;
