//! Optional real-time setup for the throttler itself.
//!
//! A throttler preempted by ordinary load ticks late, which stretches the
//! target's on-time. Locking memory and running under `SCHED_FIFO`/`SCHED_RR`
//! keeps the tick close to its calibrated length. Missing privileges are
//! reported and tolerated.

use procclock_common::config::{RealtimeConfig, SchedPolicy};
use procclock_common::error::{ProcclockError, ProcclockResult};
use tracing::{debug, info, warn};

/// Result of real-time initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RealtimeStatus {
    /// Whether memory was locked successfully.
    pub memory_locked: bool,
    /// Applied scheduler policy.
    pub scheduler_policy: Option<SchedPolicy>,
    /// Applied scheduler priority.
    pub scheduler_priority: Option<u8>,
}

/// Apply the real-time configuration to the current process.
///
/// Run this before calibration so the measured tick reflects the final
/// scheduling class.
///
/// # Errors
///
/// Returns [`ProcclockError::Config`] for failures other than missing privileges.
pub fn init_realtime(config: &RealtimeConfig) -> ProcclockResult<RealtimeStatus> {
    if !config.enabled {
        debug!("Real-time scheduling disabled in configuration");
        return Ok(RealtimeStatus::default());
    }

    let memory_locked = if config.lock_memory {
        lock_memory()?
    } else {
        false
    };

    let (scheduler_policy, scheduler_priority) = set_scheduler(config.policy, config.priority)?;

    let status = RealtimeStatus {
        memory_locked,
        scheduler_policy,
        scheduler_priority,
    };
    info!(?status, "Real-time initialization complete");
    Ok(status)
}

/// Lock all current and future memory pages.
#[cfg(target_os = "linux")]
fn lock_memory() -> ProcclockResult<bool> {
    use nix::sys::mman::{mlockall, MlockAllFlags};

    match mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        Ok(()) => {
            info!("Memory locked");
            Ok(true)
        }
        Err(nix::errno::Errno::EPERM | nix::errno::Errno::ENOMEM) => {
            warn!("mlockall not permitted (missing CAP_IPC_LOCK or RLIMIT_MEMLOCK too low)");
            Ok(false)
        }
        Err(e) => Err(ProcclockError::Config(format!("mlockall failed: {e}"))),
    }
}

#[cfg(not(target_os = "linux"))]
fn lock_memory() -> ProcclockResult<bool> {
    warn!("mlockall not available on this platform");
    Ok(false)
}

/// Set real-time scheduler policy and priority.
#[cfg(target_os = "linux")]
fn set_scheduler(policy: SchedPolicy, priority: u8) -> ProcclockResult<(Option<SchedPolicy>, Option<u8>)> {
    let linux_policy = match policy {
        SchedPolicy::Fifo => libc::SCHED_FIFO,
        SchedPolicy::Rr => libc::SCHED_RR,
        SchedPolicy::Other => return Ok((Some(SchedPolicy::Other), None)),
    };

    let priority = priority.clamp(1, 99);
    let param = libc::sched_param {
        sched_priority: i32::from(priority),
    };

    // SAFETY: pid 0 targets the calling process; `param` outlives the call.
    let result = unsafe { libc::sched_setscheduler(0, linux_policy, &param) };
    if result == -1 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            warn!(?policy, priority, "sched_setscheduler not permitted (missing CAP_SYS_NICE)");
            return Ok((None, None));
        }
        return Err(ProcclockError::Config(format!("sched_setscheduler failed: {err}")));
    }

    info!(?policy, priority, "Real-time scheduler configured");
    Ok((Some(policy), Some(priority)))
}

#[cfg(not(target_os = "linux"))]
fn set_scheduler(policy: SchedPolicy, priority: u8) -> ProcclockResult<(Option<SchedPolicy>, Option<u8>)> {
    warn!(?policy, priority, "Real-time scheduling not available on this platform");
    Ok((None, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_rt() {
        let status = init_realtime(&RealtimeConfig::default()).unwrap();
        assert_eq!(status, RealtimeStatus::default());
    }

    #[test]
    fn test_other_policy_needs_no_privileges() {
        let config = RealtimeConfig {
            enabled: true,
            policy: SchedPolicy::Other,
            ..Default::default()
        };
        let status = init_realtime(&config).unwrap();
        assert!(!status.memory_locked);
        assert_eq!(status.scheduler_policy, Some(SchedPolicy::Other));
        assert_eq!(status.scheduler_priority, None);
    }
}
