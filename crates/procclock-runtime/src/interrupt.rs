//! `SIGINT` handling.
//!
//! If procclock is interrupted while the target is suspended, the target
//! would stay stopped forever. The handler resumes it in that case and then
//! terminates the process. It never returns into the duty-cycle loop.
//!
//! Everything reachable from the handler is async-signal-safe: one atomic
//! load of the running flag, at most one `kill(2)`, then `_exit(2)`. No
//! logging, no allocation, no locks.

use crate::dispatcher::{ProcessControl, SignalDispatcher};
use crate::target::TargetProcess;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use procclock_common::error::{ProcclockError, ProcclockResult};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use tracing::debug;

/// Target the installed handler acts on. Only ever set from a `&'static`.
static INTERRUPT_TARGET: AtomicPtr<TargetProcess> = AtomicPtr::new(ptr::null_mut());

/// What the interrupt handler did before terminating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    /// Target was running; nothing sent.
    AlreadyRunning,
    /// Target was stopped and has been resumed.
    Resumed,
    /// Target was stopped and the resume failed. Ignored at shutdown.
    ResumeFailed,
}

/// The handler's corrective action, separated from process termination.
///
/// Reads the running flag once and dispatches at most one resume.
pub fn on_interrupt<C: ProcessControl + ?Sized>(target: &TargetProcess, control: &C) -> InterruptOutcome {
    if target.is_running() {
        return InterruptOutcome::AlreadyRunning;
    }
    match target.resume_with(control) {
        Ok(()) => InterruptOutcome::Resumed,
        Err(_) => InterruptOutcome::ResumeFailed,
    }
}

/// Install the `SIGINT` handler for `target`.
///
/// Must be called before the duty-cycle loop starts suspending the target.
///
/// # Errors
///
/// Returns [`ProcclockError::Config`] if `sigaction` fails.
pub fn install_interrupt_handler(target: &'static TargetProcess) -> ProcclockResult<()> {
    INTERRUPT_TARGET.store(ptr::from_ref(target).cast_mut(), Ordering::Release);

    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::empty(),
        SigSet::empty(),
    );

    // SAFETY: the handler only performs async-signal-safe operations.
    unsafe { sigaction(Signal::SIGINT, &action) }
        .map_err(|e| ProcclockError::Config(format!("failed to install SIGINT handler: {e}")))?;

    debug!(pid = target.pid(), "SIGINT handler installed");
    Ok(())
}

extern "C" fn handle_sigint(_: libc::c_int) {
    let target = INTERRUPT_TARGET.load(Ordering::Acquire);

    // SAFETY: the pointer is null or was derived from a `&'static TargetProcess`.
    if let Some(target) = unsafe { target.as_ref() } {
        let _ = on_interrupt(target, &SignalDispatcher);
    }

    // SAFETY: `_exit` is async-signal-safe and does not return.
    unsafe { libc::_exit(0) }
}
