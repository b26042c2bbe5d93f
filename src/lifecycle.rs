//! Lifecycle: the process-exit hook and the idempotent, dual-triggered
//! drain routine it shares with an explicit `shutdown()` call
//! (SPEC_FULL.md §4.6, §10.6).

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ShutdownError;
use crate::roster::Roster;

static SHUTDOWN_STARTED: AtomicBool = AtomicBool::new(false);

/// Register the process-exit hook. Called exactly once, by whichever
/// `prepare`/`prepare_optional` call wins the one-shot init race.
pub(crate) fn register_exit_hook() {
    unsafe {
        libc::atexit(run_exit_hook);
    }
}

/// The `extern "C"` trampoline `libc::atexit` calls. Must not unwind
/// across the FFI boundary, so the whole drain pass runs inside
/// `catch_unwind`; a panic here is logged and swallowed rather than
/// aborting the exit sequence the host process is already in the middle
/// of.
extern "C" fn run_exit_hook() {
    let _ = std::panic::catch_unwind(|| {
        let _ = drain_once(crate::pool_if_ready());
    });
}

/// Shared by the exit hook and the public `shutdown()` entry point: the
/// first caller performs the join pass and reports its result, every
/// later caller (on either path) is a no-op that reports success,
/// matching the "idempotent, dual-triggered" resolution in
/// SPEC_FULL.md §10.6.
pub(crate) fn drain_once(roster: Option<&'static Roster>) -> Result<(), ShutdownError> {
    let roster = match roster {
        Some(roster) => roster,
        None => return Ok(()), // never prepared; nothing to shut down
    };

    if SHUTDOWN_STARTED
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Ok(());
    }

    #[cfg(feature = "log")]
    log::debug!("rosterpool: draining {} worker(s)", roster.len().saturating_sub(1));

    let panics = roster.drain();
    if panics.is_empty() {
        Ok(())
    } else {
        #[cfg(feature = "log")]
        log::warn!("rosterpool: {} worker callback(s) panicked during shutdown", panics.len());
        Err(ShutdownError(panics))
    }
}
