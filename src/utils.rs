//! Small helpers shared across modules.

/// Fail-stop: log `err` at `error!` level (when the `tracing` feature is
/// enabled) and abort the process.
///
/// This is the teacher crate's own `abort_on_panic` idiom, repurposed:
/// the teacher uses a guarded abort to keep one panicking task from
/// corrupting the whole executor; this crate reserves the same guarded
/// abort for *precondition* violations specifically (SPEC_FULL.md §10.3)
/// — a bug in the calling code, never a user callback's own panic, which
/// must propagate and be joinable per SPEC_FULL.md §7.2.
pub fn fail_stop(err: &dyn std::error::Error) -> ! {
    #[cfg(feature = "log")]
    log::error!("rosterpool: fail-stop: {}", err);
    #[cfg(not(feature = "log"))]
    let _ = err;

    std::process::abort()
}
