//! A managed-worker pool's idle-worker registry and wake protocol: a fixed
//! roster of OS threads, a lock-free Idle Stack any thread can cheaply
//! poll, and a wake protocol (`try_spawn`/`wakeup`/`idle`) that hands an
//! idle worker a callback to run on its own thread.
//!
//! See `SPEC_FULL.md` for the full design; in short:
//!
//! - [`prepare`]/[`prepare_optional`] build the roster once, the first
//!   time either is called.
//! - [`try_spawn`] opportunistically hands a callback to whichever worker
//!   the Idle Stack's top currently names, or reports `false` without
//!   blocking if none is available.
//! - [`wakeup`] makes sure a given worker is not parked, even if no
//!   callback needs to run (e.g. after publishing work somewhere the
//!   worker polls itself).
//! - [`idle`] is how a worker voluntarily parks until some predicate over
//!   caller-supplied state becomes true.
//! - [`self_id`]/[`all`]/[`is_managed`] answer "who am I"/"who exists"
//!   questions about the roster.
//! - [`shutdown`] (and the process-exit hook registered automatically by
//!   `prepare`) drains every worker and reports any callback panics.

mod error;
mod lifecycle;
mod roster;
mod slot;
mod stack;
mod tagged_index;
mod utils;
mod wake;

use std::cell::Cell;

use once_cell::sync::OnceCell;

pub use error::{PreconditionError, ShutdownError, WorkerPanic};
pub use slot::Callback;

/// A worker's small, process-unique, stable-for-the-process-lifetime id.
/// `0` always denotes the thread that successfully called
/// `prepare`/`prepare_optional`.
pub type WorkerId = usize;

/// The id reserved for the thread that successfully calls
/// `prepare`/`prepare_optional`.
pub const MAIN_ID: WorkerId = roster::MAIN_ID;

static POOL: OnceCell<roster::Roster> = OnceCell::new();

thread_local! {
    static CURRENT_WORKER_ID: Cell<Option<WorkerId>> = Cell::new(None);
}

pub(crate) fn set_current_worker_id(id: WorkerId) {
    CURRENT_WORKER_ID.with(|c| c.set(Some(id)));
}

/// The pool, fail-stopping if `prepare`/`prepare_optional` has not run yet.
fn pool() -> &'static roster::Roster {
    POOL.get()
        .unwrap_or_else(|| utils::fail_stop(&PreconditionError::PoolNotPrepared))
}

/// The pool if it has been prepared, without fail-stopping. Used by the
/// shutdown path, which must be a no-op (not a crash) if `prepare` was
/// never called — e.g. the exit hook firing in a process that linked this
/// crate but never used it.
pub(crate) fn pool_if_ready() -> Option<&'static roster::Roster> {
    POOL.get()
}

/// `num_cpus::get()`, floored at 1 — the same sizing the teacher crate's
/// own global executor uses.
pub fn recommended_worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Build the roster with `num_domains` workers, clamped into
/// `[1, recommended_worker_count()]`. Idempotent: only the first
/// successful call (across every thread that ever calls `prepare` or
/// `prepare_optional`) takes effect; every other call blocks until the
/// winner has finished building the roster, then returns having done
/// nothing further.
pub fn prepare(num_domains: usize) {
    let clamped = num_domains.clamp(1, recommended_worker_count());
    POOL.get_or_init(|| {
        let roster = roster::Roster::build(clamped);
        set_current_worker_id(roster::MAIN_ID);
        lifecycle::register_exit_hook();
        roster
    });
}

/// `prepare`, sized to `recommended_worker_count()` when `num_domains` is
/// `None`.
pub fn prepare_optional(num_domains: Option<usize>) {
    prepare(num_domains.unwrap_or_else(recommended_worker_count));
}

/// The calling thread's worker id. Fail-stops if the calling thread is not
/// a managed worker (i.e. it never won a `prepare` race and was never
/// spawned as a sibling worker).
pub fn self_id() -> WorkerId {
    CURRENT_WORKER_ID
        .with(|c| c.get())
        .unwrap_or_else(|| utils::fail_stop(&PreconditionError::NotAManagedWorker(usize::MAX)))
}

/// Snapshot of every worker id currently in the roster, in sibling-ring
/// order starting at the main id.
pub fn all() -> Vec<WorkerId> {
    pool().all()
}

/// Whether `id` names a worker in the roster.
pub fn is_managed(id: WorkerId) -> bool {
    match POOL.get() {
        Some(roster) => roster.is_managed(id),
        None => false,
    }
}

/// Opportunistically hand `cb` to an idle worker. Returns `true` if some
/// worker accepted it, `false` immediately if none was available or the
/// attempt lost a race — never blocks on user work, never retries.
pub fn try_spawn(cb: Callback) -> bool {
    wake::try_spawn(cb)
}

/// Ensure the worker with id `id` is not parked, per SPEC_FULL.md §4.4.
pub fn wakeup(id: WorkerId) {
    wake::wakeup(id)
}

/// Voluntarily go idle until `until(&ready)` becomes true. Caller MUST be
/// a managed worker thread (see [`self_id`]).
pub fn idle<R>(ready: &R, until: impl Fn(&R) -> bool) {
    wake::idle(ready, until)
}

/// Drain every worker and report any callback panics, in reverse join
/// order. Idempotent with respect to the process-exit hook `prepare`
/// registers: whichever of the two runs first performs the join pass, the
/// other is a no-op that returns `Ok(())`. A no-op if `prepare` was never
/// called.
pub fn shutdown() -> Result<(), ShutdownError> {
    lifecycle::drain_once(pool_if_ready())
}
