//! The Wake Protocol: `try_spawn`, `wakeup`, `idle`, and the worker main
//! loop, composed from the Idle Stack and the Roster.

use crate::error::PreconditionError;
use crate::slot::{Callback, Drained};
use crate::stack::Pop;
use crate::{pool, WorkerId};

#[cfg(feature = "log")]
macro_rules! wtrace {
    ($($arg:tt)*) => { log::trace!($($arg)*) };
}
#[cfg(not(feature = "log"))]
macro_rules! wtrace {
    ($($arg:tt)*) => {};
}

/// "Opportunistically hand `cb` to an idle worker; return `false`
/// immediately if none appears available." Never loops on a failed CAS:
/// opportunistic semantics are part of the contract, per SPEC_FULL.md §4.4.
pub fn try_spawn(cb: Callback) -> bool {
    let roster = pool();
    if !roster.idle_stack().has_idle() {
        return false;
    }
    match roster.idle_stack().try_pop(roster.slots()) {
        Pop::Empty | Pop::Contended => false,
        Pop::Claimed(id) => {
            let accepted = roster.slot(id).publish(cb);
            wtrace!("try_spawn: claimed worker {}, publish accepted={}", id, accepted);
            accepted
        }
    }
}

/// "Ensure the worker with id `id` is not parked." Installs a no-op if the
/// mailbox was empty; does nothing if it was already occupied. Does not
/// pop the worker from the Idle Stack — see SPEC_FULL.md §4.4.
pub fn wakeup(id: WorkerId) {
    let roster = pool();
    if !roster.is_managed(id) {
        crate::utils::fail_stop(&PreconditionError::UnknownWorkerId(id, roster.len()));
    }
    let woke = roster.slot(id).wakeup();
    wtrace!("wakeup({}): installed no-op={}", id, woke);
}

/// Voluntarily go idle until `until(&ready)` becomes true, per
/// SPEC_FULL.md §4.4. `ready` is opaque state threaded through to `until`;
/// `until` is re-checked under the slot's own lock on every wakeup so a
/// producer flipping `ready` and calling `wakeup` between our outer check
/// and the park can never be missed.
pub fn idle<R>(ready: &R, until: impl Fn(&R) -> bool) {
    let id = crate::self_id();
    let roster = pool();
    let slot = roster.slot(id);

    while !until(ready) {
        // `wakeup` never pops its target off the stack, so after draining
        // a wakeup-installed no-op this slot may still be linked; push
        // only if it isn't, or the slot ends up pointing at itself.
        if !slot.is_linked() {
            roster.idle_stack().push(slot);
        }
        let predicate = || until(ready);
        match slot.wait_and_drain(Some(&predicate)) {
            Drained::Nothing => {
                // Either `until` became true with nothing in the mailbox,
                // or (practically impossible with this slot's own lock
                // held throughout) a spurious wake; either way the outer
                // loop re-checks `until` itself.
            }
            Drained::Run(cb) => cb(id),
            Drained::Terminate => return,
        }
    }
}

/// A freshly spawned worker's main loop (SPEC_FULL.md §4.4 "Worker main
/// loop"): push self idle, block until the mailbox is non-empty, drain and
/// run, forever, until the terminate signal arrives.
pub fn worker_main(id: WorkerId) {
    let roster = pool();
    let slot = roster.slot(id);

    loop {
        // See `idle`: skip the push if `wakeup` left us still linked.
        if !slot.is_linked() {
            roster.idle_stack().push(slot);
        }
        match slot.wait_and_drain(None) {
            Drained::Nothing => unreachable!("wait_and_drain(None) only returns once non-empty"),
            Drained::Run(cb) => {
                wtrace!("worker {}: running callback", id);
                cb(id);
            }
            Drained::Terminate => {
                wtrace!("worker {}: terminating", id);
                return;
            }
        }
    }
}
