//! Worker Slot: the per-worker record owning a single-slot mailbox and the
//! mutex/condvar pair a worker parks on.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Condvar, Mutex};

use crossbeam_utils::CachePadded;

use crate::tagged_index::NONE;
use crate::WorkerId;

/// A pending unit of work: `(worker_id) -> ()`. May itself block, suspend,
/// or run arbitrarily long; the core never looks inside it.
pub type Callback = Box<dyn FnOnce(WorkerId) + Send + 'static>;

/// What a Worker Slot's mailbox currently holds.
enum Mailbox {
    Empty,
    Callback(Callback),
    /// The distinguished shutdown signal. Kept as its own variant (rather
    /// than relying on a callback that panics/unwinds) so the worker main
    /// loop can tell "ordinary shutdown" apart from "a user callback
    /// panicked" without catching unwinds on every iteration.
    Terminate,
}

impl Mailbox {
    fn is_empty(&self) -> bool {
        matches!(self, Mailbox::Empty)
    }
}

/// What a worker should do after draining its mailbox.
pub enum Drained {
    Nothing,
    Run(Callback),
    Terminate,
}

/// Per-worker record. Exactly one OS thread owns a given slot for the
/// lifetime of the process.
pub struct Slot {
    id: WorkerId,

    // Guards `Mailbox`; the bound condvar is what a parked worker waits on.
    mailbox: Mutex<Mailbox>,
    condvar: Condvar,

    /// Scratch field: the next idle worker below this one on the Idle
    /// Stack. Meaningful only while this slot is linked into the stack;
    /// written by this slot's own `push`, read by whichever producer's
    /// `try_pop` claims it next. Padded so that a producer reading this
    /// field doesn't bounce a cache line shared with the mailbox mutex.
    next_idx: CachePadded<AtomicU32>,

    /// Whether this slot is currently reachable from `top_idle`. Set by
    /// this slot's own `IdleStack::push`, cleared by whichever producer's
    /// `IdleStack::try_pop` claims it. `wakeup` never touches it.
    linked: AtomicBool,
}

impl Slot {
    pub fn new(id: WorkerId) -> Slot {
        Slot {
            id,
            mailbox: Mutex::new(Mailbox::Empty),
            condvar: Condvar::new(),
            next_idx: CachePadded::new(AtomicU32::new(NONE)),
            linked: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub(crate) fn next_idx(&self) -> u32 {
        self.next_idx.load(Ordering::Relaxed)
    }

    pub(crate) fn set_next_idx(&self, next: u32) {
        self.next_idx.store(next, Ordering::Relaxed);
    }

    /// Whether this slot is currently linked into the Idle Stack.
    pub(crate) fn is_linked(&self) -> bool {
        self.linked.load(Ordering::Relaxed)
    }

    pub(crate) fn set_linked(&self, linked: bool) {
        self.linked.store(linked, Ordering::Relaxed);
    }

    /// Caller is any thread. Fill an empty mailbox with `cb` and wake the
    /// owner; return `false` without touching anything if the mailbox was
    /// already occupied (the worker has already been claimed by someone
    /// else, or `wakeup` raced ahead of us).
    pub fn publish(&self, cb: Callback) -> bool {
        let mut mailbox = self.mailbox.lock().unwrap();
        if !mailbox.is_empty() {
            return false;
        }
        *mailbox = Mailbox::Callback(cb);
        drop(mailbox);
        self.condvar.notify_one();
        true
    }

    /// Ensure the mailbox is non-empty, installing a no-op if it was empty.
    /// Returns `true` if the no-op was the one installed (i.e. this call is
    /// the one that actually woke the worker up), `false` if some other
    /// callback was already waiting and this call was a no-op itself.
    pub fn wakeup(&self) -> bool {
        let mut mailbox = self.mailbox.lock().unwrap();
        if !mailbox.is_empty() {
            return false;
        }
        *mailbox = Mailbox::Callback(Box::new(|_| {}));
        drop(mailbox);
        self.condvar.notify_one();
        true
    }

    /// Force-publish the terminate signal, bypassing the "mailbox already
    /// full" rejection: shutdown always wins over whatever was pending.
    pub(crate) fn force_terminate(&self) {
        let mut mailbox = self.mailbox.lock().unwrap();
        *mailbox = Mailbox::Terminate;
        drop(mailbox);
        self.condvar.notify_one();
    }

    /// Block until the mailbox is non-empty, or until `until` (re-checked
    /// under the lock on every wakeup) becomes true, then drain it.
    ///
    /// When `until` is `None` this blocks unconditionally on the mailbox,
    /// which is the shape the worker main loop needs. When `Some`, this is
    /// the shape `idle(ready, until)` needs: the outer caller re-checks
    /// `until` between calls.
    pub(crate) fn wait_and_drain(&self, until: Option<&dyn Fn() -> bool>) -> Drained {
        let mut mailbox = self.mailbox.lock().unwrap();
        // Exit the wait as soon as either the mailbox has something for us
        // or the caller's predicate is satisfied; `until` is re-checked
        // under the lock on every wakeup so a producer that flips `ready`
        // and then calls `wakeup` between our outer check and this wait
        // can never be missed.
        while mailbox.is_empty() {
            if let Some(until) = until {
                if until() {
                    break;
                }
            }
            mailbox = self.condvar.wait(mailbox).unwrap();
        }
        match std::mem::replace(&mut *mailbox, Mailbox::Empty) {
            Mailbox::Empty => Drained::Nothing,
            Mailbox::Callback(cb) => Drained::Run(cb),
            Mailbox::Terminate => Drained::Terminate,
        }
    }
}
