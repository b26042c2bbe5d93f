//! The Roster: the fixed array of Worker Slots and the auxiliary arrays
//! keyed by worker id (owning thread handle, circular sibling link), plus
//! the one-shot `prepare` that builds them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::slot::Slot;
use crate::tagged_index::IDX_MASK;
use crate::stack::IdleStack;
use crate::wake::worker_main;
use crate::WorkerId;

/// Id reserved for the thread that calls `prepare`/`prepare_optional`.
pub const MAIN_ID: WorkerId = 0;

/// A small Mutex+Condvar latch, shared by the sibling-readiness wait in
/// `Roster::build` (§4.5) and the "second caller waits for the winner to
/// finish building" case in `prepare` (§10.6). Mirrors the mailbox's own
/// Mutex+Condvar idiom rather than introducing a new synchronization
/// primitive.
struct Latch {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl Latch {
    fn new() -> Latch {
        Latch {
            done: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn signal(&self) {
        let mut done = self.done.lock().unwrap();
        *done = true;
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let mut done = self.done.lock().unwrap();
        while !*done {
            done = self.condvar.wait(done).unwrap();
        }
    }
}

pub struct Roster {
    slots: Vec<Slot>,
    idle_stack: IdleStack,

    /// `handles[id]` is `None` for `MAIN_ID` (the calling thread owns
    /// itself, not a `JoinHandle`) and `Some` for every spawned worker.
    /// Guarded by a mutex only because `JoinHandle::join` takes `self` by
    /// value; population happens once, in `build`, before any reader runs.
    handles: Mutex<Vec<Option<JoinHandle<()>>>>,

    /// `sibling[id]` is the next id in the circular ring, starting and
    /// ending at `MAIN_ID`.
    sibling: Vec<WorkerId>,

    terminated: AtomicBool,
}

impl Roster {
    /// Spawn `num_domains - 1` OS threads (one slot, `MAIN_ID`, is reserved
    /// for the calling thread) and block until every one of them has
    /// installed its own Worker Slot and joined the sibling ring.
    pub fn build(num_domains: usize) -> Roster {
        assert!(num_domains >= 1);
        assert!(
            (num_domains as u32) < IDX_MASK,
            "worker count does not fit in the tagged index's IDX_BITS"
        );

        let mut slots = Vec::with_capacity(num_domains);
        for id in 0..num_domains {
            slots.push(Slot::new(id));
        }

        let mut handles = Vec::with_capacity(num_domains);
        handles.push(None); // MAIN_ID

        // Every worker id is its own predecessor's successor, in spawn
        // order, wrapping back to MAIN_ID: 0 -> 1 -> 2 -> ... -> N-1 -> 0.
        let mut sibling = vec![0; num_domains];
        for id in 0..num_domains {
            sibling[id] = if id + 1 == num_domains { MAIN_ID } else { id + 1 };
        }

        let ready_count = std::sync::Arc::new(AtomicUsize::new(1)); // MAIN_ID counts itself
        let ready_latch = std::sync::Arc::new(Latch::new());

        for id in 1..num_domains {
            let ready_count = ready_count.clone();
            let ready_latch = ready_latch.clone();
            let total = num_domains;
            let handle = thread::Builder::new()
                .name(format!("rosterpool-worker-{}", id))
                .spawn(move || {
                    crate::set_current_worker_id(id);
                    if ready_count.fetch_add(1, Ordering::AcqRel) + 1 == total {
                        ready_latch.signal();
                    } else {
                        ready_latch.wait();
                    }
                    worker_main(id);
                })
                .expect("failed to spawn worker thread");
            handles.push(Some(handle));
        }

        // If there were no siblings to spawn, the main thread itself is
        // the only participant and is trivially "ready".
        if num_domains == 1 {
            ready_latch.signal();
        } else {
            ready_latch.wait();
        }

        Roster {
            slots,
            idle_stack: IdleStack::new(),
            handles: Mutex::new(handles),
            sibling,
            terminated: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, id: WorkerId) -> &Slot {
        &self.slots[id]
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn idle_stack(&self) -> &IdleStack {
        &self.idle_stack
    }

    pub fn is_managed(&self, id: WorkerId) -> bool {
        id < self.slots.len()
    }

    /// Snapshot of every worker id, in sibling-ring order starting at
    /// `MAIN_ID`.
    pub fn all(&self) -> Vec<WorkerId> {
        let mut ids = Vec::with_capacity(self.sibling.len());
        let mut id = MAIN_ID;
        loop {
            ids.push(id);
            id = self.sibling[id];
            if id == MAIN_ID {
                break;
            }
        }
        ids
    }

    pub fn mark_terminated(&self) {
        self.terminated.store(true, Ordering::Release);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    /// Publish the terminate signal to every worker and join every spawned
    /// thread in reverse spawn order, collecting any panic payloads in
    /// that same reverse order (SPEC_FULL.md §7.2 / §8).
    ///
    /// `MAIN_ID` never has a `JoinHandle` (it is the caller's own thread):
    /// its mailbox still receives the terminate signal, so a main thread
    /// parked in `idle` wakes up, but the join loop below only walks
    /// spawned workers.
    pub fn drain(&self) -> Vec<crate::error::WorkerPanic> {
        self.mark_terminated();
        // Includes slot 0 (MAIN_ID): there is no thread to join for it,
        // but if the main thread is itself parked in `idle`, this unblocks
        // it rather than leaving it waiting on a mailbox nobody will ever
        // fill again.
        for slot in self.slots.iter() {
            slot.force_terminate();
        }

        let mut panics = Vec::new();
        let mut handles = self.handles.lock().unwrap();
        for id in (1..handles.len()).rev() {
            if let Some(handle) = handles[id].take() {
                if let Err(payload) = handle.join() {
                    panics.push(crate::error::WorkerPanic {
                        worker_id: id,
                        payload,
                    });
                }
            }
        }
        panics
    }
}
