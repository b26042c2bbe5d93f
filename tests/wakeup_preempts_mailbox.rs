//! SPEC_FULL.md §8 scenario 4: `wakeup` of a worker that already has a
//! real callback waiting delivers exactly that callback, never a second,
//! no-op run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serial_test::serial;

#[test]
#[serial]
fn exactly_one_callback_runs() {
    rosterpool::prepare(2);

    let run_count = Arc::new(AtomicUsize::new(0));
    let woken_worker = Arc::new(AtomicUsize::new(usize::MAX));

    let deadline = Instant::now() + Duration::from_secs(5);
    let accepted = loop {
        let run_count = run_count.clone();
        let woken_worker = woken_worker.clone();
        let accepted = rosterpool::try_spawn(Box::new(move |worker_id| {
            woken_worker.store(worker_id, Ordering::SeqCst);
            run_count.fetch_add(1, Ordering::SeqCst);
        }));
        if accepted {
            break true;
        }
        if Instant::now() >= deadline {
            break false;
        }
        std::thread::sleep(Duration::from_millis(1));
    };
    assert!(accepted, "expected an idle worker to accept the callback");

    // The only worker besides MAIN_ID is id 1. Whether this `wakeup`
    // lands before or after the worker has already drained its mailbox,
    // the real callback must run exactly once: if it lands first, the
    // mailbox is non-empty and the no-op this call would have installed
    // is discarded; if it lands after, the worker is already parked again
    // and the no-op it installs just makes the worker spin once more
    // without touching `run_count`.
    rosterpool::wakeup(1);

    let deadline = Instant::now() + Duration::from_secs(5);
    while run_count.load(Ordering::SeqCst) == 0 {
        assert!(Instant::now() < deadline, "callback never ran");
        std::thread::sleep(Duration::from_millis(1));
    }

    // Give any stray extra wakeup a moment to (not) do anything observable.
    std::thread::sleep(Duration::from_millis(50));

    assert_eq!(run_count.load(Ordering::SeqCst), 1, "callback must run exactly once");
    assert_eq!(woken_worker.load(Ordering::SeqCst), 1);
}
