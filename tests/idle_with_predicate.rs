//! SPEC_FULL.md §8 scenario 5: `idle(ready, until)` returns once `until`
//! becomes true, having run no callback other than an incidental no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serial_test::serial;

struct Ready {
    done: AtomicBool,
}

#[test]
#[serial]
fn idle_wakes_on_predicate_and_wakeup() {
    // Main is the only worker; it acts as the "worker W" from the
    // scenario by calling `idle` on its own thread after `prepare`.
    rosterpool::prepare(1);

    let ready = std::sync::Arc::new(Ready {
        done: AtomicBool::new(false),
    });

    let setter = {
        let ready = ready.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            ready.done.store(true, Ordering::SeqCst);
            rosterpool::wakeup(rosterpool::MAIN_ID);
        })
    };

    let start = Instant::now();
    rosterpool::idle(&ready, |r| r.done.load(Ordering::SeqCst));
    let elapsed = start.elapsed();

    setter.join().unwrap();

    assert!(ready.done.load(Ordering::SeqCst));
    assert!(elapsed < Duration::from_secs(5), "idle did not return promptly");
}
