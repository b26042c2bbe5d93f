//! SPEC_FULL.md §8 scenario 6: shutdown with a failing callback.

use std::time::{Duration, Instant};

use serial_test::serial;

#[test]
#[serial]
fn shutdown_reports_the_panicking_callback() {
    // Suppress the default panic-to-stderr noise for the expected panic
    // below; this crate's workers are meant to be able to carry a
    // panicking callback without crashing the test harness.
    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));

    rosterpool::prepare(2);

    let deadline = Instant::now() + Duration::from_secs(5);
    let accepted = loop {
        let accepted = rosterpool::try_spawn(Box::new(|_worker_id| {
            panic!("boom");
        }));
        if accepted {
            break true;
        }
        if Instant::now() >= deadline {
            break false;
        }
        std::thread::sleep(Duration::from_millis(1));
    };
    assert!(accepted, "expected an idle worker to accept the panicking callback");

    // Give the worker thread a moment to actually panic before we drain.
    std::thread::sleep(Duration::from_millis(50));

    let result = rosterpool::shutdown();
    std::panic::set_hook(previous_hook);

    match result {
        Err(err) => {
            assert_eq!(err.0.len(), 1);
            let message = format!("{:?}", err.0[0]);
            assert!(message.contains("boom"), "payload was: {}", message);
        }
        Ok(()) => panic!("expected shutdown to report the panicking worker"),
    }

    // Idempotent: a second call is a no-op, not a re-delivery of the error.
    assert!(rosterpool::shutdown().is_ok());
}
