//! SPEC_FULL.md §8 laws: idempotence of `prepare`, and the roster-query
//! surface (`all`, `is_managed`) it exposes.

use serial_test::serial;

#[test]
#[serial]
fn prepare_is_idempotent_and_queries_reflect_the_first_call() {
    rosterpool::prepare(3);
    // A second, differently-sized call must be a no-op: the roster stays
    // at the size the first call built.
    rosterpool::prepare(1);
    rosterpool::prepare_optional(None);

    let ids = rosterpool::all();
    assert_eq!(ids.len(), 3, "roster size must match the first prepare() call, not later ones");
    assert_eq!(ids[0], rosterpool::MAIN_ID);

    // `all()` follows the sibling ring starting at MAIN_ID: every id
    // appears exactly once.
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2]);

    for id in 0..3 {
        assert!(rosterpool::is_managed(id));
    }
    assert!(!rosterpool::is_managed(3));
    assert!(!rosterpool::is_managed(usize::MAX));
}
