//! Cooperative cancellation and progress reporting.

use blame_rs::{BlameCommand, BlameError, CancelToken, InMemoryObjectStore};

#[test]
fn cancelled_token_aborts_before_the_first_pop() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "x\n")]);

    let token = CancelToken::new();
    token.cancel();
    let err = BlameCommand::new(&store)
        .start_commit(c1)
        .cancel_token(token)
        .call()
        .unwrap_err();
    assert!(matches!(err, BlameError::Cancelled));
}

#[test]
fn cancel_mid_walk_stops_at_the_next_check_point() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "a\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("f", "a\nb\n")]);
    let c3 = store.insert_commit(&[c2], 300, "a@x", &[("f", "a\nb\nc\n")]);

    let token = CancelToken::new();
    let trigger = token.clone();
    let mut seen = Vec::new();
    let err = BlameCommand::new(&store)
        .start_commit(c3)
        .cancel_token(token)
        .progress(move |i, hash| {
            seen.push((i, hash.to_string()));
            if i == 1 {
                trigger.cancel();
            }
        })
        .call()
        .unwrap_err();
    assert!(matches!(err, BlameError::Cancelled));
}

#[test]
fn progress_reports_iterations_and_hashes() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "a\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("f", "a\nb\n")]);

    let mut seen: Vec<(u32, String)> = Vec::new();
    let result = BlameCommand::new(&store)
        .start_commit(c2)
        .progress(|i, hash| seen.push((i, hash.to_string())))
        .call()
        .unwrap();

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], (1, c2.to_hex()));
    assert_eq!(seen[1], (2, c1.to_hex()));
    assert_eq!(result.stats.commits_processed, 2);
}

#[test]
fn work_tree_node_reports_the_zero_hash() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "a\n")]);
    store.checkout_work_tree(&c1);

    let mut first_hash = String::new();
    BlameCommand::new(&store)
        .work_tree(&store)
        .progress(|i, hash| {
            if i == 1 {
                first_hash = hash.to_string();
            }
        })
        .call()
        .unwrap();
    assert_eq!(first_hash, "0".repeat(40));
}
