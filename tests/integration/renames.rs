//! Blame across renames and copies.

use blame_rs::{BlameCommand, BlameOptions, InMemoryObjectStore};

use crate::util::{expect, hashes};

#[test]
fn rename_and_copy_both_trace_to_the_origin() {
    let mut store = InMemoryObjectStore::new();
    let body = "l1\nl2\nl3\nl4\nl5\nl6\nl7\n";
    let c1 = store.insert_commit(&[], 100, "a@x", &[("fileA", body)]);
    // fileA copied to fileB and renamed to fileC in one commit.
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("fileB", body), ("fileC", body)]);

    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    let origin = expect(&[&c1, &c1, &c1, &c1, &c1, &c1, &c1]);
    assert_eq!(hashes(&result, "fileB"), origin);
    assert_eq!(hashes(&result, "fileC"), origin);
}

#[test]
fn rename_with_small_edit_keeps_old_lines_attributed() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(
        &[],
        100,
        "a@x",
        &[("src/old.rs", "fn a() {}\nfn b() {}\nfn c() {}\nfn d() {}\n")],
    );
    // Renamed and one line changed: content similarity finds the pair.
    let c2 = store.insert_commit(
        &[c1],
        200,
        "a@x",
        &[("src/new.rs", "fn a() {}\nfn b() {}\nfn c() {}\nfn D() {}\n")],
    );

    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&result, "src/new.rs"), expect(&[&c1, &c1, &c1, &c2]));
}

#[test]
fn rename_across_directories_is_found() {
    let mut store = InMemoryObjectStore::new();
    let body = "alpha\nbeta\ngamma\n";
    let c1 = store.insert_commit(&[], 100, "a@x", &[("old/dir/file.txt", body), ("other", "o\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("new/place/file.txt", body), ("other", "o\n")]);

    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&result, "new/place/file.txt"), expect(&[&c1, &c1, &c1]));
}

#[test]
fn exact_rename_survives_disabled_content_detection() {
    let mut store = InMemoryObjectStore::new();
    let body = "one\ntwo\n";
    let c1 = store.insert_commit(&[], 100, "a@x", &[("a.txt", body)]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("b.txt", body)]);

    let result = BlameCommand::new(&store)
        .start_commit(c2)
        .options(BlameOptions {
            rename_limit: -1, // exact renames only
            ..BlameOptions::default()
        })
        .call()
        .unwrap();
    assert_eq!(hashes(&result, "b.txt"), expect(&[&c1, &c1]));
}

#[test]
fn rename_chain_through_several_commits() {
    let mut store = InMemoryObjectStore::new();
    let body = "x\ny\nz\n";
    let c1 = store.insert_commit(&[], 100, "a@x", &[("first", body)]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("second", body)]);
    let c3 = store.insert_commit(&[c2], 300, "a@x", &[("third", body)]);

    let result = BlameCommand::new(&store).start_commit(c3).call().unwrap();
    assert_eq!(hashes(&result, "third"), expect(&[&c1, &c1, &c1]));
}

#[test]
fn unrelated_new_file_is_not_claimed_by_a_delete() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("gone.txt", "old stuff\nhere\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("fresh.txt", "entirely new\ncontent\n")]);

    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&result, "fresh.txt"), expect(&[&c2, &c2]));
}

#[test]
fn low_rename_score_pairs_weak_matches() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(
        &[],
        100,
        "a@x",
        &[("doc.md", "keep this line\nkeep this too\ndrop a\ndrop b\ndrop c\n")],
    );
    let c2 = store.insert_commit(
        &[c1],
        200,
        "a@x",
        &[("guide.md", "keep this line\nkeep this too\nnew one\nnew two\nnew three\n")],
    );

    // Under the default threshold the pair scores too low; lowering the
    // score lets the rename through and the kept lines trace back.
    let strict = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&strict, "guide.md")[0], Some(c2.to_hex()));

    let lax = BlameCommand::new(&store)
        .start_commit(c2)
        .options(BlameOptions {
            rename_score: 20,
            ..BlameOptions::default()
        })
        .call()
        .unwrap();
    assert_eq!(
        hashes(&lax, "guide.md"),
        expect(&[&c1, &c1, &c2, &c2, &c2])
    );
}
