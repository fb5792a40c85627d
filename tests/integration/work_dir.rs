//! Blaming the working tree and content overrides.

use ahash::AHashMap;
use blame_rs::{BlameCommand, InMemoryObjectStore, WorkTree};

use crate::util::{expect, hashes};

#[test]
fn clean_work_tree_blames_like_head() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "one\ntwo\n")]);
    store.checkout_work_tree(&c1);

    let result = BlameCommand::new(&store).work_tree(&store).call().unwrap();
    assert_eq!(hashes(&result, "f"), expect(&[&c1, &c1]));
}

#[test]
fn uncommitted_lines_stay_unattributed() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "one\ntwo\n")]);
    store.checkout_work_tree(&c1);
    store.set_work_tree_file("f", b"one\ntwo\nlocal edit\n");

    let result = BlameCommand::new(&store).work_tree(&store).call().unwrap();
    let lines = hashes(&result, "f");
    assert_eq!(lines[0], Some(c1.to_hex()));
    assert_eq!(lines[1], Some(c1.to_hex()));
    assert_eq!(lines[2], None);

    let file = result.file("f").unwrap();
    assert_eq!(file.author_emails()[2], None);
    assert_eq!(file.commit_dates()[2], None);
}

#[test]
fn untracked_file_is_fully_unattributed() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("committed", "c\n")]);
    store.checkout_work_tree(&c1);
    store.set_work_tree_file("scratch", b"draft\nnotes\n");

    let result = BlameCommand::new(&store).work_tree(&store).call().unwrap();
    assert_eq!(hashes(&result, "scratch"), vec![None, None]);
    assert_eq!(hashes(&result, "committed"), expect(&[&c1]));
}

#[test]
fn content_overrides_replace_work_tree_bytes() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "one\ntwo\n")]);
    store.checkout_work_tree(&c1);

    let mut contents = AHashMap::new();
    contents.insert("f".to_string(), b"one\nbuffer edit\n".to_vec());

    let result = BlameCommand::new(&store)
        .work_tree(&store)
        .file_contents(contents)
        .call()
        .unwrap();
    let lines = hashes(&result, "f");
    assert_eq!(lines[0], Some(c1.to_hex()));
    assert_eq!(lines[1], None);
}

#[test]
fn work_tree_walks_history_behind_head() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "a\n")]);
    let c2 = store.insert_commit(&[c1], 200, "b@x", &[("f", "a\nb\n")]);
    store.checkout_work_tree(&c2);

    let result = BlameCommand::new(&store).work_tree(&store).call().unwrap();
    assert_eq!(hashes(&result, "f"), expect(&[&c1, &c2]));
    // Working tree, c2 and c1 each processed once.
    assert_eq!(result.stats.commits_processed, 3);
}

#[test]
fn disk_work_tree_lists_and_reads_files() {
    let dir = std::env::temp_dir().join(format!("blame-rs-wt-{}", std::process::id()));
    let nested = dir.join("src");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::create_dir_all(dir.join(".git")).unwrap();
    std::fs::write(dir.join("top.txt"), b"top\n").unwrap();
    std::fs::write(nested.join("lib.rs"), b"fn lib() {}\n").unwrap();
    std::fs::write(dir.join(".git").join("config"), b"ignored").unwrap();

    let work_tree = blame_rs::DiskWorkTree::new(&dir);
    let files = work_tree.files().unwrap();
    assert_eq!(files, ["src/lib.rs", "top.txt"]);
    assert_eq!(work_tree.read_file("src/lib.rs").unwrap(), b"fn lib() {}\n");
    assert!(work_tree.read_file("missing").is_err());

    std::fs::remove_dir_all(&dir).unwrap();
}
