//! Blame over linear, forked and merged histories.

use blame_rs::{BlameCommand, BlameOptions, InMemoryObjectStore};

use crate::util::{expect, hashes};

#[test]
fn initial_commit_owns_every_line() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("fileA", "line1\n")]);
    let result = BlameCommand::new(&store).start_commit(c1).call().unwrap();
    assert_eq!(hashes(&result, "fileA"), expect(&[&c1]));
    assert_eq!(result.stats.commits_processed, 1);
}

#[test]
fn appended_lines_belong_to_the_appending_commit() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "one\ntwo\n")]);
    let c2 = store.insert_commit(&[c1], 200, "b@x", &[("f", "one\ntwo\nthree\n")]);
    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&result, "f"), expect(&[&c1, &c1, &c2]));

    let file = result.file("f").unwrap();
    assert_eq!(file.author_emails()[0].as_deref(), Some("a@x"));
    assert_eq!(file.author_emails()[2].as_deref(), Some("b@x"));
    assert_eq!(file.commit_dates()[2], Some(200));
}

#[test]
fn edited_middle_line_reattributes_only_that_line() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "a\nb\nc\nd\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("f", "a\nB!\nc\nd\n")]);
    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&result, "f"), expect(&[&c1, &c2, &c1, &c1]));
}

#[test]
fn deleted_lines_leave_the_rest_attributed() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("f", "a\nb\nc\nd\ne\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("f", "a\nd\ne\n")]);
    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&result, "f"), expect(&[&c1, &c1, &c1]));
}

#[test]
fn multiple_files_blame_in_one_walk() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("a", "1\n"), ("b", "x\ny\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("a", "1\n2\n"), ("b", "x\ny\n")]);
    let result = BlameCommand::new(&store).start_commit(c2).call().unwrap();
    assert_eq!(hashes(&result, "a"), expect(&[&c1, &c2]));
    assert_eq!(hashes(&result, "b"), expect(&[&c1, &c1]));
    // One walk for both files: two commits processed in total.
    assert_eq!(result.stats.commits_processed, 2);
}

#[test]
fn file_paths_restrict_the_walk() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("keep", "k\n"), ("skip", "s\n")]);
    let result = BlameCommand::new(&store)
        .start_commit(c1)
        .file_paths(["keep".to_string()])
        .call()
        .unwrap();
    assert!(result.file("keep").is_some());
    assert!(result.file("skip").is_none());
}

#[test]
fn merge_prefers_same_name_parent_over_same_content_parent() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("fileA", "l1\nl2\n")]);
    // Fork from c1 with the same content under another name.
    let c3 = store.insert_commit(&[c1], 300, "a@x", &[("fileB", "l1\nl2\n")]);
    // Merge c2 into c3, then drop fileB: head holds fileA only.
    let merge = store.insert_commit(&[c3, c2], 400, "a@x", &[("fileA", "l1\nl2\n")]);

    let result = BlameCommand::new(&store).start_commit(merge).call().unwrap();
    assert_eq!(hashes(&result, "fileA"), expect(&[&c2, &c2]));
}

#[test]
fn regions_split_across_parents_merge_at_the_common_ancestor() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("fileA", "l1\nl2\nl3\nl4\n")]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("fileA", "l3\nl4\n")]);
    let c3 = store.insert_commit(&[c1], 300, "a@x", &[("fileA", "l1\nl2\n")]);
    // The merge restores all four lines.
    let merge = store.insert_commit(&[c3, c2], 400, "a@x", &[("fileA", "l1\nl2\nl3\nl4\n")]);

    let result = BlameCommand::new(&store).start_commit(merge).call().unwrap();
    assert_eq!(hashes(&result, "fileA"), expect(&[&c1, &c1, &c1, &c1]));
    // c1 must be expanded once even though both branches reach it.
    assert_eq!(result.stats.commits_processed, 4);
}

#[test]
fn parent_with_exact_content_short_circuits() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[]);
    let c2 = store.insert_commit(&[c1], 200, "a@x", &[("fileA", "l1\nl3\n")]);
    let c3 = store.insert_commit(&[c1], 300, "a@x", &[("fileA", "l1\nl2\n")]);
    // Merge keeps c3's version byte for byte.
    let merge = store.insert_commit(&[c2, c3], 400, "a@x", &[("fileA", "l1\nl2\n")]);

    let result = BlameCommand::new(&store).start_commit(merge).call().unwrap();
    assert_eq!(hashes(&result, "fileA"), expect(&[&c3, &c3]));
}

#[test]
fn long_unrelated_tail_is_walked_once() {
    let mut store = InMemoryObjectStore::new();
    let c1 = store.insert_commit(&[], 100, "a@x", &[("fileA", "r1\nr2\n"), ("noise", "0\n")]);

    // 100 commits that only touch the noise file.
    let mut tip = c1;
    for i in 0..100 {
        let body = format!("{i}\n");
        tip = store.insert_commit(
            &[tip],
            200 + i,
            "a@x",
            &[("fileA", "r1\nr2\n"), ("noise", body.as_str())],
        );
    }
    // Fork editing fileA, then a merge that restores it.
    let side = store.insert_commit(&[tip], 400, "a@x", &[("fileA", "r1\nX\n"), ("noise", "99\n")]);
    let merge = store.insert_commit(
        &[side, tip],
        500,
        "a@x",
        &[("fileA", "r1\nr2\n"), ("noise", "99\n")],
    );

    let mut fired = 0u32;
    let result = BlameCommand::new(&store)
        .start_commit(merge)
        .file_paths(["fileA".to_string()])
        .progress(|_, _| fired += 1)
        .call()
        .unwrap();

    assert_eq!(hashes(&result, "fileA"), expect(&[&c1, &c1]));
    assert!(fired < 105, "progress fired {fired} times");
}

#[test]
fn multithreaded_walk_matches_single_threaded() {
    let mut store = InMemoryObjectStore::new();
    let mut files: Vec<(String, String)> = (0..12)
        .map(|i| (format!("file{i}"), format!("seed {i}\n")))
        .collect();
    fn snapshot(files: &[(String, String)]) -> Vec<(&str, &str)> {
        files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect()
    }

    let mut tip = store.insert_commit(&[], 100, "a@x", &snapshot(&files));
    // Each commit grows a few files.
    for step in 0..6usize {
        for (i, (_, content)) in files.iter_mut().enumerate() {
            if (i + step) % 3 == 0 {
                content.push_str(&format!("step {step} file {i}\n"));
            }
        }
        tip = store.insert_commit(&[tip], 200 + step as i32, "a@x", &snapshot(&files));
    }

    let single = BlameCommand::new(&store).start_commit(tip).call().unwrap();
    let multi = BlameCommand::new(&store)
        .start_commit(tip)
        .options(BlameOptions {
            multithreading: true,
            ..BlameOptions::default()
        })
        .call()
        .unwrap();

    for (path, _) in &files {
        assert_eq!(hashes(&single, path), hashes(&multi, path), "file {path}");
    }
}
