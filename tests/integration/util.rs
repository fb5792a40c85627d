//! Shared helpers for blame integration tests.

use blame_rs::{BlameResult, ObjectId};

/// Per-line commit hashes of one file, as owned strings.
pub fn hashes(result: &BlameResult, path: &str) -> Vec<Option<String>> {
    result
        .file(path)
        .unwrap_or_else(|| panic!("no blame for {path}"))
        .commit_hashes()
        .iter()
        .map(|h| h.as_deref().map(str::to_string))
        .collect()
}

/// The expected hash column for `commits[i]` attributed line by line.
pub fn expect(commits: &[&ObjectId]) -> Vec<Option<String>> {
    commits.iter().map(|c| Some(c.to_hex())).collect()
}
