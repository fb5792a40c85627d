//! Blame output: per-file attribution arrays and run statistics.
//!
//! Each blamed file gets three parallel arrays, one slot per line of the
//! file at the start revision. A slot is written exactly once, when the
//! walk attributes that line; lines whose history never resolves (for
//! example uncommitted working-tree lines) stay `None`.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::candidate::FileCandidate;

/// Degradation flags and counters for one run.
///
/// The boolean flags record non-fatal degradations: rename detection was
/// narrowed, not the blame itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlameStats {
    /// Frontier nodes processed (merge absorptions do not count).
    pub commits_processed: u32,
    /// Content rename detection was skipped because the add/delete count
    /// exceeded the rename limit.
    pub over_rename_limit: bool,
    /// A similarity table overflowed; the affected files dropped out of
    /// rename candidacy.
    pub similarity_table_overflow: bool,
}

/// Line attribution for one file, indexed by result line.
#[derive(Clone, Debug)]
pub struct FileBlame {
    path: String,
    commit_hashes: Vec<Option<Arc<str>>>,
    commit_dates: Vec<Option<i64>>,
    author_emails: Vec<Option<Arc<str>>>,
}

impl FileBlame {
    fn new(path: &str, line_count: usize) -> Self {
        Self {
            path: path.to_string(),
            commit_hashes: vec![None; line_count],
            commit_dates: vec![None; line_count],
            author_emails: vec![None; line_count],
        }
    }

    /// Path of the file at the start revision.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of lines the file had at the start revision.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.commit_hashes.len()
    }

    /// Hex commit hash per line; `None` for unattributed lines.
    #[must_use]
    pub fn commit_hashes(&self) -> &[Option<Arc<str>>] {
        &self.commit_hashes
    }

    /// Committer timestamp (epoch seconds) per line.
    #[must_use]
    pub fn commit_dates(&self) -> &[Option<i64>] {
        &self.commit_dates
    }

    /// Author e-mail per line.
    #[must_use]
    pub fn author_emails(&self) -> &[Option<Arc<str>>] {
        &self.author_emails
    }
}

/// Attribution for all blamed files, keyed by start-revision path.
#[derive(Clone, Debug, Default)]
pub struct BlameResult {
    files: BTreeMap<String, FileBlame>,
    /// Degradation flags and counters.
    pub stats: BlameStats,
}

impl BlameResult {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates the result arrays for one file.
    pub(crate) fn initialize(&mut self, path: &str, line_count: usize) {
        self.files
            .insert(path.to_string(), FileBlame::new(path, line_count));
    }

    /// Writes the commit triple over every region the candidate still
    /// holds, consuming its region list.
    ///
    /// Each line index is written at most once per run; regions from
    /// different nodes never overlap in result coordinates.
    pub(crate) fn save_file(
        &mut self,
        commit_hash: Option<&Arc<str>>,
        commit_date: Option<i64>,
        author_email: Option<&Arc<str>>,
        candidate: &mut FileCandidate,
    ) {
        let Some(file) = self.files.get_mut(&candidate.original_path) else {
            debug_assert!(false, "file not initialized: {}", candidate.original_path);
            return;
        };
        for region in candidate.regions.take().iter() {
            for line in region.result_start..region.result_end() {
                debug_assert!(
                    file.commit_hashes[line].is_none(),
                    "line {line} of {} attributed twice",
                    candidate.original_path
                );
                file.commit_hashes[line] = commit_hash.cloned();
                file.commit_dates[line] = commit_date;
                file.author_emails[line] = author_email.cloned();
            }
        }
    }

    /// Attribution for one file by start-revision path.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<&FileBlame> {
        self.files.get(path)
    }

    /// All blamed files in path order.
    pub fn files(&self) -> impl Iterator<Item = &FileBlame> + '_ {
        self.files.values()
    }

    /// Returns true when nothing was blamed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
