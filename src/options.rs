//! Blame configuration and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::diff::{DiffAlgorithmKind, LineComparator};

/// Default big-file threshold: 50 MiB.
pub const DEFAULT_BIG_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;
/// Default minimum similarity score for a content rename.
pub const DEFAULT_RENAME_SCORE: u32 = 60;

/// Tunables of a blame run.
///
/// Defaults match the common upstream behavior: rename detection at score
/// 60, no MODIFY breaking, unlimited rename candidates, byte-exact line
/// comparison, single-threaded.
#[derive(Clone, Debug)]
pub struct BlameOptions {
    /// Minimum similarity score `[0, 100]` to pair an add/delete as a
    /// rename.
    pub rename_score: u32,
    /// Similarity score below which a MODIFY is broken into DELETE+ADD.
    /// Non-positive disables breaking.
    pub break_score: i32,
    /// Cap on add/delete counts for content rename detection.
    /// 0 = unlimited; negative = exact renames only.
    pub rename_limit: i32,
    /// Files larger than this never participate in content renames.
    pub big_file_threshold: u64,
    /// Skip content-rename scoring for binary files.
    pub skip_binary_files_for_content_renames: bool,
    /// Line equivalence handed to the diff collaborator.
    pub line_comparator: LineComparator,
    /// Diff algorithm, among those the collaborator offers.
    pub diff_algorithm: DiffAlgorithmKind,
    /// Run per-file blame jobs on a bounded worker pool.
    pub multithreading: bool,
}

impl Default for BlameOptions {
    fn default() -> Self {
        Self {
            rename_score: DEFAULT_RENAME_SCORE,
            break_score: -1,
            rename_limit: 0,
            big_file_threshold: DEFAULT_BIG_FILE_THRESHOLD,
            skip_binary_files_for_content_renames: false,
            line_comparator: LineComparator::Default,
            diff_algorithm: DiffAlgorithmKind::Myers,
            multithreading: false,
        }
    }
}

/// Cooperative cancellation handle.
///
/// Cloned freely; the walk checks it between frontier pops, between
/// per-parent loops, and between similarity pair evaluations. Cancellation
/// never corrupts result arrays already written.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
