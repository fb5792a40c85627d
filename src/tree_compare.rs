//! File-tree comparison between a child node and one parent commit.
//!
//! Maps the paths a child node is tracking to their locations in a parent
//! commit. Two strategies:
//!
//! - **Fast path** (small path sets): merge the two sorted listings
//!   restricted to the tracked paths, assuming every path existed in the
//!   parent under the same name. The moment a tracked path turns out to be
//!   absent on the parent side, the fast path aborts: that file was added
//!   or renamed and only the slow path can tell which.
//! - **Slow path**: build the full add/delete/modify entry list between the
//!   trees and run rename detection, restricted to adds among the tracked
//!   paths.
//!
//! The working-tree comparison reports *all* tracked paths, because
//! working-tree candidates carry the zero blob id and the usual
//! blob-equality short-circuit cannot detect unmodified files for them.

use ahash::{AHashMap, AHashSet};

use crate::blob_reader::BlobReader;
use crate::diff_entry::{ChangeType, DiffEntry};
use crate::errors::BlameError;
use crate::object_id::ObjectId;
use crate::object_store::{BlobSource, ObjectStore, TreeFile};
use crate::options::{BlameOptions, CancelToken};
use crate::rename_detector::RenameDetector;

/// Path sets at least this large skip the filtered fast path.
const THRESHOLD_FILTER_FILES: usize = 100;

/// One tracked file mapped into the parent commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DiffFile {
    /// Path in the child node.
    pub new_path: String,
    /// Path in the parent, or `None` when the file did not exist there.
    pub old_path: Option<String>,
    /// Parent-side blob id; zero for adds.
    pub old_id: ObjectId,
}

impl DiffFile {
    fn new(new_path: String, old_path: String, old_id: ObjectId) -> Self {
        let old_path = if old_id.is_zero() { None } else { Some(old_path) };
        Self {
            new_path,
            old_path,
            old_id,
        }
    }
}

/// Comparison result plus rename-detection degradation flags.
#[derive(Debug, Default)]
pub(crate) struct TreeCompareOutcome {
    pub files: Vec<DiffFile>,
    pub over_rename_limit: bool,
    pub table_overflow: bool,
}

/// Compares trees for the walk, delegating rename detection when needed.
pub(crate) struct FileTreeComparator<'a, S: ObjectStore> {
    store: &'a S,
    opts: &'a BlameOptions,
}

impl<'a, S: ObjectStore> FileTreeComparator<'a, S> {
    pub(crate) fn new(store: &'a S, opts: &'a BlameOptions) -> Self {
        Self { store, opts }
    }

    /// Finds the parent-side location of every tracked path.
    ///
    /// `child` is `None` when the child node is the working tree; the
    /// parent listing then serves as the old side for all tracked paths.
    pub(crate) fn find_moved_files<R: BlobSource>(
        &self,
        reader: &mut BlobReader<'_, R>,
        parent: &ObjectId,
        child: Option<&ObjectId>,
        paths: &AHashSet<String>,
        cancel: &CancelToken,
    ) -> Result<TreeCompareOutcome, BlameError> {
        let Some(child) = child else {
            return self.compute_for_working_dir(parent, paths);
        };

        let parent_tree = self.store.tree(parent)?;
        let child_tree = self.store.tree(child)?;

        if paths.len() < THRESHOLD_FILTER_FILES {
            if let Some(files) = fast_path(&parent_tree, &child_tree, paths) {
                return Ok(TreeCompareOutcome {
                    files,
                    ..TreeCompareOutcome::default()
                });
            }
        }

        // A tracked path was added by the child (or the set is large):
        // collect the full entry list and let rename detection resolve it.
        let entries = diff_listings(&parent_tree, &child_tree);
        let filtered = entries
            .into_iter()
            .filter(|e| e.change_type != ChangeType::Add || paths.contains(&e.new_path));

        let mut detector = RenameDetector::new(self.opts);
        detector.add_all(filtered);
        let outcome = detector.compute(reader, cancel)?;

        let files = outcome
            .entries
            .into_iter()
            .filter(|e| e.change_type != ChangeType::Delete && paths.contains(&e.new_path))
            .map(|e| DiffFile::new(e.new_path, e.old_path, e.old_id))
            .collect();

        Ok(TreeCompareOutcome {
            files,
            over_rename_limit: outcome.over_rename_limit,
            table_overflow: outcome.table_overflow,
        })
    }

    /// Working-tree comparison: every tracked path, modified or not.
    fn compute_for_working_dir(
        &self,
        parent: &ObjectId,
        paths: &AHashSet<String>,
    ) -> Result<TreeCompareOutcome, BlameError> {
        let parent_tree = self.store.tree(parent)?;
        let by_path: AHashMap<&str, &TreeFile> = parent_tree
            .iter()
            .map(|f| (f.path.as_str(), f))
            .collect();

        let mut sorted: Vec<&String> = paths.iter().collect();
        sorted.sort();

        let files = sorted
            .into_iter()
            .map(|path| {
                let old_id = by_path.get(path.as_str()).map_or(ObjectId::ZERO, |f| f.id);
                DiffFile::new(path.clone(), path.clone(), old_id)
            })
            .collect();
        Ok(TreeCompareOutcome {
            files,
            ..TreeCompareOutcome::default()
        })
    }
}

/// Lock-step comparison of the tracked paths only.
///
/// Returns `None` when a tracked path has no parent-side entry, which
/// forces the slow path.
fn fast_path(
    parent_tree: &[TreeFile],
    child_tree: &[TreeFile],
    paths: &AHashSet<String>,
) -> Option<Vec<DiffFile>> {
    let parent_by_path: AHashMap<&str, &TreeFile> = parent_tree
        .iter()
        .map(|f| (f.path.as_str(), f))
        .collect();
    let child_by_path: AHashMap<&str, &TreeFile> = child_tree
        .iter()
        .map(|f| (f.path.as_str(), f))
        .collect();

    let mut sorted: Vec<&String> = paths.iter().collect();
    sorted.sort();

    let mut files = Vec::with_capacity(sorted.len());
    for path in sorted {
        let child_entry = child_by_path.get(path.as_str());
        let parent_entry = parent_by_path.get(path.as_str());
        match (parent_entry, child_entry) {
            (None, Some(_)) => return None, // added in the child
            (Some(pe), Some(ce)) if pe.id != ce.id => {
                files.push(DiffFile::new(path.clone(), path.clone(), pe.id));
            }
            // Unchanged, deleted in the child, or untracked: nothing to map.
            _ => {}
        }
    }
    Some(files)
}

/// Full add/delete/modify entry list between two sorted listings.
fn diff_listings(parent_tree: &[TreeFile], child_tree: &[TreeFile]) -> Vec<DiffEntry> {
    let mut entries = Vec::new();
    let mut pi = 0;
    let mut ci = 0;
    while pi < parent_tree.len() || ci < child_tree.len() {
        match (parent_tree.get(pi), child_tree.get(ci)) {
            (Some(pe), Some(ce)) => match pe.path.cmp(&ce.path) {
                std::cmp::Ordering::Less => {
                    entries.push(DiffEntry::delete(&pe.path, pe.id, pe.mode));
                    pi += 1;
                }
                std::cmp::Ordering::Greater => {
                    entries.push(DiffEntry::add(&ce.path, ce.id, ce.mode));
                    ci += 1;
                }
                std::cmp::Ordering::Equal => {
                    if pe.id != ce.id || pe.mode != ce.mode {
                        entries.push(DiffEntry::modify(
                            &pe.path, pe.id, pe.mode, ce.id, ce.mode,
                        ));
                    }
                    pi += 1;
                    ci += 1;
                }
            },
            (Some(pe), None) => {
                entries.push(DiffEntry::delete(&pe.path, pe.id, pe.mode));
                pi += 1;
            }
            (None, Some(ce)) => {
                entries.push(DiffEntry::add(&ce.path, ce.id, ce.mode));
                ci += 1;
            }
            (None, None) => unreachable!("loop condition"),
        }
    }
    entries
}
