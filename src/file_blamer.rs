//! Per-file blame propagation from a child node to its parents.
//!
//! For every parent of a popped node, three hand-off mechanisms run in
//! order, each moving region lists out of child candidates:
//!
//! 1. paths untouched by the tree diff move over unchanged;
//! 2. candidates whose blob id equals the parent-side id move over with
//!    the path rewritten (rename or copy of identical content);
//! 3. everything else becomes a blame job: diff the two blobs and split
//!    the region list between parent and child.
//!
//! With several parents, each runs against a snapshot of the child's
//! remaining candidates; whichever mechanism claims a region list first
//! wins, and different parents may legitimately claim different files.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};

use crate::blob_reader::BlobReader;
use crate::candidate::{take_blame, FileCandidate, GraphNode, NodeCommit};
use crate::diff::compute_edits;
use crate::errors::BlameError;
use crate::executor::Executor;
use crate::object_id::ObjectId;
use crate::object_store::{BlobSource, CommitInfo, ObjectStore, WorkTree};
use crate::options::{BlameOptions, CancelToken};
use crate::region::RegionList;
use crate::result::{BlameResult, BlameStats};
use crate::tree_compare::{DiffFile, FileTreeComparator};

/// One per-file blame job, self-contained for worker execution.
#[derive(Debug)]
pub(crate) struct BlameJob {
    /// Index of the child candidate this job drains.
    pub child_idx: usize,
    /// Path at the start revision; also the working-tree read path.
    pub original_path: String,
    /// Child-side blob (zero = working tree).
    pub child_blob: ObjectId,
    /// Path of the file in the parent commit.
    pub parent_path: String,
    /// Parent-side blob.
    pub parent_blob: ObjectId,
    /// Regions taken from the child candidate.
    pub regions: RegionList,
}

/// What a blame job produced.
#[derive(Debug)]
pub(crate) struct JobOutcome {
    /// Index of the child candidate to restore residual regions into.
    pub child_idx: usize,
    /// Parent-side candidate, when any regions moved over.
    pub parent: Option<FileCandidate>,
    /// Regions the child keeps (lines its commit introduced).
    pub residue: RegionList,
}

/// Runs one blame job: equality short-circuit, diff, region split.
pub(crate) fn execute_job<R: BlobSource>(
    job: BlameJob,
    reader: &mut BlobReader<'_, R>,
    opts: &BlameOptions,
) -> Result<JobOutcome, BlameError> {
    if job.regions.is_empty() {
        // All regions already moved to another parent.
        return Ok(JobOutcome {
            child_idx: job.child_idx,
            parent: None,
            residue: RegionList::new(),
        });
    }

    let move_all = |regions: RegionList| JobOutcome {
        child_idx: job.child_idx,
        parent: Some(FileCandidate::with_regions(
            &job.original_path,
            &job.parent_path,
            job.parent_blob,
            regions,
        )),
        residue: RegionList::new(),
    };

    if job.parent_blob == job.child_blob {
        return Ok(move_all(job.regions));
    }

    let parent_text = reader.load_text(&job.parent_blob, &job.original_path)?;
    let child_text = reader.load_text(&job.child_blob, &job.original_path)?;
    let edits = compute_edits(opts.diff_algorithm, opts.line_comparator, &parent_text, &child_text);
    if edits.is_empty() {
        // Whitespace-ignoring comparators can see distinct blobs as equal.
        return Ok(move_all(job.regions));
    }

    let (parent_regions, residue) = take_blame(&edits, job.regions);
    let parent = if parent_regions.is_empty() {
        None
    } else {
        Some(FileCandidate::with_regions(
            &job.original_path,
            &job.parent_path,
            job.parent_blob,
            parent_regions,
        ))
    };
    Ok(JobOutcome {
        child_idx: job.child_idx,
        parent,
        residue,
    })
}

/// Drives per-file propagation and result writing for the walk.
pub(crate) struct FileBlamer<'a, S: ObjectStore> {
    store: &'a S,
    opts: &'a BlameOptions,
    overrides: &'a AHashMap<String, Vec<u8>>,
    work_tree: Option<&'a dyn WorkTree>,
    comparator: FileTreeComparator<'a, S>,
    executor: Executor,
    cancel: CancelToken,
}

impl<'a, S: ObjectStore> FileBlamer<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        opts: &'a BlameOptions,
        overrides: &'a AHashMap<String, Vec<u8>>,
        work_tree: Option<&'a dyn WorkTree>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            store,
            opts,
            overrides,
            work_tree,
            comparator: FileTreeComparator::new(store, opts),
            executor: Executor::from_options(opts),
            cancel,
        }
    }

    /// Loads every start candidate once to size its region list and the
    /// result arrays.
    pub(crate) fn initialize(
        &self,
        reader: &mut BlobReader<'_, S::Reader>,
        node: &mut GraphNode,
        result: &mut BlameResult,
    ) -> Result<(), BlameError> {
        for candidate in node.files_mut() {
            let text = reader.load_text(&candidate.blob, &candidate.original_path)?;
            candidate.regions = RegionList::whole_file(text.line_count());
            result.initialize(&candidate.original_path, text.line_count());
        }
        Ok(())
    }

    /// Attributes every region still held by the node's candidates to the
    /// node's commit.
    pub(crate) fn save_blame(&self, node: &mut GraphNode, result: &mut BlameResult) {
        let (hash, date, email): (Option<Arc<str>>, Option<i64>, Option<Arc<str>>) =
            match &node.commit {
                NodeCommit::Commit(info) => (
                    Some(Arc::from(info.id.to_hex().as_str())),
                    Some(info.committer_when),
                    info.author_email.as_deref().map(Arc::from),
                ),
                // Working-tree lines stay unattributed.
                NodeCommit::WorkDir { .. } => (None, None, None),
            };
        for candidate in node.files_mut() {
            if !candidate.regions.is_empty() {
                result.save_file(hash.as_ref(), date, email.as_ref(), candidate);
            }
        }
    }

    /// Propagates the child's regions toward a single parent.
    pub(crate) fn blame_parent(
        &self,
        reader: &mut BlobReader<'_, S::Reader>,
        parent: CommitInfo,
        child: &mut GraphNode,
        stats: &mut BlameStats,
    ) -> Result<GraphNode, BlameError> {
        let paths: AHashSet<String> = child.paths().map(str::to_string).collect();
        let compare = self.comparator.find_moved_files(
            reader,
            &parent.id,
            child.commit.id().as_ref(),
            &paths,
            &self.cancel,
        )?;
        stats.over_rename_limit |= compare.over_rename_limit;
        stats.similarity_table_overflow |= compare.table_overflow;

        let mut parent_node = GraphNode::new(NodeCommit::Commit(parent));
        self.blame_with_file_diffs(&mut parent_node, child, &compare.files)?;
        Ok(parent_node)
    }

    /// Propagates the child's regions toward several parents, each against
    /// a snapshot of what the earlier mechanisms left behind.
    pub(crate) fn blame_parents(
        &self,
        reader: &mut BlobReader<'_, S::Reader>,
        parents: Vec<CommitInfo>,
        child: &mut GraphNode,
        stats: &mut BlameStats,
    ) -> Result<Vec<GraphNode>, BlameError> {
        let paths: AHashSet<String> = child.paths().map(str::to_string).collect();
        let child_commit = child.commit.id();

        // Tree diffs against every parent first; hand-offs come after so
        // each parent sees the same diff basis.
        let mut parent_nodes = Vec::with_capacity(parents.len());
        let mut diffs = Vec::with_capacity(parents.len());
        for parent in parents {
            if self.cancel.is_cancelled() {
                return Err(BlameError::Cancelled);
            }
            let compare = self.comparator.find_moved_files(
                reader,
                &parent.id,
                child_commit.as_ref(),
                &paths,
                &self.cancel,
            )?;
            stats.over_rename_limit |= compare.over_rename_limit;
            stats.similarity_table_overflow |= compare.table_overflow;
            parent_nodes.push(GraphNode::new(NodeCommit::Commit(parent)));
            diffs.push(compare.files);
        }

        // Unmodified paths: not mentioned by the diff means identical in
        // parent and child, so the whole file moves over.
        for (parent_node, diff) in parent_nodes.iter_mut().zip(&diffs) {
            let diff_paths: AHashSet<&str> =
                diff.iter().map(|f| f.new_path.as_str()).collect();
            for candidate in child.files_mut() {
                if !candidate.regions.is_empty() && !diff_paths.contains(candidate.path.as_str()) {
                    let path = candidate.path.clone();
                    move_candidate(parent_node, candidate, &path);
                }
            }
        }

        // Renames and copies of identical content: same blob id on both
        // sides short-circuits to a whole-file move under the old path.
        for (parent_node, diff) in parent_nodes.iter_mut().zip(&diffs) {
            for file in diff {
                let Some(old_path) = file.old_path.as_deref() else {
                    continue;
                };
                let indices: Vec<usize> = child.indices_at_path(&file.new_path).to_vec();
                for idx in indices {
                    let candidate = &mut child.files_mut()[idx];
                    if candidate.blob == file.old_id && !candidate.regions.is_empty() {
                        let old_path = old_path.to_string();
                        move_candidate(parent_node, candidate, &old_path);
                    }
                }
            }
        }

        // Modified files: per-file blame jobs split the remaining regions.
        for (parent_node, diff) in parent_nodes.iter_mut().zip(&diffs) {
            if self.cancel.is_cancelled() {
                return Err(BlameError::Cancelled);
            }
            self.blame_with_file_diffs(parent_node, child, diff)?;
        }
        Ok(parent_nodes)
    }

    /// Dispatches blame jobs for diffed files and moves untouched files.
    fn blame_with_file_diffs(
        &self,
        parent_node: &mut GraphNode,
        child: &mut GraphNode,
        diff_files: &[DiffFile],
    ) -> Result<(), BlameError> {
        let mut processed: AHashSet<&str> = AHashSet::new();
        let mut jobs = Vec::new();

        for file in diff_files {
            processed.insert(file.new_path.as_str());
            let Some(old_path) = file.old_path.as_deref() else {
                continue; // added by the child: nothing to inherit
            };
            for &idx in child.indices_at_path(&file.new_path) {
                let candidate = &child.files()[idx];
                jobs.push(BlameJob {
                    child_idx: idx,
                    original_path: candidate.original_path.clone(),
                    child_blob: candidate.blob,
                    parent_path: old_path.to_string(),
                    parent_blob: file.old_id,
                    regions: RegionList::new(), // taken below
                });
            }
        }
        // Take the regions only after indexing finished, one mutable pass.
        for job in &mut jobs {
            job.regions = child.files_mut()[job.child_idx].regions.take();
        }

        let outcomes = self.executor.run_jobs(
            self.store,
            self.overrides,
            self.work_tree,
            self.opts,
            jobs,
        )?;

        // Untouched paths move over whole.
        for candidate in child.files_mut() {
            if !candidate.regions.is_empty() && !processed.contains(candidate.path.as_str()) {
                let path = candidate.path.clone();
                move_candidate(parent_node, candidate, &path);
            }
        }

        for outcome in outcomes {
            child.files_mut()[outcome.child_idx].regions = outcome.residue;
            if let Some(parent_candidate) = outcome.parent {
                if !parent_candidate.regions.is_empty() {
                    parent_node.add_file(parent_candidate);
                }
            }
        }
        Ok(())
    }
}

/// Moves a candidate's remaining regions into `parent_node` at
/// `parent_path`, emptying the child's list.
fn move_candidate(parent_node: &mut GraphNode, candidate: &mut FileCandidate, parent_path: &str) {
    let regions = candidate.regions.take();
    parent_node.add_file(FileCandidate::with_regions(
        &candidate.original_path,
        parent_path,
        candidate.blob,
        regions,
    ));
}
