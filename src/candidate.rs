//! File candidates and frontier graph nodes.
//!
//! A `FileCandidate` is one file being traced through history: its path at
//! the start revision (never mutated), its path and blob inside the commit
//! currently holding it, and the regions still awaiting attribution. A
//! `GraphNode` is a commit (or the working tree) plus every candidate whose
//! unattributed regions last passed through it.
//!
//! The heart of propagation is [`take_blame`]: given the edit list between
//! a parent and child blob, it partitions the child's region list into the
//! part the parent answers for and the part the child keeps.

use ahash::AHashMap;

use crate::diff::Edit;
use crate::object_id::ObjectId;
use crate::object_store::CommitInfo;
use crate::region::{Region, RegionList};

/// One file being traced through history.
#[derive(Clone, Debug)]
pub(crate) struct FileCandidate {
    /// Path at the start revision; keys the result arrays.
    pub original_path: String,
    /// Path inside the node currently holding this candidate.
    pub path: String,
    /// Blob id; [`ObjectId::ZERO`] means working-tree content at
    /// `original_path`.
    pub blob: ObjectId,
    /// Regions still awaiting attribution; empty when everything moved on.
    pub regions: RegionList,
}

impl FileCandidate {
    pub(crate) fn new(original_path: &str, path: &str, blob: ObjectId) -> Self {
        Self {
            original_path: original_path.to_string(),
            path: path.to_string(),
            blob,
            regions: RegionList::new(),
        }
    }

    pub(crate) fn with_regions(
        original_path: &str,
        path: &str,
        blob: ObjectId,
        regions: RegionList,
    ) -> Self {
        Self {
            original_path: original_path.to_string(),
            path: path.to_string(),
            blob,
            regions,
        }
    }
}

/// Partitions a child's regions between parent (A side) and child (B side)
/// according to the edit list from diffing parent against child.
///
/// Lines untouched by any edit move to the parent with their source offset
/// rebased into parent coordinates; lines inside an edit's B range stay
/// with the child, which introduced them. Both outputs preserve result
/// order and the coalescing invariant.
pub(crate) fn take_blame(edits: &[Edit], child_regions: RegionList) -> (RegionList, RegionList) {
    let mut a = RegionList::new();
    let mut b = RegionList::new();
    let mut rest = child_regions.into_iter();
    let mut cur = rest.next();
    let mut e_idx = 0;

    while e_idx < edits.len() {
        let Some(mut r) = cur else {
            return (a, b);
        };
        let e = edits[e_idx];

        // Edit ends before the next region: skip the edit.
        if e.end_b <= r.source_start {
            cur = Some(r);
            e_idx += 1;
            continue;
        }

        // Region starts before the edit: the prefix is untouched, so the
        // parent answers for it.
        if r.source_start < e.begin_b {
            let d = e.begin_b - r.source_start;
            debug_assert!(d <= e.begin_a, "common run shorter on the A side");
            if r.length <= d {
                r.source_start = e.begin_a - d;
                a.push(r);
                cur = rest.next();
                continue;
            }
            a.push(r.split_first(e.begin_a - d, d));
            r.slide_and_shrink(d);
        }

        // Now e.begin_b <= r.source_start. An edit with an empty B side
        // overlaps nothing.
        if e.len_b() == 0 {
            cur = Some(r);
            e_idx += 1;
            continue;
        }

        // Region ends within the edit: the child keeps it whole.
        let r_end = r.source_start + r.length;
        if r_end <= e.end_b {
            b.push(r);
            cur = rest.next();
            if r_end == e.end_b {
                e_idx += 1;
            }
            continue;
        }

        // Region extends beyond the edit: child keeps the covered part,
        // the remainder is reconsidered against later edits.
        let len = e.end_b - r.source_start;
        b.push(r.split_first(r.source_start, len));
        r.slide_and_shrink(len);
        cur = Some(r);
        e_idx += 1;
    }

    // Whatever survives every edit belongs to the parent, rebased by the
    // net line drift of the last edit.
    if let Some(last) = edits.last() {
        let end_b = last.end_b;
        let drift = end_b as isize - last.end_a as isize;
        let mut push_shifted = |mut r: Region| {
            if end_b <= r.source_start {
                r.source_start = (r.source_start as isize - drift) as usize;
            }
            a.push(r);
        };
        if let Some(r) = cur {
            push_shifted(r);
        }
        for r in rest {
            push_shifted(r);
        }
    } else {
        // No edits at all: everything moves to the parent untouched.
        if let Some(r) = cur {
            a.push(r);
        }
        for r in rest {
            a.push(r);
        }
    }

    (a, b)
}

// ---------------------------------------------------------------------------
// Graph nodes
// ---------------------------------------------------------------------------

/// The commit identity a frontier node represents.
#[derive(Clone, Debug)]
pub(crate) enum NodeCommit {
    /// A real commit from the object store.
    Commit(CommitInfo),
    /// The working tree, anchored at its single parent commit.
    WorkDir { parent: ObjectId },
}

impl NodeCommit {
    /// Effective commit time; the working tree sorts above everything.
    pub(crate) fn time(&self) -> i64 {
        match self {
            Self::Commit(info) => i64::from(info.time),
            Self::WorkDir { .. } => i64::MAX,
        }
    }

    /// The commit id; absent for the working tree.
    pub(crate) fn id(&self) -> Option<ObjectId> {
        match self {
            Self::Commit(info) => Some(info.id),
            Self::WorkDir { .. } => None,
        }
    }

    pub(crate) fn parent_count(&self) -> usize {
        match self {
            Self::Commit(info) => info.parents.len(),
            Self::WorkDir { .. } => 1,
        }
    }

    pub(crate) fn parent_ids(&self) -> Vec<ObjectId> {
        match self {
            Self::Commit(info) => info.parents.clone(),
            Self::WorkDir { parent } => vec![*parent],
        }
    }
}

/// A frontier node: one commit identity plus its live candidates.
///
/// Multiple candidates may share a `path` when several blamed files
/// converged there through different rename histories; they stay distinct
/// through `original_path`.
#[derive(Debug)]
pub(crate) struct GraphNode {
    pub(crate) commit: NodeCommit,
    files: Vec<FileCandidate>,
    by_path: AHashMap<String, Vec<usize>>,
}

impl GraphNode {
    pub(crate) fn new(commit: NodeCommit) -> Self {
        Self {
            commit,
            files: Vec::new(),
            by_path: AHashMap::new(),
        }
    }

    pub(crate) fn with_files(commit: NodeCommit, files: Vec<FileCandidate>) -> Self {
        let mut node = Self::new(commit);
        for file in files {
            node.add_file(file);
        }
        node
    }

    pub(crate) fn add_file(&mut self, candidate: FileCandidate) {
        let idx = self.files.len();
        self.by_path
            .entry(candidate.path.clone())
            .or_default()
            .push(idx);
        self.files.push(candidate);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub(crate) fn files(&self) -> &[FileCandidate] {
        &self.files
    }

    pub(crate) fn files_mut(&mut self) -> &mut [FileCandidate] {
        &mut self.files
    }

    pub(crate) fn take_files(self) -> Vec<FileCandidate> {
        self.files
    }

    /// Candidate indices stored under `path` in this node.
    pub(crate) fn indices_at_path(&self, path: &str) -> &[usize] {
        self.by_path.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All candidate paths in this node.
    pub(crate) fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.by_path.keys().map(String::as_str)
    }
}
