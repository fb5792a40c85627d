//! Priority-ordered walk of the commit graph.
//!
//! The frontier holds one node per reached commit, keyed so the most
//! recent commit pops first (the working tree, with its infinite time,
//! before everything). Popping newest-first guarantees every descendant
//! has contributed its regions before a commit expands, so each commit is
//! processed at most once even through long unrelated tails between a fork
//! and its merge.
//!
//! Reaching a commit that is already queued does not create a second node:
//! the incoming candidates merge into the queued node, region lists
//! joining per `(path, original_path)` key.
//!
//! # Ordering
//! Deterministic: decreasing commit time, ties broken by object id, the
//! working-tree node first. Identical repositories walk identically.

use std::collections::BTreeMap;

use ahash::AHashSet;

use crate::blob_reader::BlobReader;
use crate::candidate::{FileCandidate, GraphNode, NodeCommit};
use crate::errors::BlameError;
use crate::file_blamer::FileBlamer;
use crate::object_id::ObjectId;
use crate::object_store::{ObjectStore, WorkTree};
use crate::options::CancelToken;
use crate::result::BlameResult;

/// Frontier ordering key.
///
/// `BTreeMap::pop_last` must yield the node to expand next, so the `Ord`
/// puts greater commit times last, breaks ties on object id, and treats
/// the absent id of the working-tree node as greater than any real id
/// (its time is already `i64::MAX`, so no real commit outranks it).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct QueueKey {
    time: i64,
    id: Option<ObjectId>,
}

impl QueueKey {
    fn of(node: &GraphNode) -> Self {
        Self {
            time: node.commit.time(),
            id: node.commit.id(),
        }
    }
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time.cmp(&other.time).then_with(|| match (&self.id, &other.id) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (Some(_), None) => std::cmp::Ordering::Less,
            (Some(a), Some(b)) => a.cmp(b),
        })
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Where the walk starts.
pub(crate) enum StartPoint {
    /// A concrete commit.
    Commit(ObjectId),
    /// The working tree, anchored at this head commit.
    WorkDir { head: ObjectId },
}

/// The blame walk over one repository.
pub(crate) struct BlameGenerator<'a, S: ObjectStore> {
    store: &'a S,
    work_tree: Option<&'a dyn WorkTree>,
    overrides: &'a ahash::AHashMap<String, Vec<u8>>,
    blamer: FileBlamer<'a, S>,
    file_paths: Option<&'a AHashSet<String>>,
    queue: BTreeMap<QueueKey, GraphNode>,
    progress: Option<Box<dyn FnMut(u32, &str) + 'a>>,
    cancel: CancelToken,
}

impl<'a, S: ObjectStore> BlameGenerator<'a, S> {
    pub(crate) fn new(
        store: &'a S,
        work_tree: Option<&'a dyn WorkTree>,
        overrides: &'a ahash::AHashMap<String, Vec<u8>>,
        blamer: FileBlamer<'a, S>,
        file_paths: Option<&'a AHashSet<String>>,
        progress: Option<Box<dyn FnMut(u32, &str) + 'a>>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            store,
            work_tree,
            overrides,
            blamer,
            file_paths,
            queue: BTreeMap::new(),
            progress,
            cancel,
        }
    }

    /// Runs the walk to completion, filling `result`.
    pub(crate) fn generate(
        mut self,
        start: StartPoint,
        result: &mut BlameResult,
    ) -> Result<(), BlameError> {
        let mut reader =
            BlobReader::new(self.store.new_reader(), self.overrides, self.work_tree);

        let mut node = match start {
            StartPoint::Commit(id) => self.create_for_commit(&id)?,
            StartPoint::WorkDir { head } => self.create_for_work_dir(head)?,
        };
        if node.is_empty() {
            return Ok(());
        }
        self.blamer.initialize(&mut reader, &mut node, result)?;
        self.push(node);

        let mut iteration: u32 = 0;
        while let Some((_, mut node)) = self.queue.pop_last() {
            if self.cancel.is_cancelled() {
                return Err(BlameError::Cancelled);
            }
            iteration += 1;
            result.stats.commits_processed = iteration;
            if let Some(progress) = self.progress.as_mut() {
                let hash = node
                    .commit
                    .id()
                    .unwrap_or(ObjectId::ZERO)
                    .to_hex();
                progress(iteration, &hash);
            }

            if node.commit.parent_count() == 0 {
                // A root: everything still unattributed belongs to it.
                self.blamer.save_blame(&mut node, result);
                continue;
            }
            self.process(&mut reader, node, result)?;
        }
        Ok(())
    }

    /// Expands one node toward its parents and finalizes what remains.
    fn process(
        &mut self,
        reader: &mut BlobReader<'_, S::Reader>,
        mut node: GraphNode,
        result: &mut BlameResult,
    ) -> Result<(), BlameError> {
        let parent_ids = node.commit.parent_ids();
        let mut parents = Vec::with_capacity(parent_ids.len());
        for id in &parent_ids {
            parents.push(self.store.commit(id)?);
        }

        let parent_nodes = if parents.len() == 1 {
            vec![self.blamer.blame_parent(
                reader,
                parents.into_iter().next().expect("len checked"),
                &mut node,
                &mut result.stats,
            )?]
        } else {
            self.blamer
                .blame_parents(reader, parents, &mut node, &mut result.stats)?
        };

        for parent_node in parent_nodes {
            if !parent_node.is_empty() {
                self.push(parent_node);
            }
        }

        // Regions no parent claimed were introduced by this commit.
        self.blamer.save_blame(&mut node, result);
        Ok(())
    }

    /// Queues a node, merging into an already-queued node for the same
    /// commit.
    ///
    /// Re-entry happens when a fork later merges: the walk reaches the
    /// commit before the fork once through each branch, and both claims
    /// must end up on one node.
    fn push(&mut self, node: GraphNode) {
        let key = QueueKey::of(&node);
        match self.queue.get_mut(&key) {
            Some(existing) => absorb(existing, node),
            None => {
                self.queue.insert(key, node);
            }
        }
    }

    fn create_for_commit(&self, id: &ObjectId) -> Result<GraphNode, BlameError> {
        let info = self.store.commit(id)?;
        let tree = self.store.tree(id)?;
        let mut node = GraphNode::new(NodeCommit::Commit(info));
        for entry in tree {
            if self.tracks(&entry.path) {
                node.add_file(FileCandidate::new(&entry.path, &entry.path, entry.id));
            }
        }
        Ok(node)
    }

    fn create_for_work_dir(&self, head: ObjectId) -> Result<GraphNode, BlameError> {
        let work_tree = self
            .work_tree
            .expect("working-tree start requires a work tree");
        let mut node = GraphNode::new(NodeCommit::WorkDir { parent: head });
        for path in work_tree.files()? {
            if self.tracks(&path) {
                node.add_file(FileCandidate::new(&path, &path, ObjectId::ZERO));
            }
        }
        Ok(node)
    }

    fn tracks(&self, path: &str) -> bool {
        self.file_paths.map_or(true, |paths| paths.contains(path))
    }
}

/// Merges `incoming` into `existing`: same `(path, original_path)` merges
/// region lists, anything else attaches as a new candidate.
fn absorb(existing: &mut GraphNode, incoming: GraphNode) {
    for candidate in incoming.take_files() {
        let found = existing
            .indices_at_path(&candidate.path)
            .iter()
            .copied()
            .find(|&i| existing.files()[i].original_path == candidate.original_path);
        match found {
            Some(i) => existing.files_mut()[i].regions.merge(candidate.regions),
            None => existing.add_file(candidate),
        }
    }
}
