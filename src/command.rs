//! Public entry point: configure and run a blame.
//!
//! ```no_run
//! use blame_rs::{BlameCommand, InMemoryObjectStore};
//!
//! let store = InMemoryObjectStore::new();
//! let result = BlameCommand::new(&store).call()?;
//! for file in result.files() {
//!     println!("{}: {} lines", file.path(), file.line_count());
//! }
//! # Ok::<(), blame_rs::BlameError>(())
//! ```

use ahash::{AHashMap, AHashSet};

use crate::errors::BlameError;
use crate::file_blamer::FileBlamer;
use crate::graph_walk::{BlameGenerator, StartPoint};
use crate::object_id::ObjectId;
use crate::object_store::{ObjectStore, WorkTree};
use crate::options::{BlameOptions, CancelToken};
use crate::result::BlameResult;

/// Builder for one blame run.
///
/// Without a start commit the working tree is blamed, anchored at head;
/// uncommitted lines stay unattributed. Without a work tree, head itself
/// is blamed instead (the bare-repository behavior).
pub struct BlameCommand<'a, S: ObjectStore> {
    store: &'a S,
    work_tree: Option<&'a dyn WorkTree>,
    options: BlameOptions,
    start_commit: Option<ObjectId>,
    file_paths: Option<AHashSet<String>>,
    file_contents: AHashMap<String, Vec<u8>>,
    progress: Option<Box<dyn FnMut(u32, &str) + 'a>>,
    cancel: CancelToken,
}

impl<'a, S: ObjectStore> BlameCommand<'a, S> {
    /// Creates a command over `store` with default options.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            work_tree: None,
            options: BlameOptions::default(),
            start_commit: None,
            file_paths: None,
            file_contents: AHashMap::new(),
            progress: None,
            cancel: CancelToken::new(),
        }
    }

    /// Supplies working-tree access, enabling working-tree blame.
    #[must_use]
    pub fn work_tree(mut self, work_tree: &'a dyn WorkTree) -> Self {
        self.work_tree = Some(work_tree);
        self
    }

    /// Replaces all options.
    #[must_use]
    pub fn options(mut self, options: BlameOptions) -> Self {
        self.options = options;
        self
    }

    /// Starts the walk at this commit instead of the working tree.
    #[must_use]
    pub fn start_commit(mut self, commit: ObjectId) -> Self {
        self.start_commit = Some(commit);
        self
    }

    /// Restricts blame to the given repository-relative paths.
    ///
    /// An explicitly empty set yields an empty result without walking.
    #[must_use]
    pub fn file_paths(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.file_paths = Some(paths.into_iter().collect());
        self
    }

    /// Substitutes in-memory content for working-tree files.
    #[must_use]
    pub fn file_contents(mut self, contents: AHashMap<String, Vec<u8>>) -> Self {
        self.file_contents = contents;
        self
    }

    /// Called once per processed frontier node with `(iteration, hash)`.
    ///
    /// The working-tree node reports the zero id. Iterations count from 1.
    #[must_use]
    pub fn progress(mut self, callback: impl FnMut(u32, &str) + 'a) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Installs a cancellation token; cancel it from another thread to
    /// abort the walk at the next check point.
    #[must_use]
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs the blame.
    ///
    /// # Errors
    /// - [`BlameError::NoHead`] without a start commit in an empty repo.
    /// - [`BlameError::Cancelled`] if the token fires.
    /// - [`BlameError::MissingObject`] / [`BlameError::Io`] from the store.
    pub fn call(self) -> Result<BlameResult, BlameError> {
        let mut result = BlameResult::new();
        if matches!(&self.file_paths, Some(paths) if paths.is_empty()) {
            return Ok(result);
        }

        let start = match self.start_commit {
            Some(id) => StartPoint::Commit(id),
            None => {
                let head = self.store.head().ok_or(BlameError::NoHead)?;
                if self.work_tree.is_some() {
                    StartPoint::WorkDir { head }
                } else {
                    StartPoint::Commit(head)
                }
            }
        };

        let blamer = FileBlamer::new(
            self.store,
            &self.options,
            &self.file_contents,
            self.work_tree,
            self.cancel.clone(),
        );
        let generator = BlameGenerator::new(
            self.store,
            self.work_tree,
            &self.file_contents,
            blamer,
            self.file_paths.as_ref(),
            self.progress,
            self.cancel.clone(),
        );
        generator.generate(start, &mut result)?;
        Ok(result)
    }
}
