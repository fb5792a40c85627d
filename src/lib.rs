//! Multi-file line provenance ("blame") in a single history walk.
//!
//! Computes, for every line of every target file at a chosen start
//! revision, the commit, author e-mail and commit date that introduced it,
//! following renames, copies and merges. All target files are traced
//! **simultaneously**: one priority-ordered walk of the commit graph
//! carries, per commit, the set of line regions still awaiting
//! attribution.
//!
//! Walk flow (one frontier pop):
//! 1. The scheduler pops the most recent unfinished node.
//! 2. The tree comparator maps each tracked path into each parent
//!    (fast lock-step walk, falling back to rename detection).
//! 3. Unchanged files hand their regions to the parent whole; modified
//!    files are diffed and their region lists split between parent and
//!    child.
//! 4. Regions no parent claimed are attributed to the popped commit;
//!    parents holding regions join the frontier.
//!
//! The object store, the working tree and the textual diff are
//! collaborators behind traits ([`ObjectStore`], [`WorkTree`]) or crates
//! (`similar`); the engine itself never parses packs or walks a `.git`
//! directory. [`InMemoryObjectStore`] backs the test suite and serves
//! embedders that hold history in memory.
//!
//! ```no_run
//! use blame_rs::{BlameCommand, InMemoryObjectStore};
//!
//! let mut store = InMemoryObjectStore::new();
//! let c1 = store.insert_commit(&[], 1700000000, "dev@example.com", &[("src/lib.rs", "fn main() {}\n")]);
//! let result = BlameCommand::new(&store).start_commit(c1).call()?;
//! let file = result.file("src/lib.rs").unwrap();
//! assert_eq!(file.commit_hashes()[0].as_deref(), Some(c1.to_hex().as_str()));
//! # Ok::<(), blame_rs::BlameError>(())
//! ```

mod blob_reader;
mod candidate;
pub mod command;
pub mod diff;
pub mod diff_entry;
pub mod errors;
mod executor;
mod file_blamer;
mod graph_walk;
pub mod object_id;
pub mod object_store;
pub mod options;
pub mod region;
mod rename_detector;
pub mod result;
pub mod similarity_index;
mod similarity_rename;
mod tree_compare;

pub use command::BlameCommand;
pub use diff::{DiffAlgorithmKind, Edit, LineComparator, LineTable};
pub use diff_entry::{ChangeType, DiffEntry, FileMode};
pub use errors::BlameError;
pub use object_id::ObjectId;
pub use object_store::{
    BlobSource, CommitInfo, DiskWorkTree, InMemoryObjectStore, InMemoryReader, ObjectStore,
    TreeFile, WorkTree,
};
pub use options::{BlameOptions, CancelToken, DEFAULT_BIG_FILE_THRESHOLD, DEFAULT_RENAME_SCORE};
pub use region::{Region, RegionList};
pub use result::{BlameResult, BlameStats, FileBlame};
pub use similarity_index::{is_binary, SimilarityIndex, TableFull};
