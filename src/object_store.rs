//! Object store and working-tree collaborator contracts.
//!
//! The blame core never touches packs, loose objects or an index; it sees
//! history through the traits below. `ObjectStore` serves commit metadata
//! and flattened tree listings, `BlobSource` serves blob bytes and sizes,
//! and `WorkTree` serves uncommitted file content for the working-tree
//! pseudo-commit.
//!
//! # Contract
//! - `tree` returns the recursive listing of a commit's tree, restricted to
//!   regular files (symlinks, gitlinks and directories never appear) and
//!   sorted by path. Blame correctness relies on both properties.
//! - `new_reader` hands out an independent reader; readers are not shared
//!   between threads, each blame worker obtains its own for the lifetime of
//!   a job.
//!
//! `InMemoryObjectStore` implements all three traits and backs the test
//! suite; embedders holding history in memory can use it directly.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashMap;

use crate::diff_entry::FileMode;
use crate::errors::BlameError;
use crate::object_id::ObjectId;

/// Commit metadata needed by the walk.
#[derive(Clone, Debug)]
pub struct CommitInfo {
    /// The commit's own id.
    pub id: ObjectId,
    /// Commit time as signed seconds since the epoch; drives frontier order.
    pub time: i32,
    /// Parent commit ids, in parent order.
    pub parents: Vec<ObjectId>,
    /// Author e-mail, if the commit carries one.
    pub author_email: Option<String>,
    /// Committer timestamp (seconds since the epoch) reported in results.
    pub committer_when: i64,
}

/// One regular-file entry of a flattened tree listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeFile {
    /// Repository-relative path.
    pub path: String,
    /// File mode bits (regular or executable).
    pub mode: FileMode,
    /// Blob id of the file content.
    pub id: ObjectId,
}

/// Read access to commits and trees of a repository.
pub trait ObjectStore: Sync {
    /// Reader handle for blob access; each worker clones its own.
    type Reader: BlobSource + Send;

    /// Resolves the repository head, if any.
    fn head(&self) -> Option<ObjectId>;

    /// Loads commit metadata.
    ///
    /// # Errors
    /// `MissingObject` if `id` does not name a commit.
    fn commit(&self, id: &ObjectId) -> Result<CommitInfo, BlameError>;

    /// Returns the sorted, files-only listing of the commit's tree.
    fn tree(&self, commit: &ObjectId) -> Result<Vec<TreeFile>, BlameError>;

    /// Creates an independent blob reader.
    fn new_reader(&self) -> Self::Reader;
}

/// Blob byte and size access.
///
/// Takes `&mut self` so implementations may keep per-reader caches or
/// stateful decompression buffers without interior mutability.
pub trait BlobSource {
    /// Returns the blob's size in bytes.
    fn size(&mut self, id: &ObjectId) -> Result<u64, BlameError>;

    /// Loads the blob's bytes.
    fn load(&mut self, id: &ObjectId) -> Result<Vec<u8>, BlameError>;
}

/// Read access to the working tree, for blaming uncommitted state.
pub trait WorkTree: Sync {
    /// Lists all file paths in the working tree, repository-relative.
    fn files(&self) -> Result<Vec<String>, BlameError>;

    /// Reads one working-tree file.
    fn read_file(&self, path: &str) -> Result<Vec<u8>, BlameError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// In-memory object store and working tree.
///
/// Commits are assembled through [`insert_commit`](Self::insert_commit);
/// blob ids are deterministic content digests, commit ids additionally mix
/// in an insertion serial so identical snapshots still get distinct ids.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    blobs: AHashMap<ObjectId, Arc<[u8]>>,
    commits: AHashMap<ObjectId, CommitInfo>,
    trees: AHashMap<ObjectId, Arc<Vec<TreeFile>>>,
    head: Option<ObjectId>,
    work_tree: BTreeMap<String, Vec<u8>>,
    commit_serial: u64,
}

impl InMemoryObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores blob content, returning its content-derived id.
    pub fn add_blob(&mut self, content: &[u8]) -> ObjectId {
        let id = digest(&[b"blob", content]);
        self.blobs.insert(id, Arc::from(content));
        id
    }

    /// Creates a commit whose tree holds `files` as regular files.
    ///
    /// `files` maps path to UTF-8 content; the listing is sorted
    /// internally. Returns the new commit id and updates head.
    pub fn insert_commit(
        &mut self,
        parents: &[ObjectId],
        time: i32,
        author_email: &str,
        files: &[(&str, &str)],
    ) -> ObjectId {
        let tree = files
            .iter()
            .map(|(path, content)| TreeFile {
                path: (*path).to_string(),
                mode: FileMode::REGULAR,
                id: self.add_blob(content.as_bytes()),
            })
            .collect();
        self.insert_commit_tree(parents, time, author_email, tree)
    }

    /// Creates a commit from an explicit tree listing (modes included).
    pub fn insert_commit_tree(
        &mut self,
        parents: &[ObjectId],
        time: i32,
        author_email: &str,
        mut tree: Vec<TreeFile>,
    ) -> ObjectId {
        tree.sort_by(|a, b| a.path.cmp(&b.path));

        self.commit_serial += 1;
        let mut parts: Vec<Vec<u8>> = vec![
            b"commit".to_vec(),
            self.commit_serial.to_be_bytes().to_vec(),
            time.to_be_bytes().to_vec(),
        ];
        for parent in parents {
            parts.push(parent.as_slice().to_vec());
        }
        for entry in &tree {
            parts.push(entry.path.as_bytes().to_vec());
            parts.push(entry.id.as_slice().to_vec());
        }
        let borrowed: Vec<&[u8]> = parts.iter().map(Vec::as_slice).collect();
        let id = digest(&borrowed);

        self.trees.insert(id, Arc::new(tree));
        self.commits.insert(
            id,
            CommitInfo {
                id,
                time,
                parents: parents.to_vec(),
                author_email: Some(author_email.to_string()),
                committer_when: i64::from(time),
            },
        );
        self.head = Some(id);
        id
    }

    /// Points head at `id`.
    pub fn set_head(&mut self, id: ObjectId) {
        self.head = Some(id);
    }

    /// Writes a working-tree file.
    pub fn set_work_tree_file(&mut self, path: &str, content: &[u8]) {
        self.work_tree.insert(path.to_string(), content.to_vec());
    }

    /// Removes a working-tree file.
    pub fn remove_work_tree_file(&mut self, path: &str) {
        self.work_tree.remove(path);
    }

    /// Copies a commit's tree content into the working tree.
    ///
    /// Convenient for tests that blame the working directory: the tree of
    /// `commit` becomes the checked-out state.
    pub fn checkout_work_tree(&mut self, commit: &ObjectId) {
        self.work_tree.clear();
        if let Some(tree) = self.trees.get(commit) {
            for entry in tree.iter() {
                if let Some(blob) = self.blobs.get(&entry.id) {
                    self.work_tree
                        .insert(entry.path.clone(), blob.as_ref().to_vec());
                }
            }
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    type Reader = InMemoryReader;

    fn head(&self) -> Option<ObjectId> {
        self.head
    }

    fn commit(&self, id: &ObjectId) -> Result<CommitInfo, BlameError> {
        self.commits
            .get(id)
            .cloned()
            .ok_or(BlameError::MissingObject(*id))
    }

    fn tree(&self, commit: &ObjectId) -> Result<Vec<TreeFile>, BlameError> {
        self.trees
            .get(commit)
            .map(|tree| tree.as_ref().clone())
            .ok_or(BlameError::MissingObject(*commit))
    }

    fn new_reader(&self) -> InMemoryReader {
        InMemoryReader {
            blobs: self.blobs.clone(),
        }
    }
}

impl WorkTree for InMemoryObjectStore {
    fn files(&self) -> Result<Vec<String>, BlameError> {
        Ok(self.work_tree.keys().cloned().collect())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, BlameError> {
        self.work_tree
            .get(path)
            .cloned()
            .ok_or_else(|| BlameError::work_tree_file(path))
    }
}

/// Blob reader over a snapshot of the in-memory store.
#[derive(Debug)]
pub struct InMemoryReader {
    blobs: AHashMap<ObjectId, Arc<[u8]>>,
}

impl BlobSource for InMemoryReader {
    fn size(&mut self, id: &ObjectId) -> Result<u64, BlameError> {
        self.blobs
            .get(id)
            .map(|b| b.len() as u64)
            .ok_or(BlameError::MissingObject(*id))
    }

    fn load(&mut self, id: &ObjectId) -> Result<Vec<u8>, BlameError> {
        self.blobs
            .get(id)
            .map(|b| b.as_ref().to_vec())
            .ok_or(BlameError::MissingObject(*id))
    }
}

// ---------------------------------------------------------------------------
// Filesystem working tree
// ---------------------------------------------------------------------------

/// Working tree rooted at a directory on disk.
///
/// Listing skips the `.git` directory; everything else is reported with
/// `/`-separated repository-relative paths.
#[derive(Debug)]
pub struct DiskWorkTree {
    root: PathBuf,
}

impl DiskWorkTree {
    /// Creates a working tree reader rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<(), BlameError> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if prefix.is_empty() && name == ".git" {
                continue;
            }
            let rel = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                self.collect(&entry.path(), &rel, out)?;
            } else if file_type.is_file() {
                out.push(rel);
            }
            // Symlinks are not blame targets; skip them at enumeration time.
        }
        Ok(())
    }
}

impl WorkTree for DiskWorkTree {
    fn files(&self) -> Result<Vec<String>, BlameError> {
        let mut out = Vec::new();
        self.collect(&self.root, "", &mut out)?;
        out.sort();
        Ok(out)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>, BlameError> {
        std::fs::read(self.root.join(path)).map_err(|_| BlameError::work_tree_file(path))
    }
}

/// Deterministic 20-byte digest over the given parts.
///
/// Not cryptographic; collisions are irrelevant for an in-memory store
/// whose ids never leave the process.
fn digest(parts: &[&[u8]]) -> ObjectId {
    let mut bytes = [0u8; 20];
    for (chunk, salt) in bytes.chunks_mut(8).zip(1u64..) {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        salt.hash(&mut hasher);
        for part in parts {
            part.hash(&mut hasher);
        }
        let word = hasher.finish().to_be_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
    }
    ObjectId::sha1(bytes)
}
