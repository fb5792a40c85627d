//! Blob content access for blame workers and rename scoring.
//!
//! Resolves a candidate's content from one of three places: the object
//! store (real blob ids), caller-supplied content overrides, or the working
//! tree (both for the zero-id sentinel). Each worker wraps its own cloned
//! store reader; the overrides map and work tree are shared read-only.

use ahash::AHashMap;

use crate::diff::LineTable;
use crate::errors::BlameError;
use crate::object_id::ObjectId;
use crate::object_store::{BlobSource, WorkTree};

/// Content access for one worker.
pub(crate) struct BlobReader<'a, R: BlobSource> {
    reader: R,
    overrides: &'a AHashMap<String, Vec<u8>>,
    work_tree: Option<&'a dyn WorkTree>,
}

impl<'a, R: BlobSource> BlobReader<'a, R> {
    pub(crate) fn new(
        reader: R,
        overrides: &'a AHashMap<String, Vec<u8>>,
        work_tree: Option<&'a dyn WorkTree>,
    ) -> Self {
        Self {
            reader,
            overrides,
            work_tree,
        }
    }

    /// Loads content by blob id, or by `path` from overrides/work tree when
    /// the id is the working-tree sentinel.
    pub(crate) fn load(&mut self, id: &ObjectId, path: &str) -> Result<Vec<u8>, BlameError> {
        if id.is_zero() {
            if let Some(content) = self.overrides.get(path) {
                return Ok(content.clone());
            }
            return match self.work_tree {
                Some(wt) => wt.read_file(path),
                None => Err(BlameError::work_tree_file(path)),
            };
        }
        self.reader.load(id)
    }

    /// Loads content as a line table.
    pub(crate) fn load_text(&mut self, id: &ObjectId, path: &str) -> Result<LineTable, BlameError> {
        Ok(LineTable::new(self.load(id, path)?))
    }

    /// Blob size for the rename-detector prefilter.
    ///
    /// A missing object reports size 0 so the pair is discarded cheaply;
    /// only a later full `load` makes the missing object fatal.
    pub(crate) fn size_or_zero(&mut self, id: &ObjectId) -> Result<u64, BlameError> {
        match self.reader.size(id) {
            Ok(size) => Ok(size),
            Err(BlameError::MissingObject(_)) => Ok(0),
            Err(err) => Err(err),
        }
    }
}
