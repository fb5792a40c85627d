//! Error type for the blame walk.
//!
//! Degradations are deliberately not errors: a similarity-table overflow or
//! an exceeded rename limit only narrows rename detection and is surfaced
//! through `BlameStats` flags instead. The enum below covers the failures
//! that abort a run.
//!
//! The enum is `#[non_exhaustive]` so variants can be added without breaking
//! callers; consumers should include a fallback match arm.

use std::fmt;
use std::io;

use crate::object_id::ObjectId;

/// Errors that abort a blame run.
#[derive(Debug)]
#[non_exhaustive]
pub enum BlameError {
    /// Cooperative cancellation was requested via the cancel token.
    Cancelled,
    /// No start commit was supplied and the repository has no resolvable head.
    NoHead,
    /// An object referenced by a tree could not be opened.
    MissingObject(ObjectId),
    /// A working-tree file could not be read.
    WorkTreeFile { path: String },
    /// I/O error from the object store or working tree.
    Io(io::Error),
}

impl BlameError {
    /// Creates a working-tree read error for `path`.
    #[inline]
    pub fn work_tree_file(path: impl Into<String>) -> Self {
        Self::WorkTreeFile { path: path.into() }
    }
}

impl fmt::Display for BlameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "blame cancelled"),
            Self::NoHead => write!(f, "no start commit given and no head to resolve"),
            Self::MissingObject(id) => write!(f, "missing object: {id}"),
            Self::WorkTreeFile { path } => {
                write!(f, "failed to read working-tree file: {path}")
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for BlameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for BlameError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
