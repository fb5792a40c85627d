//! File change entries consumed by rename detection.
//!
//! A `DiffEntry` records one path-level change between a parent and a child
//! tree. The rename detector rewrites ADD/DELETE pairs into RENAME or COPY
//! entries; everything else passes through.
//!
//! # Output Ordering
//! Final entry lists sort by name (`new_path`, or `old_path` for deletes),
//! with DELETE before ADD before all other change types, so a type change
//! of one path reads as "remove, then add back".

use std::cmp::Ordering;

use crate::object_id::ObjectId;

/// File mode bits, following the canonical tree-entry encoding.
///
/// Only the type bits matter for rename compatibility: a regular file is
/// never paired with a symlink or a gitlink, regardless of content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Mask selecting the entry-type bits.
    pub const TYPE_MASK: u32 = 0o170000;
    /// Type bits of a regular file.
    pub const TYPE_FILE: u32 = 0o100000;

    /// Regular, non-executable file.
    pub const REGULAR: FileMode = FileMode(0o100644);
    /// Regular file with the executable bit.
    pub const EXECUTABLE: FileMode = FileMode(0o100755);
    /// Symbolic link.
    pub const SYMLINK: FileMode = FileMode(0o120000);
    /// Gitlink (submodule commit).
    pub const GITLINK: FileMode = FileMode(0o160000);
    /// Absent side of an add or delete.
    pub const MISSING: FileMode = FileMode(0);

    /// Returns true if the type bits mark a regular (or executable) file.
    #[inline]
    #[must_use]
    pub const fn is_file(self) -> bool {
        self.0 & Self::TYPE_MASK == Self::TYPE_FILE
    }

    /// Returns true if both modes have identical type bits.
    #[inline]
    #[must_use]
    pub const fn same_type(a: FileMode, b: FileMode) -> bool {
        a.0 & Self::TYPE_MASK == b.0 & Self::TYPE_MASK
    }
}

/// Kind of change a `DiffEntry` describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Path exists only in the child.
    Add,
    /// Path exists only in the parent.
    Delete,
    /// Same path, different content or mode.
    Modify,
    /// Content moved from `old_path` to `new_path`.
    Rename,
    /// Content duplicated from `old_path` to `new_path`.
    Copy,
}

/// One file-level change between a parent and a child tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiffEntry {
    /// The kind of change.
    pub change_type: ChangeType,
    /// Path on the parent side (`new_path` mirrored for adds).
    pub old_path: String,
    /// Path on the child side (`old_path` mirrored for deletes).
    pub new_path: String,
    /// Parent-side blob id; zero for adds.
    pub old_id: ObjectId,
    /// Child-side blob id; zero for deletes.
    pub new_id: ObjectId,
    /// Parent-side mode; `MISSING` for adds.
    pub old_mode: FileMode,
    /// Child-side mode; `MISSING` for deletes.
    pub new_mode: FileMode,
    /// Similarity score for renames/copies, 100 for exact matches.
    pub score: u32,
}

impl DiffEntry {
    /// Entry for a file that exists only in the child.
    #[must_use]
    pub fn add(path: &str, id: ObjectId, mode: FileMode) -> Self {
        Self {
            change_type: ChangeType::Add,
            old_path: path.to_string(),
            new_path: path.to_string(),
            old_id: ObjectId::ZERO,
            new_id: id,
            old_mode: FileMode::MISSING,
            new_mode: mode,
            score: 0,
        }
    }

    /// Entry for a file that exists only in the parent.
    #[must_use]
    pub fn delete(path: &str, id: ObjectId, mode: FileMode) -> Self {
        Self {
            change_type: ChangeType::Delete,
            old_path: path.to_string(),
            new_path: path.to_string(),
            old_id: id,
            new_id: ObjectId::ZERO,
            old_mode: mode,
            new_mode: FileMode::MISSING,
            score: 0,
        }
    }

    /// Entry for a same-path content or mode change.
    #[must_use]
    pub fn modify(
        path: &str,
        old_id: ObjectId,
        old_mode: FileMode,
        new_id: ObjectId,
        new_mode: FileMode,
    ) -> Self {
        Self {
            change_type: ChangeType::Modify,
            old_path: path.to_string(),
            new_path: path.to_string(),
            old_id,
            new_id,
            old_mode,
            new_mode,
            score: 0,
        }
    }

    /// Joins the old side of `src` with the new side of `dst`.
    ///
    /// This is how rename detection emits RENAME/COPY entries, and how the
    /// rejoin phase restores a broken MODIFY.
    #[must_use]
    pub fn pair(change_type: ChangeType, src: &DiffEntry, dst: &DiffEntry, score: u32) -> Self {
        Self {
            change_type,
            old_path: src.old_path.clone(),
            new_path: dst.new_path.clone(),
            old_id: src.old_id,
            new_id: dst.new_id,
            old_mode: src.old_mode,
            new_mode: dst.new_mode,
            score,
        }
    }

    /// Splits a MODIFY into its (DELETE, ADD) halves.
    #[must_use]
    pub fn break_modify(entry: &DiffEntry) -> (DiffEntry, DiffEntry) {
        debug_assert_eq!(entry.change_type, ChangeType::Modify);
        (
            Self::delete(&entry.old_path, entry.old_id, entry.old_mode),
            Self::add(&entry.new_path, entry.new_id, entry.new_mode),
        )
    }

    /// The path an entry sorts under: `old_path` for deletes, `new_path`
    /// otherwise.
    #[must_use]
    pub fn sort_name(&self) -> &str {
        if self.change_type == ChangeType::Delete {
            &self.old_path
        } else {
            &self.new_path
        }
    }

    fn sort_rank(change_type: ChangeType) -> u8 {
        match change_type {
            ChangeType::Delete => 1,
            ChangeType::Add => 2,
            _ => 10,
        }
    }

    /// Final output ordering: by name, deletes before adds before the rest.
    #[must_use]
    pub fn cmp_output_order(a: &DiffEntry, b: &DiffEntry) -> Ordering {
        a.sort_name()
            .cmp(b.sort_name())
            .then_with(|| Self::sort_rank(a.change_type).cmp(&Self::sort_rank(b.change_type)))
    }
}
