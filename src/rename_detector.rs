//! Rename and copy detection over a bucket of diff entries.
//!
//! Three phases, in order:
//!
//! 1. **Break** (optional): MODIFY entries scoring below `break_score`
//!    are split into DELETE+ADD so both sides re-enter rename matching.
//! 2. **Exact**: adds and deletes bucketed by blob id; identical ids pair
//!    at score 100. One-to-many and many-to-many collisions resolve by
//!    path-name similarity, first claim is a RENAME, later claims COPY.
//! 3. **Content**: the remaining adds and deletes go through the
//!    similarity detector, unless their count exceeds the rename limit.
//!
//! Broken MODIFY halves that did not pair elsewhere are rejoined at the
//! end. The surviving DELETE list is re-sorted by `old_path` between the
//! exact and content phases, so content matching order is reproducible
//! across runs.

use ahash::{AHashMap, AHashSet};

use crate::blob_reader::BlobReader;
use crate::diff_entry::{ChangeType, DiffEntry, FileMode};
use crate::errors::BlameError;
use crate::object_id::ObjectId;
use crate::object_store::BlobSource;
use crate::options::{BlameOptions, CancelToken};
use crate::similarity_index::SimilarityIndex;
use crate::similarity_rename::{
    dst_of, encode, name_score, src_of, SimilarityRenameDetector,
};

const EXACT_RENAME_SCORE: u32 = 100;

/// Result of one rename-detection pass.
#[derive(Debug)]
pub(crate) struct RenameOutcome {
    /// All entries, rewritten and sorted in output order.
    pub entries: Vec<DiffEntry>,
    /// Content rename detection was skipped or degraded by the limit.
    pub over_rename_limit: bool,
    /// A similarity table overflowed somewhere.
    pub table_overflow: bool,
}

/// Single-use rename detector configured from [`BlameOptions`].
pub(crate) struct RenameDetector {
    rename_score: u32,
    break_score: i32,
    rename_limit: i32,
    big_file_threshold: u64,
    skip_binary_files: bool,

    entries: Vec<DiffEntry>,
    added: Vec<DiffEntry>,
    deleted: Vec<DiffEntry>,
    matched_deleted_paths: AHashSet<String>,
    over_rename_limit: bool,
    table_overflow: bool,
}

impl RenameDetector {
    pub(crate) fn new(opts: &BlameOptions) -> Self {
        Self {
            rename_score: opts.rename_score,
            break_score: opts.break_score,
            rename_limit: opts.rename_limit,
            big_file_threshold: opts.big_file_threshold,
            skip_binary_files: opts.skip_binary_files_for_content_renames,
            entries: Vec::new(),
            added: Vec::new(),
            deleted: Vec::new(),
            matched_deleted_paths: AHashSet::new(),
            over_rename_limit: false,
            table_overflow: false,
        }
    }

    /// Buckets incoming entries by change type.
    ///
    /// A MODIFY whose sides differ in type (file became symlink) is broken
    /// immediately regardless of `break_score`.
    pub(crate) fn add_all(&mut self, entries: impl IntoIterator<Item = DiffEntry>) {
        for entry in entries {
            match entry.change_type {
                ChangeType::Add => self.added.push(entry),
                ChangeType::Delete => self.deleted.push(entry),
                ChangeType::Modify => {
                    if FileMode::same_type(entry.old_mode, entry.new_mode) {
                        self.entries.push(entry);
                    } else {
                        let (del, add) = DiffEntry::break_modify(&entry);
                        self.deleted.push(del);
                        self.added.push(add);
                    }
                }
                ChangeType::Copy | ChangeType::Rename => self.entries.push(entry),
            }
        }
    }

    /// Runs all phases and returns the rewritten entry list.
    pub(crate) fn compute<R: BlobSource>(
        mut self,
        reader: &mut BlobReader<'_, R>,
        cancel: &CancelToken,
    ) -> Result<RenameOutcome, BlameError> {
        if self.break_score > 0 {
            self.break_modifies(reader)?;
        }
        if !self.added.is_empty() && !self.deleted.is_empty() {
            self.find_exact_renames();
        }
        if !self.added.is_empty() && !self.deleted.is_empty() {
            self.find_content_renames(reader, cancel)?;
        }
        let matched = &self.matched_deleted_paths;
        self.deleted.retain(|d| !matched.contains(&d.old_path));
        if self.break_score > 0 && !self.added.is_empty() && !self.deleted.is_empty() {
            self.rejoin_modifies();
        }

        let mut entries = self.entries;
        entries.extend(self.added);
        entries.extend(self.deleted);
        entries.sort_by(DiffEntry::cmp_output_order);

        Ok(RenameOutcome {
            entries,
            over_rename_limit: self.over_rename_limit,
            table_overflow: self.table_overflow,
        })
    }

    // -- phase 1 ---------------------------------------------------------

    fn break_modifies<R: BlobSource>(
        &mut self,
        reader: &mut BlobReader<'_, R>,
    ) -> Result<(), BlameError> {
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in std::mem::take(&mut self.entries) {
            if entry.change_type == ChangeType::Modify {
                let score = self.modify_score(reader, &entry)?;
                if (score as i64) < i64::from(self.break_score) {
                    let (mut del, add) = DiffEntry::break_modify(&entry);
                    del.score = score;
                    self.deleted.push(del);
                    self.added.push(add);
                    continue;
                }
            }
            kept.push(entry);
        }
        self.entries = kept;
        Ok(())
    }

    fn modify_score<R: BlobSource>(
        &mut self,
        reader: &mut BlobReader<'_, R>,
        entry: &DiffEntry,
    ) -> Result<u32, BlameError> {
        let old_bytes = reader.load(&entry.old_id, &entry.old_path)?;
        let new_bytes = reader.load(&entry.new_id, &entry.new_path)?;
        let (Ok(src), Ok(dst)) = (
            SimilarityIndex::hash_blob(&old_bytes),
            SimilarityIndex::hash_blob(&new_bytes),
        ) else {
            // An overflowed table must not break the pair: report just
            // above the threshold so it is neither similar nor broken.
            self.table_overflow = true;
            return Ok(self.break_score.max(0) as u32 + 1);
        };
        Ok(src.score(&dst, 100) as u32)
    }

    // -- phase 2 ---------------------------------------------------------

    fn find_exact_renames(&mut self) {
        let deleted = std::mem::take(&mut self.deleted);
        let added = std::mem::take(&mut self.added);

        let (deleted_buckets, _) = bucket_by_id(deleted);
        let (mut added_buckets, added_order) = bucket_by_id(added);

        let mut left: Vec<DiffEntry> = Vec::new();

        for id in &added_order {
            let adds = added_buckets.remove(id).expect("bucketed above");
            let dels = deleted_buckets.get(id);

            if adds.len() == 1 {
                let add = adds.into_iter().next().expect("len checked");
                match dels {
                    Some(bucket) if bucket.len() == 1 => {
                        let del = &bucket[0];
                        if FileMode::same_type(del.old_mode, add.new_mode) {
                            self.matched_deleted_paths.insert(del.old_path.clone());
                            self.entries.push(DiffEntry::pair(
                                ChangeType::Rename,
                                del,
                                &add,
                                EXACT_RENAME_SCORE,
                            ));
                        } else {
                            left.push(add);
                        }
                    }
                    Some(bucket) => {
                        // One add, many deletes: pick the delete whose path
                        // best matches the add.
                        match best_path_match(&add, bucket) {
                            Some(best) => {
                                self.matched_deleted_paths.insert(best.old_path.clone());
                                self.entries.push(DiffEntry::pair(
                                    ChangeType::Rename,
                                    best,
                                    &add,
                                    EXACT_RENAME_SCORE,
                                ));
                            }
                            None => left.push(add),
                        }
                    }
                    None => left.push(add),
                }
                continue;
            }

            // Many adds sharing one blob id.
            match dels {
                Some(bucket) if bucket.len() == 1 => {
                    let del = &bucket[0];
                    match best_path_match(del, &adds) {
                        Some(best) => {
                            let best = best.clone();
                            self.matched_deleted_paths.insert(del.old_path.clone());
                            self.entries.push(DiffEntry::pair(
                                ChangeType::Rename,
                                del,
                                &best,
                                EXACT_RENAME_SCORE,
                            ));
                            for add in adds {
                                if add == best {
                                    continue;
                                }
                                if FileMode::same_type(del.old_mode, add.new_mode) {
                                    self.entries.push(DiffEntry::pair(
                                        ChangeType::Copy,
                                        del,
                                        &add,
                                        EXACT_RENAME_SCORE,
                                    ));
                                } else {
                                    left.push(add);
                                }
                            }
                        }
                        None => left.extend(adds),
                    }
                }
                Some(dels) => {
                    // Many-to-many: a full name-score matrix, resolved
                    // greedily from the best pair down.
                    let mut adds: Vec<Option<DiffEntry>> = adds.into_iter().map(Some).collect();
                    let mut matrix = Vec::with_capacity(dels.len() * adds.len());
                    for (del_idx, del) in dels.iter().enumerate() {
                        for (add_idx, add) in adds.iter().enumerate() {
                            let add = add.as_ref().expect("not yet claimed");
                            let score =
                                u64::from(name_score(&add.new_path, &del.old_path));
                            matrix.push(encode(score, del_idx, add_idx));
                        }
                    }
                    matrix.sort_unstable();
                    for &packed in matrix.iter().rev() {
                        let del = &dels[src_of(packed)];
                        let Some(add) = adds[dst_of(packed)].take() else {
                            continue;
                        };
                        let change_type =
                            if self.matched_deleted_paths.insert(del.old_path.clone()) {
                                ChangeType::Rename
                            } else {
                                ChangeType::Copy
                            };
                        self.entries.push(DiffEntry::pair(
                            change_type,
                            del,
                            &add,
                            EXACT_RENAME_SCORE,
                        ));
                    }
                }
                None => left.extend(adds),
            }
        }

        self.added = left;

        // Deletes survive into the content phase even when exact-matched
        // (a second match becomes a COPY). Re-sorting by old path makes the
        // content phase order-stable.
        let mut deleted: Vec<DiffEntry> =
            deleted_buckets.into_values().flatten().collect();
        deleted.sort_by(|a, b| a.old_path.cmp(&b.old_path));
        self.deleted = deleted;
    }

    // -- phase 3 ---------------------------------------------------------

    fn find_content_renames<R: BlobSource>(
        &mut self,
        reader: &mut BlobReader<'_, R>,
        cancel: &CancelToken,
    ) -> Result<(), BlameError> {
        let cnt = self.added.len().max(self.deleted.len());
        let within_limit =
            self.rename_limit == 0 || (self.rename_limit > 0 && cnt <= self.rename_limit as usize);
        if !within_limit {
            self.over_rename_limit = true;
            return Ok(());
        }

        let srcs = std::mem::take(&mut self.deleted);
        let dsts = std::mem::take(&mut self.added);
        let detector = SimilarityRenameDetector::new(
            srcs.clone(),
            dsts,
            &mut self.matched_deleted_paths,
            self.rename_score,
            self.big_file_threshold,
            self.skip_binary_files,
        );
        let outcome = detector.compute(reader, cancel)?;
        self.table_overflow |= outcome.table_overflow;
        self.added = outcome.leftover_dsts;
        self.deleted = srcs;
        self.entries.extend(outcome.matches);
        Ok(())
    }

    // -- phase 4 ---------------------------------------------------------

    fn rejoin_modifies(&mut self) {
        // Last write wins when several broken deletes share a path.
        let mut name_map: AHashMap<String, DiffEntry> = AHashMap::new();
        for del in std::mem::take(&mut self.deleted) {
            name_map.insert(del.old_path.clone(), del);
        }

        let mut still_added = Vec::new();
        for add in std::mem::take(&mut self.added) {
            match name_map.remove(&add.new_path) {
                Some(del) => {
                    if FileMode::same_type(del.old_mode, add.new_mode) {
                        let score = del.score;
                        self.entries
                            .push(DiffEntry::pair(ChangeType::Modify, &del, &add, score));
                    } else {
                        name_map.insert(del.old_path.clone(), del);
                        still_added.push(add);
                    }
                }
                None => still_added.push(add),
            }
        }
        self.added = still_added;
        self.deleted = name_map.into_values().collect();
    }
}

/// Buckets entries by their significant blob id (old for deletes, new
/// otherwise), remembering first-seen key order for deterministic
/// processing.
fn bucket_by_id(entries: Vec<DiffEntry>) -> (AHashMap<ObjectId, Vec<DiffEntry>>, Vec<ObjectId>) {
    let mut buckets: AHashMap<ObjectId, Vec<DiffEntry>> = AHashMap::new();
    let mut order = Vec::new();
    for entry in entries {
        let id = if entry.change_type == ChangeType::Delete {
            entry.old_id
        } else {
            entry.new_id
        };
        let bucket = buckets.entry(id).or_default();
        if bucket.is_empty() {
            order.push(id);
        }
        bucket.push(entry);
    }
    (buckets, order)
}

/// The entry of `list` whose path best matches `src`, same-type only.
fn best_path_match<'l>(src: &DiffEntry, list: &'l [DiffEntry]) -> Option<&'l DiffEntry> {
    let mut best: Option<&DiffEntry> = None;
    let mut best_score = -1i64;
    for candidate in list {
        if !FileMode::same_type(mode_of(candidate), mode_of(src)) {
            continue;
        }
        let score = i64::from(name_score(path_of(candidate), path_of(src)));
        if score > best_score {
            best = Some(candidate);
            best_score = score;
        }
    }
    best
}

fn path_of(entry: &DiffEntry) -> &str {
    if entry.change_type == ChangeType::Delete {
        &entry.old_path
    } else {
        &entry.new_path
    }
}

fn mode_of(entry: &DiffEntry) -> FileMode {
    if entry.change_type == ChangeType::Delete {
        entry.old_mode
    } else {
        entry.new_mode
    }
}
