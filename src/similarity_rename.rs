//! Content-similarity rename and copy detection.
//!
//! Pairs source entries (typically deletes) with destination entries
//! (typically adds) by content similarity, with a small path-name
//! component. Every surviving pair is packed into one `u64` of a score
//! matrix; resolving the sorted matrix from the top claims destinations
//! first-come-first-served.
//!
//! # Encoding
//! The top 8 bits of a matrix word hold the score (bounded well under 128
//! so words stay positive as signed values); two 28-bit fields hold the
//! source and destination indices, each stored inverted
//! (`INDEX_MASK - idx`) so that for equal scores *smaller* original indices
//! sort *higher*. That tie-break gives precedence to files whose names
//! sort earlier in the tree, which downstream ordering depends on.
//!
//! # Degradation
//! A similarity-table overflow removes the affected side from candidacy
//! (the whole source row, or one destination column) and raises the
//! `table_overflow` flag; it never fails the run.

use ahash::AHashSet;

use crate::blob_reader::BlobReader;
use crate::diff_entry::{ChangeType, DiffEntry, FileMode};
use crate::errors::BlameError;
use crate::object_store::BlobSource;
use crate::options::CancelToken;
use crate::similarity_index::{is_binary, SimilarityIndex};

/// Bits per index field; bounds either side at 2^28 entries.
const BITS_PER_INDEX: u32 = 28;
const INDEX_MASK: u64 = (1 << BITS_PER_INDEX) - 1;
const SCORE_SHIFT: u32 = 2 * BITS_PER_INDEX;

/// Content rename detection over one (sources, destinations) split.
pub(crate) struct SimilarityRenameDetector<'m> {
    srcs: Vec<DiffEntry>,
    dsts: Vec<Option<DiffEntry>>,
    /// Source paths already claimed by a rename; re-matches become copies.
    matched_src_paths: &'m mut AHashSet<String>,
    rename_score: u32,
    big_file_threshold: u64,
    skip_binary_files: bool,
    table_overflow: bool,
    matches: Vec<DiffEntry>,
}

/// What the detector produced.
pub(crate) struct SimilarityOutcome {
    /// RENAME/COPY entries above the threshold.
    pub matches: Vec<DiffEntry>,
    /// Destinations no source claimed.
    pub leftover_dsts: Vec<DiffEntry>,
    /// A similarity table overflowed somewhere.
    pub table_overflow: bool,
}

impl<'m> SimilarityRenameDetector<'m> {
    pub(crate) fn new(
        srcs: Vec<DiffEntry>,
        dsts: Vec<DiffEntry>,
        matched_src_paths: &'m mut AHashSet<String>,
        rename_score: u32,
        big_file_threshold: u64,
        skip_binary_files: bool,
    ) -> Self {
        Self {
            srcs,
            dsts: dsts.into_iter().map(Some).collect(),
            matched_src_paths,
            rename_score,
            big_file_threshold,
            skip_binary_files,
            table_overflow: false,
            matches: Vec::new(),
        }
    }

    /// Scores all pairs and claims matches, highest score first.
    pub(crate) fn compute<R: BlobSource>(
        mut self,
        reader: &mut BlobReader<'_, R>,
        cancel: &CancelToken,
    ) -> Result<SimilarityOutcome, BlameError> {
        let mut matrix = self.build_matrix(reader, cancel)?;
        matrix.sort_unstable();

        for &packed in matrix.iter().rev() {
            if cancel.is_cancelled() {
                return Err(BlameError::Cancelled);
            }
            let s_idx = src_of(packed);
            let d_idx = dst_of(packed);
            let Some(dst) = self.dsts[d_idx].take() else {
                continue; // destination already matched
            };
            let src = &self.srcs[s_idx];
            let change_type = if self.matched_src_paths.insert(src.old_path.clone()) {
                ChangeType::Rename
            } else {
                ChangeType::Copy
            };
            self.matches
                .push(DiffEntry::pair(change_type, src, &dst, score_of(packed) as u32));
        }

        Ok(SimilarityOutcome {
            matches: self.matches,
            leftover_dsts: self.dsts.into_iter().flatten().collect(),
            table_overflow: self.table_overflow,
        })
    }

    fn build_matrix<R: BlobSource>(
        &mut self,
        reader: &mut BlobReader<'_, R>,
        cancel: &CancelToken,
    ) -> Result<Vec<u64>, BlameError> {
        let mut matrix = Vec::with_capacity(self.srcs.len() * self.dsts.len());
        let mut src_sizes = vec![0u64; self.srcs.len()];
        let mut dst_sizes = vec![0u64; self.dsts.len()];
        let mut dst_too_large = vec![false; self.dsts.len()];

        'src: for (src_idx, src_ent) in self.srcs.iter().enumerate() {
            if !src_ent.old_mode.is_file() {
                continue;
            }
            let mut src_index: Option<SimilarityIndex> = None;

            for dst_idx in 0..self.dsts.len() {
                if cancel.is_cancelled() {
                    return Err(BlameError::Cancelled);
                }
                let Some(dst_ent) = self.dsts[dst_idx].as_ref() else {
                    continue;
                };
                if !dst_ent.new_mode.is_file()
                    || !FileMode::same_type(src_ent.old_mode, dst_ent.new_mode)
                    || dst_too_large[dst_idx]
                {
                    continue;
                }

                // Size prefilter: cached with a +1 sentinel so zero means
                // "not yet computed".
                if src_sizes[src_idx] == 0 {
                    src_sizes[src_idx] = reader.size_or_zero(&src_ent.old_id)? + 1;
                }
                if dst_sizes[dst_idx] == 0 {
                    dst_sizes[dst_idx] = reader.size_or_zero(&dst_ent.new_id)? + 1;
                }
                let max = src_sizes[src_idx].max(dst_sizes[dst_idx]);
                let min = src_sizes[src_idx].min(dst_sizes[dst_idx]);
                if min * 100 / max < u64::from(self.rename_score) {
                    continue; // sizes alone rule the pair out
                }
                if max > self.big_file_threshold {
                    continue;
                }

                if src_index.is_none() {
                    let bytes = reader.load(&src_ent.old_id, &src_ent.old_path)?;
                    if self.skip_binary_files && is_binary(&bytes) {
                        continue 'src;
                    }
                    match SimilarityIndex::hash_blob(&bytes) {
                        Ok(index) => src_index = Some(index),
                        Err(_) => {
                            self.table_overflow = true;
                            continue 'src;
                        }
                    }
                }

                let bytes = reader.load(&dst_ent.new_id, &dst_ent.new_path)?;
                if self.skip_binary_files && is_binary(&bytes) {
                    continue;
                }
                let dst_index = match SimilarityIndex::hash_blob(&bytes) {
                    Ok(index) => index,
                    Err(_) => {
                        dst_too_large[dst_idx] = true;
                        self.table_overflow = true;
                        continue;
                    }
                };

                let src_index = src_index.as_ref().expect("built above");
                let content_score = src_index.score(&dst_index, 10000);
                // Name score is 0..100; scale it into the content range so
                // it can drop into the blended formula.
                let name = u64::from(name_score(&src_ent.old_path, &dst_ent.new_path)) * 100;
                let score = (content_score * 99 + name) / 10000;
                if score < u64::from(self.rename_score) {
                    continue;
                }
                matrix.push(encode(score, src_idx, dst_idx));
            }
        }

        Ok(matrix)
    }
}

/// Path-name similarity in `[0, 100]`.
///
/// Directory similarity averages a left-to-right common-prefix ratio with a
/// right-to-left common-suffix ratio; file-name similarity is a
/// right-to-left common suffix. All arithmetic is integer.
pub(crate) fn name_score(a: &str, b: &str) -> u32 {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let a_dir_len = a.iter().rposition(|&c| c == b'/').map_or(0, |i| i + 1);
    let b_dir_len = b.iter().rposition(|&c| c == b'/').map_or(0, |i| i + 1);
    let dir_min = a_dir_len.min(b_dir_len);
    let dir_max = a_dir_len.max(b_dir_len);

    let (dir_score_ltr, dir_score_rtl) = if dir_max == 0 {
        (100, 100)
    } else {
        let mut dir_sim = 0;
        while dir_sim < dir_min && a[dir_sim] == b[dir_sim] {
            dir_sim += 1;
        }
        let ltr = dir_sim * 100 / dir_max;
        let rtl = if ltr == 100 {
            100
        } else {
            let mut dir_sim = 0;
            while dir_sim < dir_min && a[a_dir_len - 1 - dir_sim] == b[b_dir_len - 1 - dir_sim] {
                dir_sim += 1;
            }
            dir_sim * 100 / dir_max
        };
        (ltr, rtl)
    };

    let file_min = (a.len() - a_dir_len).min(b.len() - b_dir_len);
    let file_max = (a.len() - a_dir_len).max(b.len() - b_dir_len);
    let file_score = if file_max == 0 {
        100
    } else {
        let mut file_sim = 0;
        while file_sim < file_min && a[a.len() - 1 - file_sim] == b[b.len() - 1 - file_sim] {
            file_sim += 1;
        }
        file_sim * 100 / file_max
    };

    (((dir_score_ltr + dir_score_rtl) * 25) + file_score * 50) as u32 / 100
}

/// Packs a scored pair; see the module docs for the layout.
pub(crate) fn encode(score: u64, src_idx: usize, dst_idx: usize) -> u64 {
    debug_assert!(score < 128);
    debug_assert!((src_idx as u64) <= INDEX_MASK && (dst_idx as u64) <= INDEX_MASK);
    (score << SCORE_SHIFT) | (encode_idx(src_idx) << BITS_PER_INDEX) | encode_idx(dst_idx)
}

pub(crate) fn score_of(packed: u64) -> u64 {
    packed >> SCORE_SHIFT
}

pub(crate) fn src_of(packed: u64) -> usize {
    decode_idx((packed >> BITS_PER_INDEX) & INDEX_MASK)
}

pub(crate) fn dst_of(packed: u64) -> usize {
    decode_idx(packed & INDEX_MASK)
}

#[inline]
fn encode_idx(idx: usize) -> u64 {
    // Inverted so the first file in the list sorts later in the table,
    // breaking score ties in favor of earlier names.
    INDEX_MASK - idx as u64
}

#[inline]
fn decode_idx(v: u64) -> usize {
    (INDEX_MASK - v) as usize
}
