//! Line tables and the external diff collaborator.
//!
//! Blobs are split into lines once, normalized per the configured
//! comparator, and handed to the `similar` crate as slices of line keys.
//! The resulting edit list uses half-open `[begin, end)` line ranges on
//! both sides, ordered and non-overlapping, which is exactly what the
//! region split consumes.
//!
//! Whitespace-ignoring comparators normalize lines before the diff runs,
//! so two unequal blobs can legitimately produce an empty edit list; the
//! per-file blamer treats that the same as identical content.

use std::borrow::Cow;

use memchr::memchr_iter;
use similar::{capture_diff_slices, Algorithm, DiffTag};

/// One edit between side A (parent) and side B (child).
///
/// Replaces lines `[begin_a, end_a)` of A with `[begin_b, end_b)` of B.
/// Either side may be empty (pure insert or delete).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Edit {
    /// First changed line on side A.
    pub begin_a: usize,
    /// One past the last changed line on side A.
    pub end_a: usize,
    /// First changed line on side B.
    pub begin_b: usize,
    /// One past the last changed line on side B.
    pub end_b: usize,
}

impl Edit {
    /// Number of lines on the B side.
    #[inline]
    #[must_use]
    pub fn len_b(&self) -> usize {
        self.end_b - self.begin_b
    }
}

/// Diff algorithm selection, among those the collaborator offers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DiffAlgorithmKind {
    /// Myers O(ND) diff, the default.
    #[default]
    Myers,
    /// Patience diff (unique-line anchoring).
    Patience,
    /// Longest-common-subsequence diff.
    Lcs,
}

impl From<DiffAlgorithmKind> for Algorithm {
    fn from(kind: DiffAlgorithmKind) -> Self {
        match kind {
            DiffAlgorithmKind::Myers => Algorithm::Myers,
            DiffAlgorithmKind::Patience => Algorithm::Patience,
            DiffAlgorithmKind::Lcs => Algorithm::Lcs,
        }
    }
}

/// Line equivalence used when comparing lines in the diff.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineComparator {
    /// Byte-exact comparison.
    #[default]
    Default,
    /// All ASCII whitespace is ignored.
    IgnoreAllWhitespace,
    /// Runs of whitespace compare equal to a single space; trailing
    /// whitespace is ignored.
    IgnoreWhitespaceChange,
    /// Trailing whitespace is ignored.
    IgnoreTrailingWhitespace,
}

/// Line-offset table over blob bytes.
///
/// Lines exclude their terminating `\n`; a final line without a trailing
/// newline still counts. The empty blob has zero lines.
#[derive(Clone, Debug)]
pub struct LineTable {
    bytes: Vec<u8>,
    /// Start offset of each line, plus a trailing sentinel at `bytes.len()`.
    starts: Vec<usize>,
}

impl LineTable {
    /// Builds the table, scanning for line terminators once.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let mut starts = Vec::with_capacity(16);
        if !bytes.is_empty() {
            starts.push(0);
            for nl in memchr_iter(b'\n', &bytes) {
                if nl + 1 < bytes.len() {
                    starts.push(nl + 1);
                }
            }
        }
        starts.push(bytes.len());
        Self { bytes, starts }
    }

    /// Number of lines.
    #[inline]
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.starts.len() - 1
    }

    /// Returns line `i` without its terminating `\n`.
    #[must_use]
    pub fn line(&self, i: usize) -> &[u8] {
        let start = self.starts[i];
        let mut end = self.starts[i + 1];
        if end > start && self.bytes[end - 1] == b'\n' {
            end -= 1;
        }
        &self.bytes[start..end]
    }

    /// Every line under the comparator's equivalence: borrowed for the
    /// byte-exact comparator, owned normalized bytes otherwise.
    fn comparison_keys(&self, cmp: LineComparator) -> Vec<Cow<'_, [u8]>> {
        (0..self.line_count())
            .map(|i| normalize_line(self.line(i), cmp))
            .collect()
    }
}

/// Computes the ordered edit list between two line tables.
#[must_use]
pub fn compute_edits(
    kind: DiffAlgorithmKind,
    cmp: LineComparator,
    a: &LineTable,
    b: &LineTable,
) -> Vec<Edit> {
    let keys_a = a.comparison_keys(cmp);
    let keys_b = b.comparison_keys(cmp);
    let ops = capture_diff_slices(kind.into(), &keys_a, &keys_b);

    let mut edits = Vec::new();
    for op in ops {
        if op.tag() == DiffTag::Equal {
            continue;
        }
        let old = op.old_range();
        let new = op.new_range();
        edits.push(Edit {
            begin_a: old.start,
            end_a: old.end,
            begin_b: new.start,
            end_b: new.end,
        });
    }
    edits
}

fn normalize_line(line: &[u8], cmp: LineComparator) -> Cow<'_, [u8]> {
    match cmp {
        LineComparator::Default => Cow::Borrowed(line),
        LineComparator::IgnoreAllWhitespace => Cow::Owned(
            line.iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect(),
        ),
        LineComparator::IgnoreWhitespaceChange => {
            let trimmed = trim_trailing(line);
            let mut out = Vec::with_capacity(trimmed.len());
            let mut in_ws = false;
            for &b in trimmed {
                if b.is_ascii_whitespace() {
                    in_ws = true;
                } else {
                    if in_ws {
                        out.push(b' ');
                        in_ws = false;
                    }
                    out.push(b);
                }
            }
            Cow::Owned(out)
        }
        LineComparator::IgnoreTrailingWhitespace => Cow::Borrowed(trim_trailing(line)),
    }
}

fn trim_trailing(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && line[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    &line[..end]
}
