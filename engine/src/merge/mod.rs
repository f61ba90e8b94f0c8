//! Selective hunk merging.
//!
//! Given the original content of a file and a set of hunks with mixed
//! acceptance, [`merge_hunks`] produces the content containing only the
//! accepted hunks. [`derive`] generates hunks for changes that arrive without
//! them.

pub mod derive;

pub use derive::{HunkStrategy, derive_hunks};

use crate::model::Hunk;

/// Splits content into the line model shared by merging and derivation.
///
/// Lines are the `\n`-separated segments, so a trailing newline yields a
/// final empty line and `split_lines(s).join("\n") == s` always holds.
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    content.split('\n').collect()
}

/// Applies the accepted hunks in `hunks` to `original`.
///
/// Hunks are spliced from the bottom of the file upwards so that splicing a
/// later hunk never shifts the line numbers of an earlier one. Overlapping
/// hunks are not detected; callers must not produce them. Out-of-range hunks
/// are clamped to the end of the content.
#[must_use]
pub fn merge_hunks(original: &str, hunks: &[Hunk]) -> String {
    let mut accepted: Vec<&Hunk> = hunks.iter().filter(|h| h.accepted).collect();
    if accepted.is_empty() {
        return original.to_string();
    }

    let mut lines = split_lines(original);
    accepted.sort_by(|a, b| b.original_range.start.line.cmp(&a.original_range.start.line));

    for hunk in accepted {
        let start = (hunk.original_range.start.line.saturating_sub(1) as usize).min(lines.len());
        let end = (hunk.original_range.end.line as usize).clamp(start, lines.len());
        lines.splice(start..end, hunk.added_lines.iter().map(String::as_str));
    }

    lines.join("\n")
}
