//! Hunk generation for Modify changes that arrive without hunks.

use serde::{Deserialize, Serialize};
use similar::{Algorithm, DiffTag, capture_diff_slices};
use std::ops::Range;

use super::split_lines;
use crate::model::Hunk;

/// How hunks are derived from original and modified content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HunkStrategy {
    /// One hunk replacing the whole file.
    #[default]
    WholeFile,
    /// One hunk per contiguous group of changed lines.
    LineLevel {
        /// Unchanged lines kept around each hunk for display.
        context_lines: usize,
    },
}

/// Derives hunks describing the edit from `original` to `modified`.
///
/// Identical inputs produce no hunks. Merging every returned hunk over
/// `original` always reproduces `modified`.
#[must_use]
pub fn derive_hunks(original: &str, modified: &str, strategy: HunkStrategy) -> Vec<Hunk> {
    if original == modified {
        return Vec::new();
    }
    match strategy {
        HunkStrategy::WholeFile => vec![whole_file_hunk(original, modified)],
        HunkStrategy::LineLevel { context_lines } => {
            line_level_hunks(original, modified, context_lines)
        }
    }
}

fn to_owned_lines(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| (*l).to_string()).collect()
}

fn line_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

fn whole_file_hunk(original: &str, modified: &str) -> Hunk {
    Hunk::new(
        1,
        to_owned_lines(&split_lines(original)),
        1,
        to_owned_lines(&split_lines(modified)),
    )
}

fn line_level_hunks(original: &str, modified: &str, context_lines: usize) -> Vec<Hunk> {
    let old = split_lines(original);
    let new = split_lines(modified);
    let ops = capture_diff_slices(Algorithm::Myers, &old, &new);

    let mut groups: Vec<(Range<usize>, Range<usize>)> = Vec::new();
    let mut current: Option<(Range<usize>, Range<usize>)> = None;
    for op in &ops {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        if tag == DiffTag::Equal {
            groups.extend(current.take());
            continue;
        }
        current = Some(match current.take() {
            Some((o, n)) => (o.start..old_range.end, n.start..new_range.end),
            None => (old_range, new_range),
        });
    }
    groups.extend(current);

    groups
        .into_iter()
        .map(|(o, n)| {
            let before = &old[o.start.saturating_sub(context_lines)..o.start];
            let after = &old[o.end..(o.end + context_lines).min(old.len())];
            Hunk::new(
                line_number(o.start),
                to_owned_lines(&old[o.clone()]),
                line_number(n.start),
                to_owned_lines(&new[n]),
            )
            .with_context(to_owned_lines(before), to_owned_lines(after))
        })
        .collect()
}
