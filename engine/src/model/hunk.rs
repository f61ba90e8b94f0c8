//! Hunks: independently reviewable line-range edits inside a Modify change.

use serde::{Deserialize, Serialize};

use super::ValidationError;
use super::ids::HunkId;

/// A 1-indexed line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: u32,
    /// Column number, starting at 1.
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A range of lines in a file.
///
/// An empty range (an insertion point before `start.line`) is encoded with
/// `end.line == start.line - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    /// First position covered by the range.
    pub start: Position,
    /// Last position covered by the range.
    pub end: Position,
}

impl Range {
    /// Builds a range covering `count` whole lines starting at `start_line`.
    ///
    /// `last_line_len` is the character length of the final covered line and
    /// only feeds the end column.
    #[must_use]
    pub fn lines(start_line: u32, count: usize, last_line_len: usize) -> Self {
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        let end_line = start_line.saturating_add(count).saturating_sub(1);
        let end_column = u32::try_from(last_line_len).unwrap_or(u32::MAX).saturating_add(1);
        Self {
            start: Position::new(start_line, 1),
            end: Position::new(end_line, if count == 0 { 1 } else { end_column }),
        }
    }

    /// Number of lines spanned by the range. Empty ranges span zero lines.
    #[must_use]
    pub fn line_span(&self) -> usize {
        let span = (u64::from(self.end.line) + 1).saturating_sub(u64::from(self.start.line));
        usize::try_from(span).unwrap_or(usize::MAX)
    }

    /// Whether this range is a pure insertion point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_span() == 0
    }
}

/// A contiguous edit: the lines it removes from the original, the lines it
/// puts in their place, and whether the reviewer has accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    /// Hunk ID.
    pub id: HunkId,
    /// Lines replaced in the original content.
    pub original_range: Range,
    /// Lines occupied in the new content.
    pub new_range: Range,
    /// Original lines removed by this hunk.
    pub removed_lines: Vec<String>,
    /// Lines inserted in their place.
    pub added_lines: Vec<String>,
    /// Unchanged lines shown before the hunk. Display only.
    #[serde(default)]
    pub context_before: Vec<String>,
    /// Unchanged lines shown after the hunk. Display only.
    #[serde(default)]
    pub context_after: Vec<String>,
    /// Whether this hunk will be applied.
    pub accepted: bool,
}

impl Hunk {
    /// Creates an accepted hunk replacing `removed_lines` (starting at
    /// `original_start`) with `added_lines` (starting at `new_start`).
    #[must_use]
    pub fn new(
        original_start: u32,
        removed_lines: Vec<String>,
        new_start: u32,
        added_lines: Vec<String>,
    ) -> Self {
        let original_range = Range::lines(
            original_start,
            removed_lines.len(),
            removed_lines.last().map_or(0, |l| l.chars().count()),
        );
        let new_range = Range::lines(
            new_start,
            added_lines.len(),
            added_lines.last().map_or(0, |l| l.chars().count()),
        );
        Self {
            id: HunkId::generate(),
            original_range,
            new_range,
            removed_lines,
            added_lines,
            context_before: Vec::new(),
            context_after: Vec::new(),
            accepted: true,
        }
    }

    /// Attaches display context to the hunk.
    #[must_use]
    pub fn with_context(mut self, before: Vec<String>, after: Vec<String>) -> Self {
        self.context_before = before;
        self.context_after = after;
        self
    }

    /// Checks that the original range agrees with the removed lines.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::HunkRangeMismatch`] when the original line
    /// span differs from `removed_lines.len()`, or
    /// [`ValidationError::HunkStartLine`] for a zero start line.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.original_range.start.line == 0 {
            return Err(ValidationError::HunkStartLine(self.id.to_string()));
        }
        let span = self.original_range.line_span();
        if span != self.removed_lines.len() {
            return Err(ValidationError::HunkRangeMismatch {
                hunk: self.id.to_string(),
                span,
                removed: self.removed_lines.len(),
            });
        }
        Ok(())
    }
}
