//! Unified-diff style rendering of operations for display.
//!
//! Rendering never affects operation state.

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::fmt;

use crate::model::{ChangeKind, Hunk, Operation};

const DEV_NULL: &str = "/dev/null";

/// Rendering options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffOptions {
    /// Render Modify changes as a real line diff with this many context
    /// lines instead of one whole-file hunk.
    #[serde(default)]
    pub context_lines: Option<usize>,
    /// Append the accept/reject state of every hunk.
    #[serde(default)]
    pub show_hunk_status: bool,
}

/// Renders a unified-diff style view of one operation.
#[must_use]
pub fn generate_diff(operation: &Operation, options: &DiffOptions) -> String {
    let change = &operation.change;
    let path = change.file_path.as_str();
    let mut out = String::new();

    match change.kind {
        ChangeKind::Create => {
            let content = change.new_content.as_deref().unwrap_or_default();
            push_line(&mut out, format_args!("diff --git a/{path} b/{path}"));
            push_line(&mut out, "new file");
            push_line(&mut out, format_args!("--- {DEV_NULL}"));
            push_line(&mut out, format_args!("+++ b/{path}"));
            push_block(&mut out, "", content, '+');
        }
        ChangeKind::Delete => {
            let content = change.original_content.as_deref().unwrap_or_default();
            push_line(&mut out, format_args!("diff --git a/{path} b/{path}"));
            push_line(&mut out, "deleted file");
            push_line(&mut out, format_args!("--- a/{path}"));
            push_line(&mut out, format_args!("+++ {DEV_NULL}"));
            push_block(&mut out, content, "", '-');
        }
        ChangeKind::Rename => {
            let new_path = change.new_file_path.as_deref().unwrap_or_default();
            push_line(&mut out, format_args!("diff --git a/{path} b/{new_path}"));
            push_line(&mut out, format_args!("rename from {path}"));
            push_line(&mut out, format_args!("rename to {new_path}"));
        }
        ChangeKind::Modify => {
            let original = change.original_content.as_deref().unwrap_or_default();
            let modified = change.new_content.as_deref().unwrap_or_default();
            push_line(&mut out, format_args!("diff --git a/{path} b/{path}"));
            match options.context_lines {
                Some(radius) => {
                    let diff = TextDiff::from_lines(original, modified);
                    let a = format!("a/{path}");
                    let b = format!("b/{path}");
                    out.push_str(
                        &diff
                            .unified_diff()
                            .context_radius(radius)
                            .header(&a, &b)
                            .to_string(),
                    );
                }
                None => {
                    push_line(&mut out, format_args!("--- a/{path}"));
                    push_line(&mut out, format_args!("+++ b/{path}"));
                    if original != modified {
                        push_block(&mut out, original, modified, ' ');
                    }
                }
            }
            if options.show_hunk_status {
                if let Some(hunks) = change.hunks.as_deref() {
                    push_hunk_status(&mut out, hunks);
                }
            }
        }
    }

    out
}

/// Appends `line` and a newline. Formatting into a `String` is infallible.
fn push_line(out: &mut String, line: impl fmt::Display) {
    out.push_str(&line.to_string());
    out.push('\n');
}

fn hunk_range(count: usize) -> String {
    if count == 0 {
        "0,0".to_string()
    } else {
        format!("1,{count}")
    }
}

/// Writes one synthetic hunk: every old line removed, every new line added.
/// `marker` selects which side is rendered when the other is empty.
fn push_block(out: &mut String, old: &str, new: &str, marker: char) {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    push_line(
        out,
        format_args!(
            "@@ -{} +{} @@",
            hunk_range(old_lines.len()),
            hunk_range(new_lines.len())
        ),
    );
    if marker != '+' {
        for line in &old_lines {
            push_line(out, format_args!("-{line}"));
        }
    }
    if marker != '-' {
        for line in &new_lines {
            push_line(out, format_args!("+{line}"));
        }
    }
}

fn push_hunk_status(out: &mut String, hunks: &[Hunk]) {
    for (index, hunk) in hunks.iter().enumerate() {
        let state = if hunk.accepted { "accepted" } else { "rejected" };
        push_line(
            out,
            format_args!(
                "# hunk {} [{}]: -{},{} +{},{}",
                index + 1,
                state,
                hunk.original_range.start.line,
                hunk.removed_lines.len(),
                hunk.new_range.start.line,
                hunk.added_lines.len()
            ),
        );
    }
}
