//! File-level change descriptions.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ValidationError;
use super::hunk::Hunk;
use super::ids::ChangeId;

/// Kind of file-level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// A new file is written.
    Create,
    /// An existing file's content is replaced, optionally hunk by hunk.
    Modify,
    /// An existing file is removed.
    Delete,
    /// A file is moved to a new path.
    Rename,
}

impl ChangeKind {
    /// Whether applying this kind destroys content that must be backed up.
    #[must_use]
    pub fn is_destructive(self) -> bool {
        matches!(self, Self::Modify | Self::Delete)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Modify => write!(f, "modify"),
            Self::Delete => write!(f, "delete"),
            Self::Rename => write!(f, "rename"),
        }
    }
}

/// A typed description of one file-level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    /// Change ID.
    pub id: ChangeId,
    /// Kind of change.
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    /// Path the change applies to (the source path for a rename).
    pub file_path: String,
    /// Destination path. Rename only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_file_path: Option<String>,
    /// Content the proposer saw. Modify and Delete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_content: Option<String>,
    /// Proposed content. Create and Modify.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_content: Option<String>,
    /// Reviewable hunks. Modify only; `None` means full replacement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hunks: Option<Vec<Hunk>>,
    /// Language tag for display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Change {
    fn base(kind: ChangeKind, file_path: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let language = language_for_path(&file_path).map(str::to_string);
        Self {
            id: ChangeId::generate(),
            kind,
            file_path,
            new_file_path: None,
            original_content: None,
            new_content: None,
            hunks: None,
            language,
        }
    }

    /// A change creating `file_path` with `content`.
    #[must_use]
    pub fn create(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            new_content: Some(content.into()),
            ..Self::base(ChangeKind::Create, file_path)
        }
    }

    /// A change replacing `original` with `modified` in `file_path`.
    ///
    /// Hunks are derived by the engine when the change is added to a session.
    #[must_use]
    pub fn modify(
        file_path: impl Into<String>,
        original: impl Into<String>,
        modified: impl Into<String>,
    ) -> Self {
        Self {
            original_content: Some(original.into()),
            new_content: Some(modified.into()),
            ..Self::base(ChangeKind::Modify, file_path)
        }
    }

    /// A change deleting `file_path`, whose content is expected to be `original`.
    #[must_use]
    pub fn delete(file_path: impl Into<String>, original: impl Into<String>) -> Self {
        Self {
            original_content: Some(original.into()),
            ..Self::base(ChangeKind::Delete, file_path)
        }
    }

    /// A change moving `file_path` to `new_file_path`.
    #[must_use]
    pub fn rename(file_path: impl Into<String>, new_file_path: impl Into<String>) -> Self {
        Self {
            new_file_path: Some(new_file_path.into()),
            ..Self::base(ChangeKind::Rename, file_path)
        }
    }

    /// Supplies pre-computed hunks for a Modify change.
    #[must_use]
    pub fn with_hunks(mut self, hunks: Vec<Hunk>) -> Self {
        self.hunks = Some(hunks);
        self
    }

    /// Overrides the display language.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Checks that exactly the fields relevant to the kind are populated.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.file_path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        let require = |present: bool, field: &'static str| {
            if present {
                Ok(())
            } else {
                Err(ValidationError::MissingField {
                    kind: self.kind,
                    field,
                })
            }
        };
        let forbid = |present: bool, field: &'static str| {
            if present {
                Err(ValidationError::UnexpectedField {
                    kind: self.kind,
                    field,
                })
            } else {
                Ok(())
            }
        };

        match self.kind {
            ChangeKind::Create => {
                require(self.new_content.is_some(), "newContent")?;
                forbid(self.new_file_path.is_some(), "newFilePath")?;
                forbid(self.hunks.is_some(), "hunks")?;
            }
            ChangeKind::Modify => {
                require(self.original_content.is_some(), "originalContent")?;
                require(self.new_content.is_some(), "newContent")?;
                forbid(self.new_file_path.is_some(), "newFilePath")?;
                for hunk in self.hunks.iter().flatten() {
                    hunk.validate()?;
                }
            }
            ChangeKind::Delete => {
                require(self.original_content.is_some(), "originalContent")?;
                forbid(self.new_content.is_some(), "newContent")?;
                forbid(self.new_file_path.is_some(), "newFilePath")?;
                forbid(self.hunks.is_some(), "hunks")?;
            }
            ChangeKind::Rename => {
                require(
                    self.new_file_path.as_deref().is_some_and(|p| !p.is_empty()),
                    "newFilePath",
                )?;
                forbid(self.hunks.is_some(), "hunks")?;
            }
        }
        Ok(())
    }

    /// Paths touched when this change is applied.
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        let mut paths = vec![self.file_path.as_str()];
        if let Some(new_path) = self.new_file_path.as_deref() {
            paths.push(new_path);
        }
        paths
    }
}

/// Guesses a display language tag from a file extension.
#[must_use]
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let ext = std::path::Path::new(path).extension()?.to_str()?;
    let language = match ext.to_ascii_lowercase().as_str() {
        "rs" => "rust",
        "py" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "mts" => "typescript",
        "tsx" => "typescriptreact",
        "jsx" => "javascriptreact",
        "go" => "go",
        "java" => "java",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" | "cxx" => "cpp",
        "md" => "markdown",
        "json" => "json",
        "toml" => "toml",
        "yaml" | "yml" => "yaml",
        "sh" | "bash" => "shellscript",
        "html" => "html",
        "css" => "css",
        "txt" => "plaintext",
        _ => return None,
    };
    Some(language)
}
