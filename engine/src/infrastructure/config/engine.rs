//! Session engine configuration.
//!
//! This module defines hunk derivation, apply defaults and event channel
//! settings.

use serde::Deserialize;

use crate::merge::HunkStrategy;

/// How hunks are derived for Modify changes that arrive without them.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HunkMode {
    /// One hunk replacing the whole file.
    #[default]
    WholeFile,
    /// One hunk per contiguous group of changed lines.
    LineLevel,
}

/// Session engine settings.
#[derive(Debug, Deserialize, Clone)]
pub struct EngineSettings {
    /// Hunk derivation mode (default: `whole_file`)
    #[serde(default)]
    pub hunk_strategy: HunkMode,

    /// Display context kept around line-level hunks (default: 3)
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// Defaults used when `apply` is called without explicit options.
    #[serde(default)]
    pub default_apply: ApplyDefaults,

    /// Capacity of the session event channel (default: 256)
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl EngineSettings {
    /// The hunk strategy these settings select.
    #[must_use]
    pub fn strategy(&self) -> HunkStrategy {
        match self.hunk_strategy {
            HunkMode::WholeFile => HunkStrategy::WholeFile,
            HunkMode::LineLevel => HunkStrategy::LineLevel {
                context_lines: self.context_lines,
            },
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            hunk_strategy: HunkMode::default(),
            context_lines: default_context_lines(),
            default_apply: ApplyDefaults::default(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Default apply switches.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ApplyDefaults {
    /// Snapshot destructive operations before applying (default: true)
    #[serde(default = "default_true")]
    pub create_backup: bool,

    /// Stop at the first failed operation (default: false)
    #[serde(default)]
    pub stop_on_error: bool,

    /// Flush every written path after apply (default: false)
    #[serde(default)]
    pub save_after_apply: bool,
}

impl Default for ApplyDefaults {
    fn default() -> Self {
        Self {
            create_backup: default_true(),
            stop_on_error: false,
            save_after_apply: false,
        }
    }
}

fn default_context_lines() -> usize {
    3
}

fn default_event_capacity() -> usize {
    crate::events::DEFAULT_EVENT_CAPACITY
}

fn default_true() -> bool {
    true
}
