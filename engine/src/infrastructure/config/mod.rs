//! Configuration management for the changeset engine.
//!
//! Settings come from built-in defaults, an optional TOML file, and
//! `CHANGESET__*` environment variables, in increasing priority.
//!
//! # Example
//!
//! ```
//! use changeset_engine::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! assert!(settings.engine.event_capacity > 0);
//! ```

pub mod engine;
pub mod telemetry;

pub use engine::{ApplyDefaults, EngineSettings, HunkMode};
pub use telemetry::TelemetrySettings;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CHANGESET";

/// Configuration file read by [`Settings::new`] when present.
pub const DEFAULT_CONFIG_FILE: &str = "changeset.toml";

/// Top-level configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Session engine settings.
    #[serde(default)]
    pub engine: EngineSettings,
    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Creates a settings instance from defaults, `changeset.toml` in the
    /// working directory if present, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Some(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Loads settings, layering `file` (TOML, optional) under the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed or a value has the wrong
    /// type.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Start with default values
            .set_default("engine.hunk_strategy", "whole_file")?
            .set_default("engine.context_lines", 3)?
            .set_default("telemetry.service_name", "changeset-engine")?
            .set_default("telemetry.log_level", "info")?;

        if let Some(path) = file {
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let s = builder
            // Merge in Environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
