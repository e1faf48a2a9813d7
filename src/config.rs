//! Configuration
//!
//! `defaults/bilens.default.toml` is embedded into the crate so the documented defaults and
//! the runtime defaults cannot drift. Applications layer user files, `BILENS_*`
//! environment variables and explicit overrides on top through [`Loader`] before
//! deserializing into [`BilensConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, ValueKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/bilens.default.toml");

/// Top-level configuration consumed by the `bilens` binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilensConfig {
    pub diagnostics: ParseFlags,
    pub output: OutputConfig,
}

/// Diagnostic switches for `get`. They only add log output, results never change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFlags {
    pub show_advance: bool,
    pub show_matches: bool,
    pub show_tokens: bool,
}

impl ParseFlags {
    pub fn all() -> Self {
        Self {
            show_advance: true,
            show_matches: true,
            show_tokens: true,
        }
    }

    pub fn any(&self) -> bool {
        self.show_advance || self.show_matches || self.show_tokens
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Paths,
            pretty: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Paths,
    Json,
    Yaml,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `BILENS_SECTION__KEY` environment variables, e.g.
    /// `BILENS_DIAGNOSTICS__SHOW_TOKENS=true`.
    pub fn with_env(mut self) -> Self {
        let source = Environment::with_prefix("BILENS")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<BilensConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<BilensConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_embedded_file() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config, BilensConfig::default());
        assert!(!config.diagnostics.any());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("diagnostics.show_tokens", true)
            .expect("override to apply")
            .set_override("output.format", "yaml")
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(config.diagnostics.show_tokens);
        assert!(!config.diagnostics.show_advance);
        assert_eq!(config.output.format, OutputFormat::Yaml);
    }

    #[test]
    fn user_file_layers_over_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(file, "[output]\nformat = \"json\"").expect("write config");
        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.pretty);
    }

    #[test]
    fn optional_file_may_be_missing() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/bilens.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.output.format, OutputFormat::Paths);
    }
}
