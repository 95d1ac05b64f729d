//! Layered settings loading.
//!
//! Settings are assembled in this order, later layers winning:
//!
//! 1. Defaults, or a development/production preset
//! 2. Configuration files (TOML or JSON), merged key by key
//! 3. Entries from a `.env` file, under the environment prefix
//! 4. Process environment variables, under the environment prefix
//!
//! Environment keys use `__` as the section separator:
//!
//! ```text
//! BINDERY__BINDER__MAX_BODY_SIZE=1048576
//! BINDERY__BINDER__MULTIPART__MAX_FIELDS=16
//! BINDERY__LOGGING__LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use bindery::config::ConfigLoader;
//!
//! let settings = ConfigLoader::new()
//!     .with_production()
//!     .with_optional_file("bindery.toml")?
//!     .with_env_prefix("BINDERY")
//!     .load()?;
//! # Ok::<(), bindery::config::ConfigError>(())
//! ```

use std::path::{Path, PathBuf};

use bindery_extract::{BinderConfig, InvalidLimit};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::logging::{LogConfig, LogFormat};

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    ReadError {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML syntax error.
    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// JSON syntax error, or a value with the wrong shape.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The file extension is not `toml` or `json`.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// The `.env` file could not be read.
    #[error("failed to load dotenv file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// An environment variable could not be parsed.
    #[error("failed to parse environment variable '{var}': {reason}")]
    EnvParseError {
        /// Variable name.
        var: String,
        /// Why parsing failed.
        reason: String,
    },

    /// A value is out of range.
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue {
        /// Dotted key.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an environment parse error.
    #[must_use]
    pub fn env_parse(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

impl From<InvalidLimit> for ConfigError {
    fn from(err: InvalidLimit) -> Self {
        Self::InvalidValue {
            field: format!("binder.{}", err.field),
            reason: err.message,
        }
    }
}

/// Source format of a configuration string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// JSON
    Json,
}

/// Complete settings for a bindery deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Binder limits.
    pub binder: BinderConfig,
    /// Logging setup.
    pub logging: LogConfig,
}

impl Settings {
    /// Development preset.
    #[must_use]
    pub fn development() -> Self {
        Self {
            binder: BinderConfig::development(),
            logging: LogConfig::development(),
        }
    }

    /// Production preset.
    #[must_use]
    pub fn production() -> Self {
        Self {
            binder: BinderConfig::production(),
            logging: LogConfig::production(),
        }
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first unusable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.binder.validate()?;
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder that layers settings sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    settings: Settings,
    env_prefix: Option<String>,
    dotenv_entries: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Starts from [`Settings::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.settings = Settings::default();
        self
    }

    /// Resets to the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.settings = Settings::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.settings = Settings::production();
        self
    }

    /// Merges a TOML or JSON file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or malformed.
    pub fn with_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => ConfigFormat::Toml,
            Some("json") => ConfigFormat::Json,
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ))
            }
        };

        self.with_string(&content, format)
    }

    /// Merges a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges settings from a string.
    ///
    /// Keys absent from `content` keep their current value.
    ///
    /// # Errors
    ///
    /// Returns an error on syntax errors or unknown keys.
    pub fn with_string(mut self, content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let overlay: Value = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        let mut merged = serde_json::to_value(&self.settings)?;
        merge_values(&mut merged, overlay);
        self.settings = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Sets the environment variable prefix (uppercased).
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into().to_uppercase());
        self
    }

    /// Loads `.env` from the working directory into the process
    /// environment, if present.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Reads entries from a `.env` file without touching the process
    /// environment.
    ///
    /// Entries are applied under the environment prefix, before process
    /// variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Dotenv`] if the file cannot be read or parsed.
    pub fn with_dotenv_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        for item in dotenvy::from_path_iter(path.as_ref())? {
            self.dotenv_entries.push(item?);
        }
        Ok(self)
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed or a value is
    /// invalid.
    pub fn load(self) -> Result<Settings, ConfigError> {
        let settings = self.load_unvalidated()?;
        settings.validate()?;
        tracing::debug!(
            max_body_size = settings.binder.max_body_size,
            multipart_max_fields = settings.binder.multipart.max_fields,
            log_level = %settings.logging.level,
            "settings loaded"
        );
        Ok(settings)
    }

    /// Applies environment overrides without validating.
    ///
    /// # Errors
    ///
    /// Returns an error if an override cannot be parsed.
    pub fn load_unvalidated(mut self) -> Result<Settings, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let entries = std::mem::take(&mut self.dotenv_entries);
            for (key, value) in entries.into_iter().chain(std::env::vars()) {
                apply_env_var(&mut self.settings, &prefix, &key, &value)?;
            }
        }
        Ok(self.settings)
    }
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Applies one `PREFIX__SECTION__KEY` variable.
///
/// Variables without the prefix are ignored.
fn apply_env_var(
    settings: &mut Settings,
    prefix: &str,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let Some(path) = key
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix("__"))
    else {
        return Ok(());
    };

    let parts: Vec<String> = path.split("__").map(str::to_uppercase).collect();
    let parts: Vec<&str> = parts.iter().map(String::as_str).collect();
    let binder = &mut settings.binder;
    let logging = &mut settings.logging;

    match parts.as_slice() {
        ["BINDER", "MAX_BODY_SIZE"] => binder.max_body_size = parse_size(key, value)?,
        ["BINDER", "MULTIPART", "MAX_BODY_SIZE"] => {
            binder.multipart.max_body_size = parse_size(key, value)?;
        }
        ["BINDER", "MULTIPART", "MAX_FIELD_SIZE"] => {
            binder.multipart.max_field_size = parse_size(key, value)?;
        }
        ["BINDER", "MULTIPART", "MAX_FIELDS"] => {
            binder.multipart.max_fields = parse_size(key, value)?;
        }
        ["LOGGING", "ENABLED"] => logging.enabled = parse_bool(key, value)?,
        ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
        ["LOGGING", "FORMAT"] => {
            logging.format = match value.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => return Err(ConfigError::env_parse(key, "expected 'json' or 'pretty'")),
            };
        }
        ["LOGGING", "SPAN_EVENTS"] => logging.span_events = parse_bool(key, value)?,
        ["LOGGING", "FILE_LINE_INFO"] => logging.file_line_info = parse_bool(key, value)?,
        ["LOGGING", "INCLUDE_TARGET"] => logging.include_target = parse_bool(key, value)?,
        _ => {}
    }
    Ok(())
}

fn parse_size(var: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| ConfigError::env_parse(var, e.to_string()))
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse(var, "expected a boolean")),
    }
}
