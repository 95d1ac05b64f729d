//! Binder limits.
//!
//! Both types deserialize with `deny_unknown_fields` and fall back to
//! defaults for missing keys, so partial TOML/JSON sections work.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default maximum body size (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum total size of a multipart body (50 MB).
pub const DEFAULT_MAX_MULTIPART_SIZE: usize = 50 * 1024 * 1024;

/// Default maximum size per multipart field (10 MB).
pub const DEFAULT_MAX_FIELD_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum number of multipart fields.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// A limit that cannot work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value for '{field}': {message}")]
pub struct InvalidLimit {
    /// Dotted key of the offending setting.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl InvalidLimit {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Limits for `multipart/form-data` parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MultipartConfig {
    /// Maximum total body size in bytes.
    pub max_body_size: usize,
    /// Maximum size per field in bytes.
    pub max_field_size: usize,
    /// Maximum number of fields.
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_MULTIPART_SIZE,
            max_field_size: DEFAULT_MAX_FIELD_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl MultipartConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Sets the maximum field size.
    #[must_use]
    pub fn max_field_size(mut self, size: usize) -> Self {
        self.max_field_size = size;
        self
    }

    /// Sets the maximum number of fields.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

/// Settings for a [`RequestBinder`](crate::RequestBinder).
///
/// # Example
///
/// ```rust
/// use bindery_extract::BinderConfig;
///
/// let config: BinderConfig = serde_json::from_str(
///     r#"{ "max_body_size": 1024, "multipart": { "max_fields": 4 } }"#,
/// ).unwrap();
///
/// assert_eq!(config.max_body_size, 1024);
/// assert_eq!(config.multipart.max_fields, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BinderConfig {
    /// Maximum size of a non-multipart body in bytes.
    pub max_body_size: usize,
    /// Multipart limits.
    pub multipart: MultipartConfig,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            multipart: MultipartConfig::default(),
        }
    }
}

impl BinderConfig {
    /// Generous limits for local development.
    #[must_use]
    pub fn development() -> Self {
        Self {
            max_body_size: 4 * DEFAULT_MAX_BODY_SIZE,
            multipart: MultipartConfig {
                max_body_size: 4 * DEFAULT_MAX_MULTIPART_SIZE,
                max_field_size: 4 * DEFAULT_MAX_FIELD_SIZE,
                max_fields: 4 * DEFAULT_MAX_FIELDS,
            },
        }
    }

    /// Tight limits for internet facing services.
    #[must_use]
    pub fn production() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            multipart: MultipartConfig {
                max_body_size: 20 * 1024 * 1024,
                max_field_size: 5 * 1024 * 1024,
                max_fields: 32,
            },
        }
    }

    /// Sets the maximum body size.
    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Sets the multipart limits.
    #[must_use]
    pub fn with_multipart(mut self, multipart: MultipartConfig) -> Self {
        self.multipart = multipart;
        self
    }

    /// Checks that every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidLimit`] naming the first unusable setting.
    pub fn validate(&self) -> Result<(), InvalidLimit> {
        if self.max_body_size == 0 {
            return Err(InvalidLimit::new("max_body_size", "must be greater than 0"));
        }
        if self.multipart.max_body_size == 0 {
            return Err(InvalidLimit::new(
                "multipart.max_body_size",
                "must be greater than 0",
            ));
        }
        if self.multipart.max_fields == 0 {
            return Err(InvalidLimit::new(
                "multipart.max_fields",
                "must be greater than 0",
            ));
        }
        if self.multipart.max_field_size > self.multipart.max_body_size {
            return Err(InvalidLimit::new(
                "multipart.max_field_size",
                format!(
                    "must not exceed multipart.max_body_size ({})",
                    self.multipart.max_body_size
                ),
            ));
        }
        Ok(())
    }
}
