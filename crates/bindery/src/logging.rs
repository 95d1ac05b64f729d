//! Structured logging setup.
//!
//! The binder emits `tracing` events: one `debug` event per binding failure
//! (with `parameter`, `location` and `kind` fields), `trace` events per bound
//! field and a `debug` summary per bind call. This module installs a
//! `tracing-subscriber` pipeline that renders them as JSON or in a
//! human-readable format.
//!
//! # Example
//!
//! ```rust,no_run
//! use bindery::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).unwrap();
//! tracing::debug!(parameter = "id", "binding");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Error returned when logging cannot be set up.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The level/filter directive is invalid.
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected directive.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("failed to initialize logging: {0}")]
    Init(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive, e.g. `info` or `bindery_extract=trace,info`.
    pub level: String,

    /// Output format.
    pub format: LogFormat,

    /// Whether to log span creation and close events.
    pub span_events: bool,

    /// Whether to include file and line of the event.
    pub file_line_info: bool,

    /// Whether to include the event target (module path).
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            include_target: true,
        }
    }
}

impl LogConfig {
    /// Human readable output with binder failures visible.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            format: LogFormat::Pretty,
            span_events: true,
            file_line_info: true,
            include_target: true,
        }
    }

    /// JSON output at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }
}

/// Creates an env filter from a directive string.
///
/// # Errors
///
/// Returns [`LoggingError::InvalidFilter`] if the directive does not parse.
pub fn create_env_filter(filter: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(filter).map_err(|e| LoggingError::InvalidFilter {
        filter: filter.to_string(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber.
///
/// Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns [`LoggingError`] if the filter is invalid or a subscriber was
/// already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    match config.format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);
            tracing_subscriber::registry()
                .with(layer)
                .try_init()
                .map_err(|e| LoggingError::Init(e.to_string()))
        }
        LogFormat::Pretty => {
            let layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_file(config.file_line_info)
                .with_line_number(config.file_line_info)
                .with_target(config.include_target)
                .with_filter(filter);
            tracing_subscriber::registry()
                .with(layer)
                .try_init()
                .map_err(|e| LoggingError::Init(e.to_string()))
        }
    }
}
