//! Binding errors and their aggregation.
//!
//! Every failure found while binding a request becomes a [`BindingError`]
//! appended to a [`BindingResult`]. Nothing is dropped and nothing aborts the
//! bind early; the result is valid iff no error was appended.
//!
//! # Example
//!
//! ```rust
//! use bindery_core::{BindingError, BindingResult, ErrorKind, Location};
//! use http::StatusCode;
//!
//! let mut result = BindingResult::new();
//! assert!(result.is_valid());
//!
//! result.push(BindingError::missing(Location::Header, "X-Request-Id"));
//! assert!(!result.is_valid());
//! assert_eq!(result.errors()[0].kind(), ErrorKind::MissingRequired);
//! assert_eq!(result.status_code(), StatusCode::BAD_REQUEST);
//! ```

use crate::Location;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Category of a binding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A required parameter is absent and has no default.
    MissingRequired,
    /// Text cannot be parsed as the declared type or format.
    MalformedValue,
    /// An array item failed coercion, or the collection format does not fit
    /// the location.
    MalformedCollection,
    /// Content type missing, unparseable or not the one a location needs.
    UnsupportedMediaType,
    /// The body (or form payload) could not be read or decoded.
    DecodeFailure,
    /// The descriptor set itself is invalid.
    Configuration,
}

impl ErrorKind {
    /// Returns the HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRequired
            | Self::MalformedValue
            | Self::MalformedCollection
            | Self::DecodeFailure => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code suitable for error envelopes.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingRequired => "MISSING_PARAMETER",
            Self::MalformedValue => "INVALID_PARAMETER",
            Self::MalformedCollection => "INVALID_COLLECTION",
            Self::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            Self::DecodeFailure => "DECODE_FAILED",
            Self::Configuration => "BINDER_MISCONFIGURED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingRequired => "missing-required",
            Self::MalformedValue => "malformed-value",
            Self::MalformedCollection => "malformed-collection",
            Self::UnsupportedMediaType => "unsupported-media-type",
            Self::DecodeFailure => "decode-failure",
            Self::Configuration => "configuration-error",
        })
    }
}

/// One failed parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct BindingError {
    parameter: String,
    location: Location,
    kind: ErrorKind,
    message: String,
}

impl BindingError {
    /// Creates an error with an explicit kind and message.
    #[must_use]
    pub fn new(
        kind: ErrorKind,
        location: Location,
        parameter: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            location,
            kind,
            message: message.into(),
        }
    }

    /// Required parameter absent, no default.
    #[must_use]
    pub fn missing(location: Location, parameter: impl Into<String>) -> Self {
        let parameter = parameter.into();
        let message = format!("missing required {location} parameter: {parameter}");
        Self::new(ErrorKind::MissingRequired, location, parameter, message)
    }

    /// Text could not be parsed as the declared type.
    #[must_use]
    pub fn malformed_value(
        location: Location,
        parameter: impl Into<String>,
        details: impl fmt::Display,
    ) -> Self {
        let parameter = parameter.into();
        let message = format!("invalid {location} parameter '{parameter}': {details}");
        Self::new(ErrorKind::MalformedValue, location, parameter, message)
    }

    /// Array item or collection format failure.
    #[must_use]
    pub fn malformed_collection(
        location: Location,
        parameter: impl Into<String>,
        details: impl fmt::Display,
    ) -> Self {
        let parameter = parameter.into();
        let message = format!("invalid {location} collection '{parameter}': {details}");
        Self::new(ErrorKind::MalformedCollection, location, parameter, message)
    }

    /// Content type missing, unparseable or unsuitable.
    #[must_use]
    pub fn unsupported_media_type(
        location: Location,
        parameter: impl Into<String>,
        details: impl fmt::Display,
    ) -> Self {
        let parameter = parameter.into();
        let message = format!("cannot bind {location} parameter '{parameter}': {details}");
        Self::new(ErrorKind::UnsupportedMediaType, location, parameter, message)
    }

    /// Payload could not be read or decoded.
    #[must_use]
    pub fn decode_failure(
        location: Location,
        parameter: impl Into<String>,
        details: impl fmt::Display,
    ) -> Self {
        let parameter = parameter.into();
        let message = format!("failed to decode {location} parameter '{parameter}': {details}");
        Self::new(ErrorKind::DecodeFailure, location, parameter, message)
    }

    /// Invalid descriptor configuration.
    #[must_use]
    pub fn configuration(
        location: Location,
        parameter: impl Into<String>,
        details: impl fmt::Display,
    ) -> Self {
        let parameter = parameter.into();
        let message = format!("misconfigured parameter '{parameter}': {details}");
        Self::new(ErrorKind::Configuration, location, parameter, message)
    }

    /// Wire name of the failed parameter. Nested properties use dotted names.
    #[must_use]
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// Location of the failed parameter.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Machine readable error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        self.kind.error_code()
    }
}

/// Outcome of one bind call.
///
/// An ordered, append-only list of [`BindingError`]s. Order follows the
/// descriptor declaration order of the binder that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BindingResult {
    errors: Vec<BindingError>,
}

impl BindingResult {
    /// Creates an empty, valid result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error.
    pub fn push(&mut self, error: BindingError) {
        self.errors.push(error);
    }

    /// Returns true if no error was appended.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The appended errors, in order.
    #[must_use]
    pub fn errors(&self) -> &[BindingError] {
        &self.errors
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if no error was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors reported for one parameter.
    pub fn for_parameter<'a>(
        &'a self,
        parameter: &'a str,
    ) -> impl Iterator<Item = &'a BindingError> + 'a {
        self.errors.iter().filter(move |e| e.parameter == parameter)
    }

    /// Status code of the most severe error, `200 OK` when valid.
    ///
    /// Configuration errors outrank media type errors, which outrank plain
    /// client errors.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.errors
            .iter()
            .map(BindingError::status_code)
            .max_by_key(|status| match *status {
                StatusCode::INTERNAL_SERVER_ERROR => 2,
                StatusCode::UNSUPPORTED_MEDIA_TYPE => 1,
                _ => 0,
            })
            .unwrap_or(StatusCode::OK)
    }

    /// Builds a serializable error envelope listing every failed parameter.
    #[must_use]
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "code": "BINDING_FAILED",
                "message": format!("request binding failed with {} error(s)", self.errors.len()),
                "details": self.errors.iter().map(|e| serde_json::json!({
                    "parameter": e.parameter,
                    "location": e.location,
                    "kind": e.kind,
                    "code": e.error_code(),
                    "message": e.message,
                })).collect::<Vec<_>>(),
            }
        })
    }

    /// Converts into `Ok(())` when valid, otherwise [`BindErrors`].
    ///
    /// # Errors
    ///
    /// Returns [`BindErrors`] holding every appended error.
    pub fn into_result(self) -> Result<(), BindErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(BindErrors {
                errors: self.errors,
            })
        }
    }
}

impl Extend<BindingError> for BindingResult {
    fn extend<I: IntoIterator<Item = BindingError>>(&mut self, iter: I) {
        self.errors.extend(iter);
    }
}

impl IntoIterator for BindingResult {
    type Item = BindingError;
    type IntoIter = std::vec::IntoIter<BindingError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Error form of an invalid [`BindingResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request binding failed with {} error(s)", .errors.len())]
pub struct BindErrors {
    errors: Vec<BindingError>,
}

impl BindErrors {
    /// The collected errors, in declaration order.
    #[must_use]
    pub fn errors(&self) -> &[BindingError] {
        &self.errors
    }

    /// Consumes into the collected errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<BindingError> {
        self.errors
    }
}
