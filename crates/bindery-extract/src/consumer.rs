//! Body consumers.
//!
//! A [`Consumer`] turns raw body bytes into a structured value. Picking a
//! consumer for a media type is the caller's business; the binder only asks
//! the one it was given whether it accepts the request's content type.

use mime::Mime;
use serde_json::Value;
use thiserror::Error;

/// Error returned by a consumer that cannot decode a payload.
#[derive(Debug, Error)]
pub enum ConsumeError {
    /// The payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Any other decoding failure.
    #[error("{0}")]
    Other(String),
}

/// Decodes request bodies of the media types it supports.
pub trait Consumer: Send + Sync {
    /// Returns true if this consumer can decode `media_type`.
    fn supports(&self, media_type: &Mime) -> bool;

    /// Decodes a complete body.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumeError`] if the payload is malformed.
    fn consume(&self, body: &[u8]) -> Result<Value, ConsumeError>;
}

/// Consumer for `application/json` and `+json` media types.
///
/// # Example
///
/// ```rust
/// use bindery_extract::{Consumer, JsonConsumer};
///
/// let json: mime::Mime = "application/problem+json".parse().unwrap();
/// assert!(JsonConsumer.supports(&json));
/// assert!(!JsonConsumer.supports(&mime::TEXT_PLAIN));
///
/// let value = JsonConsumer.consume(br#"{"id": 1}"#).unwrap();
/// assert_eq!(value["id"], 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConsumer;

impl Consumer for JsonConsumer {
    fn supports(&self, media_type: &Mime) -> bool {
        media_type.type_() == mime::APPLICATION
            && (media_type.subtype() == mime::JSON
                || media_type.suffix().is_some_and(|s| s == mime::JSON))
    }

    fn consume(&self, body: &[u8]) -> Result<Value, ConsumeError> {
        Ok(serde_json::from_slice(body)?)
    }
}
