//! Bounded body reads.

use crate::BodyStream;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use std::io;
use thiserror::Error;

/// Error returned when reading a body fails.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body grew past the configured limit.
    #[error("payload too large: limit is {limit} bytes")]
    TooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The stream failed, e.g. because the client disconnected.
    #[error("failed to read request body: {0}")]
    Read(#[from] io::Error),
}

/// Reads a body stream to the end, failing once more than `limit` bytes
/// arrive.
///
/// # Errors
///
/// Returns [`BodyError`] if the stream yields an error or exceeds `limit`.
pub async fn read_body(mut stream: BodyStream, limit: usize) -> Result<Bytes, BodyError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}
