//! Uploaded multipart files.

use bytes::Bytes;
use thiserror::Error;

/// Error returned when reading an uploaded file fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileError {
    /// The file content was already taken.
    #[error("content of file part '{field}' was already consumed")]
    AlreadyConsumed {
        /// Form field name of the part.
        field: String,
    },
}

/// A file part taken from a `multipart/form-data` body.
///
/// Metadata stays available for the lifetime of the value. The content can
/// be taken exactly once with [`UploadedFile::take_data`].
///
/// # Example
///
/// ```rust
/// use bindery_core::{FileError, UploadedFile};
/// use bytes::Bytes;
///
/// let mut file = UploadedFile::new(
///     "file",
///     Some("notes.txt".into()),
///     Some("text/plain".into()),
///     Bytes::from_static(b"hello"),
/// );
///
/// assert_eq!(file.file_name(), Some("notes.txt"));
/// assert_eq!(file.take_data().unwrap(), Bytes::from_static(b"hello"));
/// assert!(matches!(file.take_data(), Err(FileError::AlreadyConsumed { .. })));
/// assert_eq!(file.size(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    field_name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    size: usize,
    data: Option<Bytes>,
}

impl UploadedFile {
    /// Creates an uploaded file.
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        file_name: Option<String>,
        content_type: Option<String>,
        data: Bytes,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name,
            content_type,
            size: data.len(),
            data: Some(data),
        }
    }

    /// Form field name of the part.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// File name from the part's `Content-Disposition` header.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Declared content type of the part.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Size of the content in bytes, also after it was taken.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true once the content has been taken.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.data.is_none()
    }

    /// Takes the file content.
    ///
    /// # Errors
    ///
    /// Returns [`FileError::AlreadyConsumed`] on every call after the first.
    pub fn take_data(&mut self) -> Result<Bytes, FileError> {
        self.data.take().ok_or_else(|| FileError::AlreadyConsumed {
            field: self.field_name.clone(),
        })
    }
}
