//! `multipart/form-data` reading.
//!
//! [`Multipart`] wraps a `multer` reader over a request body stream and
//! enforces [`MultipartConfig`] limits. The binder drains it into a
//! [`FormData`] with [`Multipart::collect`]; callers that want to stream
//! parts themselves can walk it with [`Multipart::next_field`].
//!
//! # Example
//!
//! ```rust
//! use bindery_extract::{BindRequest, MultipartConfig};
//!
//! # async fn demo() {
//! let body = "--XyZ\r\n\
//!     Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
//!     Content-Type: text/plain\r\n\r\n\
//!     hello\r\n\
//!     --XyZ--\r\n";
//!
//! let mut request = BindRequest::builder()
//!     .header("content-type", "multipart/form-data; boundary=XyZ")
//!     .body(body)
//!     .build();
//!
//! let mut multipart = request.multipart(&MultipartConfig::default()).unwrap();
//! let field = multipart.next_field().await.unwrap().unwrap();
//! assert_eq!(field.file_name(), Some("a.txt"));
//! assert_eq!(&field.bytes().await.unwrap()[..], b"hello");
//! # }
//! ```

use crate::{BodyStream, FormData, MultipartConfig};
use bindery_core::UploadedFile;
use bytes::Bytes;
use multer::{Constraints, SizeLimit};
use thiserror::Error;

/// Error returned while opening or reading a multipart body.
#[derive(Debug, Error)]
pub enum MultipartError {
    /// The request has no `Content-Type` header.
    #[error("missing Content-Type, expected multipart/form-data")]
    MissingContentType,

    /// The content type is not multipart or has no boundary.
    #[error("request Content-Type is not multipart/form-data with a boundary")]
    NotMultipart,

    /// The body was already taken by an earlier reader.
    #[error("multipart body was already consumed")]
    BodyConsumed,

    /// The request carries no body.
    #[error("multipart request has no body")]
    EmptyBody,

    /// More parts than allowed.
    #[error("too many multipart fields (max {max})")]
    TooManyFields {
        /// Configured maximum.
        max: usize,
    },

    /// A single part exceeded the per-field limit.
    #[error("multipart field '{field}' exceeds {limit} bytes")]
    FieldTooLarge {
        /// Name of the part.
        field: String,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// A text part is not valid UTF-8.
    #[error("multipart field '{field}' is not valid UTF-8")]
    InvalidText {
        /// Name of the part.
        field: String,
    },

    /// The multipart stream is malformed or failed to read.
    #[error("multipart parse error: {0}")]
    Parse(#[from] multer::Error),
}

impl MultipartError {
    /// Returns true for errors caused by the request's media type or body
    /// state rather than by its content.
    #[must_use]
    pub const fn is_media_type_error(&self) -> bool {
        matches!(
            self,
            Self::MissingContentType | Self::NotMultipart | Self::BodyConsumed
        )
    }
}

/// Reader over the parts of a multipart body.
pub struct Multipart {
    inner: multer::Multipart<'static>,
    config: MultipartConfig,
    field_count: usize,
}

impl Multipart {
    pub(crate) fn new(stream: BodyStream, boundary: String, config: MultipartConfig) -> Self {
        let constraints = Constraints::new().size_limit(
            SizeLimit::new()
                .whole_stream(config.max_body_size as u64)
                .per_field(config.max_field_size as u64),
        );
        Self {
            inner: multer::Multipart::with_constraints(stream, boundary, constraints),
            config,
            field_count: 0,
        }
    }

    /// Returns the next part, or `None` once all parts were read.
    ///
    /// # Errors
    ///
    /// Returns an error if the field limit is exceeded or the body is
    /// malformed.
    pub async fn next_field(&mut self) -> Result<Option<Field>, MultipartError> {
        match self.inner.next_field().await? {
            Some(field) => {
                self.field_count += 1;
                if self.field_count > self.config.max_fields {
                    return Err(MultipartError::TooManyFields {
                        max: self.config.max_fields,
                    });
                }
                Ok(Some(Field::new(field, self.config.max_field_size)))
            }
            None => Ok(None),
        }
    }

    /// Reads every part into memory.
    ///
    /// Parts with a file name become files, the rest become text values.
    /// Parts without a name are skipped.
    ///
    /// # Errors
    ///
    /// Returns the first error hit while reading.
    pub async fn collect(mut self) -> Result<FormData, MultipartError> {
        let mut form = FormData::default();
        while let Some(field) = self.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if field.file_name().is_some() {
                form.insert_file(field.into_file().await?);
            } else {
                form.values_mut().append(name, field.text().await?);
            }
        }
        Ok(form)
    }
}

impl std::fmt::Debug for Multipart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Multipart")
            .field("config", &self.config)
            .field("field_count", &self.field_count)
            .finish_non_exhaustive()
    }
}

/// A single part of a multipart body.
pub struct Field {
    inner: multer::Field<'static>,
    max_size: usize,
}

impl Field {
    fn new(inner: multer::Field<'static>, max_size: usize) -> Self {
        Self { inner, max_size }
    }

    /// Form field name.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.inner.name()
    }

    /// File name, present only for file uploads.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.inner.file_name()
    }

    /// Declared content type of the part.
    #[must_use]
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.inner.content_type()
    }

    /// Reads the whole part.
    ///
    /// # Errors
    ///
    /// Returns an error if the part exceeds the field limit or fails to read.
    pub async fn bytes(self) -> Result<Bytes, MultipartError> {
        let name = self.name().unwrap_or_default().to_string();
        let bytes = self.inner.bytes().await?;
        if bytes.len() > self.max_size {
            return Err(MultipartError::FieldTooLarge {
                field: name,
                limit: self.max_size,
            });
        }
        Ok(bytes)
    }

    /// Reads the part as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the content is not UTF-8.
    pub async fn text(self) -> Result<String, MultipartError> {
        let name = self.name().unwrap_or_default().to_string();
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MultipartError::InvalidText { field: name })
    }

    /// Reads the part into an [`UploadedFile`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading the part fails.
    pub async fn into_file(self) -> Result<UploadedFile, MultipartError> {
        let name = self.name().unwrap_or_default().to_string();
        let file_name = self.file_name().map(String::from);
        let content_type = self.content_type().map(ToString::to_string);
        let data = self.bytes().await?;

        Ok(UploadedFile::new(name, file_name, content_type, data))
    }
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.inner.name())
            .field("file_name", &self.inner.file_name())
            .field("content_type", &self.inner.content_type())
            .field("max_size", &self.max_size)
            .finish()
    }
}
