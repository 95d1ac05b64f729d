//! The request container handed to the binder.
//!
//! [`BindRequest`] carries the parts of an HTTP request the binder reads:
//! method, URI, headers and a body that can be taken exactly once. Once the
//! body was taken (by the binder or by an earlier [`BindRequest::multipart`]
//! call) later readers see it as consumed.

use crate::multipart::{Multipart, MultipartError};
use crate::MultipartConfig;
use bytes::Bytes;
use futures_core::Stream;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use std::fmt;
use std::io;
use std::pin::Pin;

/// Fallible stream of body chunks.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>;

enum BodyState {
    Empty,
    Ready(BodyStream),
    Taken,
}

/// Request data a binder reads from.
///
/// # Example
///
/// ```rust
/// use bindery_extract::BindRequest;
/// use http::{Method, Uri};
///
/// let mut request = BindRequest::builder()
///     .method(Method::POST)
///     .uri(Uri::from_static("/pets?limit=10"))
///     .header("content-type", "application/json")
///     .body(r#"{"name": "Rex"}"#)
///     .build();
///
/// assert_eq!(request.query_string(), Some("limit=10"));
/// assert_eq!(request.content_type(), Some("application/json"));
/// assert!(request.take_body().is_some());
/// assert!(request.is_body_consumed());
/// ```
pub struct BindRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: BodyState,
}

impl BindRequest {
    /// Creates a request without a body.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            body: BodyState::Empty,
        }
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> BindRequestBuilder {
        BindRequestBuilder::new()
    }

    /// Sets a fixed body. An empty buffer means no body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = if body.is_empty() {
            BodyState::Empty
        } else {
            BodyState::Ready(Box::pin(futures_util::stream::once(async move {
                Ok::<_, io::Error>(body)
            })))
        };
        self
    }

    /// Sets a streamed body.
    #[must_use]
    pub fn with_stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    {
        self.body = BodyState::Ready(Box::pin(stream));
        self
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the `Content-Type` header if it is valid text.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns true if a body is still waiting to be read.
    #[must_use]
    pub fn has_body(&self) -> bool {
        matches!(self.body, BodyState::Ready(_))
    }

    /// Returns true once the body was taken.
    #[must_use]
    pub fn is_body_consumed(&self) -> bool {
        matches!(self.body, BodyState::Taken)
    }

    /// Takes the body stream.
    ///
    /// Returns `None` if the request has no body or the body was already
    /// taken. Use [`BindRequest::is_body_consumed`] to tell the two apart.
    pub fn take_body(&mut self) -> Option<BodyStream> {
        match std::mem::replace(&mut self.body, BodyState::Taken) {
            BodyState::Ready(stream) => Some(stream),
            BodyState::Empty => {
                self.body = BodyState::Empty;
                None
            }
            BodyState::Taken => None,
        }
    }

    /// Takes the body as a `multipart/form-data` reader.
    ///
    /// The body is consumed even when the reader is dropped unread, so a
    /// following bind sees it as consumed.
    ///
    /// # Errors
    ///
    /// Returns [`MultipartError`] if the content type is not multipart with a
    /// boundary, or the body is missing or already taken.
    pub fn multipart(&mut self, config: &MultipartConfig) -> Result<Multipart, MultipartError> {
        let boundary = self
            .content_type()
            .ok_or(MultipartError::MissingContentType)
            .and_then(|ct| multer::parse_boundary(ct).map_err(|_| MultipartError::NotMultipart))?;

        if self.is_body_consumed() {
            return Err(MultipartError::BodyConsumed);
        }
        let stream = self.take_body().ok_or(MultipartError::EmptyBody)?;

        Ok(Multipart::new(stream, boundary, config.clone()))
    }
}

impl fmt::Debug for BindRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match self.body {
            BodyState::Empty => "empty",
            BodyState::Ready(_) => "ready",
            BodyState::Taken => "taken",
        };
        f.debug_struct("BindRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("body", &body)
            .finish()
    }
}

impl<B: Into<Bytes>> From<Request<B>> for BindRequest {
    fn from(request: Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(parts.method, parts.uri, parts.headers).with_body(body)
    }
}

/// Builder for [`BindRequest`].
///
/// Method defaults to `GET` and the URI to `/`.
#[derive(Default)]
pub struct BindRequestBuilder {
    method: Option<Method>,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Option<BodyStream>,
}

impl BindRequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the URI.
    #[must_use]
    pub fn uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    /// Sets all headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Appends a header. Invalid names or values are skipped.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets a fixed body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then(|| -> BodyStream {
            Box::pin(futures_util::stream::once(async move {
                Ok::<_, io::Error>(body)
            }))
        });
        self
    }

    /// Sets a streamed body.
    #[must_use]
    pub fn stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
    {
        self.body = Some(Box::pin(stream));
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> BindRequest {
        BindRequest {
            method: self.method.unwrap_or(Method::GET),
            uri: self.uri.unwrap_or_else(|| Uri::from_static("/")),
            headers: self.headers,
            body: self.body.map_or(BodyState::Empty, BodyState::Ready),
        }
    }
}

impl fmt::Debug for BindRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindRequestBuilder")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}
