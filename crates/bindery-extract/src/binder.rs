//! The request binder.
//!
//! A [`RequestBinder`] owns an ordered mapping from destination field
//! identifier to [`ParamDescriptor`]. Each [`RequestBinder::bind`] call walks
//! that mapping in declaration order, pulls the raw value for every
//! descriptor from its location, coerces it and assigns it into the
//! destination. Failures never stop the walk; each one is appended to the
//! returned [`BindingResult`].
//!
//! # Example
//!
//! ```rust
//! use bindery_core::{BoundValue, Format, ParamDescriptor, ParamType, RouteParams};
//! use bindery_extract::{BindRequest, JsonConsumer, RequestBinder};
//! use http::Uri;
//! use std::collections::HashMap;
//!
//! # async fn demo() {
//! let binder = RequestBinder::builder()
//!     .param("ID", ParamDescriptor::path("id").typed(ParamType::Integer, Some(Format::Int64)))
//!     .param("Limit", ParamDescriptor::query("limit").typed(ParamType::Integer, None))
//!     .build()
//!     .unwrap();
//!
//! let mut request = BindRequest::builder()
//!     .uri(Uri::from_static("/pets/7?limit=20"))
//!     .build();
//! let route: RouteParams = [("id", "7")].into_iter().collect();
//!
//! let mut fields = HashMap::new();
//! let result = binder.bind(&mut request, &route, &JsonConsumer, &mut fields).await;
//!
//! assert!(result.is_valid());
//! assert_eq!(fields["ID"], BoundValue::Int64(7));
//! assert_eq!(fields["Limit"], BoundValue::Int64(20));
//! # }
//! ```

use crate::body::read_body;
use crate::coerce::{coerce_items, coerce_json, coerce_text, CoerceError};
use crate::form::{parse_urlencoded, FileLookup, FormData};
use crate::multipart::MultipartError;
use crate::{
    header, path, query, split, BindRequest, BinderConfig, Consumer, InvalidLimit, ParamValues,
};
use bindery_core::{
    BindTarget, BindingError, BindingResult, BoundValue, CollectionFormat, ErrorKind, Location,
    ParamDescriptor, ParamType, RouteParams,
};
use indexmap::IndexMap;
use mime::Mime;
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// Error returned when a binder cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinderError {
    /// Two descriptors were registered under the same field identifier.
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),

    /// The binder configuration is unusable.
    #[error(transparent)]
    InvalidConfig(#[from] InvalidLimit),
}

/// Binds requests according to a fixed set of parameter descriptors.
///
/// The binder is immutable once built and can be shared across tasks; every
/// bind call works on its own request and destination.
#[derive(Debug, Clone)]
pub struct RequestBinder {
    params: IndexMap<String, ParamDescriptor>,
    body_field: Option<String>,
    config: BinderConfig,
}

impl RequestBinder {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RequestBinderBuilder {
        RequestBinderBuilder::default()
    }

    /// Creates a binder with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::DuplicateField`] if a field identifier repeats.
    pub fn new<I, K>(params: I) -> Result<Self, BinderError>
    where
        I: IntoIterator<Item = (K, ParamDescriptor)>,
        K: Into<String>,
    {
        Self::builder().params(params).build()
    }

    /// Number of declared parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no parameters are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the descriptor registered for `field`.
    #[must_use]
    pub fn descriptor(&self, field: &str) -> Option<&ParamDescriptor> {
        self.params.get(field)
    }

    /// Iterates field identifiers and descriptors in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = (&str, &ParamDescriptor)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the binder configuration.
    #[must_use]
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Binds `request` into `target`.
    ///
    /// Every declared parameter is evaluated, in declaration order, no matter
    /// how many earlier ones failed. A parameter whose field the destination
    /// does not declare is a configuration error and is not extracted. The only suspension points are body and
    /// multipart reads. A destination filled by an invalid bind must be
    /// treated as invalid as a whole.
    pub async fn bind<T>(
        &self,
        request: &mut BindRequest,
        route: &RouteParams,
        consumer: &dyn Consumer,
        target: &mut T,
    ) -> BindingResult
    where
        T: BindTarget + ?Sized,
    {
        let mut ctx = BindContext {
            request,
            route,
            consumer,
            config: &self.config,
            query: None,
            form: None,
        };
        let mut result = BindingResult::new();

        for (field, descriptor) in &self.params {
            if !target.has_field(field) {
                record(
                    &mut result,
                    BindingError::configuration(
                        descriptor.location.clone(),
                        descriptor.name.as_str(),
                        format_args!("destination has no field '{field}'"),
                    ),
                );
                continue;
            }
            match self.resolve(&mut ctx, field, descriptor).await {
                Ok(Some(value)) => {
                    trace!(
                        field = %field,
                        parameter = %descriptor.name,
                        value = value.type_name(),
                        "bound parameter"
                    );
                    if let Err(e) = target.bind_field(field, value) {
                        let error = BindingError::new(
                            e.kind(),
                            descriptor.location.clone(),
                            descriptor.name.clone(),
                            format!("cannot assign field '{field}': {e}"),
                        );
                        record(&mut result, error);
                    }
                }
                Ok(None) => {
                    trace!(field = %field, parameter = %descriptor.name, "parameter absent");
                }
                Err(errors) => {
                    for error in errors {
                        record(&mut result, error);
                    }
                }
            }
        }

        debug!(
            params = self.params.len(),
            errors = result.len(),
            "request binding finished"
        );
        result
    }

    async fn resolve(
        &self,
        ctx: &mut BindContext<'_>,
        field: &str,
        descriptor: &ParamDescriptor,
    ) -> Result<Option<BoundValue>, Vec<BindingError>> {
        let location = &descriptor.location;
        let name = descriptor.name.as_str();

        if !location.is_recognized() {
            return Err(vec![BindingError::configuration(
                location.clone(),
                name,
                format_args!("unrecognized parameter location '{location}'"),
            )]);
        }
        if descriptor.is_array()
            && descriptor.schema.collection_format == CollectionFormat::Multi
            && *location != Location::Query
        {
            return Err(vec![BindingError::malformed_collection(
                location.clone(),
                name,
                "collection format 'multi' is only valid for query parameters",
            )]);
        }
        if descriptor.schema.ty == ParamType::File
            && !matches!(location, Location::Form | Location::File)
        {
            return Err(vec![BindingError::configuration(
                location.clone(),
                name,
                format_args!("file parameters cannot be read from the {location}"),
            )]);
        }

        match location {
            Location::Path => {
                let value = path::value(ctx.route, name, descriptor.required)
                    .map_err(|e| vec![e])?
                    .map(|v| vec![v.to_string()]);
                finish_text(descriptor, value)
            }
            Location::Query => {
                let values = ctx.query().map_err(|e| vec![e.into_binding(location, name)])?;
                let format = descriptor
                    .is_array()
                    .then_some(descriptor.schema.collection_format);
                finish_text(descriptor, query::fragments(values, name, format))
            }
            Location::Header => {
                let value = header::first_value(ctx.request.headers(), name)
                    .map_err(|e| vec![BindingError::malformed_value(location.clone(), name, e)])?;
                finish_text(descriptor, value.map(|v| vec![v]))
            }
            Location::Form if !descriptor.is_file() => {
                let form = ctx.form().await.map_err(|e| vec![e.into_binding(location, name)])?;
                let value = form.data.values().first(name).map(|v| vec![v.to_string()]);
                finish_text(descriptor, value)
            }
            Location::Form | Location::File => {
                ctx.file(descriptor).await.map(Some).map_err(|e| vec![e])
            }
            Location::Body => self.resolve_body(ctx, field, descriptor).await,
            Location::Unrecognized(_) => Ok(None),
        }
    }

    async fn resolve_body(
        &self,
        ctx: &mut BindContext<'_>,
        field: &str,
        descriptor: &ParamDescriptor,
    ) -> Result<Option<BoundValue>, Vec<BindingError>> {
        let location = &descriptor.location;
        let name = descriptor.name.as_str();

        if let Some(owner) = self.body_field.as_deref().filter(|owner| *owner != field) {
            return Err(vec![BindingError::configuration(
                location.clone(),
                name,
                format_args!("the request body is already bound to field '{owner}'"),
            )]);
        }

        let body = match ctx.body().await {
            Ok(body) => body,
            Err(e) => return Err(vec![e.into_binding(location, name)]),
        };
        match body {
            Some(value) => coerce_json(&value, &descriptor.schema)
                .map(Some)
                .map_err(|errors| coerce_failures(descriptor, errors)),
            None => apply_default(descriptor),
        }
    }
}

fn record(result: &mut BindingResult, error: BindingError) {
    debug!(
        parameter = error.parameter(),
        location = %error.location(),
        kind = %error.kind(),
        "{}",
        error.message()
    );
    result.push(error);
}

/// Turns text fragments into a value, or applies absence rules.
fn finish_text(
    descriptor: &ParamDescriptor,
    fragments: Option<Vec<String>>,
) -> Result<Option<BoundValue>, Vec<BindingError>> {
    let Some(fragments) = fragments else {
        return apply_default(descriptor);
    };

    let coerced = if descriptor.is_array() {
        let items = split(fragments, descriptor.schema.collection_format);
        if items.is_empty() && descriptor.required {
            return Err(vec![BindingError::missing(
                descriptor.location.clone(),
                descriptor.name.as_str(),
            )]);
        }
        coerce_items(items, &descriptor.schema)
    } else {
        let text = fragments.into_iter().next().unwrap_or_default();
        if text.is_empty() && descriptor.schema.ty != ParamType::String {
            return if descriptor.required {
                Err(vec![BindingError::missing(
                    descriptor.location.clone(),
                    descriptor.name.as_str(),
                )])
            } else {
                Ok(None)
            };
        }
        coerce_text(&text, &descriptor.schema)
    };
    coerced
        .map(Some)
        .map_err(|errors| coerce_failures(descriptor, errors))
}

/// Absence rules: the default if declared, otherwise an error if required.
fn apply_default(descriptor: &ParamDescriptor) -> Result<Option<BoundValue>, Vec<BindingError>> {
    match &descriptor.default {
        Some(default) => coerce_json(default, &descriptor.schema)
            .map(Some)
            .map_err(|errors| coerce_failures(descriptor, errors)),
        None if descriptor.required => Err(vec![BindingError::missing(
            descriptor.location.clone(),
            descriptor.name.as_str(),
        )]),
        None => Ok(None),
    }
}

fn coerce_failures(descriptor: &ParamDescriptor, errors: Vec<CoerceError>) -> Vec<BindingError> {
    errors
        .into_iter()
        .map(|e| {
            let parameter = if e.path().is_empty() {
                descriptor.name.clone()
            } else {
                format!("{}.{}", descriptor.name, e.path())
            };
            binding_error(e.kind(), &descriptor.location, parameter, e.message())
        })
        .collect()
}

fn binding_error(
    kind: ErrorKind,
    location: &Location,
    parameter: String,
    details: impl fmt::Display,
) -> BindingError {
    let location = location.clone();
    match kind {
        ErrorKind::MissingRequired => BindingError::missing(location, parameter),
        ErrorKind::MalformedValue => BindingError::malformed_value(location, parameter, details),
        ErrorKind::MalformedCollection => {
            BindingError::malformed_collection(location, parameter, details)
        }
        ErrorKind::UnsupportedMediaType => {
            BindingError::unsupported_media_type(location, parameter, details)
        }
        ErrorKind::DecodeFailure => BindingError::decode_failure(location, parameter, details),
        ErrorKind::Configuration => BindingError::configuration(location, parameter, details),
    }
}

/// Failure of a source shared by several parameters, kept so every
/// dependent parameter reports it.
#[derive(Debug, Clone)]
struct SourceError {
    kind: ErrorKind,
    message: String,
}

impl SourceError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn media(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedMediaType, message)
    }

    fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DecodeFailure, message)
    }

    fn into_binding(self, location: &Location, name: &str) -> BindingError {
        binding_error(self.kind, location, name.to_string(), self.message)
    }
}

impl From<MultipartError> for SourceError {
    fn from(e: MultipartError) -> Self {
        if e.is_media_type_error() {
            Self::media(e.to_string())
        } else {
            Self::decode(e.to_string())
        }
    }
}

struct FormSource {
    data: FormData,
    multipart: bool,
}

/// Per-call state: the request and the sources decoded so far.
struct BindContext<'a> {
    request: &'a mut BindRequest,
    route: &'a RouteParams,
    consumer: &'a dyn Consumer,
    config: &'a BinderConfig,
    query: Option<Result<ParamValues, SourceError>>,
    form: Option<Result<FormSource, SourceError>>,
}

impl BindContext<'_> {
    fn query(&mut self) -> Result<&ParamValues, SourceError> {
        let slot = match self.query.take() {
            Some(slot) => slot,
            None => query::parse_query(self.request.query_string())
                .map_err(|e| SourceError::decode(format!("invalid query string: {e}"))),
        };
        self.query.insert(slot).as_ref().map_err(Clone::clone)
    }

    async fn form(&mut self) -> Result<&mut FormSource, SourceError> {
        let slot = match self.form.take() {
            Some(slot) => slot,
            None => load_form(self.request, self.config).await,
        };
        self.form.insert(slot).as_mut().map_err(|e| e.clone())
    }

    async fn file(&mut self, descriptor: &ParamDescriptor) -> Result<BoundValue, BindingError> {
        let location = &descriptor.location;
        let name = descriptor.name.as_str();

        let form = self.form().await.map_err(|e| e.into_binding(location, name))?;
        if !form.multipart {
            return Err(BindingError::unsupported_media_type(
                location.clone(),
                name,
                "file parameters require a multipart/form-data body",
            ));
        }
        match form.data.take_file(name) {
            FileLookup::Found(file) => Ok(BoundValue::File(file)),
            FileLookup::TextField => Err(BindingError::malformed_value(
                location.clone(),
                name,
                "expected a file part, found a text field",
            )),
            FileLookup::Missing => Err(BindingError::missing(location.clone(), name)),
            FileLookup::AlreadyClaimed => Err(BindingError::configuration(
                location.clone(),
                name,
                "file part is already bound to another parameter",
            )),
        }
    }

    /// Reads and decodes the body. `None` means no body was sent.
    async fn body(&mut self) -> Result<Option<serde_json::Value>, SourceError> {
        if self.request.is_body_consumed() {
            return Err(SourceError::decode("request body was already consumed"));
        }
        if !self.request.has_body() {
            return Ok(None);
        }

        let media_type = media_type(self.request)?;
        if !self.consumer.supports(&media_type) {
            return Err(SourceError::media(format!(
                "no consumer for Content-Type '{media_type}'"
            )));
        }

        let Some(stream) = self.request.take_body() else {
            return Ok(None);
        };
        let bytes = read_body(stream, self.config.max_body_size)
            .await
            .map_err(|e| SourceError::decode(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(None);
        }

        match self.consumer.consume(&bytes) {
            Ok(serde_json::Value::Null) => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(SourceError::decode(e.to_string())),
        }
    }
}

fn media_type(request: &BindRequest) -> Result<Mime, SourceError> {
    let Some(raw) = request.headers().get(http::header::CONTENT_TYPE) else {
        return Err(SourceError::media("missing Content-Type"));
    };
    raw.to_str()
        .ok()
        .and_then(|ct| ct.parse::<Mime>().ok())
        .ok_or_else(|| {
            SourceError::media(format!(
                "invalid Content-Type '{}'",
                String::from_utf8_lossy(raw.as_bytes())
            ))
        })
}

async fn load_form(
    request: &mut BindRequest,
    config: &BinderConfig,
) -> Result<FormSource, SourceError> {
    let media_type = media_type(request)?;

    if media_type.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        if request.is_body_consumed() {
            return Err(SourceError::media("form body was already consumed"));
        }
        let data = match request.take_body() {
            Some(stream) => {
                let bytes = read_body(stream, config.max_body_size)
                    .await
                    .map_err(|e| SourceError::decode(e.to_string()))?;
                parse_urlencoded(&bytes).map_err(|e| SourceError::decode(e.to_string()))?
            }
            None => ParamValues::new(),
        };
        return Ok(FormSource {
            data: FormData::from_values(data),
            multipart: false,
        });
    }

    if media_type.type_() == mime::MULTIPART && media_type.subtype() == mime::FORM_DATA {
        let data = match request.multipart(&config.multipart) {
            Ok(multipart) => multipart.collect().await?,
            Err(MultipartError::EmptyBody) => FormData::default(),
            Err(e) => return Err(e.into()),
        };
        return Ok(FormSource {
            data,
            multipart: true,
        });
    }

    Err(SourceError::media(format!(
        "Content-Type '{media_type}' does not carry form data"
    )))
}

/// Builder for [`RequestBinder`].
#[derive(Debug, Default)]
pub struct RequestBinderBuilder {
    params: Vec<(String, ParamDescriptor)>,
    config: BinderConfig,
}

impl RequestBinderBuilder {
    /// Declares a parameter bound into `field`.
    #[must_use]
    pub fn param(mut self, field: impl Into<String>, descriptor: ParamDescriptor) -> Self {
        self.params.push((field.into(), descriptor));
        self
    }

    /// Declares several parameters.
    #[must_use]
    pub fn params<I, K>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, ParamDescriptor)>,
        K: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Sets the binder configuration.
    #[must_use]
    pub fn config(mut self, config: BinderConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the binder.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError`] if a field identifier repeats or the
    /// configuration is invalid.
    pub fn build(self) -> Result<RequestBinder, BinderError> {
        self.config.validate()?;

        let mut params = IndexMap::with_capacity(self.params.len());
        for (field, descriptor) in self.params {
            if params.contains_key(&field) {
                return Err(BinderError::DuplicateField(field));
            }
            params.insert(field, descriptor);
        }
        let body_field = params
            .iter()
            .find(|(_, d)| d.location == Location::Body)
            .map(|(field, _)| field.clone());

        Ok(RequestBinder {
            params,
            body_field,
            config: self.config,
        })
    }
}
