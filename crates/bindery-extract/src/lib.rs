//! # Bindery Extract
//!
//! Location extractors, type coercion and the [`RequestBinder`].
//!
//! ## Locations
//!
//! | Location | Source | Module |
//! |----------|--------|--------|
//! | path | Route parameters from the router | [`path`] |
//! | query | URL query string | [`query`] |
//! | header | Request headers | [`header`] |
//! | form | Url-encoded or multipart text fields | [`parse_urlencoded`], [`Multipart`] |
//! | file | Multipart file parts | [`Multipart`], [`FormData`] |
//! | body | Request body, decoded by a [`Consumer`] | [`JsonConsumer`] |
//!
//! Raw values pass through the collection [`split`]ter for arrays and are
//! then coerced by [`coerce_text`] or [`coerce_json`].
//!
//! ## Example
//!
//! ```rust
//! use bindery_core::{CollectionFormat, ParamDescriptor, RouteParams, Schema};
//! use bindery_extract::{BindRequest, JsonConsumer, RequestBinder};
//! use http::Uri;
//! use indexmap::IndexMap;
//!
//! # async fn demo() {
//! let binder = RequestBinder::new([(
//!     "Tags",
//!     ParamDescriptor::query("tags").collection_of(Schema::string(), CollectionFormat::Pipes),
//! )])
//! .unwrap();
//!
//! let mut request = BindRequest::builder()
//!     .uri(Uri::from_static("/pets?tags=a%7Cb"))
//!     .build();
//!
//! let mut fields = IndexMap::new();
//! let result = binder
//!     .bind(&mut request, &RouteParams::new(), &JsonConsumer, &mut fields)
//!     .await;
//! assert!(result.is_valid());
//! # }
//! ```

mod binder;
mod body;
mod coerce;
mod config;
mod consumer;
mod context;
mod form;
pub mod header;
mod multipart;
pub mod path;
pub mod query;
mod split;
#[cfg(any(test, feature = "test-util"))]
pub mod test_util;
mod values;

pub use binder::{BinderError, RequestBinder, RequestBinderBuilder};
pub use body::{read_body, BodyError};
pub use coerce::{coerce_items, coerce_json, coerce_text, CoerceError};
pub use config::{
    BinderConfig, InvalidLimit, MultipartConfig, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_FIELDS,
    DEFAULT_MAX_FIELD_SIZE, DEFAULT_MAX_MULTIPART_SIZE,
};
pub use consumer::{ConsumeError, Consumer, JsonConsumer};
pub use context::{BindRequest, BindRequestBuilder, BodyStream};
pub use form::{parse_urlencoded, FileLookup, FormData, FormError};
pub use multipart::{Field, Multipart, MultipartError};
pub use split::split;
pub use values::ParamValues;
