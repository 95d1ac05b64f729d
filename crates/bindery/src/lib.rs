//! # Bindery
//!
//! **Declarative request parameter binding for HTTP services**
//!
//! Bindery takes a set of OpenAPI-2 style parameter declarations and binds an
//! incoming HTTP request against them:
//!
//! - Path, query, header, form, file and body locations
//! - Collection formats `csv`, `ssv`, `tsv`, `pipes` and `multi`
//! - Strict type coercion for every scalar type and format
//! - All failures reported together, never just the first one
//!
//! ## Quick Start
//!
//! ```rust
//! use bindery::prelude::*;
//! use http::Uri;
//!
//! # async fn demo() {
//! let binder = RequestBinder::builder()
//!     .param("ID", ParamDescriptor::path("id").typed(ParamType::Integer, Some(Format::Int64)).required())
//!     .param("Limit", ParamDescriptor::query("limit").typed(ParamType::Integer, Some(Format::Int32)).with_default(20))
//!     .build()
//!     .unwrap();
//!
//! let mut request = BindRequest::builder().uri(Uri::from_static("/pets/7")).build();
//! let route: RouteParams = [("id", "7")].into_iter().collect();
//!
//! let mut fields = indexmap::IndexMap::new();
//! let result = binder.bind(&mut request, &route, &JsonConsumer, &mut fields).await;
//!
//! assert!(result.is_valid());
//! assert_eq!(fields["Limit"], BoundValue::Int32(20));
//! # }
//! ```
//!
//! ## Crates
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`core`] | `bindery-core` | Descriptors, bound values, errors |
//! | [`extract`] | `bindery-extract` | Extractors, coercion, the binder |
//! | [`config`] | this crate | Layered settings loading |
//! | [`logging`] | this crate | `tracing` subscriber setup |

#![doc(html_root_url = "https://docs.rs/bindery/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod logging;

// Re-export core types
pub use bindery_core as core;

// Re-export extraction types
pub use bindery_extract as extract;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use bindery::prelude::*;
/// ```
pub mod prelude {
    pub use bindery_core::{
        BindErrors, BindTarget, BindingError, BindingResult, BoundValue, CollectionFormat,
        ErrorKind, FieldError, Format, FromBound, Location, ParamDescriptor, ParamType,
        RouteParams, Schema, UploadedFile,
    };

    pub use bindery_extract::{
        BindRequest, BinderConfig, BinderError, Consumer, JsonConsumer, MultipartConfig,
        RequestBinder,
    };

    pub use crate::config::{ConfigLoader, Settings};
    pub use crate::logging::{init_logging, LogConfig};
}
