//! # Bindery Core
//!
//! Core types shared by every part of the Bindery request binder.
//!
//! This crate has no I/O. It provides:
//!
//! - [`ParamDescriptor`] - Declaration of one expected request input
//! - [`RouteParams`] - Path template values produced by an external router
//! - [`BoundValue`] - A coerced, strongly typed parameter value
//! - [`BindTarget`] - Destination trait assigning values by field identifier
//! - [`BindingResult`] - Ordered, append-only aggregation of [`BindingError`]s

#![doc(html_root_url = "https://docs.rs/bindery-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod descriptor;
mod error;
mod file;
mod route;
mod target;
mod value;

pub use descriptor::{CollectionFormat, Format, Location, ParamDescriptor, ParamType, Schema};
pub use error::{BindErrors, BindingError, BindingResult, ErrorKind};
pub use file::{FileError, UploadedFile};
pub use route::RouteParams;
pub use target::{BindTarget, FieldError};
pub use value::{BoundValue, FromBound};
