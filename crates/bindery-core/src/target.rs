//! Binding destinations.
//!
//! The binder assigns every coerced value through [`BindTarget`], addressed
//! by the field identifier the descriptor was registered under. Structs
//! implement it with an explicit assignment table:
//!
//! ```rust
//! use bindery_core::{BindTarget, BoundValue, FieldError};
//!
//! #[derive(Default)]
//! struct ListPets {
//!     limit: i32,
//!     tags: Vec<String>,
//! }
//!
//! impl BindTarget for ListPets {
//!     fn bind_field(&mut self, field: &str, value: BoundValue) -> Result<(), FieldError> {
//!         match field {
//!             "Limit" => self.limit = value.into_typed()?,
//!             "Tags" => self.tags = value.into_typed()?,
//!             other => return Err(FieldError::unknown(other)),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut pets = ListPets::default();
//! pets.bind_field("Limit", BoundValue::Int32(20)).unwrap();
//! assert_eq!(pets.limit, 20);
//! assert!(pets.bind_field("Nope", BoundValue::Bool(true)).is_err());
//! ```

use crate::{BoundValue, ErrorKind};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::hash::BuildHasher;
use thiserror::Error;

/// Error returned by a destination that cannot accept a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The destination has no field with this identifier.
    #[error("destination has no field '{0}'")]
    UnknownField(String),

    /// The value has a different type than the field.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Type the field accepts.
        expected: &'static str,
        /// Type of the offered value.
        found: &'static str,
    },

    /// The value could not be converted for another reason.
    #[error("{0}")]
    Invalid(String),
}

impl FieldError {
    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown(field: impl Into<String>) -> Self {
        Self::UnknownField(field.into())
    }

    /// Creates a type mismatch error for `value`.
    #[must_use]
    pub fn mismatch(expected: &'static str, value: &BoundValue) -> Self {
        Self::TypeMismatch {
            expected,
            found: value.type_name(),
        }
    }

    /// Creates a conversion error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Binding error kind this failure is reported as.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownField(_) => ErrorKind::Configuration,
            Self::TypeMismatch { .. } | Self::Invalid(_) => ErrorKind::MalformedValue,
        }
    }
}

/// A value the binder can assign fields into.
pub trait BindTarget {
    /// Returns true if `field` is a field of this destination.
    ///
    /// The binder checks every declared field before extracting anything,
    /// so a mapping to a missing field fails even when no value arrives.
    /// Open-ended destinations such as maps accept every field.
    fn has_field(&self, field: &str) -> bool {
        let _ = field;
        true
    }

    /// Assigns `value` to the field registered as `field`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the field does not exist or cannot hold the
    /// value.
    fn bind_field(&mut self, field: &str, value: BoundValue) -> Result<(), FieldError>;
}

impl<S: BuildHasher> BindTarget for HashMap<String, BoundValue, S> {
    fn bind_field(&mut self, field: &str, value: BoundValue) -> Result<(), FieldError> {
        self.insert(field.to_string(), value);
        Ok(())
    }
}

impl BindTarget for IndexMap<String, BoundValue> {
    fn bind_field(&mut self, field: &str, value: BoundValue) -> Result<(), FieldError> {
        self.insert(field.to_string(), value);
        Ok(())
    }
}
