//! Coerced parameter values.
//!
//! [`BoundValue`] is what the type coercer produces and what destinations
//! receive. [`FromBound`] converts it into ordinary Rust field types.

use crate::{BindTarget, FieldError, UploadedFile};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

/// A strongly typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    /// `boolean`.
    Bool(bool),
    /// `integer/int32`.
    Int32(i32),
    /// `integer/int64`, also `integer` without format.
    Int64(i64),
    /// `number/float`.
    Float(f32),
    /// `number/double`, also `number` without format.
    Double(f64),
    /// `string`.
    String(String),
    /// `string/date`.
    Date(NaiveDate),
    /// `string/date-time`.
    DateTime(DateTime<FixedOffset>),
    /// `string/byte`, already base64 decoded.
    Bytes(Bytes),
    /// `array`, items in wire order.
    Array(Vec<BoundValue>),
    /// `object` with declared properties.
    Object(IndexMap<String, BoundValue>),
    /// Decoded structured value without a declared shape.
    Json(Value),
    /// Uploaded multipart file.
    File(UploadedFile),
}

impl BoundValue {
    /// Short name of the variant's type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "date-time",
            Self::Bytes(_) => "byte",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Json(_) => "json",
            Self::File(_) => "file",
        }
    }

    /// Converts into a field type.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the value cannot become a `T`.
    pub fn into_typed<T: FromBound>(self) -> Result<T, FieldError> {
        T::from_bound(self)
    }

    /// Renders the value as JSON.
    ///
    /// Dates use `YYYY-MM-DD`, timestamps RFC 3339 and byte blobs standard
    /// base64, so the result parses back with the same descriptors. Files
    /// render as their metadata.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Int32(n) => Value::from(*n),
            Self::Int64(n) => Value::from(*n),
            Self::Float(n) => Number::from_f64(f64::from(*n)).map_or(Value::Null, Value::Number),
            Self::Double(n) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Self::DateTime(dt) => Value::String(dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Bytes(b) => Value::String(STANDARD.encode(b)),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
            Self::Json(value) => value.clone(),
            Self::File(file) => serde_json::json!({
                "field_name": file.field_name(),
                "file_name": file.file_name(),
                "content_type": file.content_type(),
                "size": file.size(),
            }),
        }
    }

    /// Deserializes a structured value into any serde type.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::Invalid`] if `T` rejects the value.
    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T, FieldError> {
        let json = match self {
            Self::Json(value) => value,
            other => other.to_json(),
        };
        serde_json::from_value(json).map_err(|e| FieldError::invalid(e.to_string()))
    }

    /// Assigns every property of an object value into a nested destination.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] if the value is not an object or the target
    /// rejects one of its properties.
    pub fn bind_into<T: BindTarget + ?Sized>(self, target: &mut T) -> Result<(), FieldError> {
        match self {
            Self::Object(fields) => {
                for (name, value) in fields {
                    target.bind_field(&name, value)?;
                }
                Ok(())
            }
            Self::Json(Value::Object(fields)) => {
                for (name, value) in fields {
                    target.bind_field(&name, Self::Json(value))?;
                }
                Ok(())
            }
            other => Err(FieldError::mismatch("object", &other)),
        }
    }
}

/// Conversion from a [`BoundValue`] into a destination field type.
pub trait FromBound: Sized {
    /// Performs the conversion.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError`] if the value has an incompatible type.
    fn from_bound(value: BoundValue) -> Result<Self, FieldError>;
}

impl FromBound for BoundValue {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        Ok(value)
    }
}

impl FromBound for bool {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Bool(b) | BoundValue::Json(Value::Bool(b)) => Ok(b),
            other => Err(FieldError::mismatch("boolean", &other)),
        }
    }
}

impl FromBound for i64 {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Int64(n) => Ok(n),
            BoundValue::Int32(n) => Ok(i64::from(n)),
            BoundValue::Json(Value::Number(ref n)) if n.is_i64() => {
                n.as_i64().ok_or_else(|| FieldError::mismatch("int64", &value))
            }
            other => Err(FieldError::mismatch("int64", &other)),
        }
    }
}

impl FromBound for i32 {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Int32(n) => Ok(n),
            BoundValue::Int64(n) => {
                i32::try_from(n).map_err(|_| FieldError::invalid(format!("{n} overflows int32")))
            }
            BoundValue::Json(Value::Number(ref n)) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| FieldError::mismatch("int32", &value)),
            other => Err(FieldError::mismatch("int32", &other)),
        }
    }
}

impl FromBound for f64 {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Double(n) => Ok(n),
            BoundValue::Float(n) => Ok(f64::from(n)),
            BoundValue::Json(Value::Number(ref n)) => {
                n.as_f64().ok_or_else(|| FieldError::mismatch("double", &value))
            }
            other => Err(FieldError::mismatch("double", &other)),
        }
    }
}

impl FromBound for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Float(n) => Ok(n),
            BoundValue::Json(Value::Number(ref n)) => n
                .as_f64()
                .map(|n| n as f32)
                .filter(|n| n.is_finite())
                .ok_or_else(|| FieldError::mismatch("float", &value)),
            other => Err(FieldError::mismatch("float", &other)),
        }
    }
}

impl FromBound for String {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::String(s) | BoundValue::Json(Value::String(s)) => Ok(s),
            other => Err(FieldError::mismatch("string", &other)),
        }
    }
}

impl FromBound for NaiveDate {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Date(d) => Ok(d),
            other => Err(FieldError::mismatch("date", &other)),
        }
    }
}

impl FromBound for DateTime<FixedOffset> {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::DateTime(dt) => Ok(dt),
            other => Err(FieldError::mismatch("date-time", &other)),
        }
    }
}

impl FromBound for DateTime<Utc> {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        DateTime::<FixedOffset>::from_bound(value).map(|dt| dt.with_timezone(&Utc))
    }
}

impl FromBound for Bytes {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Bytes(b) => Ok(b),
            other => Err(FieldError::mismatch("byte", &other)),
        }
    }
}

impl FromBound for UploadedFile {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::File(file) => Ok(file),
            other => Err(FieldError::mismatch("file", &other)),
        }
    }
}

impl FromBound for Value {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        Ok(match value {
            BoundValue::Json(value) => value,
            other => other.to_json(),
        })
    }
}

impl<T: FromBound> FromBound for Vec<T> {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Array(items) => items.into_iter().map(T::from_bound).collect(),
            BoundValue::Json(Value::Array(items)) => items
                .into_iter()
                .map(|item| T::from_bound(BoundValue::Json(item)))
                .collect(),
            other => Err(FieldError::mismatch("array", &other)),
        }
    }
}

impl<T: FromBound> FromBound for Option<T> {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Json(Value::Null) => Ok(None),
            other => T::from_bound(other).map(Some),
        }
    }
}

impl FromBound for IndexMap<String, BoundValue> {
    fn from_bound(value: BoundValue) -> Result<Self, FieldError> {
        match value {
            BoundValue::Object(fields) => Ok(fields),
            BoundValue::Json(Value::Object(fields)) => Ok(fields
                .into_iter()
                .map(|(k, v)| (k, BoundValue::Json(v)))
                .collect()),
            other => Err(FieldError::mismatch("object", &other)),
        }
    }
}
