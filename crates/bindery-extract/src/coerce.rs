//! Type coercion.
//!
//! Converts raw text fragments and decoded JSON values into [`BoundValue`]s
//! according to a [`Schema`]. Coercion reports every failure it finds; a
//! failure inside a nested object carries the dotted path of the offending
//! property relative to the parameter.

use crate::split;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bindery_core::{BoundValue, CollectionFormat, ErrorKind, Format, ParamType, Schema};
use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// A single coercion failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CoerceError {
    path: String,
    kind: ErrorKind,
    message: String,
}

impl CoerceError {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: String::new(),
            kind,
            message: message.into(),
        }
    }

    fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedValue, message)
    }

    fn missing() -> Self {
        Self::new(ErrorKind::MissingRequired, "missing required property")
    }

    fn mismatch(schema: &Schema, found: &Value) -> Self {
        Self::malformed(format!(
            "expected {}, found {}",
            schema.type_label(),
            json_type_name(found)
        ))
    }

    fn within(mut self, segment: &str) -> Self {
        self.path = if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{segment}.{}", self.path)
        };
        self
    }

    fn in_item(self, index: usize) -> Self {
        let kind = match self.kind {
            ErrorKind::MalformedValue => ErrorKind::MalformedCollection,
            other => other,
        };
        let message = if self.path.is_empty() {
            format!("item {index}: {}", self.message)
        } else {
            self.message.clone()
        };
        Self {
            kind,
            message,
            ..self
        }
        .within(&index.to_string())
    }

    /// Dotted path of the failing property, empty for the value itself.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Failure category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Human readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerces a single text value.
///
/// Arrays given as one text are split with their own collection format
/// (`multi` falls back to csv) and objects are parsed as JSON.
///
/// # Errors
///
/// Returns every failure found; more than one only for arrays and objects.
///
/// # Example
///
/// ```rust
/// use bindery_core::{BoundValue, Format, ParamType, Schema};
/// use bindery_extract::coerce_text;
///
/// let int32 = Schema::integer().with_format(Format::Int32);
/// assert_eq!(coerce_text("-42", &int32).unwrap(), BoundValue::Int32(-42));
/// assert!(coerce_text("2147483648", &int32).is_err());
///
/// let flag = Schema::boolean();
/// assert!(coerce_text("yes", &flag).is_err());
/// ```
pub fn coerce_text(text: &str, schema: &Schema) -> Result<BoundValue, Vec<CoerceError>> {
    match schema.ty {
        ParamType::Array => {
            let format = match schema.collection_format {
                CollectionFormat::Multi => CollectionFormat::Csv,
                other => other,
            };
            coerce_items(split(vec![text.to_string()], format), schema)
        }
        ParamType::Object => {
            let value: Value = serde_json::from_str(text)
                .map_err(|e| vec![CoerceError::malformed(format!("invalid JSON object: {e}"))])?;
            coerce_json(&value, schema)
        }
        _ => coerce_scalar(text, schema).map_err(|e| vec![e]),
    }
}

/// Coerces already split array items with the item schema of `schema`.
///
/// Order and duplicates are preserved. Each failing item is reported as a
/// malformed collection naming its index.
///
/// # Errors
///
/// Returns one error per failing item.
pub fn coerce_items(items: Vec<String>, schema: &Schema) -> Result<BoundValue, Vec<CoerceError>> {
    let string = Schema::string();
    let item_schema = schema.items.as_deref().unwrap_or(&string);

    let mut values = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match coerce_text(item, item_schema) {
            Ok(value) => values.push(value),
            Err(item_errors) => errors.extend(item_errors.into_iter().map(|e| e.in_item(index))),
        }
    }
    if errors.is_empty() {
        Ok(BoundValue::Array(values))
    } else {
        Err(errors)
    }
}

fn coerce_scalar(text: &str, schema: &Schema) -> Result<BoundValue, CoerceError> {
    let invalid = |details: String| {
        CoerceError::malformed(format!(
            "'{text}' is not a valid {}: {details}",
            schema.type_label()
        ))
    };

    match (schema.ty, schema.format.as_ref()) {
        (ParamType::Integer, Some(Format::Int32)) => text
            .parse::<i32>()
            .map(BoundValue::Int32)
            .map_err(|e| invalid(e.to_string())),
        (ParamType::Integer, _) => text
            .parse::<i64>()
            .map(BoundValue::Int64)
            .map_err(|e| invalid(e.to_string())),
        (ParamType::Number, Some(Format::Float)) => match text.parse::<f32>() {
            Ok(n) if n.is_finite() => Ok(BoundValue::Float(n)),
            Ok(_) => Err(invalid("value is not finite".to_string())),
            Err(e) => Err(invalid(e.to_string())),
        },
        (ParamType::Number, _) => match text.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(BoundValue::Double(n)),
            Ok(_) => Err(invalid("value is not finite".to_string())),
            Err(e) => Err(invalid(e.to_string())),
        },
        (ParamType::Boolean, _) => match text {
            "true" => Ok(BoundValue::Bool(true)),
            "false" => Ok(BoundValue::Bool(false)),
            _ => Err(invalid("expected 'true' or 'false'".to_string())),
        },
        (ParamType::String, Some(Format::Date)) => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(BoundValue::Date)
            .map_err(|e| invalid(e.to_string())),
        (ParamType::String, Some(Format::DateTime)) => DateTime::parse_from_rfc3339(text)
            .map(BoundValue::DateTime)
            .map_err(|e| invalid(e.to_string())),
        (ParamType::String, Some(Format::Byte)) => STANDARD
            .decode(text)
            .map(|bytes| BoundValue::Bytes(bytes.into()))
            .map_err(|e| invalid(e.to_string())),
        (ParamType::String, _) => Ok(BoundValue::String(text.to_string())),
        (ParamType::File, _) => Err(CoerceError::malformed("expected a file part, found text")),
        (ParamType::Array | ParamType::Object, _) => Err(CoerceError::malformed(format!(
            "cannot read {} from a single value",
            schema.ty
        ))),
    }
}

/// Coerces a decoded JSON value.
///
/// Strings given for non-string types are coerced as text, so defaults such
/// as `"32"` or `"a|b"` work. Objects with declared properties are coerced
/// property by property; undeclared properties are kept as JSON. Objects
/// without declared properties bind as [`BoundValue::Json`].
///
/// # Errors
///
/// Returns every failure found, with dotted paths for nested properties.
///
/// # Example
///
/// ```rust
/// use bindery_core::{ErrorKind, Format, Schema};
/// use bindery_extract::coerce_json;
/// use serde_json::json;
///
/// let friend = Schema::object()
///     .required_property("name", Schema::string())
///     .property("age", Schema::integer().with_format(Format::Int32));
///
/// let errors = coerce_json(&json!({ "age": "old" }), &friend).unwrap_err();
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors[0].path(), "name");
/// assert_eq!(errors[0].kind(), ErrorKind::MissingRequired);
/// assert_eq!(errors[1].path(), "age");
/// ```
pub fn coerce_json(value: &Value, schema: &Schema) -> Result<BoundValue, Vec<CoerceError>> {
    match (schema.ty, value) {
        (ParamType::Object, Value::Object(map)) => coerce_object(map, schema),
        (ParamType::Array, Value::Array(items)) => coerce_json_items(items, schema),
        (_, Value::String(text)) if schema.ty != ParamType::File => coerce_text(text, schema),
        (ParamType::Integer, Value::Number(n)) => coerce_json_integer(n, schema).map_err(|e| vec![e]),
        (ParamType::Number, Value::Number(n)) => coerce_json_number(n, schema).map_err(|e| vec![e]),
        (ParamType::Boolean, Value::Bool(b)) => Ok(BoundValue::Bool(*b)),
        _ => Err(vec![CoerceError::mismatch(schema, value)]),
    }
}

fn coerce_json_integer(n: &serde_json::Number, schema: &Schema) -> Result<BoundValue, CoerceError> {
    let Some(n) = n.as_i64() else {
        return Err(CoerceError::malformed(format!(
            "{n} is not a valid {}",
            schema.type_label()
        )));
    };
    match schema.format {
        Some(Format::Int32) => i32::try_from(n).map(BoundValue::Int32).map_err(|_| {
            CoerceError::malformed(format!("{n} is out of range for integer/int32"))
        }),
        _ => Ok(BoundValue::Int64(n)),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn coerce_json_number(n: &serde_json::Number, schema: &Schema) -> Result<BoundValue, CoerceError> {
    let not_finite =
        || CoerceError::malformed(format!("{n} is not a finite {}", schema.type_label()));
    let n = n.as_f64().filter(|f| f.is_finite()).ok_or_else(not_finite)?;
    match schema.format {
        Some(Format::Float) => {
            let f = n as f32;
            if f.is_finite() {
                Ok(BoundValue::Float(f))
            } else {
                Err(not_finite())
            }
        }
        _ => Ok(BoundValue::Double(n)),
    }
}

fn coerce_json_items(items: &[Value], schema: &Schema) -> Result<BoundValue, Vec<CoerceError>> {
    let string = Schema::string();
    let item_schema = schema.items.as_deref().unwrap_or(&string);

    let mut values = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match coerce_json(item, item_schema) {
            Ok(value) => values.push(value),
            Err(item_errors) => errors.extend(item_errors.into_iter().map(|e| e.in_item(index))),
        }
    }
    if errors.is_empty() {
        Ok(BoundValue::Array(values))
    } else {
        Err(errors)
    }
}

fn coerce_object(
    map: &serde_json::Map<String, Value>,
    schema: &Schema,
) -> Result<BoundValue, Vec<CoerceError>> {
    if schema.properties.is_empty() {
        return Ok(BoundValue::Json(Value::Object(map.clone())));
    }

    let mut object = IndexMap::with_capacity(map.len());
    let mut errors = Vec::new();
    for (name, property) in &schema.properties {
        match map.get(name).filter(|v| !v.is_null()) {
            Some(value) => match coerce_json(value, property) {
                Ok(bound) => {
                    object.insert(name.clone(), bound);
                }
                Err(nested) => errors.extend(nested.into_iter().map(|e| e.within(name))),
            },
            None if schema.is_required(name) => errors.push(CoerceError::missing().within(name)),
            None => {}
        }
    }
    for (name, value) in map {
        if !schema.properties.contains_key(name) {
            object.insert(name.clone(), BoundValue::Json(value.clone()));
        }
    }

    if errors.is_empty() {
        Ok(BoundValue::Object(object))
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::{Datelike, Timelike};
    use serde_json::json;

    fn typed(ty: ParamType, format: Option<Format>) -> Schema {
        let schema = Schema::new(ty);
        match format {
            Some(format) => schema.with_format(format),
            None => schema,
        }
    }

    #[test]
    fn test_integers() {
        let int32 = typed(ParamType::Integer, Some(Format::Int32));
        let int64 = typed(ParamType::Integer, Some(Format::Int64));
        let plain = typed(ParamType::Integer, None);

        assert_eq!(coerce_text("+7", &int32).unwrap(), BoundValue::Int32(7));
        assert_eq!(coerce_text("-2147483648", &int32).unwrap(), BoundValue::Int32(i32::MIN));
        assert!(coerce_text("2147483648", &int32).is_err());
        assert_eq!(
            coerce_text("9223372036854775807", &int64).unwrap(),
            BoundValue::Int64(i64::MAX)
        );
        assert!(coerce_text("9223372036854775808", &int64).is_err());
        assert_eq!(coerce_text("1", &plain).unwrap(), BoundValue::Int64(1));
        assert!(coerce_text("1.5", &plain).is_err());
        assert!(coerce_text("abc", &plain).is_err());
    }

    #[test]
    fn test_numbers() {
        let float = typed(ParamType::Number, Some(Format::Float));
        let double = typed(ParamType::Number, None);

        assert_eq!(coerce_text("1.5", &float).unwrap(), BoundValue::Float(1.5));
        assert_eq!(coerce_text("1e3", &double).unwrap(), BoundValue::Double(1000.0));
        assert!(coerce_text("1e40", &float).is_err());
        assert!(coerce_text("1e400", &double).is_err());
        assert!(coerce_text("NaN", &double).is_err());
        assert!(coerce_text("inf", &double).is_err());
    }

    #[test]
    fn test_booleans_are_strict() {
        let flag = Schema::boolean();

        assert_eq!(coerce_text("true", &flag).unwrap(), BoundValue::Bool(true));
        assert_eq!(coerce_text("false", &flag).unwrap(), BoundValue::Bool(false));
        for bad in ["TRUE", "1", "yes", "t", ""] {
            assert!(coerce_text(bad, &flag).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_dates() {
        let date = typed(ParamType::String, Some(Format::Date));
        let date_time = typed(ParamType::String, Some(Format::DateTime));

        match coerce_text("2014-10-12", &date).unwrap() {
            BoundValue::Date(d) => assert_eq!((d.year(), d.month(), d.day()), (2014, 10, 12)),
            other => panic!("unexpected value: {other:?}"),
        }
        assert!(coerce_text("2014-13-01", &date).is_err());
        assert!(coerce_text("12/10/2014", &date).is_err());

        match coerce_text("2014-10-12T08:05:05.000+02:00", &date_time).unwrap() {
            BoundValue::DateTime(dt) => {
                assert_eq!(dt.hour(), 8);
                assert_eq!(dt.offset().local_minus_utc(), 7200);
            }
            other => panic!("unexpected value: {other:?}"),
        }
        assert!(coerce_text("2014-10-12 08:05:05", &date_time).is_err());
    }

    #[test]
    fn test_bytes() {
        let byte = typed(ParamType::String, Some(Format::Byte));

        assert_eq!(
            coerce_text("aGVsbG8=", &byte).unwrap(),
            BoundValue::Bytes(Bytes::from_static(b"hello"))
        );
        assert!(coerce_text("not base64!", &byte).is_err());
    }

    #[test]
    fn test_unknown_format_is_text() {
        let uuid = typed(ParamType::String, Some(Format::Other("uuid".into())));
        assert_eq!(
            coerce_text("anything", &uuid).unwrap(),
            BoundValue::String("anything".into())
        );
    }

    #[test]
    fn test_items_report_index() {
        let schema = Schema::array(typed(ParamType::Integer, Some(Format::Int32)));
        let items = vec!["1".to_string(), "x".to_string(), "3".to_string(), "y".to_string()];

        let errors = coerce_items(items, &schema).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind(), ErrorKind::MalformedCollection);
        assert!(errors[0].message().starts_with("item 1:"));
        assert!(errors[1].message().starts_with("item 3:"));
    }

    #[test]
    fn test_items_keep_order_and_duplicates() {
        let schema = Schema::array(Schema::string());
        let items = vec!["b".to_string(), "a".to_string(), "b".to_string()];

        assert_eq!(
            coerce_items(items, &schema).unwrap(),
            BoundValue::Array(vec![
                BoundValue::String("b".into()),
                BoundValue::String("a".into()),
                BoundValue::String("b".into()),
            ])
        );
    }

    #[test]
    fn test_nested_array_text() {
        let schema = Schema::array(
            Schema::array(Schema::integer()).with_collection_format(CollectionFormat::Pipes),
        );
        let items = vec!["1|2".to_string(), "3".to_string()];

        assert_eq!(
            coerce_items(items, &schema).unwrap(),
            BoundValue::Array(vec![
                BoundValue::Array(vec![BoundValue::Int64(1), BoundValue::Int64(2)]),
                BoundValue::Array(vec![BoundValue::Int64(3)]),
            ])
        );
    }

    #[test]
    fn test_json_strings_coerce_as_text() {
        let int32 = typed(ParamType::Integer, Some(Format::Int32));
        assert_eq!(coerce_json(&json!("32"), &int32).unwrap(), BoundValue::Int32(32));

        let tags = Schema::array(Schema::string()).with_collection_format(CollectionFormat::Pipes);
        assert_eq!(
            coerce_json(&json!("a|b"), &tags).unwrap(),
            BoundValue::Array(vec![
                BoundValue::String("a".into()),
                BoundValue::String("b".into())
            ])
        );
    }

    #[test]
    fn test_json_numbers() {
        let int32 = typed(ParamType::Integer, Some(Format::Int32));
        let float = typed(ParamType::Number, Some(Format::Float));

        assert_eq!(coerce_json(&json!(32), &int32).unwrap(), BoundValue::Int32(32));
        assert!(coerce_json(&json!(4_294_967_296_i64), &int32).is_err());
        assert!(coerce_json(&json!(1.5), &int32).is_err());
        assert_eq!(coerce_json(&json!(0.5), &float).unwrap(), BoundValue::Float(0.5));
        assert!(coerce_json(&json!(1e300), &float).is_err());
        assert!(coerce_json(&json!(true), &float).is_err());
    }

    #[test]
    fn test_object_without_properties_is_json() {
        let value = json!({ "name": "toby", "age": 32 });
        assert_eq!(
            coerce_json(&value, &Schema::object()).unwrap(),
            BoundValue::Json(value)
        );
    }

    #[test]
    fn test_object_with_properties() {
        let friend = Schema::object()
            .required_property("name", Schema::string())
            .property("age", typed(ParamType::Integer, Some(Format::Int32)));

        let bound = coerce_json(&json!({ "name": "toby", "age": 32, "extra": [1] }), &friend)
            .unwrap();
        let BoundValue::Object(map) = bound else {
            panic!("expected object");
        };
        assert_eq!(map["name"], BoundValue::String("toby".into()));
        assert_eq!(map["age"], BoundValue::Int32(32));
        assert_eq!(map["extra"], BoundValue::Json(json!([1])));
    }

    #[test]
    fn test_nested_paths() {
        let friend = Schema::object().required_property("name", Schema::string());
        let schema = Schema::object().property("friends", Schema::array(friend));

        let errors =
            coerce_json(&json!({ "friends": [{ "name": "a" }, { "age": 1 }] }), &schema)
                .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), "friends.1.name");
        assert_eq!(errors[0].kind(), ErrorKind::MissingRequired);
    }

    #[test]
    fn test_null_property_counts_as_missing() {
        let schema = Schema::object().required_property("name", Schema::string());

        let errors = coerce_json(&json!({ "name": null }), &schema).unwrap_err();
        assert_eq!(errors[0].kind(), ErrorKind::MissingRequired);
    }

    #[test]
    fn test_type_mismatch() {
        let errors = coerce_json(&json!([1, 2]), &Schema::object()).unwrap_err();
        assert_eq!(errors[0].message(), "expected object, found array");
    }
}
