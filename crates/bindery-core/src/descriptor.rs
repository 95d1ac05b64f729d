//! Parameter descriptors.
//!
//! A [`ParamDescriptor`] declares one expected input of an operation: where
//! the raw value lives, which type it is coerced into and how multiple items
//! are encoded on the wire. Descriptors follow the OpenAPI 2 parameter object
//! closely enough to be deserialized from one.
//!
//! # Example
//!
//! ```
//! use bindery_core::{CollectionFormat, Format, ParamDescriptor, ParamType, Schema};
//!
//! let id = ParamDescriptor::path("id").typed(ParamType::Integer, Some(Format::Int64));
//! let tags = ParamDescriptor::query("tags")
//!     .collection_of(Schema::string(), CollectionFormat::Pipes);
//!
//! assert!(id.required);
//! assert!(tags.is_array());
//! assert_eq!(tags.schema.collection_format, CollectionFormat::Pipes);
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Where a parameter's raw value is taken from.
///
/// Unknown location strings are preserved as [`Location::Unrecognized`] so
/// the binder can report them as configuration errors when it runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Location {
    /// Path template variable supplied by the router.
    Path,
    /// Query string parameter.
    Query,
    /// HTTP header.
    Header,
    /// Url-encoded or multipart form field.
    Form,
    /// Multipart file part.
    File,
    /// Request body decoded by a consumer.
    Body,
    /// A location name that is not understood.
    Unrecognized(String),
}

impl Location {
    /// Returns the wire name of this location.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Form => "formData",
            Self::File => "file",
            Self::Body => "body",
            Self::Unrecognized(other) => other,
        }
    }

    /// Returns false for [`Location::Unrecognized`].
    #[must_use]
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        match value {
            "path" => Self::Path,
            "query" => Self::Query,
            "header" => Self::Header,
            "formData" | "form" => Self::Form,
            "file" => Self::File,
            "body" => Self::Body,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form => write!(f, "form"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Declared type of a parameter or schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// Text, optionally refined by a [`Format`].
    #[default]
    String,
    /// Whole number (`int32` or `int64`).
    Integer,
    /// Floating point number (`float` or `double`).
    Number,
    /// `true` or `false`.
    Boolean,
    /// Ordered sequence of items.
    Array,
    /// Structured value with named properties.
    Object,
    /// Uploaded file.
    File,
}

impl ParamType {
    /// Returns the lowercase type name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::File => "file",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refinement of a [`ParamType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Format {
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// IEEE-754 single precision.
    Float,
    /// IEEE-754 double precision.
    Double,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// RFC 3339 timestamp.
    DateTime,
    /// Base64 encoded bytes.
    Byte,
    /// Any other format; treated as plain text.
    Other(String),
}

impl Format {
    /// Returns the OpenAPI format name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Byte => "byte",
            Self::Other(other) => other,
        }
    }
}

impl From<&str> for Format {
    fn from(value: &str) -> Self {
        match value {
            "int32" => Self::Int32,
            "int64" => Self::Int64,
            "float" => Self::Float,
            "double" => Self::Double,
            "date" => Self::Date,
            "date-time" => Self::DateTime,
            "byte" => Self::Byte,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Format {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Format> for String {
    fn from(value: Format) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How multiple array items are encoded in a single-valued location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    /// Comma separated: `a,b,c`.
    #[default]
    Csv,
    /// Space separated: `a b c`.
    Ssv,
    /// Tab separated.
    Tsv,
    /// Pipe separated: `a|b|c`.
    Pipes,
    /// One value per occurrence: `tags=a&tags=b`.
    Multi,
}

impl CollectionFormat {
    /// Returns the item separator, or `None` for [`CollectionFormat::Multi`].
    #[must_use]
    pub const fn separator(&self) -> Option<char> {
        match self {
            Self::Csv => Some(','),
            Self::Ssv => Some(' '),
            Self::Tsv => Some('\t'),
            Self::Pipes => Some('|'),
            Self::Multi => None,
        }
    }

    /// Returns the OpenAPI name of this format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Ssv => "ssv",
            Self::Tsv => "tsv",
            Self::Pipes => "pipes",
            Self::Multi => "multi",
        }
    }
}

impl fmt::Display for CollectionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a value: type, format, items and properties.
///
/// Schemas nest. Array items carry their own schema, and object schemas may
/// declare properties which are coerced the same way top-level parameters
/// are. Cyclic schemas cannot be expressed with owned boxes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Declared type.
    #[serde(rename = "type", default)]
    pub ty: ParamType,
    /// Optional format refinement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    /// Item encoding for arrays in single-valued locations.
    #[serde(default, rename = "collectionFormat")]
    pub collection_format: CollectionFormat,
    /// Item schema for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Declared object properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Names of required object properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

impl Schema {
    /// Creates a schema of the given type.
    #[must_use]
    pub fn new(ty: ParamType) -> Self {
        Self {
            ty,
            ..Self::default()
        }
    }

    /// Plain string schema.
    #[must_use]
    pub fn string() -> Self {
        Self::new(ParamType::String)
    }

    /// Integer schema without a format (64-bit).
    #[must_use]
    pub fn integer() -> Self {
        Self::new(ParamType::Integer)
    }

    /// Number schema without a format (double precision).
    #[must_use]
    pub fn number() -> Self {
        Self::new(ParamType::Number)
    }

    /// Boolean schema.
    #[must_use]
    pub fn boolean() -> Self {
        Self::new(ParamType::Boolean)
    }

    /// Object schema without declared properties.
    #[must_use]
    pub fn object() -> Self {
        Self::new(ParamType::Object)
    }

    /// File schema.
    #[must_use]
    pub fn file() -> Self {
        Self::new(ParamType::File)
    }

    /// Array schema with the given item schema and csv encoding.
    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self {
            ty: ParamType::Array,
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    /// Sets the format.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Sets the collection format.
    #[must_use]
    pub fn with_collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = format;
        self
    }

    /// Declares an object property.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Declares an object property and marks it required.
    #[must_use]
    pub fn required_property(mut self, name: impl Into<String>, schema: Schema) -> Self {
        let name = name.into();
        self.required.push(name.clone());
        self.properties.insert(name, schema);
        self
    }

    /// Returns true if the named property is required.
    #[must_use]
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|r| r == property)
    }

    /// Human readable `type/format` label used in error messages.
    #[must_use]
    pub fn type_label(&self) -> String {
        match &self.format {
            Some(format) => format!("{}/{}", self.ty, format),
            None => self.ty.to_string(),
        }
    }
}

/// Declaration of one expected request input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    /// Wire name of the parameter.
    pub name: String,
    /// Source location.
    #[serde(rename = "in")]
    pub location: Location,
    /// Value shape.
    #[serde(default)]
    pub schema: Schema,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
    /// Value applied when the parameter is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamDescriptor {
    /// Creates an optional string parameter at the given location.
    #[must_use]
    pub fn new(name: impl Into<String>, location: impl Into<Location>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            schema: Schema::string(),
            required: false,
            default: None,
        }
    }

    /// Path parameter. Path parameters are always required.
    #[must_use]
    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, Location::Path).required()
    }

    /// Query string parameter.
    #[must_use]
    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, Location::Query)
    }

    /// Header parameter.
    #[must_use]
    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, Location::Header)
    }

    /// Form field parameter.
    #[must_use]
    pub fn form(name: impl Into<String>) -> Self {
        Self::new(name, Location::Form)
    }

    /// Multipart file parameter.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        let mut descriptor = Self::new(name, Location::File);
        descriptor.schema = Schema::file();
        descriptor
    }

    /// Body parameter with the given schema.
    #[must_use]
    pub fn body(name: impl Into<String>, schema: Schema) -> Self {
        let mut descriptor = Self::new(name, Location::Body);
        descriptor.schema = schema;
        descriptor
    }

    /// Sets the type and format.
    #[must_use]
    pub fn typed(mut self, ty: ParamType, format: Option<Format>) -> Self {
        self.schema.ty = ty;
        self.schema.format = format;
        self
    }

    /// Makes this an array of `items` encoded with `format`.
    #[must_use]
    pub fn collection_of(mut self, items: Schema, format: CollectionFormat) -> Self {
        self.schema.ty = ParamType::Array;
        self.schema.items = Some(Box::new(items));
        self.schema.collection_format = format;
        self
    }

    /// Marks the parameter as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the parameter as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Returns true if the declared type is an array.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.schema.ty == ParamType::Array
    }

    /// Returns true if the parameter binds an uploaded file.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.location == Location::File || self.schema.ty == ParamType::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_round_trip_names() {
        for name in ["path", "query", "header", "formData", "file", "body"] {
            let location = Location::from(name);
            assert!(location.is_recognized());
            assert_eq!(location.as_str(), name);
        }
        assert_eq!(Location::from("form"), Location::Form);
    }

    #[test]
    fn test_unrecognized_location_is_preserved() {
        let location = Location::from("invalid");
        assert!(!location.is_recognized());
        assert_eq!(location.to_string(), "invalid");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(Format::from("date-time"), Format::DateTime);
        assert_eq!(Format::from("int32"), Format::Int32);
        assert_eq!(Format::from("uuid"), Format::Other("uuid".into()));
    }

    #[test]
    fn test_collection_separators() {
        assert_eq!(CollectionFormat::Csv.separator(), Some(','));
        assert_eq!(CollectionFormat::Ssv.separator(), Some(' '));
        assert_eq!(CollectionFormat::Tsv.separator(), Some('\t'));
        assert_eq!(CollectionFormat::Pipes.separator(), Some('|'));
        assert_eq!(CollectionFormat::Multi.separator(), None);
        assert_eq!(CollectionFormat::default(), CollectionFormat::Csv);
    }

    #[test]
    fn test_descriptor_builders() {
        let header = ParamDescriptor::header("X-Request-Id")
            .typed(ParamType::Integer, Some(Format::Int64))
            .required();
        assert_eq!(header.location, Location::Header);
        assert_eq!(header.schema.type_label(), "integer/int64");
        assert!(header.required);

        let file = ParamDescriptor::file("upload");
        assert!(file.is_file());
        assert!(!file.required);

        let path = ParamDescriptor::path("id");
        assert!(path.required);
    }

    #[test]
    fn test_descriptor_deserializes_from_parameter_object() {
        let json = serde_json::json!({
            "name": "tags",
            "in": "query",
            "schema": {
                "type": "array",
                "collectionFormat": "pipes",
                "items": { "type": "string" }
            },
            "default": "a|b"
        });

        let descriptor: ParamDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(descriptor.location, Location::Query);
        assert!(descriptor.is_array());
        assert_eq!(descriptor.schema.collection_format, CollectionFormat::Pipes);
        assert_eq!(descriptor.schema.items.as_deref(), Some(&Schema::string()));
        assert_eq!(descriptor.default, Some(Value::from("a|b")));
    }

    #[test]
    fn test_descriptor_keeps_unknown_location() {
        let json = serde_json::json!({ "name": "tags", "in": "cookie" });
        let descriptor: ParamDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(descriptor.location, Location::Unrecognized("cookie".into()));
    }

    #[test]
    fn test_object_schema_properties() {
        let schema = Schema::object()
            .required_property("name", Schema::string())
            .property("age", Schema::integer().with_format(Format::Int32));

        assert!(schema.is_required("name"));
        assert!(!schema.is_required("age"));
        assert_eq!(schema.properties.len(), 2);
    }
}
