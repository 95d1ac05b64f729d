//! Integration tests for request binding across every location.
//!
//! These tests drive the public API end to end: descriptors are declared,
//! a `BindRequest` is assembled the way a server adapter would, and the
//! result is checked both as raw `BoundValue`s and through a typed
//! destination implementing `BindTarget`.

use bindery::prelude::*;
use bindery_extract::test_util::multipart_body;
use bytes::Bytes;
use chrono::NaiveDate;
use http::{Method, Request, StatusCode, Uri};
use indexmap::IndexMap;
use serde::Deserialize;

type Fields = IndexMap<String, BoundValue>;

async fn bind(
    binder: &RequestBinder,
    request: &mut BindRequest,
    route: &RouteParams,
) -> (BindingResult, Fields) {
    let mut fields = Fields::new();
    let result = binder.bind(request, route, &JsonConsumer, &mut fields).await;
    (result, fields)
}

// =============================================================================
// Typed destination
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Friend {
    name: String,
    age: Option<i32>,
}

#[derive(Debug, Default)]
struct UpdatePetParams {
    id: i64,
    request_id: String,
    tags: Vec<String>,
    limit: Option<i32>,
    since: Option<NaiveDate>,
    friend: Option<Friend>,
}

impl BindTarget for UpdatePetParams {
    fn has_field(&self, field: &str) -> bool {
        matches!(
            field,
            "ID" | "RequestID" | "Tags" | "Limit" | "Since" | "Friend"
        )
    }

    fn bind_field(&mut self, field: &str, value: BoundValue) -> Result<(), FieldError> {
        match field {
            "ID" => self.id = value.into_typed()?,
            "RequestID" => self.request_id = value.into_typed()?,
            "Tags" => self.tags = value.into_typed()?,
            "Limit" => self.limit = value.into_typed()?,
            "Since" => self.since = Some(value.into_typed()?),
            "Friend" => self.friend = Some(value.deserialize()?),
            other => return Err(FieldError::unknown(other)),
        }
        Ok(())
    }
}

fn friend_schema() -> Schema {
    Schema::object()
        .required_property("name", Schema::string())
        .property("age", Schema::integer().with_format(Format::Int32))
}

fn update_pet_binder() -> RequestBinder {
    RequestBinder::builder()
        .param(
            "ID",
            ParamDescriptor::path("id").typed(ParamType::Integer, Some(Format::Int64)),
        )
        .param("RequestID", ParamDescriptor::header("X-Request-Id").required())
        .param(
            "Tags",
            ParamDescriptor::query("tags")
                .collection_of(Schema::string(), CollectionFormat::Pipes),
        )
        .param(
            "Limit",
            ParamDescriptor::query("limit")
                .typed(ParamType::Integer, Some(Format::Int32))
                .with_default(20),
        )
        .param(
            "Since",
            ParamDescriptor::query("since").typed(ParamType::String, Some(Format::Date)),
        )
        .param("Friend", ParamDescriptor::body("friend", friend_schema()).required())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_typed_destination_from_every_location() {
    let binder = update_pet_binder();
    let mut request = BindRequest::builder()
        .method(Method::PUT)
        .uri(Uri::from_static("/pets/42?tags=cute%7Cfluffy&since=2024-02-29"))
        .header("x-request-id", "req-1")
        .header("content-type", "application/json")
        .body(r#"{"name": "toby", "age": 3}"#)
        .build();
    let route: RouteParams = [("id", "42")].into_iter().collect();

    let mut params = UpdatePetParams::default();
    let result = binder
        .bind(&mut request, &route, &JsonConsumer, &mut params)
        .await;

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(params.id, 42);
    assert_eq!(params.request_id, "req-1");
    assert_eq!(params.tags, ["cute", "fluffy"]);
    assert_eq!(params.limit, Some(20));
    assert_eq!(params.since, NaiveDate::from_ymd_opt(2024, 2, 29));
    assert_eq!(
        params.friend,
        Some(Friend {
            name: "toby".to_string(),
            age: Some(3),
        })
    );
}

#[tokio::test]
async fn test_typed_destination_rejecting_a_field() {
    #[derive(Default)]
    struct OnlyName {
        name: String,
    }

    impl BindTarget for OnlyName {
        fn bind_field(&mut self, field: &str, value: BoundValue) -> Result<(), FieldError> {
            match field {
                "Name" => self.name = value.into_typed()?,
                other => return Err(FieldError::unknown(other)),
            }
            Ok(())
        }
    }

    let binder = RequestBinder::new([
        ("Name", ParamDescriptor::query("name")),
        ("Extra", ParamDescriptor::query("extra")),
    ])
    .unwrap();
    let mut request = BindRequest::builder()
        .uri(Uri::from_static("/?name=toby&extra=1"))
        .build();

    let mut target = OnlyName::default();
    let result = binder
        .bind(&mut request, &RouteParams::new(), &JsonConsumer, &mut target)
        .await;

    assert_eq!(target.name, "toby");
    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].parameter(), "extra");
    assert_eq!(result.errors()[0].kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_destination_without_declared_field() {
    #[derive(Default)]
    struct NameOnly {
        name: String,
    }

    impl BindTarget for NameOnly {
        fn has_field(&self, field: &str) -> bool {
            matches!(field, "Name")
        }

        fn bind_field(&mut self, field: &str, value: BoundValue) -> Result<(), FieldError> {
            match field {
                "Name" => self.name = value.into_typed()?,
                other => return Err(FieldError::unknown(other)),
            }
            Ok(())
        }
    }

    let binder = RequestBinder::new([
        ("Name", ParamDescriptor::query("name")),
        ("Some", ParamDescriptor::query("some")),
    ])
    .unwrap();
    let mut request = BindRequest::builder()
        .uri(Uri::from_static("/hello?name=the-name"))
        .build();

    let mut target = NameOnly::default();
    let result = binder
        .bind(&mut request, &RouteParams::new(), &JsonConsumer, &mut target)
        .await;

    assert!(!result.is_valid());
    assert_eq!(target.name, "the-name");
    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].parameter(), "some");
    assert_eq!(result.errors()[0].kind(), ErrorKind::Configuration);
    assert_eq!(
        result.errors()[0].status_code(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn test_from_http_request() {
    let binder = RequestBinder::new([(
        "Friend",
        ParamDescriptor::body("friend", friend_schema()),
    )])
    .unwrap();
    let http_request = Request::builder()
        .method(Method::POST)
        .uri("/friends")
        .header("content-type", "application/vnd.pets+json")
        .body(Bytes::from_static(br#"{"name": "rex"}"#))
        .unwrap();
    let mut request = BindRequest::from(http_request);

    let (result, fields) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert!(result.is_valid());
    let friend: Friend = fields["Friend"].clone().deserialize().unwrap();
    assert_eq!(friend.name, "rex");
    assert_eq!(friend.age, None);
}

// =============================================================================
// Body
// =============================================================================

#[tokio::test]
async fn test_body_slice_of_objects() {
    let binder = RequestBinder::new([(
        "Friends",
        ParamDescriptor::body("friends", Schema::array(friend_schema())).required(),
    )])
    .unwrap();
    let mut request = BindRequest::builder()
        .header("content-type", "application/json")
        .body(r#"[{"name": "toby", "age": 1}, {"name": "rex"}]"#)
        .build();

    let (result, fields) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert!(result.is_valid());
    let friends: Vec<Friend> = fields["Friends"].clone().deserialize().unwrap();
    assert_eq!(friends.len(), 2);
    assert_eq!(friends[1].name, "rex");
}

#[tokio::test]
async fn test_body_nested_errors_use_dotted_names() {
    let binder = RequestBinder::new([(
        "Friends",
        ParamDescriptor::body("friends", Schema::array(friend_schema())),
    )])
    .unwrap();
    let mut request = BindRequest::builder()
        .header("content-type", "application/json")
        .body(r#"[{"name": "toby"}, {"age": "old"}]"#)
        .build();

    let (result, fields) = bind(&binder, &mut request, &RouteParams::new()).await;

    let names: Vec<_> = result.errors().iter().map(BindingError::parameter).collect();
    assert_eq!(names, ["friends.1.name", "friends.1.age"]);
    assert_eq!(result.errors()[0].kind(), ErrorKind::MissingRequired);
    assert!(!fields.contains_key("Friends"));
}

#[tokio::test]
async fn test_body_without_content_type() {
    let binder =
        RequestBinder::new([("Friend", ParamDescriptor::body("friend", friend_schema()))])
            .unwrap();

    let mut request = BindRequest::builder().body(r#"{"name": "toby"}"#).build();
    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;
    assert_eq!(result.errors()[0].kind(), ErrorKind::UnsupportedMediaType);

    let mut request = BindRequest::builder()
        .header("content-type", "application(")
        .body(r#"{"name": "toby"}"#)
        .build();
    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;
    assert_eq!(result.errors()[0].kind(), ErrorKind::UnsupportedMediaType);
    assert_eq!(result.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let mut request = BindRequest::builder()
        .header("content-type", "text/xml")
        .body("<friend/>")
        .build();
    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;
    assert_eq!(result.errors()[0].kind(), ErrorKind::UnsupportedMediaType);
}

#[tokio::test]
async fn test_empty_body_is_absent() {
    let binder = RequestBinder::new([
        ("Optional", ParamDescriptor::body("optional", friend_schema())),
    ])
    .unwrap();
    let mut request = BindRequest::builder()
        .header("content-type", "application/json")
        .body("")
        .build();

    let (result, fields) = bind(&binder, &mut request, &RouteParams::new()).await;
    assert!(result.is_valid());
    assert!(fields.is_empty());

    let required = RequestBinder::new([(
        "Friend",
        ParamDescriptor::body("friend", friend_schema()).required(),
    )])
    .unwrap();
    let mut request = BindRequest::builder()
        .header("content-type", "application/json")
        .body("null")
        .build();

    let (result, _) = bind(&required, &mut request, &RouteParams::new()).await;
    assert_eq!(result.errors()[0].kind(), ErrorKind::MissingRequired);
}

#[tokio::test]
async fn test_interrupted_body_stream() {
    let binder =
        RequestBinder::new([("Friend", ParamDescriptor::body("friend", friend_schema()))])
            .unwrap();
    let chunks = vec![
        Ok(Bytes::from_static(br#"{"name": "#)),
        Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "client went away",
        )),
    ];
    let mut request = BindRequest::builder()
        .header("content-type", "application/json")
        .stream(futures_util::stream::iter(chunks))
        .build();

    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].kind(), ErrorKind::DecodeFailure);
    assert!(request.is_body_consumed());
}

#[tokio::test]
async fn test_chunked_body_stream() {
    let binder =
        RequestBinder::new([("Friend", ParamDescriptor::body("friend", friend_schema()))])
            .unwrap();
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(Bytes::from_static(br#"{"name": "#)),
        Ok(Bytes::from_static(br#""toby"}"#)),
    ];
    let mut request = BindRequest::builder()
        .header("content-type", "application/json")
        .stream(futures_util::stream::iter(chunks))
        .build();

    let (result, fields) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert!(result.is_valid());
    let friend: Friend = fields["Friend"].clone().deserialize().unwrap();
    assert_eq!(friend.name, "toby");
}

// =============================================================================
// Form
// =============================================================================

fn form_binder() -> RequestBinder {
    RequestBinder::new([
        ("Name", ParamDescriptor::form("name").required()),
        (
            "Age",
            ParamDescriptor::form("age").typed(ParamType::Integer, Some(Format::Int32)),
        ),
        (
            "Colors",
            ParamDescriptor::form("colors").collection_of(Schema::string(), CollectionFormat::Csv),
        ),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_urlencoded_form() {
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=the+toby&age=32&colors=red%2Cblue")
        .build();

    let (result, fields) = bind(&form_binder(), &mut request, &RouteParams::new()).await;

    assert!(result.is_valid());
    assert_eq!(fields["Name"], BoundValue::String("the toby".into()));
    assert_eq!(fields["Age"], BoundValue::Int32(32));
    assert_eq!(
        fields["Colors"],
        BoundValue::Array(vec![
            BoundValue::String("red".into()),
            BoundValue::String("blue".into()),
        ])
    );
}

#[tokio::test]
async fn test_urlencoded_form_bad_escape() {
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=%3&age=32")
        .build();

    let (result, fields) = bind(&form_binder(), &mut request, &RouteParams::new()).await;

    assert!(!result.is_valid());
    assert!(fields.is_empty());
    assert!(result
        .errors()
        .iter()
        .all(|e| e.kind() == ErrorKind::DecodeFailure));
}

#[tokio::test]
async fn test_form_requires_form_content_type() {
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "application/json")
        .body(r#"{"name": "toby"}"#)
        .build();

    let (result, _) = bind(&form_binder(), &mut request, &RouteParams::new()).await;

    assert_eq!(result.errors()[0].kind(), ErrorKind::UnsupportedMediaType);
    assert_eq!(result.errors()[0].location(), &Location::Form);
}

#[tokio::test]
async fn test_multipart_text_fields_feed_form_params() {
    let body = multipart_body(
        "xyz",
        &[("name", None, b"toby"), ("age", None, b"7"), ("colors", None, b"")],
    );
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "multipart/form-data; boundary=xyz")
        .body(body)
        .build();

    let (result, fields) = bind(&form_binder(), &mut request, &RouteParams::new()).await;

    assert!(result.is_valid(), "{:?}", result.errors());
    assert_eq!(fields["Name"], BoundValue::String("toby".into()));
    assert_eq!(fields["Age"], BoundValue::Int32(7));
    assert_eq!(fields["Colors"], BoundValue::Array(Vec::new()));
}

// =============================================================================
// Files
// =============================================================================

fn upload_binder() -> RequestBinder {
    RequestBinder::new([
        ("File", ParamDescriptor::file("file")),
        ("Name", ParamDescriptor::form("name").required()),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_file_field_named_wrong() {
    let body = multipart_body(
        "b",
        &[("bad-name", Some("plain.txt"), b"the file contents"), ("name", None, b"x")],
    );
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "multipart/form-data; boundary=b")
        .body(body)
        .build();

    let (result, fields) = bind(&upload_binder(), &mut request, &RouteParams::new()).await;

    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].parameter(), "file");
    assert_eq!(result.errors()[0].kind(), ErrorKind::MissingRequired);
    assert_eq!(fields["Name"], BoundValue::String("x".into()));
}

#[tokio::test]
async fn test_file_sent_as_text_field() {
    let body = multipart_body("b", &[("file", None, b"not a file"), ("name", None, b"x")]);
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "multipart/form-data; boundary=b")
        .body(body)
        .build();

    let (result, _) = bind(&upload_binder(), &mut request, &RouteParams::new()).await;

    assert_eq!(result.len(), 1);
    assert_eq!(result.errors()[0].kind(), ErrorKind::MalformedValue);
}

#[tokio::test]
async fn test_multipart_without_boundary() {
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "multipart/form-data")
        .body("whatever")
        .build();

    let (result, _) = bind(&upload_binder(), &mut request, &RouteParams::new()).await;

    assert_eq!(result.len(), 2);
    assert!(result
        .errors()
        .iter()
        .all(|e| e.kind() == ErrorKind::UnsupportedMediaType));
}

#[tokio::test]
async fn test_multipart_reader_taken_before_bind() {
    let body = multipart_body("b", &[("file", Some("plain.txt"), b"data"), ("name", None, b"x")]);
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "multipart/form-data; boundary=b")
        .body(body)
        .build();
    let reader = request.multipart(&MultipartConfig::default()).unwrap();
    drop(reader);

    let (result, fields) = bind(&upload_binder(), &mut request, &RouteParams::new()).await;

    assert!(fields.is_empty());
    assert_eq!(result.len(), 2);
    assert_eq!(result.errors()[0].kind(), ErrorKind::UnsupportedMediaType);
}

#[tokio::test]
async fn test_multipart_field_limit() {
    let binder = RequestBinder::builder()
        .param("File", ParamDescriptor::file("file"))
        .config(BinderConfig::default().with_multipart(MultipartConfig::new().max_fields(1)))
        .build()
        .unwrap();
    let body = multipart_body(
        "b",
        &[("a", None, b"1"), ("b", None, b"2"), ("file", Some("f.txt"), b"data")],
    );
    let mut request = BindRequest::builder()
        .method(Method::POST)
        .header("content-type", "multipart/form-data; boundary=b")
        .body(body)
        .build();

    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert_eq!(result.errors()[0].kind(), ErrorKind::DecodeFailure);
}

// =============================================================================
// Configuration errors and reporting
// =============================================================================

#[tokio::test]
async fn test_multi_only_valid_in_query() {
    let binder = RequestBinder::new([
        (
            "Header",
            ParamDescriptor::header("X-Tags")
                .collection_of(Schema::string(), CollectionFormat::Multi),
        ),
        (
            "Path",
            ParamDescriptor::path("tags").collection_of(Schema::string(), CollectionFormat::Multi),
        ),
        (
            "Query",
            ParamDescriptor::query("tags").collection_of(Schema::string(), CollectionFormat::Multi),
        ),
    ])
    .unwrap();
    let mut request = BindRequest::builder()
        .uri(Uri::from_static("/x?tags=a&tags=b"))
        .header("x-tags", "a")
        .build();
    let route: RouteParams = [("tags", "a")].into_iter().collect();

    let (result, fields) = bind(&binder, &mut request, &route).await;

    let kinds: Vec<_> = result.errors().iter().map(BindingError::kind).collect();
    assert_eq!(
        kinds,
        [ErrorKind::MalformedCollection, ErrorKind::MalformedCollection]
    );
    assert_eq!(fields.len(), 1);
    assert!(fields.contains_key("Query"));
}

#[tokio::test]
async fn test_unknown_location_from_declaration() {
    let descriptor: ParamDescriptor =
        serde_json::from_str(r#"{ "name": "session", "in": "cookie", "required": true }"#)
            .unwrap();
    let binder = RequestBinder::new([("Session", descriptor)]).unwrap();

    let mut request = BindRequest::builder().build();
    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert_eq!(result.errors()[0].kind(), ErrorKind::Configuration);
    assert_eq!(result.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_route_missing_template_variable() {
    let binder = RequestBinder::new([("ID", ParamDescriptor::path("id"))]).unwrap();

    let mut request = BindRequest::builder().build();
    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert_eq!(result.errors()[0].kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn test_header_with_non_ascii_value() {
    let mut headers = http::HeaderMap::new();
    headers.insert(
        "x-name",
        http::HeaderValue::from_bytes("zoë".as_bytes()).unwrap(),
    );
    let mut request = BindRequest::new(Method::GET, Uri::from_static("/"), headers);
    let binder = RequestBinder::new([("Name", ParamDescriptor::header("X-Name"))]).unwrap();

    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;

    assert_eq!(result.errors()[0].kind(), ErrorKind::MalformedValue);
}

#[tokio::test]
async fn test_error_envelope_and_result() {
    let binder = RequestBinder::new([
        ("Age", ParamDescriptor::query("age").typed(ParamType::Integer, None)),
        ("Name", ParamDescriptor::header("X-Name").required()),
    ])
    .unwrap();
    let mut request = BindRequest::builder()
        .uri(Uri::from_static("/?age=1.5"))
        .build();

    let (result, _) = bind(&binder, &mut request, &RouteParams::new()).await;

    let envelope = result.to_envelope();
    assert_eq!(envelope["error"]["code"], "BINDING_FAILED");
    let details = envelope["error"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["code"], "INVALID_PARAMETER");
    assert_eq!(details[1]["code"], "MISSING_PARAMETER");
    assert_eq!(result.status_code(), StatusCode::BAD_REQUEST);

    let err = result.into_result().unwrap_err();
    assert_eq!(err.errors().len(), 2);
    assert_eq!(err.to_string(), "request binding failed with 2 error(s)");
}
