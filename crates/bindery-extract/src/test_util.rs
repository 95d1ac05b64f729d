//! Request fixtures shared by unit and integration tests.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-util` feature.

/// Encodes `parts` as a `multipart/form-data` body delimited by `boundary`.
///
/// Each part is `(name, file_name, data)`. Parts with a file name are sent
/// as `application/octet-stream` file parts; the others are text fields.
#[must_use]
pub fn multipart_body(boundary: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    body
}
