//! Header source.

use http::{HeaderMap, HeaderName};

/// Reads the first value of the named header.
///
/// Returns `Ok(None)` if the header is absent, including when `name` is not a
/// valid header name. A value that is not visible ASCII is an error.
///
/// # Errors
///
/// Returns a description of the offending value if it is not valid text.
pub fn first_value(headers: &HeaderMap, name: &str) -> Result<Option<String>, String> {
    let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
        return Ok(None);
    };
    headers
        .get(&name)
        .map(|value| {
            value
                .to_str()
                .map(str::to_string)
                .map_err(|_| format!("header '{name}' contains non-ASCII characters"))
        })
        .transpose()
}
