//! Form data shared by `form` and `file` parameters.
//!
//! A form body is parsed at most once per bind: url-encoded bodies by
//! [`parse_urlencoded`], multipart bodies by [`Multipart::collect`]. The
//! resulting [`FormData`] answers text lookups for form parameters and hands
//! each file part out exactly once.
//!
//! [`Multipart::collect`]: crate::Multipart::collect

use crate::ParamValues;
use bindery_core::UploadedFile;
use indexmap::IndexMap;
use thiserror::Error;

/// Error returned when a url-encoded body is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// A `%` is not followed by two hex digits.
    #[error("invalid URL escape \"{0}\"")]
    InvalidEscape(String),

    /// The body could not be decoded.
    #[error("invalid form body: {0}")]
    Decode(String),
}

/// Parses an `application/x-www-form-urlencoded` body.
///
/// Percent escapes are validated strictly before decoding; `%3` or `%zz`
/// make the whole body invalid.
///
/// # Errors
///
/// Returns [`FormError`] if an escape is malformed or decoding fails.
///
/// # Example
///
/// ```rust
/// use bindery_extract::{parse_urlencoded, FormError};
///
/// let values = parse_urlencoded(b"name=the-name&age=32").unwrap();
/// assert_eq!(values.first("age"), Some("32"));
///
/// let err = parse_urlencoded(b"name=%3&age=32").unwrap_err();
/// assert_eq!(err, FormError::InvalidEscape("%3&".into()));
/// ```
pub fn parse_urlencoded(body: &[u8]) -> Result<ParamValues, FormError> {
    validate_escapes(body)?;
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|e| FormError::Decode(e.to_string()))?;
    Ok(pairs.into_iter().collect())
}

fn validate_escapes(body: &[u8]) -> Result<(), FormError> {
    let mut i = 0;
    while i < body.len() {
        if body[i] == b'%' {
            let escape = body.get(i + 1..i + 3).unwrap_or(&body[i + 1..]);
            if escape.len() < 2 || !escape.iter().all(u8::is_ascii_hexdigit) {
                let end = (i + 3).min(body.len());
                return Err(FormError::InvalidEscape(
                    String::from_utf8_lossy(&body[i..end]).into_owned(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileSlot {
    Ready(UploadedFile),
    Claimed,
}

/// Outcome of looking up a file part by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLookup {
    /// The file part, handed out for the first time.
    Found(UploadedFile),
    /// A text field was sent under this name instead of a file.
    TextField,
    /// Nothing was sent under this name.
    Missing,
    /// The part was already handed out during this bind.
    AlreadyClaimed,
}

/// Parsed form fields and file parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    values: ParamValues,
    files: IndexMap<String, FileSlot>,
}

impl FormData {
    /// Creates form data from text values only.
    #[must_use]
    pub fn from_values(values: ParamValues) -> Self {
        Self {
            values,
            files: IndexMap::new(),
        }
    }

    /// Text fields.
    #[must_use]
    pub fn values(&self) -> &ParamValues {
        &self.values
    }

    /// Mutable text fields.
    pub fn values_mut(&mut self) -> &mut ParamValues {
        &mut self.values
    }

    /// Adds a file part. The first part sent under a name wins.
    pub fn insert_file(&mut self, file: UploadedFile) {
        self.files
            .entry(file.field_name().to_string())
            .or_insert(FileSlot::Ready(file));
    }

    /// Returns true if a file part was sent under `name`.
    #[must_use]
    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Hands out the file part sent under `name`.
    pub fn take_file(&mut self, name: &str) -> FileLookup {
        match self.files.get_mut(name) {
            Some(slot) => match std::mem::replace(slot, FileSlot::Claimed) {
                FileSlot::Ready(file) => FileLookup::Found(file),
                FileSlot::Claimed => FileLookup::AlreadyClaimed,
            },
            None if self.values.contains(name) => FileLookup::TextField,
            None => FileLookup::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_urlencoded_values() {
        let values = parse_urlencoded(b"name=the+name&note=a%20b&tags=1&tags=2").unwrap();

        assert_eq!(values.first("name"), Some("the name"));
        assert_eq!(values.first("note"), Some("a b"));
        assert_eq!(values.get_all("tags").unwrap(), ["1", "2"]);
    }

    #[test]
    fn test_escape_validation() {
        assert!(parse_urlencoded(b"a=%41%4a").is_ok());
        assert!(parse_urlencoded(b"").unwrap().is_empty());

        for bad in [&b"a=%3"[..], b"a=%", b"a=%zz", b"%g1=x"] {
            assert!(
                matches!(parse_urlencoded(bad), Err(FormError::InvalidEscape(_))),
                "{}",
                String::from_utf8_lossy(bad)
            );
        }
    }

    #[test]
    fn test_file_is_handed_out_once() {
        let mut form = FormData::default();
        form.insert_file(UploadedFile::new(
            "file",
            Some("a.txt".into()),
            None,
            Bytes::from_static(b"data"),
        ));

        assert!(matches!(form.take_file("file"), FileLookup::Found(_)));
        assert_eq!(form.take_file("file"), FileLookup::AlreadyClaimed);
        assert!(form.has_file("file"));
    }

    #[test]
    fn test_file_lookup_misses() {
        let mut form = FormData::from_values([("name", "x")].into_iter().collect());

        assert_eq!(form.take_file("name"), FileLookup::TextField);
        assert_eq!(form.take_file("file"), FileLookup::Missing);
    }

    #[test]
    fn test_first_file_part_wins() {
        let mut form = FormData::default();
        form.insert_file(UploadedFile::new("f", Some("1".into()), None, Bytes::new()));
        form.insert_file(UploadedFile::new("f", Some("2".into()), None, Bytes::new()));

        match form.take_file("f") {
            FileLookup::Found(file) => assert_eq!(file.file_name(), Some("1")),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }
}
