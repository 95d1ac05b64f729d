//! Collection-format splitting.
//!
//! Turns the raw fragments of an array parameter into item texts. Purely
//! textual; item coercion happens afterwards.

use bindery_core::CollectionFormat;

/// Splits raw fragments into items according to `format`.
///
/// `multi` passes the fragments through unchanged. Every other format splits
/// the first fragment on its separator. For every format, a single present
/// but empty fragment yields no items. Order and duplicates are preserved.
///
/// # Example
///
/// ```rust
/// use bindery_core::CollectionFormat;
/// use bindery_extract::split;
///
/// let items = split(vec!["a|b|a".into()], CollectionFormat::Pipes);
/// assert_eq!(items, ["a", "b", "a"]);
///
/// assert!(split(vec![String::new()], CollectionFormat::Csv).is_empty());
/// assert!(split(vec![String::new()], CollectionFormat::Multi).is_empty());
/// ```
#[must_use]
pub fn split(fragments: Vec<String>, format: CollectionFormat) -> Vec<String> {
    let Some(separator) = format.separator() else {
        return match fragments.as_slice() {
            [only] if only.is_empty() => Vec::new(),
            _ => fragments,
        };
    };
    match fragments.into_iter().next() {
        Some(fragment) if !fragment.is_empty() => {
            fragment.split(separator).map(str::to_string).collect()
        }
        _ => Vec::new(),
    }
}
