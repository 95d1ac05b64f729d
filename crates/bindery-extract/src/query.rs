//! Query string source.
//!
//! The query string is decoded once per bind with `serde_urlencoded`
//! (percent-decoding, `+` as space) into a [`ParamValues`] multimap.

use crate::ParamValues;
use bindery_core::CollectionFormat;

/// Error returned when a query string cannot be decoded.
pub type QueryError = serde_urlencoded::de::Error;

/// Decodes a raw query string. A missing query yields an empty set.
///
/// # Errors
///
/// Returns [`QueryError`] if the query string cannot be decoded.
pub fn parse_query(query: Option<&str>) -> Result<ParamValues, QueryError> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(ParamValues::new());
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)?;
    Ok(pairs.into_iter().collect())
}

/// Raw fragments for a query parameter.
///
/// `multi` keeps every occurrence; all other formats take the first one and
/// leave item splitting to the collection splitter.
#[must_use]
pub fn fragments(
    values: &ParamValues,
    name: &str,
    format: Option<CollectionFormat>,
) -> Option<Vec<String>> {
    let all = values.get_all(name)?;
    match format {
        Some(CollectionFormat::Multi) => Some(all.to_vec()),
        _ => all.first().map(|first| vec![first.clone()]),
    }
}
