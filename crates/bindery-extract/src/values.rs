//! Multi-valued name/value storage shared by the query and form sources.

use indexmap::IndexMap;

/// Ordered multimap from a field name to every value sent under it.
///
/// # Example
///
/// ```rust
/// use bindery_extract::ParamValues;
///
/// let values: ParamValues = [("tags", "a"), ("id", "1"), ("tags", "b")]
///     .into_iter()
///     .collect();
///
/// assert_eq!(values.first("tags"), Some("a"));
/// assert_eq!(values.get_all("tags").unwrap(), ["a", "b"]);
/// assert_eq!(values.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamValues {
    entries: IndexMap<String, Vec<String>>,
}

impl ParamValues {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value under `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Every value sent under `name`, in arrival order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// The first value sent under `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns true if at least one value was sent under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates names with their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl<K, V> FromIterator<(K, V)> for ParamValues
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = Self::new();
        for (name, value) in iter {
            values.append(name, value);
        }
        values
    }
}
