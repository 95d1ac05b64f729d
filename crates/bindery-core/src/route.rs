//! Route parameters handed over by the router.
//!
//! The binder never matches URL templates itself. Whatever router sits in
//! front of it produces an ordered list of (template name, value) pairs.

use smallvec::SmallVec;

/// Number of pairs stored inline before spilling to the heap.
const INLINE_PARAMS: usize = 4;

/// Ordered mapping from path template name to the matched segment value.
///
/// # Example
///
/// ```rust
/// use bindery_core::RouteParams;
///
/// let params: RouteParams = [("id", "1"), ("slug", "hello")].into_iter().collect();
///
/// assert_eq!(params.get("id"), Some("1"));
/// assert_eq!(params.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteParams {
    pairs: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl RouteParams {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair. Earlier pairs win on lookup.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Returns the value of the first pair with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if no pairs were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterates the pairs in router order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RouteParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
