//! Path template source.
//!
//! The router has already matched the URL, so a declared template variable
//! it did not supply means the descriptors and the route disagree.

use bindery_core::{BindingError, Location, RouteParams};

/// Reads the value the router matched for a template variable.
///
/// # Errors
///
/// Returns a configuration error if a required variable was not supplied.
pub fn value<'a>(
    params: &'a RouteParams,
    name: &str,
    required: bool,
) -> Result<Option<&'a str>, BindingError> {
    match params.get(name) {
        Some(value) => Ok(Some(value)),
        None if required => Err(BindingError::configuration(
            Location::Path,
            name,
            "route does not define this template variable",
        )),
        None => Ok(None),
    }
}
