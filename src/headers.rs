//! Narrow header-lookup interface.
//!
//! The identifier resolver and the session cookie reader only need to read
//! request headers by name, so they take a `HeaderSource` rather than a
//! framework request type.

use std::collections::HashMap;

use axum::http::HeaderMap;

/// Anything that can answer "what is the value of header `name`?".
///
/// Header names are matched case-insensitively.
pub trait HeaderSource {
    /// Value of the first header called `name`, if present and valid text.
    fn header(&self, name: &str) -> Option<&str>;
}

impl HeaderSource for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|value| value.to_str().ok())
    }
}

impl HeaderSource for HashMap<String, String> {
    fn header(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.get(name) {
            return Some(value.as_str());
        }
        // Fall back to a case-insensitive scan; pick the smallest matching
        // key so the result does not depend on hash iteration order.
        self.iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, value)| value.as_str())
    }
}
