//! Path parameter extraction and storage.
//!
//! Captured path parameters are stored inline for the common case of
//! a handful per route, avoiding heap allocation on the hot path.

use smallvec::SmallVec;

/// Maximum number of parameters stored inline (stack allocated).
const INLINE_PARAMS: usize = 4;

/// Named captures extracted from a route match.
///
/// # Example
///
/// ```rust
/// use daedalus_router::Params;
///
/// let mut params = Params::new();
/// params.push("id", "41");
///
/// assert_eq!(params.get("id"), Some("41"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a captured parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut params = Params::new();
        params.push("id", "41");
        params.push("name", "rex");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("id"), Some("41"));
        assert_eq!(params.get("name"), Some("rex"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_iteration_preserves_order() {
        let mut params = Params::new();
        params.push("a", "1");
        params.push("b", "2");
        let collected: Vec<_> = params.iter().collect();
        assert_eq!(collected, vec![("a", "1"), ("b", "2")]);
    }
}
