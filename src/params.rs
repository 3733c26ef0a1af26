//! Path and query parameters of a parsed reference.
//!
//! - [`RouteParams`]: named values captured from the path (`courseId`,
//!   `assignmentId`, …). Ordered by capture position, so the context id
//!   always comes first.
//! - [`QueryParams`]: decoded query string (`module_item_id`, `verifier`,
//!   `download_frd`, …). Supports repeated keys.
//!
//! # Example
//!
//! ```
//! use canvas_navigator::{QueryParams, RouteParams};
//!
//! let mut params = RouteParams::new();
//! params.insert("courseId", "42");
//! params.insert("assignmentId", "7");
//! assert_eq!(params.get_as::<u64>("courseId"), Some(42));
//! assert_eq!(params.keys().collect::<Vec<_>>(), ["courseId", "assignmentId"]);
//!
//! let query = QueryParams::from_query_string("module_item_id=9&verifier=abc");
//! assert_eq!(query.get_as::<u64>("module_item_id"), Some(9));
//! ```

use std::collections::BTreeMap;
use url::form_urlencoded;

/// Ordered path parameters.
///
/// Re-inserting an existing key overwrites its value in place and keeps the
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RouteParams {
    params: Vec<(String, String)>,
}

impl RouteParams {
    /// Create empty route parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get a parameter and parse it as a specific type
    ///
    /// Returns `None` if the parameter doesn't exist or cannot be parsed.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Insert or overwrite a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.params.push((key, value));
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.iter().any(|(k, _)| k == key)
    }

    /// Iterate keys in capture order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over all `(key, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Merge two parameter sets; `overrides` wins on collision.
    ///
    /// # Example
    ///
    /// ```
    /// use canvas_navigator::RouteParams;
    ///
    /// let base = RouteParams::new().with("courseId", "1").with("view", "list");
    /// let extra = RouteParams::new().with("view", "grid").with("fileId", "3");
    /// let merged = RouteParams::merge(&base, &extra);
    /// assert_eq!(merged.get("view"), Some("grid"));
    /// assert_eq!(merged.len(), 3);
    /// ```
    pub fn merge(base: &RouteParams, overrides: &RouteParams) -> RouteParams {
        let mut merged = base.clone();
        for (key, value) in overrides.iter() {
            merged.insert(key, value);
        }
        merged
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = RouteParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Decoded query parameters.
///
/// Keys are kept sorted so [`to_query_string`](Self::to_query_string) is
/// deterministic.
///
/// # Example
///
/// ```
/// use canvas_navigator::QueryParams;
///
/// let query = QueryParams::from_query_string("tag=a&tag=b&name=hello%20world");
/// assert_eq!(query.get("name"), Some("hello world"));
/// assert_eq!(query.get_all("tag").map(<[String]>::len), Some(2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryParams {
    params: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    /// Create empty query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a raw (still percent-encoded) query string, with or without
    /// the leading `?`.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(form_urlencoded::parse(query.as_bytes()))
    }

    /// Build from already decoded pairs, e.g. [`url::Url::query_pairs`].
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            if key.is_empty() {
                continue;
            }
            query.insert(key, value.as_ref());
        }
        query
    }

    /// Get the first value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)?.first().map(String::as_str)
    }

    /// Get all values for a key.
    pub fn get_all(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Get the first value for a key, parsed as type `T`.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr,
    {
        self.get(key)?.parse().ok()
    }

    /// Interpret a flag value (`1`, `true`, `yes`).
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| {
            matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        })
    }

    /// Append a value for the given key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Return `true` if the given key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Serialize back into an encoded query string (no leading `?`).
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.params {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    /// Return `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Return the number of unique parameter keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_params_keep_capture_order() {
        let mut params = RouteParams::new();
        params.insert("groupId", "5");
        params.insert("topicId", "9");
        params.insert("groupId", "6");

        assert_eq!(params.keys().collect::<Vec<_>>(), vec!["groupId", "topicId"]);
        assert_eq!(params.get("groupId"), Some("6"));
    }

    #[test]
    fn test_route_params_get_as() {
        let params = RouteParams::new()
            .with("courseId", "123")
            .with("pageId", "front-page");

        assert_eq!(params.get_as::<u64>("courseId"), Some(123));
        assert_eq!(params.get_as::<u64>("pageId"), None);
        assert_eq!(params.get_as::<u64>("missing"), None);
    }

    #[test]
    fn test_query_params_decoding() {
        let query =
            QueryParams::from_query_string("?url=https%3A%2F%2Ftool.example%2Flaunch&x=a+b");
        assert_eq!(query.get("url"), Some("https://tool.example/launch"));
        assert_eq!(query.get("x"), Some("a b"));
    }

    #[test]
    fn test_query_params_flags() {
        let query = QueryParams::from_query_string("download_frd=1&preview=0&wrap=TRUE");
        assert!(query.flag("download_frd"));
        assert!(!query.flag("preview"));
        assert!(query.flag("wrap"));
        assert!(!query.flag("missing"));
    }

    #[test]
    fn test_query_params_multiple_values() {
        let query = QueryParams::from_query_string("include=a&include=b");
        assert_eq!(
            query.get_all("include"),
            Some(&["a".to_string(), "b".to_string()][..])
        );
        assert_eq!(query.get("include"), Some("a"));
    }

    #[test]
    fn test_to_query_string_is_sorted() {
        let mut query = QueryParams::new();
        query.insert("verifier", "x y");
        query.insert("download_frd", "1");
        assert_eq!(query.to_query_string(), "download_frd=1&verifier=x+y");
    }

    #[test]
    fn test_empty_query_string() {
        assert!(QueryParams::from_query_string("").is_empty());
        assert!(QueryParams::from_query_string("?").is_empty());
    }
}
