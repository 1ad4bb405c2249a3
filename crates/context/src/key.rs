//! Binding keys with optional property paths.

use std::fmt;

use serde_json::Value;

/// Separator between a binding key and its property path.
const PATH_SEPARATOR: char = '#';

/// A binding key, optionally qualified with a property path (`key#path`).
///
/// The path is applied to JSON values at lookup time. Two references that differ only in
/// their path refer to the same underlying binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    /// The raw key the value is bound under.
    pub key: String,
    /// Optional dot path (with `[n]` indices) into the bound value.
    pub path: Option<String>,
}

impl BindingKey {
    /// Create an unqualified key.
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), path: None }
    }

    /// Create a key qualified with a property path.
    pub fn with_path(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            path: Some(path.into()),
        }
    }

    /// Parse `key` or `key#path`. An empty path is treated as no path.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(PATH_SEPARATOR) {
            Some((key, path)) if !path.trim().is_empty() => Self::with_path(key.trim(), path.trim()),
            Some((key, _)) => Self::new(key.trim()),
            None => Self::new(raw.trim()),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}{PATH_SEPARATOR}{path}", self.key),
            None => f.write_str(&self.key),
        }
    }
}

impl From<&str> for BindingKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// Select a nested JSON value by a minimal dot path with optional numeric indices.
///
/// Supports segments like `a`, `a.b`, and array indices `a[0].b[1]`. Returns `None`
/// when any segment is missing, malformed, or applied to the wrong JSON type.
pub fn select_path(value: &Value, path: &str) -> Option<Value> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Some(value.clone());
    }

    let mut current = value;
    for segment in trimmed.split('.') {
        if segment.is_empty() {
            continue;
        }
        let (key, indices) = split_indices(segment)?;
        if !key.is_empty() {
            current = current.get(key)?;
        }
        for index in indices {
            current = current.get(index)?;
        }
    }
    Some(current.clone())
}

/// Split `items[0][2]` into its key and indices. `None` when a bracket is unterminated, empty,
/// non-numeric, or followed by anything other than another bracket.
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    let (key, mut rest) = match segment.find('[') {
        Some(open) => segment.split_at(open),
        None => return Some((segment, Vec::new())),
    };

    let mut indices = Vec::new();
    while let Some(bracketed) = rest.strip_prefix('[') {
        let (index, tail) = bracketed.split_once(']')?;
        indices.push(index.trim().parse::<usize>().ok()?);
        rest = tail;
    }
    rest.is_empty().then_some((key, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_and_qualified_keys() {
        assert_eq!(BindingKey::parse("tracingId"), BindingKey::new("tracingId"));
        assert_eq!(BindingKey::parse("request#headers.host"), BindingKey::with_path("request", "headers.host"));
        assert_eq!(BindingKey::parse("request#"), BindingKey::new("request"));
    }

    #[test]
    fn display_round_trips_the_qualifier() {
        assert_eq!(BindingKey::parse("request#body.items[1]").to_string(), "request#body.items[1]");
        assert_eq!(BindingKey::new("result").to_string(), "result");
    }

    #[test]
    fn select_path_walks_objects_and_arrays() {
        let value = json!({"body": {"items": [{"id": 1}, {"id": 2}]}});
        assert_eq!(select_path(&value, "body.items[1].id"), Some(json!(2)));
        assert_eq!(select_path(&value, ""), Some(value.clone()));
        assert_eq!(select_path(&value, "body.missing"), None);
        assert_eq!(select_path(&value, "body.items[5]"), None);
    }

    #[test]
    fn select_path_rejects_malformed_indices() {
        let value = json!({"items": [10, 20]});
        assert_eq!(select_path(&value, "items[1]"), Some(json!(20)));
        assert_eq!(select_path(&value, "items[x]"), None);
        assert_eq!(select_path(&value, "items[0"), None);
        assert_eq!(select_path(&value, "items[]"), None);
        assert_eq!(select_path(&value, "items[0]x"), None);
    }
}
