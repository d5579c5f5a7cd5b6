//! JSON pointer helpers for patching raw OpenAPI documents.
//!
//! Document fixes address their targets with RFC 6901 pointers. These helpers
//! resolve a pointer to a mutable node and report a [`DefineError::FixFailed`]
//! naming the pointer when the node is missing or has the wrong shape.

use serde_json::{Map, Value};

use crate::DefineError;

/// Escapes a single reference token (`~` → `~0`, `/` → `~1`).
///
/// ## Examples
///
/// ```
/// use remodel_define::pointer::escape;
///
/// assert_eq!(escape("/search/facets"), "~1search~1facets");
/// assert_eq!(escape("a~b"), "a~0b");
/// ```
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape`].
pub fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Joins already-unescaped tokens into a pointer.
///
/// ```
/// use remodel_define::pointer::join;
///
/// assert_eq!(join(&["paths", "/search", "get"]), "/paths/~1search/get");
/// ```
pub fn join<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|token| format!("/{}", escape(token.as_ref())))
        .collect()
}

/// Splits a pointer into unescaped tokens. A leading `#` is accepted.
pub fn split(pointer: &str) -> Vec<String> {
    let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .trim_start_matches('/')
        .split('/')
        .map(unescape)
        .collect()
}

/// Resolves `pointer` to a mutable node.
pub fn resolve_mut<'a>(document: &'a mut Value, pointer: &str) -> Result<&'a mut Value, DefineError> {
    document
        .pointer_mut(pointer)
        .ok_or_else(|| DefineError::fix(pointer, "no such node"))
}

/// Resolves `pointer` to a mutable JSON object.
pub fn object_mut<'a>(
    document: &'a mut Value,
    pointer: &str,
) -> Result<&'a mut Map<String, Value>, DefineError> {
    resolve_mut(document, pointer)?
        .as_object_mut()
        .ok_or_else(|| DefineError::fix(pointer, "expected an object"))
}

/// Resolves `pointer` to a mutable JSON array.
pub fn array_mut<'a>(document: &'a mut Value, pointer: &str) -> Result<&'a mut Vec<Value>, DefineError> {
    resolve_mut(document, pointer)?
        .as_array_mut()
        .ok_or_else(|| DefineError::fix(pointer, "expected an array"))
}

/// Returns a clone of the node at `pointer`.
pub fn cloned(document: &Value, pointer: &str) -> Result<Value, DefineError> {
    document
        .pointer(pointer)
        .cloned()
        .ok_or_else(|| DefineError::fix(pointer, "no such node"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_and_join_are_inverse() {
        let tokens = split("#/paths/~1datastore~1query/get/parameters");
        assert_eq!(tokens, vec!["paths", "/datastore/query", "get", "parameters"]);
        assert_eq!(join(&tokens), "/paths/~1datastore~1query/get/parameters");
    }

    #[test]
    fn split_of_root_is_empty() {
        assert!(split("#").is_empty());
        assert!(split("").is_empty());
    }

    #[test]
    fn missing_node_names_the_pointer() {
        let mut doc = json!({"paths": {}});
        let err = resolve_mut(&mut doc, "/paths/~1missing").unwrap_err();
        assert!(err.to_string().contains("/paths/~1missing"));
    }

    #[test]
    fn object_mut_rejects_arrays() {
        let mut doc = json!({"servers": []});
        let err = object_mut(&mut doc, "/servers").unwrap_err();
        assert!(err.to_string().contains("expected an object"));
        assert!(array_mut(&mut doc, "/servers").is_ok());
    }
}
