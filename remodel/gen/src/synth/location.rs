//! Schema locations.
//!
//! A location is the list of JSON pointer tokens leading to a schema in the
//! document. It gives every schema a stable canonical name and a default
//! type name, and both are pure functions of the tokens.

use remodel_define::pointer;

use crate::naming::type_name;

/// Position of a schema inside an OpenAPI document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaLocation {
    tokens: Vec<String>,
}

impl SchemaLocation {
    /// `#/components/schemas/<name>`.
    pub fn component(name: &str) -> Self {
        Self::from_tokens(["components", "schemas", name])
    }

    /// Builds a location from unescaped tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a local `$ref` (`#/...`). Returns `None` for references to
    /// other documents.
    pub fn from_reference(reference: &str) -> Option<Self> {
        reference.starts_with("#/").then(|| Self {
            tokens: pointer::split(reference),
        })
    }

    /// Returns a new location one token deeper.
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }

    /// Name of the component schema, if this location is one.
    pub fn component_name(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [components, schemas, name] if components == "components" && schemas == "schemas" => {
                Some(name)
            }
            _ => None,
        }
    }

    /// JSON pointer without the leading `#`, for `serde_json::Value::pointer`.
    pub fn json_pointer(&self) -> String {
        pointer::join(&self.tokens)
    }

    /// The canonical name: the bare component name, or `#`-prefixed pointer.
    pub fn canonical_name(&self) -> String {
        match self.component_name() {
            Some(name) => name.to_string(),
            None => format!("#{}", self.json_pointer()),
        }
    }

    /// Default type name for a schema at this location.
    ///
    /// Containers contribute nothing; names contribute themselves; `items`,
    /// `additionalProperties` and union members contribute `Item`, `Value`
    /// and `Variant<N>`; request bodies and responses contribute `Request`
    /// and `Response`.
    pub fn default_type_name(&self) -> String {
        let mut words: Vec<String> = Vec::new();
        let mut tokens = self.tokens.iter().map(String::as_str);

        while let Some(token) = tokens.next() {
            match token {
                "components" => {
                    let kind = tokens.next();
                    if let Some(name) = tokens.next() {
                        words.push(name.to_string());
                    }
                    match kind {
                        Some("responses") => words.push("Response".into()),
                        Some("requestBodies") => words.push("Request".into()),
                        Some("parameters") => words.push("Parameter".into()),
                        _ => {}
                    }
                }
                "paths" => {
                    if let Some(path) = tokens.next() {
                        words.extend(crate::parser::path_words(path).into_iter().map(String::from));
                    }
                    if let Some(method) = tokens.next() {
                        words.push(method.to_string());
                    }
                }
                "parameters" | "properties" => {
                    if let Some(name) = tokens.next() {
                        words.push(name.to_string());
                    }
                }
                "requestBody" => words.push("Request".into()),
                "responses" => {
                    tokens.next();
                    words.push("Response".into());
                }
                "content" => {
                    tokens.next();
                }
                "anyOf" | "oneOf" => {
                    let index = tokens.next().unwrap_or("0");
                    words.push(format!("Variant{index}"));
                }
                "allOf" => {
                    tokens.next();
                }
                "items" => words.push("Item".into()),
                "additionalProperties" => words.push("Value".into()),
                "schema" => {}
                other => words.push(other.to_string()),
            }
        }

        type_name(&words)
    }
}

impl std::fmt::Display for SchemaLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.json_pointer())
    }
}
