//! Identifier derivation for generated types, fields and methods.
//!
//! OpenAPI names are arbitrary strings (`show-reference-ids`, `@type`,
//! `200JsonOrCsvQueryOk`). These helpers turn them into valid Rust
//! identifiers with `convert_case` and resolve collisions with numeric
//! suffixes.

use std::collections::BTreeSet;

use convert_case::{Case, Casing};

/// Strict and reserved keywords that cannot be used as plain identifiers.
const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Type names generated code relies on; a model must not shadow them.
const RESERVED_TYPE_NAMES: &[&str] = &[
    "Self",
    "Box",
    "Client",
    "ClientError",
    "ClientOptions",
    "Deserialize",
    "Err",
    "None",
    "Ok",
    "Option",
    "RequestSpec",
    "Result",
    "Serialize",
    "Some",
    "String",
    "Transport",
    "Vec",
];

/// Fallback for names with no usable characters.
const EMPTY_TYPE_NAME: &str = "Model";
const EMPTY_FIELD_NAME: &str = "field";

/// Returns `true` if `word` is a Rust keyword.
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Replaces every character that cannot appear in an identifier with a space,
/// which `convert_case` treats as a word boundary.
fn word_chars(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect()
}

/// Converts free-form words into an `UpperCamelCase` type name.
///
/// Leading characters that cannot start an identifier are dropped.
///
/// ## Examples
///
/// ```
/// use remodel_gen::naming::type_name;
///
/// assert_eq!(type_name(&["datastoreQuery", "resources", "Item"]), "DatastoreQueryResourcesItem");
/// assert_eq!(type_name(&["200JsonOrCsvQueryOk", "Response"]), "JsonOrCsvQueryOkResponse");
/// assert_eq!(type_name(&["Result"]), "ResultModel");
/// ```
pub fn type_name<S: AsRef<str>>(words: &[S]) -> String {
    let joined = words
        .iter()
        .map(|word| word_chars(word.as_ref()))
        .collect::<Vec<_>>()
        .join(" ");
    let pascal = joined
        .trim_start_matches(|c: char| !c.is_ascii_alphabetic())
        .to_case(Case::Pascal);
    let trimmed = pascal.trim_start_matches(|c: char| !c.is_ascii_alphabetic());
    if trimmed.is_empty() {
        EMPTY_TYPE_NAME.to_string()
    } else if RESERVED_TYPE_NAMES.contains(&trimmed) {
        format!("{trimmed}Model")
    } else {
        trimmed.to_string()
    }
}

/// Converts a property, parameter or path name into a `snake_case` identifier.
///
/// Keywords get a trailing underscore and names starting with a digit get an
/// `n` prefix.
///
/// ## Examples
///
/// ```
/// use remodel_gen::naming::snake_ident;
///
/// assert_eq!(snake_ident("show-reference-ids"), "show_reference_ids");
/// assert_eq!(snake_ident("accessLevel"), "access_level");
/// assert_eq!(snake_ident("@type"), "type_");
/// ```
pub fn snake_ident(raw: &str) -> String {
    let snake = word_chars(raw).to_case(Case::Snake);
    let snake = snake.trim_matches('_');
    if snake.is_empty() {
        EMPTY_FIELD_NAME.to_string()
    } else if snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("n{snake}")
    } else if is_keyword(snake) {
        format!("{snake}_")
    } else {
        snake.to_string()
    }
}

/// Returns `base`, or `base` with the smallest numeric suffix (starting at 2)
/// not yet in `taken`, and records the result.
///
/// ```
/// use std::collections::BTreeSet;
/// use remodel_gen::naming::unique_name;
///
/// let mut taken = BTreeSet::new();
/// assert_eq!(unique_name("Widget", "", &mut taken), "Widget");
/// assert_eq!(unique_name("Widget", "", &mut taken), "Widget2");
/// assert_eq!(unique_name("widget", "_", &mut taken), "widget");
/// ```
pub fn unique_name(base: &str, separator: &str, taken: &mut BTreeSet<String>) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    let mut suffix = 2usize;
    loop {
        let candidate = format!("{base}{separator}{suffix}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Strips a raw identifier prefix (`r#type` → `type`).
pub fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}
