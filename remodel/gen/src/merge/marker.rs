//! Schema markers and rename recovery.
//!
//! Every generated type carries a doc line naming the schema it was generated
//! from:
//!
//! ```text
//! /// openapi-schema: "#/components/schemas/datastoreQuery/properties/sorts"
//! pub struct DatastoreQuerySorts { .. }
//! ```
//!
//! Contributors may rename the type. On the next run the marker is read back
//! through `syn`, which yields the canonical name together with whatever the
//! type is now called.

use std::collections::BTreeMap;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Expr, Item, Lit, Meta};

use crate::errors::RemodelError;

/// Prefix of the marker doc line.
pub const SCHEMA_MARKER: &str = "openapi-schema:";

/// Renders the marker doc attribute for `canonical`.
///
/// The canonical name is written as a JSON string so any character survives.
pub fn marker_doc(canonical: &str) -> TokenStream {
    let quoted = serde_json::Value::String(canonical.to_string()).to_string();
    let line = format!(" {SCHEMA_MARKER} {quoted}");
    quote! { #[doc = #line] }
}

/// Extracts the canonical name from one doc attribute, if it is a marker.
fn marker_value(api: &str, attr: &Attribute) -> Result<Option<String>, RemodelError> {
    if !attr.path().is_ident("doc") {
        return Ok(None);
    }
    let Meta::NameValue(meta) = &attr.meta else {
        return Ok(None);
    };
    let Expr::Lit(expr) = &meta.value else {
        return Ok(None);
    };
    let Lit::Str(text) = &expr.lit else {
        return Ok(None);
    };
    let text = text.value();
    let Some(quoted) = text.trim().strip_prefix(SCHEMA_MARKER) else {
        return Ok(None);
    };
    serde_json::from_str::<String>(quoted.trim())
        .map(Some)
        .map_err(|e| {
            RemodelError::consistency(api, format!("malformed schema marker `{}`: {e}", text.trim()))
        })
}

/// Canonical name recorded on a type, if any.
fn item_marker(api: &str, attrs: &[Attribute]) -> Result<Option<String>, RemodelError> {
    let mut found = None;
    for attr in attrs {
        if let Some(canonical) = marker_value(api, attr)? {
            if found.is_some() {
                return Err(RemodelError::consistency(
                    api,
                    format!("type carries more than one schema marker (second: {canonical})"),
                ));
            }
            found = Some(canonical);
        }
    }
    Ok(found)
}

/// Canonical name → current type name, recovered from a model module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    entries: BTreeMap<String, String>,
}

impl RenameMap {
    /// Reads the markers of every top-level struct, enum and type alias.
    ///
    /// Types without a marker are ignored.
    ///
    /// ## Errors
    ///
    /// [`RemodelError::MergeConsistency`] if the module does not parse, a
    /// marker is malformed, or one canonical name is claimed by two types.
    pub fn from_source(api: &str, source: &str) -> Result<Self, RemodelError> {
        let file = syn::parse_file(source).map_err(|e| {
            RemodelError::consistency(api, format!("previous model module does not parse: {e}"))
        })?;
        Self::from_file(api, &file)
    }

    /// Same as [`RenameMap::from_source`] for an already parsed file.
    pub fn from_file(api: &str, file: &syn::File) -> Result<Self, RemodelError> {
        let mut entries: BTreeMap<String, String> = BTreeMap::new();
        for item in &file.items {
            let (attrs, ident) = match item {
                Item::Struct(item) => (&item.attrs, &item.ident),
                Item::Enum(item) => (&item.attrs, &item.ident),
                Item::Type(item) => (&item.attrs, &item.ident),
                _ => continue,
            };
            let Some(canonical) = item_marker(api, attrs)? else {
                continue;
            };
            let name = ident.to_string();
            if let Some(first) = entries.get(&canonical) {
                return Err(RemodelError::consistency(
                    api,
                    format!("schema {canonical} is claimed by both `{first}` and `{name}`"),
                ));
            }
            entries.insert(canonical, name);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, canonical: &str) -> Option<&str> {
        self.entries.get(canonical).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for RenameMap {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "widgets/v1";

    fn module_with(items: TokenStream) -> String {
        let file: syn::File = syn::parse2(items).unwrap();
        prettyplease::unparse(&file)
    }

    #[test]
    fn marker_survives_formatting() {
        let marker = marker_doc("#/paths/~1search/get/responses/200/content/application~1json/schema");
        let source = module_with(quote! {
            #marker
            pub struct SearchGetResponse {}
        });
        assert!(source.contains(
            r##"/// openapi-schema: "#/paths/~1search/get/responses/200/content/application~1json/schema""##
        ));

        let map = RenameMap::from_source(API, &source).unwrap();
        assert_eq!(
            map.get("#/paths/~1search/get/responses/200/content/application~1json/schema"),
            Some("SearchGetResponse")
        );
    }

    #[test]
    fn reads_renamed_types_of_every_kind() {
        let widget = marker_doc("Widget");
        let labels = marker_doc("Labels");
        let value = marker_doc("Value");
        let source = module_with(quote! {
            /// A widget.
            ///
            #widget
            pub struct Gadget { pub id: String }
            #labels
            pub type Tags = Vec<String>;
            #value
            #[serde(untagged)]
            pub enum Scalar { String(String), Integer(i64) }
            pub struct Unmarked;
        });

        let map = RenameMap::from_source(API, &source).unwrap();
        let entries: Vec<_> = map.iter().collect();
        assert_eq!(
            entries,
            vec![("Labels", "Tags"), ("Value", "Scalar"), ("Widget", "Gadget")]
        );
    }

    #[test]
    fn quoted_names_round_trip() {
        let marker = marker_doc("odd \"name\" with \\ slash");
        let source = module_with(quote! { #marker pub struct Odd; });
        let map = RenameMap::from_source(API, &source).unwrap();
        assert_eq!(map.get("odd \"name\" with \\ slash"), Some("Odd"));
    }

    #[test]
    fn duplicate_canonical_is_inconsistent() {
        let first = marker_doc("Widget");
        let second = marker_doc("Widget");
        let source = module_with(quote! {
            #first pub struct Gadget;
            #second pub struct Gizmo;
        });
        let err = RenameMap::from_source(API, &source).unwrap_err();
        assert!(matches!(err, RemodelError::MergeConsistency { .. }));
        assert!(err.to_string().contains("`Gadget` and `Gizmo`"), "{err}");
    }

    #[test]
    fn unparsable_module_is_inconsistent() {
        let err = RenameMap::from_source(API, "pub struct {").unwrap_err();
        assert!(err.to_string().contains("does not parse"), "{err}");
    }

    #[test]
    fn malformed_marker_is_inconsistent() {
        let source = "/// openapi-schema: Widget\npub struct Widget;\n";
        let err = RenameMap::from_source(API, source).unwrap_err();
        assert!(err.to_string().contains("malformed schema marker"), "{err}");
    }
}
