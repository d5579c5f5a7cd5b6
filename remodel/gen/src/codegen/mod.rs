//! Code emission.
//!
//! Each submodule turns synthesized records into a `TokenStream`. Type names
//! always come from the [`NameTable`], never from the records themselves.
//!
//! - [`model`]: one type per model record
//! - [`client`]: the `Client` struct with one method per operation
//! - [`shared`]: runtime used by every generated client
//! - [`module_tree`]: `lib.rs` and `mod.rs` files

pub mod client;
pub mod model;
pub mod module_tree;
pub mod shared;

use proc_macro2::{Ident, Span, TokenStream};
use quote::{format_ident, quote};

use crate::errors::RemodelError;
use crate::merge::NameTable;
use crate::naming::is_keyword;
use crate::synth::{IntegerWidth, TypeRef};

/// Static information about the version being emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleContext {
    /// Version label, e.g. `provider_data/v1`.
    pub api: String,
    pub title: String,
    pub description: Option<String>,
    /// Version of the API document (`info.version`).
    pub document_version: String,
    pub base_url: String,
    pub docs_url: Option<String>,
}

/// Builds an identifier, using the raw form for keywords.
pub(crate) fn ident(name: &str) -> Ident {
    if is_keyword(name) && !matches!(name, "self" | "super" | "crate" | "Self") {
        Ident::new_raw(name, Span::call_site())
    } else {
        format_ident!("{}", name)
    }
}

/// Renders free text as `#[doc]` attributes, one per line.
///
/// Bare code fences are marked as `text` so they are not compiled as doctests.
pub(crate) fn doc_lines(text: &str) -> TokenStream {
    let lines = text.trim().lines().map(|line| {
        let line = line.trim_end();
        let line = if line.trim_start() == "```" {
            line.replace("```", "```text")
        } else {
            line.to_string()
        };
        if line.is_empty() {
            String::new()
        } else {
            format!(" {line}")
        }
    });
    quote! { #( #[doc = #lines] )* }
}

/// Renders inner (`//!`) doc attributes.
pub(crate) fn inner_doc_lines(text: &str) -> TokenStream {
    let lines = text.lines().map(|line| {
        let line = line.trim_end();
        if line.is_empty() {
            String::new()
        } else {
            format!(" {line}")
        }
    });
    quote! { #( #![doc = #lines] )* }
}

/// Renders a [`TypeRef`] using current type names.
///
/// `boxed` names a model that must be boxed when it appears directly (not
/// inside a collection), which breaks recursive type definitions.
pub(crate) fn rust_type(
    api: &str,
    ty: &TypeRef,
    names: &NameTable,
    boxed: Option<&str>,
) -> Result<TokenStream, RemodelError> {
    Ok(match ty {
        TypeRef::String => quote! { String },
        TypeRef::Integer(IntegerWidth::I32) => quote! { i32 },
        TypeRef::Integer(IntegerWidth::I64) => quote! { i64 },
        TypeRef::Number => quote! { f64 },
        TypeRef::Boolean => quote! { bool },
        TypeRef::Any => quote! { serde_json::Value },
        TypeRef::Sequence(inner) => {
            let inner = rust_type(api, inner, names, None)?;
            quote! { Vec<#inner> }
        }
        TypeRef::Mapping(inner) => {
            let inner = rust_type(api, inner, names, None)?;
            quote! { std::collections::BTreeMap<String, #inner> }
        }
        TypeRef::Optional(inner) => {
            let inner = rust_type(api, inner, names, boxed)?;
            quote! { Option<#inner> }
        }
        TypeRef::Model(canonical) => {
            let name = ident(names.require(api, canonical)?);
            if boxed == Some(canonical.as_str()) {
                quote! { Box<#name> }
            } else {
                quote! { #name }
            }
        }
    })
}
