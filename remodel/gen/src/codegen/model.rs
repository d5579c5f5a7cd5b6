//! Model module generation.
//!
//! Emits one item per [`ModelClassRecord`], ordered by canonical name:
//!
//! - `Struct` records become a serde struct with fields ordered by property name
//! - `Alias` records become `pub type`
//! - `Union` records become a `#[serde(untagged)]` enum
//!
//! Every item carries the schema marker so a later run can recover renames.

use std::collections::{BTreeMap, BTreeSet};

use proc_macro2::TokenStream;
use quote::quote;

use super::{ModuleContext, doc_lines, ident, inner_doc_lines, rust_type};
use crate::errors::RemodelError;
use crate::merge::{NameTable, marker_doc};
use crate::naming::{snake_ident, unique_name};
use crate::synth::{FieldRecord, ModelClassRecord, ModelKind, TypeRef};

const ADDITIONAL_PROPERTIES: &str = "additional_properties";

/// Generates the complete model module.
pub fn generate_model_module(
    models: &BTreeMap<String, ModelClassRecord>,
    names: &NameTable,
    context: &ModuleContext,
) -> Result<TokenStream, RemodelError> {
    let header = inner_doc_lines(&format!(
        "Models for the {} ({}).\n\n\
         Type names may be changed by hand. The `openapi-schema` line on each type\n\
         records the schema it was generated from; keep it when renaming.",
        context.title, context.api
    ));

    let items = models
        .values()
        .map(|model| generate_model(model, models, names, &context.api))
        .collect::<Result<Vec<_>, _>>()?;

    let imports = if models.is_empty() {
        quote! {}
    } else {
        quote! { use serde::{Deserialize, Serialize}; }
    };

    Ok(quote! {
        #header

        #imports

        #(#items)*
    })
}

/// Generates a single model item.
pub fn generate_model(
    model: &ModelClassRecord,
    models: &BTreeMap<String, ModelClassRecord>,
    names: &NameTable,
    api: &str,
) -> Result<TokenStream, RemodelError> {
    let name = ident(names.require(api, &model.canonical_name)?);
    let docs = model_docs(model);

    match &model.kind {
        ModelKind::Struct { fields, additional } => {
            let mut taken = BTreeSet::new();
            if additional.is_some() {
                taken.insert(ADDITIONAL_PROPERTIES.to_string());
            }
            let fields = fields
                .iter()
                .map(|field| generate_field(field, model, models, names, api, &mut taken))
                .collect::<Result<Vec<_>, _>>()?;
            let additional = match additional {
                Some(ty) => {
                    let value = rust_type(api, ty, names, None)?;
                    let field = ident(ADDITIONAL_PROPERTIES);
                    quote! {
                        /// Properties not declared by the schema.
                        #[serde(flatten)]
                        pub #field: std::collections::BTreeMap<String, #value>,
                    }
                }
                None => quote! {},
            };

            Ok(quote! {
                #docs
                #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
                pub struct #name {
                    #(#fields)*
                    #additional
                }
            })
        }
        ModelKind::Alias(ty) => {
            let target = rust_type(api, ty, names, None)?;
            Ok(quote! {
                #docs
                pub type #name = #target;
            })
        }
        ModelKind::Union(members) => {
            let mut taken = BTreeSet::new();
            let variants = members
                .iter()
                .map(|member| {
                    let variant = ident(&unique_name(&variant_name(member, names), "", &mut taken));
                    let boxed = boxed_target(member, model, models);
                    let ty = rust_type(api, member, names, boxed)?;
                    Ok(quote! { #variant(#ty), })
                })
                .collect::<Result<Vec<_>, RemodelError>>()?;

            Ok(quote! {
                #docs
                #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
                #[serde(untagged)]
                pub enum #name {
                    #(#variants)*
                }
            })
        }
    }
}

fn model_docs(model: &ModelClassRecord) -> TokenStream {
    let marker = marker_doc(&model.canonical_name);
    match model.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => {
            let description = doc_lines(description);
            quote! {
                #description
                #[doc = ""]
                #marker
            }
        }
        _ => marker,
    }
}

fn generate_field(
    field: &FieldRecord,
    model: &ModelClassRecord,
    models: &BTreeMap<String, ModelClassRecord>,
    names: &NameTable,
    api: &str,
    taken: &mut BTreeSet<String>,
) -> Result<TokenStream, RemodelError> {
    let field_name = unique_name(&snake_ident(&field.name), "_", taken);
    let field_ident = ident(&field_name);

    let ty = if field.required {
        field.ty.clone()
    } else {
        field.ty.clone().optional()
    };
    let boxed = boxed_target(&ty, model, models);
    let rendered = rust_type(api, &ty, names, boxed)?;

    let docs = field
        .description
        .as_deref()
        .map(doc_lines)
        .unwrap_or_default();
    let rename = if field_name == field.name {
        quote! {}
    } else {
        let wire = &field.name;
        quote! { #[serde(rename = #wire)] }
    };
    let optional = if matches!(ty, TypeRef::Optional(_)) {
        quote! { #[serde(default, skip_serializing_if = "Option::is_none")] }
    } else {
        quote! {}
    };

    Ok(quote! {
        #docs
        #rename
        #optional
        pub #field_ident: #rendered,
    })
}

/// Variant name for a union member.
fn variant_name(member: &TypeRef, names: &NameTable) -> String {
    match member {
        TypeRef::String => "String".to_string(),
        TypeRef::Integer(_) => "Integer".to_string(),
        TypeRef::Number => "Number".to_string(),
        TypeRef::Boolean => "Boolean".to_string(),
        TypeRef::Any => "Value".to_string(),
        TypeRef::Sequence(_) => "Array".to_string(),
        TypeRef::Mapping(_) => "Map".to_string(),
        TypeRef::Optional(inner) => variant_name(inner, names),
        TypeRef::Model(canonical) => names.get(canonical).unwrap_or("Model").to_string(),
    }
}

/// Returns the model `ty` refers to directly if holding it inline would make
/// `model` infinitely sized.
fn boxed_target<'a>(
    ty: &'a TypeRef,
    model: &ModelClassRecord,
    models: &BTreeMap<String, ModelClassRecord>,
) -> Option<&'a str> {
    let target = ty.direct_model()?;
    reaches_directly(target, &model.canonical_name, models).then_some(target)
}

/// Whether `to` can be reached from `from` through fields held by value.
fn reaches_directly(from: &str, to: &str, models: &BTreeMap<String, ModelClassRecord>) -> bool {
    let mut stack = vec![from];
    let mut seen = BTreeSet::new();
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current) {
            continue;
        }
        let Some(model) = models.get(current) else {
            continue;
        };
        match &model.kind {
            ModelKind::Struct { fields, .. } => {
                stack.extend(fields.iter().filter_map(|field| field.ty.direct_model()));
            }
            ModelKind::Alias(ty) => stack.extend(ty.direct_model()),
            ModelKind::Union(members) => {
                stack.extend(members.iter().filter_map(TypeRef::direct_model));
            }
        }
    }
    false
}
