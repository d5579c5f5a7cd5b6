//! Client module generation.
//!
//! Generates a `Client` struct wrapping the shared `Transport`, with one
//! async method per operation:
//!
//! ```ignore
//! pub async fn get_datastore_query_dataset_id_index(
//!     &self,
//!     dataset_id: &str,
//!     index: &str,
//!     limit: Option<i64>,
//! ) -> Result<DatastoreQueryResponse, ClientError> {
//!     let path = format!(
//!         "/datastore/query/{}/{}",
//!         encode_path_segment(dataset_id),
//!         encode_path_segment(index),
//!     );
//!     let mut request = RequestSpec::new(reqwest::Method::GET, path);
//!     if let Some(limit) = limit {
//!         request.query("limit", &limit)?;
//!     }
//!     self.transport.send_json(request).await
//! }
//! ```

use std::collections::BTreeSet;

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use super::{ModuleContext, doc_lines, ident, inner_doc_lines, rust_type};
use crate::errors::RemodelError;
use crate::merge::NameTable;
use crate::naming::{snake_ident, unique_name};
use crate::parser::format_template;
use crate::synth::{
    BodyRecord, HttpMethod, OperationRecord, ParameterLocation, ParameterRecord, QueryStyle,
    ResponseKind, TypeRef,
};

/// Name of the body argument when the body is not a model.
const DEFAULT_BODY_ARGUMENT: &str = "body";

/// Locals and receivers of a generated method; arguments must not shadow them.
const LOCAL_NAMES: &[&str] = &["path", "request", "self"];

/// Generates the complete client module.
pub fn generate_client_module(
    operations: &[OperationRecord],
    names: &NameTable,
    context: &ModuleContext,
) -> Result<TokenStream, RemodelError> {
    let mut header_text = format!("Client for the {} ({}).", context.title, context.api);
    if let Some(description) = context.description.as_deref().map(str::trim) {
        if !description.is_empty() {
            header_text.push_str("\n\n");
            header_text.push_str(description);
        }
    }
    header_text.push_str(&format!("\n\nDocument version: {}", context.document_version));
    if let Some(docs_url) = &context.docs_url {
        header_text.push_str(&format!("\n\nDocumentation: <{docs_url}>"));
    }
    let header = inner_doc_lines(&header_text);

    let imports = model_imports(operations, names, &context.api)?;
    let has_path_parameters = operations.iter().any(|operation| {
        operation
            .parameters
            .iter()
            .any(|parameter| parameter.location == ParameterLocation::Path)
    });
    let shared_imports = if has_path_parameters {
        quote! { use crate::shared::{ClientError, ClientOptions, RequestSpec, Transport, encode_path_segment}; }
    } else {
        quote! { use crate::shared::{ClientError, ClientOptions, RequestSpec, Transport}; }
    };
    let base_url = &context.base_url;
    let title = &context.title;
    let struct_doc = format!(" Client for the {title}.");

    let methods = operations
        .iter()
        .map(|operation| generate_method(operation, names, &context.api))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(quote! {
        #header

        #imports
        #shared_imports

        /// Base URL used unless [`ClientOptions::base_url`] overrides it.
        pub const BASE_URL: &str = #base_url;

        #[doc = #struct_doc]
        #[derive(Debug, Clone)]
        pub struct Client {
            transport: Transport,
        }

        impl Client {
            /// Creates a client with default options.
            ///
            /// ## Errors
            ///
            /// Returns an error if the HTTP client cannot be built.
            pub fn new() -> Result<Self, ClientError> {
                Self::with_options(ClientOptions::default())
            }

            /// Creates a client with the given options.
            ///
            /// ## Errors
            ///
            /// Returns an error if the HTTP client cannot be built.
            pub fn with_options(options: ClientOptions) -> Result<Self, ClientError> {
                Ok(Self {
                    transport: Transport::new(BASE_URL, options)?,
                })
            }

            /// Base URL requests are sent to.
            pub fn base_url(&self) -> &str {
                self.transport.base_url()
            }

            #(#methods)*
        }
    })
}

/// `use super::model::{..}` for every model an operation refers to.
fn model_imports(
    operations: &[OperationRecord],
    names: &NameTable,
    api: &str,
) -> Result<TokenStream, RemodelError> {
    let mut used = BTreeSet::new();
    for operation in operations {
        for canonical in operation.referenced_models() {
            used.insert(names.require(api, &canonical)?.to_string());
        }
    }
    if used.is_empty() {
        return Ok(quote! {});
    }
    let used = used.iter().map(|name| ident(name));
    Ok(quote! { use super::model::{ #(#used),* }; })
}

/// One argument of a generated method.
struct Argument {
    ident: proc_macro2::Ident,
    ty: TokenStream,
}

/// Splits a parameter type into (inner type, optional).
fn unwrap_optional(ty: &TypeRef, required: bool) -> (&TypeRef, bool) {
    match ty {
        TypeRef::Optional(inner) => (inner, true),
        other => (other, !required),
    }
}

/// Argument type for a parameter: strings by `&str`, other scalars by value,
/// everything else by reference.
fn argument_type(
    api: &str,
    ty: &TypeRef,
    optional: bool,
    names: &NameTable,
) -> Result<TokenStream, RemodelError> {
    let inner = match ty {
        TypeRef::String => quote! { &str },
        scalar if scalar.is_scalar() => rust_type(api, scalar, names, None)?,
        other => {
            let rendered = rust_type(api, other, names, None)?;
            quote! { &#rendered }
        }
    };
    Ok(if optional {
        quote! { Option<#inner> }
    } else {
        inner
    })
}

fn method_path(method: HttpMethod) -> TokenStream {
    let method = format_ident!("{}", method.to_string());
    quote! { reqwest::Method::#method }
}

fn parameter_call(parameter: &ParameterRecord, value: &proc_macro2::Ident) -> TokenStream {
    let wire = &parameter.name;
    match (parameter.location, parameter.style) {
        (ParameterLocation::Header, _) => quote! { request.header(#wire, &#value)?; },
        (_, QueryStyle::DeepObject) => quote! { request.deep_object_query(#wire, &#value)?; },
        _ => quote! { request.query(#wire, &#value)?; },
    }
}

fn method_docs(operation: &OperationRecord, arguments: &[(&str, Option<&str>)]) -> TokenStream {
    let mut text = String::new();
    if let Some(summary) = operation.summary.as_deref().map(str::trim) {
        text.push_str(summary);
    }
    if let Some(description) = operation.description.as_deref().map(str::trim) {
        if !description.is_empty() && Some(description) != operation.summary.as_deref().map(str::trim) {
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(description);
        }
    }
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str(&format!("`{}`", operation.canonical_id));

    let documented: Vec<_> = arguments
        .iter()
        .filter_map(|&(name, description)| {
            let first = description?.trim().lines().next()?.trim();
            (!first.is_empty()).then(|| format!("- `{name}`: {first}"))
        })
        .collect();
    if !documented.is_empty() {
        text.push_str("\n\n## Parameters\n\n");
        text.push_str(&documented.join("\n"));
    }
    doc_lines(&text)
}

/// Generates one client method.
pub fn generate_method(
    operation: &OperationRecord,
    names: &NameTable,
    api: &str,
) -> Result<TokenStream, RemodelError> {
    let method_name = ident(&operation.method_name);
    let mut taken: BTreeSet<String> = operation
        .parameters
        .iter()
        .map(|parameter| parameter.ident.clone())
        .chain(LOCAL_NAMES.iter().map(|name| name.to_string()))
        .collect();

    let (path_params, rest): (Vec<_>, Vec<_>) = operation
        .parameters
        .iter()
        .partition(|parameter| parameter.location == ParameterLocation::Path);
    let (required, optional): (Vec<_>, Vec<_>) = rest
        .into_iter()
        .partition(|parameter| !unwrap_optional(&parameter.ty, parameter.required).1);

    let mut arguments = Vec::new();
    let mut documented: Vec<(String, Option<&str>)> = Vec::new();
    let mut statements = Vec::new();

    let mut path_values = Vec::new();
    for parameter in &path_params {
        let value = ident(&parameter.ident);
        let (ty, _) = unwrap_optional(&parameter.ty, true);
        arguments.push(Argument {
            ident: value.clone(),
            ty: argument_type(api, ty, false, names)?,
        });
        documented.push((parameter.ident.clone(), parameter.description.as_deref()));
        path_values.push(quote! { encode_path_segment(#value) });
    }

    let body = match &operation.body {
        Some(body) => Some(body_argument(body, names, api, &mut taken)?),
        None => None,
    };
    if let Some((argument, body)) = &body {
        let value = &argument.ident;
        arguments.push(Argument {
            ident: value.clone(),
            ty: argument.ty.clone(),
        });
        documented.push((value.to_string(), body.description.as_deref()));
        if unwrap_optional(&body.ty, body.required).1 {
            statements.push(quote! {
                if let Some(#value) = #value {
                    request.json_body(#value)?;
                }
            });
        } else {
            statements.push(quote! { request.json_body(#value)?; });
        }
    }

    for parameter in required.iter().chain(&optional) {
        let value = ident(&parameter.ident);
        let (ty, is_optional) = unwrap_optional(&parameter.ty, parameter.required);
        arguments.push(Argument {
            ident: value.clone(),
            ty: argument_type(api, ty, is_optional, names)?,
        });
        documented.push((parameter.ident.clone(), parameter.description.as_deref()));
        let call = parameter_call(parameter, &value);
        if is_optional {
            statements.push(quote! {
                if let Some(#value) = #value {
                    #call
                }
            });
        } else {
            statements.push(call);
        }
    }

    let template = format_template(&operation.path);
    let path = if path_values.is_empty() {
        quote! { let path = #template.to_string(); }
    } else {
        quote! { let path = format!(#template, #(#path_values),*); }
    };

    let http_method = method_path(operation.method);
    let request_binding = if statements.is_empty() {
        quote! { let request = RequestSpec::new(#http_method, path); }
    } else {
        quote! { let mut request = RequestSpec::new(#http_method, path); }
    };

    let (return_type, send) = match &operation.response {
        ResponseKind::Json(ty) => (
            rust_type(api, ty, names, None)?,
            quote! { self.transport.send_json(request).await },
        ),
        ResponseKind::Text => (quote! { String }, quote! { self.transport.send_text(request).await }),
        ResponseKind::Empty => (quote! { () }, quote! { self.transport.send_empty(request).await }),
    };

    let doc_arguments: Vec<(&str, Option<&str>)> = documented
        .iter()
        .map(|(name, description)| (name.as_str(), *description))
        .collect();
    let docs = method_docs(operation, &doc_arguments);
    let deprecated = if operation.deprecated {
        quote! { #[deprecated] }
    } else {
        quote! {}
    };
    let argument_list = arguments.iter().map(|Argument { ident, ty }| quote! { #ident: #ty });

    Ok(quote! {
        #docs
        #deprecated
        pub async fn #method_name(&self, #(#argument_list),*) -> Result<#return_type, ClientError> {
            #path
            #request_binding
            #(#statements)*
            #send
        }
    })
}

/// Body argument, named after the current name of the body's model.
fn body_argument<'b>(
    body: &'b BodyRecord,
    names: &NameTable,
    api: &str,
    taken: &mut BTreeSet<String>,
) -> Result<(Argument, &'b BodyRecord), RemodelError> {
    let (ty, optional) = unwrap_optional(&body.ty, body.required);
    let base = match ty.direct_model() {
        Some(canonical) => snake_ident(names.require(api, canonical)?),
        None => DEFAULT_BODY_ARGUMENT.to_string(),
    };
    let name = unique_name(&base, "_", taken);
    let rendered = rust_type(api, ty, names, None)?;
    let ty = if optional {
        quote! { Option<&#rendered> }
    } else {
        quote! { &#rendered }
    };
    Ok((
        Argument {
            ident: ident(&name),
            ty,
        },
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::RenameMap;
    use crate::output::{format_code, validate_code};
    use crate::synth::synthesize;
    use crate::test_utils::{api_document, widget_document};

    const API: &str = "widgets/v1";

    fn context() -> ModuleContext {
        ModuleContext {
            api: API.into(),
            title: "Widget API".into(),
            description: Some("Widgets.".into()),
            document_version: "1.0.0".into(),
            base_url: "https://api.example.com/v1".into(),
            docs_url: Some("https://docs.example.com".into()),
        }
    }

    fn emit(renames: &RenameMap) -> String {
        let synthesis = synthesize(&api_document(widget_document())).unwrap();
        let (names, _) = NameTable::resolve(API, &synthesis.models, renames).unwrap();
        let tokens = generate_client_module(&synthesis.operations, &names, &context()).unwrap();
        format_code(&validate_code(API, &tokens).unwrap())
    }

    #[test]
    fn client_has_base_url_and_constructors() {
        let code = emit(&RenameMap::default());
        assert!(code.contains("pub const BASE_URL: &str = \"https://api.example.com/v1\";"));
        assert!(code.contains("pub fn new() -> Result<Self, ClientError>"));
        assert!(code.contains("pub fn with_options(options: ClientOptions)"));
        assert!(code.contains("//! Documentation: <https://docs.example.com>"));
    }

    #[test]
    fn methods_follow_argument_order() {
        let code = emit(&RenameMap::default());
        assert!(code.contains("pub async fn get_widgets("), "{code}");
        assert!(code.contains("limit: Option<i32>"));
        assert!(code.contains("-> Result<Vec<Widget>, ClientError>"));
        assert!(code.contains("id: &str"));
        assert!(code.contains("verbose: Option<bool>"));
        let id = code.find("id: &str").unwrap();
        let verbose = code.find("verbose: Option<bool>").unwrap();
        assert!(id < verbose);
        assert!(code.contains("\"/widgets/{}\""));
        assert!(code.contains("encode_path_segment"));
        assert!(code.contains("request.query(\"verbose\", &verbose)?;"));
    }

    #[test]
    fn body_argument_is_named_after_model() {
        let code = emit(&RenameMap::default());
        assert!(code.contains("widget: &Widget"), "{code}");
        assert!(code.contains("request.json_body(widget)?;"));
        assert!(code.contains("use super::model::Widget;"));
    }

    #[test]
    fn renamed_model_renames_parameters_and_types() {
        let renames: RenameMap = [("Widget".to_string(), "Gadget".to_string())]
            .into_iter()
            .collect();
        let code = emit(&renames);
        assert!(code.contains("gadget: &Gadget"), "{code}");
        assert!(code.contains("Result<Vec<Gadget>, ClientError>"));
        assert!(code.contains("use super::model::Gadget;"));
        assert!(!code.contains("&Widget"));
        assert!(!code.contains("Vec<Widget>"));
    }

    #[test]
    fn operation_without_arguments_does_not_bind_mut() {
        let document = api_document(serde_json::json!({
            "openapi": "3.0.2",
            "info": {"title": "t", "version": "1"},
            "paths": {"/ping": {"head": {"responses": {"204": {"description": "ok"}}}}}
        }));
        let synthesis = synthesize(&document).unwrap();
        let (names, _) = NameTable::resolve(API, &synthesis.models, &RenameMap::default()).unwrap();
        let tokens = generate_client_module(&synthesis.operations, &names, &context()).unwrap();
        let code = format_code(&validate_code(API, &tokens).unwrap());

        assert!(code.contains("let path = \"/ping\".to_string();"));
        assert!(code.contains("let request = RequestSpec::new(reqwest::Method::HEAD, path);"));
        assert!(code.contains("self.transport.send_empty(request).await"));
        assert!(!code.contains("use super::model"));
    }

    #[test]
    fn deep_object_and_header_parameters() {
        let document = api_document(serde_json::json!({
            "openapi": "3.0.2",
            "info": {"title": "t", "version": "1"},
            "paths": {"/search": {"get": {
                "parameters": [
                    {"name": "X-Trace", "in": "header", "required": true, "schema": {"type": "string"}},
                    {"name": "sort", "in": "query", "style": "deepObject",
                     "schema": {"type": "object", "additionalProperties": {"type": "string"}}}
                ],
                "responses": {"200": {"description": "ok", "content": {"text/plain": {}}}}
            }}}
        }));
        let synthesis = synthesize(&document).unwrap();
        let (names, _) = NameTable::resolve(API, &synthesis.models, &RenameMap::default()).unwrap();
        let tokens = generate_client_module(&synthesis.operations, &names, &context()).unwrap();
        let code = format_code(&validate_code(API, &tokens).unwrap());

        assert!(code.contains("x_trace: &str"), "{code}");
        assert!(code.contains("request.header(\"X-Trace\", &x_trace)?;"));
        assert!(code.contains("sort: Option<&std::collections::BTreeMap<String, String>>"));
        assert!(code.contains("request.deep_object_query(\"sort\", &sort)?;"));
        assert!(code.contains("-> Result<String, ClientError>"));
    }

    #[test]
    fn parameter_docs_use_first_description_line() {
        let document = api_document(serde_json::json!({
            "openapi": "3.0.2",
            "info": {"title": "t", "version": "1"},
            "paths": {"/items": {"get": {
                "summary": "List items.",
                "parameters": [
                    {"name": "limit", "in": "query", "description": "Page size.\nIgnored above 100.",
                     "schema": {"type": "integer"}},
                    {"name": "offset", "in": "query", "schema": {"type": "integer"}}
                ],
                "responses": {"204": {"description": "ok"}}
            }}}
        }));
        let synthesis = synthesize(&document).unwrap();
        let (names, _) = NameTable::resolve(API, &synthesis.models, &RenameMap::default()).unwrap();
        let tokens = generate_client_module(&synthesis.operations, &names, &context()).unwrap();
        let code = format_code(&validate_code(API, &tokens).unwrap());

        assert!(code.contains("/// List items."), "{code}");
        assert!(code.contains("/// ## Parameters"));
        assert!(code.contains("/// - `limit`: Page size."));
        assert!(!code.contains("Ignored above 100."));
        assert!(!code.contains("- `offset`"));
    }
}
