//! Operation synthesis: one [`OperationRecord`] per (path, method).

use std::collections::BTreeSet;

use openapiv3::{
    Components, Operation, Parameter, ParameterData, ParameterSchemaOrContent, PathItem,
    PathStyle, QueryStyle as OpenApiQueryStyle, ReferenceOr, RequestBody, StatusCode,
};
use tracing::warn;

use super::location::SchemaLocation;
use super::records::{
    BodyRecord, HttpMethod, OperationRecord, ParameterLocation, ParameterRecord, QueryStyle,
    ResponseKind, TypeRef,
};
use super::schema::{SchemaConverter, SchemaRef};
use crate::document::ApiDocument;
use crate::errors::RemodelError;
use crate::naming::{snake_ident, unique_name};
use crate::parser::{extract_path_params, path_words};

/// Argument names the generated method body uses for its own locals.
const RESERVED_ARGUMENTS: &[&str] = &["request", "path", "self"];

const MAX_REFERENCE_HOPS: usize = 8;

/// Follows `$ref`s into `components.<kind>` until reaching an item. Returns the
/// item and the name of the last component visited.
fn resolve_component<'d, T>(
    document: &'d ApiDocument,
    value: &'d ReferenceOr<T>,
    kind: &str,
    lookup: impl Fn(&'d Components, &str) -> Option<&'d ReferenceOr<T>>,
) -> Result<(&'d T, Option<&'d str>), RemodelError> {
    let unresolved = |reference: &str| RemodelError::DocumentParse {
        api: document.api.clone(),
        origin: document.origin.clone(),
        reason: format!("cannot resolve reference `{reference}`"),
    };
    let prefix = format!("#/components/{kind}/");
    let mut current = value;
    let mut name = None;

    for _ in 0..MAX_REFERENCE_HOPS {
        match current {
            ReferenceOr::Item(item) => return Ok((item, name)),
            ReferenceOr::Reference { reference } => {
                let target = reference
                    .strip_prefix(prefix.as_str())
                    .ok_or_else(|| unresolved(reference))?;
                current = document
                    .openapi
                    .components
                    .as_ref()
                    .and_then(|components| lookup(components, target))
                    .ok_or_else(|| unresolved(reference))?;
                name = Some(target);
            }
        }
    }
    Err(unresolved(&format!("{kind} reference chain")))
}

fn path_operations(item: &PathItem) -> Vec<(HttpMethod, &Operation)> {
    [
        (HttpMethod::Get, &item.get),
        (HttpMethod::Put, &item.put),
        (HttpMethod::Post, &item.post),
        (HttpMethod::Delete, &item.delete),
        (HttpMethod::Options, &item.options),
        (HttpMethod::Head, &item.head),
        (HttpMethod::Patch, &item.patch),
        (HttpMethod::Trace, &item.trace),
    ]
    .into_iter()
    .filter_map(|(method, operation)| operation.as_ref().map(|operation| (method, operation)))
    .collect()
}

fn is_json_media(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or(media_type).trim();
    essence == "application/json" || essence.ends_with("+json")
}

/// Synthesizes every operation of the document, ordered by (path, method).
pub(crate) fn synthesize_operations(
    converter: &mut SchemaConverter<'_>,
) -> Result<Vec<OperationRecord>, RemodelError> {
    let document = converter.document();
    let mut records = Vec::new();

    for (path, item) in &document.openapi.paths.paths {
        let item = match item {
            ReferenceOr::Item(item) => item,
            ReferenceOr::Reference { .. } => {
                return Err(RemodelError::unsupported(
                    converter.api(),
                    format!("#/paths/{}", remodel_define::pointer::escape(path)),
                    "path item reference",
                ));
            }
        };
        for (method, operation) in path_operations(item) {
            records.push(operation_record(converter, path, method, operation, &item.parameters)?);
        }
    }

    records.sort_by(|a, b| (&a.path, a.method).cmp(&(&b.path, b.method)));

    let mut taken = BTreeSet::new();
    for record in &mut records {
        record.method_name = unique_name(&record.method_name, "_", &mut taken);
    }
    Ok(records)
}

fn operation_record(
    converter: &mut SchemaConverter<'_>,
    path: &str,
    method: HttpMethod,
    operation: &Operation,
    shared_parameters: &[ReferenceOr<Parameter>],
) -> Result<OperationRecord, RemodelError> {
    let base = SchemaLocation::from_tokens(["paths", path, method.key()]);

    let mut method_words = vec![method.key()];
    method_words.extend(path_words(path));
    let method_name = snake_ident(&method_words.join(" "));

    let parameters = operation_parameters(converter, path, &base, operation, shared_parameters)?;
    let body = match &operation.request_body {
        Some(body) => request_body(converter, &base, body)?,
        None => None,
    };
    let response = response_kind(converter, &base, operation)?;

    Ok(OperationRecord {
        canonical_id: format!("{method} {path}"),
        method,
        path: path.to_string(),
        method_name,
        summary: operation.summary.clone(),
        description: operation.description.clone(),
        deprecated: operation.deprecated,
        parameters,
        body,
        response,
    })
}

fn operation_parameters(
    converter: &mut SchemaConverter<'_>,
    path: &str,
    base: &SchemaLocation,
    operation: &Operation,
    shared_parameters: &[ReferenceOr<Parameter>],
) -> Result<Vec<ParameterRecord>, RemodelError> {
    // Operation-level parameters override path-level ones with the same
    // name and location.
    let mut declared: Vec<(&Parameter, SchemaLocation)> = Vec::new();
    for parameter in shared_parameters.iter().chain(&operation.parameters) {
        let (parameter, component) =
            resolve_component(converter.document(), parameter, "parameters", |components, name| {
                components.parameters.get(name)
            })?;
        let data = parameter.parameter_data_ref();
        let location = match component {
            Some(name) => SchemaLocation::from_tokens(["components", "parameters", name, "schema"]),
            None => base.child("parameters").child(data.name.as_str()).child("schema"),
        };
        declared.retain(|(existing, _)| {
            let existing_data = existing.parameter_data_ref();
            existing_data.name != data.name
                || std::mem::discriminant(*existing) != std::mem::discriminant(parameter)
        });
        declared.push((parameter, location));
    }

    let mut taken: BTreeSet<String> = RESERVED_ARGUMENTS.iter().map(|s| s.to_string()).collect();
    let mut path_records = Vec::new();
    let mut other_records = Vec::new();

    for (parameter, location) in declared {
        let (data, parameter_location, style) = match parameter {
            Parameter::Path { parameter_data, style } => {
                if !matches!(style, PathStyle::Simple) {
                    return Err(converter_unsupported(converter, &location, "non-simple path parameter style"));
                }
                (parameter_data, ParameterLocation::Path, QueryStyle::Form)
            }
            Parameter::Query { parameter_data, style, .. } => {
                let style = match style {
                    OpenApiQueryStyle::DeepObject => QueryStyle::DeepObject,
                    _ => QueryStyle::Form,
                };
                (parameter_data, ParameterLocation::Query, style)
            }
            Parameter::Header { parameter_data, .. } => {
                (parameter_data, ParameterLocation::Header, QueryStyle::Form)
            }
            Parameter::Cookie { .. } => {
                return Err(converter_unsupported(converter, &location, "cookie parameter"));
            }
        };
        let ty = parameter_type(converter, data, &location)?;
        if parameter_location != ParameterLocation::Query && !ty.is_scalar() {
            return Err(converter_unsupported(
                converter,
                &location,
                format!("non-scalar {} parameter", parameter_location.to_string().to_lowercase()),
            ));
        }

        let record = ParameterRecord {
            name: data.name.clone(),
            ident: unique_name(&snake_ident(&data.name), "_", &mut taken),
            location: parameter_location,
            style,
            ty,
            required: data.required || parameter_location == ParameterLocation::Path,
            description: data.description.clone(),
        };
        if parameter_location == ParameterLocation::Path {
            path_records.push(record);
        } else {
            other_records.push(record);
        }
    }

    // Path parameters follow template order; undeclared placeholders are strings.
    let mut ordered = Vec::with_capacity(path_records.len() + other_records.len());
    for name in extract_path_params(path) {
        match path_records.iter().position(|record| record.name == name) {
            Some(index) => ordered.push(path_records.remove(index)),
            None => {
                warn!(path, parameter = name, "path parameter is not declared, assuming string");
                ordered.push(ParameterRecord {
                    name: name.to_string(),
                    ident: unique_name(&snake_ident(name), "_", &mut taken),
                    location: ParameterLocation::Path,
                    style: QueryStyle::Form,
                    ty: TypeRef::String,
                    required: true,
                    description: None,
                });
            }
        }
    }
    for unused in &path_records {
        warn!(path, parameter = %unused.name, "declared path parameter is not in the template, skipping");
    }
    ordered.extend(other_records);
    Ok(ordered)
}

fn converter_unsupported(
    converter: &SchemaConverter<'_>,
    location: &SchemaLocation,
    construct: impl Into<String>,
) -> RemodelError {
    RemodelError::unsupported(converter.api(), location.to_string(), construct)
}

fn parameter_type(
    converter: &mut SchemaConverter<'_>,
    data: &ParameterData,
    location: &SchemaLocation,
) -> Result<TypeRef, RemodelError> {
    match &data.format {
        ParameterSchemaOrContent::Schema(schema) => converter.type_of(SchemaRef::from(schema), location),
        ParameterSchemaOrContent::Content(_) => {
            Err(converter_unsupported(converter, location, "parameter content"))
        }
    }
}

fn request_body(
    converter: &mut SchemaConverter<'_>,
    base: &SchemaLocation,
    body: &ReferenceOr<RequestBody>,
) -> Result<Option<BodyRecord>, RemodelError> {
    let (body, component) =
        resolve_component(converter.document(), body, "requestBodies", |components, name| {
            components.request_bodies.get(name)
        })?;
    let body_location = match component {
        Some(name) => SchemaLocation::from_tokens(["components", "requestBodies", name]),
        None => base.child("requestBody"),
    };

    if body.content.is_empty() {
        return Ok(None);
    }
    let Some((media_type, media)) = body
        .content
        .iter()
        .find(|(media_type, _)| is_json_media(media_type))
    else {
        let declared = body.content.keys().next().map(String::as_str).unwrap_or_default();
        return Err(converter_unsupported(
            converter,
            &body_location,
            format!("request body media type `{declared}`"),
        ));
    };

    let location = body_location.child("content").child(media_type.as_str()).child("schema");
    let ty = match &media.schema {
        Some(schema) => converter.type_of(SchemaRef::from(schema), &location)?,
        None => TypeRef::Any,
    };
    Ok(Some(BodyRecord {
        ty,
        required: body.required,
        description: body.description.clone(),
    }))
}

fn response_kind(
    converter: &mut SchemaConverter<'_>,
    base: &SchemaLocation,
    operation: &Operation,
) -> Result<ResponseKind, RemodelError> {
    let success = operation
        .responses
        .responses
        .iter()
        .filter_map(|(status, response)| match status {
            StatusCode::Code(code) if (200..300).contains(code) => Some((*code, code.to_string(), response)),
            StatusCode::Range(2) => Some((299, "2XX".to_string(), response)),
            _ => None,
        })
        .min_by_key(|(order, _, _)| *order)
        .map(|(_, status, response)| (status, response))
        .or_else(|| {
            operation
                .responses
                .default
                .as_ref()
                .map(|response| ("default".to_string(), response))
        });

    let Some((status, response)) = success else {
        return Ok(ResponseKind::Empty);
    };
    let (response, component) =
        resolve_component(converter.document(), response, "responses", |components, name| {
            components.responses.get(name)
        })?;
    let response_location = match component {
        Some(name) => SchemaLocation::from_tokens(["components", "responses", name]),
        None => base.child("responses").child(status),
    };

    if let Some((media_type, media)) = response
        .content
        .iter()
        .find(|(media_type, _)| is_json_media(media_type))
    {
        let location = response_location
            .child("content")
            .child(media_type.as_str())
            .child("schema");
        let ty = match &media.schema {
            Some(schema) => converter.type_of(SchemaRef::from(schema), &location)?,
            None => TypeRef::Any,
        };
        return Ok(ResponseKind::Json(ty));
    }

    Ok(if response.content.is_empty() {
        ResponseKind::Empty
    } else {
        ResponseKind::Text
    })
}
