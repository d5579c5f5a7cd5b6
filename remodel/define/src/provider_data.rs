//! CMS Provider Data catalog, version 1.
//!
//! The published document disagrees with the live API in a handful of places.
//! [`ProviderDataV1::fix_document`] corrects those before the document is parsed,
//! so every regeneration starts from the same corrected shape.

use serde_json::{Value, json};
use tracing::debug;

use crate::pointer::{cloned, escape, object_mut, resolve_mut};
use crate::{DefineError, VersionHandler};

/// Base URL of the Provider Data API, also the prefix of every published path.
pub const BASE_URL: &str = "https://data.cms.gov/provider-data/api/1";

/// Location of the published OpenAPI document.
pub const DOCUMENT_URL: &str = "https://data.cms.gov/provider-data/api/1";

const PATH_PREFIX: &str = "/provider-data/api/1";

const DATASET_ITEM_PATH: &str = "/metastore/schemas/dataset/items/{identifier}";
const DATASET_ITEMS_PATH: &str = "/metastore/schemas/dataset/items";
const DATASET_UUID_PARAMETER: &str = "#/components/parameters/datasetUuid";

const HTTP_METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

const DATASTORE_QUERY_GET_PATHS: [&str; 6] = [
    "/datastore/query",
    "/datastore/query/download",
    "/datastore/query/{distributionId}",
    "/datastore/query/{distributionId}/download",
    "/datastore/query/{datasetId}/{index}",
    "/datastore/query/{datasetId}/{index}/download",
];

/// Properties of the POST query body that GET queries accept as deep objects.
const DATASTORE_QUERY_ARRAY_PARAMETERS: [&str; 6] = [
    "resources",
    "properties",
    "conditions",
    "joins",
    "groupings",
    "sorts",
];

/// Handler for `provider_data/v1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderDataV1;

impl VersionHandler for ProviderDataV1 {
    fn package(&self) -> &'static str {
        "provider_data"
    }

    fn version(&self) -> &'static str {
        "v1"
    }

    fn title(&self) -> &'static str {
        "CMS Provider Data API"
    }

    fn document_url(&self) -> &'static str {
        DOCUMENT_URL
    }

    fn default_base_url(&self) -> &'static str {
        BASE_URL
    }

    fn docs_url(&self) -> Option<&'static str> {
        Some("https://data.cms.gov/provider-data/docs")
    }

    fn fix_document(&self, document: &mut Value) -> Result<(), DefineError> {
        add_default_server(document)?;
        add_datasets_schema(document)?;
        strip_path_prefix(document)?;
        add_list_datasets_operation(document)?;
        add_missing_properties(document)?;
        add_datastore_query_parameters(document)?;
        clear_post_only_descriptions(document)?;
        fix_component_parameters(document)?;
        fix_response_types(document)?;
        debug!("applied provider_data/v1 document fixes");
        Ok(())
    }
}

fn string_schema() -> Value {
    json!({"type": "string"})
}

fn integer_schema() -> Value {
    json!({"type": "integer"})
}

fn operation_pointer(path: &str, method: &str) -> String {
    format!("/paths/{}/{method}", escape(path))
}

/// Replaces a schema's `type` with an `anyOf` over `variants`, keeping its
/// other keywords (description, etc.).
fn widen_to_any_of(document: &mut Value, pointer: &str, variants: Vec<Value>) -> Result<(), DefineError> {
    let schema = object_mut(document, pointer)?;
    schema.remove("type");
    schema.insert("anyOf".to_string(), Value::Array(variants));
    Ok(())
}

fn add_default_server(document: &mut Value) -> Result<(), DefineError> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| DefineError::fix("", "document root is not an object"))?;
    let has_servers = root
        .get("servers")
        .and_then(Value::as_array)
        .is_some_and(|servers| !servers.is_empty());
    if !has_servers {
        root.insert(
            "servers".to_string(),
            json!([{"url": BASE_URL, "description": "CMS Provider Data API V1"}]),
        );
    }
    Ok(())
}

fn add_datasets_schema(document: &mut Value) -> Result<(), DefineError> {
    let schemas = object_mut(document, "/components/schemas")?;
    schemas.insert(
        "datasets".to_string(),
        json!({
            "type": "array",
            "items": {"$ref": "#/components/schemas/dataset"},
            "description": "An array of datasets."
        }),
    );
    Ok(())
}

fn strip_path_prefix(document: &mut Value) -> Result<(), DefineError> {
    let paths = object_mut(document, "/paths")?;
    let entries = std::mem::take(paths);
    for (path, item) in entries {
        let Some(stripped) = path
            .strip_prefix(PATH_PREFIX)
            .filter(|rest| rest.starts_with('/'))
        else {
            return Err(DefineError::fix(
                &format!("/paths/{}", escape(&path)),
                format!("path does not start with '{PATH_PREFIX}/'"),
            ));
        };
        paths.insert(stripped.to_string(), item);
    }
    Ok(())
}

/// Adds `/metastore/schemas/dataset/items` as a copy of the single-dataset
/// path item. Its GET drops the identifier parameter and returns every dataset.
fn add_list_datasets_operation(document: &mut Value) -> Result<(), DefineError> {
    let mut item = cloned(document, &format!("/paths/{}", escape(DATASET_ITEM_PATH)))?;
    let item_pointer = format!("/paths/{}", escape(DATASET_ITEMS_PATH));
    let operations = item
        .as_object_mut()
        .ok_or_else(|| DefineError::fix(&item_pointer, "path item is not an object"))?;
    // Operation ids must stay unique.
    for (method, operation) in operations.iter_mut() {
        if HTTP_METHODS.contains(&method.as_str()) {
            if let Some(operation) = operation.as_object_mut() {
                operation.remove("operationId");
            }
        }
    }

    let pointer = operation_pointer(DATASET_ITEMS_PATH, "get");
    let get = operations
        .get_mut("get")
        .filter(|get| get.is_object())
        .ok_or_else(|| DefineError::fix(&pointer, "expected a GET operation"))?;
    if let Some(object) = get.as_object_mut() {
        object.insert("summary".to_string(), json!("Get all datasets."));
        if let Some(Value::Array(parameters)) = object.get_mut("parameters") {
            parameters.retain(|parameter| {
                parameter.get("$ref").and_then(Value::as_str) != Some(DATASET_UUID_PARAMETER)
            });
        }
    }
    *resolve_mut(get, "/responses/200/content/application~1json/schema")? =
        json!({"$ref": "#/components/schemas/datasets"});

    object_mut(document, "/paths")?.insert(DATASET_ITEMS_PATH.to_string(), item);
    Ok(())
}

fn add_missing_properties(document: &mut Value) -> Result<(), DefineError> {
    object_mut(document, "/components/schemas/dataset/properties")?
        .insert("landingPage".to_string(), string_schema());
    object_mut(
        document,
        "/components/schemas/datastoreQuery/properties/resources/items/properties",
    )?
    .insert("id".to_string(), string_schema());
    Ok(())
}

/// Lets GET datastore queries carry the same arrays as the POST body.
fn add_datastore_query_parameters(document: &mut Value) -> Result<(), DefineError> {
    let mut parameters = Vec::with_capacity(DATASTORE_QUERY_ARRAY_PARAMETERS.len());
    for name in DATASTORE_QUERY_ARRAY_PARAMETERS {
        let property = format!("/components/schemas/datastoreQuery/properties/{name}");
        let description = cloned(document, &property)?.get("description").cloned();
        let mut parameter = json!({
            "name": name,
            "in": "query",
            "required": false,
            "style": "deepObject",
            "schema": {"$ref": format!("#{property}")}
        });
        if let (Some(description), Some(object)) = (description, parameter.as_object_mut()) {
            object.insert("description".to_string(), description);
        }
        parameters.push(parameter);
    }

    for path in DATASTORE_QUERY_GET_PATHS {
        let operation = object_mut(document, &operation_pointer(path, "get"))?;
        let existing = operation
            .entry("parameters".to_string())
            .or_insert_with(|| json!([]));
        let existing = existing.as_array_mut().ok_or_else(|| {
            DefineError::fix(
                &format!("{}/parameters", operation_pointer(path, "get")),
                "expected an array",
            )
        })?;
        existing.extend(parameters.iter().cloned());
    }
    Ok(())
}

fn clear_post_only_descriptions(document: &mut Value) -> Result<(), DefineError> {
    for path in DATASTORE_QUERY_GET_PATHS {
        let operation = object_mut(document, &operation_pointer(path, "get"))?;
        let mentions_post = operation
            .get("description")
            .and_then(Value::as_str)
            .is_some_and(|description| description.contains("POST"));
        if mentions_post {
            operation.remove("description");
        }
    }
    Ok(())
}

fn fix_component_parameters(document: &mut Value) -> Result<(), DefineError> {
    object_mut(
        document,
        "/components/parameters/datastoreDistributionIndex/schema",
    )?
    .insert("type".to_string(), json!("integer"));
    Ok(())
}

fn fix_response_types(document: &mut Value) -> Result<(), DefineError> {
    // Query results may describe their schema as an array.
    let schema_pointer = "/components/responses/200JsonOrCsvQueryOk/content/application~1json/schema/properties/schema";
    let original = cloned(document, schema_pointer)?;
    *resolve_mut(document, schema_pointer)? = json!({"anyOf": [original, {"type": "array"}]});

    let search = "/paths/~1search/get/responses/200/content/application~1json/schema/properties";
    widen_to_any_of(
        document,
        &format!("{search}/total"),
        vec![string_schema(), integer_schema()],
    )?;
    widen_to_any_of(
        document,
        &format!("{search}/results"),
        vec![json!({"type": "object"}), json!({"type": "array"})],
    )?;

    let results = cloned(document, &format!("{search}/results"))?;
    let total = cloned(document, &format!("{search}/total"))?;
    let facets = object_mut(
        document,
        "/paths/~1search~1facets/get/responses/200/content/application~1json/schema/properties",
    )?;
    facets.insert("results".to_string(), results);
    facets.insert("total".to_string(), total);

    widen_to_any_of(
        document,
        "/components/schemas/facets/items/properties/total",
        vec![string_schema(), integer_schema()],
    )?;
    Ok(())
}
