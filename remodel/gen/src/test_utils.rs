//! Shared test utilities for remodel-gen tests.
//!
//! Provides a version handler without document fixes and a small widget
//! document, so unit tests do not depend on the Provider Data document.

use remodel_define::VersionHandler;
use serde_json::{Value, json};

use crate::document::ApiDocument;

/// A version handler with no document fixes.
pub struct TestHandler {
    package: &'static str,
    version: &'static str,
}

impl TestHandler {
    pub const fn new(package: &'static str, version: &'static str) -> Self {
        Self { package, version }
    }
}

impl VersionHandler for TestHandler {
    fn package(&self) -> &'static str {
        self.package
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn title(&self) -> &'static str {
        "Widget API"
    }

    fn document_url(&self) -> &'static str {
        "https://api.example.com/openapi.json"
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.example.com"
    }
}

/// Wraps a raw document as the `widgets/v1` [`ApiDocument`].
///
/// ## Panics
///
/// Panics if `raw` is not a valid OpenAPI document.
pub fn api_document(raw: Value) -> ApiDocument {
    ApiDocument {
        api: "widgets/v1".to_string(),
        origin: "memory".to_string(),
        openapi: serde_json::from_value(raw.clone()).expect("test document should be valid OpenAPI"),
        raw,
    }
}

/// A small document with one component schema and three operations.
pub fn widget_document() -> Value {
    let widget = json!({"$ref": "#/components/schemas/Widget"});
    json!({
        "openapi": "3.0.2",
        "info": {"title": "Widget API", "version": "1.0.0", "description": "Widgets."},
        "servers": [{"url": "https://api.example.com/v1/"}],
        "paths": {
            "/widgets": {
                "get": {
                    "summary": "List widgets.",
                    "parameters": [
                        {"name": "limit", "in": "query", "schema": {"type": "integer", "format": "int32"}}
                    ],
                    "responses": {"200": {"description": "ok", "content": {"application/json": {
                        "schema": {"type": "array", "items": widget}
                    }}}}
                },
                "post": {
                    "summary": "Create a widget.",
                    "requestBody": {"required": true, "content": {"application/json": {"schema": widget}}},
                    "responses": {"201": {"description": "created", "content": {"application/json": {
                        "schema": widget
                    }}}}
                }
            },
            "/widgets/{id}": {
                "get": {
                    "summary": "Get a widget.",
                    "parameters": [
                        {"name": "verbose", "in": "query", "schema": {"type": "boolean"}},
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "responses": {"200": {"description": "ok", "content": {"application/json": {
                        "schema": widget
                    }}}}
                }
            }
        },
        "components": {"schemas": {
            "Widget": {
                "type": "object",
                "description": "A widget.",
                "required": ["id"],
                "properties": {
                    "id": {"type": "string"},
                    "name": {"type": "string", "description": "Display name."},
                    "tags": {"type": "array", "items": {"type": "string"}}
                }
            }
        }}
    })
}
