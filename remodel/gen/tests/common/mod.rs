//! Shared fixtures for the remodel-gen integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use remodel_define::VersionHandler;
use remodel_gen::config::RemodelConfig;
use remodel_gen::document::DocumentSource;
use serde_json::{Value, json};
use tempfile::TempDir;

/// A version handler without document fixes.
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

pub static WIDGETS: TestHandler = TestHandler::new("widgets", "v1");

/// A temporary output crate with one document file per version.
pub struct Workspace {
    pub dir: TempDir,
    pub config: RemodelConfig,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = RemodelConfig {
            output_dir: dir.path().join("cmsgov"),
            openapi_dir: dir.path().join("openapi"),
            timeout: Duration::from_secs(5),
            ..RemodelConfig::default()
        };
        Self { dir, config }
    }

    /// Writes `document` as the source of `handler` and points the config at it.
    pub fn set_document(&mut self, handler: &dyn VersionHandler, document: &Value) -> PathBuf {
        let path = self.document_path(handler);
        fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
        self.config
            .document_overrides
            .insert(handler.label(), DocumentSource::Path(path.clone()));
        path
    }

    /// Points `handler` at a document file that does not exist.
    pub fn set_missing_document(&mut self, handler: &dyn VersionHandler) {
        let path = self.document_path(handler);
        self.config
            .document_overrides
            .insert(handler.label(), DocumentSource::Path(path));
    }

    fn document_path(&self, handler: &dyn VersionHandler) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}-{}.json", handler.package(), handler.version()))
    }

    pub fn model_path(&self, handler: &dyn VersionHandler) -> PathBuf {
        self.config.version_dir(handler).join("model.rs")
    }

    pub fn client_path(&self, handler: &dyn VersionHandler) -> PathBuf {
        self.config.version_dir(handler).join("client.rs")
    }

    pub fn model(&self, handler: &dyn VersionHandler) -> String {
        read(&self.model_path(handler))
    }

    pub fn client(&self, handler: &dyn VersionHandler) -> String {
        read(&self.client_path(handler))
    }

    /// Applies a hand edit to the model module on disk.
    pub fn edit_model(&self, handler: &dyn VersionHandler, from: &str, to: &str) {
        let path = self.model_path(handler);
        let source = read(&path);
        assert!(source.contains(from), "model module has no `{from}`:\n{source}");
        fs::write(&path, source.replace(from, to)).unwrap();
    }
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
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
                    "name": {"type": "string", "description": "Display name."}
                }
            }
        }}
    })
}

/// The widget document with an extra `Thing` schema returned by `GET /things`.
pub fn widget_document_with_thing() -> Value {
    let mut document = widget_document();
    document["components"]["schemas"]["Thing"] = json!({
        "type": "object",
        "properties": {"label": {"type": "string"}}
    });
    document["paths"]["/things"] = json!({
        "get": {
            "summary": "List things.",
            "responses": {"200": {"description": "ok", "content": {"application/json": {
                "schema": {"type": "array", "items": {"$ref": "#/components/schemas/Thing"}}
            }}}}
        }
    });
    document
}
