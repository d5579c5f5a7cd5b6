//! Model/client synthesis.
//!
//! Turns an [`ApiDocument`] into a [`Synthesis`]: model records keyed by
//! canonical name and operation records in canonical order. Synthesis knows
//! nothing about previously generated code; names here are defaults.

mod location;
mod operation;
pub mod records;
mod schema;

pub use location::SchemaLocation;
pub use records::*;

use tracing::{debug, info};

use crate::document::ApiDocument;
use crate::errors::RemodelError;
use schema::{SchemaConverter, SchemaRef};

/// Synthesizes models and operations from a parsed document.
///
/// ## Errors
///
/// - [`RemodelError::UnsupportedSchema`] for constructs the generator cannot express
/// - [`RemodelError::DocumentParse`] for references that do not resolve
pub fn synthesize(document: &ApiDocument) -> Result<Synthesis, RemodelError> {
    let mut converter = SchemaConverter::new(document);

    if let Some(components) = &document.openapi.components {
        for (name, schema) in &components.schemas {
            debug!(schema = %name, "synthesizing component schema");
            converter.component(name, SchemaRef::from(schema))?;
        }
    }
    let operations = operation::synthesize_operations(&mut converter)?;
    let models = converter.into_models();

    let server_url = document
        .openapi
        .servers
        .iter()
        .map(|server| server.url.trim_end_matches('/'))
        .find(|url| url.starts_with("http://") || url.starts_with("https://"))
        .map(str::to_string);

    info!(
        api = %document.api,
        models = models.len(),
        operations = operations.len(),
        "synthesized document"
    );

    Ok(Synthesis {
        api: document.api.clone(),
        title: Some(document.openapi.info.title.clone()).filter(|title| !title.is_empty()),
        description: document.openapi.info.description.clone(),
        document_version: document.openapi.info.version.clone(),
        server_url,
        models,
        operations,
    })
}
