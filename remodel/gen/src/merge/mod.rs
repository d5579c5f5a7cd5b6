//! Rename-preserving merge.
//!
//! Combines a fresh [`Synthesis`] with the names recorded in the previous
//! model module:
//!
//! 1. Recover a [`RenameMap`] from the previous module's schema markers
//! 2. Resolve a [`NameTable`] (recorded names win, dead renames are dropped)
//! 3. Emit the model and client modules using current names
//! 4. Self-check the output before anything is written
//!
//! Nothing here touches the filesystem; the pipeline writes the sources only
//! after [`merge`] returned successfully.

mod marker;
mod names;

pub use marker::{RenameMap, SCHEMA_MARKER, marker_doc};
pub use names::{NameTable, Rename, RenameReport};

use std::collections::BTreeSet;

use remodel_define::VersionHandler;
use syn::Item;
use tracing::{debug, info};

use crate::codegen::ModuleContext;
use crate::codegen::client::generate_client_module;
use crate::codegen::model::generate_model_module;
use crate::errors::RemodelError;
use crate::output::{format_code, validate_code};
use crate::synth::Synthesis;

impl ModuleContext {
    /// Context for emitting `synthesis` as the version `handler` describes.
    ///
    /// The base URL is the document's first server, else the handler's default.
    pub fn new(synthesis: &Synthesis, handler: &dyn VersionHandler) -> Self {
        Self {
            api: synthesis.api.clone(),
            title: handler.title().to_string(),
            description: synthesis.description.clone(),
            document_version: synthesis.document_version.clone(),
            base_url: synthesis
                .server_url
                .clone()
                .unwrap_or_else(|| handler.default_base_url().trim_end_matches('/').to_string()),
            docs_url: handler.docs_url().map(str::to_string),
        }
    }
}

/// Formatted sources and name resolution of one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub model_source: String,
    pub client_source: String,
    pub names: NameTable,
    pub report: RenameReport,
}

/// Merges `synthesis` with the previous model module, if there is one.
///
/// ## Errors
///
/// [`RemodelError::MergeConsistency`] if the previous module cannot be read
/// back, or the emitted modules fail the self-check.
pub fn merge(
    synthesis: &Synthesis,
    previous_model: Option<&str>,
    context: &ModuleContext,
) -> Result<MergeOutcome, RemodelError> {
    let api = synthesis.api.as_str();

    let renames = match previous_model {
        Some(source) => RenameMap::from_source(api, source)?,
        None => RenameMap::default(),
    };
    debug!(api, recorded = renames.len(), "recovered type names");

    let (names, report) = NameTable::resolve(api, &synthesis.models, &renames)?;

    let model_tokens = generate_model_module(&synthesis.models, &names, context)?;
    let client_tokens = generate_client_module(&synthesis.operations, &names, context)?;
    let model_source = format_code(&validate_code(api, &model_tokens)?);
    let client_source = format_code(&validate_code(api, &client_tokens)?);

    self_check(api, &model_source, &client_source, &names)?;

    info!(
        api,
        models = names.len(),
        operations = synthesis.operations.len(),
        carried = report.carried.len(),
        dropped = report.dropped.len(),
        "merged"
    );

    Ok(MergeOutcome {
        model_source,
        client_source,
        names,
        report,
    })
}

/// Verifies formatted output before it is written.
///
/// Both modules must parse, every type name must be declared once, and the
/// model module must read back to exactly the resolved names.
pub fn self_check(
    api: &str,
    model_source: &str,
    client_source: &str,
    names: &NameTable,
) -> Result<(), RemodelError> {
    syn::parse_file(client_source).map_err(|e| {
        RemodelError::consistency(api, format!("generated client module does not parse: {e}"))
    })?;
    let model = syn::parse_file(model_source).map_err(|e| {
        RemodelError::consistency(api, format!("generated model module does not parse: {e}"))
    })?;

    let mut declared = BTreeSet::new();
    for item in &model.items {
        let ident = match item {
            Item::Struct(item) => &item.ident,
            Item::Enum(item) => &item.ident,
            Item::Type(item) => &item.ident,
            _ => continue,
        };
        if !declared.insert(ident.to_string()) {
            return Err(RemodelError::consistency(
                api,
                format!("type `{ident}` is declared more than once"),
            ));
        }
    }

    let recovered = RenameMap::from_file(api, &model)?;
    let expected = names.to_rename_map();
    if recovered != expected {
        let missing: Vec<_> = expected
            .iter()
            .filter(|(canonical, name)| recovered.get(canonical) != Some(*name))
            .map(|(canonical, _)| canonical)
            .collect();
        return Err(RemodelError::consistency(
            api,
            format!(
                "model module does not round-trip its type names (mismatched: {})",
                missing.join(", ")
            ),
        ));
    }
    Ok(())
}
