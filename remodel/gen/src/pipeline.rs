//! Run orchestration.
//!
//! Each API version runs Loader → Synthesizer → Merger → write as its own
//! tokio task. Versions share only the read-only [`RemodelConfig`], so one
//! failing version never affects another. The crate scaffolding is written
//! after every version finished.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::Path;
use std::sync::Arc;

use remodel_define::{ApiVersion, VersionHandler};
use tracing::{error, info, instrument, warn};

use crate::cargo_gen::generate_cargo_toml;
use crate::codegen::ModuleContext;
use crate::codegen::module_tree::{generate_lib, generate_package_mod, generate_version_mod};
use crate::codegen::shared::generate_shared_module;
use crate::config::RemodelConfig;
use crate::document::load_document;
use crate::errors::RemodelError;
use crate::merge::{RenameReport, merge};
use crate::output::{FileWrite, WriteStatus, WrittenFile, format_code, validate_code, write_files_atomic};
use crate::synth::synthesize;

const MODEL_FILE: &str = "model.rs";
const CLIENT_FILE: &str = "client.rs";
const MOD_FILE: &str = "mod.rs";
const FIXED_SNAPSHOT: &str = "fixed.json";

/// Result of regenerating one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenerationReport {
    pub api: String,
    pub models: usize,
    pub operations: usize,
    pub renames: RenameReport,
    /// Every file of the version, in write order.
    pub files: Vec<FileWrite>,
    /// Write results; empty on a dry run.
    pub written: Vec<WrittenFile>,
}

impl RegenerationReport {
    /// Number of files whose content changed.
    pub fn changed(&self) -> usize {
        self.written
            .iter()
            .filter(|file| file.status == WriteStatus::Written)
            .count()
    }
}

/// Files of the generated crate that do not depend on any document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaffoldingReport {
    pub files: Vec<FileWrite>,
    pub written: Vec<WrittenFile>,
}

/// Outcome of one version in a run.
#[derive(Debug)]
pub struct VersionOutcome {
    pub api: String,
    pub result: Result<RegenerationReport, RemodelError>,
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunSummary {
    /// One entry per requested version, in request order.
    pub versions: Vec<VersionOutcome>,
    pub scaffolding: Result<ScaffoldingReport, RemodelError>,
}

impl RunSummary {
    /// Number of versions that failed.
    pub fn failed(&self) -> usize {
        self.versions
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }

    /// `true` when every version and the scaffolding succeeded.
    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.scaffolding.is_ok()
    }
}

/// Handlers for the named versions, or every declared version when `names` is empty.
///
/// ## Errors
///
/// [`RemodelError::Define`] wrapping `UnsupportedVersion` for an unknown name.
pub fn resolve_handlers(names: &[String]) -> Result<Vec<&'static dyn VersionHandler>, RemodelError> {
    if names.is_empty() {
        return Ok(ApiVersion::all().into_iter().map(ApiVersion::handler).collect());
    }
    let mut seen = BTreeSet::new();
    let mut handlers = Vec::new();
    for name in names {
        let api = ApiVersion::parse(name)?;
        if seen.insert(api) {
            handlers.push(api.handler());
        }
    }
    Ok(handlers)
}

/// Regenerates every version in `handlers` concurrently, then the scaffolding.
pub async fn regenerate_all(
    handlers: Vec<&'static dyn VersionHandler>,
    config: Arc<RemodelConfig>,
) -> RunSummary {
    let tasks: Vec<_> = handlers
        .iter()
        .map(|&handler| {
            let config = Arc::clone(&config);
            let task = tokio::spawn(async move { regenerate_version(handler, &config).await });
            (handler.label(), task)
        })
        .collect();

    let mut versions = Vec::with_capacity(tasks.len());
    for (api, task) in tasks {
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(RemodelError::Aborted {
                api: api.clone(),
                reason: e.to_string(),
            }),
        };
        match &result {
            Ok(report) => info!(api = %api, changed = report.changed(), "version regenerated"),
            Err(e) => error!(api = %api, error = %e, "version failed"),
        }
        versions.push(VersionOutcome { api, result });
    }

    let succeeded: Vec<_> = handlers
        .iter()
        .zip(&versions)
        .filter(|(_, outcome)| outcome.result.is_ok())
        .map(|(&handler, _)| handler)
        .collect();
    let scaffolding = regenerate_scaffolding(&handlers, &succeeded, Arc::clone(&config)).await;
    if let Err(e) = &scaffolding {
        error!(error = %e, "failed to write crate scaffolding");
    }

    RunSummary {
        versions,
        scaffolding,
    }
}

/// Regenerates one version.
///
/// On any error nothing of this version is written, so the previous modules
/// stay as they were.
#[instrument(skip(handler, config), fields(api = %handler.label()))]
pub async fn regenerate_version(
    handler: &dyn VersionHandler,
    config: &RemodelConfig,
) -> Result<RegenerationReport, RemodelError> {
    let source = config.document_source(handler);
    let loaded = load_document(handler, &source, config.timeout).await?;
    let synthesis = synthesize(&loaded.document)?;

    let version_dir = config.version_dir(handler);
    let model_path = version_dir.join(MODEL_FILE);
    let previous = read_previous(&model_path).await?;
    if previous.is_none() {
        info!(path = %model_path.display(), "no previous model module, using default names");
    }

    let context = ModuleContext::new(&synthesis, handler);
    let outcome = merge(&synthesis, previous.as_deref(), &context)?;
    for dropped in &outcome.report.dropped {
        warn!(schema = %dropped.canonical, name = %dropped.name, "dropped rename of removed schema");
    }

    let mut files = vec![
        FileWrite::new(model_path, outcome.model_source),
        FileWrite::new(version_dir.join(CLIENT_FILE), outcome.client_source),
        FileWrite::new(version_dir.join(MOD_FILE), version_mod_source(&context)?),
    ];
    if config.snapshots {
        let snapshot_dir = config.snapshot_dir(handler);
        files.push(FileWrite::new(
            snapshot_dir.join(format!("original.{}", loaded.format.extension())),
            loaded.original.clone(),
        ));
        files.push(FileWrite::new(snapshot_dir.join(FIXED_SNAPSHOT), loaded.fixed_json()));
    }

    let written = if config.dry_run {
        Vec::new()
    } else {
        write_blocking(&synthesis.api, files.clone()).await?
    };

    Ok(RegenerationReport {
        api: synthesis.api.clone(),
        models: synthesis.models.len(),
        operations: synthesis.operations.len(),
        renames: outcome.report,
        files,
        written,
    })
}

/// Writes `Cargo.toml`, `lib.rs`, `shared.rs` and the package `mod.rs` files.
///
/// A version is declared when it succeeded in this run or its `mod.rs`
/// already exists, so a failed first run never declares a missing module.
async fn regenerate_scaffolding(
    handlers: &[&'static dyn VersionHandler],
    succeeded: &[&'static dyn VersionHandler],
    config: Arc<RemodelConfig>,
) -> Result<ScaffoldingReport, RemodelError> {
    let files = scaffold_files(handlers, succeeded, &config)?;
    let written = if config.dry_run {
        Vec::new()
    } else {
        write_blocking("scaffolding", files.clone()).await?
    };
    Ok(ScaffoldingReport { files, written })
}

/// Scaffolding files for the versions that are (or will be) on disk.
pub fn scaffold_files(
    handlers: &[&'static dyn VersionHandler],
    succeeded: &[&'static dyn VersionHandler],
    config: &RemodelConfig,
) -> Result<Vec<FileWrite>, RemodelError> {
    let mut packages: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let declared = ApiVersion::all().into_iter().map(ApiVersion::handler);
    for handler in handlers.iter().copied().chain(declared) {
        let present = succeeded.iter().any(|done| done.label() == handler.label())
            || config.version_dir(handler).join(MOD_FILE).is_file();
        if present {
            packages
                .entry(handler.package().to_string())
                .or_default()
                .insert(handler.version().to_string());
        }
    }

    let src = config.src_dir();
    let package_names: Vec<String> = packages.keys().cloned().collect();
    let mut files = vec![
        FileWrite::new(config.manifest_path(), generate_cargo_toml(&config.crate_name)),
        FileWrite::new(src.join("lib.rs"), rust_source("lib.rs", generate_lib(&package_names))?),
        FileWrite::new(src.join("shared.rs"), rust_source("shared.rs", generate_shared_module())?),
    ];
    for (package, versions) in &packages {
        let versions: Vec<String> = versions.iter().cloned().collect();
        files.push(FileWrite::new(
            src.join(package).join(MOD_FILE),
            rust_source(package, generate_package_mod(package, &versions))?,
        ));
    }
    Ok(files)
}

fn version_mod_source(context: &ModuleContext) -> Result<String, RemodelError> {
    rust_source(&context.api, generate_version_mod(context))
}

fn rust_source(label: &str, tokens: proc_macro2::TokenStream) -> Result<String, RemodelError> {
    Ok(format_code(&validate_code(label, &tokens)?))
}

/// Reads the previous model module; a missing file means a first run.
async fn read_previous(path: &Path) -> Result<Option<String>, RemodelError> {
    match tokio::fs::read_to_string(path).await {
        Ok(source) => Ok(Some(source)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RemodelError::Read {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

async fn write_blocking(api: &str, files: Vec<FileWrite>) -> Result<Vec<WrittenFile>, RemodelError> {
    tokio::task::spawn_blocking(move || write_files_atomic(&files))
        .await
        .map_err(|e| RemodelError::Aborted {
            api: api.to_string(),
            reason: format!("write task failed: {e}"),
        })?
}
