//! Run configuration.
//!
//! Defaults are overridden by `REMODEL_*` environment variables (a `.env`
//! file is loaded by the binary), which are in turn overridden by CLI flags.

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use remodel_define::VersionHandler;
use tracing::debug;

use crate::document::DocumentSource;
use crate::errors::RemodelError;

pub const ENV_OUTPUT_DIR: &str = "REMODEL_OUTPUT_DIR";
pub const ENV_OPENAPI_DIR: &str = "REMODEL_OPENAPI_DIR";
pub const ENV_CRATE_NAME: &str = "REMODEL_CRATE_NAME";
pub const ENV_TIMEOUT_SECS: &str = "REMODEL_TIMEOUT_SECS";

const DEFAULT_OUTPUT_DIR: &str = "cmsgov";
const DEFAULT_OPENAPI_DIR: &str = "openapi";
const DEFAULT_CRATE_NAME: &str = "cmsgov";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration shared read-only by every version of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemodelConfig {
    /// Root of the generated crate.
    pub output_dir: PathBuf,
    /// Root of the document snapshots.
    pub openapi_dir: PathBuf,
    /// Package name written to the generated `Cargo.toml`.
    pub crate_name: String,
    /// Loader timeout.
    pub timeout: Duration,
    /// Print generated files instead of writing them.
    pub dry_run: bool,
    /// Save original and fixed documents next to the generated modules.
    pub snapshots: bool,
    /// Document sources keyed by version label, replacing the handler's URL.
    pub document_overrides: BTreeMap<String, DocumentSource>,
}

impl Default for RemodelConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            openapi_dir: PathBuf::from(DEFAULT_OPENAPI_DIR),
            crate_name: DEFAULT_CRATE_NAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
            dry_run: false,
            snapshots: true,
            document_overrides: BTreeMap::new(),
        }
    }
}

impl RemodelConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, RemodelError> {
        Self::with_env_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which stands in for the environment.
    ///
    /// ## Errors
    ///
    /// [`RemodelError::Config`] for an empty crate name or a timeout that is
    /// not a positive number of seconds.
    pub fn with_env_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RemodelError> {
        let mut config = Self::default();
        if let Some(dir) = lookup(ENV_OUTPUT_DIR).filter(|value| !value.is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(ENV_OPENAPI_DIR).filter(|value| !value.is_empty()) {
            config.openapi_dir = PathBuf::from(dir);
        }
        if let Some(name) = lookup(ENV_CRATE_NAME) {
            config.crate_name = validate_crate_name(&name)?;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout = parse_timeout(&secs)?;
        }
        debug!(?config, "resolved configuration");
        Ok(config)
    }

    /// Source to load the document for `handler` from.
    pub fn document_source(&self, handler: &dyn VersionHandler) -> DocumentSource {
        self.document_overrides
            .get(&handler.label())
            .cloned()
            .unwrap_or_else(|| DocumentSource::Url(handler.document_url().to_string()))
    }

    /// `<output_dir>/src`.
    pub fn src_dir(&self) -> PathBuf {
        self.output_dir.join("src")
    }

    /// `<output_dir>/src/<package>/<version>`.
    pub fn version_dir(&self, handler: &dyn VersionHandler) -> PathBuf {
        self.src_dir().join(handler.package()).join(handler.version())
    }

    /// `<openapi_dir>/<package>/<version>`.
    pub fn snapshot_dir(&self, handler: &dyn VersionHandler) -> PathBuf {
        self.openapi_dir.join(handler.package()).join(handler.version())
    }

    /// Path of the generated crate's manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir.join("Cargo.toml")
    }
}

/// Checks a crate name: ASCII alphanumerics, `-` and `_`, not starting with a digit.
pub fn validate_crate_name(name: &str) -> Result<String, RemodelError> {
    let name = name.trim();
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(RemodelError::Config(format!("invalid crate name '{name}'")))
    }
}

/// Parses a positive number of seconds.
pub fn parse_timeout(secs: &str) -> Result<Duration, RemodelError> {
    match secs.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(RemodelError::Config(format!(
            "timeout must be a positive number of seconds, got '{secs}'"
        ))),
    }
}

/// Parses a `--document API=SOURCE` override.
///
/// ```
/// use remodel_gen::config::parse_document_override;
/// use remodel_gen::document::DocumentSource;
///
/// let (api, source) = parse_document_override("provider_data/v1=openapi/fixed.json").unwrap();
/// assert_eq!(api, "provider_data/v1");
/// assert!(matches!(source, DocumentSource::Path(_)));
/// ```
pub fn parse_document_override(value: &str) -> Result<(String, DocumentSource), RemodelError> {
    let Some((api, source)) = value.split_once('=') else {
        return Err(RemodelError::Config(format!(
            "document override '{value}' must look like API=SOURCE"
        )));
    };
    let (api, source) = (api.trim(), source.trim());
    if api.is_empty() || source.is_empty() {
        return Err(RemodelError::Config(format!(
            "document override '{value}' must look like API=SOURCE"
        )));
    }
    Ok((api.to_string(), DocumentSource::parse(source)))
}
