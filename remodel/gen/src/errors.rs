//! Error types for the regeneration pipeline.

use remodel_define::DefineError;
use thiserror::Error;

/// Errors that can occur while regenerating one API version.
///
/// Every variant raised by the pipeline names the API version (`api`) it
/// belongs to, so a run over several versions can report each failure on
/// its own line.
#[derive(Debug, Error)]
pub enum RemodelError {
    /// The document could not be retrieved (HTTP status, network, timeout, IO).
    #[error("[{api}] failed to fetch OpenAPI document from {origin}: {message}")]
    DocumentFetch {
        api: String,
        origin: String,
        message: String,
    },

    /// The document is not valid JSON/YAML, not OpenAPI 3.0, or could not be fixed.
    #[error("[{api}] failed to parse OpenAPI document from {origin}: {reason}")]
    DocumentParse {
        api: String,
        origin: String,
        reason: String,
    },

    /// The document uses a construct the generator does not support.
    #[error("[{api}] unsupported schema construct `{construct}` at {location}")]
    UnsupportedSchema {
        api: String,
        location: String,
        construct: String,
    },

    /// The previous or freshly emitted modules are inconsistent.
    #[error("[{api}] merge consistency check failed: {reason}")]
    MergeConsistency { api: String, reason: String },

    /// Unknown API version or a failed document fix.
    #[error(transparent)]
    Define(#[from] DefineError),

    /// Failed to read an existing file
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("Failed to write output file '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The task regenerating a version stopped before producing a result.
    #[error("[{api}] regeneration aborted: {reason}")]
    Aborted { api: String, reason: String },
}

impl RemodelError {
    /// Returns `true` for transient failures worth retrying on a later run.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DocumentFetch { .. })
    }

    /// Returns the API version label the error belongs to, if any.
    pub fn api(&self) -> Option<&str> {
        match self {
            Self::DocumentFetch { api, .. }
            | Self::DocumentParse { api, .. }
            | Self::UnsupportedSchema { api, .. }
            | Self::MergeConsistency { api, .. }
            | Self::Aborted { api, .. } => Some(api),
            Self::Define(_) | Self::Read { .. } | Self::Write { .. } | Self::Config(_) => None,
        }
    }

    pub(crate) fn unsupported(
        api: &str,
        location: impl Into<String>,
        construct: impl Into<String>,
    ) -> Self {
        Self::UnsupportedSchema {
            api: api.to_string(),
            location: location.into(),
            construct: construct.into(),
        }
    }

    pub(crate) fn consistency(api: &str, reason: impl Into<String>) -> Self {
        Self::MergeConsistency {
            api: api.to_string(),
            reason: reason.into(),
        }
    }
}
