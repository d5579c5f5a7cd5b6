//! Error types for the API version registry.

use thiserror::Error;

/// Errors raised while selecting an API version or fixing its document.
#[derive(Debug, Error)]
pub enum DefineError {
    /// The requested API version is not declared in the registry.
    #[error("Unsupported API version '{requested}'. Supported versions: {}", .supported.join(", "))]
    UnsupportedVersion {
        requested: String,
        supported: Vec<String>,
    },

    /// A document fix could not find (or could not modify) its target.
    #[error("Document fix failed at '{pointer}': {reason}")]
    FixFailed { pointer: String, reason: String },
}

impl DefineError {
    pub(crate) fn fix(pointer: &str, reason: impl Into<String>) -> Self {
        Self::FixFailed {
            pointer: pointer.to_string(),
            reason: reason.into(),
        }
    }
}
