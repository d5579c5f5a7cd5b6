//! Supported API versions and the per-version behavior behind them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::DefineError;
use crate::provider_data::ProviderDataV1;

/// An API major version that clients and models are generated for.
///
/// Each variant is backed by a [`VersionHandler`] which knows where the
/// version's OpenAPI document lives and how to correct it before parsing.
///
/// ## Examples
///
/// ```
/// use remodel_define::ApiVersion;
///
/// let api = ApiVersion::parse("provider_data/v1").unwrap();
/// assert_eq!(api, ApiVersion::ProviderDataV1);
/// assert_eq!(api.to_string(), "provider_data/v1");
/// assert_eq!(api.handler().package(), "provider_data");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
)]
pub enum ApiVersion {
    /// CMS Provider Data catalog (DKAN), version 1.
    #[serde(rename = "provider_data/v1")]
    #[strum(serialize = "provider_data/v1")]
    ProviderDataV1,
}

impl ApiVersion {
    /// Parses a version label such as `provider_data/v1`.
    ///
    /// ## Errors
    ///
    /// Returns [`DefineError::UnsupportedVersion`] listing the declared versions
    /// when `name` is unknown.
    pub fn parse(name: &str) -> Result<Self, DefineError> {
        Self::from_str(name.trim()).map_err(|_| DefineError::UnsupportedVersion {
            requested: name.to_string(),
            supported: Self::iter().map(|api| api.to_string()).collect(),
        })
    }

    /// Returns the handler implementing this version's behavior.
    pub fn handler(self) -> &'static dyn VersionHandler {
        match self {
            Self::ProviderDataV1 => &ProviderDataV1,
        }
    }

    /// Returns every declared version.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }
}

/// Behavior of one API major version.
///
/// The generator only talks to versions through this trait, so tests and
/// future APIs can plug in their own document source and fixes.
pub trait VersionHandler: Send + Sync {
    /// Package directory of the generated module (e.g. `provider_data`).
    fn package(&self) -> &'static str;

    /// Version directory of the generated module (e.g. `v1`).
    fn version(&self) -> &'static str;

    /// Human-readable API name used in generated documentation.
    fn title(&self) -> &'static str;

    /// Location of the published OpenAPI document.
    fn document_url(&self) -> &'static str;

    /// Base URL used when the document declares no absolute server.
    fn default_base_url(&self) -> &'static str;

    /// Link to the API's human documentation, if any.
    fn docs_url(&self) -> Option<&'static str> {
        None
    }

    /// Label used in logs and errors, `<package>/<version>`.
    fn label(&self) -> String {
        format!("{}/{}", self.package(), self.version())
    }

    /// Patches the raw document before it is parsed as OpenAPI.
    ///
    /// ## Errors
    ///
    /// Returns [`DefineError::FixFailed`] when a fix's target is missing.
    fn fix_document(&self, _document: &mut Value) -> Result<(), DefineError> {
        Ok(())
    }
}
