//! Remodel Definition Library
//!
//! Declares the CMS.gov API versions that `remodel-gen` generates clients and
//! models for, and the per-version behavior the generator needs.
//!
//! ## Core Types
//!
//! - [`ApiVersion`] - Tagged enum of every supported API major version
//! - [`VersionHandler`] - Document location, base URL and document fixes for one version
//! - [`DefineError`] - Unsupported versions and failed document fixes
//!
//! ## Examples
//!
//! ```
//! use remodel_define::ApiVersion;
//!
//! for api in ApiVersion::all() {
//!     let handler = api.handler();
//!     println!("{} -> {}", handler.label(), handler.document_url());
//! }
//! ```

mod errors;
pub mod pointer;
pub mod provider_data;
mod version;

pub use errors::DefineError;
pub use provider_data::ProviderDataV1;
pub use version::{ApiVersion, VersionHandler};
