//! Remodel code generator library.
//!
//! Regenerates typed clients and models for CMS.gov APIs from their OpenAPI
//! documents, keeping the type names contributors chose by hand.
//!
//! Each API version declared in `remodel-define` goes through three stages:
//!
//! 1. **Loader** ([`document`]): fetch or read the document, detect JSON/YAML,
//!    apply the version's document fixes, parse it as OpenAPI 3.0
//! 2. **Synthesizer** ([`synth`]): derive one model record per schema and one
//!    operation record per (path, method)
//! 3. **Merger** ([`merge`]): recover renamed types from the previous model
//!    module, emit both modules with current names, self-check, then write
//!
//! ## Modules
//!
//! - [`codegen`] - Token generation for models, clients, runtime and module tree
//! - [`output`] - Validation, formatting and atomic file writing
//! - [`pipeline`] - Per-version orchestration and concurrent runs
//! - [`config`] - Output locations, timeout and document overrides
//! - [`cargo_gen`] - Cargo.toml generation for the generated crate
//! - [`naming`] - Identifier derivation
//! - [`parser`] - Path template helpers
//! - [`errors`] - Error types for the generator
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use remodel_gen::config::RemodelConfig;
//! use remodel_gen::pipeline::{regenerate_all, resolve_handlers};
//!
//! # async fn run() -> Result<(), remodel_gen::errors::RemodelError> {
//! let config = Arc::new(RemodelConfig::from_env()?);
//! let summary = regenerate_all(resolve_handlers(&[])?, config).await;
//! for outcome in &summary.versions {
//!     println!("{}: {}", outcome.api, if outcome.result.is_ok() { "ok" } else { "failed" });
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Generated Crate Structure
//!
//! ```text
//! cmsgov/
//! ├── Cargo.toml
//! └── src/
//!     ├── lib.rs
//!     ├── shared.rs            // ClientError, ClientOptions, RequestSpec, Transport
//!     └── provider_data/
//!         ├── mod.rs
//!         └── v1/
//!             ├── mod.rs
//!             ├── client.rs    // Client with one async method per operation
//!             └── model.rs     // one type per schema, each with its schema marker
//! ```

pub mod cargo_gen;
pub mod codegen;
pub mod config;
pub mod document;
pub mod errors;
pub mod merge;
pub mod naming;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod synth;

#[cfg(test)]
pub(crate) mod test_utils;
