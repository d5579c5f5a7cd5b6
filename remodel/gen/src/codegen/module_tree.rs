//! `lib.rs` and `mod.rs` generation for the generated crate.
//!
//! The crate is laid out as `src/<package>/<version>/{client,model}.rs`.

use proc_macro2::TokenStream;
use quote::quote;

use super::{ModuleContext, ident, inner_doc_lines};

/// Generates `src/lib.rs`, declaring `shared` and every package.
pub fn generate_lib(packages: &[String]) -> TokenStream {
    let packages = packages.iter().map(|package| ident(package));
    let header = inner_doc_lines(
        "Clients and models for CMS.gov APIs.\n\n\
         Each API version lives in `<package>::<version>` with a `client` and a\n\
         `model` module. Shared runtime types are re-exported at the crate root.",
    );

    quote! {
        #header

        pub mod shared;
        #(pub mod #packages;)*

        pub use shared::{ClientError, ClientOptions};
    }
}

/// Generates `src/<package>/mod.rs`, declaring its versions.
pub fn generate_package_mod(package: &str, versions: &[String]) -> TokenStream {
    let header = inner_doc_lines(&format!("`{package}` API versions."));
    let versions = versions.iter().map(|version| ident(version));
    quote! {
        #header

        #(pub mod #versions;)*
    }
}

/// Generates `src/<package>/<version>/mod.rs`.
pub fn generate_version_mod(context: &ModuleContext) -> TokenStream {
    let header = inner_doc_lines(&format!("{} ({}).", context.title, context.api));
    quote! {
        #header

        pub mod client;
        pub mod model;

        pub use client::Client;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{format_code, validate_code};

    fn code(tokens: TokenStream) -> String {
        format_code(&validate_code("tree", &tokens).unwrap())
    }

    #[test]
    fn lib_declares_shared_and_packages() {
        let lib = code(generate_lib(&["provider_data".to_string()]));
        assert!(lib.contains("pub mod shared;"));
        assert!(lib.contains("pub mod provider_data;"));
        assert!(lib.contains("pub use shared::{ClientError, ClientOptions};"));
    }

    #[test]
    fn package_declares_versions() {
        let package = code(generate_package_mod(
            "provider_data",
            &["v1".to_string(), "v2".to_string()],
        ));
        assert!(package.contains("pub mod v1;\npub mod v2;"));
    }

    #[test]
    fn version_reexports_client() {
        let context = ModuleContext {
            api: "provider_data/v1".into(),
            title: "CMS Provider Data API".into(),
            description: None,
            document_version: "1".into(),
            base_url: "https://data.cms.gov/provider-data/api/1".into(),
            docs_url: None,
        };
        let version = code(generate_version_mod(&context));
        assert!(version.contains("//! CMS Provider Data API (provider_data/v1)."));
        assert!(version.contains("pub mod client;\npub mod model;"));
        assert!(version.contains("pub use client::Client;"));
    }
}
