//! End-to-end tests: regenerate a crate and verify it compiles.
//!
//! These invoke cargo on the generated crate and are ignored by default.

mod common;

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use common::{WIDGETS, Workspace, widget_document_with_thing};
use remodel_define::{ApiVersion, VersionHandler};
use remodel_gen::document::DocumentSource;
use remodel_gen::pipeline::regenerate_all;

fn cargo(args: &[&str], manifest: PathBuf) {
    let output = Command::new("cargo")
        .args(args)
        .arg("--manifest-path")
        .arg(&manifest)
        .output()
        .expect("Failed to run cargo");

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        panic!(
            "Generated crate failed `cargo {}`:\n\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            args.join(" "),
            stdout,
            stderr
        );
    }
}

/// Regenerates the widget API and the Provider Data fixture, renames a type by
/// hand, regenerates again and checks the crate still compiles.
#[tokio::test]
#[ignore = "slow: compiles generated code"]
async fn generated_crate_compiles_after_rename() {
    let mut workspace = Workspace::new();
    workspace.set_document(&WIDGETS, &widget_document_with_thing());
    let provider_data = ApiVersion::ProviderDataV1.handler();
    workspace.config.document_overrides.insert(
        provider_data.label(),
        DocumentSource::Path(
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/provider_data_v1.json"),
        ),
    );
    let handlers: Vec<&'static dyn VersionHandler> = vec![provider_data, &WIDGETS];
    let config = Arc::new(workspace.config.clone());

    let summary = regenerate_all(handlers.clone(), Arc::clone(&config)).await;
    assert!(summary.is_success(), "{summary:?}");
    cargo(&["check"], config.manifest_path());

    workspace.edit_model(&WIDGETS, "pub struct Widget {", "pub struct Gadget {");
    let summary = regenerate_all(handlers, Arc::clone(&config)).await;
    assert!(summary.is_success(), "{summary:?}");
    cargo(&["check"], config.manifest_path());
}
