//! Regenerates `provider_data/v1` from a trimmed copy of the published document.

mod common;

use std::path::PathBuf;

use common::Workspace;
use remodel_define::{ApiVersion, VersionHandler};
use remodel_gen::document::DocumentSource;
use remodel_gen::pipeline::regenerate_version;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/provider_data_v1.json")
}

fn workspace(handler: &dyn VersionHandler) -> Workspace {
    let mut workspace = Workspace::new();
    workspace
        .config
        .document_overrides
        .insert(handler.label(), DocumentSource::Path(fixture()));
    workspace
}

#[tokio::test]
async fn regenerates_provider_data_from_published_document() {
    let handler = ApiVersion::ProviderDataV1.handler();
    let workspace = workspace(handler);

    let report = regenerate_version(handler, &workspace.config).await.unwrap();
    assert_eq!(report.api, "provider_data/v1");
    // Twelve published operations plus the copied GET, PUT and PATCH of the
    // dataset listing path.
    assert_eq!(report.operations, 15);

    let model = workspace.model(handler);
    assert!(model.contains("pub struct Dataset {"), "{model}");
    assert!(model.contains("pub type Datasets = Vec<Dataset>;"), "{model}");
    assert!(model.contains("#[serde(rename = \"landingPage\""), "{model}");
    assert!(model.contains("pub struct DatastoreQueryResourcesItem {"), "{model}");
    assert!(model.contains("pub struct MetastoreSchemasDatasetItemsPatchRequest {"), "{model}");
    assert!(
        model.contains("pub struct MetastoreSchemasDatasetItemsIdentifierPatchRequest {"),
        "{model}"
    );
    assert!(model.contains("/// openapi-schema: \"dataset\""), "{model}");

    let client = workspace.client(handler);
    assert!(client.contains("https://data.cms.gov/provider-data/api/1"), "{client}");
    assert!(client.contains("pub async fn get_metastore_schemas_dataset_items("), "{client}");
    assert!(client.contains("pub async fn get_metastore_schemas_dataset_items_identifier("), "{client}");
    assert!(client.contains("pub async fn put_metastore_schemas_dataset_items("), "{client}");
    assert!(client.contains("pub async fn patch_metastore_schemas_dataset_items("), "{client}");
    assert!(
        client.contains("&MetastoreSchemasDatasetItemsPatchRequest"),
        "{client}"
    );
    assert!(client.contains("pub async fn get_datastore_query_dataset_id_index("), "{client}");
    assert!(client.contains("index: i64"), "{client}");
    assert!(client.contains("request.deep_object_query(\"resources\""), "{client}");
    assert!(!client.contains("/provider-data/api/1/"), "{client}");
}

#[tokio::test]
async fn renamed_provider_data_type_survives() {
    let handler = ApiVersion::ProviderDataV1.handler();
    let workspace = workspace(handler);
    regenerate_version(handler, &workspace.config).await.unwrap();

    workspace.edit_model(handler, "pub struct Dataset {", "pub struct CatalogDataset {");
    let report = regenerate_version(handler, &workspace.config).await.unwrap();
    assert_eq!(report.renames.carried.len(), 1);

    let model = workspace.model(handler);
    assert!(model.contains("pub type Datasets = Vec<CatalogDataset>;"), "{model}");
    let client = workspace.client(handler);
    assert!(client.contains("catalog_dataset: &CatalogDataset"), "{client}");
    assert!(!client.contains("&Dataset"), "{client}");
}
