//! Loader behavior against a mock HTTP server.

mod common;

use std::time::Duration;

use common::{WIDGETS, widget_document};
use remodel_gen::document::{DocumentFormat, DocumentSource, load_document};
use remodel_gen::errors::RemodelError;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn serve(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn loads_json_document() {
    let body = serde_json::to_string(&widget_document()).unwrap();
    let server = serve("/openapi.json", ResponseTemplate::new(200).set_body_string(body.clone())).await;
    let source = DocumentSource::Url(format!("{}/openapi.json", server.uri()));

    let loaded = load_document(&WIDGETS, &source, TIMEOUT).await.unwrap();

    assert_eq!(loaded.format, DocumentFormat::Json);
    assert_eq!(loaded.original, body);
    assert_eq!(loaded.document.api, "widgets/v1");
    assert_eq!(loaded.document.raw, widget_document());
    assert_eq!(loaded.document.openapi.paths.paths.len(), 2);
}

#[tokio::test]
async fn loads_yaml_document_by_format_query() {
    let body = serde_yaml::to_string(&widget_document()).unwrap();
    let server = serve("/api", ResponseTemplate::new(200).set_body_string(body)).await;
    let source = DocumentSource::Url(format!("{}/api?format=yaml", server.uri()));

    let loaded = load_document(&WIDGETS, &source, TIMEOUT).await.unwrap();

    assert_eq!(loaded.format, DocumentFormat::Yaml);
    assert_eq!(loaded.document.raw, widget_document());
}

#[tokio::test]
async fn sniffs_yaml_without_a_hint() {
    let body = serde_yaml::to_string(&widget_document()).unwrap();
    let server = serve("/api", ResponseTemplate::new(200).set_body_string(body)).await;
    let source = DocumentSource::Url(format!("{}/api", server.uri()));

    let loaded = load_document(&WIDGETS, &source, TIMEOUT).await.unwrap();
    assert_eq!(loaded.format, DocumentFormat::Yaml);
}

#[tokio::test]
async fn error_status_is_fetch_error() {
    let server = serve("/openapi.json", ResponseTemplate::new(404)).await;
    let source = DocumentSource::Url(format!("{}/openapi.json", server.uri()));

    let err = load_document(&WIDGETS, &source, TIMEOUT).await.unwrap_err();

    match &err {
        RemodelError::DocumentFetch { api, origin, message } => {
            assert_eq!(api, "widgets/v1");
            assert!(origin.ends_with("/openapi.json"), "{origin}");
            assert!(message.contains("404"), "{message}");
        }
        other => panic!("expected DocumentFetch, got {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn slow_server_times_out() {
    let body = serde_json::to_string(&widget_document()).unwrap();
    let response = ResponseTemplate::new(200)
        .set_body_string(body)
        .set_delay(Duration::from_secs(3));
    let server = serve("/openapi.json", response).await;
    let source = DocumentSource::Url(format!("{}/openapi.json", server.uri()));

    let err = load_document(&WIDGETS, &source, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, RemodelError::DocumentFetch { .. }), "{err}");
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let server = serve(
        "/openapi.json",
        ResponseTemplate::new(200).set_body_string("{\"openapi\": \"3.0.2\", "),
    )
    .await;
    let source = DocumentSource::Url(format!("{}/openapi.json", server.uri()));

    let err = load_document(&WIDGETS, &source, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, RemodelError::DocumentParse { .. }), "{err}");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn other_openapi_versions_are_rejected() {
    let mut document = widget_document();
    document["openapi"] = json!("3.1.0");
    let server = serve(
        "/openapi.json",
        ResponseTemplate::new(200).set_body_string(document.to_string()),
    )
    .await;
    let source = DocumentSource::Url(format!("{}/openapi.json", server.uri()));

    let err = load_document(&WIDGETS, &source, TIMEOUT).await.unwrap_err();
    assert!(err.to_string().contains("3.1.0"), "{err}");
}

#[tokio::test]
async fn missing_file_is_fetch_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let source = DocumentSource::Path(dir.path().join("absent.json"));

    let err = load_document(&WIDGETS, &source, TIMEOUT).await.unwrap_err();
    assert!(matches!(err, RemodelError::DocumentFetch { .. }), "{err}");
}
