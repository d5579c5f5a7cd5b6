//! Document loading.
//!
//! Fetches or reads an OpenAPI document, detects whether it is JSON or YAML,
//! applies the version's document fixes on the raw value, and parses the
//! result as OpenAPI 3.0.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use openapiv3::OpenAPI;
use remodel_define::VersionHandler;
use serde_json::Value;
use strum::Display;
use tracing::{debug, info, instrument};

use crate::errors::RemodelError;

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Url(String),
    Path(PathBuf),
}

impl DocumentSource {
    /// Interprets `value` as a URL when it has an HTTP(S) scheme, else as a path.
    ///
    /// ```
    /// use remodel_gen::document::DocumentSource;
    ///
    /// assert!(matches!(DocumentSource::parse("https://example.com/api"), DocumentSource::Url(_)));
    /// assert!(matches!(DocumentSource::parse("openapi/fixed.json"), DocumentSource::Path(_)));
    /// ```
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Url(value.to_string())
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// File extension used for snapshots.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Guesses the format from the source: file extension first, then the
    /// `format`/`format_` query parameter of a URL.
    pub fn from_source(source: &DocumentSource) -> Option<Self> {
        match source {
            DocumentSource::Path(path) => path
                .extension()
                .and_then(|extension| extension.to_str())
                .and_then(Self::from_extension),
            DocumentSource::Url(url) => {
                let url = reqwest::Url::parse(url).ok()?;
                let by_extension = url
                    .path_segments()
                    .and_then(|mut segments| segments.next_back())
                    .and_then(|last| Path::new(last).extension())
                    .and_then(|extension| extension.to_str())
                    .and_then(Self::from_extension);
                by_extension.or_else(|| {
                    url.query_pairs()
                        .find(|(key, _)| key == "format" || key == "format_")
                        .and_then(|(_, value)| Self::from_extension(&value))
                })
            }
        }
    }
}

/// A parsed document for one API version.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    /// Version label, e.g. `provider_data/v1`.
    pub api: String,
    /// Where the document was loaded from.
    pub origin: String,
    /// The document after fixes, as JSON. Used to resolve deep references.
    pub raw: Value,
    pub openapi: OpenAPI,
}

/// A document together with the text it was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub original: String,
    pub format: DocumentFormat,
    pub document: ApiDocument,
}

impl LoadedDocument {
    /// The fixed document, pretty-printed for the `fixed.json` snapshot.
    pub fn fixed_json(&self) -> String {
        let mut text = serde_json::to_string_pretty(&self.document.raw).unwrap_or_default();
        text.push('\n');
        text
    }
}

/// Loads, fixes and parses the document for `handler` from `source`.
///
/// ## Errors
///
/// - [`RemodelError::DocumentFetch`] when the URL cannot be fetched, the server
///   answers with a non-success status, the request times out, or the file
///   cannot be read
/// - [`RemodelError::DocumentParse`] when the content is not JSON/YAML, a fix
///   cannot be applied, or the result is not an OpenAPI 3.0 document
#[instrument(skip(handler), fields(api = %handler.label()))]
pub async fn load_document(
    handler: &dyn VersionHandler,
    source: &DocumentSource,
    timeout: Duration,
) -> Result<LoadedDocument, RemodelError> {
    let text = fetch_text(&handler.label(), source, timeout).await?;
    info!(bytes = text.len(), "loaded OpenAPI document");
    parse_document(handler, source, text)
}

async fn fetch_text(
    api: &str,
    source: &DocumentSource,
    timeout: Duration,
) -> Result<String, RemodelError> {
    let fetch_error = |message: String| RemodelError::DocumentFetch {
        api: api.to_string(),
        origin: source.to_string(),
        message,
    };

    match source {
        DocumentSource::Path(path) => tokio::fs::read(path)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|e| fetch_error(e.to_string())),
        DocumentSource::Url(url) => {
            let client = reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| fetch_error(format!("failed to build HTTP client: {e}")))?;
            let response = client
                .get(url)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|e| fetch_error(e.to_string()))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| fetch_error(e.to_string()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// Parses document text, applies the handler's fixes and validates it as
/// OpenAPI 3.0.
///
/// When the source does not reveal the format, JSON is tried first, then YAML.
pub fn parse_document(
    handler: &dyn VersionHandler,
    source: &DocumentSource,
    text: String,
) -> Result<LoadedDocument, RemodelError> {
    let api = handler.label();
    let parse_error = |reason: String| RemodelError::DocumentParse {
        api: api.clone(),
        origin: source.to_string(),
        reason,
    };

    let (format, mut raw) = match DocumentFormat::from_source(source) {
        Some(DocumentFormat::Json) => (
            DocumentFormat::Json,
            serde_json::from_str::<Value>(&text).map_err(|e| parse_error(format!("invalid JSON: {e}")))?,
        ),
        Some(DocumentFormat::Yaml) => (
            DocumentFormat::Yaml,
            serde_yaml::from_str::<Value>(&text).map_err(|e| parse_error(format!("invalid YAML: {e}")))?,
        ),
        None => match serde_json::from_str::<Value>(&text) {
            Ok(value) => (DocumentFormat::Json, value),
            Err(_) => (
                DocumentFormat::Yaml,
                serde_yaml::from_str::<Value>(&text)
                    .map_err(|e| parse_error(format!("neither JSON nor YAML: {e}")))?,
            ),
        },
    };
    debug!(%format, "detected document format");

    if !raw.is_object() {
        return Err(parse_error("document root is not an object".to_string()));
    }
    handler
        .fix_document(&mut raw)
        .map_err(|e| parse_error(e.to_string()))?;

    let declared = raw.get("openapi").and_then(Value::as_str).unwrap_or_default();
    if !declared.starts_with("3.0") {
        return Err(parse_error(format!(
            "expected an OpenAPI 3.0 document, found version '{declared}'"
        )));
    }
    let openapi: OpenAPI = serde_json::from_value(raw.clone())
        .map_err(|e| parse_error(format!("not a valid OpenAPI document: {e}")))?;

    Ok(LoadedDocument {
        original: text,
        format,
        document: ApiDocument {
            api,
            origin: source.to_string(),
            raw,
            openapi,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestHandler, widget_document};

    static HANDLER: TestHandler = TestHandler::new("widgets", "v1");

    #[test]
    fn format_from_path_extension() {
        let source = DocumentSource::parse("openapi/provider_data/v1/original.yml");
        assert_eq!(DocumentFormat::from_source(&source), Some(DocumentFormat::Yaml));
        let source = DocumentSource::parse("fixed.JSON");
        assert_eq!(DocumentFormat::from_source(&source), Some(DocumentFormat::Json));
    }

    #[test]
    fn format_from_url_query() {
        let source = DocumentSource::parse("https://data.cms.gov/provider-data/api/1?format=yaml");
        assert_eq!(DocumentFormat::from_source(&source), Some(DocumentFormat::Yaml));
        let source = DocumentSource::parse("https://example.com/spec?format_=json");
        assert_eq!(DocumentFormat::from_source(&source), Some(DocumentFormat::Json));
        let source = DocumentSource::parse("https://example.com/spec");
        assert_eq!(DocumentFormat::from_source(&source), None);
    }

    #[test]
    fn sniffs_json_then_yaml() {
        let source = DocumentSource::parse("https://example.com/spec");
        let json = serde_json::to_string(&widget_document()).unwrap();
        let loaded = parse_document(&HANDLER, &source, json).unwrap();
        assert_eq!(loaded.format, DocumentFormat::Json);

        let yaml = serde_yaml::to_string(&widget_document()).unwrap();
        let loaded = parse_document(&HANDLER, &source, yaml).unwrap();
        assert_eq!(loaded.format, DocumentFormat::Yaml);
        assert_eq!(loaded.document.api, "widgets/v1");
        assert!(loaded.document.openapi.paths.paths.contains_key("/widgets"));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let source = DocumentSource::parse("spec.json");
        let err = parse_document(&HANDLER, &source, "{ not json".to_string()).unwrap_err();
        assert!(matches!(err, RemodelError::DocumentParse { .. }), "{err}");
        assert!(!err.is_retryable());
    }

    #[test]
    fn non_openapi_document_is_parse_error() {
        let source = DocumentSource::parse("spec.json");
        let err = parse_document(&HANDLER, &source, r#"{"swagger": "2.0"}"#.to_string())
            .unwrap_err();
        assert!(err.to_string().contains("OpenAPI 3.0"), "{err}");
    }

    #[test]
    fn fixed_json_ends_with_newline() {
        let source = DocumentSource::parse("spec.json");
        let json = serde_json::to_string(&widget_document()).unwrap();
        let loaded = parse_document(&HANDLER, &source, json).unwrap();
        assert!(loaded.fixed_json().ends_with("}\n"));
    }
}
