//! Runtime shared by every generated client.
//!
//! The generated `shared.rs` does not depend on any document, so it is the
//! same for every API version:
//!
//! - `ClientError`: errors returned by client methods
//! - `ClientOptions`: base URL override, timeout, retries and request echo
//! - `RequestSpec`: method, path, query pairs, headers and JSON body of one call
//! - `Transport`: sends a `RequestSpec` with `reqwest`, retrying transient failures

use proc_macro2::TokenStream;
use quote::quote;

/// Generates the `ClientError` enum.
pub fn generate_error_type() -> TokenStream {
    quote! {
        /// Errors that can occur when calling an API.
        #[derive(Debug, thiserror::Error)]
        pub enum ClientError {
            /// HTTP request failed (network error, timeout, etc.).
            #[error("HTTP request failed: {0}")]
            Http(#[from] reqwest::Error),

            /// Failed to deserialize a JSON response.
            #[error("JSON deserialization failed: {0}")]
            Json(#[from] serde_json::Error),

            /// The API answered with a non-success status code.
            #[error("API error (status {status}): {body}")]
            ApiError {
                /// HTTP status code from the response.
                status: u16,
                /// Response body text.
                body: String,
            },

            /// A parameter or body could not be serialized.
            #[error("failed to serialize `{name}`: {message}")]
            Serialization {
                /// Wire name of the parameter, or `body`.
                name: String,
                message: String,
            },
        }
    }
}

/// Generates `ClientOptions` and its defaults.
pub fn generate_options() -> TokenStream {
    quote! {
        /// Default request timeout.
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

        /// Default number of retries after a transient failure.
        pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

        /// Options for building a client.
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct ClientOptions {
            /// Overrides the version's `BASE_URL`.
            pub base_url: Option<String>,
            pub timeout: Duration,
            /// Retries after timeouts, connection failures, 429 and 5xx responses.
            pub retry_attempts: u32,
            /// Logs every request and response status through `tracing`.
            pub echo: bool,
        }

        impl Default for ClientOptions {
            fn default() -> Self {
                Self {
                    base_url: None,
                    timeout: DEFAULT_TIMEOUT,
                    retry_attempts: DEFAULT_RETRY_ATTEMPTS,
                    echo: false,
                }
            }
        }

        impl ClientOptions {
            pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
                self.base_url = Some(base_url.into());
                self
            }

            pub fn with_timeout(mut self, timeout: Duration) -> Self {
                self.timeout = timeout;
                self
            }

            pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
                self.retry_attempts = retry_attempts;
                self
            }

            pub fn with_echo(mut self, echo: bool) -> Self {
                self.echo = echo;
                self
            }
        }
    }
}

/// Generates `RequestSpec` and the query serialization helpers.
pub fn generate_request_spec() -> TokenStream {
    quote! {
        /// One prepared API call.
        #[derive(Debug, Clone, PartialEq)]
        pub struct RequestSpec {
            method: reqwest::Method,
            path: String,
            query: Vec<(String, String)>,
            headers: Vec<(String, String)>,
            body: Option<String>,
        }

        impl RequestSpec {
            pub fn new(method: reqwest::Method, path: impl Into<String>) -> Self {
                Self {
                    method,
                    path: path.into(),
                    query: Vec::new(),
                    headers: Vec::new(),
                    body: None,
                }
            }

            /// Adds a form-style query parameter.
            ///
            /// Arrays repeat the parameter; objects add one pair per property.
            pub fn query<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), ClientError> {
                match to_value(name, value)? {
                    Value::Null => {}
                    Value::Array(items) => {
                        for item in items {
                            if !item.is_null() {
                                self.query.push((name.to_string(), text(&item)));
                            }
                        }
                    }
                    Value::Object(properties) => {
                        for (key, item) in properties {
                            if !item.is_null() {
                                self.query.push((key, text(&item)));
                            }
                        }
                    }
                    other => self.query.push((name.to_string(), text(&other))),
                }
                Ok(())
            }

            /// Adds a `deepObject` query parameter: `name[key][0]=value`.
            pub fn deep_object_query<T: Serialize + ?Sized>(
                &mut self,
                name: &str,
                value: &T,
            ) -> Result<(), ClientError> {
                flatten(name.to_string(), to_value(name, value)?, &mut self.query);
                Ok(())
            }

            /// Adds a header.
            pub fn header<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), ClientError> {
                let value = to_value(name, value)?;
                if !value.is_null() {
                    self.headers.push((name.to_string(), text(&value)));
                }
                Ok(())
            }

            /// Sets the JSON request body.
            pub fn json_body<T: Serialize + ?Sized>(&mut self, body: &T) -> Result<(), ClientError> {
                let body = serde_json::to_string(body).map_err(|e| ClientError::Serialization {
                    name: "body".to_string(),
                    message: e.to_string(),
                })?;
                self.body = Some(body);
                Ok(())
            }

            pub fn method(&self) -> &reqwest::Method {
                &self.method
            }

            pub fn path(&self) -> &str {
                &self.path
            }

            pub fn query_pairs(&self) -> &[(String, String)] {
                &self.query
            }

            pub fn headers(&self) -> &[(String, String)] {
                &self.headers
            }

            pub fn body(&self) -> Option<&str> {
                self.body.as_deref()
            }
        }

        fn to_value<T: Serialize + ?Sized>(name: &str, value: &T) -> Result<Value, ClientError> {
            serde_json::to_value(value).map_err(|e| ClientError::Serialization {
                name: name.to_string(),
                message: e.to_string(),
            })
        }

        fn text(value: &Value) -> String {
            match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }
        }

        fn flatten(prefix: String, value: Value, out: &mut Vec<(String, String)>) {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for (index, item) in items.into_iter().enumerate() {
                        flatten(format!("{prefix}[{index}]"), item, out);
                    }
                }
                Value::Object(properties) => {
                    for (key, item) in properties {
                        flatten(format!("{prefix}[{key}]"), item, out);
                    }
                }
                other => out.push((prefix, text(&other))),
            }
        }

        /// Percent-encodes a value for use as one path segment.
        pub fn encode_path_segment(value: impl std::fmt::Display) -> String {
            let value = value.to_string();
            let mut encoded = String::with_capacity(value.len());
            for byte in value.bytes() {
                match byte {
                    b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                        encoded.push(char::from(byte));
                    }
                    other => encoded.push_str(&format!("%{other:02X}")),
                }
            }
            encoded
        }
    }
}

/// Generates `Transport`.
pub fn generate_transport() -> TokenStream {
    quote! {
        /// Sends requests for a generated client.
        #[derive(Debug, Clone)]
        pub struct Transport {
            http: reqwest::Client,
            base_url: String,
            retry_attempts: u32,
            echo: bool,
        }

        impl Transport {
            /// Builds a transport for `default_base_url`, unless the options override it.
            pub fn new(default_base_url: &str, options: ClientOptions) -> Result<Self, ClientError> {
                let http = reqwest::Client::builder().timeout(options.timeout).build()?;
                let base_url = options
                    .base_url
                    .unwrap_or_else(|| default_base_url.to_string())
                    .trim_end_matches('/')
                    .to_string();
                Ok(Self {
                    http,
                    base_url,
                    retry_attempts: options.retry_attempts,
                    echo: options.echo,
                })
            }

            pub fn base_url(&self) -> &str {
                &self.base_url
            }

            async fn execute(&self, request: &RequestSpec) -> Result<reqwest::Response, ClientError> {
                let url = format!("{}{}", self.base_url, request.path);
                let mut attempt = 0u32;
                loop {
                    let mut builder = self
                        .http
                        .request(request.method.clone(), &url)
                        .query(&request.query);
                    for (name, value) in &request.headers {
                        builder = builder.header(name.as_str(), value.as_str());
                    }
                    if let Some(body) = &request.body {
                        builder = builder
                            .header(reqwest::header::CONTENT_TYPE, "application/json")
                            .body(body.clone());
                    }
                    if self.echo {
                        tracing::info!(method = %request.method, %url, query = ?request.query, "sending request");
                    }

                    let outcome = builder.send().await;
                    let retryable = match &outcome {
                        Ok(response) => is_retryable_status(response.status()),
                        Err(error) => error.is_timeout() || error.is_connect(),
                    };
                    if retryable && attempt < self.retry_attempts {
                        let delay = Duration::from_millis(250u64.saturating_mul(2u64.saturating_pow(attempt)));
                        tracing::debug!(attempt, ?delay, %url, "retrying request");
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    let response = outcome?;
                    let status = response.status();
                    if self.echo {
                        tracing::info!(status = status.as_u16(), %url, "received response");
                    }
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(ClientError::ApiError {
                            status: status.as_u16(),
                            body,
                        });
                    }
                    return Ok(response);
                }
            }

            /// Sends the request and decodes a JSON response.
            pub async fn send_json<T: DeserializeOwned>(&self, request: RequestSpec) -> Result<T, ClientError> {
                let response = self.execute(&request).await?;
                let body = response.text().await?;
                Ok(serde_json::from_str(&body)?)
            }

            /// Sends the request and returns the response body as text.
            pub async fn send_text(&self, request: RequestSpec) -> Result<String, ClientError> {
                let response = self.execute(&request).await?;
                Ok(response.text().await?)
            }

            /// Sends the request and discards the response body.
            pub async fn send_empty(&self, request: RequestSpec) -> Result<(), ClientError> {
                self.execute(&request).await?;
                Ok(())
            }
        }

        fn is_retryable_status(status: reqwest::StatusCode) -> bool {
            status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
    }
}

/// Generates the complete `shared.rs`.
pub fn generate_shared_module() -> TokenStream {
    let error = generate_error_type();
    let options = generate_options();
    let request = generate_request_spec();
    let transport = generate_transport();

    quote! {
        //! Runtime shared by the generated API clients.

        use std::time::Duration;

        use serde::Serialize;
        use serde::de::DeserializeOwned;
        use serde_json::Value;

        #error
        #options
        #request
        #transport
    }
}
