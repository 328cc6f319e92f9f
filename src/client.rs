//! Authenticated HTTP access to the upstream service.
//!
//! [`Upstream`] is the transport seam: [`HttpUpstream`] talks to a real
//! server through `reqwest`, while tests plug in an in-memory fake. [`Api`]
//! wraps either one with typed verbs and the error classifier that maps
//! upstream responses onto [`ProviderError`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::error::ProviderError;

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A response as the kernel sees it: status plus parsed JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed body; null when empty or not JSON.
    pub body: Json,
}

impl ApiResponse {
    /// Create a response.
    pub fn new(status: u16, body: Json) -> Self {
        Self { status, body }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport to the upstream service.
///
/// Implementations return every HTTP response, successful or not; only
/// transport failures are errors.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Send one request. `path` is relative to the base URL and may carry a query.
    async fn send(&self, method: Method, path: &str, body: Option<&Json>) -> Result<ApiResponse, ProviderError>;
}

/// Connection settings resolved from the provider block.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the upstream.
    pub url: String,
    /// API key sent as `X-Api-Key`.
    pub api_key: String,
    /// Extra headers merged into each request.
    pub extra_headers: BTreeMap<String, String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("extra_headers", &self.extra_headers.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create a config with the default timeout and no extra headers.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            extra_headers: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Parse and validate the base URL.
    ///
    /// The scheme must be http or https and a host must be present. A
    /// trailing slash is dropped so paths can be appended verbatim.
    pub fn base_url(&self) -> Result<Url, ProviderError> {
        let trimmed = self.url.trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| ProviderError::Configuration(format!("invalid url '{}': {}", self.url, e)))?;
        match parsed.scheme() {
            "http" | "https" => {},
            other => {
                return Err(ProviderError::Configuration(format!(
                    "url must use http or https; got '{}://'",
                    other
                )))
            },
        }
        if parsed.host_str().is_none() {
            return Err(ProviderError::Configuration(format!(
                "url '{}' must include a host",
                self.url
            )));
        }
        Ok(parsed)
    }

    fn default_headers(&self) -> Result<HeaderMap, ProviderError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| ProviderError::Configuration("api_key contains invalid characters".to_string()))?;
        headers.insert(HeaderName::from_static("x-api-key"), key);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &self.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ProviderError::Configuration(format!("invalid header name '{}'", name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                ProviderError::Configuration(format!("invalid value for header '{}'", name))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

/// `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    base_url: String,
    http: Client,
    cancel: CancellationToken,
}

impl HttpUpstream {
    /// Build the long-lived client. Requests abort once `cancel` fires.
    pub fn new(config: &ClientConfig, cancel: CancellationToken) -> Result<Self, ProviderError> {
        let base_url = config.base_url()?.as_str().trim_end_matches('/').to_string();
        let http = Client::builder()
            .default_headers(config.default_headers()?)
            .user_agent(concat!("sonarr-provider/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Configuration(format!("build http client: {}", e)))?;
        Ok(Self {
            base_url,
            http,
            cancel,
        })
    }

    async fn execute(&self, method: Method, path: &str, body: Option<&Json>) -> Result<ApiResponse, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::client(method.as_str(), path, e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::client(method.as_str(), path, e.to_string()))?;
        let body = if text.trim().is_empty() {
            Json::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Json::String(text))
        };
        Ok(ApiResponse::new(status, body))
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn send(&self, method: Method, path: &str, body: Option<&Json>) -> Result<ApiResponse, ProviderError> {
        let label = format!("{} {}", method, path);
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ProviderError::Cancelled(label)),
            result = self.execute(method, path, body) => result,
        }
    }
}

/// Typed verbs over an [`Upstream`], shared by every operation.
#[derive(Clone)]
pub struct Api {
    upstream: Arc<dyn Upstream>,
}

impl std::fmt::Debug for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Api").finish_non_exhaustive()
    }
}

impl Api {
    /// Wrap a transport.
    pub fn new(upstream: Arc<dyn Upstream>) -> Self {
        Self { upstream }
    }

    /// Send a request and return the raw response, successful or not.
    pub async fn send(&self, method: Method, path: &str, body: Option<&Json>) -> Result<ApiResponse, ProviderError> {
        let response = self.upstream.send(method.clone(), path, body).await?;
        debug!(method = %method, path = %path, status = response.status, "upstream request");
        Ok(response)
    }

    async fn expect_success(&self, method: Method, path: &str, body: Option<&Json>) -> Result<Json, ProviderError> {
        let response = self.send(method.clone(), path, body).await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            Err(classify(&method, path, &response))
        }
    }

    /// GET, failing on any non-success status.
    pub async fn get(&self, path: &str) -> Result<Json, ProviderError> {
        self.expect_success(Method::GET, path, None).await
    }

    /// GET, mapping 404 to `None`.
    pub async fn get_opt(&self, path: &str) -> Result<Option<Json>, ProviderError> {
        let response = self.send(Method::GET, path, None).await?;
        match response.status {
            404 => Ok(None),
            _ if response.is_success() => Ok(Some(response.body)),
            _ => Err(classify(&Method::GET, path, &response)),
        }
    }

    /// GET a collection endpoint.
    pub async fn list(&self, path: &str) -> Result<Vec<Json>, ProviderError> {
        match self.get(path).await? {
            Json::Array(items) => Ok(items),
            Json::Null => Ok(Vec::new()),
            other => Err(ProviderError::client(
                "GET",
                path,
                format!("expected a list, got {}", crate::value::json_type_name(&other)),
            )),
        }
    }

    /// POST a payload.
    pub async fn post(&self, path: &str, body: &Json) -> Result<Json, ProviderError> {
        self.expect_success(Method::POST, path, Some(body)).await
    }

}

/// Map a non-success response onto the error taxonomy.
pub fn classify(method: &Method, path: &str, response: &ApiResponse) -> ProviderError {
    match response.status {
        401 => ProviderError::AuthFailure {
            method: method.to_string(),
            path: path.to_string(),
        },
        status => ProviderError::client(
            method.as_str(),
            path,
            format!("HTTP {}: {}", status, error_message(&response.body)),
        ),
    }
}

/// Extract a readable message from an upstream error body.
///
/// Validation failures arrive as a list of `{propertyName, errorMessage}`;
/// everything else carries a `message` field or plain text.
fn error_message(body: &Json) -> String {
    match body {
        Json::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    let message = item.get("errorMessage").and_then(Json::as_str)?;
                    Some(match item.get("propertyName").and_then(Json::as_str) {
                        Some(property) if !property.is_empty() => format!("{}: {}", property, message),
                        _ => message.to_string(),
                    })
                })
                .collect();
            if messages.is_empty() {
                body.to_string()
            } else {
                messages.join("; ")
            }
        },
        Json::Object(members) => members
            .get("message")
            .and_then(Json::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Json::String(text) => text.clone(),
        Json::Null => "empty response".to_string(),
        other => other.to_string(),
    }
}
