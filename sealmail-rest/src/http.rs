//! HTTP transport backed by reqwest.

use crate::error::{RestError, RestResult};
use crate::transport::{HttpMethod, RestRequest, Transport};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Header carrying the client version, when configured.
pub const CLIENT_VERSION_HEADER: &str = "cv";

/// HTTP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Base URL the resource paths are appended to (e.g. `https://app.example.com/rest`).
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Client version sent in the `cv` header.
    pub client_version: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/rest".to_string(),
            timeout_secs: 60,
            client_version: None,
        }
    }
}

/// [`Transport`] over HTTP.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> RestResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RestError::Connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: RestRequest) -> RestResult<String> {
        let url = self.url(&request.path);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self
            .client
            .request(Self::method(request.method), &url)
            .header(ACCEPT, request.media_type.as_mime());
        if !request.query_params.is_empty() {
            builder = builder.query(&request.query_params);
        }
        if let Some(version) = &self.config.client_version {
            builder = builder.header(CLIENT_VERSION_HEADER, version);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, request.media_type.as_mime())
                .body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RestError::Connection(format!("{} {url} failed: {e}", request.method)))?;

        let status = response.status();
        if status.is_success() {
            return response
                .text()
                .await
                .map_err(|e| RestError::Connection(format!("failed to read response: {e}")));
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let message = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), %url, "request failed");
        Err(RestError::from_status(status.as_u16(), message, retry_after))
    }
}
