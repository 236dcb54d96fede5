//! Outbound HTTP seam used by providers.
//!
//! Providers never talk to `reqwest` directly; they hand an [`HttpRequest`]
//! to an [`HttpTransport`], which lets tests count and script requests.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::errors::ProviderError;

/// A single GET request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Full request url including the query string
    pub url: Url,
    /// Extra headers, in insertion order
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Request for `url` with no extra headers.
    pub fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Add a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Value of the first header named `name`, ignoring case.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and body of a completed request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: Bytes,
}

impl HttpResponse {
    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP transport capability.
#[async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    /// Perform one request. Non-2xx statuses are returned, not raised.
    ///
    /// # Errors
    /// - `ProviderError::Network` - No response was received
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport over an existing client (proxy, TLS settings, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, ProviderError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ProviderError::Network {
                    reason: format!("Invalid header name '{name}': {e}"),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| ProviderError::Network {
                reason: format!("Invalid header value: {e}"),
            })?;
            headers.insert(name, value);
        }

        let response = self
            .client
            .get(request.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                reason: format!("Request failed: {e}"),
            })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| ProviderError::Network {
            reason: format!("Reading response body failed: {e}"),
        })?;

        Ok(HttpResponse { status, body })
    }
}
