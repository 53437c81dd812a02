//! The HTTP primitive underneath every request.
//!
//! This module defines the [`Transport`] trait and a reqwest-based
//! implementation. The rest of the crate only talks to the trait, so tests
//! can plug in a scripted transport instead of a network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use url::Url;

use crate::error::{RestfulError, RestfulResult};

/// A fully prepared HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL, including query parameters
    pub url: Url,
    /// Header name/value pairs
    pub headers: Vec<(String, String)>,
    /// Request body; empty for GET
    pub body: Bytes,
    /// Per-call timeout; `None` means no limit
    pub timeout: Option<Duration>,
    /// Report an OK response with an empty body as a transport error
    pub raise_on_empty_body: bool,
}

impl HttpRequest {
    /// Returns the value of the first header with the given name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the value of the first query parameter with the given name.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }
}

/// Status and body of an HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response body
    pub body: Bytes,
}

impl RawResponse {
    /// Creates a new response.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Trait for sending HTTP requests to the query service.
///
/// Implementations report failures to deliver the request or read the
/// response as [`RestfulError::Transport`]. Any response that arrived,
/// whatever its status, is returned as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a POST request.
    async fn post(&self, request: HttpRequest) -> RestfulResult<RawResponse>;

    /// Sends a GET request.
    async fn get(&self, request: HttpRequest) -> RestfulResult<RawResponse>;
}

/// Type alias for a shared Transport.
pub type SharedTransport = Arc<dyn Transport>;

/// Transport backed by a [`reqwest::Client`].
///
/// Connection pooling and TLS are the reqwest client's business; pass a
/// preconfigured client with [`ReqwestTransport::with_client`] to control them.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default reqwest client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport around an existing reqwest client.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    async fn send(
        &self,
        mut builder: reqwest::RequestBuilder,
        request: HttpRequest,
    ) -> RestfulResult<RawResponse> {
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| RestfulError::Transport {
            message: format!("HTTP request failed: {e}"),
            is_timeout: e.is_timeout(),
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| RestfulError::Transport {
            message: format!("Failed to read response body: {e}"),
            is_timeout: e.is_timeout(),
        })?;

        if request.raise_on_empty_body && status == StatusCode::OK && body.is_empty() {
            return Err(RestfulError::transport(format!(
                "empty response body from {}",
                request.url.path()
            )));
        }

        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn post(&self, request: HttpRequest) -> RestfulResult<RawResponse> {
        let builder = self
            .http_client
            .post(request.url.clone())
            .body(request.body.clone());
        self.send(builder, request).await
    }

    async fn get(&self, request: HttpRequest) -> RestfulResult<RawResponse> {
        let builder = self.http_client.get(request.url.clone());
        self.send(builder, request).await
    }
}
