//! Connection management for the document store
//!
//! This module provides:
//! - The [`Transport`] abstraction used by the page fetcher
//! - An HTTP implementation backed by `reqwest`
//! - URL joining and basic-auth credential handling
//!
//! Requests are attempted exactly once. A failed request aborts the
//! pipeline that issued it.

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Method};
use tracing::trace;

use crate::config::ConnectionConfig;
use crate::error::{Result, TransportError};

/// Sends one request to the store and returns the raw response body.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Path relative to the store's base URL
    /// * `body` - JSON request body (may be empty)
    ///
    /// # Returns
    /// * `Result<Vec<u8>>` - Response body, or a transport error. Non-success
    ///   statuses keep their body inside [`TransportError::Status`].
    async fn send(&self, method: Method, path: &str, body: String) -> Result<Vec<u8>>;
}

/// Basic-auth credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

impl Credentials {
    /// Build credentials from optional user/password values.
    ///
    /// Returns `None` when no username is set; the password alone is ignored.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        username
            .filter(|u| !u.is_empty())
            .map(|username| Self { username, password })
    }
}

/// HTTP transport talking to an Elasticsearch-compatible store
pub struct HttpTransport {
    /// Shared HTTP client
    client: Client,

    /// Base URL without trailing slashes
    base_url: String,

    /// Optional basic-auth credentials
    credentials: Option<Credentials>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// # Arguments
    /// * `base_url` - Store URL, e.g. `https://localhost:9200`
    /// * `credentials` - Basic-auth credentials, if any
    /// * `config` - Connection configuration
    ///
    /// # Returns
    /// * `Result<Self>` - New transport or error
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        config: &ConnectionConfig,
    ) -> Result<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, method: Method, path: &str, body: String) -> Result<Vec<u8>> {
        let url = join_url(&self.base_url, path);
        trace!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, creds.password.as_deref());
        }

        let response = request.send().await.map_err(|e| TransportError::Request {
            method: method.to_string(),
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let data = response
            .bytes()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?
            .to_vec();

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.to_string(),
                reason: error_reason(&data),
                body: data,
            }
            .into());
        }

        Ok(data)
    }
}

/// Join a base URL and a relative path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Extract `error.reason` (or a plain string `error`) from an error body
fn error_reason(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    match value.get("error")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(obj) => obj
            .get("reason")
            .and_then(|r| r.as_str())
            .map(str::to_string),
        _ => None,
    }
}
