//! HTTP Transport
//!
//! `reqwest`-backed transport for the remote API. Each governed call is one
//! HTTP transaction against `{scheme}://{host}{path}`; the API key is attached
//! as a header on every request.
//!
//! # Example
//!
//! ```ignore
//! use riftgate::config::TransportConfig;
//! use riftgate::transport::HttpTransport;
//!
//! let config = TransportConfig {
//!     api_key: Some("RGAPI-...".to_string()),
//!     ..TransportConfig::default()
//! };
//! let transport = HttpTransport::new(&config)?;
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use std::time::Duration;

use super::{ApiRequest, ApiResponse, HttpMethod, Transport, TransportError};
use crate::config::TransportConfig;

/// HTTP transport for the remote API
pub struct HttpTransport {
    /// Reqwest HTTP client
    client: reqwest::Client,

    /// `https` unless a test or proxy setup says otherwise
    scheme: String,

    /// Replaces `{scheme}://{host}` when set (proxies, local test servers)
    base_url: Option<String>,

    /// Authentication header, pre-validated
    api_key: Option<(HeaderName, HeaderValue)>,

    /// Timeout for requests that do not carry their own
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the API key header name or value is not a valid
    /// HTTP header, or the HTTP client cannot be built.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let timeout = config.timeout();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let api_key = match &config.api_key {
            Some(key) => {
                let name = HeaderName::from_bytes(config.api_key_header.as_bytes())
                    .with_context(|| {
                        format!("Invalid API key header name: {}", config.api_key_header)
                    })?;
                let mut value =
                    HeaderValue::from_str(key).context("API key is not a valid header value")?;
                value.set_sensitive(true);
                Some((name, value))
            }
            None => None,
        };

        Ok(Self {
            client,
            scheme: config.scheme.clone(),
            base_url: config
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            api_key,
            timeout,
        })
    }

    /// Get the default request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full URL for a request, including the encoded query string
    pub fn url_for(&self, request: &ApiRequest) -> String {
        let mut url = match &self.base_url {
            Some(base) => format!("{}{}", base, request.path),
            None => format!("{}://{}{}", self.scheme, request.host, request.path),
        };

        if !request.query.is_empty() {
            let query = request
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }

        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    /// Send the request and classify the response status
    ///
    /// # Errors
    ///
    /// Returns a classified [`TransportError`] for statuses of 400 and above,
    /// [`TransportError::Timeout`] when the request times out, and
    /// [`TransportError::Network`] for every other client failure.
    async fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request);
        let timeout = request.timeout.unwrap_or(self.timeout);

        tracing::debug!(method = request.method.as_str(), %url, "Sending HTTP request");

        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &url).timeout(timeout);
        if let Some((name, value)) = &self.api_key {
            builder = builder.header(name.clone(), value.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;

        if let Some(error) =
            TransportError::from_status(status, &headers, &String::from_utf8_lossy(&body))
        {
            tracing::debug!(%url, status, "HTTP request failed: {}", error);
            return Err(error);
        }

        Ok(ApiResponse::new(status, headers, body))
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(error.to_string())
    }
}
