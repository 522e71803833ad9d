//! Transport Layer
//!
//! The transport performs the actual network call for a governed request and
//! hands back the status, headers and body. The governor never looks at the
//! body; it only reads the quota disclosure headers of successful responses.
//!
//! - **http**: `reqwest`-backed transport for the real API
//! - [`crate::testing::ScriptedTransport`]: in-memory transport for tests

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use http::HttpTransport;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// HTTP method of an outbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A request as seen by the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,

    /// Host name of the routing target
    pub host: String,

    /// Already percent-encoded path, starting with `/`
    pub path: String,

    /// Query parameters, encoded by the transport
    pub query: Vec<(String, String)>,

    /// Overrides the transport's default timeout
    pub timeout: Option<Duration>,
}

/// A successful response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Add a header, replacing any previous value
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as text, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the JSON body
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

/// Failure of the transport or an error status from the remote API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("[400] bad request: {message}")]
    BadRequest { message: String },

    #[error("[401] unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("[403] forbidden: {message}")]
    Forbidden { message: String },

    #[error("[404] not found: {message}")]
    NotFound { message: String },

    /// The remote enforcer rejected the call
    #[error("[429] rate limited by remote: {message}")]
    RateLimited {
        retry_after: Option<Duration>,
        message: String,
    },

    #[error("[{status}] server error: {message}")]
    Server { status: u16, message: String },

    #[error("[{status}] {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl TransportError {
    /// Classify an error status. Returns `None` for statuses below 400.
    pub fn from_status(status: u16, headers: &HeaderMap, body: &str) -> Option<Self> {
        if status < 400 {
            return None;
        }

        let message = error_message(body);
        let error = match status {
            400 => TransportError::BadRequest { message },
            401 => TransportError::Unauthorized { message },
            403 => TransportError::Forbidden { message },
            404 => TransportError::NotFound { message },
            429 => TransportError::RateLimited {
                retry_after: headers
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .filter(|secs| secs.is_finite() && *secs >= 0.0)
                    .map(Duration::from_secs_f64),
                message,
            },
            500..=599 => TransportError::Server { status, message },
            _ => TransportError::Status { status, message },
        };
        Some(error)
    }

    /// HTTP status, if the remote answered
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::BadRequest { .. } => Some(400),
            TransportError::Unauthorized { .. } => Some(401),
            TransportError::Forbidden { .. } => Some(403),
            TransportError::NotFound { .. } => Some(404),
            TransportError::RateLimited { .. } => Some(429),
            TransportError::Server { status, .. } | TransportError::Status { status, .. } => {
                Some(*status)
            }
            TransportError::Network(_) | TransportError::Timeout(_) => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TransportError::RateLimited { .. })
    }
}

/// Error bodies look like `{"status": {"message": "...", "status_code": 404}}`
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["status"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Performs governed calls
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        (**self).perform(request).await
    }
}
