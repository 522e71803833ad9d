//! Scripted transport for testing.
//!
//! Answers every request from a queue of scripted replies, falling back to a
//! default reply, and records what it was asked.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

/// Record of a performed request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: ApiRequest,
    pub timestamp: DateTime<Utc>,
}

type Reply = Result<ApiResponse, TransportError>;

struct ScriptState {
    default: Reply,
    queue: VecDeque<Reply>,
    requests: Vec<RecordedRequest>,
}

/// In-memory [`Transport`] with scripted replies.
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
    calls: AtomicUsize,
    latency: Option<Duration>,
}

impl ScriptedTransport {
    /// Reply with `response` unless a scripted reply is queued.
    pub fn new(response: ApiResponse) -> Self {
        Self::with_default(Ok(response))
    }

    /// Fail every unscripted request with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self::with_default(Err(error))
    }

    fn with_default(default: Reply) -> Self {
        Self {
            state: Mutex::new(ScriptState {
                default,
                queue: VecDeque::new(),
                requests: Vec::new(),
            }),
            calls: AtomicUsize::new(0),
            latency: None,
        }
    }

    /// Delay every reply by `latency` (tokio time, so paused clocks apply).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a reply for the next unanswered request.
    pub fn push_reply(&self, reply: Reply) {
        self.lock().queue.push_back(reply);
    }

    /// Replace the fallback reply.
    pub fn set_default(&self, reply: Reply) {
        self.lock().default = reply;
    }

    /// Number of requests performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests performed so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn perform(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = {
            let mut state = self.lock();
            state.requests.push(RecordedRequest {
                request: request.clone(),
                timestamp: Utc::now(),
            });
            match state.queue.pop_front() {
                Some(reply) => reply,
                None => state.default.clone(),
            }
        };

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        reply
    }
}

/// A 200 response carrying the given headers. Invalid names or values are skipped.
pub fn response_with_headers(headers: &[(&str, &str)]) -> ApiResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            map.insert(name, value);
        }
    }
    ApiResponse::new(200, map, &b"{}"[..])
}

/// A 200 response disclosing app and method quotas under the default header names.
pub fn disclosure_response(app: &str, method: &str) -> ApiResponse {
    response_with_headers(&[("x-app-rate-limit", app), ("x-method-rate-limit", method)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::HttpMethod;

    fn request(path: &str) -> ApiRequest {
        ApiRequest {
            method: HttpMethod::Get,
            host: "asia.api.riotgames.com".to_string(),
            path: path.to_string(),
            query: Vec::new(),
            timeout: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_replies_then_default() {
        let transport = ScriptedTransport::new(disclosure_response("100:120", "50:10"));
        transport.push_reply(Err(TransportError::NotFound {
            message: "Data not found".to_string(),
        }));

        assert!(transport.perform(&request("/a")).await.is_err());
        let response = transport.perform(&request("/b")).await.unwrap();
        assert_eq!(response.header("X-App-Rate-Limit"), Some("100:120"));

        assert_eq!(transport.calls(), 2);
        let paths: Vec<String> = transport
            .requests()
            .into_iter()
            .map(|r| r.request.path)
            .collect();
        assert_eq!(paths, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_failing_transport() {
        let transport = ScriptedTransport::failing(TransportError::Timeout(Duration::from_secs(3)));
        let err = transport.perform(&request("/")).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_secs(3)));

        transport.set_default(Ok(disclosure_response("1:1", "1:1")));
        assert!(transport.perform(&request("/")).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_uses_tokio_clock() {
        let transport = ScriptedTransport::new(disclosure_response("1:1", "1:1"))
            .with_latency(Duration::from_millis(250));

        let started = tokio::time::Instant::now();
        transport.perform(&request("/")).await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let response = response_with_headers(&[("bad header", "x"), ("x-ok", "fine\n")]);
        assert!(response.headers().is_empty());
    }
}
