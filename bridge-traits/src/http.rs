//! HTTP Client Abstraction
//!
//! The core's only network traffic is the now-playing fetch, but that fetch
//! must run on every platform, so HTTP lives behind a trait. Hosts plug in
//! whatever client their platform favors; the core only ever sees
//! [`HttpRequest`] and [`HttpResponse`].

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Head,
}

/// A request the core wants executed.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
    /// Per-request deadline. Implementations that let this elapse must fail
    /// with [`BridgeError::Timeout`], not a generic error.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Shorthand for a plain GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the `Accept` header.
    pub fn accept(self, value: impl Into<String>) -> Self {
        self.header("Accept", value)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// A completed response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| BridgeError::OperationFailed(format!("JSON decode failed: {}", e)))
    }

    /// Decode the body as UTF-8 text.
    pub fn text(&self) -> Result<String> {
        std::str::from_utf8(&self.body)
            .map(str::to_owned)
            .map_err(|e| BridgeError::OperationFailed(format!("body is not UTF-8: {}", e)))
    }

    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` for 4xx statuses.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// `true` for 5xx statuses.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Retry behavior for one request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for backoff growth.
    pub max_delay: Duration,
    /// Double the delay after each failed attempt.
    pub exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries. Metadata polling prefers to skip a tick
    /// over stacking requests behind a slow endpoint.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Async HTTP client trait.
///
/// Implementations own connection pooling and TLS. They must honor the
/// request's `timeout` field and surface it as [`BridgeError::Timeout`].
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute a request with the implementation's default retry behavior.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute a request under an explicit retry policy.
    ///
    /// The default implementation ignores the policy and performs a single
    /// `execute`; clients with real retry support override this.
    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let _ = policy;
        self.execute(request).await
    }

    /// Quick connectivity probe. Defaults to optimistic.
    async fn is_connected(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_accumulates() {
        let request = HttpRequest::get("https://radio.example.com/nowplaying")
            .accept("application/json")
            .timeout(Duration::from_secs(5));

        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(
            request.headers.get("Accept").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn response_status_classification() {
        let ok = HttpResponse {
            status: 204,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(ok.is_success());

        let missing = HttpResponse {
            status: 404,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(missing.is_client_error() && !missing.is_server_error());
    }

    #[test]
    fn response_text_decoding() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from_static(b"Song - Artist"),
        };
        assert_eq!(response.text().unwrap(), "Song - Artist");
    }

    #[test]
    fn no_retry_policy_is_single_attempt() {
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
