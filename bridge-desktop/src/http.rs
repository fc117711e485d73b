//! Reqwest-backed HTTP client.
//!
//! Desktop implementation of the [`HttpClient`] bridge trait: pooled
//! connections, rustls TLS, and retry with exponential backoff on transient
//! failures (5xx, 429, network errors). Timeouts are classified as
//! [`BridgeError::Timeout`] so the metadata pipeline can tell a slow endpoint
//! from a broken one.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Fallback deadline for requests that carry no timeout of their own.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent("radio-core/0.1.0")
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    /// Wrap an already-configured reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn to_reqwest(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
        };

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }

    fn classify(error: reqwest::Error, deadline: Duration) -> BridgeError {
        if error.is_timeout() {
            BridgeError::Timeout(deadline)
        } else if error.is_connect() {
            BridgeError::OperationFailed(format!("connection failed: {}", error))
        } else {
            BridgeError::OperationFailed(error.to_string())
        }
    }

    fn backoff(policy: &RetryPolicy, completed_attempts: u32) -> Duration {
        if policy.exponential {
            (policy.base_delay * 2u32.pow(completed_attempts.saturating_sub(1)))
                .min(policy.max_delay)
        } else {
            policy.base_delay
        }
    }

    async fn try_once(&self, request: HttpRequest) -> Result<HttpResponse> {
        let deadline = request.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let response = self
            .to_reqwest(request)
            .send()
            .await
            .map_err(|e| Self::classify(e, deadline))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::OperationFailed(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let mut last_error = None;

        for attempt in 1..=policy.max_attempts.max(1) {
            debug!(url = %request.url, attempt, "issuing HTTP request");

            match self.try_once(request.clone()).await {
                Ok(response) if response.status >= 500 || response.status == 429 => {
                    warn!(status = response.status, attempt, "retryable HTTP status");
                    last_error = Some(BridgeError::OperationFailed(format!(
                        "HTTP {} error",
                        response.status
                    )));
                }
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(url = %request.url, attempt, error = %e, "HTTP request failed");
                    last_error = Some(e);
                }
            }

            if attempt < policy.max_attempts {
                let delay = Self::backoff(&policy, attempt);
                debug!(delay_ms = delay.as_millis() as u64, "backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| BridgeError::OperationFailed("retries exhausted".to_string())))
    }
}
