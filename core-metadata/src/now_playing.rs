//! Now-Playing HTTP Client
//!
//! Fetches the stream's now-playing value from the station endpoint. The
//! endpoint's body format varies by station software, so the parser accepts
//! both:
//!
//! - JSON: `{"nowPlaying": "SONG - ARTIST"}`
//! - Plain text: `SONG - ARTIST`
//!
//! Anything else (empty body, malformed JSON, a JSON object without the
//! field) degrades to "nothing playing" rather than an error: a station that
//! serves garbage should cost us nothing but a stale label.

use crate::error::{MetadataError, Result};
use bridge_traits::http::{HttpClient, HttpRequest, RetryPolicy};
use bridge_traits::playback::TrackMetadata;
use bridge_traits::BridgeError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Default timeout for one now-playing fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// JSON body shape served by stations that return structured data.
#[derive(Debug, Deserialize)]
struct NowPlayingBody {
    #[serde(rename = "nowPlaying")]
    now_playing: Option<String>,
}

/// Client for the now-playing endpoint.
pub struct NowPlayingClient {
    http_client: Arc<dyn HttpClient>,
    url: String,
    timeout: Duration,
}

impl NowPlayingClient {
    pub fn new(http_client: Arc<dyn HttpClient>, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Issue one GET against the endpoint and parse the body.
    ///
    /// Returns `Ok(None)` when the endpoint answered but had nothing usable
    /// to say. Retrying is left to the polling cadence, not the request:
    /// stacking retries behind a 5 s timeout would collide with the next tick.
    pub async fn fetch(&self) -> Result<Option<TrackMetadata>> {
        let request = HttpRequest::get(&self.url)
            .accept("application/json, text/plain;q=0.9")
            .timeout(self.timeout);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::none())
            .await
            .map_err(|e| match e {
                BridgeError::Timeout(elapsed) => MetadataError::Timeout(elapsed),
                other => MetadataError::FetchFailed(other.to_string()),
            })?;

        if !response.is_success() {
            return Err(MetadataError::Http(response.status));
        }

        let body = response
            .text()
            .map_err(|e| MetadataError::FetchFailed(e.to_string()))?;

        let parsed = parse_now_playing(&body);
        match &parsed {
            Some(metadata) => debug!(display = %metadata.display(), "now-playing fetched"),
            None => trace!("now-playing endpoint had nothing to report"),
        }
        Ok(parsed)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse a now-playing body, tolerating both supported formats.
pub fn parse_now_playing(body: &str) -> Option<TrackMetadata> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    // JSON first; a body that parses as a JSON object is never treated as a
    // song title even when the field is missing.
    if let Ok(parsed) = serde_json::from_str::<NowPlayingBody>(trimmed) {
        let raw = parsed.now_playing?;
        let metadata = TrackMetadata::from_raw(&raw);
        return (!metadata.is_empty()).then_some(metadata);
    }

    let metadata = TrackMetadata::from_raw(trimmed);
    (!metadata.is_empty()).then_some(metadata)
}
