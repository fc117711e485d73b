//! # Session Configuration Module
//!
//! Configuration for one playback session: stream/metadata endpoints, backend
//! selection, metadata delivery mode, polling cadence, and the bridge
//! implementations the core needs from the host.
//!
//! ## Overview
//!
//! The configuration uses a builder that enforces fail-fast validation: a
//! session cannot be constructed without an engine factory, and a polling
//! session cannot be constructed without a metadata URL and an HTTP client.
//! When the `desktop-shims` feature is enabled, a reqwest-backed HTTP client
//! is injected automatically if none is provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SessionConfig;
//! use bridge_traits::playback::{BackendKind, MetadataDelivery};
//!
//! let config = SessionConfig::builder()
//!     .stream_url("https://radio.example.com/live.aac")
//!     .metadata_url("https://radio.example.com/nowplaying")
//!     .delivery(MetadataDelivery::HttpPoll)
//!     .engine_factory(factory)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    playback::{BackendKind, EngineFactory, MetadataDelivery, TrackMetadata},
    Clock, HttpClient, LifecycleObserver, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

// ============================================================================
// Polling Configuration
// ============================================================================

/// Cadence and throttling parameters for the metadata pipeline.
///
/// The defaults implement the power/latency trade-off the scheduler is built
/// around: a visible app refreshes every few seconds, a backgrounded one only
/// every couple of minutes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingConfig {
    /// Fetch interval while the app is in the foreground.
    pub short_interval: Duration,
    /// Fetch interval while backgrounded or transitioning.
    pub long_interval: Duration,
    /// Minimum spacing between two metadata writes to the engine.
    pub min_spacing: Duration,
    /// Timeout for one now-playing HTTP fetch.
    pub fetch_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            short_interval: Duration::from_secs(5),
            long_interval: Duration::from_secs(120),
            min_spacing: Duration::from_secs(1),
            fetch_timeout: Duration::from_secs(5),
        }
    }
}

impl PollingConfig {
    /// Interval for the given lifecycle phase. Only a genuinely foreground
    /// app earns the short cadence.
    pub fn interval_for(&self, phase: bridge_traits::LifecyclePhase) -> Duration {
        if phase.is_foreground() {
            self.short_interval
        } else {
            self.long_interval
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.short_interval.is_zero() || self.long_interval.is_zero() {
            return Err(Error::Config(
                "Polling intervals must be greater than zero".to_string(),
            ));
        }

        if self.short_interval > self.long_interval {
            return Err(Error::Config(format!(
                "Foreground interval ({:?}) must not exceed background interval ({:?})",
                self.short_interval, self.long_interval
            )));
        }

        if self.fetch_timeout.is_zero() || self.fetch_timeout > Duration::from_secs(60) {
            return Err(Error::Config(
                "Fetch timeout must be between 1ms and 60s".to_string(),
            ));
        }

        if self.min_spacing > self.short_interval {
            return Err(Error::Config(format!(
                "Minimum update spacing ({:?}) defeats the foreground interval ({:?})",
                self.min_spacing, self.short_interval
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Configuration for one playback session.
///
/// Holds endpoints, the backend/delivery selection, tuning parameters, and
/// the bridge implementations. Use [`SessionConfigBuilder`] to construct.
#[derive(Clone)]
pub struct SessionConfig {
    /// Audio stream URL handed to the engine on load.
    pub stream_url: String,

    /// Now-playing endpoint; required when `delivery` is `HttpPoll`.
    pub metadata_url: Option<String>,

    /// Which engine implementation starts the session.
    pub backend: BackendKind,

    /// How metadata reaches the core on this platform. Fixed for the session.
    pub delivery: MetadataDelivery,

    /// Metadata to seed the host now-playing surface before the first update.
    pub initial_metadata: Option<TrackMetadata>,

    /// Cadence and throttling parameters.
    pub polling: PollingConfig,

    /// Event bus buffer size.
    pub events_capacity: usize,

    /// Engine factory (required).
    pub engine_factory: Arc<dyn EngineFactory>,

    /// HTTP client; required for polling sessions (desktop default: reqwest).
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Lifecycle observer (optional). Without one the session keeps the
    /// foreground cadence for its entire lifetime.
    pub lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,

    /// Time source (defaults to the system clock).
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("stream_url", &self.stream_url)
            .field("metadata_url", &self.metadata_url)
            .field("backend", &self.backend)
            .field("delivery", &self.delivery)
            .field("polling", &self.polling)
            .field("events_capacity", &self.events_capacity)
            .field("engine_factory", &"EngineFactory { ... }")
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field(
                "lifecycle_observer",
                &self
                    .lifecycle_observer
                    .as_ref()
                    .map(|_| "LifecycleObserver { ... }"),
            )
            .finish()
    }
}

impl SessionConfig {
    /// Creates a new builder for constructing a `SessionConfig`.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.stream_url.is_empty() {
            return Err(Error::Config("Stream URL cannot be empty".to_string()));
        }

        self.polling.validate()?;

        if self.events_capacity == 0 {
            return Err(Error::Config(
                "Event buffer capacity must be greater than zero".to_string(),
            ));
        }

        if self.delivery == MetadataDelivery::HttpPoll {
            if self.metadata_url.as_deref().unwrap_or_default().is_empty() {
                return Err(Error::Config(
                    "Metadata URL is required for HTTP-polled sessions. \
                     Use .metadata_url() to set it, or select MetadataDelivery::EngineEvents \
                     on platforms whose engine pushes metadata."
                        .to_string(),
                ));
            }

            if self.http_client.is_none() {
                return Err(Error::CapabilityMissing {
                    capability: "HttpClient".to_string(),
                    message: "An HTTP client is required for HTTP-polled sessions. \
                              Desktop: enable the 'desktop-shims' feature for the reqwest default. \
                              Mobile: inject a platform-native adapter."
                        .to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Some(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Option<Arc<dyn HttpClient>> {
    None
}

/// Builder for constructing [`SessionConfig`] instances.
#[derive(Default)]
pub struct SessionConfigBuilder {
    stream_url: Option<String>,
    metadata_url: Option<String>,
    backend: Option<BackendKind>,
    delivery: Option<MetadataDelivery>,
    initial_metadata: Option<TrackMetadata>,
    polling: Option<PollingConfig>,
    events_capacity: Option<usize>,
    engine_factory: Option<Arc<dyn EngineFactory>>,
    http_client: Option<Arc<dyn HttpClient>>,
    lifecycle_observer: Option<Arc<dyn LifecycleObserver>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SessionConfigBuilder {
    /// Sets the audio stream URL (required).
    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    /// Sets the now-playing endpoint URL.
    pub fn metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = Some(url.into());
        self
    }

    /// Sets the starting backend. Default: [`BackendKind::Primary`].
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.backend = Some(kind);
        self
    }

    /// Sets the metadata delivery mode (required).
    ///
    /// This is the platform capability flag: pass
    /// [`MetadataDelivery::EngineEvents`] only when the native engine pushes
    /// metadata events, otherwise [`MetadataDelivery::HttpPoll`].
    pub fn delivery(mut self, delivery: MetadataDelivery) -> Self {
        self.delivery = Some(delivery);
        self
    }

    /// Seeds the host now-playing surface before the first real update.
    pub fn initial_metadata(mut self, metadata: TrackMetadata) -> Self {
        self.initial_metadata = Some(metadata);
        self
    }

    /// Overrides the polling cadence parameters.
    pub fn polling(mut self, polling: PollingConfig) -> Self {
        self.polling = Some(polling);
        self
    }

    /// Overrides the event bus buffer size.
    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = Some(capacity);
        self
    }

    /// Sets the engine factory (required).
    pub fn engine_factory(mut self, factory: Arc<dyn EngineFactory>) -> Self {
        self.engine_factory = Some(factory);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the lifecycle observer implementation (optional).
    pub fn lifecycle_observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.lifecycle_observer = Some(observer);
        self
    }

    /// Sets the time source. Tests inject a manual clock here.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `SessionConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or inconsistent:
    /// - No stream URL, engine factory, or delivery mode
    /// - `HttpPoll` delivery without a metadata URL or HTTP client
    /// - Invalid polling cadence
    pub fn build(self) -> Result<SessionConfig> {
        let stream_url = self.stream_url.ok_or_else(|| {
            Error::Config("Stream URL is required. Use .stream_url() to set it.".to_string())
        })?;

        let delivery = self.delivery.ok_or_else(|| {
            Error::Config(
                "Metadata delivery mode is required. Use .delivery() to declare whether \
                 this platform's engine pushes metadata events or the core must poll."
                    .to_string(),
            )
        })?;

        let engine_factory = self.engine_factory.ok_or_else(|| Error::CapabilityMissing {
            capability: "EngineFactory".to_string(),
            message: "An engine factory is required so the session can construct playback \
                      backends. Register one engine per BackendKind and pass the factory \
                      via .engine_factory()."
                .to_string(),
        })?;

        let http_client = self.http_client.or_else(provide_default_http_client);

        let config = SessionConfig {
            stream_url,
            metadata_url: self.metadata_url,
            backend: self.backend.unwrap_or(BackendKind::Primary),
            delivery,
            initial_metadata: self.initial_metadata,
            polling: self.polling.unwrap_or_default(),
            events_capacity: self.events_capacity.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            engine_factory,
            http_client,
            lifecycle_observer: self.lifecycle_observer,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
