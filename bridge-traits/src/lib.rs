//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host embedding
//! the playback core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core and platform-specific
//! implementations. Each trait represents a capability the core requires but
//! that must be implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Playback
//! - [`PlaybackEngine`](playback::PlaybackEngine) - Imperative API of one native audio engine
//! - [`EngineFactory`](playback::EngineFactory) - Constructs engines per [`BackendKind`](playback::BackendKind)
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP with per-request timeouts
//!
//! ### Platform Integration
//! - [`LifecycleObserver`](background::LifecycleObserver) - Foreground/background transitions
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Wall + monotonic time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing: the session config builder refuses to build a polling session
//! without an [`HttpClient`](http::HttpClient), and refuses to build any
//! session without an [`EngineFactory`](playback::EngineFactory).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.

pub mod background;
pub mod error;
pub mod http;
pub mod playback;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{LifecycleChangeStream, LifecycleObserver, LifecyclePhase};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{
    BackendKind, EngineEvent, EngineEventStream, EngineFactory, EngineState, MetadataDelivery,
    PlaybackEngine, PlaybackState, TrackMetadata,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
