//! Playback engine bridge traits and supporting types.
//!
//! These abstractions let the core drive a native audio playback engine
//! through a small imperative API while staying agnostic about which concrete
//! engine is active. Host applications register one engine implementation per
//! [`BackendKind`]; the core selects, drives, and hot-swaps them at runtime.
//!
//! Two properties of this contract matter more than anything else:
//!
//! - [`PlaybackEngine::update_now_playing`] must never interrupt an
//!   in-progress audio stream. Engines that can only change displayed
//!   metadata by reloading the stream are not valid implementations.
//! - [`PlaybackEngine::subscribe_events`] returns an independent stream per
//!   call, so the state pump and a metadata listener can subscribe
//!   separately without coordinating with each other.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Track Metadata
// ============================================================================

/// Separator used by stream sources that deliver `"song - artist"` as a
/// single combined string.
pub const COMBINED_SEPARATOR: &str = " - ";

/// Now-playing metadata for the active stream.
///
/// Immutable value type; a new instance replaces the old one atomically.
/// Sources may provide split title/artist fields, a combined raw string, or
/// both. Equality is defined on the normalized display string, which is what
/// downstream deduplication compares.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackMetadata {
    /// Track title, when the source provides it separately.
    pub title: Option<String>,
    /// Artist name, when the source provides it separately.
    pub artist: Option<String>,
    /// Original combined payload, kept for display fallback.
    pub raw_song: Option<String>,
}

impl TrackMetadata {
    /// Build metadata from already-split fields.
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: Some(artist.into()),
            raw_song: None,
        }
    }

    /// Build metadata with a title only.
    pub fn title_only(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            artist: None,
            raw_song: None,
        }
    }

    /// Parse a combined `"song - artist"` payload.
    ///
    /// The split happens on the *first* `" - "` occurrence, so artists with
    /// dashes in their name survive as long as the song title has none. A
    /// payload without the separator becomes a title-only value.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }

        match trimmed.split_once(COMBINED_SEPARATOR) {
            Some((song, artist)) if !song.trim().is_empty() => Self {
                title: Some(song.trim().to_string()),
                artist: Some(artist.trim().to_string()).filter(|a| !a.is_empty()),
                raw_song: Some(trimmed.to_string()),
            },
            _ => Self {
                title: Some(trimmed.to_string()),
                artist: None,
                raw_song: Some(trimmed.to_string()),
            },
        }
    }

    /// Canonical display string used for comparison and host UI surfaces.
    pub fn display(&self) -> String {
        match (&self.title, &self.artist) {
            (Some(title), Some(artist)) => format!("{} — {}", title, artist),
            (Some(title), None) => title.clone(),
            (None, Some(artist)) => artist.clone(),
            (None, None) => self.raw_song.clone().unwrap_or_default(),
        }
    }

    /// Returns `true` when the value carries nothing to display.
    pub fn is_empty(&self) -> bool {
        self.display().is_empty()
    }
}

impl PartialEq for TrackMetadata {
    /// Structural equality on the normalized display string.
    fn eq(&self, other: &Self) -> bool {
        self.display() == other.display()
    }
}

impl Eq for TrackMetadata {}

impl fmt::Display for TrackMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

// ============================================================================
// Backend Identity & Capabilities
// ============================================================================

/// Identifies which of the two interchangeable engine implementations is
/// meant. Hosts register one concrete [`PlaybackEngine`] per kind with their
/// [`EngineFactory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The host's preferred engine.
    Primary,
    /// The fallback engine callers can swap to at runtime.
    Alternate,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Primary => f.write_str("primary"),
            BackendKind::Alternate => f.write_str("alternate"),
        }
    }
}

/// How now-playing metadata reaches the core on this platform.
///
/// Fixed once at session start; the metadata pipeline is built around it and
/// never re-evaluates the choice per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataDelivery {
    /// The native engine pushes ICY/ID3-style metadata events. No network
    /// polling is performed for the entire session lifetime.
    EngineEvents,
    /// Metadata must be fetched from an HTTP endpoint on a timer.
    HttpPoll,
}

// ============================================================================
// Engine State & Events
// ============================================================================

/// Raw lifecycle state reported by a native engine.
///
/// Engines differ in how fine-grained their state reporting is; this enum is
/// the superset the bridge accepts. The core normalizes it down to its own
/// playback state before exposing it to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    /// No stream loaded.
    Idle,
    /// Stream accepted, resources being prepared.
    Loading,
    /// Waiting on network data before audio can continue.
    Buffering,
    Playing,
    Paused,
    Stopped,
    /// Stream ended on its own (rare for live streams).
    Ended,
    /// Engine failure; `message` is engine-specific.
    Failed { message: String },
}

/// Normalized playback state exposed by the core.
///
/// Exactly one value is held per session. It is mutated only by engine event
/// handling and command failure paths, never directly by callers. Leaving
/// [`PlaybackState::Error`] requires an explicit `load` or `play` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Buffering,
    Playing,
    Paused,
    Error { message: String },
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackState::Error { .. })
    }
}

impl From<EngineState> for PlaybackState {
    fn from(raw: EngineState) -> Self {
        match raw {
            EngineState::Idle | EngineState::Stopped | EngineState::Ended => {
                PlaybackState::Stopped
            }
            EngineState::Loading | EngineState::Buffering => PlaybackState::Buffering,
            EngineState::Playing => PlaybackState::Playing,
            EngineState::Paused => PlaybackState::Paused,
            EngineState::Failed { message } => PlaybackState::Error { message },
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => f.write_str("stopped"),
            PlaybackState::Buffering => f.write_str("buffering"),
            PlaybackState::Playing => f.write_str("playing"),
            PlaybackState::Paused => f.write_str("paused"),
            PlaybackState::Error { message } => write!(f, "error: {}", message),
        }
    }
}

/// Event emitted by a native engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The engine moved to a new lifecycle state.
    StateChanged(EngineState),
    /// Push-delivered metadata (only emitted by engines on platforms with
    /// [`MetadataDelivery::EngineEvents`]). Either field may be absent, and
    /// `title` may still carry a combined `"song - artist"` payload.
    MetadataChanged {
        title: Option<String>,
        artist: Option<String>,
    },
}

/// Stream of engine events.
///
/// Returns `None` once the engine has been released and no further events
/// will be delivered.
#[async_trait]
pub trait EngineEventStream: Send {
    async fn next(&mut self) -> Option<EngineEvent>;
}

// ============================================================================
// Engine Traits
// ============================================================================

/// Imperative API of one native playback engine.
///
/// All methods are forwarded more or less directly to the platform engine.
/// Implementations must be cheap to call concurrently (`Send + Sync`) and
/// must keep `update_now_playing` strictly out of the audio path: a metadata
/// write may fail, but it may never stall or restart the stream.
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Load a stream and optionally seed the host's now-playing surface.
    ///
    /// Implementations should begin buffering but not necessarily start
    /// audible playback; `play` is the explicit start signal.
    async fn load(&self, stream_url: &str, metadata: Option<&TrackMetadata>) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Adjust output volume, normalized to `0.0..=1.0`. Range validation is
    /// the caller's responsibility; engines may clamp.
    async fn set_volume(&self, volume: f32) -> Result<()>;

    /// Update the host-visible now-playing info (lock screen, notification).
    ///
    /// MUST NOT interrupt the audio stream.
    async fn update_now_playing(&self, metadata: &TrackMetadata) -> Result<()>;

    /// Current raw engine state.
    async fn state(&self) -> Result<EngineState>;

    /// Subscribe to engine events. Each call returns an independent stream.
    async fn subscribe_events(&self) -> Result<Box<dyn EngineEventStream>>;

    /// Release native resources, including audio focus / the output device.
    ///
    /// After `release` the engine must not emit further events, and every
    /// open event stream must terminate.
    async fn release(&self) -> Result<()>;
}

/// Constructs engines on demand.
///
/// The core never holds more than one engine at a time; during a backend
/// switch the previous engine is fully released before `create` is called
/// for the next one, so implementations may assume exclusive ownership of
/// the audio output device.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self, kind: BackendKind) -> Result<Arc<dyn PlaybackEngine>>;
}
