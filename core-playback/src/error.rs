//! # Playback Error Types
//!
//! Error taxonomy for backend adapter and selector operations. The split
//! matters for propagation: load/control/switch failures force the playback
//! state to `Error` and reach the caller's error listener, while metadata
//! apply failures are logged and recovered locally so metadata problems never
//! look like playback problems.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Load / Control Errors
    // ========================================================================
    /// Engine failed to accept the stream.
    #[error("Failed to load stream: {0}")]
    LoadFailed(String),

    /// Engine rejected a play/pause/stop command.
    #[error("Playback control failed: {0}")]
    ControlFailed(String),

    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    // ========================================================================
    // Backend Lifecycle Errors
    // ========================================================================
    /// Command addressed to a backend whose teardown has begun.
    #[error("Backend is detached")]
    BackendDetached,

    /// No backend is active for this session.
    #[error("No backend is active")]
    NoBackend,

    /// A backend is already active; switch instead of selecting.
    #[error("A backend is already active")]
    AlreadyActive,

    /// The replacement backend failed to come up during a hot-swap.
    #[error("Backend switch failed: {0}")]
    SwitchFailed(String),

    // ========================================================================
    // Metadata Errors
    // ========================================================================
    /// Engine rejected a now-playing write. Never affects playback state.
    #[error("Metadata apply rejected by engine: {0}")]
    MetadataApply(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Raw engine/bridge failure.
    #[error("Engine error: {0}")]
    Engine(#[from] BridgeError),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and the operation can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed(_)
                | PlaybackError::ControlFailed(_)
                | PlaybackError::SwitchFailed(_)
        ) || matches!(self, PlaybackError::Engine(e) if e.is_transient())
    }

    /// Returns `true` if this failure forces a transition to the `Error`
    /// playback state. Metadata and validation failures never do.
    pub fn affects_playback_state(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed(_)
                | PlaybackError::ControlFailed(_)
                | PlaybackError::SwitchFailed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
