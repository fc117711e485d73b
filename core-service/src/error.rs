use thiserror::Error;

/// Aggregated error surface of the session façade.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] core_metadata::MetadataError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether this failure forced the playback state to `Error`.
    pub fn affects_playback_state(&self) -> bool {
        matches!(self, CoreError::Playback(e) if e.affects_playback_state())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
