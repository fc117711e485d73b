use std::time::Duration;
use thiserror::Error;

/// Errors inside the metadata pipeline.
///
/// Every variant is recovered locally: fetch failures wait for the next poll
/// tick, apply failures wait for the next candidate value. None of them are
/// surfaced as user-facing playback failures.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Now-playing fetch failed: {0}")]
    FetchFailed(String),

    #[error("Now-playing fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Now-playing fetch cancelled")]
    Cancelled,

    #[error("Now-playing endpoint returned HTTP {0}")]
    Http(u16),

    #[error("Engine rejected metadata write: {0}")]
    Apply(String),

    #[error("Metadata source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl MetadataError {
    /// Whether the next natural scheduling opportunity should retry.
    /// Cancellation is deliberate and is not retried.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, MetadataError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
