use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Playback engine rejected command: {0}")]
    EngineRejected(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` if the operation may succeed when retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout(_) | BridgeError::OperationFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
