//! Application Lifecycle Abstraction
//!
//! Notifies the core about host visibility transitions so it can trade
//! metadata freshness for power draw: foreground sessions poll often,
//! backgrounded sessions drop to a slow cadence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Coarse application visibility phase supplied by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// Application is visible and active.
    Foreground,
    /// Application is hidden or minimized.
    Background,
    /// The host is mid-transition (e.g., app switcher shown). Treated as
    /// not-foreground for scheduling purposes.
    Transitioning,
}

impl LifecyclePhase {
    pub fn is_foreground(&self) -> bool {
        matches!(self, LifecyclePhase::Foreground)
    }
}

/// Lifecycle observer trait
///
/// # Platform Support
///
/// - **iOS**: UIApplication lifecycle notifications
/// - **Android**: Activity/Application lifecycle callbacks
/// - **Desktop**: Window focus/minimize events
/// - **Web**: Page Visibility API
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get the current lifecycle phase.
    async fn current_phase(&self) -> Result<LifecyclePhase>;

    /// Subscribe to phase changes. The stream yields each transition exactly
    /// once, in delivery order.
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

/// Stream of lifecycle phase changes.
#[async_trait]
pub trait LifecycleChangeStream: Send {
    /// Get the next phase transition.
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecyclePhase>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreground_predicate() {
        assert!(LifecyclePhase::Foreground.is_foreground());
        assert!(!LifecyclePhase::Background.is_foreground());
        assert!(!LifecyclePhase::Transitioning.is_foreground());
    }
}
