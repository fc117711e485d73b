//! # Metadata Update Gate
//!
//! Deduplicates and rate-limits metadata writes to the playback engine,
//! regardless of which source produced them. Both the push and pull paths
//! terminate here, so the engine sees one well-behaved stream of updates:
//!
//! - the same song value arriving repeatedly (normal for both sources) is
//!   written once;
//! - two different values inside the minimum spacing window produce at most
//!   one write, and the newer value is picked up at the next natural
//!   scheduling opportunity rather than dropped forever.
//!
//! Offers are evaluated under an async mutex held across the engine write, so
//! no two candidate values are ever compared or applied concurrently. Gate
//! state advances only after a successful write; a rejected write leaves the
//! gate exactly as it was.

use crate::error::{MetadataError, Result};
use bridge_traits::playback::TrackMetadata;
use bridge_traits::time::Clock;
use core_runtime::events::{CoreEvent, EventBus, MetadataEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Target the gate forwards accepted values to.
///
/// Implemented over the active backend adapter by the session layer; the
/// indirection keeps the metadata pipeline ignorant of which backend is
/// currently active (or whether one is mid-switch).
#[async_trait::async_trait]
pub trait MetadataSink: Send + Sync {
    async fn apply(&self, metadata: &TrackMetadata) -> Result<()>;
}

/// Outcome of one offered candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Forwarded to the sink and committed.
    Applied,
    /// Rejected; the candidate did not reach the sink (or the sink refused it).
    Skipped(SkipReason),
}

/// Why the gate rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing to display.
    Empty,
    /// Display-equal to the last applied value.
    Duplicate,
    /// Inside the minimum spacing window.
    TooSoon,
    /// The sink rejected the write; gate state was left untouched.
    ApplyFailed,
}

impl SkipReason {
    fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Empty => "empty",
            SkipReason::Duplicate => "duplicate",
            SkipReason::TooSoon => "too_soon",
            SkipReason::ApplyFailed => "apply_failed",
        }
    }
}

#[derive(Default)]
struct GateState {
    last_applied: Option<TrackMetadata>,
    applied_at: Option<Duration>,
}

/// The dedup/throttle checkpoint between metadata sources and the engine.
pub struct UpdateGate {
    sink: Arc<dyn MetadataSink>,
    clock: Arc<dyn Clock>,
    min_spacing: Duration,
    bus: EventBus,
    state: Mutex<GateState>,
}

impl UpdateGate {
    pub fn new(
        sink: Arc<dyn MetadataSink>,
        clock: Arc<dyn Clock>,
        min_spacing: Duration,
        bus: EventBus,
    ) -> Self {
        Self {
            sink,
            clock,
            min_spacing,
            bus,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Offer a candidate value.
    ///
    /// Returns the decision; an `ApplyFailed` skip has already been logged.
    /// Apply errors are deliberately absorbed here; the retry is the next
    /// poll tick or push event, and playback is never affected.
    pub async fn offer(&self, candidate: &TrackMetadata) -> GateDecision {
        if candidate.is_empty() {
            return self.skipped(candidate, SkipReason::Empty);
        }

        let mut state = self.state.lock().await;

        if state
            .last_applied
            .as_ref()
            .is_some_and(|last| last == candidate)
        {
            return self.skipped(candidate, SkipReason::Duplicate);
        }

        let now = self.clock.monotonic();
        if let Some(applied_at) = state.applied_at {
            if now.saturating_sub(applied_at) < self.min_spacing {
                return self.skipped(candidate, SkipReason::TooSoon);
            }
        }

        match self.sink.apply(candidate).await {
            Ok(()) => {
                state.last_applied = Some(candidate.clone());
                state.applied_at = Some(now);
                debug!(display = %candidate.display(), "now-playing update applied");
                self.bus
                    .emit(CoreEvent::Metadata(MetadataEvent::Applied {
                        display: candidate.display(),
                    }))
                    .ok();
                GateDecision::Applied
            }
            Err(MetadataError::Apply(message)) => {
                warn!(display = %candidate.display(), error = %message, "metadata apply rejected");
                self.skipped(candidate, SkipReason::ApplyFailed)
            }
            Err(e) => {
                warn!(display = %candidate.display(), error = %e, "metadata apply failed");
                self.skipped(candidate, SkipReason::ApplyFailed)
            }
        }
    }

    fn skipped(&self, candidate: &TrackMetadata, reason: SkipReason) -> GateDecision {
        self.bus
            .emit(CoreEvent::Metadata(MetadataEvent::Skipped {
                display: candidate.display(),
                reason: reason.as_str().to_string(),
            }))
            .ok();
        GateDecision::Skipped(reason)
    }

    /// Last value successfully written to the engine, if any.
    pub async fn last_applied(&self) -> Option<TrackMetadata> {
        self.state.lock().await.last_applied.clone()
    }

    /// Clear gate state.
    ///
    /// Called on backend switch and session stop so a stale "last applied"
    /// value from the old backend cannot suppress the first legitimate update
    /// on the new one.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.last_applied = None;
        state.applied_at = None;
    }
}

impl std::fmt::Debug for UpdateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateGate")
            .field("min_spacing", &self.min_spacing)
            .finish_non_exhaustive()
    }
}
