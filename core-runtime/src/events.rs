//! # Event Bus System
//!
//! Event-driven plumbing for the playback core using `tokio::sync::broadcast`.
//! The session coordinator and its internal components publish typed events;
//! callers subscribe and filter for the subset they render (state banner,
//! error toast, now-playing label).
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐    emit     ┌───────────┐
//! │ Backend Adapter├────────────>│           │
//! └────────────────┘             │           │
//! ┌────────────────┐    emit     │ EventBus  │   subscribe   ┌────────────┐
//! │ Update Gate    ├────────────>│ (broadcast├──────────────>│ Subscriber │
//! └────────────────┘             │  channel) │               └────────────┘
//! ┌────────────────┐    emit     │           │   subscribe   ┌────────────┐
//! │ Coordinator    ├────────────>│           ├──────────────>│ Subscriber │
//! └────────────────┘             └───────────┘               └────────────┘
//! ```
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` produces two receive errors:
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events. Non-fatal;
//!   the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: all senders dropped, i.e. session shutdown.
//!
//! Subscribers should handle `Lagged` gracefully and treat `Closed` as a
//! signal to exit.

use bridge_traits::playback::{BackendKind, PlaybackState};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default per-subscriber buffer for the event channel.
///
/// Subscribers that can't keep up will receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

// ============================================================================
// Core Event Types
// ============================================================================

/// Every event the session can publish, across all categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback state and failure events
    Playback(PlaybackEvent),
    /// Metadata pipeline events
    Metadata(MetadataEvent),
    /// Session/backend lifecycle events
    Session(SessionEvent),
}

impl CoreEvent {
    /// Short human-readable label for the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Metadata(e) => e.description(),
            CoreEvent::Session(e) => e.description(),
        }
    }

    /// How loudly this event should be surfaced.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Session(SessionEvent::SwitchFailed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::StateChanged { .. }) => EventSeverity::Info,
            CoreEvent::Session(_) => EventSeverity::Info,
            CoreEvent::Metadata(_) => EventSeverity::Debug,
        }
    }

    /// Returns `true` for events the error listener surface should deliver.
    pub fn is_error(&self) -> bool {
        self.severity() == EventSeverity::Error
    }
}

/// Severity buckets for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to playback state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The normalized playback state changed.
    StateChanged {
        /// Backend the state belongs to.
        backend: BackendKind,
        /// The new state.
        state: PlaybackState,
    },
    /// A playback command or the engine itself failed.
    Error {
        /// Backend the failure belongs to, if one was active.
        backend: Option<BackendKind>,
        /// What went wrong, in words a UI can show.
        message: String,
        /// Whether retrying is worthwhile.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::StateChanged { .. } => "Playback state changed",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Metadata Events
// ============================================================================

/// Events emitted by the metadata update gate.
///
/// These exist for observability only: metadata problems are never surfaced
/// as user-facing failures, so there is no error variant here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MetadataEvent {
    /// A new now-playing value was written to the engine.
    Applied {
        /// Normalized display string that was applied.
        display: String,
    },
    /// A candidate value was rejected by the gate.
    Skipped {
        /// Normalized display string of the rejected candidate.
        display: String,
        /// Why the gate rejected it (duplicate, spacing, apply failure).
        reason: String,
    },
}

impl MetadataEvent {
    fn description(&self) -> &str {
        match self {
            MetadataEvent::Applied { .. } => "Now-playing metadata applied",
            MetadataEvent::Skipped { .. } => "Now-playing metadata skipped",
        }
    }
}

// ============================================================================
// Session Events
// ============================================================================

/// Events related to session and backend lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A backend was selected for a fresh session.
    BackendSelected {
        /// The selected backend.
        kind: BackendKind,
    },
    /// A runtime hot-swap completed.
    BackendSwitched {
        /// Backend that was torn down.
        from: BackendKind,
        /// Backend now active.
        to: BackendKind,
    },
    /// The replacement backend failed to load during a hot-swap.
    ///
    /// The previous backend is NOT silently re-activated; recovery is
    /// caller-driven.
    SwitchFailed {
        /// Backend that failed to come up.
        kind: BackendKind,
        /// Load failure message.
        message: String,
    },
    /// The session was shut down and all resources released.
    Shutdown,
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::BackendSelected { .. } => "Backend selected",
            SessionEvent::BackendSwitched { .. } => "Backend switched",
            SessionEvent::SwitchFailed { .. } => "Backend switch failed",
            SessionEvent::Shutdown => "Session shut down",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// The session's broadcast channel for typed events.
///
/// Uses `tokio::sync::broadcast` internally:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned per subscriber)
/// - Lagging detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast one event to every live subscriber.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when there are none. Emitting into an empty bus is normal during
    /// startup, so callers typically ignore the result.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Open an independent subscription. Only events emitted after this
    /// call are delivered; nothing is replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Count of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Predicate deciding which events a filtered stream lets through.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering.
///
/// This backs the `on_state_change` / `on_error` subscription surfaces: the
/// coordinator hands out pre-filtered streams so callers only see the events
/// they asked for.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Wrap a raw receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function; only matching events are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, `RecvError::Closed` once all senders are gone.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn state_event(state: PlaybackState) -> CoreEvent {
        CoreEvent::Playback(PlaybackEvent::StateChanged {
            backend: BackendKind::Primary,
            state,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(state_event(PlaybackState::Playing)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Session(SessionEvent::BackendSelected {
            kind: BackendKind::Primary,
        });
        bus.emit(event.clone()).ok();

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut errors = EventStream::new(bus.subscribe()).filter(CoreEvent::is_error);

        bus.emit(state_event(PlaybackState::Playing)).ok();

        let error_event = CoreEvent::Playback(PlaybackEvent::Error {
            backend: Some(BackendKind::Primary),
            message: "engine lost the output device".to_string(),
            recoverable: true,
        });
        bus.emit(error_event.clone()).ok();

        // Only the error passes the filter.
        assert_eq!(errors.recv().await.unwrap(), error_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for _ in 0..5 {
            bus.emit(state_event(PlaybackState::Buffering)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_event_severity() {
        assert_eq!(
            CoreEvent::Playback(PlaybackEvent::Error {
                backend: None,
                message: "failed".to_string(),
                recoverable: false,
            })
            .severity(),
            EventSeverity::Error
        );

        assert_eq!(
            CoreEvent::Metadata(MetadataEvent::Applied {
                display: "So What — Miles Davis".to_string(),
            })
            .severity(),
            EventSeverity::Debug
        );

        assert_eq!(
            state_event(PlaybackState::Paused).severity(),
            EventSeverity::Info
        );
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = CoreEvent::Session(SessionEvent::BackendSwitched {
            from: BackendKind::Primary,
            to: BackendKind::Alternate,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("alternate"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());
    }
}
