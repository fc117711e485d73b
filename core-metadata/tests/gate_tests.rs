//! Update gate behavior: dedup, minimum spacing, commit-on-success, reset.

use async_trait::async_trait;
use bridge_traits::playback::TrackMetadata;
use bridge_traits::time::Clock;
use chrono::{DateTime, Utc};
use core_metadata::{GateDecision, MetadataError, MetadataSink, SkipReason, UpdateGate};
use core_runtime::events::{CoreEvent, EventBus, MetadataEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Test doubles
// ============================================================================

/// Manually advanced clock so spacing tests are deterministic.
struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Duration::ZERO),
        })
    }

    fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        *self.now.lock().unwrap()
    }
}

/// Sink recording every applied display string.
struct RecordingSink {
    applied: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            applied: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataSink for RecordingSink {
    async fn apply(&self, metadata: &TrackMetadata) -> Result<(), MetadataError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MetadataError::Apply("media session gone".to_string()));
        }
        self.applied.lock().unwrap().push(metadata.display());
        Ok(())
    }
}

fn gate_with(
    sink: Arc<RecordingSink>,
    clock: Arc<ManualClock>,
    min_spacing: Duration,
) -> (UpdateGate, EventBus) {
    let bus = EventBus::new(32);
    let gate = UpdateGate::new(sink, clock, min_spacing, bus.clone());
    (gate, bus)
}

const SPACING: Duration = Duration::from_secs(1);

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn duplicate_offers_reach_the_sink_once() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let (gate, _bus) = gate_with(Arc::clone(&sink), Arc::clone(&clock), SPACING);

    let song = TrackMetadata::from_raw("Blue Train - John Coltrane");
    assert_eq!(gate.offer(&song).await, GateDecision::Applied);

    clock.advance(Duration::from_secs(5));
    // Same normalized display string, different construction path.
    let same_song = TrackMetadata::new("Blue Train", "John Coltrane");
    assert_eq!(
        gate.offer(&same_song).await,
        GateDecision::Skipped(SkipReason::Duplicate)
    );

    assert_eq!(sink.applied(), vec!["Blue Train — John Coltrane"]);
}

#[tokio::test]
async fn rapid_different_values_are_spaced_not_dropped() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let (gate, _bus) = gate_with(Arc::clone(&sink), Arc::clone(&clock), SPACING);

    let first = TrackMetadata::from_raw("Track One - Artist");
    let second = TrackMetadata::from_raw("Track Two - Artist");

    assert_eq!(gate.offer(&first).await, GateDecision::Applied);

    clock.advance(Duration::from_millis(300));
    assert_eq!(
        gate.offer(&second).await,
        GateDecision::Skipped(SkipReason::TooSoon)
    );
    assert_eq!(sink.applied().len(), 1);

    // The later value arrives again at the next scheduling opportunity and
    // is applied once spacing has elapsed; it was never dropped forever.
    clock.advance(Duration::from_millis(800));
    assert_eq!(gate.offer(&second).await, GateDecision::Applied);
    assert_eq!(
        sink.applied(),
        vec!["Track One — Artist", "Track Two — Artist"]
    );
}

#[tokio::test]
async fn empty_candidates_never_reach_the_sink() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let (gate, _bus) = gate_with(Arc::clone(&sink), clock, SPACING);

    assert_eq!(
        gate.offer(&TrackMetadata::default()).await,
        GateDecision::Skipped(SkipReason::Empty)
    );
    assert!(sink.applied().is_empty());
}

#[tokio::test]
async fn failed_apply_leaves_gate_state_untouched() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let (gate, _bus) = gate_with(Arc::clone(&sink), Arc::clone(&clock), SPACING);

    let song = TrackMetadata::from_raw("Track One - Artist");

    sink.fail.store(true, Ordering::SeqCst);
    assert_eq!(
        gate.offer(&song).await,
        GateDecision::Skipped(SkipReason::ApplyFailed)
    );
    assert!(gate.last_applied().await.is_none());

    // The same value offered after recovery is NOT considered a duplicate:
    // the gate only remembers successful writes.
    sink.fail.store(false, Ordering::SeqCst);
    assert_eq!(gate.offer(&song).await, GateDecision::Applied);
    assert_eq!(sink.applied(), vec!["Track One — Artist"]);
}

#[tokio::test]
async fn reset_clears_dedup_and_spacing() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let (gate, _bus) = gate_with(Arc::clone(&sink), Arc::clone(&clock), SPACING);

    let song = TrackMetadata::from_raw("Track One - Artist");
    assert_eq!(gate.offer(&song).await, GateDecision::Applied);

    // A backend switch resets the gate; the same value must go through to
    // the freshly loaded backend without waiting out the spacing window.
    gate.reset().await;
    assert_eq!(gate.offer(&song).await, GateDecision::Applied);
    assert_eq!(sink.applied().len(), 2);
}

#[tokio::test]
async fn gate_decisions_are_observable_on_the_bus() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let (gate, bus) = gate_with(sink, clock, SPACING);
    let mut sub = bus.subscribe();

    let song = TrackMetadata::from_raw("Track One - Artist");
    gate.offer(&song).await;
    gate.offer(&song).await;

    assert_eq!(
        sub.try_recv().unwrap(),
        CoreEvent::Metadata(MetadataEvent::Applied {
            display: "Track One — Artist".to_string(),
        })
    );
    assert!(matches!(
        sub.try_recv().unwrap(),
        CoreEvent::Metadata(MetadataEvent::Skipped { .. })
    ));
}
