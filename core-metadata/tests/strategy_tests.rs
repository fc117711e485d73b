//! Push strategy: engine metadata events flow through the gate, and stop is
//! a synchronous cancel.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{
    EngineEvent, EngineEventStream, EngineState, PlaybackEngine, TrackMetadata,
};
use bridge_traits::time::Clock;
use bridge_traits::LifecyclePhase;
use chrono::{DateTime, Utc};
use core_metadata::{MetadataError, MetadataSink, MetadataSourceStrategy, PushSourceStrategy, UpdateGate};
use core_runtime::events::EventBus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Test doubles
// ============================================================================

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

struct RecordingSink {
    applied: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            applied: Mutex::new(Vec::new()),
        })
    }

    fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl MetadataSink for RecordingSink {
    async fn apply(&self, metadata: &TrackMetadata) -> Result<(), MetadataError> {
        self.applied.lock().unwrap().push(metadata.display());
        Ok(())
    }
}

/// Engine stub that only exists to push metadata events.
struct PushyEngine {
    events: broadcast::Sender<EngineEvent>,
}

impl PushyEngine {
    fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self { events })
    }

    fn push(&self, title: Option<&str>, artist: Option<&str>) {
        self.events
            .send(EngineEvent::MetadataChanged {
                title: title.map(String::from),
                artist: artist.map(String::from),
            })
            .ok();
    }
}

#[async_trait]
impl PlaybackEngine for PushyEngine {
    async fn load(&self, _stream_url: &str, _metadata: Option<&TrackMetadata>) -> BridgeResult<()> {
        Ok(())
    }
    async fn play(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn pause(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn stop(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn set_volume(&self, _volume: f32) -> BridgeResult<()> {
        Ok(())
    }
    async fn update_now_playing(&self, _metadata: &TrackMetadata) -> BridgeResult<()> {
        Ok(())
    }
    async fn state(&self) -> BridgeResult<EngineState> {
        Ok(EngineState::Idle)
    }
    async fn subscribe_events(&self) -> BridgeResult<Box<dyn EngineEventStream>> {
        Ok(Box::new(BroadcastStream {
            rx: self.events.subscribe(),
        }))
    }
    async fn release(&self) -> BridgeResult<()> {
        Ok(())
    }
}

struct BroadcastStream {
    rx: broadcast::Receiver<EngineEvent>,
}

#[async_trait]
impl EngineEventStream for BroadcastStream {
    async fn next(&mut self) -> Option<EngineEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

async fn wait_for_applied(sink: &RecordingSink, count: usize) {
    for _ in 0..200 {
        if sink.applied().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "sink never reached {} applied values, saw {:?}",
        count,
        sink.applied()
    );
}

fn gate_over(sink: Arc<RecordingSink>, clock: Arc<ManualClock>) -> Arc<UpdateGate> {
    Arc::new(UpdateGate::new(
        sink,
        clock,
        Duration::from_secs(1),
        EventBus::new(16),
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn push_events_flow_through_the_gate() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let engine = PushyEngine::new();
    let strategy = PushSourceStrategy::new(
        Arc::clone(&engine) as Arc<dyn PlaybackEngine>,
        gate_over(Arc::clone(&sink), Arc::clone(&clock)),
    );

    strategy.start(LifecyclePhase::Foreground).await.unwrap();

    engine.push(Some("So What"), Some("Miles Davis"));
    wait_for_applied(&sink, 1).await;

    // Combined payloads are split exactly like the pull path splits them.
    clock.advance(Duration::from_secs(2));
    engine.push(Some("Blue Train - John Coltrane"), None);
    wait_for_applied(&sink, 2).await;

    assert_eq!(
        sink.applied(),
        vec!["So What — Miles Davis", "Blue Train — John Coltrane"]
    );

    strategy.stop().await;
}

#[tokio::test]
async fn duplicate_push_events_are_deduplicated() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let engine = PushyEngine::new();
    let strategy = PushSourceStrategy::new(
        Arc::clone(&engine) as Arc<dyn PlaybackEngine>,
        gate_over(Arc::clone(&sink), Arc::clone(&clock)),
    );

    strategy.start(LifecyclePhase::Foreground).await.unwrap();

    // Engines re-announce the current song on every listener attach and
    // buffer refill; only the first write may reach the engine.
    engine.push(Some("So What"), Some("Miles Davis"));
    wait_for_applied(&sink, 1).await;
    clock.advance(Duration::from_secs(5));
    engine.push(Some("So What"), Some("Miles Davis"));
    engine.push(Some("So What - Miles Davis"), None);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.applied().len(), 1);

    strategy.stop().await;
}

#[tokio::test]
async fn lifecycle_phases_do_not_disturb_push_delivery() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let engine = PushyEngine::new();
    let strategy = PushSourceStrategy::new(
        Arc::clone(&engine) as Arc<dyn PlaybackEngine>,
        gate_over(Arc::clone(&sink), Arc::clone(&clock)),
    );

    strategy.start(LifecyclePhase::Foreground).await.unwrap();
    strategy.on_phase_change(LifecyclePhase::Background).await;

    engine.push(Some("Night Track"), Some("Night Artist"));
    wait_for_applied(&sink, 1).await;

    strategy.stop().await;
}

#[tokio::test]
async fn stop_prevents_any_further_delivery() {
    let sink = RecordingSink::new();
    let clock = ManualClock::new();
    let engine = PushyEngine::new();
    let strategy = PushSourceStrategy::new(
        Arc::clone(&engine) as Arc<dyn PlaybackEngine>,
        gate_over(Arc::clone(&sink), Arc::clone(&clock)),
    );

    strategy.start(LifecyclePhase::Foreground).await.unwrap();
    engine.push(Some("So What"), Some("Miles Davis"));
    wait_for_applied(&sink, 1).await;

    // stop() joins the listener task; once it returns, no orphaned callback
    // may fire.
    strategy.stop().await;

    clock.advance(Duration::from_secs(5));
    engine.push(Some("Another Track"), Some("Another Artist"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(sink.applied().len(), 1);
}
