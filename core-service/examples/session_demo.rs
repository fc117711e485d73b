//! Session demo: drives a full playback session against in-process console
//! engines, including a runtime backend switch.
//!
//! Run with:
//!
//! ```bash
//! cargo run --example session_demo
//! ```

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::playback::{
    BackendKind, EngineEvent, EngineEventStream, EngineFactory, EngineState, MetadataDelivery,
    PlaybackEngine, TrackMetadata,
};
use core_runtime::logging::{init_logging, LoggingConfig};
use core_runtime::SessionConfig;
use core_service::SessionCoordinator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Engine that "plays" to stdout and pushes a metadata event when asked.
struct ConsoleEngine {
    name: &'static str,
    events: broadcast::Sender<EngineEvent>,
}

impl ConsoleEngine {
    fn new(name: &'static str) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self { name, events })
    }
}

#[async_trait]
impl PlaybackEngine for ConsoleEngine {
    async fn load(&self, stream_url: &str, metadata: Option<&TrackMetadata>) -> BridgeResult<()> {
        println!(
            "[{}] load {} ({})",
            self.name,
            stream_url,
            metadata.map(|m| m.display()).unwrap_or_default()
        );
        self.events
            .send(EngineEvent::StateChanged(EngineState::Buffering))
            .ok();
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        println!("[{}] play", self.name);
        self.events
            .send(EngineEvent::StateChanged(EngineState::Playing))
            .ok();
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        println!("[{}] pause", self.name);
        self.events
            .send(EngineEvent::StateChanged(EngineState::Paused))
            .ok();
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        println!("[{}] stop", self.name);
        self.events
            .send(EngineEvent::StateChanged(EngineState::Stopped))
            .ok();
        Ok(())
    }

    async fn set_volume(&self, volume: f32) -> BridgeResult<()> {
        println!("[{}] volume {:.2}", self.name, volume);
        Ok(())
    }

    async fn update_now_playing(&self, metadata: &TrackMetadata) -> BridgeResult<()> {
        println!("[{}] now playing: {}", self.name, metadata.display());
        Ok(())
    }

    async fn state(&self) -> BridgeResult<EngineState> {
        Ok(EngineState::Idle)
    }

    async fn subscribe_events(&self) -> BridgeResult<Box<dyn EngineEventStream>> {
        Ok(Box::new(DemoStream {
            rx: self.events.subscribe(),
        }))
    }

    async fn release(&self) -> BridgeResult<()> {
        println!("[{}] released", self.name);
        Ok(())
    }
}

struct DemoStream {
    rx: broadcast::Receiver<EngineEvent>,
}

#[async_trait]
impl EngineEventStream for DemoStream {
    async fn next(&mut self) -> Option<EngineEvent> {
        self.rx.recv().await.ok()
    }
}

struct DemoFactory {
    primary: Arc<ConsoleEngine>,
    alternate: Arc<ConsoleEngine>,
}

#[async_trait]
impl EngineFactory for DemoFactory {
    async fn create(&self, kind: BackendKind) -> BridgeResult<Arc<dyn PlaybackEngine>> {
        Ok(match kind {
            BackendKind::Primary => Arc::clone(&self.primary) as Arc<dyn PlaybackEngine>,
            BackendKind::Alternate => Arc::clone(&self.alternate) as Arc<dyn PlaybackEngine>,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(LoggingConfig::default())?;

    let primary = ConsoleEngine::new("primary");
    let alternate = ConsoleEngine::new("alternate");
    let factory = Arc::new(DemoFactory {
        primary: Arc::clone(&primary),
        alternate,
    });

    let config = SessionConfig::builder()
        .stream_url("https://radio.example.com/live.aac")
        .delivery(MetadataDelivery::EngineEvents)
        .initial_metadata(TrackMetadata::title_only("Example Radio"))
        .engine_factory(factory)
        .build()?;

    let session = SessionCoordinator::new(config)?;

    // Watch the session from the outside, like a UI layer would.
    let mut events = session.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            println!("  event: {}", event.description());
        }
    });

    session.start().await?;
    session.play().await?;

    // The engine announces a song; it flows through the gate to the
    // now-playing surface.
    primary
        .events
        .send(EngineEvent::MetadataChanged {
            title: Some("So What - Miles Davis".to_string()),
            artist: None,
        })
        .ok();
    tokio::time::sleep(Duration::from_millis(200)).await;

    session.set_volume(0.7).await?;

    // Runtime hot-swap: the primary engine is fully released before the
    // alternate claims the output device.
    session.switch_backend(BackendKind::Alternate).await?;
    session.play().await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    session.shutdown().await?;
    Ok(())
}
