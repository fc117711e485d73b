//! # Session Coordinator
//!
//! Top-level façade over the playback core. One coordinator owns one logical
//! playback session: exactly one active backend adapter, one metadata source
//! strategy, one update gate, and the event bus callers subscribe to.
//!
//! A coordinator's lifetime is owned by whatever top-level context starts
//! playback: construct it, pass it to consumers explicitly, and `shutdown`
//! it when playback ends. There is deliberately no shared global instance.
//!
//! ## Wiring
//!
//! ```text
//! caller ──commands──> SessionCoordinator ──> BackendSelector ──> adapter ──> engine
//!                         │                                          ^
//!                         │ lifecycle pump                           │ apply
//!                         v                                          │
//!                     strategy (push|pull) ──offer──> UpdateGate ────┘
//! ```
//!
//! The strategy is rebuilt on every backend activation (push delivery
//! subscribes to the new engine), and the gate is reset on every switch so a
//! stale "last applied" value cannot suppress the first update on a fresh
//! backend.

use crate::error::{CoreError, Result};
use bridge_traits::playback::{BackendKind, MetadataDelivery, PlaybackState, TrackMetadata};
use bridge_traits::LifecyclePhase;
use core_metadata::{
    MetadataError, MetadataSink, MetadataSourceStrategy, NowPlayingClient, PullSourceStrategy,
    PushSourceStrategy, UpdateGate,
};
use core_playback::BackendSelector;
use core_runtime::events::{CoreEvent, EventBus, EventStream, Receiver, SessionEvent};
use core_runtime::SessionConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Gate sink that forwards to whichever adapter is currently active.
///
/// Resolving the adapter per apply (instead of capturing it) is what keeps
/// the metadata pipeline correct across backend switches: during a switch the
/// selector lock makes the apply wait, and after one it naturally lands on
/// the new adapter.
struct SelectorSink {
    selector: Arc<BackendSelector>,
}

#[async_trait::async_trait]
impl MetadataSink for SelectorSink {
    async fn apply(&self, metadata: &TrackMetadata) -> core_metadata::Result<()> {
        let adapter = self
            .selector
            .active()
            .await
            .map_err(|e| MetadataError::Apply(e.to_string()))?;
        adapter
            .update_metadata(metadata)
            .await
            .map_err(|e| MetadataError::Apply(e.to_string()))
    }
}

/// One playback session: the unified control surface of the core.
pub struct SessionCoordinator {
    config: SessionConfig,
    bus: EventBus,
    selector: Arc<BackendSelector>,
    gate: Arc<UpdateGate>,
    strategy: Arc<tokio::sync::Mutex<Option<Box<dyn MetadataSourceStrategy>>>>,
    lifecycle_pump: tokio::sync::Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl SessionCoordinator {
    /// Validate the configuration and assemble the (not yet started) session.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let bus = EventBus::new(config.events_capacity);
        let selector = Arc::new(BackendSelector::new(
            Arc::clone(&config.engine_factory),
            bus.clone(),
        ));
        let sink = Arc::new(SelectorSink {
            selector: Arc::clone(&selector),
        });
        let gate = Arc::new(UpdateGate::new(
            sink,
            Arc::clone(&config.clock),
            config.polling.min_spacing,
            bus.clone(),
        ));

        Ok(Self {
            config,
            bus,
            selector,
            gate,
            strategy: Arc::new(tokio::sync::Mutex::new(None)),
            lifecycle_pump: tokio::sync::Mutex::new(None),
        })
    }

    /// Select the configured backend, load the stream, and start the
    /// metadata pipeline.
    pub async fn start(&self) -> Result<()> {
        info!(
            backend = %self.config.backend,
            delivery = ?self.config.delivery,
            "starting playback session"
        );

        self.selector
            .select(
                self.config.backend,
                &self.config.stream_url,
                self.config.initial_metadata.as_ref(),
            )
            .await?;

        let phase = self.current_phase().await;
        self.spawn_strategy(phase).await?;
        self.spawn_lifecycle_pump().await;

        Ok(())
    }

    async fn current_phase(&self) -> LifecyclePhase {
        match &self.config.lifecycle_observer {
            Some(observer) => observer
                .current_phase()
                .await
                .unwrap_or(LifecyclePhase::Foreground),
            None => LifecyclePhase::Foreground,
        }
    }

    async fn build_strategy(&self) -> Result<Box<dyn MetadataSourceStrategy>> {
        match self.config.delivery {
            MetadataDelivery::EngineEvents => {
                let adapter = self.selector.active().await?;
                Ok(Box::new(PushSourceStrategy::new(
                    adapter.engine(),
                    Arc::clone(&self.gate),
                )))
            }
            MetadataDelivery::HttpPoll => {
                // Both guaranteed by config validation.
                let http_client = self.config.http_client.clone().ok_or_else(|| {
                    CoreError::Internal("validated polling config without HTTP client".to_string())
                })?;
                let url = self.config.metadata_url.clone().ok_or_else(|| {
                    CoreError::Internal("validated polling config without metadata URL".to_string())
                })?;

                let client = NowPlayingClient::new(http_client, url)
                    .with_timeout(self.config.polling.fetch_timeout);
                Ok(Box::new(PullSourceStrategy::new(
                    client,
                    Arc::clone(&self.gate),
                    self.config.polling.clone(),
                )))
            }
        }
    }

    async fn spawn_strategy(&self, phase: LifecyclePhase) -> Result<()> {
        let strategy = self.build_strategy().await?;
        strategy.start(phase).await?;
        *self.strategy.lock().await = Some(strategy);
        Ok(())
    }

    /// Stop the current strategy, cancelling any in-flight fetch and joining
    /// the push listener before returning.
    async fn stop_strategy(&self) {
        let strategy = self.strategy.lock().await.take();
        if let Some(strategy) = strategy {
            strategy.stop().await;
        }
    }

    async fn spawn_lifecycle_pump(&self) {
        let Some(observer) = &self.config.lifecycle_observer else {
            return;
        };

        let mut pump_slot = self.lifecycle_pump.lock().await;
        if pump_slot.is_some() {
            return;
        }

        let mut stream = match observer.subscribe_changes().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "lifecycle subscription failed; staying on foreground cadence");
                return;
            }
        };

        let strategy = Arc::clone(&self.strategy);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                let phase = tokio::select! {
                    _ = token.cancelled() => break,
                    phase = stream.next() => match phase {
                        Some(phase) => phase,
                        None => break,
                    },
                };

                debug!(?phase, "lifecycle transition");
                let guard = strategy.lock().await;
                if let Some(strategy) = guard.as_ref() {
                    strategy.on_phase_change(phase).await;
                }
            }
        });

        *pump_slot = Some((cancel, handle));
    }

    // ========================================================================
    // Imperative control surface
    // ========================================================================

    pub async fn play(&self) -> Result<()> {
        Ok(self.selector.active().await?.play().await?)
    }

    pub async fn pause(&self) -> Result<()> {
        Ok(self.selector.active().await?.pause().await?)
    }

    pub async fn stop(&self) -> Result<()> {
        Ok(self.selector.active().await?.stop().await?)
    }

    pub async fn toggle_play_pause(&self) -> Result<()> {
        let adapter = self.selector.active().await?;
        if adapter.state().is_playing() {
            adapter.pause().await?;
        } else {
            adapter.play().await?;
        }
        Ok(())
    }

    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        Ok(self.selector.active().await?.set_volume(volume).await?)
    }

    /// Hot-swap to another backend with playback continuity guarantees:
    /// the metadata pipeline halts and the gate resets before the old engine
    /// is released, and the new engine is loaded before the pipeline resumes.
    ///
    /// On failure the session reports the error state and stays put, with no
    /// silent re-activation of the old backend. Retry or switch back
    /// explicitly to recover.
    pub async fn switch_backend(&self, kind: BackendKind) -> Result<()> {
        self.stop_strategy().await;
        self.gate.reset().await;

        self.selector
            .switch(
                kind,
                &self.config.stream_url,
                self.config.initial_metadata.as_ref(),
            )
            .await?;

        let phase = self.current_phase().await;
        self.spawn_strategy(phase).await?;
        Ok(())
    }

    /// End the session: cancel the metadata pipeline and lifecycle pump,
    /// tear down the active backend, and release all native resources.
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutting down playback session");

        self.stop_strategy().await;

        let pump = self.lifecycle_pump.lock().await.take();
        if let Some((cancel, handle)) = pump {
            cancel.cancel();
            handle.await.ok();
        }

        self.gate.reset().await;
        self.selector.shutdown().await;
        self.bus.emit(CoreEvent::Session(SessionEvent::Shutdown)).ok();
        Ok(())
    }

    // ========================================================================
    // Read accessors & subscriptions
    // ========================================================================

    /// Current normalized playback state (`Stopped` before `start`).
    pub async fn current_state(&self) -> PlaybackState {
        self.selector.current_state().await
    }

    pub async fn is_playing(&self) -> bool {
        self.current_state().await.is_playing()
    }

    pub async fn active_backend(&self) -> Option<BackendKind> {
        self.selector.active_kind().await
    }

    /// Raw subscription to every session event.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.bus.subscribe()
    }

    /// Stream of playback state changes only.
    pub fn state_changes(&self) -> EventStream {
        EventStream::new(self.bus.subscribe()).filter(|event| {
            matches!(
                event,
                CoreEvent::Playback(core_runtime::events::PlaybackEvent::StateChanged { .. })
            )
        })
    }

    /// Stream of failure notifications only (playback errors, switch failures).
    pub fn errors(&self) -> EventStream {
        EventStream::new(self.bus.subscribe()).filter(CoreEvent::is_error)
    }

    /// The session event bus, for components that need to publish or fan out.
    pub fn events(&self) -> &EventBus {
        &self.bus
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if let Ok(mut pump) = self.lifecycle_pump.try_lock() {
            if let Some((cancel, _)) = pump.take() {
                cancel.cancel();
            }
        }
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
