//! # Playback Backend Adapter
//!
//! Wraps one concrete [`PlaybackEngine`] behind a uniform command surface and
//! a normalized [`PlaybackState`]. The adapter owns an event pump task that
//! consumes the engine's raw event stream and keeps the normalized state
//! current, publishing every transition to the session event bus.
//!
//! ## Correctness properties
//!
//! - `update_metadata` forwards to the engine's now-playing write only. It
//!   never touches playback state and its failures are contained here: a
//!   metadata problem must not look like a playback problem.
//! - Once `detach` has been called, every command fails with
//!   [`PlaybackError::BackendDetached`]. A stale adapter handle can never
//!   silently act on an engine that is being torn down.
//! - Command failures for load/play/pause/stop transition the state to
//!   `Error` and notify listeners through the bus.

use crate::error::{PlaybackError, Result};
use bridge_traits::playback::{
    BackendKind, EngineEvent, PlaybackEngine, PlaybackState, TrackMetadata,
};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Adapter around one active playback engine.
///
/// Constructed by the backend selector; callers reach it through the
/// session coordinator. Cloning the `Arc` does not duplicate ownership:
/// whichever clone observes `detach` first wins, all others fail closed.
pub struct BackendAdapter {
    kind: BackendKind,
    engine: Arc<dyn PlaybackEngine>,
    bus: EventBus,
    state: Arc<RwLock<PlaybackState>>,
    detached: Arc<AtomicBool>,
    cancel: CancellationToken,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl BackendAdapter {
    /// Wrap an engine and start the event pump.
    ///
    /// # Errors
    ///
    /// Fails if the engine refuses an event subscription, which means the
    /// engine is unusable as a backend.
    pub async fn attach(
        kind: BackendKind,
        engine: Arc<dyn PlaybackEngine>,
        bus: EventBus,
    ) -> Result<Arc<Self>> {
        let stream = engine.subscribe_events().await?;

        let state = Arc::new(RwLock::new(PlaybackState::Stopped));
        let detached = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let pump = tokio::spawn(Self::pump_events(
            stream,
            kind,
            Arc::clone(&state),
            Arc::clone(&detached),
            bus.clone(),
            cancel.clone(),
        ));

        Ok(Arc::new(Self {
            kind,
            engine,
            bus,
            state,
            detached,
            cancel,
            pump: Mutex::new(Some(pump)),
        }))
    }

    async fn pump_events(
        mut stream: Box<dyn bridge_traits::playback::EngineEventStream>,
        kind: BackendKind,
        state: Arc<RwLock<PlaybackState>>,
        detached: Arc<AtomicBool>,
        bus: EventBus,
        cancel: CancellationToken,
    ) {
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = stream.next() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            if detached.load(Ordering::SeqCst) {
                break;
            }

            match event {
                EngineEvent::StateChanged(raw) => {
                    let next = PlaybackState::from(raw);
                    Self::apply_state(&state, &bus, kind, next);
                }
                EngineEvent::MetadataChanged { .. } => {
                    // Push metadata is consumed by the metadata source
                    // strategy on its own engine subscription.
                }
            }
        }
        debug!(backend = %kind, "engine event pump stopped");
    }

    /// Write `next` and publish, skipping no-op transitions.
    fn apply_state(
        state: &RwLock<PlaybackState>,
        bus: &EventBus,
        kind: BackendKind,
        next: PlaybackState,
    ) {
        let changed = {
            let mut guard = state.write();
            if *guard == next {
                false
            } else {
                *guard = next.clone();
                true
            }
        };

        if !changed {
            return;
        }

        if let PlaybackState::Error { message } = &next {
            bus.emit(CoreEvent::Playback(PlaybackEvent::Error {
                backend: Some(kind),
                message: message.clone(),
                recoverable: true,
            }))
            .ok();
        }

        bus.emit(CoreEvent::Playback(PlaybackEvent::StateChanged {
            backend: kind,
            state: next,
        }))
        .ok();
    }

    fn ensure_attached(&self) -> Result<()> {
        if self.detached.load(Ordering::SeqCst) {
            Err(PlaybackError::BackendDetached)
        } else {
            Ok(())
        }
    }

    /// Transition to `Error` after a failed command and notify listeners.
    fn fail(&self, message: String) {
        Self::apply_state(
            &self.state,
            &self.bus,
            self.kind,
            PlaybackState::Error { message },
        );
    }

    /// Load a stream into the engine.
    ///
    /// Leaves the `Error` state: a fresh load is one of the two explicit
    /// recovery paths (the other being `play`).
    pub async fn load(
        &self,
        stream_url: &str,
        initial_metadata: Option<&TrackMetadata>,
    ) -> Result<()> {
        self.ensure_attached()?;
        Self::apply_state(&self.state, &self.bus, self.kind, PlaybackState::Buffering);

        match self.engine.load(stream_url, initial_metadata).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                self.fail(message.clone());
                Err(PlaybackError::LoadFailed(message))
            }
        }
    }

    pub async fn play(&self) -> Result<()> {
        self.ensure_attached()?;
        match self.engine.play().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                self.fail(message.clone());
                Err(PlaybackError::ControlFailed(message))
            }
        }
    }

    pub async fn pause(&self) -> Result<()> {
        self.ensure_attached()?;
        match self.engine.pause().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                self.fail(message.clone());
                Err(PlaybackError::ControlFailed(message))
            }
        }
    }

    pub async fn stop(&self) -> Result<()> {
        self.ensure_attached()?;
        match self.engine.stop().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                self.fail(message.clone());
                Err(PlaybackError::ControlFailed(message))
            }
        }
    }

    /// Set output volume in `0.0..=1.0`.
    ///
    /// A rejected volume write does not force the `Error` state; the stream
    /// keeps playing at the previous level.
    pub async fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        self.ensure_attached()?;

        self.engine.set_volume(volume).await.map_err(|e| {
            warn!(backend = %self.kind, error = %e, "volume change rejected");
            PlaybackError::ControlFailed(e.to_string())
        })
    }

    /// Forward a now-playing update to the engine.
    ///
    /// MUST NOT interrupt playback: no state transition happens here on
    /// either path, and failures are reported as [`PlaybackError::MetadataApply`]
    /// for the gate to log and swallow.
    pub async fn update_metadata(&self, metadata: &TrackMetadata) -> Result<()> {
        self.ensure_attached()?;

        self.engine.update_now_playing(metadata).await.map_err(|e| {
            warn!(
                backend = %self.kind,
                display = %metadata.display(),
                error = %e,
                "engine rejected now-playing update"
            );
            PlaybackError::MetadataApply(e.to_string())
        })
    }

    /// Current normalized playback state.
    pub fn state(&self) -> PlaybackState {
        self.state.read().clone()
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// The wrapped engine, for the push metadata source's own subscription.
    pub fn engine(&self) -> Arc<dyn PlaybackEngine> {
        Arc::clone(&self.engine)
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::SeqCst)
    }

    /// Begin teardown: mark the adapter unusable and stop the event pump.
    ///
    /// Waits for the pump to finish so no event callback can fire after this
    /// returns. Idempotent.
    pub async fn detach(&self) {
        if self.detached.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();

        let pump = self.pump.lock().take();
        if let Some(handle) = pump {
            handle.await.ok();
        }
    }

    /// Full teardown: detach, then stop the engine and release native
    /// resources (including the audio output device).
    ///
    /// Engine refusals during teardown are logged, not propagated; the
    /// backend is going away either way.
    pub async fn shutdown(&self) {
        self.detach().await;

        if let Err(e) = self.engine.stop().await {
            warn!(backend = %self.kind, error = %e, "engine stop during teardown failed");
        }
        if let Err(e) = self.engine.release().await {
            warn!(backend = %self.kind, error = %e, "engine release during teardown failed");
        }
    }
}

impl Drop for BackendAdapter {
    fn drop(&mut self) {
        // Pump holds no Arc back to the adapter, but make sure it dies with us.
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for BackendAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendAdapter")
            .field("kind", &self.kind)
            .field("state", &self.state())
            .field("detached", &self.is_detached())
            .finish()
    }
}
