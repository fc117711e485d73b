//! # Backend Selector
//!
//! State machine owning which backend adapter is active:
//!
//! ```text
//! NoBackend ──select──> Active(handle) ──switch──> Switching ──> Active(handle')
//!     ^                      │
//!     └──────shutdown────────┘
//! ```
//!
//! The selector is the single authority over the native audio output device:
//! a switch fully tears the old adapter down (event pump joined, engine
//! stopped and released) *before* the replacement engine is constructed, so
//! two engines never compete for the device. The internal mutex is held
//! across the whole transition, which is what makes a switch atomic from the
//! caller's point of view: concurrent commands queue behind it rather than
//! observing a half-switched session.

use crate::adapter::BackendAdapter;
use crate::error::{PlaybackError, Result};
use bridge_traits::playback::{BackendKind, EngineFactory, PlaybackState, TrackMetadata};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Opaque identity of one backend activation.
///
/// Exclusively owned by the selector; a new handle is minted on every select
/// and switch, so a handle from before a switch never aliases the current
/// backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendHandle {
    id: Uuid,
    kind: BackendKind,
}

impl BackendHandle {
    fn new(kind: BackendKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }
}

enum SelectorState {
    NoBackend,
    Active(ActiveBackend),
    /// Transient: old backend released, new one not yet loaded. Only
    /// observable from inside the selector itself while the lock is held.
    Switching,
}

struct ActiveBackend {
    handle: BackendHandle,
    adapter: Arc<BackendAdapter>,
}

/// Owns at most one active [`BackendAdapter`] and performs safe hot-swaps.
pub struct BackendSelector {
    factory: Arc<dyn EngineFactory>,
    bus: EventBus,
    state: Mutex<SelectorState>,
}

impl BackendSelector {
    pub fn new(factory: Arc<dyn EngineFactory>, bus: EventBus) -> Self {
        Self {
            factory,
            bus,
            state: Mutex::new(SelectorState::NoBackend),
        }
    }

    async fn construct(&self, kind: BackendKind) -> Result<Arc<BackendAdapter>> {
        let engine = self.factory.create(kind).await?;
        BackendAdapter::attach(kind, engine, self.bus.clone()).await
    }

    /// Activate a backend for a fresh session. Valid only from `NoBackend`.
    ///
    /// On load failure the constructed adapter is torn down again and the
    /// selector stays in `NoBackend`; the session never started.
    pub async fn select(
        &self,
        kind: BackendKind,
        stream_url: &str,
        initial_metadata: Option<&TrackMetadata>,
    ) -> Result<BackendHandle> {
        let mut guard = self.state.lock().await;
        if !matches!(*guard, SelectorState::NoBackend) {
            return Err(PlaybackError::AlreadyActive);
        }

        let adapter = self.construct(kind).await?;
        if let Err(e) = adapter.load(stream_url, initial_metadata).await {
            adapter.shutdown().await;
            return Err(e);
        }

        let handle = BackendHandle::new(kind);
        info!(backend = %kind, "backend selected");
        *guard = SelectorState::Active(ActiveBackend {
            handle: handle.clone(),
            adapter,
        });

        self.bus
            .emit(CoreEvent::Session(SessionEvent::BackendSelected { kind }))
            .ok();

        Ok(handle)
    }

    /// Hot-swap to another backend. Valid only from `Active`.
    ///
    /// Ordering is mandatory: the current adapter is stopped and fully
    /// released before the replacement engine is constructed and loaded.
    ///
    /// If the replacement fails to load, the selector reports the failure and
    /// stays `Active` over the failed backend (state `Error`); it does NOT
    /// silently re-activate the old one. If the replacement cannot even be
    /// constructed, there is nothing to hold and the selector falls back to
    /// `NoBackend`. Recovery is caller-driven in both cases.
    pub async fn switch(
        &self,
        new_kind: BackendKind,
        stream_url: &str,
        initial_metadata: Option<&TrackMetadata>,
    ) -> Result<BackendHandle> {
        let mut guard = self.state.lock().await;

        let old = match std::mem::replace(&mut *guard, SelectorState::Switching) {
            SelectorState::Active(active) => active,
            other => {
                *guard = other;
                return Err(PlaybackError::NoBackend);
            }
        };
        let old_kind = old.handle.kind();
        info!(from = %old_kind, to = %new_kind, "switching backend");

        old.adapter.shutdown().await;

        let adapter = match self.construct(new_kind).await {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(backend = %new_kind, error = %e, "replacement backend construction failed");
                *guard = SelectorState::NoBackend;
                self.bus
                    .emit(CoreEvent::Session(SessionEvent::SwitchFailed {
                        kind: new_kind,
                        message: e.to_string(),
                    }))
                    .ok();
                return Err(PlaybackError::SwitchFailed(e.to_string()));
            }
        };

        let handle = BackendHandle::new(new_kind);
        let load_result = adapter.load(stream_url, initial_metadata).await;

        *guard = SelectorState::Active(ActiveBackend {
            handle: handle.clone(),
            adapter,
        });

        match load_result {
            Ok(()) => {
                self.bus
                    .emit(CoreEvent::Session(SessionEvent::BackendSwitched {
                        from: old_kind,
                        to: new_kind,
                    }))
                    .ok();
                Ok(handle)
            }
            Err(e) => {
                warn!(backend = %new_kind, error = %e, "replacement backend failed to load");
                self.bus
                    .emit(CoreEvent::Session(SessionEvent::SwitchFailed {
                        kind: new_kind,
                        message: e.to_string(),
                    }))
                    .ok();
                Err(PlaybackError::SwitchFailed(e.to_string()))
            }
        }
    }

    /// The active adapter, for command forwarding.
    pub async fn active(&self) -> Result<Arc<BackendAdapter>> {
        match &*self.state.lock().await {
            SelectorState::Active(active) => Ok(Arc::clone(&active.adapter)),
            _ => Err(PlaybackError::NoBackend),
        }
    }

    pub async fn active_kind(&self) -> Option<BackendKind> {
        match &*self.state.lock().await {
            SelectorState::Active(active) => Some(active.handle.kind()),
            _ => None,
        }
    }

    pub async fn active_handle(&self) -> Option<BackendHandle> {
        match &*self.state.lock().await {
            SelectorState::Active(active) => Some(active.handle.clone()),
            _ => None,
        }
    }

    /// Normalized playback state; `Stopped` when no backend is active.
    pub async fn current_state(&self) -> PlaybackState {
        match &*self.state.lock().await {
            SelectorState::Active(active) => active.adapter.state(),
            _ => PlaybackState::Stopped,
        }
    }

    /// Tear down the active backend, if any, and return to `NoBackend`.
    pub async fn shutdown(&self) {
        let mut guard = self.state.lock().await;
        if let SelectorState::Active(active) =
            std::mem::replace(&mut *guard, SelectorState::NoBackend)
        {
            active.adapter.shutdown().await;
        }
    }
}

impl std::fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSelector").finish_non_exhaustive()
    }
}
