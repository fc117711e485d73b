//! # Metadata Source Strategies
//!
//! Two interchangeable ways now-playing metadata reaches the update gate,
//! selected once at session construction from the platform capability flag:
//!
//! - [`PushSourceStrategy`]: the native engine pushes metadata events; no
//!   network calls originate here, ever.
//! - [`PullSourceStrategy`]: a [`PollScheduler`]-driven HTTP fetch against
//!   the station's now-playing endpoint.
//!
//! Both terminate at the same [`UpdateGate`], so everything downstream of
//! this module is identical on every platform.
//!
//! Strategies are single-use: the session layer builds a fresh instance per
//! backend activation and `stop`s it during teardown. `stop` is a
//! synchronous cancel: once it returns, no callback of this strategy will
//! fire again.

use crate::error::{MetadataError, Result};
use crate::gate::UpdateGate;
use crate::now_playing::NowPlayingClient;
use crate::scheduler::{PollHandler, PollScheduler};
use async_trait::async_trait;
use bridge_traits::playback::{EngineEvent, MetadataDelivery, PlaybackEngine, TrackMetadata};
use bridge_traits::LifecyclePhase;
use core_runtime::config::PollingConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Per-platform policy for sourcing now-playing metadata.
#[async_trait]
pub trait MetadataSourceStrategy: Send + Sync {
    /// Begin delivering metadata into the gate.
    async fn start(&self, phase: LifecyclePhase) -> Result<()>;

    /// React to an application lifecycle transition.
    async fn on_phase_change(&self, phase: LifecyclePhase);

    /// Stop delivering. No callback fires after this returns.
    async fn stop(&self);
}

// ============================================================================
// Push Strategy
// ============================================================================

/// Normalize a push payload into a [`TrackMetadata`] value.
///
/// Engines sometimes deliver a combined `"song - artist"` string in the
/// title field with no artist; that case goes through the same first-`" - "`
/// split as the pull path, so both sources produce identical values for the
/// same song.
pub fn normalize_push_payload(title: Option<String>, artist: Option<String>) -> TrackMetadata {
    match (title, artist) {
        (Some(title), Some(artist)) => TrackMetadata::new(title, artist),
        (Some(title), None) => TrackMetadata::from_raw(&title),
        (None, Some(artist)) => TrackMetadata {
            title: None,
            artist: Some(artist),
            raw_song: None,
        },
        (None, None) => TrackMetadata::default(),
    }
}

/// Metadata via native engine events.
pub struct PushSourceStrategy {
    engine: Arc<dyn PlaybackEngine>,
    gate: Arc<UpdateGate>,
    cancel: CancellationToken,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl PushSourceStrategy {
    pub fn new(engine: Arc<dyn PlaybackEngine>, gate: Arc<UpdateGate>) -> Self {
        Self {
            engine,
            gate,
            cancel: CancellationToken::new(),
            task: tokio::sync::Mutex::new(None),
        }
    }
}

impl Drop for PushSourceStrategy {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
impl MetadataSourceStrategy for PushSourceStrategy {
    async fn start(&self, _phase: LifecyclePhase) -> Result<()> {
        let mut stream = self
            .engine
            .subscribe_events()
            .await
            .map_err(|e| MetadataError::SourceUnavailable(e.to_string()))?;

        let gate = Arc::clone(&self.gate);
        let cancel = self.cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = stream.next() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };

                if let EngineEvent::MetadataChanged { title, artist } = event {
                    let metadata = normalize_push_payload(title, artist);
                    if metadata.is_empty() {
                        trace!("push event carried no usable metadata");
                        continue;
                    }
                    gate.offer(&metadata).await;
                }
            }
            trace!("push metadata listener stopped");
        });

        *self.task.lock().await = Some(handle);
        Ok(())
    }

    async fn on_phase_change(&self, phase: LifecyclePhase) {
        // Push delivery costs nothing while backgrounded; the engine keeps
        // emitting and the gate keeps deduplicating.
        trace!(?phase, "push strategy ignores lifecycle phases");
    }

    async fn stop(&self) {
        self.cancel.cancel();
        let task = self.task.lock().await.take();
        if let Some(handle) = task {
            handle.await.ok();
        }
    }
}

// ============================================================================
// Pull Strategy
// ============================================================================

/// Fetch-and-offer work unit run by the scheduler on every tick.
struct FetchAndOffer {
    client: NowPlayingClient,
    gate: Arc<UpdateGate>,
}

#[async_trait]
impl PollHandler for FetchAndOffer {
    async fn poll(&self) {
        match self.client.fetch().await {
            Ok(Some(metadata)) => {
                self.gate.offer(&metadata).await;
            }
            Ok(None) => {}
            Err(e) => {
                // Recovered locally: the retry is the next tick, and
                // metadata staleness never surfaces as a playback failure.
                warn!(url = %self.client.url(), error = %e, "now-playing fetch failed");
            }
        }
    }
}

/// Metadata via scheduled HTTP polling.
pub struct PullSourceStrategy {
    scheduler: PollScheduler,
}

impl PullSourceStrategy {
    pub fn new(client: NowPlayingClient, gate: Arc<UpdateGate>, polling: PollingConfig) -> Self {
        let handler = Arc::new(FetchAndOffer { client, gate });
        Self {
            scheduler: PollScheduler::new(MetadataDelivery::HttpPoll, polling, handler),
        }
    }

    /// Scheduler access for observability.
    pub fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }
}

#[async_trait]
impl MetadataSourceStrategy for PullSourceStrategy {
    async fn start(&self, phase: LifecyclePhase) -> Result<()> {
        self.scheduler.start(phase).await;
        Ok(())
    }

    async fn on_phase_change(&self, phase: LifecyclePhase) {
        self.scheduler.on_phase_change(phase).await;
    }

    async fn stop(&self) {
        self.scheduler.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_payload_with_both_fields() {
        let metadata = normalize_push_payload(
            Some("So What".to_string()),
            Some("Miles Davis".to_string()),
        );
        assert_eq!(metadata.display(), "So What — Miles Davis");
    }

    #[test]
    fn push_payload_with_combined_title_is_split() {
        let metadata = normalize_push_payload(Some("So What - Miles Davis".to_string()), None);
        assert_eq!(metadata.title.as_deref(), Some("So What"));
        assert_eq!(metadata.artist.as_deref(), Some("Miles Davis"));
    }

    #[test]
    fn push_payload_artist_only() {
        let metadata = normalize_push_payload(None, Some("Miles Davis".to_string()));
        assert_eq!(metadata.display(), "Miles Davis");
    }

    #[test]
    fn push_payload_empty() {
        assert!(normalize_push_payload(None, None).is_empty());
    }
}
