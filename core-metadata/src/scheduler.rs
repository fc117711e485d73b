//! # Adaptive Polling Scheduler
//!
//! Owns the timer for HTTP-based metadata fetch and recalculates its interval
//! from the application lifecycle phase:
//!
//! ```text
//!            start (HttpPoll)
//! Idle ───────────────────────> Scheduled(interval)
//!   ^                               │      ^
//!   │            stop               │      │ rearm on phase change
//!   └───────────────────────────────┘      └──────────┐
//!                                     Scheduled(new interval)
//! ```
//!
//! Everything is expressed through a single `rearm` transition: cancel the
//! previous timer (and wait for it to die; no two timers may be live for the
//! same session), optionally run one immediate out-of-band fetch, then arm a
//! fresh timer at the interval for the new phase. The immediate fetch happens
//! exactly on transitions *into* the foreground, which bounds staleness after
//! a resume to near zero instead of a full interval.
//!
//! On platforms whose engine pushes metadata ([`MetadataDelivery::EngineEvents`])
//! the scheduler never arms at all; it is permanently `Idle` for the whole
//! session. This branch is decided once at construction, not re-evaluated
//! per tick.

use bridge_traits::playback::MetadataDelivery;
use bridge_traits::LifecyclePhase;
use core_runtime::config::PollingConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Work performed on every tick (and on the immediate foreground fetch).
///
/// Implementations swallow their own errors; a failed poll simply waits for
/// the next tick.
#[async_trait::async_trait]
pub trait PollHandler: Send + Sync {
    async fn poll(&self);
}

/// Observable scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduled { interval: Duration },
}

struct TimerTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Drop for TimerTask {
    fn drop(&mut self) {
        // A scheduler dropped without stop() must not leave a live timer.
        self.cancel.cancel();
    }
}

struct Inner {
    state: SchedulerState,
    timer: Option<TimerTask>,
    running: bool,
}

/// Context-aware polling timer.
pub struct PollScheduler {
    delivery: MetadataDelivery,
    polling: PollingConfig,
    handler: Arc<dyn PollHandler>,
    inner: tokio::sync::Mutex<Inner>,
}

impl PollScheduler {
    pub fn new(
        delivery: MetadataDelivery,
        polling: PollingConfig,
        handler: Arc<dyn PollHandler>,
    ) -> Self {
        Self {
            delivery,
            polling,
            handler,
            inner: tokio::sync::Mutex::new(Inner {
                state: SchedulerState::Idle,
                timer: None,
                running: false,
            }),
        }
    }

    pub async fn state(&self) -> SchedulerState {
        self.inner.lock().await.state
    }

    /// Begin scheduling for the session.
    ///
    /// A session starting in the foreground gets one immediate fetch so the
    /// first label does not wait a full interval; a background start stays
    /// quiet until the first long tick.
    pub async fn start(&self, phase: LifecyclePhase) {
        if self.delivery == MetadataDelivery::EngineEvents {
            trace!("engine pushes metadata; scheduler stays idle");
            return;
        }

        let mut inner = self.inner.lock().await;
        inner.running = true;
        self.rearm(&mut inner, phase, phase.is_foreground()).await;
    }

    /// React to a lifecycle transition. No-op before `start` or after `stop`.
    pub async fn on_phase_change(&self, phase: LifecyclePhase) {
        if self.delivery == MetadataDelivery::EngineEvents {
            return;
        }

        let mut inner = self.inner.lock().await;
        if !inner.running {
            return;
        }
        self.rearm(&mut inner, phase, phase.is_foreground()).await;
    }

    /// Cancel the timer and return to `Idle`.
    ///
    /// Waits for the timer task to finish, so no tick can fire after this
    /// returns.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        inner.running = false;
        Self::cancel_timer(&mut inner).await;
        inner.state = SchedulerState::Idle;
    }

    async fn cancel_timer(inner: &mut Inner) {
        if let Some(mut timer) = inner.timer.take() {
            timer.cancel.cancel();
            (&mut timer.handle).await.ok();
        }
    }

    /// The single transition of the state machine.
    async fn rearm(&self, inner: &mut Inner, phase: LifecyclePhase, immediate: bool) {
        // The previous timer dies first; only then may a fetch or a new timer
        // exist.
        Self::cancel_timer(inner).await;

        if immediate {
            debug!(?phase, "immediate out-of-band fetch before rearming");
            self.handler.poll().await;
        }

        let interval = self.polling.interval_for(phase);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Self::run_timer(
            interval,
            Arc::clone(&self.handler),
            cancel.clone(),
        ));

        debug!(?phase, ?interval, "poll timer armed");
        inner.timer = Some(TimerTask { cancel, handle });
        inner.state = SchedulerState::Scheduled { interval };
    }

    async fn run_timer(interval: Duration, handler: Arc<dyn PollHandler>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {
                    // The poll itself is cancellable so a phase change or
                    // session stop aborts an in-flight fetch immediately.
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = handler.poll() => {}
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for PollScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollScheduler")
            .field("delivery", &self.delivery)
            .finish_non_exhaustive()
    }
}
