//! Lifecycle Observer Implementation
//!
//! Desktop hosts have no OS-delivered lifecycle notifications the way mobile
//! platforms do, so this implementation is channel-driven: the host window
//! loop holds a [`LifecycleHandle`] and publishes phase transitions from
//! focus/minimize events, and the core observes them through the standard
//! [`LifecycleObserver`] trait.

use async_trait::async_trait;
use bridge_traits::{
    background::{LifecycleChangeStream, LifecycleObserver, LifecyclePhase},
    error::Result,
};
use tokio::sync::watch;
use tracing::debug;

/// Publishing side held by the host.
#[derive(Clone)]
pub struct LifecycleHandle {
    tx: watch::Sender<LifecyclePhase>,
}

impl LifecycleHandle {
    /// Publish a phase transition. Repeated publishes of the current phase
    /// are ignored so hosts can forward raw focus events without filtering.
    pub fn set_phase(&self, phase: LifecyclePhase) {
        self.tx.send_if_modified(|current| {
            if *current == phase {
                false
            } else {
                debug!(?phase, "lifecycle phase change");
                *current = phase;
                true
            }
        });
    }

    /// Phase currently visible to observers.
    pub fn current(&self) -> LifecyclePhase {
        *self.tx.borrow()
    }
}

/// Observer side handed to the core.
pub struct ChannelLifecycleObserver {
    rx: watch::Receiver<LifecyclePhase>,
}

/// Create a connected handle/observer pair starting in `initial`.
pub fn lifecycle_channel(initial: LifecyclePhase) -> (LifecycleHandle, ChannelLifecycleObserver) {
    let (tx, rx) = watch::channel(initial);
    (LifecycleHandle { tx }, ChannelLifecycleObserver { rx })
}

#[async_trait]
impl LifecycleObserver for ChannelLifecycleObserver {
    async fn current_phase(&self) -> Result<LifecyclePhase> {
        Ok(*self.rx.borrow())
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>> {
        Ok(Box::new(WatchChangeStream {
            rx: self.rx.clone(),
        }))
    }
}

struct WatchChangeStream {
    rx: watch::Receiver<LifecyclePhase>,
}

#[async_trait]
impl LifecycleChangeStream for WatchChangeStream {
    async fn next(&mut self) -> Option<LifecyclePhase> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn observer_sees_initial_phase() {
        let (_handle, observer) = lifecycle_channel(LifecyclePhase::Foreground);
        assert_eq!(
            observer.current_phase().await.unwrap(),
            LifecyclePhase::Foreground
        );
    }

    #[tokio::test]
    async fn stream_delivers_transitions_in_order() {
        let (handle, observer) = lifecycle_channel(LifecyclePhase::Foreground);
        let mut stream = observer.subscribe_changes().await.unwrap();

        handle.set_phase(LifecyclePhase::Background);
        assert_eq!(stream.next().await, Some(LifecyclePhase::Background));

        handle.set_phase(LifecyclePhase::Foreground);
        assert_eq!(stream.next().await, Some(LifecyclePhase::Foreground));
    }

    #[tokio::test]
    async fn duplicate_phases_are_not_redelivered() {
        let (handle, observer) = lifecycle_channel(LifecyclePhase::Foreground);
        let mut stream = observer.subscribe_changes().await.unwrap();

        handle.set_phase(LifecyclePhase::Foreground);
        handle.set_phase(LifecyclePhase::Background);

        // Only the real transition arrives.
        assert_eq!(stream.next().await, Some(LifecyclePhase::Background));
    }

    #[tokio::test]
    async fn stream_closes_when_handle_dropped() {
        let (handle, observer) = lifecycle_channel(LifecyclePhase::Background);
        let mut stream = observer.subscribe_changes().await.unwrap();

        drop(handle);
        assert_eq!(stream.next().await, None);
    }
}
