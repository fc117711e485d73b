//! # Core Playback
//!
//! Backend adapter and selector for the playback core.
//!
//! ## Architecture
//!
//! The playback side of the core is two layers over a host-provided engine:
//!
//! - [`BackendAdapter`](adapter::BackendAdapter) wraps one concrete
//!   [`PlaybackEngine`](bridge_traits::playback::PlaybackEngine) behind a
//!   uniform command surface and keeps the normalized playback state current
//!   by pumping the engine's event stream.
//! - [`BackendSelector`](selector::BackendSelector) owns which adapter is
//!   active and performs safe runtime hot-swaps: the old engine is fully
//!   released before the new one claims the audio output device.
//!
//! Both publish into the session [`EventBus`](core_runtime::events::EventBus);
//! callers never talk to an adapter directly, they go through the session
//! coordinator in `core-service`.

pub mod adapter;
pub mod error;
pub mod selector;

pub use adapter::BackendAdapter;
pub use error::{PlaybackError, Result};
pub use selector::{BackendHandle, BackendSelector};

// The normalized state and metadata value types live in bridge-traits with
// the engine contract; re-export them for downstream convenience.
pub use bridge_traits::playback::{BackendKind, PlaybackState, TrackMetadata};
