//! # Core Service Façade
//!
//! Wires host-provided bridge implementations (playback engines, HTTP,
//! lifecycle observer) into the playback core and exposes the single type
//! hosts interact with: [`SessionCoordinator`].
//!
//! Desktop apps typically enable the `desktop-shims` feature, which makes the
//! session config default to the reqwest HTTP client from `bridge-desktop`;
//! mobile hosts inject their own adapters instead.
//!
//! ## Usage
//!
//! ```ignore
//! use core_service::{SessionCoordinator, SessionConfig};
//! use bridge_traits::playback::{BackendKind, MetadataDelivery};
//!
//! let config = SessionConfig::builder()
//!     .stream_url("https://radio.example.com/live.aac")
//!     .metadata_url("https://radio.example.com/nowplaying")
//!     .delivery(MetadataDelivery::HttpPoll)
//!     .engine_factory(factory)
//!     .build()?;
//!
//! let session = SessionCoordinator::new(config)?;
//! session.start().await?;
//! session.play().await?;
//! // ...
//! session.switch_backend(BackendKind::Alternate).await?;
//! session.shutdown().await?;
//! ```

pub mod error;
pub mod session;

pub use error::{CoreError, Result};
pub use session::SessionCoordinator;

// Re-export the types hosts need to assemble a session.
pub use bridge_traits::playback::{BackendKind, MetadataDelivery, PlaybackState, TrackMetadata};
pub use core_runtime::{CoreEvent, EventStream, PollingConfig, SessionConfig};
