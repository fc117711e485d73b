//! # Desktop Bridge Implementations
//!
//! Desktop-ready implementations of the bridge traits:
//!
//! - [`ReqwestHttpClient`] - HTTP client with retry and connection pooling
//! - [`ChannelLifecycleObserver`] / [`LifecycleHandle`] - lifecycle phases
//!   driven by the host window loop
//!
//! Playback engines are intentionally *not* provided here: which native audio
//! engine backs a session is a host decision, registered through
//! [`bridge_traits::playback::EngineFactory`].

pub mod http;
pub mod lifecycle;

pub use http::ReqwestHttpClient;
pub use lifecycle::{lifecycle_channel, ChannelLifecycleObserver, LifecycleHandle};
