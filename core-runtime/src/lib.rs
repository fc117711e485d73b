//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the playback core:
//! - Session configuration with fail-fast validation
//! - Event bus system
//! - Logging and tracing infrastructure
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other core crates depend on.
//! It establishes the logging conventions, the event broadcasting mechanism,
//! and the single configuration type a host fills in to start a session.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{PollingConfig, SessionConfig, SessionConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream, MetadataEvent, PlaybackEvent, SessionEvent};
