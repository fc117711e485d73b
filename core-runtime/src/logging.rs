//! # Logging & Tracing Infrastructure
//!
//! Sets up the `tracing-subscriber` stack for the core and optionally mirrors
//! every surviving event into a host [`LoggerSink`] (OSLog, Logcat, files) as
//! a structured [`LogEntry`]. Hosts that only want stdout skip the sink and
//! get the chosen `tracing` format layer.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::time::LogLevel;
//!
//! init_logging(
//!     LoggingConfig::default()
//!         .with_format(LogFormat::Pretty)
//!         .with_level(LogLevel::Debug),
//! )?;
//!
//! tracing::info!("session starting");
//! ```

use crate::error::{Error, Result};
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Compact;
    }
}

/// Logging configuration
#[derive(Clone, Default)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level for core crates (defaults to info)
    pub level: Option<LogLevel>,
    /// Custom filter string (e.g., "core_metadata=debug,core_playback=trace")
    pub filter: Option<String>,
    /// Optional sink mirroring events to the host
    pub logger_sink: Option<Arc<dyn LoggerSink>>,
    /// Display the emitting module in output
    pub display_target: bool,
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }
}

/// Initialize the logging system.
///
/// Call once during application startup; a second call fails because the
/// global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let mirror = SinkMirrorLayer {
        sink: config.logger_sink.clone(),
    };

    let registry = tracing_subscriber::registry().with(filter).with(mirror);

    let init_result = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_target(config.display_target)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_target(config.display_target)
                    .with_writer(io::stdout),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(config.display_target)
                    .with_writer(io::stdout),
            )
            .try_init(),
    };

    init_result.map_err(|e| Error::Logging(format!("failed to install subscriber: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            // Core crates at the configured level; chatty HTTP internals at warn.
            let level = config.level.unwrap_or(LogLevel::Info).as_str();
            format!(
                "core_runtime={level},core_playback={level},core_metadata={level},\
                 core_service={level},bridge_desktop={level},\
                 h2=warn,hyper=warn,reqwest=warn",
            )
        }
    };

    EnvFilter::try_new(directives)
        .map_err(|e| Error::Logging(format!("invalid log filter: {}", e)))
}

/// Mirrors filtered events into the configured [`LoggerSink`].
struct SinkMirrorLayer {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl<S> Layer<S> for SinkMirrorLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        let metadata = event.metadata();
        let level = level_of(*metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let mut entry = LogEntry::new(
            level,
            metadata.target(),
            fields.message.unwrap_or_else(|| metadata.name().to_string()),
        );
        for (key, value) in fields.other {
            entry = entry.with_field(key, value);
        }

        // Sinks are async; delivery rides on the ambient runtime. Events
        // emitted outside any runtime are format-layer only.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let sink = Arc::clone(sink);
            handle.spawn(async move {
                if let Err(err) = sink.log(entry).await {
                    eprintln!("LoggerSink error: {}", err);
                }
            });
        }
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    other: HashMap<String, String>,
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.other.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}

fn level_of(level: tracing::Level) -> LogLevel {
    match level {
        tracing::Level::TRACE => LogLevel::Trace,
        tracing::Level::DEBUG => LogLevel::Debug,
        tracing::Level::INFO => LogLevel::Info,
        tracing::Level::WARN => LogLevel::Warn,
        tracing::Level::ERROR => LogLevel::Error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_accumulates() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Debug)
            .with_filter("core_metadata=trace")
            .with_target(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, Some(LogLevel::Debug));
        assert_eq!(config.filter.as_deref(), Some("core_metadata=trace"));
        assert!(config.display_target);
    }

    #[test]
    fn default_filter_is_valid() {
        assert!(build_filter(&LoggingConfig::default()).is_ok());
        assert!(build_filter(&LoggingConfig::default().with_level(LogLevel::Trace)).is_ok());
    }

    #[test]
    fn custom_filter_passes_through() {
        let config = LoggingConfig::default().with_filter("core_playback=debug");
        assert!(build_filter(&config).is_ok());
    }

    #[test]
    fn garbage_filter_is_rejected() {
        let config = LoggingConfig::default().with_filter("=[invalid");
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn tracing_levels_map_across() {
        assert_eq!(level_of(tracing::Level::WARN), LogLevel::Warn);
        assert_eq!(level_of(tracing::Level::TRACE), LogLevel::Trace);
    }
}
