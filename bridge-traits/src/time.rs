//! Time and Logging Abstractions
//!
//! The update gate enforces a minimum spacing between engine writes and the
//! poll scheduler measures intervals; both need a time source that tests can
//! drive by hand. Wall-clock time is only used for log timestamps, so the
//! [`Clock`] trait carries both readings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Injectable time source.
pub trait Clock: Send + Sync {
    /// Current wall-clock time (UTC). May jump; never used for spacing math.
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic time since an arbitrary fixed origin. Never decreases.
    fn monotonic(&self) -> Duration;

    /// Milliseconds since the Unix epoch.
    fn unix_timestamp_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Production clock backed by the operating system.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        // All SystemClock instances share one origin so readings compare.
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        ORIGIN.get_or_init(Instant::now).elapsed()
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Structured log entry handed to a [`LoggerSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub timestamp: DateTime<Utc>,
    /// Emitting module/component.
    pub target: String,
    pub message: String,
    /// Structured fields attached to the event.
    pub fields: HashMap<String, String>,
}

impl LogEntry {
    pub fn new(level: LogLevel, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            target: target.into(),
            message: message.into(),
            fields: HashMap::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Destination for core logs on the host side (OSLog, Logcat, files, console).
///
/// Hosts should make sure nothing sensitive ends up in their pipelines; the
/// core itself only logs URLs, states, and display strings.
#[async_trait::async_trait]
pub trait LoggerSink: Send + Sync {
    /// Deliver one entry to the host logging system.
    async fn log(&self, entry: LogEntry) -> Result<()>;

    /// Flush buffered entries, if the sink buffers.
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Entries below this level are dropped before delivery.
    fn min_level(&self) -> LogLevel {
        LogLevel::Info
    }
}

/// Stdout sink for development and tests.
#[derive(Debug, Clone)]
pub struct ConsoleLogger {
    pub min_level: LogLevel,
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
        }
    }
}

#[async_trait::async_trait]
impl LoggerSink for ConsoleLogger {
    async fn log(&self, entry: LogEntry) -> Result<()> {
        if entry.level < self.min_level {
            return Ok(());
        }

        let mut line = format!(
            "[{}] {:5} {}: {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            entry.level.as_str().to_uppercase(),
            entry.target,
            entry.message
        );
        for (key, value) in &entry.fields {
            line.push_str(&format!(" {}={}", key, value));
        }
        println!("{}", line);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        self.min_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_monotonic_never_decreases() {
        let clock = SystemClock;
        let a = clock.monotonic();
        let b = clock.monotonic();
        assert!(b >= a);
        assert!(clock.unix_timestamp_millis() > 0);
    }

    #[test]
    fn log_levels_order() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.as_str(), "warn");
    }

    #[test]
    fn log_entry_accumulates_fields() {
        let entry = LogEntry::new(LogLevel::Info, "session", "backend selected")
            .with_field("backend", "primary");

        assert_eq!(entry.target, "session");
        assert_eq!(
            entry.fields.get("backend").map(String::as_str),
            Some("primary")
        );
    }

    #[tokio::test]
    async fn console_logger_filters_below_min_level() {
        let logger = ConsoleLogger {
            min_level: LogLevel::Warn,
        };
        logger
            .log(LogEntry::new(LogLevel::Debug, "test", "dropped"))
            .await
            .unwrap();
        logger
            .log(LogEntry::new(LogLevel::Error, "test", "printed"))
            .await
            .unwrap();
    }
}
