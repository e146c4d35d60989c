//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (level and output format)
//! - Define the `LogSink` capability used for access and lifecycle lines
//! - Provide the tracing-backed sink and an in-memory sink
//!
//! # Design Decisions
//! - Sinks are picked by explicit configuration at startup
//! - Fields travel as a JSON map so every backend renders them the same way
//! - `fatal` logs and then exits the process

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Structured fields attached to a log line.
pub type Fields = BTreeMap<String, Value>;

/// Build a [`Fields`] map from `key => value` pairs.
#[macro_export]
macro_rules! fields {
    () => { $crate::observability::logging::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::observability::logging::Fields::new();
        $( fields.insert(::std::string::String::from($key), ::serde_json::json!($value)); )+
        fields
    }};
}

/// Severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    /// Logged at error level, then the process exits.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(other.to_string()),
        }
    }
}

/// A destination for leveled, structured log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, severity: Severity, message: &str, fields: &Fields);

    fn debug(&self, message: &str, fields: &Fields) {
        self.log(Severity::Debug, message, fields);
    }

    fn info(&self, message: &str, fields: &Fields) {
        self.log(Severity::Info, message, fields);
    }

    fn warn(&self, message: &str, fields: &Fields) {
        self.log(Severity::Warn, message, fields);
    }

    fn error(&self, message: &str, fields: &Fields) {
        self.log(Severity::Error, message, fields);
    }

    /// Log and terminate the process with exit status 1.
    fn fatal(&self, message: &str, fields: &Fields) -> ! {
        self.log(Severity::Fatal, message, fields);
        std::process::exit(1)
    }
}

/// Shared handle to a sink.
pub type SharedSink = Arc<dyn LogSink>;

/// Forwards lines into `tracing`; the fields are rendered as one JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, severity: Severity, message: &str, fields: &Fields) {
        let fields = serde_json::to_string(fields).unwrap_or_default();
        match severity {
            Severity::Debug => tracing::debug!(fields = %fields, "{message}"),
            Severity::Info => tracing::info!(fields = %fields, "{message}"),
            Severity::Warn => tracing::warn!(fields = %fields, "{message}"),
            Severity::Error => tracing::error!(fields = %fields, "{message}"),
            Severity::Fatal => tracing::error!(fatal = true, fields = %fields, "{message}"),
        }
    }
}

/// One line recorded by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
    pub fields: Fields,
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded lines.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogSink for MemorySink {
    fn log(&self, severity: Severity, message: &str, fields: &Fields) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                severity,
                message: message.to_string(),
                fields: fields.clone(),
            });
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set. Returns `false` if a
/// subscriber was already installed.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
    };
    result.is_ok()
}
