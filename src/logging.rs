//! Structured run log
//!
//! Every line carries a level, the logger name and a set of typed fields. The
//! executor wraps each measurement phase in an operation, so all lines a phase
//! writes share one correlation id. Lines go to stdout, except warnings and
//! errors which go to stderr so they never mix into a piped report.

use crate::error::{AppError, Result};
use crate::models::{Config, LatencyResult, ThroughputResult};
use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Severity of a log line, ordered from chattiest to quietest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Per-probe and per-request detail
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Threshold only: a logger at this level writes nothing
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Off => "OFF",
        }
    }

    fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::BrightBlack,
            LogLevel::Debug => Color::Cyan,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error | LogLevel::Off => Color::Red,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" | "none" => Ok(LogLevel::Off),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// One log line before rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Name of the logger that wrote the line
    pub logger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Sorted by key so console lines are stable
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// How lines are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `time LEVEL name: message key=value ... [corr]`
    Console,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    /// Operation (phase) currently in progress
    correlation_id: Option<String>,
}

/// Cheap to clone; clones share the session and operation context, so one
/// logger can be handed to every worker task of a phase.
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Info and above, colored console lines
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// `--debug` gives Debug level JSON lines with source locations,
    /// `--verbose` gives Info, and a plain run only shows warnings.
    pub fn with_config(name: String, config: &Config) -> Self {
        let mut logger = Self::new(name);
        logger.use_color = config.enable_color;

        if config.debug {
            logger.min_level = LogLevel::Debug;
            logger.include_location = true;
            logger.format = LogFormat::Json;
        } else if !config.verbose {
            logger.min_level = LogLevel::Warn;
        }
        logger
    }

    /// A logger that writes nothing
    pub fn silent(name: String) -> Self {
        let mut logger = Self::new(name);
        logger.set_level(LogLevel::Off);
        logger
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Tag every later line, from this logger and all its clones
    pub async fn set_session_id(&self, session_id: String) {
        self.context.write().await.session_id = Some(session_id);
    }

    /// Begin an operation and return its correlation id. Lines written
    /// without an explicit id pick this one up until the operation ends.
    pub async fn start_operation(&self, operation: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();
        self.context.write().await.correlation_id = Some(correlation_id.clone());

        self.debug(&format!("{} started", operation))
            .correlation_id(&correlation_id)
            .field("operation", operation)
            .log()
            .await;

        correlation_id
    }

    pub async fn end_operation(&self, correlation_id: &str, operation: &str, success: bool) {
        self.debug(&format!("{} finished", operation))
            .correlation_id(correlation_id)
            .field("operation", operation)
            .field("success", success)
            .log()
            .await;

        let mut context = self.context.write().await;
        if context.correlation_id.as_deref() == Some(correlation_id) {
            context.correlation_id = None;
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        {
            let context = self.context.read().await;
            if let Some(session_id) = &context.session_id {
                entry.fields.insert("session_id".to_string(), session_id.clone().into());
            }
            if entry.correlation_id.is_none() {
                entry.correlation_id = context.correlation_id.clone();
            }
        }
        if !self.include_location {
            entry.location = None;
        }

        let line = self.render(&entry);
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", line);
        } else {
            let _ = writeln!(io::stdout(), "{}", line);
        }
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.render_console(entry),
            LogFormat::Json => serde_json::to_string(entry)
                .unwrap_or_else(|e| format!(r#"{{"message":{:?},"error":{:?}}}"#, entry.message, e.to_string())),
        }
    }

    fn render_console(&self, entry: &LogEntry) -> String {
        let level = format!("{:<5}", entry.level.as_str());
        let level = if self.use_color {
            level.color(entry.level.color()).to_string()
        } else {
            level
        };

        let mut line = format!(
            "{} {} {}: {}",
            entry.timestamp.format("%H:%M:%S%.3f"),
            level,
            entry.logger,
            entry.message
        );
        for (key, value) in &entry.fields {
            line.push_str(&format!(" {}={}", key, value));
        }
        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            line.push_str(&format!(" [{}]", short));
        }
        if let Some(location) = &entry.location {
            line.push_str(&format!(" @ {}", location));
        }
        line
    }
}

/// Collects fields for one line; nothing is written until [`log`](Self::log)
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Values that fail to serialize are skipped
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32) -> Self {
        self.entry.location = Some(format!("{}:{}", file, line));
        self
    }

    /// Raw samples and reduction of a latency phase
    pub fn latency(self, result: &LatencyResult) -> Self {
        self.field("samples_ms", &result.samples_ms)
            .field("median_ms", result.median_ms)
            .field("p90_ms", result.summary.p90_ms)
            .field("jitter_ms", result.summary.jitter_ms)
    }

    /// Byte count and rate of a transfer phase
    pub fn throughput(self, result: &ThroughputResult) -> Self {
        self.field("bytes", result.bytes)
            .field("elapsed_ms", result.elapsed_ms())
            .field("mbps", result.mbps)
            .field("workers", result.workers)
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Hands out named loggers that share one session id
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Debug line tagged with the calling file and line
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!())
            .log()
            .await
    };
}
