//! Error types for the logging engine

use std::time::Duration;

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Bad pattern, bad message template or argument index out of range
    #[error("Format error in '{input}': {message}")]
    Format { input: String, message: String },

    /// A single sink failed to accept or flush a record
    #[error("Sink '{sink}' write failed: {message}")]
    SinkWrite { sink: String, message: String },

    /// One or more sinks failed while dispatching a single record
    #[error("Logger '{logger}': {count} sink(s) failed: {summary}")]
    SinkFailures {
        logger: String,
        count: usize,
        summary: String,
    },

    /// A logger with this name is already registered
    #[error("Logger with name '{0}' already exists")]
    DuplicateName(String),

    /// No logger with this name is registered
    #[error("Logger with name '{0}' not found")]
    NameNotFound(String),

    /// Async queue full and the record was rejected
    #[error("Log queue full: capacity {capacity}, record dropped")]
    QueueFull { capacity: usize },

    /// Async queue stayed full for longer than the configured timeout
    #[error("Log queue still full after waiting {timeout:?}")]
    QueueTimeout { timeout: Duration },

    /// Logger already stopped
    #[error("Logger already stopped")]
    LoggerStopped,

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// File sink error with path
    #[error("File sink error for '{path}': {message}")]
    FileSink { path: String, message: String },

    /// File rotation error
    #[error("File rotation failed for '{path}': {message}")]
    FileRotation { path: String, message: String },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (configuration) error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create a format error for the given pattern or template
    pub fn format(input: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Format {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a sink write error
    pub fn sink_write(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::SinkWrite {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Aggregate per-sink failures of one dispatch into a single error
    pub fn sink_failures(logger: impl Into<String>, failures: &[LoggerError]) -> Self {
        let summary = failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        LoggerError::SinkFailures {
            logger: logger.into(),
            count: failures.len(),
            summary,
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create a queue full error
    pub fn queue_full(capacity: usize) -> Self {
        LoggerError::QueueFull { capacity }
    }

    /// Create a queue timeout error
    pub fn queue_timeout(timeout: Duration) -> Self {
        LoggerError::QueueTimeout { timeout }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a file sink error
    pub fn file_sink(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileSink {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file rotation error
    pub fn file_rotation(path: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::FileRotation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }

    /// Whether this error was caused by a malformed pattern or template
    #[must_use]
    pub fn is_format(&self) -> bool {
        matches!(self, LoggerError::Format { .. })
    }
}
