//! # Rust Log Engine
//!
//! A structured logging engine with named loggers, a pattern formatter and
//! pluggable sinks, dispatching either on the calling thread or through a
//! bounded background queue.
//!
//! ## Features
//!
//! - **Named Loggers**: a process-wide registry maps names to shared loggers
//! - **Pattern Formatting**: `%Y-%m-%d %H:%M:%S.%e [%n] [%l] %v` style line layouts
//! - **Message Templates**: `{}` / `{0}` / `{:>8.3f}` placeholders with typed arguments
//! - **Sinks**: console, plain file, size-rotated file, daily file, syslog, color decorator
//! - **Async Dispatch**: bounded queue with block, discard-oldest and discard-new policies
//!
//! ## Example
//!
//! ```
//! use rust_log_engine::prelude::*;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let logger = Logger::builder("app")
//!     .sink(sink.clone())
//!     .pattern("[%n] [%l] %v")
//!     .build()
//!     .unwrap();
//!
//! logger.info("Welcome to {}!", &[&"rust_log_engine"]).unwrap();
//! logger.debug("hidden at the default level", &[]).unwrap();
//!
//! assert_eq!(sink.lines(), vec!["[app] [info] Welcome to rust_log_engine!"]);
//! ```

pub mod core;
pub mod factory;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        Arg, AsyncConfig, FormatArg, LevelPropagation, LogLevel, LogRecord, Logger, LoggerBuilder,
        LoggerError, LoggerMetrics, LoggingConfig, OverflowPolicy, PatternFormatter, Registry,
        Result, ShutdownMode, Sink, SinkRef, Threading, DEFAULT_SHUTDOWN_TIMEOUT,
    };
    pub use crate::sinks::{
        ConsoleSink, DailyFileSink, FileSink, MemorySink, RotatingFileSink,
    };
}

pub use crate::core::{
    format_message, Arg, AsyncConfig, AsyncSettings, Clock, ErrorHandler, FormatArg,
    LevelPropagation, LogLevel, LogRecord, LogStream, Logger, LoggerBuilder, LoggerError,
    LoggerMetrics, LoggerSpec, LoggingConfig, ManualClock, MetricsSnapshot, OverflowPolicy,
    PatternFormatter, Registry, Result, ShutdownMode, Sink, SinkKind, SinkRef, SinkSpec,
    SystemClock, Threading,
    DEFAULT_PATTERN, DEFAULT_QUEUE_CAPACITY, DEFAULT_SHUTDOWN_TIMEOUT,
};
#[cfg(unix)]
pub use factory::syslog_logger;
#[cfg(feature = "console")]
pub use factory::{stderr_color_mt, stdout_color_mt};
pub use factory::{
    basic_logger_mt, basic_logger_st, create, daily_logger_mt, daily_logger_st,
    rotating_logger_mt, rotating_logger_st, stderr_logger_mt, stderr_logger_st, stdout_logger_mt,
    stdout_logger_st,
};

use std::sync::Arc;

/// Look up a logger in the global registry
pub fn get(name: &str) -> Option<Arc<Logger>> {
    Registry::global().get(name)
}

/// Remove a logger from the global registry
pub fn drop(name: &str) -> Result<()> {
    Registry::global().drop(name)
}

/// Flush, drain and remove every logger in the global registry
pub fn drop_all() {
    Registry::global().drop_all();
}

/// Set the level of every global logger (see [`LevelPropagation`])
pub fn set_level(level: LogLevel) {
    Registry::global().set_level(level);
}

/// Set the pattern of every global logger. Nothing changes if it does not compile.
pub fn set_pattern(pattern: &str) -> Result<()> {
    Registry::global().set_pattern(pattern)
}

/// Create global loggers asynchronous from now on
pub fn set_async_mode(config: AsyncConfig) -> Result<()> {
    Registry::global().set_async_mode(config)
}

/// Create global loggers synchronous from now on
pub fn set_sync_mode() {
    Registry::global().set_sync_mode();
}

/// Flush every global logger
pub fn flush_all() -> Result<()> {
    Registry::global().flush_all()
}

/// Create the loggers described by `config` in the global registry
pub fn apply_config(config: &LoggingConfig) -> Result<Vec<Arc<Logger>>> {
    Registry::global().apply_config(config)
}

/// Drain and drop every global logger. Call before the process exits so
/// async queues are written out.
pub fn shutdown() {
    Registry::global().shutdown();
}
