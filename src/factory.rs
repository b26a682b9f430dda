//! Convenience constructors
//!
//! Each function builds one sink, creates a logger around it with the global
//! registry's defaults and registers it. The `_mt` variants share the sink
//! between threads; the `_st` variants use single-threaded sinks.
//!
//! ```no_run
//! use rust_log_engine::factory;
//!
//! let console = factory::stdout_logger_mt("console").unwrap();
//! console.info("Welcome!", &[]).unwrap();
//!
//! let file = factory::rotating_logger_mt("file_logger", "logs/mylogfile", 5 * 1024 * 1024, 3).unwrap();
//! file.info("Rotating log line {}", &[&1]).unwrap();
//!
//! let daily = factory::daily_logger_mt("daily_logger", "logs/daily", 2, 30).unwrap();
//! daily.notice("rotates at 02:30", &[]).unwrap();
//! ```

use crate::core::{
    error::Result,
    logger::Logger,
    registry::Registry,
    sink::{SinkRef, Threading},
};
use crate::sinks::{ConsoleSink, ConsoleTarget, DailyFileSink, FileSink, RotatingFileSink};
use std::path::PathBuf;
use std::sync::Arc;

/// Create and register a logger with the given sinks
pub fn create(name: impl Into<String>, sinks: Vec<SinkRef>) -> Result<Arc<Logger>> {
    Registry::global().create(name, sinks)
}

fn single(name: impl Into<String>, sink: SinkRef) -> Result<Arc<Logger>> {
    create(name, vec![sink])
}

/// Logger writing to the shared stdout sink
pub fn stdout_logger_mt(name: impl Into<String>) -> Result<Arc<Logger>> {
    single(name, ConsoleSink::stdout_instance())
}

pub fn stdout_logger_st(name: impl Into<String>) -> Result<Arc<Logger>> {
    single(name, Arc::new(ConsoleSink::stdout_st()))
}

/// Logger writing to the shared stderr sink
pub fn stderr_logger_mt(name: impl Into<String>) -> Result<Arc<Logger>> {
    single(name, ConsoleSink::stderr_instance())
}

pub fn stderr_logger_st(name: impl Into<String>) -> Result<Arc<Logger>> {
    single(name, Arc::new(ConsoleSink::stderr_st()))
}

#[cfg(feature = "console")]
fn color_console(name: impl Into<String>, target: ConsoleTarget) -> Result<Arc<Logger>> {
    let console = match target {
        ConsoleTarget::Stdout => ConsoleSink::stdout_instance(),
        ConsoleTarget::Stderr => ConsoleSink::stderr_instance(),
    };
    single(name, Arc::new(crate::sinks::ColorSink::new(console)))
}

/// Logger writing colored lines to stdout
#[cfg(feature = "console")]
pub fn stdout_color_mt(name: impl Into<String>) -> Result<Arc<Logger>> {
    color_console(name, ConsoleTarget::Stdout)
}

/// Logger writing colored lines to stderr
#[cfg(feature = "console")]
pub fn stderr_color_mt(name: impl Into<String>) -> Result<Arc<Logger>> {
    color_console(name, ConsoleTarget::Stderr)
}

/// Logger appending to a single file
pub fn basic_logger_mt(
    name: impl Into<String>,
    path: impl Into<PathBuf>,
    truncate: bool,
) -> Result<Arc<Logger>> {
    single(name, Arc::new(FileSink::new(path, truncate)?))
}

pub fn basic_logger_st(
    name: impl Into<String>,
    path: impl Into<PathBuf>,
    truncate: bool,
) -> Result<Arc<Logger>> {
    single(
        name,
        Arc::new(FileSink::with_threading(path, truncate, Threading::Single)?),
    )
}

/// Logger writing to a size-rotated file
pub fn rotating_logger_mt(
    name: impl Into<String>,
    path: impl Into<PathBuf>,
    max_bytes: u64,
    max_files: usize,
) -> Result<Arc<Logger>> {
    single(name, Arc::new(RotatingFileSink::new(path, max_bytes, max_files)?))
}

pub fn rotating_logger_st(
    name: impl Into<String>,
    path: impl Into<PathBuf>,
    max_bytes: u64,
    max_files: usize,
) -> Result<Arc<Logger>> {
    single(
        name,
        Arc::new(RotatingFileSink::new_st(path, max_bytes, max_files)?),
    )
}

/// Logger starting a new file every day at `hour:minute`
pub fn daily_logger_mt(
    name: impl Into<String>,
    path: impl Into<PathBuf>,
    hour: u32,
    minute: u32,
) -> Result<Arc<Logger>> {
    single(name, Arc::new(DailyFileSink::new(path, hour, minute)?))
}

pub fn daily_logger_st(
    name: impl Into<String>,
    path: impl Into<PathBuf>,
    hour: u32,
    minute: u32,
) -> Result<Arc<Logger>> {
    single(name, Arc::new(DailyFileSink::new_st(path, hour, minute)?))
}

/// Logger forwarding to the local syslog daemon with the `user` facility
#[cfg(unix)]
pub fn syslog_logger(name: impl Into<String>, ident: impl Into<String>) -> Result<Arc<Logger>> {
    use crate::sinks::{Facility, SyslogSink};
    single(name, Arc::new(SyslogSink::new(ident, Facility::User)?))
}
