//! Sink trait for log output destinations

use super::error::{LoggerError, Result};
use super::log_level::{AtomicLevel, LogLevel};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// A destination for formatted log lines.
///
/// `text` is the fully formatted line without a trailing newline. Sinks that
/// write lines append the newline themselves. A record below the sink's own
/// level is dropped and `accept` returns `Ok(())`.
pub trait Sink: Send + Sync {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn set_level(&self, level: LogLevel);
    fn level(&self) -> LogLevel;
    fn name(&self) -> &str;

    #[inline]
    fn should_accept(&self, level: LogLevel) -> bool {
        level.passes(self.level())
    }
}

/// Shared handle to a sink. The same sink may be attached to several loggers.
pub type SinkRef = Arc<dyn Sink>;

/// How a sink guards its backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threading {
    /// Callers wait for each other
    #[default]
    Multi,
    /// Meant for one thread. A concurrent caller fails instead of waiting.
    Single,
}

impl Threading {
    pub fn suffix(self) -> &'static str {
        match self {
            Threading::Multi => "mt",
            Threading::Single => "st",
        }
    }
}

/// Backend state of a sink together with its level and threading mode.
///
/// Concrete sinks keep their writer inside a `SinkCell` and use
/// [`SinkCell::with`] for every access to it.
#[derive(Debug)]
pub struct SinkCell<B> {
    name: String,
    backend: Mutex<B>,
    level: AtomicLevel,
    threading: Threading,
}

impl<B> SinkCell<B> {
    pub fn new(name: impl Into<String>, backend: B, threading: Threading) -> Self {
        Self {
            name: name.into(),
            backend: Mutex::new(backend),
            level: AtomicLevel::new(LogLevel::Trace),
            threading,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threading(&self) -> Threading {
        self.threading
    }

    pub fn level(&self) -> LogLevel {
        self.level.load()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level);
    }

    fn lock(&self) -> Result<MutexGuard<'_, B>> {
        match self.threading {
            Threading::Multi => Ok(self.backend.lock()),
            Threading::Single => self.backend.try_lock().ok_or_else(|| {
                LoggerError::sink_write(
                    &self.name,
                    "single-threaded sink used concurrently from another thread",
                )
            }),
        }
    }

    /// Run `f` with exclusive access to the backend
    pub fn with<R>(&self, f: impl FnOnce(&mut B) -> Result<R>) -> Result<R> {
        let mut guard = self.lock()?;
        f(&mut guard)
    }
}
