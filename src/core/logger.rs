//! Named logger: level gate, pattern and an ordered list of sinks

use super::{
    dispatcher::{AsyncConfig, AsyncDispatcher, RecordHandler, ShutdownMode, DEFAULT_SHUTDOWN_TIMEOUT},
    error::{LoggerError, Result},
    log_level::{AtomicLevel, LogLevel},
    log_record::LogRecord,
    metrics::LoggerMetrics,
    pattern::PatternFormatter,
    sink::SinkRef,
    template::{format_message, FormatArg},
};
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Receives errors that cannot be returned to the caller, such as sink
/// failures during dispatch.
pub type ErrorHandler = Arc<dyn Fn(&LoggerError) + Send + Sync>;

fn default_error_handler() -> ErrorHandler {
    Arc::new(|err: &LoggerError| eprintln!("[LOGGER ERROR] {}", err))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// State shared between a logger and its async workers
pub(crate) struct LoggerShared {
    name: Arc<str>,
    level: AtomicLevel,
    flush_level: AtomicLevel,
    formatter: RwLock<Arc<PatternFormatter>>,
    sinks: RwLock<Vec<SinkRef>>,
    metrics: Arc<LoggerMetrics>,
    error_handler: RwLock<ErrorHandler>,
}

impl LoggerShared {
    fn report(&self, err: &LoggerError) {
        let handler = Arc::clone(&*self.error_handler.read());
        handler(err);
    }

    /// Format a record and hand it to every sink.
    ///
    /// Each sink is isolated: an error or panic in one is collected and the
    /// remaining sinks still receive the record.
    fn dispatch(&self, record: &LogRecord) {
        let formatter = Arc::clone(&*self.formatter.read());
        let line = formatter.format(record);
        let sinks = self.sinks.read().clone();

        let mut failures = Vec::new();
        for sink in &sinks {
            if !sink.should_accept(record.level) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| sink.accept(&line, record.level))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(panic) => failures.push(LoggerError::sink_write(
                    sink.name(),
                    format!("panicked: {}", panic_message(&*panic)),
                )),
            }
        }

        self.metrics.record_logged();
        if !failures.is_empty() {
            self.metrics.record_sink_failure();
            self.report(&LoggerError::sink_failures(&*self.name, &failures));
        }

        if record.level.passes(self.flush_level.load()) {
            RecordHandler::flush(self);
        }
    }

    fn flush_sinks(&self) -> Vec<LoggerError> {
        let sinks = self.sinks.read().clone();
        let mut failures = Vec::new();
        for sink in &sinks {
            match catch_unwind(AssertUnwindSafe(|| sink.flush())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(e),
                Err(panic) => failures.push(LoggerError::sink_write(
                    sink.name(),
                    format!("panicked during flush: {}", panic_message(&*panic)),
                )),
            }
        }
        failures
    }
}

impl RecordHandler for LoggerShared {
    fn handle(&self, record: &LogRecord) {
        self.dispatch(record);
    }

    fn flush(&self) {
        let failures = self.flush_sinks();
        if !failures.is_empty() {
            self.report(&LoggerError::sink_failures(&*self.name, &failures));
        }
    }
}

/// A named handle that gates, formats and routes records to its sinks.
///
/// A synchronous logger writes on the calling thread. An asynchronous one
/// queues records for its [`AsyncDispatcher`] workers.
///
/// # Example
///
/// ```
/// use rust_log_engine::prelude::*;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let logger = Logger::builder("app")
///     .sink(sink.clone())
///     .pattern("%l: %v")
///     .build()
///     .unwrap();
///
/// logger.info("{} users online", &[&42]).unwrap();
/// assert_eq!(sink.lines(), vec!["info: 42 users online"]);
/// ```
pub struct Logger {
    shared: Arc<LoggerShared>,
    dispatcher: Option<AsyncDispatcher>,
}

macro_rules! level_methods {
    ($($method:ident, $stream:ident => $level:expr;)*) => {
        $(
            #[inline]
            pub fn $method(&self, template: &str, args: &[&dyn FormatArg]) -> Result<()> {
                self.log($level, template, args)
            }

            #[inline]
            pub fn $stream(&self) -> LogStream<'_> {
                self.stream($level)
            }
        )*
    };
}

impl Logger {
    /// Create a synchronous logger with the default level and pattern
    pub fn new(name: impl Into<String>, sinks: Vec<SinkRef>) -> Self {
        Self::from_parts(
            name.into(),
            sinks,
            LogLevel::default(),
            LogLevel::Off,
            Arc::new(PatternFormatter::default()),
            default_error_handler(),
        )
    }

    /// Create a builder for Logger
    #[must_use]
    pub fn builder(name: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(name)
    }

    fn from_parts(
        name: String,
        sinks: Vec<SinkRef>,
        level: LogLevel,
        flush_level: LogLevel,
        formatter: Arc<PatternFormatter>,
        error_handler: ErrorHandler,
    ) -> Self {
        let shared = LoggerShared {
            name: Arc::from(name),
            level: AtomicLevel::new(level),
            flush_level: AtomicLevel::new(flush_level),
            formatter: RwLock::new(formatter),
            sinks: RwLock::new(sinks),
            metrics: Arc::new(LoggerMetrics::new()),
            error_handler: RwLock::new(error_handler),
        };
        Self {
            shared: Arc::new(shared),
            dispatcher: None,
        }
    }

    fn start_async(mut self, config: AsyncConfig) -> Result<Self> {
        let handler: Arc<dyn RecordHandler> = self.shared.clone();
        let dispatcher = AsyncDispatcher::start(
            &self.shared.name,
            config,
            handler,
            Arc::clone(&self.shared.metrics),
        )?;
        self.dispatcher = Some(dispatcher);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn level(&self) -> LogLevel {
        self.shared.level.load()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.shared.level.store(level);
    }

    /// Whether a record at `level` would pass this logger's gate
    #[inline]
    pub fn should_log(&self, level: LogLevel) -> bool {
        level.passes(self.shared.level.load())
    }

    pub fn flush_level(&self) -> LogLevel {
        self.shared.flush_level.load()
    }

    /// Flush all sinks after every record at `level` or above
    pub fn flush_on(&self, level: LogLevel) {
        self.shared.flush_level.store(level);
    }

    pub fn pattern(&self) -> String {
        self.shared.formatter.read().pattern().to_string()
    }

    /// Compile and install a new pattern. On error the current pattern stays.
    pub fn set_pattern(&self, pattern: &str) -> Result<()> {
        let formatter = PatternFormatter::new(pattern)?;
        self.set_formatter(Arc::new(formatter));
        Ok(())
    }

    /// Install an already compiled pattern
    pub fn set_formatter(&self, formatter: Arc<PatternFormatter>) {
        *self.shared.formatter.write() = formatter;
    }

    /// Snapshot of the attached sinks, in dispatch order
    pub fn sinks(&self) -> Vec<SinkRef> {
        self.shared.sinks.read().clone()
    }

    pub fn add_sink(&self, sink: SinkRef) {
        self.shared.sinks.write().push(sink);
    }

    /// Detach a sink by identity. Returns whether it was attached.
    pub fn remove_sink(&self, sink: &SinkRef) -> bool {
        let mut sinks = self.shared.sinks.write();
        let before = sinks.len();
        sinks.retain(|attached| !Arc::ptr_eq(attached, sink));
        sinks.len() != before
    }

    pub fn set_error_handler(&self, handler: ErrorHandler) {
        *self.shared.error_handler.write() = handler;
    }

    pub fn is_async(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// Async settings, if this logger dispatches on worker threads
    pub fn async_config(&self) -> Option<&AsyncConfig> {
        self.dispatcher.as_ref().map(AsyncDispatcher::config)
    }

    /// Get the logger metrics for detailed observability
    pub fn metrics(&self) -> &LoggerMetrics {
        &self.shared.metrics
    }

    /// Render `template` with `args` and emit it at `level`.
    ///
    /// Nothing is formatted when the level is disabled. A malformed template
    /// is returned as a `Format` error and reaches no sink. Sink failures are
    /// reported to the error handler, not returned.
    pub fn log(&self, level: LogLevel, template: &str, args: &[&dyn FormatArg]) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        let message = format_message(template, args).map_err(|e| {
            self.shared.metrics.record_format_error();
            e
        })?;
        self.submit(LogRecord::new(Arc::clone(&self.shared.name), level, message))
    }

    /// Emit text that is already rendered
    pub fn log_str(&self, level: LogLevel, message: &str) -> Result<()> {
        if !self.should_log(level) {
            return Ok(());
        }
        self.submit(LogRecord::new(
            Arc::clone(&self.shared.name),
            level,
            message.to_string(),
        ))
    }

    fn submit(&self, record: LogRecord) -> Result<()> {
        match &self.dispatcher {
            Some(dispatcher) => dispatcher.enqueue(record),
            None => {
                self.shared.dispatch(&record);
                Ok(())
            }
        }
    }

    level_methods! {
        trace, trace_stream => LogLevel::Trace;
        debug, debug_stream => LogLevel::Debug;
        info, info_stream => LogLevel::Info;
        notice, notice_stream => LogLevel::Notice;
        warn, warn_stream => LogLevel::Warn;
        error, error_stream => LogLevel::Error;
        critical, critical_stream => LogLevel::Critical;
        alert, alert_stream => LogLevel::Alert;
        emerg, emerg_stream => LogLevel::Emerg;
    }

    /// Start a streamed record at `level`, emitted when the stream is dropped
    pub fn stream(&self, level: LogLevel) -> LogStream<'_> {
        let logger = if self.should_log(level) { Some(self) } else { None };
        LogStream {
            logger,
            level,
            buffer: String::new(),
        }
    }

    /// Flush every sink. An async logger first waits for its queue to reach
    /// the point of this call.
    pub fn flush(&self) -> Result<()> {
        if let Some(dispatcher) = &self.dispatcher {
            if !dispatcher.is_stopped() {
                return dispatcher.flush();
            }
        }
        let failures = self.shared.flush_sinks();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(LoggerError::sink_failures(&*self.shared.name, &failures))
        }
    }

    /// Stop the async dispatcher and flush the sinks.
    ///
    /// Idempotent. After this an async logger rejects records with
    /// `LoggerStopped`. Returns `false` if the workers did not stop cleanly.
    pub fn shutdown(&self, mode: ShutdownMode) -> bool {
        self.shutdown_timeout(mode, DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Like [`Logger::shutdown`], waiting at most `timeout` for the workers
    pub fn shutdown_timeout(&self, mode: ShutdownMode, timeout: Duration) -> bool {
        let mut clean = true;
        if let Some(dispatcher) = &self.dispatcher {
            clean = dispatcher.shutdown(mode, timeout);
        }
        if let Err(e) = self.flush() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
            return false;
        }
        clean
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name())
            .field("level", &self.level())
            .field("pattern", &self.pattern())
            .field("sinks", &self.shared.sinks.read().len())
            .field("async", &self.is_async())
            .finish()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT);
        }

        for e in self.shared.flush_sinks() {
            eprintln!("[LOGGER ERROR] Failed to flush during shutdown: {}", e);
        }

        let dropped = self.shared.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger '{}' shutting down with {} dropped logs (drop rate: {:.2}%)",
                self.shared.name,
                dropped,
                self.shared.metrics.drop_rate()
            );
        }
    }
}

/// One record assembled piece by piece and emitted on drop.
///
/// Obtained from [`Logger::stream`]. When the level is disabled the stream is
/// inert and appended values are never formatted.
///
/// ```
/// use rust_log_engine::prelude::*;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemorySink::new());
/// let logger = Logger::builder("net").sink(sink.clone()).pattern("%v").build().unwrap();
///
/// logger.info_stream().append("connected to ").append("db-1").append(':').append(5432);
/// assert_eq!(sink.lines(), vec!["connected to db-1:5432"]);
/// ```
pub struct LogStream<'a> {
    logger: Option<&'a Logger>,
    level: LogLevel,
    buffer: String,
}

impl LogStream<'_> {
    /// Append a displayable value to the record
    pub fn append<T: fmt::Display>(mut self, value: T) -> Self {
        if self.logger.is_some() {
            use fmt::Write as _;
            let _ = write!(self.buffer, "{}", value);
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.logger.is_some()
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl fmt::Write for LogStream<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.logger.is_some() {
            self.buffer.push_str(s);
        }
        Ok(())
    }
}

impl Drop for LogStream<'_> {
    fn drop(&mut self) {
        if let Some(logger) = self.logger.take() {
            if let Err(e) = logger.log_str(self.level, &self.buffer) {
                logger.shared.report(&e);
            }
        }
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_log_engine::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder("worker")
///     .level(LogLevel::Debug)
///     .sink(Arc::new(MemorySink::new()))
///     .async_mode(AsyncConfig::new(1000).with_overflow_policy(OverflowPolicy::DiscardOldest))
///     .build()
///     .unwrap();
/// assert!(logger.is_async());
/// ```
pub struct LoggerBuilder {
    name: String,
    sinks: Vec<SinkRef>,
    level: LogLevel,
    flush_level: LogLevel,
    pattern: Option<String>,
    formatter: Option<Arc<PatternFormatter>>,
    async_config: Option<AsyncConfig>,
    error_handler: Option<ErrorHandler>,
}

impl LoggerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sinks: Vec::new(),
            level: LogLevel::default(),
            flush_level: LogLevel::Off,
            pattern: None,
            formatter: None,
            async_config: None,
            error_handler: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: SinkRef) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sinks(mut self, sinks: impl IntoIterator<Item = SinkRef>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_level(mut self, level: LogLevel) -> Self {
        self.flush_level = level;
        self
    }

    /// Pattern source, compiled by [`LoggerBuilder::build`]
    #[must_use = "builder methods return a new value"]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self.formatter = None;
        self
    }

    /// Share an already compiled pattern
    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: Arc<PatternFormatter>) -> Self {
        self.formatter = Some(formatter);
        self.pattern = None;
        self
    }

    /// Dispatch on background workers instead of the calling thread
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, config: AsyncConfig) -> Self {
        self.async_config = Some(config);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn error_handler(mut self, handler: ErrorHandler) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Build the Logger. Fails on a malformed pattern or invalid async settings.
    pub fn build(self) -> Result<Logger> {
        let formatter = match (self.formatter, self.pattern) {
            (Some(formatter), _) => formatter,
            (None, Some(pattern)) => Arc::new(PatternFormatter::new(&pattern)?),
            (None, None) => Arc::new(PatternFormatter::default()),
        };

        let logger = Logger::from_parts(
            self.name,
            self.sinks,
            self.level,
            self.flush_level,
            formatter,
            self.error_handler.unwrap_or_else(default_error_handler),
        );

        match self.async_config {
            Some(config) => logger.start_async(config),
            None => Ok(logger),
        }
    }
}
