//! Core logger types and traits

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod log_level;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod pattern;
pub mod registry;
pub mod sink;
pub mod template;

pub use clock::{Clock, ClockRef, ManualClock, SystemClock};
pub use config::{AsyncSettings, LoggerSpec, LoggingConfig, SinkKind, SinkSpec};
pub use dispatcher::{
    AsyncConfig, AsyncDispatcher, RecordHandler, ShutdownMode, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use error::{LoggerError, Result};
pub use log_level::{AtomicLevel, LogLevel};
pub use log_record::LogRecord;
pub use logger::{ErrorHandler, LogStream, Logger, LoggerBuilder};
pub use metrics::{LoggerMetrics, MetricsSnapshot};
pub use overflow_policy::OverflowPolicy;
pub use pattern::{PatternFormatter, DEFAULT_PATTERN};
pub use registry::{LevelPropagation, Registry};
pub use sink::{Sink, SinkCell, SinkRef, Threading};
pub use template::{format_message, Arg, FormatArg};
