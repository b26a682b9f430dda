//! JSON logging configuration
//!
//! A [`LoggingConfig`] describes registry defaults and a list of loggers with
//! their sinks. It is applied with [`Registry::apply_config`](super::registry::Registry::apply_config).
//!
//! ```
//! use rust_log_engine::LoggingConfig;
//!
//! let config = LoggingConfig::from_json(r#"{
//!     "level": "debug",
//!     "pattern": "[%l] %v",
//!     "async": { "queue_capacity": 1024, "overflow_policy": "discard-oldest" },
//!     "loggers": [
//!         { "name": "app", "sinks": [ { "type": "stdout", "color": true } ] },
//!         { "name": "audit", "async": false, "sinks": [
//!             { "type": "rotating_file", "path": "logs/audit.log", "max_bytes": 1048576, "max_files": 3 }
//!         ] }
//!     ]
//! }"#).unwrap();
//!
//! assert_eq!(config.loggers.len(), 2);
//! ```

use super::dispatcher::{AsyncConfig, DEFAULT_QUEUE_CAPACITY};
use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::overflow_policy::OverflowPolicy;
use super::sink::SinkRef;
use crate::sinks::{ConsoleSink, DailyFileSink, FileSink, RotatingFileSink};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Registry defaults plus the loggers to create
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default level for every logger
    pub level: Option<LogLevel>,
    /// Default pattern for every logger
    pub pattern: Option<String>,
    /// Default flush level for loggers created from this config
    pub flush_level: Option<LogLevel>,
    /// Enables async dispatch for new loggers
    #[serde(rename = "async")]
    pub async_settings: Option<AsyncSettings>,
    pub loggers: Vec<LoggerSpec>,
}

impl LoggingConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoggingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation(
                "reading logging configuration",
                format!("cannot read '{}'", path.display()),
                e,
            )
        })?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the parts that do not need any I/O: names, async settings and
    /// sink parameters.
    pub fn validate(&self) -> Result<()> {
        if let Some(settings) = &self.async_settings {
            settings.to_async_config().validate()?;
        }

        let mut names = HashSet::new();
        for logger in &self.loggers {
            if logger.name.is_empty() {
                return Err(LoggerError::config("LoggingConfig", "logger name is empty"));
            }
            if !names.insert(logger.name.as_str()) {
                return Err(LoggerError::DuplicateName(logger.name.clone()));
            }
            for sink in &logger.sinks {
                sink.kind.validate()?;
            }
        }
        Ok(())
    }
}

/// Async dispatch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AsyncSettings {
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    pub worker_count: usize,
    pub flush_interval_ms: Option<u64>,
}

impl Default for AsyncSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::Block,
            worker_count: 1,
            flush_interval_ms: None,
        }
    }
}

impl AsyncSettings {
    pub fn to_async_config(&self) -> AsyncConfig {
        let config = AsyncConfig::new(self.queue_capacity)
            .with_overflow_policy(self.overflow_policy)
            .with_worker_count(self.worker_count);
        match self.flush_interval_ms {
            Some(ms) => config.with_flush_interval(Duration::from_millis(ms)),
            None => config,
        }
    }
}

impl From<&AsyncConfig> for AsyncSettings {
    fn from(config: &AsyncConfig) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            overflow_policy: config.overflow_policy,
            worker_count: config.worker_count,
            flush_interval_ms: config
                .flush_interval
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
        }
    }
}

/// One logger to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerSpec {
    pub name: String,
    #[serde(default)]
    pub level: Option<LogLevel>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub flush_level: Option<LogLevel>,
    /// Overrides the registry's dispatch mode for this logger
    #[serde(default, rename = "async")]
    pub async_mode: Option<bool>,
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
}

impl LoggerSpec {
    /// Open every sink of this logger
    pub fn build_sinks(&self) -> Result<Vec<SinkRef>> {
        self.sinks.iter().map(SinkSpec::build).collect()
    }
}

/// A sink and its optional level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkSpec {
    #[serde(flatten)]
    pub kind: SinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
}

/// Sink type and its parameters, selected by the `type` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkKind {
    Stdout {
        #[serde(default)]
        color: bool,
    },
    Stderr {
        #[serde(default)]
        color: bool,
    },
    File {
        path: PathBuf,
        #[serde(default)]
        truncate: bool,
    },
    RotatingFile {
        path: PathBuf,
        max_bytes: u64,
        max_files: usize,
        #[serde(default)]
        compress: bool,
    },
    DailyFile {
        path: PathBuf,
        #[serde(default)]
        hour: u32,
        #[serde(default)]
        minute: u32,
        #[serde(default)]
        max_files: usize,
    },
    Syslog {
        ident: String,
        #[serde(default)]
        facility: Option<String>,
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl SinkKind {
    fn validate(&self) -> Result<()> {
        match self {
            SinkKind::RotatingFile { max_bytes: 0, .. } => Err(LoggerError::config(
                "rotating_file",
                "max_bytes must be positive",
            )),
            SinkKind::DailyFile { hour, minute, .. } if *hour > 23 || *minute > 59 => {
                Err(LoggerError::config(
                    "daily_file",
                    format!("invalid rotation time {:02}:{:02}", hour, minute),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl SinkSpec {
    /// Open the sink described by this spec
    pub fn build(&self) -> Result<SinkRef> {
        let sink: SinkRef = match &self.kind {
            SinkKind::Stdout { color } => console_sink(ConsoleSink::stdout_instance(), *color),
            SinkKind::Stderr { color } => console_sink(ConsoleSink::stderr_instance(), *color),
            SinkKind::File { path, truncate } => Arc::new(FileSink::new(path, *truncate)?),
            SinkKind::RotatingFile {
                path,
                max_bytes,
                max_files,
                compress,
            } => Arc::new(
                RotatingFileSink::new(path, *max_bytes, *max_files)?.with_compression(*compress),
            ),
            SinkKind::DailyFile {
                path,
                hour,
                minute,
                max_files,
            } => Arc::new(DailyFileSink::new(path, *hour, *minute)?.with_max_files(*max_files)),
            SinkKind::Syslog {
                ident,
                facility,
                path,
            } => syslog_sink(ident, facility.as_deref(), path.as_deref())?,
        };

        if let Some(level) = self.level {
            sink.set_level(level);
        }
        Ok(sink)
    }
}

#[cfg(feature = "console")]
fn console_sink(console: Arc<ConsoleSink>, color: bool) -> SinkRef {
    if color {
        Arc::new(crate::sinks::ColorSink::new(console))
    } else {
        console
    }
}

#[cfg(not(feature = "console"))]
fn console_sink(console: Arc<ConsoleSink>, _color: bool) -> SinkRef {
    console
}

#[cfg(unix)]
fn syslog_sink(ident: &str, facility: Option<&str>, path: Option<&Path>) -> Result<SinkRef> {
    use crate::sinks::{Facility, SyslogSink};

    let facility = match facility {
        Some(name) => serde_json::from_value::<Facility>(serde_json::Value::String(
            name.to_ascii_lowercase(),
        ))
        .map_err(|_| LoggerError::config("syslog", format!("unknown facility '{}'", name)))?,
        None => Facility::default(),
    };
    let sink = match path {
        Some(path) => SyslogSink::with_path(path, ident, facility)?,
        None => SyslogSink::new(ident, facility)?,
    };
    Ok(Arc::new(sink))
}

#[cfg(not(unix))]
fn syslog_sink(_ident: &str, _facility: Option<&str>, _path: Option<&Path>) -> Result<SinkRef> {
    Err(LoggerError::config(
        "syslog",
        "syslog sinks are only available on unix",
    ))
}
