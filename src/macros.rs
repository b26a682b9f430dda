//! Logging macros for ergonomic log message formatting.
//!
//! The macros take a logger (anything with a `log` method, such as `Logger`
//! or `Arc<Logger>`), a message template and its arguments. They return the
//! same `Result` as [`Logger::log`](crate::Logger::log).
//!
//! `trace!` and `debug!` compile to nothing unless the `trace-macros` /
//! `debug-macros` features are enabled (both are on by default). When
//! disabled, their arguments are not evaluated.
//!
//! # Examples
//!
//! ```
//! use rust_log_engine::prelude::*;
//! use rust_log_engine::{info, warn};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemorySink::new());
//! let logger = Logger::builder("server").sink(sink.clone()).pattern("%v").build().unwrap();
//!
//! info!(logger, "Server started").unwrap();
//!
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port).unwrap();
//!
//! let user_id = 42;
//! warn!(logger, "User {1} retried {0} times", 3, user_id).unwrap();
//!
//! assert_eq!(
//!     sink.lines(),
//!     vec!["Server started", "Server listening on port 8080", "User 42 retried 3 times"]
//! );
//! ```

/// Whether `trace!` emits anything
#[doc(hidden)]
pub const TRACE_ENABLED: bool = cfg!(feature = "trace-macros");

/// Whether `debug!` emits anything
#[doc(hidden)]
pub const DEBUG_ENABLED: bool = cfg!(feature = "debug-macros");

/// Log a message at an explicit level.
///
/// # Examples
///
/// ```
/// # use rust_log_engine::prelude::*;
/// # let logger = Logger::new("doc", vec![]);
/// use rust_log_engine::log;
/// log!(logger, LogLevel::Info, "Simple message").unwrap();
/// log!(logger, LogLevel::Error, "Error code: {}", 500).unwrap();
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $template:expr $(,)?) => {
        $logger.log($level, $template, &[])
    };
    ($logger:expr, $level:expr, $template:expr, $($arg:expr),+ $(,)?) => {
        $logger.log(
            $level,
            $template,
            &[$(&$arg as &dyn $crate::FormatArg),+],
        )
    };
}

/// Log a trace-level message. Compiled out without the `trace-macros` feature.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        if $crate::macros::TRACE_ENABLED {
            $crate::log!($logger, $crate::LogLevel::Trace, $($arg)+)
        } else {
            ::std::result::Result::<(), $crate::LoggerError>::Ok(())
        }
    };
}

/// Log a debug-level message. Compiled out without the `debug-macros` feature.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        if $crate::macros::DEBUG_ENABLED {
            $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
        } else {
            ::std::result::Result::<(), $crate::LoggerError>::Ok(())
        }
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a notice-level message.
#[macro_export]
macro_rules! notice {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Notice, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_log_engine::prelude::*;
/// # let logger = Logger::new("doc", vec![]);
/// use rust_log_engine::error;
/// error!(logger, "Connection failed").unwrap();
/// error!(logger, "Failed to open file: {}", "config.json").unwrap();
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a critical-level message.
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Critical, $($arg)+)
    };
}

/// Log an alert-level message.
#[macro_export]
macro_rules! alert {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Alert, $($arg)+)
    };
}

/// Log an emergency-level message.
#[macro_export]
macro_rules! emerg {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Emerg, $($arg)+)
    };
}
