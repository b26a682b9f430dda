//! Sink implementations

#[cfg(feature = "console")]
pub mod color;
pub mod console;
pub mod daily_file;
pub mod file;
pub mod memory;
pub mod rotating_file;
#[cfg(unix)]
pub mod syslog;

#[cfg(feature = "console")]
pub use color::{ColorAttribute, ColorMode, ColorSink};
pub use console::{ConsoleSink, ConsoleTarget};
pub use daily_file::{daily_filename, DailyFileSink};
pub use file::FileSink;
pub use memory::MemorySink;
pub use rotating_file::RotatingFileSink;
#[cfg(unix)]
pub use syslog::{Facility, SyslogSink};
