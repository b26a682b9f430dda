//! Console sink writing to stdout or stderr

use crate::core::error::Result;
use crate::core::log_level::LogLevel;
use crate::core::sink::{Sink, SinkCell, Threading};
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

/// Which standard stream a console sink writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

impl ConsoleTarget {
    fn write_line(self, text: &str) -> io::Result<()> {
        match self {
            ConsoleTarget::Stdout => writeln!(io::stdout().lock(), "{}", text),
            ConsoleTarget::Stderr => writeln!(io::stderr().lock(), "{}", text),
        }
    }

    fn flush(self) -> io::Result<()> {
        match self {
            ConsoleTarget::Stdout => io::stdout().flush(),
            ConsoleTarget::Stderr => io::stderr().flush(),
        }
    }
}

pub struct ConsoleSink {
    cell: SinkCell<ConsoleTarget>,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget, threading: Threading) -> Self {
        let name = match target {
            ConsoleTarget::Stdout => "stdout",
            ConsoleTarget::Stderr => "stderr",
        };
        Self {
            cell: SinkCell::new(name, target, threading),
        }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleTarget::Stdout, Threading::Multi)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleTarget::Stderr, Threading::Multi)
    }

    pub fn stdout_st() -> Self {
        Self::new(ConsoleTarget::Stdout, Threading::Single)
    }

    pub fn stderr_st() -> Self {
        Self::new(ConsoleTarget::Stderr, Threading::Single)
    }

    /// Process-wide stdout sink, shared so lines from different loggers never interleave
    pub fn stdout_instance() -> Arc<ConsoleSink> {
        static STDOUT: OnceLock<Arc<ConsoleSink>> = OnceLock::new();
        Arc::clone(STDOUT.get_or_init(|| Arc::new(ConsoleSink::stdout())))
    }

    /// Process-wide stderr sink
    pub fn stderr_instance() -> Arc<ConsoleSink> {
        static STDERR: OnceLock<Arc<ConsoleSink>> = OnceLock::new();
        Arc::clone(STDERR.get_or_init(|| Arc::new(ConsoleSink::stderr())))
    }

    pub fn target(&self) -> ConsoleTarget {
        self.cell.with(|target| Ok(*target)).unwrap_or(ConsoleTarget::Stdout)
    }

    pub fn threading(&self) -> Threading {
        self.cell.threading()
    }
}

impl Sink for ConsoleSink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        if !self.should_accept(level) {
            return Ok(());
        }
        self.cell.with(|target| Ok(target.write_line(text)?))
    }

    fn flush(&self) -> Result<()> {
        self.cell.with(|target| Ok(target.flush()?))
    }

    fn set_level(&self, level: LogLevel) {
        self.cell.set_level(level);
    }

    fn level(&self) -> LogLevel {
        self.cell.level()
    }

    fn name(&self) -> &str {
        self.cell.name()
    }
}
