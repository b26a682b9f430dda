//! Plain file sink

use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::sink::{Sink, SinkCell, Threading};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Open `path` for appending (or truncate it), creating parent directories
pub(crate) fn open_log_file(path: &Path, truncate: bool) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path).map_err(|e| {
        LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
    })
}

/// Appends lines to a single file
pub struct FileSink {
    path: PathBuf,
    cell: SinkCell<BufWriter<File>>,
}

impl FileSink {
    /// Open `path`, appending to existing content unless `truncate` is set
    pub fn new(path: impl Into<PathBuf>, truncate: bool) -> Result<Self> {
        Self::with_threading(path, truncate, Threading::Multi)
    }

    pub fn with_threading(
        path: impl Into<PathBuf>,
        truncate: bool,
        threading: Threading,
    ) -> Result<Self> {
        let path = path.into();
        let file = open_log_file(&path, truncate)?;
        Ok(Self {
            cell: SinkCell::new("file", BufWriter::new(file), threading),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        if !self.should_accept(level) {
            return Ok(());
        }
        self.cell.with(|writer| {
            writer
                .write_all(text.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .map_err(|e| {
                    LoggerError::file_sink(
                        self.path.display().to_string(),
                        format!("Failed to write log entry: {}", e),
                    )
                })
        })
    }

    fn flush(&self) -> Result<()> {
        self.cell.with(|writer| {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })
        })
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

impl Drop for FileSink {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = Sink::flush(self);
    }
}
