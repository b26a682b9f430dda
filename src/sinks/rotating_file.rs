//! Size-based rotating file sink
//!
//! Writes to a base file until the next line would push it past `max_bytes`,
//! then shifts the backups (`app.log.1` is the newest) and starts over with an
//! empty base file. At most `max_files` backups are kept.

use super::file::open_log_file;
use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::sink::{Sink, SinkCell, Threading};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct RotatingState {
    writer: Option<BufWriter<File>>,
    current_size: u64,
    rotations: u64,
}

/// A file sink that rotates by size
///
/// # Example
///
/// ```no_run
/// use rust_log_engine::sinks::RotatingFileSink;
///
/// // 5 MB per file, keep app.log.1 .. app.log.3
/// let sink = RotatingFileSink::new("logs/app.log", 5 * 1024 * 1024, 3)
///     .unwrap()
///     .with_compression(true);
/// ```
pub struct RotatingFileSink {
    base_path: PathBuf,
    max_bytes: u64,
    max_files: usize,
    compress: bool,
    cell: SinkCell<RotatingState>,
}

impl RotatingFileSink {
    /// Create a rotating sink shared between threads
    ///
    /// # Errors
    ///
    /// Returns error if `max_bytes` is zero or the file cannot be opened
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64, max_files: usize) -> Result<Self> {
        Self::with_threading(path, max_bytes, max_files, Threading::Multi)
    }

    /// Single-threaded variant
    pub fn new_st(path: impl Into<PathBuf>, max_bytes: u64, max_files: usize) -> Result<Self> {
        Self::with_threading(path, max_bytes, max_files, Threading::Single)
    }

    pub fn with_threading(
        path: impl Into<PathBuf>,
        max_bytes: u64,
        max_files: usize,
        threading: Threading,
    ) -> Result<Self> {
        if max_bytes == 0 {
            return Err(LoggerError::config(
                "RotatingFileSink",
                "maximum file size must be positive",
            ));
        }

        let base_path = path.into();
        let file = open_log_file(&base_path, false)?;
        // Content already in the file counts toward the limit
        let current_size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_sink(
                    base_path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        let state = RotatingState {
            writer: Some(BufWriter::new(file)),
            current_size,
            rotations: 0,
        };

        Ok(Self {
            base_path,
            max_bytes,
            max_files,
            compress: false,
            cell: SinkCell::new("rotating_file", state, threading),
        })
    }

    /// Gzip each backup as it is created (`app.log.1.gz`)
    #[must_use]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Bytes in the current base file
    pub fn current_size(&self) -> u64 {
        self.cell
            .with(|state| Ok(state.current_size))
            .unwrap_or_default()
    }

    /// Rotations performed since construction
    pub fn rotation_count(&self) -> u64 {
        self.cell
            .with(|state| Ok(state.rotations))
            .unwrap_or_default()
    }

    /// Rotate immediately, regardless of the current size
    pub fn rotate_now(&self) -> Result<()> {
        self.cell.with(|state| {
            let result = self.rotate(state);
            if result.is_err() {
                self.recover(state)?;
            }
            result
        })
    }

    /// Path of backup `index` (1 is the newest)
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.base_path.clone();
        let filename = self
            .base_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("app.log");
        path.set_file_name(format!("{}.{}", filename, index));
        path
    }

    fn compressed_path(&self, index: usize) -> PathBuf {
        let mut path = self.backup_path(index).into_os_string();
        path.push(".gz");
        PathBuf::from(path)
    }

    fn rotation_error(&self, context: &str, e: io::Error) -> LoggerError {
        LoggerError::file_rotation(
            self.base_path.display().to_string(),
            format!("{}: {}", context, e),
        )
    }

    fn rotate(&self, state: &mut RotatingState) -> Result<()> {
        // Close the current file before any rename
        if let Some(mut writer) = state.writer.take() {
            writer
                .flush()
                .map_err(|e| self.rotation_error("Failed to flush before rotation", e))?;
        }

        if self.max_files == 0 {
            let file = open_log_file(&self.base_path, true)?;
            state.writer = Some(BufWriter::new(file));
            state.current_size = 0;
            state.rotations += 1;
            return Ok(());
        }

        for oldest in [self.backup_path(self.max_files), self.compressed_path(self.max_files)] {
            if oldest.exists() {
                fs::remove_file(&oldest)
                    .map_err(|e| self.rotation_error("Failed to remove oldest backup", e))?;
            }
        }

        for i in (1..self.max_files).rev() {
            rename_replacing(&self.backup_path(i), &self.backup_path(i + 1))
                .map_err(|e| self.rotation_error("Failed to shift backup files", e))?;
            rename_replacing(&self.compressed_path(i), &self.compressed_path(i + 1))
                .map_err(|e| self.rotation_error("Failed to shift backup files", e))?;
        }

        let newest = self.backup_path(1);
        rename_replacing(&self.base_path, &newest)
            .map_err(|e| self.rotation_error("Failed to rotate current log file", e))?;

        let file = open_log_file(&self.base_path, false)?;
        state.writer = Some(BufWriter::new(file));
        state.current_size = 0;
        state.rotations += 1;

        if self.compress && newest.exists() {
            compress_file(&newest, &self.compressed_path(1))?;
        }
        Ok(())
    }

    /// Make sure there is a writer after a failed rotation
    fn recover(&self, state: &mut RotatingState) -> Result<()> {
        if state.writer.is_none() {
            let file = open_log_file(&self.base_path, false)?;
            state.writer = Some(BufWriter::new(file));
        }
        // Allow the file to grow past the limit rather than retry on every line
        state.current_size = 0;
        Ok(())
    }
}

/// Rename `from` to `to` if `from` exists, replacing `to`
fn rename_replacing(from: &Path, to: &Path) -> io::Result<()> {
    if !from.exists() {
        return Ok(());
    }
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            // Some platforms refuse to rename over an existing file
            if to.exists() {
                let _ = fs::remove_file(to);
            }
            fs::rename(from, to)
        }
    }
}

/// Gzip `path` into `gz_path`, removing `path` only once compression succeeded
fn compress_file(path: &Path, gz_path: &Path) -> Result<()> {
    let mut temp = gz_path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);

    let compress = || -> io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&temp_path, gz_path)
    };

    if let Err(e) = compress() {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress '{}'", path.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(path) {
        eprintln!(
            "[LOGGER WARNING] Compressed '{}' but could not remove the original: {}",
            path.display(),
            e
        );
    }
    Ok(())
}

impl Sink for RotatingFileSink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        if !self.should_accept(level) {
            return Ok(());
        }

        self.cell.with(|state| {
            let line_len = text.len() as u64 + 1;
            let mut rotation_failure = None;

            if state.current_size > 0 && state.current_size + line_len > self.max_bytes {
                if let Err(e) = self.rotate(state) {
                    // Keep logging into whatever file we can open
                    self.recover(state)?;
                    rotation_failure = Some(e);
                }
            }

            let writer = state.writer.as_mut().ok_or_else(|| {
                LoggerError::file_sink(self.base_path.display().to_string(), "file is not open")
            })?;
            writer
                .write_all(text.as_bytes())
                .and_then(|()| writer.write_all(b"\n"))
                .map_err(|e| {
                    LoggerError::file_sink(
                        self.base_path.display().to_string(),
                        format!("Failed to write log entry: {}", e),
                    )
                })?;
            state.current_size += line_len;

            match rotation_failure {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }

    fn flush(&self) -> Result<()> {
        self.cell.with(|state| {
            if let Some(writer) = state.writer.as_mut() {
                writer.flush().map_err(|e| {
                    LoggerError::file_sink(
                        self.base_path.display().to_string(),
                        format!("Failed to flush: {}", e),
                    )
                })?;
            }
            Ok(())
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

impl Drop for RotatingFileSink {
    fn drop(&mut self) {
        let _ = Sink::flush(self);
    }
}
