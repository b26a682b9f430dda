//! Daily file sink
//!
//! Opens a new file named after the current date once a day at a fixed local
//! time. `logs/app.log` becomes `logs/app_2024-03-01.log`.

use super::file::open_log_file;
use crate::core::clock::{ClockRef, SystemClock};
use crate::core::error::{LoggerError, Result};
use crate::core::log_level::LogLevel;
use crate::core::sink::{Sink, SinkCell, Threading};
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name used for `date`: `<stem>_<YYYY-MM-DD>[.<ext>]`
pub fn daily_filename(base: &Path, date: NaiveDate) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("app");
    let name = match base.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), ext),
        None => format!("{}_{}", stem, date.format("%Y-%m-%d")),
    };
    base.with_file_name(name)
}

/// First occurrence of `at` strictly after `now`
fn next_rotation_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDateTime::MAX)
    }
}

struct DailyState {
    writer: BufWriter<File>,
    current_path: PathBuf,
    next_rotation: NaiveDateTime,
    opened: VecDeque<PathBuf>,
}

/// A file sink that starts a new dated file every day at `hour:minute`
pub struct DailyFileSink {
    base_path: PathBuf,
    rotation_time: NaiveTime,
    max_files: usize,
    clock: ClockRef,
    cell: SinkCell<DailyState>,
}

impl DailyFileSink {
    /// Create a daily sink shared between threads, rotating at `hour:minute` local time
    ///
    /// # Errors
    ///
    /// Returns error if `hour > 23`, `minute > 59`, or the file cannot be opened
    pub fn new(path: impl Into<PathBuf>, hour: u32, minute: u32) -> Result<Self> {
        Self::with_clock(path, hour, minute, Threading::Multi, Arc::new(SystemClock))
    }

    /// Single-threaded variant
    pub fn new_st(path: impl Into<PathBuf>, hour: u32, minute: u32) -> Result<Self> {
        Self::with_clock(path, hour, minute, Threading::Single, Arc::new(SystemClock))
    }

    /// Create a sink that reads the time from `clock`
    pub fn with_clock(
        path: impl Into<PathBuf>,
        hour: u32,
        minute: u32,
        threading: Threading,
        clock: ClockRef,
    ) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(LoggerError::config(
                "DailyFileSink",
                format!("invalid rotation time {:02}:{:02}", hour, minute),
            ));
        }
        let rotation_time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            LoggerError::config("DailyFileSink", "invalid rotation time")
        })?;

        let base_path = path.into();
        let now = clock.now();
        let current_path = daily_filename(&base_path, now.date());
        let file = open_log_file(&current_path, false)?;

        let state = DailyState {
            writer: BufWriter::new(file),
            current_path: current_path.clone(),
            next_rotation: next_rotation_after(now, rotation_time),
            opened: VecDeque::from([current_path]),
        };

        Ok(Self {
            base_path,
            rotation_time,
            max_files: 0,
            clock,
            cell: SinkCell::new("daily_file", state, threading),
        })
    }

    /// Keep only the `max_files` most recent files this sink opened.
    /// Zero keeps everything.
    #[must_use]
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// File currently being written
    pub fn current_path(&self) -> PathBuf {
        self.cell
            .with(|state| Ok(state.current_path.clone()))
            .unwrap_or_else(|_| self.base_path.clone())
    }

    /// When the next file will be started
    pub fn next_rotation(&self) -> Option<NaiveDateTime> {
        self.cell.with(|state| Ok(state.next_rotation)).ok()
    }

    fn rotate(&self, state: &mut DailyState, now: NaiveDateTime) -> Result<()> {
        state.writer.flush().map_err(|e| {
            LoggerError::file_rotation(
                state.current_path.display().to_string(),
                format!("Failed to flush before rotation: {}", e),
            )
        })?;

        let path = daily_filename(&self.base_path, now.date());
        let file = open_log_file(&path, false)?;
        state.writer = BufWriter::new(file);
        state.current_path = path.clone();
        state.next_rotation = next_rotation_after(now, self.rotation_time);

        if state.opened.back() != Some(&path) {
            state.opened.push_back(path);
        }
        if self.max_files > 0 {
            while state.opened.len() > self.max_files {
                if let Some(old) = state.opened.pop_front() {
                    if let Err(e) = fs::remove_file(&old) {
                        eprintln!(
                            "[LOGGER WARNING] Failed to remove old log file {}: {}",
                            old.display(),
                            e
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

impl Sink for DailyFileSink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        if !self.should_accept(level) {
            return Ok(());
        }

        let now = self.clock.now();
        self.cell.with(|state| {
            if now >= state.next_rotation {
                self.rotate(state, now)?;
            }
            state
                .writer
                .write_all(text.as_bytes())
                .and_then(|()| state.writer.write_all(b"\n"))
                .map_err(|e| {
                    LoggerError::file_sink(
                        state.current_path.display().to_string(),
                        format!("Failed to write log entry: {}", e),
                    )
                })
        })
    }

    fn flush(&self) -> Result<()> {
        self.cell.with(|state| {
            state.writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    state.current_path.display().to_string(),
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

impl Drop for DailyFileSink {
    fn drop(&mut self) {
        let _ = Sink::flush(self);
    }
}
