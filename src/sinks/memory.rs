//! In-memory sink that keeps accepted lines for inspection

use crate::core::error::Result;
use crate::core::log_level::LogLevel;
use crate::core::sink::{Sink, SinkCell, Threading};
use std::collections::VecDeque;

#[derive(Debug)]
struct MemoryBuffer {
    lines: VecDeque<(LogLevel, String)>,
    capacity: Option<usize>,
}

/// Captures formatted lines in memory.
///
/// With a capacity, the oldest lines are evicted once it is reached. Useful in
/// tests and for showing recent output inside an application.
#[derive(Debug)]
pub struct MemorySink {
    cell: SinkCell<MemoryBuffer>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Keep at most `capacity` lines
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(Some(capacity))
    }

    fn build(capacity: Option<usize>) -> Self {
        let buffer = MemoryBuffer {
            lines: VecDeque::new(),
            capacity,
        };
        Self {
            cell: SinkCell::new("memory", buffer, Threading::Multi),
        }
    }

    /// Accepted lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.records().into_iter().map(|(_, line)| line).collect()
    }

    /// Accepted lines with their levels, oldest first
    pub fn records(&self) -> Vec<(LogLevel, String)> {
        self.cell
            .with(|buffer| Ok(buffer.lines.iter().cloned().collect()))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cell
            .with(|buffer| Ok(buffer.lines.len()))
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let _ = self.cell.with(|buffer| {
            buffer.lines.clear();
            Ok(())
        });
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MemorySink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        if !self.should_accept(level) {
            return Ok(());
        }
        self.cell.with(|buffer| {
            if buffer.capacity == Some(0) {
                return Ok(());
            }
            if let Some(capacity) = buffer.capacity {
                while buffer.lines.len() >= capacity {
                    buffer.lines.pop_front();
                }
            }
            buffer.lines.push_back((level, text.to_string()));
            Ok(())
        })
    }

    fn flush(&self) -> Result<()> {
        Ok(())
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
