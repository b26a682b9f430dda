//! Log record structure

use super::log_level::LogLevel;
use chrono::{DateTime, Local};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

// Thread-local cache so the id is assigned once per thread
thread_local! {
    static THREAD_ID_CACHE: Cell<u64> = const { Cell::new(0) };
}

/// Small, process-unique id of the calling thread, assigned on first use
pub fn current_thread_id() -> u64 {
    THREAD_ID_CACHE.with(|cache| {
        let cached = cache.get();
        if cached != 0 {
            return cached;
        }
        let id = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
        cache.set(id);
        id
    })
}

/// One emitted message, built at the call site and consumed by a single dispatch.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub level: LogLevel,
    pub logger_name: Arc<str>,
    pub message: String,
    pub timestamp: DateTime<Local>,
    pub thread_id: u64,
}

impl LogRecord {
    pub fn new(logger_name: Arc<str>, level: LogLevel, message: String) -> Self {
        Self {
            level,
            logger_name,
            message,
            timestamp: Local::now(),
            thread_id: current_thread_id(),
        }
    }

    /// Replace the timestamp, mostly useful for deterministic formatting
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_is_stable_per_thread() {
        let first = current_thread_id();
        assert_eq!(first, current_thread_id());

        let other = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_record_fields() {
        let record = LogRecord::new(Arc::from("net"), LogLevel::Warn, "timeout".to_string());
        assert_eq!(&*record.logger_name, "net");
        assert_eq!(record.level, LogLevel::Warn);
        assert_eq!(record.message, "timeout");
        assert_eq!(record.thread_id, current_thread_id());
    }
}
