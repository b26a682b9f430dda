//! Per-logger counters
//!
//! Every logger owns one [`LoggerMetrics`]. The dispatcher and the sink loop
//! bump counters with relaxed atomics; readers take a [`MetricsSnapshot`]
//! when they need several values that belong together.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum Counter {
    Delivered,
    Dropped,
    QueueFull,
    Blocked,
    SinkFailure,
    FormatError,
}

const COUNTERS: usize = 6;

/// Health counters of one logger
///
/// ```
/// use rust_log_engine::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_logged();
/// metrics.record_dropped();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.delivered, 1);
/// assert_eq!(snapshot.dropped, 1);
/// assert_eq!(snapshot.drop_rate(), 50.0);
/// ```
#[derive(Debug, Default)]
pub struct LoggerMetrics {
    counters: [AtomicU64; COUNTERS],
}

/// Point-in-time copy of a logger's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Records handed to the sinks
    pub delivered: u64,
    /// Records lost to overflow or a discarding shutdown
    pub dropped: u64,
    /// Submissions that found the queue full
    pub queue_full: u64,
    /// Submissions that had to wait for space
    pub blocked: u64,
    /// Dispatches in which at least one sink failed
    pub sink_failures: u64,
    /// Emissions rejected for a malformed template
    pub format_errors: u64,
}

impl MetricsSnapshot {
    /// Share of records lost, in percent. Zero before anything was logged.
    pub fn drop_rate(&self) -> f64 {
        let seen = self.delivered + self.dropped;
        if seen == 0 {
            return 0.0;
        }
        self.dropped as f64 * 100.0 / seen as f64
    }
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            counters: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    #[inline]
    fn bump(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    fn read(&self, counter: Counter) -> u64 {
        self.counters[counter as usize].load(Ordering::Relaxed)
    }

    pub fn total_logged(&self) -> u64 {
        self.read(Counter::Delivered)
    }

    pub fn dropped_count(&self) -> u64 {
        self.read(Counter::Dropped)
    }

    pub fn queue_full_events(&self) -> u64 {
        self.read(Counter::QueueFull)
    }

    pub fn block_events(&self) -> u64 {
        self.read(Counter::Blocked)
    }

    pub fn sink_failures(&self) -> u64 {
        self.read(Counter::SinkFailure)
    }

    pub fn format_errors(&self) -> u64 {
        self.read(Counter::FormatError)
    }

    /// Returns the previous delivered count
    pub fn record_logged(&self) -> u64 {
        self.bump(Counter::Delivered)
    }

    /// Returns the previous dropped count
    pub fn record_dropped(&self) -> u64 {
        self.bump(Counter::Dropped)
    }

    pub fn record_queue_full(&self) -> u64 {
        self.bump(Counter::QueueFull)
    }

    pub fn record_block(&self) -> u64 {
        self.bump(Counter::Blocked)
    }

    pub fn record_sink_failure(&self) -> u64 {
        self.bump(Counter::SinkFailure)
    }

    pub fn record_format_error(&self) -> u64 {
        self.bump(Counter::FormatError)
    }

    pub fn drop_rate(&self) -> f64 {
        self.snapshot().drop_rate()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            delivered: self.read(Counter::Delivered),
            dropped: self.read(Counter::Dropped),
            queue_full: self.read(Counter::QueueFull),
            blocked: self.read(Counter::Blocked),
            sink_failures: self.read(Counter::SinkFailure),
            format_errors: self.read(Counter::FormatError),
        }
    }

    /// Zero every counter and return what they held
    pub fn take(&self) -> MetricsSnapshot {
        let swap = |c: Counter| self.counters[c as usize].swap(0, Ordering::Relaxed);
        MetricsSnapshot {
            delivered: swap(Counter::Delivered),
            dropped: swap(Counter::Dropped),
            queue_full: swap(Counter::QueueFull),
            blocked: swap(Counter::Blocked),
            sink_failures: swap(Counter::SinkFailure),
            format_errors: swap(Counter::FormatError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        assert_eq!(LoggerMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.record_dropped(), 1);
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_counters_are_independent() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        metrics.record_queue_full();
        metrics.record_block();
        metrics.record_block();
        metrics.record_sink_failure();
        metrics.record_format_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.delivered, 1);
        assert_eq!(snapshot.dropped, 0);
        assert_eq!(snapshot.queue_full, 1);
        assert_eq!(snapshot.blocked, 2);
        assert_eq!(snapshot.sink_failures, 1);
        assert_eq!(snapshot.format_errors, 1);
    }

    #[test]
    fn test_drop_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..90 {
            metrics.record_logged();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }
        assert!((metrics.drop_rate() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_take_resets() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        metrics.record_dropped();

        let taken = metrics.take();
        assert_eq!(taken.delivered, 1);
        assert_eq!(taken.dropped, 1);
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = LoggerMetrics::new();
        metrics.record_logged();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["delivered"], 1);
        assert_eq!(json["dropped"], 0);
    }
}
