//! Asynchronous dispatch of log records
//!
//! Producers push records into a bounded queue and return. Background
//! workers pull them out in batches and hand each one to a [`RecordHandler`],
//! which for a logger means formatting and writing to its sinks.

use super::error::{LoggerError, Result};
use super::log_record::LogRecord;
use super::metrics::LoggerMetrics;
use super::overflow_policy::OverflowPolicy;
use crossbeam_channel::{
    bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default shutdown timeout for dispatcher cleanup (5 seconds)
///
/// Used when a logger is dropped without explicit shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of queued records
pub const DEFAULT_QUEUE_CAPACITY: usize = 8192;

const BATCH_SIZE: usize = 64;

/// Receives records on a worker thread
pub trait RecordHandler: Send + Sync {
    fn handle(&self, record: &LogRecord);
    fn flush(&self);
}

/// Settings of an asynchronous logger
///
/// # Example
///
/// ```
/// use rust_log_engine::{AsyncConfig, OverflowPolicy};
/// use std::time::Duration;
///
/// let config = AsyncConfig::new(1000)
///     .with_overflow_policy(OverflowPolicy::DiscardOldest)
///     .with_flush_interval(Duration::from_millis(500));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncConfig {
    /// Maximum queued records. Used as given, any positive value.
    pub queue_capacity: usize,
    pub overflow_policy: OverflowPolicy,
    /// Worker threads. Delivery is strictly FIFO only with one worker.
    pub worker_count: usize,
    /// Flush sinks at least this often while records keep arriving
    pub flush_interval: Option<Duration>,
}

impl AsyncConfig {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_worker_count(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "AsyncConfig",
                "queue capacity must be positive",
            ));
        }
        if self.worker_count == 0 {
            return Err(LoggerError::config(
                "AsyncConfig",
                "at least one worker thread is required",
            ));
        }
        if self.flush_interval == Some(Duration::ZERO) {
            return Err(LoggerError::config(
                "AsyncConfig",
                "flush interval must be positive",
            ));
        }
        Ok(())
    }
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_policy: OverflowPolicy::Block,
            worker_count: 1,
            flush_interval: None,
        }
    }
}

/// What happens to queued records when a dispatcher stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownMode {
    /// Deliver everything already queued, then stop
    #[default]
    Drain,
    /// Drop queued records (counted as dropped), then stop
    Discard,
}

enum AsyncMessage {
    Record(LogRecord),
    Flush(Sender<()>),
}

/// Bounded queue plus the worker threads that empty it
pub struct AsyncDispatcher {
    sender: RwLock<Option<Sender<AsyncMessage>>>,
    // Kept for evicting under DiscardOldest and for discarding on shutdown
    receiver: Receiver<AsyncMessage>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    discard: Arc<AtomicBool>,
    // Flush markers pulled off the queue by DiscardOldest, acked by a worker
    evicted_flushes: Arc<Mutex<Vec<Sender<()>>>>,
    config: AsyncConfig,
    metrics: Arc<LoggerMetrics>,
}

impl AsyncDispatcher {
    /// Validate `config` and spawn the workers
    pub fn start(
        name: &str,
        config: AsyncConfig,
        handler: Arc<dyn RecordHandler>,
        metrics: Arc<LoggerMetrics>,
    ) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = bounded(config.queue_capacity);
        let discard = Arc::new(AtomicBool::new(false));
        let evicted_flushes = Arc::new(Mutex::new(Vec::new()));
        let mut workers = Vec::with_capacity(config.worker_count);

        for index in 0..config.worker_count {
            let worker = Worker {
                receiver: receiver.clone(),
                handler: Arc::clone(&handler),
                discard: Arc::clone(&discard),
                evicted_flushes: Arc::clone(&evicted_flushes),
                metrics: Arc::clone(&metrics),
                flush_interval: config.flush_interval,
            };
            let handle = thread::Builder::new()
                .name(format!("{name}-log-{index}"))
                .spawn(move || worker.run())
                .map_err(|e| {
                    LoggerError::io_operation(
                        "spawning async worker",
                        format!("cannot start worker {index} for '{name}'"),
                        e,
                    )
                })?;
            workers.push(handle);
        }

        Ok(Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            workers: Mutex::new(workers),
            discard,
            evicted_flushes,
            config,
            metrics,
        })
    }

    pub fn config(&self) -> &AsyncConfig {
        &self.config
    }

    /// Number of records currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Queue a record, applying the overflow policy when the queue is full
    pub fn enqueue(&self, record: LogRecord) -> Result<()> {
        let guard = self.sender.read();
        let sender = guard.as_ref().ok_or(LoggerError::LoggerStopped)?;

        match sender.try_send(AsyncMessage::Record(record)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Disconnected(_)) => Err(LoggerError::LoggerStopped),
            Err(TrySendError::Full(message)) => {
                self.metrics.record_queue_full();
                self.handle_overflow(sender, message)
            }
        }
    }

    fn handle_overflow(&self, sender: &Sender<AsyncMessage>, message: AsyncMessage) -> Result<()> {
        match self.config.overflow_policy {
            OverflowPolicy::Block => {
                self.metrics.record_block();
                sender
                    .send(message)
                    .map_err(|_| LoggerError::LoggerStopped)
            }

            OverflowPolicy::BlockWithTimeout(timeout) => {
                self.metrics.record_block();
                match sender.send_timeout(message, timeout) {
                    Ok(()) => Ok(()),
                    Err(SendTimeoutError::Timeout(_)) => {
                        self.metrics.record_dropped();
                        Err(LoggerError::queue_timeout(timeout))
                    }
                    Err(SendTimeoutError::Disconnected(_)) => Err(LoggerError::LoggerStopped),
                }
            }

            OverflowPolicy::DiscardNew => {
                self.metrics.record_dropped();
                Err(LoggerError::queue_full(self.config.queue_capacity))
            }

            OverflowPolicy::DiscardOldest => {
                let mut pending = message;
                loop {
                    self.discard_one(true);
                    match sender.try_send(pending) {
                        Ok(()) => return Ok(()),
                        Err(TrySendError::Full(message)) => pending = message,
                        Err(TrySendError::Disconnected(_)) => {
                            return Err(LoggerError::LoggerStopped)
                        }
                    }
                }
            }
        }
    }

    /// Remove the head of the queue. Returns false if the queue was empty.
    ///
    /// A flush marker is never lost. With `keep_flushes` it is handed to the
    /// workers, which ack it once the batch in progress has been handled;
    /// otherwise it is acked at once.
    fn discard_one(&self, keep_flushes: bool) -> bool {
        match self.receiver.try_recv() {
            Ok(AsyncMessage::Record(_)) => {
                self.metrics.record_dropped();
                true
            }
            Ok(AsyncMessage::Flush(ack)) if keep_flushes => {
                self.evicted_flushes.lock().push(ack);
                true
            }
            Ok(AsyncMessage::Flush(ack)) => {
                let _ = ack.send(());
                true
            }
            Err(_) => false,
        }
    }

    /// Wait until the records queued before this call were handled and the
    /// handler was flushed.
    ///
    /// With several workers only the worker that takes the flush marker is
    /// waited for.
    pub fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = bounded(1);
        {
            let guard = self.sender.read();
            let sender = guard.as_ref().ok_or(LoggerError::LoggerStopped)?;
            sender
                .send(AsyncMessage::Flush(ack_tx))
                .map_err(|_| LoggerError::LoggerStopped)?;
        }
        ack_rx.recv().map_err(|_| LoggerError::LoggerStopped)
    }

    /// Stop accepting records and join the workers.
    ///
    /// Calling this more than once is harmless. Returns `false` if a worker
    /// did not finish within `timeout` or panicked.
    pub fn shutdown(&self, mode: ShutdownMode, timeout: Duration) -> bool {
        if mode == ShutdownMode::Discard {
            self.discard.store(true, Ordering::Release);
            while self.discard_one(false) {}
        }

        // Closing the channel lets the workers exit once the queue is empty
        drop(self.sender.write().take());

        let handles = std::mem::take(&mut *self.workers.lock());
        let start = Instant::now();
        let mut clean = true;

        for handle in handles {
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Async worker thread panicked during shutdown: {:?}",
                            e
                        );
                        clean = false;
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Async worker thread did not finish within {:?} timeout. \
                         Some logs may be lost.",
                        timeout
                    );
                    clean = false;
                    break;
                }

                thread::sleep(Duration::from_millis(5));
            }
        }

        clean
    }
}

impl Drop for AsyncDispatcher {
    fn drop(&mut self) {
        self.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT);
    }
}

struct Worker {
    receiver: Receiver<AsyncMessage>,
    handler: Arc<dyn RecordHandler>,
    discard: Arc<AtomicBool>,
    evicted_flushes: Arc<Mutex<Vec<Sender<()>>>>,
    metrics: Arc<LoggerMetrics>,
    flush_interval: Option<Duration>,
}

impl Worker {
    /// Ack flush markers that were evicted while this worker held the
    /// records queued ahead of them. Returns true if any were waiting.
    fn ack_evicted_flushes(&self) -> bool {
        let waiting = std::mem::take(&mut *self.evicted_flushes.lock());
        if waiting.is_empty() {
            return false;
        }
        self.handler.flush();
        for ack in waiting {
            let _ = ack.send(());
        }
        true
    }

    fn run(self) {
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut last_flush = Instant::now();
        let mut dirty = false;

        loop {
            let first = match self.flush_interval {
                Some(interval) => {
                    let wait = interval.saturating_sub(last_flush.elapsed());
                    match self.receiver.recv_timeout(wait) {
                        Ok(message) => message,
                        Err(RecvTimeoutError::Timeout) => {
                            if dirty {
                                self.handler.flush();
                                dirty = false;
                            }
                            last_flush = Instant::now();
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.receiver.recv() {
                    Ok(message) => message,
                    Err(_) => break,
                },
            };
            batch.push(first);

            while batch.len() < BATCH_SIZE {
                match self.receiver.try_recv() {
                    Ok(message) => batch.push(message),
                    Err(_) => break,
                }
            }

            for message in batch.drain(..) {
                match message {
                    AsyncMessage::Record(record) => {
                        if self.discard.load(Ordering::Acquire) {
                            self.metrics.record_dropped();
                            continue;
                        }
                        self.handler.handle(&record);
                        dirty = true;
                    }
                    AsyncMessage::Flush(ack) => {
                        self.handler.flush();
                        dirty = false;
                        last_flush = Instant::now();
                        let _ = ack.send(());
                    }
                }
            }

            if self.ack_evicted_flushes() {
                dirty = false;
                last_flush = Instant::now();
            }

            let interval_elapsed = self
                .flush_interval
                .is_some_and(|interval| last_flush.elapsed() >= interval);
            if dirty && (self.receiver.is_empty() || interval_elapsed) {
                self.handler.flush();
                dirty = false;
                last_flush = Instant::now();
            }
        }

        if !self.ack_evicted_flushes() && dirty {
            self.handler.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::LogLevel;
    use std::sync::atomic::AtomicUsize;

    /// Records messages. With a gate, every record waits for the gate to open
    /// and the first one announces that a worker holds it.
    #[derive(Default)]
    struct Collector {
        seen: parking_lot::Mutex<Vec<String>>,
        flushes: AtomicUsize,
        gate: Option<(Sender<()>, Receiver<()>)>,
    }

    impl RecordHandler for Collector {
        fn handle(&self, record: &LogRecord) {
            if let Some((started, release)) = &self.gate {
                let _ = started.try_send(());
                let _ = release.recv();
            }
            self.seen.lock().push(record.message.clone());
        }

        fn flush(&self) {
            self.flushes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn record(message: &str) -> LogRecord {
        LogRecord::new(Arc::from("test"), LogLevel::Info, message.to_string())
    }

    struct Gated {
        collector: Arc<Collector>,
        started: Receiver<()>,
        release: Sender<()>,
    }

    fn gated() -> Gated {
        let (started_tx, started_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(0);
        Gated {
            collector: Arc::new(Collector {
                gate: Some((started_tx, release_rx)),
                ..Collector::default()
            }),
            started: started_rx,
            release: release_tx,
        }
    }

    fn start(config: AsyncConfig, handler: Arc<Collector>) -> (AsyncDispatcher, Arc<LoggerMetrics>) {
        let metrics = Arc::new(LoggerMetrics::new());
        let dispatcher =
            AsyncDispatcher::start("test", config, handler, Arc::clone(&metrics)).unwrap();
        (dispatcher, metrics)
    }

    #[test]
    fn test_config_validation() {
        assert!(AsyncConfig::default().validate().is_ok());
        assert!(AsyncConfig::new(0).validate().is_err());
        assert!(AsyncConfig::new(3).with_worker_count(0).validate().is_err());
        assert!(AsyncConfig::new(3)
            .with_flush_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_capacity_is_not_rounded() {
        let collector = Arc::new(Collector::default());
        let (dispatcher, _) = start(AsyncConfig::new(3), collector);
        assert_eq!(dispatcher.config().queue_capacity, 3);
        assert_eq!(dispatcher.receiver.capacity(), Some(3));
    }

    #[test]
    fn test_fifo_delivery_single_worker() {
        let collector = Arc::new(Collector::default());
        let (dispatcher, _) = start(AsyncConfig::new(16), Arc::clone(&collector));

        for i in 0..100 {
            dispatcher.enqueue(record(&i.to_string())).unwrap();
        }
        assert!(dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT));

        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(*collector.seen.lock(), expected);
    }

    #[test]
    fn test_flush_waits_for_queued_records() {
        let collector = Arc::new(Collector::default());
        let (dispatcher, _) = start(AsyncConfig::new(64), Arc::clone(&collector));

        for i in 0..10 {
            dispatcher.enqueue(record(&format!("m{i}"))).unwrap();
        }
        dispatcher.flush().unwrap();

        assert_eq!(collector.seen.lock().len(), 10);
        assert!(collector.flushes.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_discard_new_drops_incoming() {
        let gate = gated();
        let config = AsyncConfig::new(1).with_overflow_policy(OverflowPolicy::DiscardNew);
        let (dispatcher, metrics) = start(config, Arc::clone(&gate.collector));

        dispatcher.enqueue(record("A")).unwrap();
        gate.started.recv().unwrap();
        dispatcher.enqueue(record("B")).unwrap();

        let err = dispatcher.enqueue(record("C")).unwrap_err();
        assert!(matches!(err, LoggerError::QueueFull { capacity: 1 }));
        assert_eq!(metrics.dropped_count(), 1);
        assert_eq!(metrics.queue_full_events(), 1);

        drop(gate.release);
        dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT);
        assert_eq!(*gate.collector.seen.lock(), vec!["A", "B"]);
    }

    #[test]
    fn test_discard_oldest_evicts_head() {
        let gate = gated();
        let config = AsyncConfig::new(1).with_overflow_policy(OverflowPolicy::DiscardOldest);
        let (dispatcher, metrics) = start(config, Arc::clone(&gate.collector));

        dispatcher.enqueue(record("A")).unwrap();
        gate.started.recv().unwrap();
        dispatcher.enqueue(record("B")).unwrap();
        dispatcher.enqueue(record("C")).unwrap();
        assert_eq!(metrics.dropped_count(), 1);

        drop(gate.release);
        dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT);
        assert_eq!(*gate.collector.seen.lock(), vec!["A", "C"]);
    }

    #[test]
    fn test_discard_oldest_keeps_flush_markers() {
        let gate = gated();
        let config = AsyncConfig::new(1).with_overflow_policy(OverflowPolicy::DiscardOldest);
        let (dispatcher, metrics) = start(config, Arc::clone(&gate.collector));
        let dispatcher = Arc::new(dispatcher);

        dispatcher.enqueue(record("A")).unwrap();
        gate.started.recv().unwrap();

        let flusher = {
            let dispatcher = Arc::clone(&dispatcher);
            let collector = Arc::clone(&gate.collector);
            thread::spawn(move || {
                dispatcher.flush().unwrap();
                collector.seen.lock().clone()
            })
        };
        while dispatcher.queued() == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        // Queue is full with the flush marker, so this evicts it
        dispatcher.enqueue(record("B")).unwrap();
        thread::sleep(Duration::from_millis(30));
        assert!(!flusher.is_finished());

        gate.release.send(()).unwrap();
        assert_eq!(flusher.join().unwrap(), vec!["A"]);
        assert_eq!(metrics.dropped_count(), 0);

        drop(gate.release);
        dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT);
        assert_eq!(*gate.collector.seen.lock(), vec!["A", "B"]);
        assert!(gate.collector.flushes.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_block_with_timeout_fails() {
        let gate = gated();
        let timeout = Duration::from_millis(20);
        let config =
            AsyncConfig::new(1).with_overflow_policy(OverflowPolicy::BlockWithTimeout(timeout));
        let (dispatcher, metrics) = start(config, Arc::clone(&gate.collector));

        dispatcher.enqueue(record("A")).unwrap();
        gate.started.recv().unwrap();
        dispatcher.enqueue(record("B")).unwrap();

        let err = dispatcher.enqueue(record("C")).unwrap_err();
        assert!(matches!(err, LoggerError::QueueTimeout { .. }));
        assert_eq!(metrics.block_events(), 1);
        assert_eq!(metrics.dropped_count(), 1);

        drop(gate.release);
    }

    #[test]
    fn test_block_waits_for_space() {
        let gate = gated();
        let (dispatcher, metrics) = start(AsyncConfig::new(1), Arc::clone(&gate.collector));
        let dispatcher = Arc::new(dispatcher);

        dispatcher.enqueue(record("A")).unwrap();
        gate.started.recv().unwrap();
        dispatcher.enqueue(record("B")).unwrap();

        let producer = {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || dispatcher.enqueue(record("C")))
        };
        thread::sleep(Duration::from_millis(20));
        drop(gate.release);
        producer.join().unwrap().unwrap();

        dispatcher.flush().unwrap();
        assert_eq!(*gate.collector.seen.lock(), vec!["A", "B", "C"]);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.block_events(), 1);
    }

    #[test]
    fn test_discard_shutdown_drops_pending() {
        let gate = gated();
        let (dispatcher, metrics) = start(AsyncConfig::new(4), Arc::clone(&gate.collector));

        dispatcher.enqueue(record("A")).unwrap();
        gate.started.recv().unwrap();
        dispatcher.enqueue(record("B")).unwrap();
        dispatcher.enqueue(record("C")).unwrap();

        let release = gate.release;
        let opener = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            drop(release);
        });

        assert!(dispatcher.shutdown(ShutdownMode::Discard, DEFAULT_SHUTDOWN_TIMEOUT));
        opener.join().unwrap();

        assert_eq!(*gate.collector.seen.lock(), vec!["A"]);
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_enqueue_after_shutdown() {
        let collector = Arc::new(Collector::default());
        let (dispatcher, _) = start(AsyncConfig::new(4), collector);

        assert!(dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT));
        assert!(dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT));
        assert!(dispatcher.is_stopped());
        assert!(matches!(
            dispatcher.enqueue(record("late")),
            Err(LoggerError::LoggerStopped)
        ));
        assert!(matches!(dispatcher.flush(), Err(LoggerError::LoggerStopped)));
    }

    #[test]
    fn test_multiple_workers_deliver_everything() {
        let collector = Arc::new(Collector::default());
        let config = AsyncConfig::new(32).with_worker_count(4);
        let (dispatcher, _) = start(config, Arc::clone(&collector));

        for i in 0..500 {
            dispatcher.enqueue(record(&i.to_string())).unwrap();
        }
        dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT);

        let mut seen: Vec<usize> = collector
            .seen
            .lock()
            .iter()
            .map(|m| m.parse().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..500).collect::<Vec<_>>());
    }

    #[test]
    fn test_flush_interval_flushes_idle_worker() {
        let collector = Arc::new(Collector::default());
        let config = AsyncConfig::new(8).with_flush_interval(Duration::from_millis(10));
        let (dispatcher, _) = start(config, Arc::clone(&collector));

        dispatcher.enqueue(record("tick")).unwrap();
        thread::sleep(Duration::from_millis(60));

        assert_eq!(collector.seen.lock().len(), 1);
        assert!(collector.flushes.load(Ordering::SeqCst) >= 1);
        dispatcher.shutdown(ShutdownMode::Drain, DEFAULT_SHUTDOWN_TIMEOUT);
    }
}
