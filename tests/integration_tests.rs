//! Integration tests for the logging engine
//!
//! These tests verify:
//! - Level gating at logger and sink level
//! - Template errors reaching no sink
//! - Size and daily file rotation
//! - Async FIFO delivery and overflow policies
//! - Registry lifecycle
//! - Sink failure isolation

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::{Condvar, Mutex};
use rust_log_engine::core::AtomicLevel;
use rust_log_engine::prelude::*;
use rust_log_engine::{ManualClock, ShutdownMode};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Counts accepted records and flushes
struct CountingSink {
    accepted: AtomicUsize,
    flushed: AtomicUsize,
    level: AtomicLevel,
}

impl CountingSink {
    fn new() -> Self {
        Self {
            accepted: AtomicUsize::new(0),
            flushed: AtomicUsize::new(0),
            level: AtomicLevel::new(LogLevel::Trace),
        }
    }
}

impl Sink for CountingSink {
    fn accept(&self, _text: &str, level: LogLevel) -> Result<()> {
        if self.should_accept(level) {
            self.accepted.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.flushed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_level(&self, level: LogLevel) {
        self.level.store(level);
    }

    fn level(&self) -> LogLevel {
        self.level.load()
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Blocks inside `accept` until opened, so a test can hold the async worker
struct GateSink {
    inner: MemorySink,
    state: Mutex<(bool, usize)>,
    changed: Condvar,
}

impl GateSink {
    fn new() -> Self {
        Self {
            inner: MemorySink::new(),
            state: Mutex::new((false, 0)),
            changed: Condvar::new(),
        }
    }

    fn wait_entered(&self, count: usize) {
        let mut state = self.state.lock();
        while state.1 < count {
            self.changed.wait(&mut state);
        }
    }

    fn open(&self) {
        self.state.lock().0 = true;
        self.changed.notify_all();
    }
}

impl Sink for GateSink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        let mut state = self.state.lock();
        state.1 += 1;
        self.changed.notify_all();
        while !state.0 {
            self.changed.wait(&mut state);
        }
        drop(state);
        self.inner.accept(text, level)
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn set_level(&self, _level: LogLevel) {}

    fn level(&self) -> LogLevel {
        LogLevel::Trace
    }

    fn name(&self) -> &str {
        "gate"
    }
}

struct BrokenSink;

impl Sink for BrokenSink {
    fn accept(&self, _text: &str, _level: LogLevel) -> Result<()> {
        Err(LoggerError::sink_write("broken", "device unplugged"))
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn set_level(&self, _level: LogLevel) {}

    fn level(&self) -> LogLevel {
        LogLevel::Trace
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn line_of(len: usize) -> String {
    "x".repeat(len)
}

#[test]
fn test_level_gating_no_accept_below_threshold() {
    let sink = Arc::new(CountingSink::new());
    let logger = Logger::builder("gate")
        .sink(sink.clone())
        .level(LogLevel::Warn)
        .build()
        .unwrap();

    logger.trace("t", &[]).unwrap();
    logger.debug("d", &[]).unwrap();
    logger.info("i", &[]).unwrap();
    logger.notice("n", &[]).unwrap();
    assert_eq!(sink.accepted.load(Ordering::SeqCst), 0);

    logger.warn("w", &[]).unwrap();
    logger.emerg("m", &[]).unwrap();
    assert_eq!(sink.accepted.load(Ordering::SeqCst), 2);

    logger.set_level(LogLevel::Off);
    logger.emerg("nothing passes off", &[]).unwrap();
    assert_eq!(sink.accepted.load(Ordering::SeqCst), 2);
}

#[test]
fn test_sink_level_filters_independently() {
    let all = Arc::new(MemorySink::new());
    let errors_only = Arc::new(MemorySink::new());
    errors_only.set_level(LogLevel::Error);

    let logger = Logger::builder("split")
        .sinks([all.clone() as SinkRef, errors_only.clone() as SinkRef])
        .pattern("%v")
        .build()
        .unwrap();

    logger.info("routine", &[]).unwrap();
    logger.error("failure", &[]).unwrap();

    assert_eq!(all.lines(), vec!["routine", "failure"]);
    assert_eq!(errors_only.lines(), vec!["failure"]);
}

#[test]
fn test_template_arity_error_invokes_zero_sinks() {
    let sink = Arc::new(CountingSink::new());
    let logger = Logger::builder("arity").sink(sink.clone()).build().unwrap();

    let err = logger.info("{} {} {}", &[&1, &2]).unwrap_err();
    assert!(err.is_format());

    let err = logger.info("{} {1}", &[&1, &2]).unwrap_err();
    assert!(err.is_format());

    assert_eq!(sink.accepted.load(Ordering::SeqCst), 0);
    assert_eq!(logger.metrics().format_errors(), 2);
    assert_eq!(logger.metrics().total_logged(), 0);
}

#[test]
fn test_pattern_and_template_rendering() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::builder("render")
        .sink(sink.clone())
        .pattern("%n|%l|%L|%v|%%")
        .level(LogLevel::Trace)
        .build()
        .unwrap();

    logger
        .warn("{:>6}|{:<4}|{:^7}|{:08.3f}|{:#x}", &[&"ab", &"cd", &"mid", &3.14159, &255])
        .unwrap();
    logger.info("{{literal}} {0}{0}", &[&"x"]).unwrap();

    assert_eq!(
        sink.lines(),
        vec![
            "render|warning|W|    ab|cd  |  mid  |0003.142|0xff|%",
            "render|info|I|{literal} xx|%",
        ]
    );
}

#[test]
fn test_rotating_sink_rotates_exactly_once_across_limit() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("rotating.log");
    let sink = Arc::new(RotatingFileSink::new(&path, 1024, 3).unwrap());
    let logger = Logger::builder("rotating")
        .sink(sink.clone())
        .pattern("%v")
        .build()
        .unwrap();

    // 20 lines of 99 characters plus newline: 2000 bytes
    let line = line_of(99);
    for _ in 0..20 {
        logger.info("{}", &[&line]).unwrap();
    }
    logger.flush().unwrap();

    assert_eq!(sink.rotation_count(), 1);
    assert_eq!(fs::metadata(&path).unwrap().len(), 1000);
    assert_eq!(fs::metadata(sink.backup_path(1)).unwrap().len(), 1000);
    assert!(!sink.backup_path(2).exists());
}

#[test]
fn test_rotating_sink_retains_only_max_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("retained.log");
    let sink = RotatingFileSink::new(&path, 100, 2).unwrap();

    for i in 0..10 {
        sink.accept(&format!("{:<79}", format!("line {}", i)), LogLevel::Info)
            .unwrap();
    }
    sink.flush().unwrap();

    assert!(path.exists());
    assert!(sink.backup_path(1).exists());
    assert!(sink.backup_path(2).exists());
    assert!(!sink.backup_path(3).exists());

    // Newest content is in the current file, the one before it in .1
    assert!(fs::read_to_string(&path).unwrap().starts_with("line 9"));
    assert!(fs::read_to_string(sink.backup_path(1))
        .unwrap()
        .starts_with("line 8"));
}

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

#[test]
fn test_daily_sink_rotates_once_at_configured_time() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let clock = ManualClock::new(at(30, 23, 0));
    let sink = Arc::new(
        DailyFileSink::with_clock(
            temp_dir.path().join("daily.txt"),
            2,
            30,
            Threading::Multi,
            Arc::new(clock.clone()),
        )
        .unwrap(),
    );
    let logger = Logger::builder("daily")
        .sink(sink.clone())
        .pattern("%v")
        .build()
        .unwrap();

    logger.info("before midnight", &[]).unwrap();
    clock.set(at(31, 1, 0));
    logger.info("after midnight, before rotation", &[]).unwrap();
    clock.set(at(31, 2, 30));
    logger.info("at rotation time", &[]).unwrap();
    clock.set(at(31, 23, 59));
    logger.info("same day", &[]).unwrap();
    logger.flush().unwrap();

    let first = temp_dir.path().join("daily_2024-01-30.txt");
    let second = temp_dir.path().join("daily_2024-01-31.txt");
    assert_eq!(
        fs::read_to_string(first).unwrap(),
        "before midnight\nafter midnight, before rotation\n"
    );
    assert_eq!(
        fs::read_to_string(second).unwrap(),
        "at rotation time\nsame day\n"
    );
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 2);
}

#[test]
fn test_async_fifo_of_100_records() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::builder("fifo")
        .sink(sink.clone())
        .pattern("%v")
        .async_mode(AsyncConfig::new(16))
        .build()
        .unwrap();

    for i in 0..100 {
        logger.info("message {}", &[&i]).unwrap();
    }
    logger.flush().unwrap();

    let expected: Vec<String> = (0..100).map(|i| format!("message {}", i)).collect();
    assert_eq!(sink.lines(), expected);
    assert_eq!(logger.metrics().total_logged(), 100);
}

#[test]
fn test_discard_new_with_capacity_one_drops_and_counts() {
    let sink = Arc::new(GateSink::new());
    let logger = Logger::builder("discard-new")
        .sink(sink.clone())
        .pattern("%v")
        .async_mode(AsyncConfig::new(1).with_overflow_policy("discard-new".parse().unwrap()))
        .build()
        .unwrap();

    logger.info("A", &[]).unwrap();
    // Worker is now stuck inside the sink with A
    sink.wait_entered(1);
    logger.info("B", &[]).unwrap();

    let err = logger.info("C", &[]).unwrap_err();
    assert!(matches!(err, LoggerError::QueueFull { capacity: 1 }));
    assert_eq!(logger.metrics().dropped_count(), 1);

    sink.open();
    logger.flush().unwrap();
    assert_eq!(sink.inner.lines(), vec!["A", "B"]);
}

#[test]
fn test_discard_oldest_evicts_queued_record() {
    let sink = Arc::new(GateSink::new());
    let logger = Logger::builder("discard-oldest")
        .sink(sink.clone())
        .pattern("%v")
        .async_mode(AsyncConfig::new(1).with_overflow_policy(OverflowPolicy::DiscardOldest))
        .build()
        .unwrap();

    logger.info("A", &[]).unwrap();
    sink.wait_entered(1);
    logger.info("B", &[]).unwrap();
    logger.info("C", &[]).unwrap();
    assert_eq!(logger.metrics().dropped_count(), 1);

    sink.open();
    logger.flush().unwrap();
    assert_eq!(sink.inner.lines(), vec!["A", "C"]);
}

#[test]
fn test_block_with_timeout_reports_timeout() {
    let sink = Arc::new(GateSink::new());
    let logger = Logger::builder("timeout")
        .sink(sink.clone())
        .async_mode(
            AsyncConfig::new(1)
                .with_overflow_policy(OverflowPolicy::BlockWithTimeout(Duration::from_millis(20))),
        )
        .build()
        .unwrap();

    logger.info("A", &[]).unwrap();
    sink.wait_entered(1);
    logger.info("B", &[]).unwrap();

    let err = logger.info("C", &[]).unwrap_err();
    assert!(matches!(err, LoggerError::QueueTimeout { .. }));
    sink.open();
}

#[test]
fn test_shutdown_discard_drops_pending_records() {
    let sink = Arc::new(GateSink::new());
    let logger = Logger::builder("discard-shutdown")
        .sink(sink.clone())
        .pattern("%v")
        .async_mode(AsyncConfig::new(8))
        .build()
        .unwrap();

    logger.info("A", &[]).unwrap();
    sink.wait_entered(1);
    logger.info("B", &[]).unwrap();
    logger.info("C", &[]).unwrap();

    let opener = {
        let sink = Arc::clone(&sink);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            sink.open();
        })
    };
    assert!(logger.shutdown(ShutdownMode::Discard));
    opener.join().unwrap();

    assert_eq!(sink.inner.lines(), vec!["A"]);
    assert_eq!(logger.metrics().dropped_count(), 2);
    assert!(matches!(
        logger.info("late", &[]),
        Err(LoggerError::LoggerStopped)
    ));
}

#[test]
fn test_sink_failure_is_isolated_and_reported() {
    let good = Arc::new(MemorySink::new());
    let reported = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reported);

    let logger = Logger::builder("isolated")
        .sink(Arc::new(BrokenSink))
        .sink(good.clone())
        .pattern("%v")
        .error_handler(Arc::new(move |err: &LoggerError| {
            seen.lock().push(err.to_string());
        }))
        .build()
        .unwrap();

    logger.error("still delivered", &[]).unwrap();

    assert_eq!(good.lines(), vec!["still delivered"]);
    let reported = reported.lock();
    assert_eq!(reported.len(), 1);
    assert!(reported[0].contains("device unplugged"));
    assert_eq!(logger.metrics().sink_failures(), 1);
}

#[test]
fn test_flush_on_level() {
    let sink = Arc::new(CountingSink::new());
    let logger = Logger::builder("flusher").sink(sink.clone()).build().unwrap();
    logger.flush_on(LogLevel::Error);

    logger.warn("no flush", &[]).unwrap();
    assert_eq!(sink.flushed.load(Ordering::SeqCst), 0);

    logger.error("flush", &[]).unwrap();
    logger.critical("flush again", &[]).unwrap();
    assert_eq!(sink.flushed.load(Ordering::SeqCst), 2);
}

#[test]
fn test_stream_emission() {
    use std::fmt::Write as _;

    let sink = Arc::new(MemorySink::new());
    let logger = Logger::builder("stream")
        .sink(sink.clone())
        .pattern("%v")
        .build()
        .unwrap();

    logger
        .info_stream()
        .append("user ")
        .append(42)
        .append(" logged in");
    {
        let mut stream = logger.warn_stream();
        write!(stream, "{} retries left", 2).unwrap();
    }
    logger.debug_stream().append("disabled level");

    assert_eq!(sink.lines(), vec!["user 42 logged in", "2 retries left"]);
}

#[test]
fn test_invalid_pattern_keeps_previous() {
    let sink = Arc::new(MemorySink::new());
    let logger = Logger::builder("pattern")
        .sink(sink.clone())
        .pattern("<%v>")
        .build()
        .unwrap();

    assert!(logger.set_pattern("%v %").is_err());
    assert_eq!(logger.pattern(), "<%v>");
    logger.info("kept", &[]).unwrap();
    assert_eq!(sink.lines(), vec!["<kept>"]);

    assert!(Logger::builder("bad").pattern("%Q").build().is_err());
}

#[test]
fn test_registry_lifecycle() {
    let registry = Registry::new();
    let sink = Arc::new(MemorySink::new());

    registry.create("one", vec![sink.clone()]).unwrap();
    registry.create("two", vec![sink.clone()]).unwrap();

    assert!(matches!(
        registry.create("one", vec![]),
        Err(LoggerError::DuplicateName(_))
    ));
    assert!(matches!(
        registry.try_get("three"),
        Err(LoggerError::NameNotFound(_))
    ));
    assert_eq!(registry.logger_names(), vec!["one", "two"]);

    registry.drop_all();
    assert!(registry.get("one").is_none());
    assert!(registry.get("two").is_none());
    assert!(registry.is_empty());
}

#[test]
fn test_global_registry_entry_points() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let logger = rust_log_engine::basic_logger_mt(
        "integration-global-basic",
        temp_dir.path().join("global.log"),
        true,
    )
    .unwrap();

    let found = rust_log_engine::get("integration-global-basic").unwrap();
    assert!(Arc::ptr_eq(&logger, &found));

    found.info("via global registry", &[]).unwrap();
    rust_log_engine::flush_all().unwrap();
    let content = fs::read_to_string(temp_dir.path().join("global.log")).unwrap();
    assert!(content.ends_with("[integration-global-basic] [info] via global registry\n"));

    rust_log_engine::drop("integration-global-basic").unwrap();
    assert!(rust_log_engine::get("integration-global-basic").is_none());
    assert!(rust_log_engine::drop("integration-global-basic").is_err());
}

#[cfg(feature = "console")]
#[test]
fn test_color_sink_over_file() {
    use rust_log_engine::sinks::{ColorMode, ColorSink};

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("color.log");
    let file = Arc::new(FileSink::new(&path, true).unwrap());
    let color = Arc::new(ColorSink::new(file).with_mode(ColorMode::Always));

    let logger = Logger::builder("color")
        .sink(color)
        .pattern("%v")
        .build()
        .unwrap();
    logger.error("red", &[]).unwrap();
    logger.flush().unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "\x1b[1;31mred\x1b[0m\n");
}
