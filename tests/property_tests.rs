//! Property-based tests for rust_log_engine using proptest

use proptest::prelude::*;
use rust_log_engine::prelude::*;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

fn render(template: &str, args: &[&dyn FormatArg]) -> String {
    rust_log_engine::format_message(template, args).unwrap()
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Level names parse back to the same level, in any case
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);

        let upper: LogLevel = level.to_str().to_uppercase().parse().unwrap();
        prop_assert_eq!(level, upper);
    }

    /// A gate passes exactly the levels at or above it, and `off` passes nothing
    #[test]
    fn test_level_gate(level in any_level(), threshold in any_level()) {
        let expected = level != LogLevel::Off && threshold != LogLevel::Off && level >= threshold;
        prop_assert_eq!(level.passes(threshold), expected);
    }

    /// The logger calls a sink exactly when both gates pass
    #[test]
    fn test_logger_and_sink_gates(
        logger_level in any_level(),
        sink_level in any_level(),
        record_level in any_level().prop_filter("records are never off", |l| *l != LogLevel::Off),
    ) {
        let sink = Arc::new(MemorySink::new());
        sink.set_level(sink_level);
        let logger = Logger::builder("gates")
            .sink(sink.clone())
            .level(logger_level)
            .build()
            .unwrap();

        logger.log(record_level, "x", &[]).unwrap();

        let delivered = record_level.passes(logger_level) && record_level.passes(sink_level);
        prop_assert_eq!(sink.len(), usize::from(delivered));
    }
}

// ============================================================================
// Template Tests
// ============================================================================

proptest! {
    /// Text without braces is rendered unchanged
    #[test]
    fn test_plain_text_unchanged(text in "[^{}]{0,64}") {
        prop_assert_eq!(render(&text, &[]), text);
    }

    /// Doubled braces always render as single braces
    #[test]
    fn test_brace_escapes(text in "[a-z ]{0,16}") {
        let template = format!("{{{{{}}}}}", text);
        prop_assert_eq!(render(&template, &[]), format!("{{{}}}", text));
    }

    /// Integers render like Rust's own formatting
    #[test]
    fn test_integer_rendering(value in any::<i64>(), width in 0usize..24) {
        prop_assert_eq!(render("{}", &[&value]), value.to_string());
        prop_assert_eq!(
            render(&format!("{{:>{}}}", width), &[&value]),
            format!("{:>width$}", value, width = width)
        );
    }

    #[test]
    fn test_unsigned_radix_rendering(value in any::<u64>()) {
        prop_assert_eq!(render("{:x}", &[&value]), format!("{:x}", value));
        prop_assert_eq!(render("{:#X}", &[&value]), format!("0X{:X}", value));
        prop_assert_eq!(render("{:o}", &[&value]), format!("{:o}", value));
        prop_assert_eq!(render("{:b}", &[&value]), format!("{:b}", value));
    }

    /// Strings pad to at least the width and truncate to the precision
    #[test]
    fn test_string_width_and_precision(
        text in "[a-zA-Z0-9]{0,20}",
        width in 0usize..30,
        precision in 0usize..25,
    ) {
        let padded = render(&format!("{{:<{}}}", width), &[&text]);
        prop_assert_eq!(padded.chars().count(), text.len().max(width));
        prop_assert!(padded.starts_with(text.as_str()));

        let truncated = render(&format!("{{:.{}}}", precision), &[&text]);
        prop_assert_eq!(truncated.as_str(), &text[..text.len().min(precision)]);
    }

    /// Explicit indices pick arguments regardless of order
    #[test]
    fn test_positional_arguments(a in any::<u32>(), b in "[a-z]{1,8}") {
        prop_assert_eq!(render("{1}-{0}-{1}", &[&a, &b]), format!("{}-{}-{}", b, a, b));
    }

    /// Any index beyond the argument list is an error
    #[test]
    fn test_index_out_of_range(count in 0usize..4, extra in 0usize..4) {
        let args: Vec<u8> = (0..count).map(|i| i as u8).collect();
        let refs: Vec<&dyn FormatArg> = args.iter().map(|a| a as &dyn FormatArg).collect();
        let template = format!("{{{}}}", count + extra);
        let result = rust_log_engine::format_message(&template, &refs);
        prop_assert!(result.unwrap_err().is_format());
    }
}

// ============================================================================
// Pattern Tests
// ============================================================================

proptest! {
    /// `%v` passes the message through untouched
    #[test]
    fn test_message_token(message in "\\PC{0,64}", name in "[a-z]{1,12}") {
        let formatter = PatternFormatter::new("%n: %v").unwrap();
        let record = LogRecord::new(Arc::from(name.as_str()), LogLevel::Info, message.clone());
        prop_assert_eq!(formatter.format(&record), format!("{}: {}", name, message));
    }

    /// Patterns without `%` render as literal text
    #[test]
    fn test_literal_pattern(pattern in "[^%]{0,40}") {
        let formatter = PatternFormatter::new(&pattern).unwrap();
        let record = LogRecord::new(Arc::from("p"), LogLevel::Warn, "ignored".to_string());
        prop_assert_eq!(formatter.format(&record), pattern);
    }
}

// ============================================================================
// OverflowPolicy Tests
// ============================================================================

proptest! {
    #[test]
    fn test_overflow_policy_display_roundtrip(
        policy in prop_oneof![
            Just(OverflowPolicy::Block),
            Just(OverflowPolicy::DiscardOldest),
            Just(OverflowPolicy::DiscardNew),
            (1u64..100_000).prop_map(|ms| OverflowPolicy::BlockWithTimeout(Duration::from_millis(ms))),
        ]
    ) {
        let parsed: OverflowPolicy = policy.to_string().parse().unwrap();
        prop_assert_eq!(policy, parsed);
    }
}

// ============================================================================
// Sink Tests
// ============================================================================

proptest! {
    /// A bounded memory sink keeps the newest lines
    #[test]
    fn test_memory_sink_keeps_newest(capacity in 1usize..16, count in 0usize..40) {
        let sink = MemorySink::with_capacity(capacity);
        for i in 0..count {
            sink.accept(&i.to_string(), LogLevel::Info).unwrap();
        }
        let expected: Vec<String> = (count.saturating_sub(capacity)..count)
            .map(|i| i.to_string())
            .collect();
        prop_assert_eq!(sink.lines(), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Rotation never loses bytes while enough backups are kept, and no file
    /// grows past the limit unless a single line is larger than it
    #[test]
    fn test_rotation_preserves_content(
        max_bytes in 40u64..400,
        lengths in prop::collection::vec(1usize..120, 1..40),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("prop.log");
        let sink = RotatingFileSink::new(&path, max_bytes, 64).unwrap();

        let mut written = 0u64;
        for len in &lengths {
            sink.accept(&"y".repeat(*len), LogLevel::Info).unwrap();
            written += *len as u64 + 1;
        }
        sink.flush().unwrap();

        let longest = *lengths.iter().max().unwrap() as u64 + 1;
        let mut total = 0u64;
        let mut files = 0u64;
        for entry in fs::read_dir(temp_dir.path()).unwrap() {
            let size = entry.unwrap().metadata().unwrap().len();
            prop_assert!(size <= max_bytes.max(longest));
            total += size;
            files += 1;
        }

        prop_assert_eq!(total, written);
        prop_assert_eq!(files, sink.rotation_count() + 1);
    }
}
