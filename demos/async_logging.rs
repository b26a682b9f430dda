//! Async logging example
//!
//! Demonstrates async mode for registry-created loggers with multi-threaded
//! producers and an overflow policy.
//!
//! Run with: cargo run --example async_logging

use rust_log_engine::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Rust Log Engine - Async Logging Example ===\n");

    // Every logger created from now on dispatches on a background worker
    rust_log_engine::set_async_mode(
        AsyncConfig::new(4096)
            .with_overflow_policy(OverflowPolicy::Block)
            .with_flush_interval(Duration::from_millis(200)),
    )?;

    let logger = rust_log_engine::daily_logger_st("async_file_logger", "logs/async_log.txt", 0, 0)?;
    let console = rust_log_engine::stdout_logger_mt("async_console")?;
    println!("   async: {} / {}", logger.is_async(), console.is_async());

    println!("1. High-performance async logging:");
    for i in 0..100 {
        logger.info("Async message #{}", &[&i])?;
    }
    println!("   Logged 100 messages asynchronously");

    println!("\n2. Multi-threaded logging:");
    let handles: Vec<_> = (0..5)
        .map(|thread_id| {
            let console = Arc::clone(&console);
            thread::spawn(move || {
                for i in 0..20 {
                    let _ = console.info("Thread {} - Message {}", &[&thread_id, &i]);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("producer thread panicked");
    }
    println!("   5 threads logged 20 messages each");

    // Waits for everything queued so far
    console.flush()?;
    let metrics = logger.metrics().snapshot();
    println!(
        "\n   logged: {}, dropped: {} ({:.1}%)",
        metrics.delivered,
        metrics.dropped,
        metrics.drop_rate()
    );

    // Drains the queues before exit
    rust_log_engine::shutdown();

    println!("\n=== Example completed successfully! ===");
    println!("Check 'logs/' for the daily file output");

    Ok(())
}
