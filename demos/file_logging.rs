//! File logging example
//!
//! Demonstrates size-rotated and daily files, a logger with several sinks and
//! loading loggers from a JSON configuration.
//!
//! Run with: cargo run --example file_logging

use rust_log_engine::prelude::*;
use std::sync::Arc;

const CONFIG: &str = r#"{
    "pattern": "[%Y-%m-%d %H:%M:%S.%e] [%n] [%l] %v",
    "loggers": [
        {
            "name": "audit",
            "flush_level": "warn",
            "sinks": [
                { "type": "file", "path": "logs/audit.log" },
                { "type": "stderr", "level": "error", "color": true }
            ]
        }
    ]
}"#;

fn main() -> Result<()> {
    println!("=== Rust Log Engine - File Logging Example ===\n");

    println!("1. Rotating file (5 MB, 3 backups):");
    let rotating = rust_log_engine::rotating_logger_mt("file_logger", "logs/mylogfile", 5 * 1024 * 1024, 3)?;
    for i in 0..10 {
        rotating.info("Rotating log message #{}", &[&i])?;
    }

    println!("2. Daily file rotated at 02:30:");
    let daily = rust_log_engine::daily_logger_mt("daily_logger", "logs/daily", 2, 30)?;
    daily.info("Daily log message", &[])?;

    println!("3. Console and file together:");
    let file = Arc::new(FileSink::new("logs/application.log", false)?);
    let both = Logger::builder("application")
        .sink(ConsoleSink::stdout_instance())
        .sink(file)
        .level(LogLevel::Debug)
        .build()?;
    both.info("Application started", &[])?;
    both.debug("Loading configuration...", &[])?;
    both.warn("Using default settings for some options", &[])?;
    both.error("Failed to load optional plugin", &[])?;
    for i in 1..=5 {
        both.info("Processing item {}/5", &[&i])?;
    }
    both.flush()?;

    println!("4. Loggers from JSON configuration:");
    let config = LoggingConfig::from_json(CONFIG)?;
    rust_log_engine::apply_config(&config)?;
    if let Some(audit) = rust_log_engine::get("audit") {
        audit.warn("Configuration applied from JSON", &[])?;
        audit.error("This one also reaches stderr", &[])?;
    }

    rust_log_engine::shutdown();

    println!("\n=== Example completed successfully! ===");
    println!("Check 'logs/' for the full log output");

    Ok(())
}
