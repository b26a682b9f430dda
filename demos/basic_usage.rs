//! Basic logger usage example
//!
//! Demonstrates console loggers from the global registry, levels, patterns,
//! message templates and stream-style emission.
//!
//! Run with: cargo run --example basic_usage

use rust_log_engine::prelude::*;
use rust_log_engine::{info, warn};
use std::fmt;

struct Endpoint {
    host: &'static str,
    port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FormatArg for Endpoint {
    fn as_arg(&self) -> Arg<'_> {
        Arg::display(self)
    }
}

fn main() -> Result<()> {
    println!("=== Rust Log Engine - Basic Usage Example ===\n");

    let console = rust_log_engine::stdout_color_mt("console")?;
    console.set_level(LogLevel::Trace);

    println!("1. Logging at different levels:");
    console.trace("This is a trace message", &[])?;
    console.debug("This is a debug message", &[])?;
    console.info("Welcome to rust_log_engine!", &[])?;
    console.notice("This is a notice", &[])?;
    console.warn("Easy padding in numbers like {:08d}", &[&12])?;
    console.error("Some error message with arg {}..", &[&1])?;
    console.critical("Support for int: {0:d};  hex: {0:x};  oct: {0:o}; bin: {0:b}", &[&42])?;
    console.info("Support for floats {:03.2f}", &[&1.23456])?;
    console.info("Positional args are {1} {0}...", &[&"too", &"supported"])?;
    console.info("{:<30}", &[&"left aligned"])?;

    println!("\n2. Changing the level:");
    console.set_level(LogLevel::Info);
    console.debug("This message should not be displayed", &[])?;
    console.info("Info message (visible)", &[])?;

    println!("\n3. Custom pattern and macros:");
    console.set_pattern("*** [%H:%M:%S %z] [thread %t] %v ***")?;
    info!(console, "Custom pattern with {} placeholders", 2)?;

    let endpoint = Endpoint { host: "db-1", port: 5432 };
    warn!(console, "Custom types work too: {}", endpoint)?;

    println!("\n4. Stream-style logging:");
    console
        .info_stream()
        .append("streamed ")
        .append(3)
        .append(" values");

    println!("\n5. Retrieving loggers by name:");
    if let Some(logger) = rust_log_engine::get("console") {
        logger.info("Loggers can be retrieved from the global registry", &[])?;
    }

    rust_log_engine::shutdown();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
