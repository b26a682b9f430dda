//! Color decorator for terminal sinks
//!
//! Wraps another sink and surrounds each line with the ANSI escape sequence
//! configured for its level.

use crate::core::error::Result;
use crate::core::log_level::{AtomicLevel, LogLevel};
use crate::core::sink::{Sink, SinkRef};
use colored::Color;
use parking_lot::RwLock;
use std::fmt::Write as _;
use std::ops::Add;
use std::sync::atomic::{AtomicU8, Ordering};

const RESET: &str = "\x1b[0m";

/// Foreground, background and text attributes applied to one level.
///
/// Attributes combine with `+`; colors on the right-hand side win.
///
/// ```
/// use rust_log_engine::sinks::ColorAttribute;
/// use colored::Color;
///
/// let alert = ColorAttribute::bold() + ColorAttribute::fg(Color::White) + ColorAttribute::bg(Color::Red);
/// assert_eq!(alert.escape().as_deref(), Some("\x1b[1;37;41m"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorAttribute {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub underline: bool,
}

impl ColorAttribute {
    pub fn fg(color: Color) -> Self {
        Self {
            fg: Some(color),
            ..Self::default()
        }
    }

    pub fn bg(color: Color) -> Self {
        Self {
            bg: Some(color),
            ..Self::default()
        }
    }

    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn underline() -> Self {
        Self {
            underline: true,
            ..Self::default()
        }
    }

    /// The opening escape sequence, or `None` if the attribute changes nothing
    pub fn escape(&self) -> Option<String> {
        let mut codes = Vec::new();
        if self.bold {
            codes.push("1".to_string());
        }
        if self.underline {
            codes.push("4".to_string());
        }
        if let Some(fg) = self.fg {
            codes.push(fg.to_fg_str().to_string());
        }
        if let Some(bg) = self.bg {
            codes.push(bg.to_bg_str().to_string());
        }
        if codes.is_empty() {
            None
        } else {
            Some(format!("\x1b[{}m", codes.join(";")))
        }
    }
}

impl Add for ColorAttribute {
    type Output = ColorAttribute;

    fn add(self, rhs: ColorAttribute) -> ColorAttribute {
        ColorAttribute {
            fg: rhs.fg.or(self.fg),
            bg: rhs.bg.or(self.bg),
            bold: self.bold || rhs.bold,
            underline: self.underline || rhs.underline,
        }
    }
}

/// When escape sequences are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    Always,
    /// Follow the `NO_COLOR` / `CLICOLOR` conventions and terminal detection
    #[default]
    Automatic,
    Never,
}

impl ColorMode {
    fn from_u8(value: u8) -> ColorMode {
        match value {
            0 => ColorMode::Always,
            2 => ColorMode::Never,
            _ => ColorMode::Automatic,
        }
    }

    fn enabled(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Automatic => colored::control::SHOULD_COLORIZE.should_colorize(),
        }
    }
}

fn default_colors() -> [Option<ColorAttribute>; 10] {
    let mut colors = [None; 10];
    colors[LogLevel::Trace as usize] = Some(ColorAttribute::fg(Color::Cyan));
    colors[LogLevel::Debug as usize] = Some(ColorAttribute::fg(Color::Cyan));
    colors[LogLevel::Info as usize] = Some(ColorAttribute::bold());
    colors[LogLevel::Notice as usize] =
        Some(ColorAttribute::bold() + ColorAttribute::fg(Color::White));
    colors[LogLevel::Warn as usize] =
        Some(ColorAttribute::bold() + ColorAttribute::fg(Color::Yellow));
    colors[LogLevel::Error as usize] = Some(ColorAttribute::bold() + ColorAttribute::fg(Color::Red));
    colors[LogLevel::Critical as usize] =
        Some(ColorAttribute::bold() + ColorAttribute::fg(Color::Red));
    colors[LogLevel::Alert as usize] = Some(
        ColorAttribute::bold() + ColorAttribute::fg(Color::White) + ColorAttribute::bg(Color::Red),
    );
    colors[LogLevel::Emerg as usize] = Some(
        ColorAttribute::bold() + ColorAttribute::fg(Color::Yellow) + ColorAttribute::bg(Color::Red),
    );
    colors
}

/// Sink decorator adding per-level colors
///
/// # Example
///
/// ```
/// use rust_log_engine::prelude::*;
/// use rust_log_engine::sinks::{ColorMode, ColorSink};
/// use std::sync::Arc;
///
/// let memory = Arc::new(MemorySink::new());
/// let colored = ColorSink::new(memory.clone()).with_mode(ColorMode::Always);
/// colored.accept("boom", LogLevel::Error).unwrap();
/// assert_eq!(memory.lines(), vec!["\x1b[1;31mboom\x1b[0m"]);
/// ```
pub struct ColorSink {
    inner: SinkRef,
    colors: RwLock<[Option<ColorAttribute>; 10]>,
    mode: AtomicU8,
    level: AtomicLevel,
}

impl ColorSink {
    /// Wrap `inner` with the default color scheme
    pub fn new(inner: SinkRef) -> Self {
        Self::with_colors(inner, default_colors())
    }

    /// Wrap `inner` without any colors configured
    pub fn plain(inner: SinkRef) -> Self {
        Self::with_colors(inner, [None; 10])
    }

    fn with_colors(inner: SinkRef, colors: [Option<ColorAttribute>; 10]) -> Self {
        Self {
            inner,
            colors: RwLock::new(colors),
            mode: AtomicU8::new(ColorMode::Automatic as u8),
            level: AtomicLevel::new(LogLevel::Trace),
        }
    }

    #[must_use]
    pub fn with_mode(self, mode: ColorMode) -> Self {
        self.set_mode(mode);
        self
    }

    pub fn set_mode(&self, mode: ColorMode) {
        self.mode.store(mode as u8, Ordering::Relaxed);
    }

    pub fn mode(&self) -> ColorMode {
        ColorMode::from_u8(self.mode.load(Ordering::Relaxed))
    }

    pub fn set_color(&self, level: LogLevel, attribute: ColorAttribute) {
        self.colors.write()[level as usize] = Some(attribute);
    }

    pub fn clear_color(&self, level: LogLevel) {
        self.colors.write()[level as usize] = None;
    }

    pub fn color(&self, level: LogLevel) -> Option<ColorAttribute> {
        self.colors.read()[level as usize]
    }

    pub fn inner(&self) -> &SinkRef {
        &self.inner
    }
}

impl Sink for ColorSink {
    fn accept(&self, text: &str, level: LogLevel) -> Result<()> {
        if !self.should_accept(level) {
            return Ok(());
        }

        let escape = if self.mode().enabled() {
            self.color(level).and_then(|attribute| attribute.escape())
        } else {
            None
        };

        match escape {
            Some(escape) => {
                let mut line = String::with_capacity(escape.len() + text.len() + RESET.len());
                let _ = write!(line, "{}{}{}", escape, text, RESET);
                self.inner.accept(&line, level)
            }
            None => self.inner.accept(text, level),
        }
    }

    fn flush(&self) -> Result<()> {
        self.inner.flush()
    }

    fn set_level(&self, level: LogLevel) {
        self.level.store(level);
    }

    fn level(&self) -> LogLevel {
        self.level.load()
    }

    fn name(&self) -> &str {
        "color"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::MemorySink;
    use std::sync::Arc;

    fn wrapped() -> (ColorSink, Arc<MemorySink>) {
        let memory = Arc::new(MemorySink::new());
        let sink = ColorSink::new(memory.clone()).with_mode(ColorMode::Always);
        (sink, memory)
    }

    #[test]
    fn test_default_scheme() {
        let (sink, memory) = wrapped();
        sink.accept("trace", LogLevel::Trace).unwrap();
        sink.accept("warn", LogLevel::Warn).unwrap();
        sink.accept("emerg", LogLevel::Emerg).unwrap();

        assert_eq!(
            memory.lines(),
            vec![
                "\x1b[36mtrace\x1b[0m",
                "\x1b[1;33mwarn\x1b[0m",
                "\x1b[1;33;41memerg\x1b[0m",
            ]
        );
    }

    #[test]
    fn test_unmapped_level_passes_through() {
        let memory = Arc::new(MemorySink::new());
        let sink = ColorSink::plain(memory.clone()).with_mode(ColorMode::Always);
        sink.accept("plain", LogLevel::Info).unwrap();

        sink.set_color(LogLevel::Info, ColorAttribute::underline() + ColorAttribute::fg(Color::Green));
        sink.accept("green", LogLevel::Info).unwrap();

        assert_eq!(memory.lines(), vec!["plain", "\x1b[4;32mgreen\x1b[0m"]);
    }

    #[test]
    fn test_never_mode_strips_colors() {
        let (sink, memory) = wrapped();
        sink.set_mode(ColorMode::Never);
        sink.accept("quiet", LogLevel::Error).unwrap();
        assert_eq!(memory.lines(), vec!["quiet"]);
    }

    #[test]
    fn test_clear_color() {
        let (sink, memory) = wrapped();
        sink.clear_color(LogLevel::Error);
        assert_eq!(sink.color(LogLevel::Error), None);
        sink.accept("uncolored", LogLevel::Error).unwrap();
        assert_eq!(memory.lines(), vec!["uncolored"]);
    }

    #[test]
    fn test_attribute_combination() {
        let attribute = ColorAttribute::fg(Color::Red) + ColorAttribute::fg(Color::Blue);
        assert_eq!(attribute.fg, Some(Color::Blue));
        assert_eq!(ColorAttribute::default().escape(), None);
    }

    #[test]
    fn test_level_filter_before_inner() {
        let (sink, memory) = wrapped();
        sink.set_level(LogLevel::Error);
        sink.accept("filtered", LogLevel::Warn).unwrap();
        assert!(memory.is_empty());
    }
}
