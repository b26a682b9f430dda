//! Pattern formatting of complete log lines
//!
//! A pattern mixes literal text with `%` tokens that expand to record fields.
//! Patterns are compiled once into segments and reused for every record.
//!
//! | Token | Expands to |
//! |-------|------------|
//! | `%v` | rendered message |
//! | `%n` | logger name |
//! | `%l` / `%L` | level name / single-letter level |
//! | `%t` | thread id |
//! | `%P` | process id |
//! | `%Y` `%C` `%m` `%d` | year, 2-digit year, month, day |
//! | `%H` `%I` `%M` `%S` `%p` | hour (24h), hour (12h), minute, second, AM/PM |
//! | `%e` `%f` `%F` | milliseconds, microseconds, nanoseconds |
//! | `%a` `%A` `%b` `%B` | weekday and month names, short and full |
//! | `%D` `%T` `%R` `%r` `%c` | composite date/time forms |
//! | `%z` | UTC offset (`+hh:mm`) |
//! | `%E` | seconds since the epoch |
//! | `%+` | the default pattern |
//! | `%%` | a literal `%` |

use super::error::{LoggerError, Result};
use super::log_record::LogRecord;
use chrono::{Datelike, Timelike};
use std::fmt::Write as _;

/// Pattern used when none is configured
pub const DEFAULT_PATTERN: &str = "[%Y-%m-%d %H:%M:%S.%e] [%n] [%l] %v";

const WEEKDAYS_SHORT: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const WEEKDAYS_FULL: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTHS_FULL: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Message,
    LoggerName,
    Level,
    ShortLevel,
    ThreadId,
    ProcessId,
    Year,
    ShortYear,
    Month,
    Day,
    Hour24,
    Hour12,
    Minute,
    Second,
    Millis,
    Micros,
    Nanos,
    AmPm,
    WeekdayShort,
    WeekdayFull,
    MonthShort,
    MonthFull,
    ShortDate,
    Time24,
    HourMinute,
    Time12,
    DateTime,
    TzOffset,
    EpochSeconds,
}

impl Token {
    fn from_flag(flag: char) -> Option<Token> {
        let token = match flag {
            'v' => Token::Message,
            'n' => Token::LoggerName,
            'l' => Token::Level,
            'L' => Token::ShortLevel,
            't' => Token::ThreadId,
            'P' => Token::ProcessId,
            'Y' => Token::Year,
            'C' => Token::ShortYear,
            'm' => Token::Month,
            'd' => Token::Day,
            'H' => Token::Hour24,
            'I' => Token::Hour12,
            'M' => Token::Minute,
            'S' => Token::Second,
            'e' => Token::Millis,
            'f' => Token::Micros,
            'F' => Token::Nanos,
            'p' => Token::AmPm,
            'a' => Token::WeekdayShort,
            'A' => Token::WeekdayFull,
            'b' => Token::MonthShort,
            'B' => Token::MonthFull,
            'D' => Token::ShortDate,
            'T' => Token::Time24,
            'R' => Token::HourMinute,
            'r' => Token::Time12,
            'c' => Token::DateTime,
            'z' => Token::TzOffset,
            'E' => Token::EpochSeconds,
            _ => return None,
        };
        Some(token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

/// A compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternFormatter {
    pattern: String,
    segments: Vec<Segment>,
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) {
    if let Some(Segment::Literal(last)) = segments.last_mut() {
        last.push_str(text);
    } else {
        segments.push(Segment::Literal(text.to_string()));
    }
}

fn compile_into(pattern: &str, segments: &mut Vec<Segment>) -> Result<()> {
    let mut chars = pattern.char_indices();
    let mut literal_start = 0;

    while let Some((pos, c)) = chars.next() {
        if c != '%' {
            continue;
        }
        if pos > literal_start {
            push_literal(segments, &pattern[literal_start..pos]);
        }
        let Some((flag_pos, flag)) = chars.next() else {
            return Err(LoggerError::format(pattern, "pattern ends with a lone '%'"));
        };
        literal_start = flag_pos + flag.len_utf8();

        match flag {
            '%' => push_literal(segments, "%"),
            '+' => compile_into(DEFAULT_PATTERN, segments)?,
            _ => {
                let token = Token::from_flag(flag).ok_or_else(|| {
                    LoggerError::format(pattern, format!("unknown pattern flag '%{flag}'"))
                })?;
                segments.push(Segment::Token(token));
            }
        }
    }

    if literal_start < pattern.len() {
        push_literal(segments, &pattern[literal_start..]);
    }
    Ok(())
}

impl PatternFormatter {
    /// Compile a pattern. Unknown flags are rejected here, never at format time.
    pub fn new(pattern: &str) -> Result<Self> {
        let mut segments = Vec::new();
        compile_into(pattern, &mut segments)?;
        Ok(Self {
            pattern: pattern.to_string(),
            segments,
        })
    }

    /// The source text this formatter was compiled from
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Format a record into a new line (without trailing newline)
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(self.pattern.len() + record.message.len() + 32);
        self.format_into(record, &mut out);
        out
    }

    /// Format a record, appending to `out`
    pub fn format_into(&self, record: &LogRecord, out: &mut String) {
        let ts = &record.timestamp;
        for segment in &self.segments {
            let token = match segment {
                Segment::Literal(text) => {
                    out.push_str(text);
                    continue;
                }
                Segment::Token(token) => *token,
            };

            // Writing into a String cannot fail
            let _ = match token {
                Token::Message => {
                    out.push_str(&record.message);
                    Ok(())
                }
                Token::LoggerName => {
                    out.push_str(&record.logger_name);
                    Ok(())
                }
                Token::Level => {
                    out.push_str(record.level.to_str());
                    Ok(())
                }
                Token::ShortLevel => {
                    out.push_str(record.level.short_str());
                    Ok(())
                }
                Token::ThreadId => write!(out, "{}", record.thread_id),
                Token::ProcessId => write!(out, "{}", std::process::id()),
                Token::Year => write!(out, "{:04}", ts.year()),
                Token::ShortYear => write!(out, "{:02}", ts.year().rem_euclid(100)),
                Token::Month => write!(out, "{:02}", ts.month()),
                Token::Day => write!(out, "{:02}", ts.day()),
                Token::Hour24 => write!(out, "{:02}", ts.hour()),
                Token::Hour12 => write!(out, "{:02}", ts.hour12().1),
                Token::Minute => write!(out, "{:02}", ts.minute()),
                Token::Second => write!(out, "{:02}", ts.second()),
                Token::Millis => write!(out, "{:03}", (ts.nanosecond() % 1_000_000_000) / 1_000_000),
                Token::Micros => write!(out, "{:06}", (ts.nanosecond() % 1_000_000_000) / 1_000),
                Token::Nanos => write!(out, "{:09}", ts.nanosecond() % 1_000_000_000),
                Token::AmPm => {
                    out.push_str(if ts.hour12().0 { "PM" } else { "AM" });
                    Ok(())
                }
                Token::WeekdayShort => {
                    out.push_str(WEEKDAYS_SHORT[ts.weekday().num_days_from_monday() as usize]);
                    Ok(())
                }
                Token::WeekdayFull => {
                    out.push_str(WEEKDAYS_FULL[ts.weekday().num_days_from_monday() as usize]);
                    Ok(())
                }
                Token::MonthShort => {
                    out.push_str(MONTHS_SHORT[ts.month0() as usize]);
                    Ok(())
                }
                Token::MonthFull => {
                    out.push_str(MONTHS_FULL[ts.month0() as usize]);
                    Ok(())
                }
                Token::ShortDate => write!(
                    out,
                    "{:02}/{:02}/{:02}",
                    ts.month(),
                    ts.day(),
                    ts.year().rem_euclid(100)
                ),
                Token::Time24 => write!(
                    out,
                    "{:02}:{:02}:{:02}",
                    ts.hour(),
                    ts.minute(),
                    ts.second()
                ),
                Token::HourMinute => write!(out, "{:02}:{:02}", ts.hour(), ts.minute()),
                Token::Time12 => {
                    let (pm, hour) = ts.hour12();
                    write!(
                        out,
                        "{:02}:{:02}:{:02} {}",
                        hour,
                        ts.minute(),
                        ts.second(),
                        if pm { "PM" } else { "AM" }
                    )
                }
                Token::DateTime => write!(
                    out,
                    "{} {} {:02} {:02}:{:02}:{:02} {}",
                    WEEKDAYS_SHORT[ts.weekday().num_days_from_monday() as usize],
                    MONTHS_SHORT[ts.month0() as usize],
                    ts.day(),
                    ts.hour(),
                    ts.minute(),
                    ts.second(),
                    ts.year()
                ),
                Token::TzOffset => write!(out, "{}", ts.format("%:z")),
                Token::EpochSeconds => write!(out, "{}", ts.timestamp()),
            };
        }
    }
}

impl Default for PatternFormatter {
    fn default() -> Self {
        let mut segments = Vec::new();
        // The default pattern only uses known flags
        let _ = compile_into(DEFAULT_PATTERN, &mut segments);
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            segments,
        }
    }
}
