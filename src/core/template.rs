//! Message templates with positional arguments and format specifiers
//!
//! A template contains literal text and placeholders of the form
//! `{` index? (`:` spec)? `}`:
//!
//! - `{}` consumes the next argument, left to right
//! - `{1}` references the second argument
//! - `{0:>08.3f}` applies a format specifier
//!
//! `{{` and `}}` produce literal braces. A `{` that does not start a valid
//! placeholder is copied as-is. Automatic and manual indexing cannot be mixed
//! in one template.
//!
//! The specifier grammar is `[[fill]align][sign]['#']['0'][width]['.' precision][type]`
//! with align one of `<`, `>`, `^`, sign one of `+`, `-`, ` `, and type one of
//! `d x X o b B f F e E s c`.
//!
//! ```
//! use rust_log_engine::core::template::format_message;
//!
//! let text = format_message("{1} {0}..", &[&"too", &"supported"]).unwrap();
//! assert_eq!(text, "supported too..");
//!
//! let text = format_message("int: {0:d}; hex: {0:x}; oct: {0:o}; bin: {0:b}", &[&42]).unwrap();
//! assert_eq!(text, "int: 42; hex: 2a; oct: 52; bin: 101010");
//! ```

use super::error::{LoggerError, Result};
use std::borrow::Cow;
use std::fmt::{self, Write as _};

/// A typed view of one argument, as seen by the formatter
#[derive(Clone, Copy)]
pub enum Arg<'a> {
    Int(i128),
    UInt(u128),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(&'a str),
    /// Anything else that knows how to render itself as text
    Display(&'a dyn fmt::Display),
}

impl<'a> Arg<'a> {
    /// Wrap any `Display` value
    pub fn display<T: fmt::Display>(value: &'a T) -> Self {
        Arg::Display(value)
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(v) => write!(f, "Int({v})"),
            Arg::UInt(v) => write!(f, "UInt({v})"),
            Arg::Float(v) => write!(f, "Float({v})"),
            Arg::Bool(v) => write!(f, "Bool({v})"),
            Arg::Char(v) => write!(f, "Char({v:?})"),
            Arg::Str(v) => write!(f, "Str({v:?})"),
            Arg::Display(v) => write!(f, "Display({v})"),
        }
    }
}

/// Conversion of a value into a formatter argument.
///
/// This is the extension point for user types. Types implementing `Display`
/// usually forward to [`Arg::display`]:
///
/// ```
/// use rust_log_engine::core::template::{format_message, Arg, FormatArg};
/// use std::fmt;
///
/// struct SomeClass;
///
/// impl fmt::Display for SomeClass {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         f.write_str("some_class")
///     }
/// }
///
/// impl FormatArg for SomeClass {
///     fn as_arg(&self) -> Arg<'_> {
///         Arg::display(self)
///     }
/// }
///
/// let text = format_message("custom class: {}..", &[&SomeClass]).unwrap();
/// assert_eq!(text, "custom class: some_class..");
/// ```
pub trait FormatArg {
    fn as_arg(&self) -> Arg<'_>;
}

macro_rules! impl_format_arg_signed {
    ($($t:ty),*) => {
        $(impl FormatArg for $t {
            fn as_arg(&self) -> Arg<'_> {
                Arg::Int(*self as i128)
            }
        })*
    };
}

macro_rules! impl_format_arg_unsigned {
    ($($t:ty),*) => {
        $(impl FormatArg for $t {
            fn as_arg(&self) -> Arg<'_> {
                Arg::UInt(*self as u128)
            }
        })*
    };
}

impl_format_arg_signed!(i8, i16, i32, i64, i128, isize);
impl_format_arg_unsigned!(u8, u16, u32, u64, u128, usize);

impl FormatArg for f32 {
    fn as_arg(&self) -> Arg<'_> {
        Arg::Float(f64::from(*self))
    }
}

impl FormatArg for f64 {
    fn as_arg(&self) -> Arg<'_> {
        Arg::Float(*self)
    }
}

impl FormatArg for bool {
    fn as_arg(&self) -> Arg<'_> {
        Arg::Bool(*self)
    }
}

impl FormatArg for char {
    fn as_arg(&self) -> Arg<'_> {
        Arg::Char(*self)
    }
}

impl FormatArg for str {
    fn as_arg(&self) -> Arg<'_> {
        Arg::Str(self)
    }
}

impl FormatArg for String {
    fn as_arg(&self) -> Arg<'_> {
        Arg::Str(self.as_str())
    }
}

impl FormatArg for Cow<'_, str> {
    fn as_arg(&self) -> Arg<'_> {
        Arg::Str(self.as_ref())
    }
}

impl<T: FormatArg + ?Sized> FormatArg for &T {
    fn as_arg(&self) -> Arg<'_> {
        (**self).as_arg()
    }
}

impl FormatArg for Arg<'_> {
    fn as_arg(&self) -> Arg<'_> {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sign {
    #[default]
    Minus,
    Plus,
    Space,
}

/// Parsed form of the text after `:` in a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSpec {
    pub fill: char,
    pub align: Option<Align>,
    pub sign: Sign,
    pub alternate: bool,
    pub zero_pad: bool,
    pub width: usize,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            sign: Sign::Minus,
            alternate: false,
            zero_pad: false,
            width: 0,
            precision: None,
            kind: None,
        }
    }
}

fn align_of(c: char) -> Option<Align> {
    match c {
        '<' => Some(Align::Left),
        '>' => Some(Align::Right),
        '^' => Some(Align::Center),
        _ => None,
    }
}

/// Largest accepted width or precision
pub const MAX_SPEC_NUMBER: usize = 65_535;

fn read_number(chars: &[char], pos: &mut usize) -> std::result::Result<Option<usize>, String> {
    let start = *pos;
    while *pos < chars.len() && chars[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if start == *pos {
        return Ok(None);
    }
    let digits: String = chars[start..*pos].iter().collect();
    match digits.parse::<usize>() {
        Ok(n) if n <= MAX_SPEC_NUMBER => Ok(Some(n)),
        _ => Err(format!("number '{digits}' exceeds {MAX_SPEC_NUMBER}")),
    }
}

impl FormatSpec {
    /// Parse a specifier such as `>08.3f`
    pub fn parse(spec: &str) -> std::result::Result<Self, String> {
        let chars: Vec<char> = spec.chars().collect();
        let mut parsed = FormatSpec::default();
        let mut pos = 0;

        if chars.len() >= 2 && align_of(chars[1]).is_some() {
            parsed.fill = chars[0];
            parsed.align = align_of(chars[1]);
            pos = 2;
        } else if let Some(align) = chars.first().copied().and_then(align_of) {
            parsed.align = Some(align);
            pos = 1;
        }

        match chars.get(pos) {
            Some('+') => {
                parsed.sign = Sign::Plus;
                pos += 1;
            }
            Some('-') => pos += 1,
            Some(' ') => {
                parsed.sign = Sign::Space;
                pos += 1;
            }
            _ => {}
        }

        if chars.get(pos) == Some(&'#') {
            parsed.alternate = true;
            pos += 1;
        }

        if chars.get(pos) == Some(&'0') {
            parsed.zero_pad = true;
            pos += 1;
        }

        parsed.width = read_number(&chars, &mut pos)?.unwrap_or(0);

        if chars.get(pos) == Some(&'.') {
            pos += 1;
            match read_number(&chars, &mut pos)? {
                Some(precision) => parsed.precision = Some(precision),
                None => return Err("missing precision after '.'".to_string()),
            }
        }

        if let Some(&kind) = chars.get(pos) {
            if !"dxXobBfFeEsc".contains(kind) {
                return Err(format!("unknown format type '{kind}'"));
            }
            parsed.kind = Some(kind);
            pos += 1;
        }

        if pos != chars.len() {
            let rest: String = chars[pos..].iter().collect();
            return Err(format!("unexpected '{rest}' in format spec"));
        }

        Ok(parsed)
    }
}

struct Rendered {
    negative: bool,
    prefix: &'static str,
    body: String,
    numeric: bool,
}

fn render_integer(
    negative: bool,
    magnitude: u128,
    spec: &FormatSpec,
) -> std::result::Result<Rendered, String> {
    if spec.precision.is_some() {
        return Err("precision not allowed for integer arguments".to_string());
    }
    let (prefix, body) = match spec.kind {
        None | Some('d') => ("", magnitude.to_string()),
        Some('x') => ("0x", format!("{magnitude:x}")),
        Some('X') => ("0X", format!("{magnitude:X}")),
        Some('o') => ("0o", format!("{magnitude:o}")),
        Some('b') => ("0b", format!("{magnitude:b}")),
        Some('B') => ("0B", format!("{magnitude:b}")),
        Some('c') => {
            let c = u32::try_from(magnitude)
                .ok()
                .filter(|_| !negative)
                .and_then(char::from_u32)
                .ok_or_else(|| format!("{magnitude} is not a valid character"))?;
            return Ok(Rendered {
                negative: false,
                prefix: "",
                body: c.to_string(),
                numeric: false,
            });
        }
        Some(kind) => return Err(format!("format type '{kind}' not valid for integers")),
    };
    Ok(Rendered {
        negative,
        prefix: if spec.alternate { prefix } else { "" },
        body,
        numeric: true,
    })
}

fn render_float(value: f64, spec: &FormatSpec) -> std::result::Result<Rendered, String> {
    let negative = value.is_sign_negative() && !value.is_nan();
    let magnitude = value.abs();
    let body = match (spec.kind, spec.precision) {
        (None, None) => format!("{magnitude}"),
        (None, Some(p)) => format!("{magnitude:.p$}"),
        (Some('f'), p) => format!("{magnitude:.*}", p.unwrap_or(6)),
        (Some('F'), p) => format!("{magnitude:.*}", p.unwrap_or(6)).to_uppercase(),
        (Some('e'), None) => format!("{magnitude:e}"),
        (Some('e'), Some(p)) => format!("{magnitude:.p$e}"),
        (Some('E'), None) => format!("{magnitude:E}"),
        (Some('E'), Some(p)) => format!("{magnitude:.p$E}"),
        (Some(kind), _) => return Err(format!("format type '{kind}' not valid for floats")),
    };
    Ok(Rendered {
        negative,
        prefix: "",
        body,
        numeric: true,
    })
}

fn render_text(text: &str, spec: &FormatSpec) -> std::result::Result<Rendered, String> {
    match spec.kind {
        None | Some('s') => {}
        Some(kind) => return Err(format!("format type '{kind}' not valid for text")),
    }
    let body = match spec.precision {
        Some(max) => text.chars().take(max).collect(),
        None => text.to_string(),
    };
    Ok(Rendered {
        negative: false,
        prefix: "",
        body,
        numeric: false,
    })
}

fn render_arg(arg: Arg<'_>, spec: &FormatSpec) -> std::result::Result<Rendered, String> {
    match arg {
        Arg::Int(v) => match spec.kind {
            Some('f' | 'F' | 'e' | 'E') => render_float(v as f64, spec),
            _ => render_integer(v < 0, v.unsigned_abs(), spec),
        },
        Arg::UInt(v) => match spec.kind {
            Some('f' | 'F' | 'e' | 'E') => render_float(v as f64, spec),
            _ => render_integer(false, v, spec),
        },
        Arg::Float(v) => render_float(v, spec),
        Arg::Bool(v) => render_text(if v { "true" } else { "false" }, spec),
        Arg::Char(c) => match spec.kind {
            None | Some('c') | Some('s') => render_text(c.encode_utf8(&mut [0; 4]), spec),
            _ => render_integer(false, u128::from(u32::from(c)), spec),
        },
        Arg::Str(s) => render_text(s, spec),
        Arg::Display(d) => render_text(&d.to_string(), spec),
    }
}

fn push_fill(out: &mut String, fill: char, count: usize) {
    out.extend(std::iter::repeat(fill).take(count));
}

fn write_arg(out: &mut String, arg: Arg<'_>, spec: &FormatSpec) -> std::result::Result<(), String> {
    // Fast path for the common `{}` case
    if spec.width == 0 && spec.sign == Sign::Minus && spec.kind.is_none() && spec.precision.is_none() {
        match arg {
            Arg::Str(s) => {
                out.push_str(s);
                return Ok(());
            }
            Arg::Display(d) => {
                let _ = write!(out, "{d}");
                return Ok(());
            }
            _ => {}
        }
    }

    let rendered = render_arg(arg, spec)?;
    let sign = match (rendered.numeric, rendered.negative, spec.sign) {
        (true, true, _) => "-",
        (true, false, Sign::Plus) => "+",
        (true, false, Sign::Space) => " ",
        _ => "",
    };
    let len = sign.len() + rendered.prefix.len() + rendered.body.chars().count();
    let pad = spec.width.saturating_sub(len);

    if rendered.numeric && spec.zero_pad && spec.align.is_none() {
        out.push_str(sign);
        out.push_str(rendered.prefix);
        push_fill(out, '0', pad);
        out.push_str(&rendered.body);
        return Ok(());
    }

    let align = spec
        .align
        .unwrap_or(if rendered.numeric { Align::Right } else { Align::Left });
    let (left, right) = match align {
        Align::Left => (0, pad),
        Align::Right => (pad, 0),
        Align::Center => (pad / 2, pad - pad / 2),
    };
    push_fill(out, spec.fill, left);
    out.push_str(sign);
    out.push_str(rendered.prefix);
    out.push_str(&rendered.body);
    push_fill(out, spec.fill, right);
    Ok(())
}

/// Render `template` with `args`, appending to `out`
pub fn format_message_into(
    out: &mut String,
    template: &str,
    args: &[&dyn FormatArg],
) -> Result<()> {
    let mut rest = template;
    let mut next_implicit = 0usize;
    let mut used_implicit = false;
    let mut used_explicit = false;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if rest.as_bytes()[pos] == b'}' {
            out.push('}');
            rest = after.strip_prefix('}').unwrap_or(after);
            continue;
        }

        if let Some(stripped) = after.strip_prefix('{') {
            out.push('{');
            rest = stripped;
            continue;
        }

        let Some(end) = after.find('}') else {
            out.push_str(&rest[pos..]);
            rest = "";
            break;
        };

        let inner = &after[..end];
        let (index_part, spec_part) = match inner.split_once(':') {
            Some((index, spec)) => (index, Some(spec)),
            None => (inner, None),
        };

        if !index_part.bytes().all(|b| b.is_ascii_digit()) {
            out.push('{');
            rest = after;
            continue;
        }

        let index = if index_part.is_empty() {
            if used_explicit {
                return Err(LoggerError::format(
                    template,
                    "cannot mix automatic and manual argument indexing",
                ));
            }
            used_implicit = true;
            next_implicit += 1;
            next_implicit - 1
        } else {
            if used_implicit {
                return Err(LoggerError::format(
                    template,
                    "cannot mix automatic and manual argument indexing",
                ));
            }
            used_explicit = true;
            index_part.parse::<usize>().map_err(|_| {
                LoggerError::format(template, format!("invalid argument index '{index_part}'"))
            })?
        };

        let arg = args.get(index).ok_or_else(|| {
            LoggerError::format(
                template,
                format!(
                    "argument index {index} out of range ({} argument(s) supplied)",
                    args.len()
                ),
            )
        })?;

        let spec = match spec_part {
            Some(spec) => FormatSpec::parse(spec).map_err(|e| LoggerError::format(template, e))?,
            None => FormatSpec::default(),
        };

        write_arg(out, arg.as_arg(), &spec).map_err(|e| LoggerError::format(template, e))?;
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(())
}

/// Render `template` with `args` into a new string
pub fn format_message(template: &str, args: &[&dyn FormatArg]) -> Result<String> {
    let mut out = String::with_capacity(template.len() + args.len() * 8);
    format_message_into(&mut out, template, args)?;
    Ok(out)
}
