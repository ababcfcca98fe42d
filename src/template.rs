//! printf-style access log templates.
//!
//! Two flavours are supported:
//! - named templates (`%(h)s %(r)s`), filled from a [`SafeAtoms`] lookup
//! - positional templates (`%s %s`), filled from a list of values in order
//!
//! Named directives accept the usual `-`/`0` flags, a width, a precision
//! and the `s`, `r`, `a`, `d` or `i` conversion. `%%` is a literal percent
//! sign. `r` quotes the value and `a` additionally escapes non-ASCII
//! characters.

use crate::atoms::SafeAtoms;
use crate::error::FormatError;

/// Upper bound for a field width or precision.
pub const MAX_WIDTH: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Conversion {
    #[default]
    Str,
    Repr,
    Ascii,
    Int,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Spec {
    left: bool,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conversion: Conversion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Atom { key: String, spec: Spec },
}

/// A parsed named template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(format: &str) -> Result<Self, FormatError> {
        let chars: Vec<(usize, char)> = format.char_indices().collect();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            let (offset, c) = chars[i];
            i += 1;
            if c != '%' {
                literal.push(c);
                continue;
            }

            let next = match chars.get(i) {
                Some(&(_, next)) => next,
                None => return Err(FormatError::Incomplete { offset }),
            };
            if next == '%' {
                literal.push('%');
                i += 1;
                continue;
            }
            if next != '(' {
                return Err(if "sdirf0123456789-+ #.".contains(next) {
                    FormatError::PositionalDirective { offset }
                } else {
                    FormatError::UnsupportedConversion {
                        ch: next,
                        offset: offset + 1,
                    }
                });
            }
            i += 1;

            let key = parse_key(&chars, &mut i, offset)?;
            let spec = parse_spec(&chars, &mut i, offset)?;

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Atom { key, spec });
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Template { segments })
    }

    /// Atom names referenced by this template, in order of appearance.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Atom { key, .. } => Some(key.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, atoms: &SafeAtoms) -> Result<String, FormatError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Atom { key, spec } => out.push_str(&format_atom(key, atoms.get(key), spec)?),
            }
        }
        Ok(out)
    }
}

/// Parse `format` and fill it from `atoms` in one step.
pub fn substitute(format: &str, atoms: &SafeAtoms) -> Result<String, FormatError> {
    Template::parse(format)?.render(atoms)
}

fn parse_key(chars: &[(usize, char)], i: &mut usize, offset: usize) -> Result<String, FormatError> {
    let mut key = String::new();
    let mut depth = 1;
    loop {
        let (_, ch) = *chars
            .get(*i)
            .ok_or(FormatError::UnterminatedKey { offset })?;
        *i += 1;
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(key);
                }
            }
            _ => {}
        }
        key.push(ch);
    }
}

fn parse_spec(chars: &[(usize, char)], i: &mut usize, offset: usize) -> Result<Spec, FormatError> {
    let mut spec = Spec::default();

    while let Some(&(_, ch)) = chars.get(*i) {
        match ch {
            '-' => spec.left = true,
            '0' => spec.zero = true,
            ' ' | '+' | '#' => {}
            _ => break,
        }
        *i += 1;
    }

    spec.width = parse_bounded(chars, i)?;
    if matches!(chars.get(*i), Some(&(_, '.'))) {
        *i += 1;
        spec.precision = Some(parse_bounded(chars, i)?.unwrap_or(0));
    }

    let (conv_offset, conv) = *chars.get(*i).ok_or(FormatError::Incomplete { offset })?;
    *i += 1;
    spec.conversion = match conv {
        's' => Conversion::Str,
        'r' => Conversion::Repr,
        'a' => Conversion::Ascii,
        'd' | 'i' => Conversion::Int,
        ch => {
            return Err(FormatError::UnsupportedConversion {
                ch,
                offset: conv_offset,
            })
        }
    };
    Ok(spec)
}

/// Read a width or precision, rejecting values above [`MAX_WIDTH`].
fn parse_bounded(chars: &[(usize, char)], i: &mut usize) -> Result<Option<usize>, FormatError> {
    let start = chars.get(*i).map_or(0, |&(offset, _)| offset);
    match parse_number(chars, i) {
        Some(value) if value > MAX_WIDTH => Err(FormatError::WidthTooLarge { offset: start }),
        value => Ok(value),
    }
}

fn parse_number(chars: &[(usize, char)], i: &mut usize) -> Option<usize> {
    let mut value: Option<usize> = None;
    while let Some(&(_, ch)) = chars.get(*i) {
        let Some(digit) = ch.to_digit(10) else { break };
        value = Some(value.unwrap_or(0).saturating_mul(10).saturating_add(digit as usize));
        *i += 1;
    }
    value
}

fn format_atom(key: &str, value: &str, spec: &Spec) -> Result<String, FormatError> {
    match spec.conversion {
        Conversion::Str => Ok(pad(truncate(value, spec), spec)),
        Conversion::Repr => Ok(pad(truncate(&quote(value, false), spec), spec)),
        Conversion::Ascii => Ok(pad(truncate(&quote(value, true), spec), spec)),
        Conversion::Int => {
            let number: i64 = value.trim().parse().map_err(|_| FormatError::NotANumber {
                key: key.to_string(),
                value: value.to_string(),
            })?;
            match spec.width {
                Some(width) if spec.zero && !spec.left => Ok(zero_pad(number, width)),
                _ => Ok(pad(number.to_string(), spec)),
            }
        }
    }
}

fn truncate(value: &str, spec: &Spec) -> String {
    match spec.precision {
        Some(p) => value.chars().take(p).collect(),
        None => value.to_string(),
    }
}

/// Quote `value` the way a repr of a string reads: single quotes unless the
/// value contains a single quote and no double quote.
fn quote(value: &str, ascii_only: bool) -> String {
    let delim = if value.contains('\'') && !value.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(delim);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c if ascii_only && !c.is_ascii() => {
                let code = c as u32;
                if code <= 0xff {
                    out.push_str(&format!("\\x{:02x}", code));
                } else if code <= 0xffff {
                    out.push_str(&format!("\\u{:04x}", code));
                } else {
                    out.push_str(&format!("\\U{:08x}", code));
                }
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

fn zero_pad(number: i64, width: usize) -> String {
    let digits = number.unsigned_abs().to_string();
    let sign = if number < 0 { "-" } else { "" };
    let fill = width.saturating_sub(sign.len() + digits.len());
    format!("{}{}{}", sign, "0".repeat(fill), digits)
}

fn pad(text: String, spec: &Spec) -> String {
    let Some(width) = spec.width else { return text };
    let len = text.chars().count();
    if len >= width {
        return text;
    }
    let fill = " ".repeat(width - len);
    if spec.left {
        text + &fill
    } else {
        fill + &text
    }
}

/// Escape `%` so `text` renders verbatim inside a positional template.
pub fn escape_literal(text: &str) -> String {
    text.replace('%', "%%")
}

/// Fill the `%s` slots of a positional template with `values`, in order.
/// The number of slots and values must match.
pub fn render_positional<S: AsRef<str>>(template: &str, values: &[S]) -> Result<String, FormatError> {
    let mut pieces: Vec<Option<&str>> = Vec::new();
    let mut literal_start = 0;
    let mut slots = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c != '%' {
            continue;
        }
        pieces.push(Some(&template[literal_start..offset]));
        match chars.next() {
            Some((_, '%')) => pieces.push(Some("%")),
            Some((_, 's')) => {
                pieces.push(None);
                slots += 1;
            }
            Some((at, ch)) => return Err(FormatError::UnsupportedConversion { ch, offset: at }),
            None => return Err(FormatError::Incomplete { offset }),
        }
        literal_start = chars.peek().map_or(template.len(), |&(next, _)| next);
    }
    pieces.push(Some(&template[literal_start..]));

    if slots != values.len() {
        return Err(FormatError::ArgumentCount {
            expected: slots,
            got: values.len(),
        });
    }

    let mut values = values.iter();
    let mut out = String::with_capacity(template.len());
    for piece in pieces {
        match piece {
            Some(text) => out.push_str(text),
            None => {
                if let Some(value) = values.next() {
                    out.push_str(value.as_ref());
                }
            }
        }
    }
    Ok(out)
}
