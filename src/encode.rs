//! Text encoding rules shared by the dev handler: when a value needs quotes,
//! how a quoted literal is escaped, and how floats are printed.

use crate::buffer::Buffer;
use crate::color::ESC;
use std::borrow::Cow;
use std::fmt;

/// Placeholder prefix for a value whose encoder failed.
pub const ENCODE_FAILURE_MARKER: &str = "!PANIC: ";

/// Format `args` into a new string. A `Display` or `Debug` impl that
/// returns an error yields `Err` instead of a panic.
pub fn try_format(args: fmt::Arguments<'_>) -> Result<String, fmt::Error> {
    let mut out = String::new();
    fmt::write(&mut out, args)?;
    Ok(out)
}

/// [`try_format`], with a failure replaced by `!PANIC: formatting error`.
pub fn format_or_marker(args: fmt::Arguments<'_>) -> String {
    try_format(args).unwrap_or_else(|_| format!("{}formatting error", ENCODE_FAILURE_MARKER))
}

/// ASCII bytes that may appear in an unquoted value.
///
/// Space and `=` are listed as safe here but are checked separately by
/// [`needs_quoting`]. ESC is safe so colored text is not quoted for its
/// escape codes alone.
static SAFE_SET: [bool; 128] = build_safe_set();

const fn build_safe_set() -> [bool; 128] {
    let mut set = [false; 128];
    let mut b = 0x20;
    while b < 0x80 {
        set[b] = true;
        b += 1;
    }
    set[b'"' as usize] = false;
    set[b'\\' as usize] = false;
    set[0x1b] = true;
    set
}

/// Whether `s` must be rendered as a quoted literal.
///
/// Quoting is required for the empty string, for a space or `=`, for any
/// ASCII byte outside the safe set other than a backslash, for the
/// replacement character U+FFFD, and for any non-printable or whitespace
/// code point.
pub fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    for c in s.chars() {
        if c.is_ascii() {
            let b = c as u8;
            if b != b'\\' && (b == b' ' || b == b'=' || !SAFE_SET[b as usize]) {
                return true;
            }
            continue;
        }
        if c == char::REPLACEMENT_CHARACTER || c.is_whitespace() || !is_print(c) {
            return true;
        }
    }
    false
}

/// Approximation of "graphic or ASCII space" for code points outside ASCII.
///
/// Controls, whitespace other than space, format characters, private use
/// areas and noncharacters are rejected. Code points that are simply
/// unassigned are not recognized and count as printable, so they are
/// neither quoted nor escaped.
pub fn is_print(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(c as u32,
        0x00AD
        | 0x0600..=0x0605
        | 0x061C
        | 0x06DD
        | 0x070F
        | 0x180E
        | 0x200B..=0x200F
        | 0x202A..=0x202E
        | 0x2060..=0x2064
        | 0x2066..=0x206F
        | 0xE000..=0xF8FF
        | 0xFEFF
        | 0xFFF9..=0xFFFB
        | 0xFFFE..=0xFFFF
        | 0xE0001
        | 0xE0020..=0xE007F
        | 0xF0000..=0x10FFFF)
}

/// Remove ANSI escape runs: an ESC starts a run that ends with the next
/// alphabetic character, both included.
pub fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains(ESC) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        if c == ESC {
            in_escape = true;
        } else if in_escape {
            if c.is_alphabetic() {
                in_escape = false;
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Append `s`, quoting it when `quote` is set and the content requires it.
///
/// With `color` set, ESC bytes are kept literal inside a quoted literal so
/// embedded color codes stay live. Without it, escape runs are removed
/// before the quoting decision is made.
pub fn append_string(buf: &mut Buffer, s: &str, quote: bool, color: bool) {
    let s = if quote && !color {
        strip_ansi(s)
    } else {
        Cow::Borrowed(s)
    };
    if quote && needs_quoting(&s) {
        append_quoted(buf, &s, color);
    } else {
        buf.write_str(&s);
    }
}

/// Append `s` as a double-quoted literal with Go-style escapes.
pub fn append_quoted(buf: &mut Buffer, s: &str, keep_esc: bool) {
    buf.write_byte(b'"');
    for c in s.chars() {
        match c {
            '"' => buf.write_str("\\\""),
            '\\' => buf.write_str("\\\\"),
            ESC if keep_esc => buf.write_char(ESC),
            c if is_print(c) => buf.write_char(c),
            '\x07' => buf.write_str("\\a"),
            '\x08' => buf.write_str("\\b"),
            '\x0c' => buf.write_str("\\f"),
            '\n' => buf.write_str("\\n"),
            '\r' => buf.write_str("\\r"),
            '\t' => buf.write_str("\\t"),
            '\x0b' => buf.write_str("\\v"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                buf.write_display(format_args!("\\x{:02x}", c as u32))
            }
            c if (c as u32) < 0x10000 => buf.write_display(format_args!("\\u{:04x}", c as u32)),
            c => buf.write_display(format_args!("\\U{:08x}", c as u32)),
        }
    }
    buf.write_byte(b'"');
}

/// Shortest round-trippable float text, switching to exponent form for
/// exponents below -4 or at least 6 (`%g` rules).
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if v == 0.0 {
        return v.to_string();
    }
    let sci = format!("{:e}", v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return v.to_string(),
    };
    if (-4..6).contains(&exp) {
        return v.to_string();
    }
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exp.abs())
}
