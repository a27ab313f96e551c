//! JSON string escaping with exact size accounting.

use std::fmt;

/// Number of bytes `ch` occupies once escaped inside a JSON string.
#[must_use]
pub fn escaped_len(ch: char) -> usize {
    match ch {
        '"' | '\\' | '\u{8}' | '\u{c}' | '\n' | '\r' | '\t' => 2,
        '\0'..='\u{1f}' => 6,
        _ => ch.len_utf8(),
    }
}

pub fn push_escaped(out: &mut String, ch: char) {
    match ch {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\u{8}' => out.push_str("\\b"),
        '\u{c}' => out.push_str("\\f"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\0'..='\u{1f}' => out.push_str(&format!("\\u{:04x}", ch as u32)),
        _ => out.push(ch),
    }
}

/// Write `value` escaped, without surrounding quotes.
pub fn write_escaped<W: fmt::Write>(out: &mut W, value: &str) -> fmt::Result {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        push_escaped(&mut escaped, ch);
    }
    out.write_str(&escaped)
}

/// Decimal digit count of `value`.
#[must_use]
pub fn digits(value: u64) -> usize {
    let mut count = 1;
    let mut rest = value / 10;
    while rest > 0 {
        count += 1;
        rest /= 10;
    }
    count
}
