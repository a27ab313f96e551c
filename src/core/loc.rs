//! Line-based stream location.

use std::fmt;

/// 1-based line counter over a byte stream.
///
/// Advances by exactly one for every newline byte the reader consumes, whether
/// that byte belonged to a value, to skipped whitespace, or to a discarded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Loc(usize);

impl Loc {
    pub const START: Loc = Loc(1);

    #[must_use]
    pub fn new() -> Self {
        Self::START
    }

    #[must_use]
    pub fn line(self) -> usize {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 += 1;
    }

    /// Advance once per newline in `bytes`.
    pub fn advance_over(&mut self, bytes: &[u8]) {
        self.0 += bytes.iter().filter(|&&byte| byte == b'\n').count();
    }

    /// Render a raw line number the way [`Loc`] displays itself.
    #[must_use]
    pub fn fmt_line(line: usize) -> String {
        format!("line {line}")
    }
}

impl Default for Loc {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}

impl From<Loc> for usize {
    fn from(loc: Loc) -> Self {
        loc.0
    }
}

#[cfg(test)]
mod tests {
    use super::Loc;

    #[test]
    fn starts_at_line_one() {
        assert_eq!(Loc::new().line(), 1);
        assert_eq!(Loc::default(), Loc::START);
    }

    #[test]
    fn advance_over_counts_only_newlines() {
        let mut loc = Loc::new();
        loc.advance_over(b"{}\n  \n\r\n");
        assert_eq!(loc.line(), 4);
        loc.advance_over(b"no newline");
        assert_eq!(loc.line(), 4);
    }

    #[test]
    fn display_matches_fmt_line() {
        let mut loc = Loc::new();
        loc.advance();
        assert_eq!(loc.to_string(), "line 2");
        assert_eq!(Loc::fmt_line(2), loc.to_string());
    }
}
