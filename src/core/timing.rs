//! Timing trace entries carried in the `timing` field of I/O records.
//!
//! A trace is a run of entries, each a marker character followed by a decimal
//! count:
//!
//! ```text
//! +N  N milliseconds since the previous write
//! <N  N input characters from "in_txt"
//! [N  N input bytes from "in_bin"
//! >N  N output characters from "out_txt"
//! ]N  N output bytes from "out_bin"
//! ```

use std::fmt;

use crate::core::json::digits;
use crate::error::TimingError;

/// One of the four data runs of an I/O record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Run {
    InTxt,
    InBin,
    OutTxt,
    OutBin,
}

impl Run {
    pub const ALL: [Run; 4] = [Run::InTxt, Run::InBin, Run::OutTxt, Run::OutBin];

    #[must_use]
    pub fn new(output: bool, binary: bool) -> Self {
        match (output, binary) {
            (false, false) => Run::InTxt,
            (false, true) => Run::InBin,
            (true, false) => Run::OutTxt,
            (true, true) => Run::OutBin,
        }
    }

    #[must_use]
    pub fn is_output(self) -> bool {
        matches!(self, Run::OutTxt | Run::OutBin)
    }

    #[must_use]
    pub fn is_binary(self) -> bool {
        matches!(self, Run::InBin | Run::OutBin)
    }

    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Run::InTxt => '<',
            Run::InBin => '[',
            Run::OutTxt => '>',
            Run::OutBin => ']',
        }
    }

    #[must_use]
    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '<' => Some(Run::InTxt),
            '[' => Some(Run::InBin),
            '>' => Some(Run::OutTxt),
            ']' => Some(Run::OutBin),
            _ => None,
        }
    }

    /// Record field name holding this run.
    #[must_use]
    pub fn field(self) -> &'static str {
        match self {
            Run::InTxt => "in_txt",
            Run::InBin => "in_bin",
            Run::OutTxt => "out_txt",
            Run::OutBin => "out_bin",
        }
    }
}

pub const DELAY_MARKER: char = '+';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingEntry {
    /// Milliseconds elapsed since the previous write.
    Delay(u64),
    /// Characters (text runs) or bytes (binary runs) contributed to a run.
    Data(Run, u64),
}

impl TimingEntry {
    #[must_use]
    pub fn rendered_len(&self) -> usize {
        match *self {
            TimingEntry::Delay(ms) => 1 + digits(ms),
            TimingEntry::Data(_, count) => 1 + digits(count),
        }
    }
}

impl fmt::Display for TimingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            TimingEntry::Delay(ms) => write!(f, "{DELAY_MARKER}{ms}"),
            TimingEntry::Data(run, count) => write!(f, "{}{count}", run.marker()),
        }
    }
}

/// Parse a complete timing trace.
pub fn parse(timing: &str) -> Result<Vec<TimingEntry>, TimingError> {
    let bytes = timing.as_bytes();
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let marker = bytes[offset] as char;
        let run = if marker == DELAY_MARKER {
            None
        } else {
            Some(
                Run::from_marker(marker)
                    .ok_or(TimingError::UnknownMarker { offset, marker })?,
            )
        };

        let start = offset + 1;
        let mut end = start;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        if end == start {
            return Err(TimingError::MissingCount { offset });
        }
        let count = timing[start..end]
            .parse::<u64>()
            .map_err(|_| TimingError::CountOverflow { offset })?;

        entries.push(match run {
            None => TimingEntry::Delay(count),
            Some(run) => TimingEntry::Data(run, count),
        });
        offset = end;
    }

    Ok(entries)
}
