//! Bounded accumulation of terminal input/output for one I/O record.
//!
//! Invariant: the rendered size of the four runs plus the timing trace (its
//! open last entry included) never exceeds the configured size. Writes that do
//! not fit are handed back to the caller, which must flush and retry.

use std::time::Duration;

use crate::core::json::{digits, escaped_len, push_escaped};
use crate::core::timing::{Run, TimingEntry};
use crate::error::SinkError;

/// Smallest accepted accumulator size.
pub const IO_SIZE_MIN: usize = 64;

/// Longest incomplete UTF-8 prefix a direction can hold back.
const HELD_MAX: usize = 3;

#[derive(Debug, Clone, Copy)]
enum Unit {
    Char(char, usize),
    Invalid,
    Incomplete,
}

fn classify(bytes: &[u8]) -> Unit {
    let head = &bytes[..bytes.len().min(4)];
    let valid = match std::str::from_utf8(head) {
        Ok(text) => text,
        Err(err) if err.valid_up_to() > 0 => match std::str::from_utf8(&head[..err.valid_up_to()]) {
            Ok(text) => text,
            Err(_) => return Unit::Invalid,
        },
        Err(err) => {
            return match err.error_len() {
                None => Unit::Incomplete,
                Some(_) => Unit::Invalid,
            }
        }
    };
    match valid.chars().next() {
        Some(ch) => Unit::Char(ch, ch.len_utf8()),
        None => Unit::Incomplete,
    }
}

fn bin_cost(run: &str, bytes: &[u8]) -> usize {
    let separators = if run.is_empty() {
        bytes.len().saturating_sub(1)
    } else {
        bytes.len()
    };
    separators
        + bytes
            .iter()
            .map(|&byte| digits(u64::from(byte)))
            .sum::<usize>()
}

fn whole_ms(timestamp: Duration) -> u64 {
    u64::try_from(timestamp.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug)]
struct Direction {
    txt: String,
    bin: String,
    held: Vec<u8>,
    held_since: Option<Duration>,
}

impl Direction {
    fn with_size(size: usize) -> Result<Self, SinkError> {
        let mut txt = String::new();
        txt.try_reserve_exact(size)
            .map_err(|source| SinkError::alloc("text run", source))?;
        let mut bin = String::new();
        bin.try_reserve_exact(size)
            .map_err(|source| SinkError::alloc("binary run", source))?;
        Ok(Self {
            txt,
            bin,
            held: Vec::with_capacity(HELD_MAX + 1),
            held_since: None,
        })
    }

    fn run(&self, binary: bool) -> &str {
        if binary {
            &self.bin
        } else {
            &self.txt
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Piece<'a> {
    Char(char),
    Bytes(&'a [u8]),
}

/// Accumulates input and output bytes with their timing.
#[derive(Debug)]
pub struct IoAccumulator {
    size: usize,
    input: Direction,
    output: Direction,
    timing: String,
    open: Option<TimingEntry>,
    first: Option<Duration>,
    last_ms: Option<u64>,
}

impl IoAccumulator {
    pub fn new(size: usize) -> Result<Self, SinkError> {
        if size < IO_SIZE_MIN {
            return Err(SinkError::IoSizeTooSmall {
                size,
                min: IO_SIZE_MIN,
            });
        }
        let mut timing = String::new();
        timing
            .try_reserve_exact(size)
            .map_err(|source| SinkError::alloc("timing trace", source))?;
        Ok(Self {
            size,
            input: Direction::with_size(size)?,
            output: Direction::with_size(size)?,
            timing,
            open: None,
            first: None,
            last_ms: None,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Rendered bytes currently occupied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timing.len()
            + self.open.map_or(0, |entry| entry.rendered_len())
            + self.input.txt.len()
            + self.input.bin.len()
            + self.output.txt.len()
            + self.output.bin.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Timestamp of the earliest byte currently held.
    #[must_use]
    pub fn first(&self) -> Option<Duration> {
        self.first
    }

    /// Timing trace; complete only after [`IoAccumulator::flush`].
    #[must_use]
    pub fn timing(&self) -> &str {
        &self.timing
    }

    #[must_use]
    pub fn run(&self, run: Run) -> &str {
        self.direction(run.is_output()).run(run.is_binary())
    }

    /// Whether an incomplete character is held back in either direction.
    #[must_use]
    pub fn has_held(&self) -> bool {
        !self.input.held.is_empty() || !self.output.held.is_empty()
    }

    /// Accumulate `data`, returning the part that did not fit.
    pub fn write<'a>(&mut self, timestamp: Duration, output: bool, data: &'a [u8]) -> &'a [u8] {
        let mut rest = data;
        let mut stamped = false;

        // A prefix held by the other direction predates this write.
        if !rest.is_empty() && !self.commit_held(!output) {
            return rest;
        }

        if !rest.is_empty() && !self.direction(output).held.is_empty() {
            let held = self.direction(output).held.clone();
            let take = rest.len().min(4 - held.len());
            let mut joined = held.clone();
            joined.extend_from_slice(&rest[..take]);

            match classify(&joined) {
                Unit::Char(ch, len) => {
                    if !self.commit(timestamp, Run::new(output, false), Piece::Char(ch), &mut stamped)
                    {
                        return rest;
                    }
                    self.release_held(output);
                    rest = &rest[len - held.len()..];
                }
                Unit::Incomplete => {
                    let direction = self.direction_mut(output);
                    direction.held.extend_from_slice(rest);
                    // Stamped with the latest write that added to it.
                    direction.held_since = Some(timestamp);
                    return &[];
                }
                Unit::Invalid => {
                    if !self.commit_held(output) {
                        return rest;
                    }
                }
            }
        }

        while !rest.is_empty() {
            match classify(rest) {
                Unit::Char(ch, len) => {
                    if !self.commit(timestamp, Run::new(output, false), Piece::Char(ch), &mut stamped)
                    {
                        break;
                    }
                    rest = &rest[len..];
                }
                Unit::Invalid => {
                    if !self.commit(
                        timestamp,
                        Run::new(output, true),
                        Piece::Bytes(&rest[..1]),
                        &mut stamped,
                    ) {
                        break;
                    }
                    rest = &rest[1..];
                }
                Unit::Incomplete => {
                    let direction = self.direction_mut(output);
                    direction.held.extend_from_slice(rest);
                    direction.held_since = Some(timestamp);
                    rest = &[];
                }
            }
        }

        if !rest.is_empty() {
            tracing::trace!(
                handed_back = rest.len(),
                used = self.len(),
                size = self.size,
                "I/O accumulator full"
            );
        }
        rest
    }

    /// Move held-back incomplete characters into the binary runs so the
    /// current position becomes a safe record boundary.
    ///
    /// Returns `false` when they do not fit; flush and retry.
    pub fn cut(&mut self) -> bool {
        self.commit_held(false) && self.commit_held(true)
    }

    /// Close the open timing entry so the trace is complete.
    pub fn flush(&mut self) {
        if let Some(entry) = self.open.take() {
            self.timing.push_str(&entry.to_string());
        }
    }

    /// Drop accumulated data, keeping allocations and held-back prefixes.
    pub fn empty(&mut self) {
        for direction in [&mut self.input, &mut self.output] {
            direction.txt.clear();
            direction.bin.clear();
        }
        self.timing.clear();
        self.open = None;
        self.first = None;
        self.last_ms = None;
    }

    fn direction(&self, output: bool) -> &Direction {
        if output {
            &self.output
        } else {
            &self.input
        }
    }

    fn direction_mut(&mut self, output: bool) -> &mut Direction {
        if output {
            &mut self.output
        } else {
            &mut self.input
        }
    }

    fn release_held(&mut self, output: bool) {
        let direction = self.direction_mut(output);
        direction.held.clear();
        direction.held_since = None;
    }

    fn commit_held(&mut self, output: bool) -> bool {
        let direction = self.direction(output);
        if direction.held.is_empty() {
            return true;
        }
        let held = direction.held.clone();
        let since = direction.held_since.unwrap_or_default();
        let mut stamped = false;
        if !self.commit(since, Run::new(output, true), Piece::Bytes(&held), &mut stamped) {
            return false;
        }
        self.release_held(output);
        true
    }

    fn delay_to(&self, timestamp: Duration) -> Option<TimingEntry> {
        let last = self.last_ms?;
        let ms = whole_ms(timestamp).saturating_sub(last);
        (ms > 0).then_some(TimingEntry::Delay(ms))
    }

    /// Append `piece` to `run` if it fits, stamping the write's delay first.
    fn commit(&mut self, timestamp: Duration, run: Run, piece: Piece<'_>, stamped: &mut bool) -> bool {
        let delay = if *stamped {
            None
        } else {
            self.delay_to(timestamp)
        };
        let (units, data_cost) = match piece {
            Piece::Char(ch) => (1, escaped_len(ch)),
            Piece::Bytes(bytes) => (bytes.len() as u64, bin_cost(self.run(run), bytes)),
        };

        let merges = delay.is_none()
            && matches!(self.open, Some(TimingEntry::Data(open_run, _)) if open_run == run);
        let (entry, timing_cost) = match self.open {
            Some(open @ TimingEntry::Data(_, count)) if merges => {
                let entry = TimingEntry::Data(run, count + units);
                (entry, entry.rendered_len() - open.rendered_len())
            }
            _ => {
                let entry = TimingEntry::Data(run, units);
                let delay_cost = delay.map_or(0, |delay| delay.rendered_len());
                (entry, delay_cost + entry.rendered_len())
            }
        };

        if self.len() + timing_cost + data_cost > self.size {
            return false;
        }

        if !merges {
            self.flush();
            if let Some(delay) = delay {
                self.timing.push_str(&delay.to_string());
            }
        }
        self.open = Some(entry);

        let direction = self.direction_mut(run.is_output());
        match piece {
            Piece::Char(ch) => push_escaped(&mut direction.txt, ch),
            Piece::Bytes(bytes) => {
                for &byte in bytes {
                    if !direction.bin.is_empty() {
                        direction.bin.push(',');
                    }
                    direction.bin.push_str(&byte.to_string());
                }
            }
        }

        self.first.get_or_insert(timestamp);
        let ms = whole_ms(timestamp);
        self.last_ms = Some(self.last_ms.map_or(ms, |last| last.max(ms)));
        *stamped = true;
        true
    }
}
