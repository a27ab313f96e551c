use std::collections::TryReserveError;
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: io::Error,
    },
}

impl WriterError {
    #[must_use]
    pub fn io(operation: &'static str, source: io::Error) -> Self {
        Self::Io { operation, source }
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O buffer size {size} is below the minimum of {min} bytes")]
    IoSizeTooSmall { size: usize, min: usize },

    #[error("failed to allocate {what}: {source}")]
    Alloc {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },

    #[error("{kind} record does not fit the {capacity}-byte message buffer")]
    OutOfSpace { kind: &'static str, capacity: usize },

    #[error(transparent)]
    Writer(#[from] WriterError),
}

impl SinkError {
    #[must_use]
    pub fn alloc(what: &'static str, source: TryReserveError) -> Self {
        Self::Alloc { what, source }
    }
}

/// Failure reported by a [`crate::reader::Tokenizer`], surfaced unchanged by readers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("value is incomplete")]
    Incomplete,

    #[error("nesting depth exceeds the limit of {limit}")]
    Depth { limit: usize },

    #[error("syntax error at column {column}: {message}")]
    Syntax { column: usize, message: String },
}

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("I/O error while reading line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("incomplete value on line {line}")]
    IncompleteLine { line: usize },

    #[error("line {line} exceeds the {limit}-byte line limit")]
    LineTooLong { line: usize, limit: usize },

    #[error("failed to parse value on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: TokenError,
    },
}

impl ReaderError {
    /// Line the failure was detected on.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::Io { line, .. }
            | Self::IncompleteLine { line }
            | Self::LineTooLong { line, .. }
            | Self::Parse { line, .. } => *line,
        }
    }

    /// Tokenizer failure behind a parse error, if any.
    #[must_use]
    pub fn token_error(&self) -> Option<&TokenError> {
        match self {
            Self::Parse { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether the next read can continue past this failure.
    ///
    /// Parse and line failures only cost the offending line. I/O errors are
    /// only as recoverable as the underlying source.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimingError {
    #[error("unknown timing marker {marker:?} at offset {offset}")]
    UnknownMarker { offset: usize, marker: char },

    #[error("timing entry at offset {offset} has no count")]
    MissingCount { offset: usize },

    #[error("timing entry at offset {offset} has an out-of-range count")]
    CountOverflow { offset: usize },
}

/// An I/O record whose timing trace disagrees with its data runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("invalid timing trace: {0}")]
    Timing(#[from] TimingError),

    #[error("timing trace overruns \"{run}\"")]
    Overrun { run: &'static str },

    #[error("\"{run}\" holds data the timing trace does not account for")]
    Leftover { run: &'static str },

    #[error("timing trace delays overflow the record timeline")]
    DelayOverflow,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error("record on line {line} is malformed: {source}")]
    Schema {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("record on line {line}: message id {found} is out of order, expected at least {expected}")]
    IdOutOfOrder {
        line: usize,
        expected: u64,
        found: u64,
    },

    #[error("record on line {line} cannot be replayed: {source}")]
    Record {
        line: usize,
        #[source]
        source: RecordError,
    },
}
