//! Terminal session logging.
//!
//! Invariant: a record reaches the [`Writer`] whole or not at all.
//!
//! # Public API Overview
//! - Encode a session's window changes and terminal I/O into JSON records with [`Sink`].
//! - Deliver records to a file descriptor, syslog, or any [`std::io::Write`] via the
//!   [`Writer`] implementations.
//! - Read records back one value at a time with [`LineReader`], tolerating malformed lines.
//! - Decode records into typed [`Record`]s and replay them as [`Packet`]s with [`Source`].

#![allow(
    clippy::derivable_impls,
    clippy::needless_range_loop,
    clippy::question_mark,
    clippy::too_many_arguments,
    clippy::type_complexity,
    clippy::unnecessary_map_or,
    clippy::write_with_newline
)]

pub mod config;
pub mod error;
pub mod logging;

pub mod core;
pub mod platform;
pub mod reader;
pub mod schema;
pub mod sink;
pub mod source;
pub mod writer;

/// Runtime configuration.
pub use crate::config::LogConfig;

/// Error types.
pub use crate::error::{
    ReaderError, RecordError, SinkError, SourceError, TimingError, TokenError, WriterError,
};

/// Record encoding.
pub use crate::core::accumulator::IO_SIZE_MIN;
pub use crate::sink::{Pos, Sink};

/// Record delivery.
#[cfg(unix)]
pub use crate::platform::{FdWriter, SyslogWriter};
pub use crate::writer::{IoWriter, Writer};

/// Record reading and replay.
pub use crate::reader::{JsonTokenizer, LineReader, Reader, Tokenizer};
pub use crate::schema::{IoChunk, IoRecord, Record, WindowRecord};
pub use crate::source::{Filter, Packet, PacketKind, Source};
