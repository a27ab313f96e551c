//! Session record encoder.
//!
//! Invariant: the writer only ever receives complete records. A record is
//! formatted into a fixed-capacity buffer first and handed over in one call.

use std::fmt::{self, Write as _};
use std::time::Duration;

use crate::config::LogConfig;
use crate::core::accumulator::IoAccumulator;
use crate::core::json::write_escaped;
use crate::core::message::{MessageBuf, MESSAGE_OVERHEAD};
use crate::core::timing::Run;
use crate::error::SinkError;
use crate::writer::Writer;

/// Elapsed session time rendered as `<secs>.<millis>`, truncated to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos(pub Duration);

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.0.as_secs(), self.0.subsec_millis())
    }
}

fn owned_copy(what: &'static str, value: &str) -> Result<String, SinkError> {
    let mut copy = String::new();
    copy.try_reserve_exact(value.len())
        .map_err(|source| SinkError::alloc(what, source))?;
    copy.push_str(value);
    Ok(copy)
}

/// Encodes one terminal session into window and I/O records.
#[derive(Debug)]
pub struct Sink<W: Writer> {
    writer: W,
    hostname: String,
    username: String,
    session_id: u32,
    message_id: u64,
    start: Duration,
    io: IoAccumulator,
    message: MessageBuf,
}

impl<W: Writer> Sink<W> {
    /// Create a sink for a session that started at `start`.
    ///
    /// `io_size` bounds the I/O payload of a single record and must be at least
    /// [`crate::IO_SIZE_MIN`].
    pub fn new(
        writer: W,
        hostname: &str,
        username: &str,
        session_id: u32,
        io_size: usize,
        start: Duration,
    ) -> Result<Self, SinkError> {
        let io = IoAccumulator::new(io_size)?;
        let message = MessageBuf::new(io_size + MESSAGE_OVERHEAD)?;
        Ok(Self {
            writer,
            hostname: owned_copy("hostname", hostname)?,
            username: owned_copy("username", username)?,
            session_id,
            message_id: 0,
            start,
            io,
            message,
        })
    }

    pub fn with_config(
        writer: W,
        hostname: &str,
        username: &str,
        session_id: u32,
        config: &LogConfig,
        start: Duration,
    ) -> Result<Self, SinkError> {
        Self::new(writer, hostname, username, session_id, config.io_size, start)
    }

    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Id the next record will carry.
    #[must_use]
    pub fn message_id(&self) -> u64 {
        self.message_id
    }

    #[must_use]
    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Release the writer. Pending I/O is dropped; call [`Sink::finish`] first.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Record a terminal geometry change, flushing pending I/O first.
    pub fn window_write(
        &mut self,
        timestamp: Duration,
        width: u16,
        height: u16,
    ) -> Result<(), SinkError> {
        self.io_flush()?;

        let pos = Pos(timestamp.saturating_sub(self.start));
        self.message.clear();
        let framed = self
            .write_header("window", pos)
            .and_then(|()| write!(self.message, ",\"width\":{width},\"height\":{height}}}\n"));
        if framed.is_err() {
            return Err(self.out_of_space("window"));
        }

        self.emit("window")
    }

    /// Accumulate terminal input (`output == false`) or output bytes,
    /// flushing I/O records whenever the accumulator fills up.
    pub fn io_write(
        &mut self,
        timestamp: Duration,
        output: bool,
        data: &[u8],
    ) -> Result<(), SinkError> {
        let mut rest = data;
        loop {
            rest = self.io.write(timestamp, output, rest);
            if rest.is_empty() {
                return Ok(());
            }
            self.io_flush()?;
        }
    }

    /// Make the current position a record boundary, flushing as needed so
    /// held-back partial characters can be stored.
    pub fn io_cut(&mut self) -> Result<(), SinkError> {
        while !self.io.cut() {
            self.io_flush()?;
        }
        Ok(())
    }

    /// Emit accumulated I/O as one record. Does nothing when nothing is pending.
    pub fn io_flush(&mut self) -> Result<(), SinkError> {
        if self.io.is_empty() {
            return Ok(());
        }

        self.io.flush();
        let first = self.io.first().unwrap_or(self.start);
        let pos = Pos(first.saturating_sub(self.start));

        self.message.clear();
        if self.write_io_record(pos).is_err() {
            return Err(self.out_of_space("io"));
        }

        self.emit("io")?;
        self.io.empty();
        Ok(())
    }

    /// Cut and flush everything pending, as at the end of a session.
    pub fn finish(&mut self) -> Result<(), SinkError> {
        self.io_cut()?;
        self.io_flush()
    }

    fn write_header(&mut self, kind: &str, pos: Pos) -> fmt::Result {
        let message = &mut self.message;
        write!(message, "{{\"type\":\"{kind}\",\"host\":\"")?;
        write_escaped(message, &self.hostname)?;
        message.write_str("\",\"user\":\"")?;
        write_escaped(message, &self.username)?;
        write!(
            message,
            "\",\"session\":{},\"id\":{},\"pos\":{pos}",
            self.session_id, self.message_id
        )
    }

    fn write_io_record(&mut self, pos: Pos) -> fmt::Result {
        self.write_header("io", pos)?;
        let message = &mut self.message;
        let io = &self.io;
        write!(
            message,
            ",\"timing\":\"{}\",\"in_txt\":\"{}\",\"in_bin\":[{}],\"out_txt\":\"{}\",\"out_bin\":[{}]}}\n",
            io.timing(),
            io.run(Run::InTxt),
            io.run(Run::InBin),
            io.run(Run::OutTxt),
            io.run(Run::OutBin),
        )
    }

    fn emit(&mut self, kind: &'static str) -> Result<(), SinkError> {
        self.writer.write(self.message.as_bytes())?;
        tracing::debug!(
            kind,
            id = self.message_id,
            len = self.message.len(),
            "record written"
        );
        self.message_id += 1;
        Ok(())
    }

    fn out_of_space(&self, kind: &'static str) -> SinkError {
        tracing::warn!(
            kind,
            capacity = self.message.capacity(),
            "record does not fit the message buffer"
        );
        SinkError::OutOfSpace {
            kind,
            capacity: self.message.capacity(),
        }
    }
}
