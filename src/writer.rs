//! Record writer capability.
//!
//! Invariant: a record is accepted as a whole or the write fails; a writer
//! never leaves part of a record visible.

use std::io;

use crate::error::WriterError;

/// Destination for complete, newline-terminated records.
pub trait Writer {
    fn write(&mut self, record: &[u8]) -> Result<(), WriterError>;
}

impl Writer for Vec<u8> {
    fn write(&mut self, record: &[u8]) -> Result<(), WriterError> {
        self.try_reserve(record.len())
            .map_err(|err| WriterError::io("growing record buffer", io::Error::other(err)))?;
        self.extend_from_slice(record);
        Ok(())
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn write(&mut self, record: &[u8]) -> Result<(), WriterError> {
        (**self).write(record)
    }
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn write(&mut self, record: &[u8]) -> Result<(), WriterError> {
        (**self).write(record)
    }
}

/// Adapts any [`io::Write`] into a record [`Writer`].
///
/// Each record is written with `write_all` and flushed, so buffered sinks
/// such as `BufWriter<File>` see whole records only.
#[derive(Debug)]
pub struct IoWriter<W: io::Write> {
    inner: W,
}

impl<W: io::Write> IoWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> Writer for IoWriter<W> {
    fn write(&mut self, record: &[u8]) -> Result<(), WriterError> {
        self.inner
            .write_all(record)
            .map_err(|source| WriterError::io("writing record", source))?;
        self.inner
            .flush()
            .map_err(|source| WriterError::io("flushing record", source))
    }
}
