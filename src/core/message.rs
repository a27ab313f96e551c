//! Fixed-capacity buffer a record is formatted into before it is written.

use std::fmt;

use crate::error::SinkError;

/// Extra room reserved on top of the I/O size for field names and punctuation.
pub const MESSAGE_OVERHEAD: usize = 1024;

#[derive(Debug)]
pub struct MessageBuf {
    buf: Vec<u8>,
    capacity: usize,
}

impl MessageBuf {
    pub fn new(capacity: usize) -> Result<Self, SinkError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|source| SinkError::alloc("message buffer", source))?;
        Ok(Self { buf, capacity })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl fmt::Write for MessageBuf {
    /// Fails without appending anything once `s` would overrun the capacity.
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.buf.len() + s.len() > self.capacity {
            return Err(fmt::Error);
        }
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }
}
