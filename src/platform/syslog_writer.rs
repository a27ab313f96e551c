//! Record writer logging each record as one syslog message.

use libc::{self, c_char, c_int};

use crate::error::WriterError;
use crate::writer::Writer;

const FORMAT: &[u8] = b"%.*s\0";

/// Sends records to syslog with a fixed priority (facility | level).
///
/// The trailing newline of a record is dropped; syslog delimits messages itself.
#[derive(Debug, Clone, Copy)]
pub struct SyslogWriter {
    priority: c_int,
}

impl SyslogWriter {
    pub fn new(priority: c_int) -> Self {
        Self { priority }
    }

    pub fn priority(&self) -> c_int {
        self.priority
    }
}

impl Default for SyslogWriter {
    fn default() -> Self {
        Self::new(libc::LOG_AUTHPRIV | libc::LOG_INFO)
    }
}

/// Record body and its length as syslog's `%.*s` precision.
fn message(record: &[u8]) -> Result<(&[u8], c_int), WriterError> {
    let message = record.strip_suffix(b"\n").unwrap_or(record);
    Ok((message, precision(message.len())?))
}

fn precision(len: usize) -> Result<c_int, WriterError> {
    c_int::try_from(len).map_err(|_| {
        WriterError::io(
            "sending record to syslog",
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "record longer than syslog can accept",
            ),
        )
    })
}

impl Writer for SyslogWriter {
    fn write(&mut self, record: &[u8]) -> Result<(), WriterError> {
        let (message, len) = message(record)?;
        unsafe {
            libc::syslog(
                self.priority,
                FORMAT.as_ptr() as *const c_char,
                len,
                message.as_ptr() as *const c_char,
            );
        }
        Ok(())
    }
}
