//! Record writer over a raw file descriptor.

use std::io::{self, ErrorKind};
use std::os::fd::RawFd;

use libc::{self, c_int};

use crate::error::WriterError;
use crate::writer::Writer;

/// Block until `fd` accepts more data.
fn poll_writable(fd: c_int) -> io::Result<()> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLOUT,
        revents: 0,
    };
    loop {
        match unsafe { libc::poll(&mut pfd, 1, -1) } {
            ready if ready < 0 => {
                let err = io::Error::last_os_error();
                if err.kind() != ErrorKind::Interrupted {
                    return Err(err);
                }
            }
            0 => {}
            _ if pfd.revents & libc::POLLOUT != 0 => return Ok(()),
            _ => {
                return Err(io::Error::other(format!(
                    "descriptor {fd} not writable (revents 0x{:x})",
                    pfd.revents
                )))
            }
        }
    }
}

fn write_some(fd: c_int, buf: &[u8]) -> io::Result<usize> {
    let written = unsafe { libc::write(fd, buf.as_ptr().cast::<libc::c_void>(), buf.len()) };
    usize::try_from(written).map_err(|_| io::Error::last_os_error())
}

/// Push all of `record` through `write`, waiting with `wait` whenever the
/// descriptor would block.
pub(crate) fn write_record_with<W, P>(
    fd: c_int,
    record: &[u8],
    mut write: W,
    mut wait: P,
) -> io::Result<()>
where
    W: FnMut(c_int, &[u8]) -> io::Result<usize>,
    P: FnMut(c_int) -> io::Result<()>,
{
    let mut rest = record;
    while !rest.is_empty() {
        match write(fd, rest) {
            Ok(0) => return Err(io::Error::new(ErrorKind::WriteZero, "descriptor took no bytes")),
            Ok(count) => {
                rest = rest.get(count..).ok_or_else(|| {
                    io::Error::other(format!("write reported {count} of {} bytes", rest.len()))
                })?;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) if err.kind() == ErrorKind::WouldBlock => wait(fd)?,
            Err(err) => return Err(err),
        }
    }
    Ok(())
}

/// Writes records to a file descriptor it does not own.
///
/// Short writes, `EINTR` and `EAGAIN` are retried until the whole record is out.
#[derive(Debug, Clone, Copy)]
pub struct FdWriter {
    fd: RawFd,
}

impl FdWriter {
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }

    pub fn stdout() -> Self {
        Self::new(libc::STDOUT_FILENO)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }
}

impl Writer for FdWriter {
    fn write(&mut self, record: &[u8]) -> Result<(), WriterError> {
        write_record_with(self.fd, record, write_some, poll_writable)
            .map_err(|source| WriterError::io("writing record to file descriptor", source))
    }
}
