//! Writers backed by operating system facilities.

#[cfg(unix)]
pub mod fd_writer;
#[cfg(unix)]
pub mod syslog_writer;

#[cfg(unix)]
pub use fd_writer::FdWriter;
#[cfg(unix)]
pub use syslog_writer::SyslogWriter;
