use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use tape_log::{IoWriter, Sink, Writer};

const RECORD: &[u8] = b"{\"type\":\"window\"}\n";

#[cfg(unix)]
#[test]
fn fd_writer_appends_whole_records() {
    use std::os::fd::AsRawFd;

    use tape_log::FdWriter;

    let mut file = tempfile::tempfile().expect("temporary file");
    let mut writer = FdWriter::new(file.as_raw_fd());
    writer.write(RECORD).expect("first record");
    writer.write(RECORD).expect("second record");

    file.seek(SeekFrom::Start(0)).expect("rewind");
    let mut contents = Vec::new();
    file.read_to_end(&mut contents).expect("read back");
    assert_eq!(contents, [RECORD, RECORD].concat());
}

#[cfg(unix)]
#[test]
fn fd_writer_reports_bad_descriptor() {
    use tape_log::FdWriter;

    let mut writer = FdWriter::new(-1);
    assert!(writer.write(RECORD).is_err());
}

#[test]
fn sink_drives_io_writer_over_a_file() {
    let file = tempfile::NamedTempFile::new().expect("temporary file");
    let mut sink = Sink::new(
        IoWriter::new(file.reopen().expect("reopen")),
        "host",
        "user",
        3,
        4096,
        Duration::ZERO,
    )
    .expect("sink");
    sink.window_write(Duration::from_millis(1), 80, 24).expect("window");
    sink.io_write(Duration::from_millis(2), true, b"$ ").expect("output");
    sink.finish().expect("finish");
    drop(sink);

    let contents = std::fs::read_to_string(file.path()).expect("read log");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("{\"type\":\"window\""));
    assert!(lines[1].contains("\"out_txt\":\"$ \""));
}
