//! Replay of logged records as timestamped terminal packets.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{RecordError, SourceError};
use crate::reader::Reader;
use crate::schema::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketKind {
    Window { width: u16, height: u16 },
    Io { output: bool, data: Vec<u8> },
}

/// One replayable event, timestamped relative to the recording's start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub timestamp: Duration,
    pub kind: PacketKind,
}

/// Restricts a [`Source`] to one recording.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub host: Option<String>,
    pub user: Option<String>,
    pub session: Option<u32>,
}

impl Filter {
    pub fn matches(&self, record: &Record) -> bool {
        self.host.as_deref().map_or(true, |host| host == record.host())
            && self.user.as_deref().map_or(true, |user| user == record.user())
            && self.session.map_or(true, |session| session == record.session())
    }
}

/// Turns a stream of records into packets.
///
/// Message ids must increase strictly within each host and session. Records
/// outside the filter are skipped without being checked.
pub struct Source<R: Reader> {
    reader: R,
    filter: Filter,
    last_ids: HashMap<(String, u32), u64>,
    pending: VecDeque<Packet>,
}

impl<R: Reader> Source<R> {
    pub fn new(reader: R) -> Self {
        Self::with_filter(reader, Filter::default())
    }

    pub fn with_filter(reader: R, filter: Filter) -> Self {
        Self {
            reader,
            filter,
            last_ids: HashMap::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Next packet, or `Ok(None)` once the reader is exhausted.
    ///
    /// After an error the offending record is dropped and reading may
    /// continue.
    pub fn read(&mut self) -> Result<Option<Packet>, SourceError> {
        loop {
            if let Some(packet) = self.pending.pop_front() {
                return Ok(Some(packet));
            }

            let before = self.reader.loc_get();
            let Some(value) = self.reader.read()? else {
                return Ok(None);
            };
            let after = self.reader.loc_get();
            // The reader has usually moved past the record's newline.
            let line = if after > before { after - 1 } else { after };

            let record =
                Record::from_value(value).map_err(|source| SourceError::Schema { line, source })?;
            if !self.filter.matches(&record) {
                continue;
            }
            self.check_id(&record, line)?;

            match record {
                Record::Window(window) => {
                    return Ok(Some(Packet {
                        timestamp: window.pos,
                        kind: PacketKind::Window {
                            width: window.width,
                            height: window.height,
                        },
                    }));
                }
                Record::Io(io) => {
                    let chunks = io
                        .chunks()
                        .map_err(|source| SourceError::Record { line, source })?;
                    let packets = chunks
                        .into_iter()
                        .map(|chunk| {
                            let timestamp = io.pos.checked_add(chunk.offset).ok_or(
                                SourceError::Record {
                                    line,
                                    source: RecordError::DelayOverflow,
                                },
                            )?;
                            Ok(Packet {
                                timestamp,
                                kind: PacketKind::Io {
                                    output: chunk.output,
                                    data: chunk.data,
                                },
                            })
                        })
                        .collect::<Result<Vec<_>, SourceError>>()?;
                    self.pending.extend(packets);
                }
            }
        }
    }

    fn check_id(&mut self, record: &Record, line: usize) -> Result<(), SourceError> {
        let key = (record.host().to_owned(), record.session());
        let found = record.id();
        if let Some(&last) = self.last_ids.get(&key) {
            if found <= last {
                tracing::warn!(line, last, found, "message id out of order");
                return Err(SourceError::IdOutOfOrder {
                    line,
                    expected: last + 1,
                    found,
                });
            }
        }
        self.last_ids.insert(key, found);
        Ok(())
    }
}

impl<R: Reader> Iterator for Source<R> {
    type Item = Result<Packet, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read().transpose()
    }
}
