use std::time::Duration;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::core::timing::{self, Run, TimingEntry};
use crate::error::RecordError;

/// Deserialize a `<secs>.<millis>` position into a duration.
fn deserialize_pos<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "position {secs} is not a non-negative number of seconds"
        )));
    }
    Ok(Duration::from_millis((secs * 1000.0).round() as u64))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowRecord {
    pub host: String,
    pub user: String,
    pub session: u32,
    pub id: u64,
    #[serde(deserialize_with = "deserialize_pos")]
    pub pos: Duration,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoRecord {
    pub host: String,
    pub user: String,
    pub session: u32,
    pub id: u64,
    #[serde(deserialize_with = "deserialize_pos")]
    pub pos: Duration,
    pub timing: String,
    pub in_txt: String,
    pub in_bin: Vec<u8>,
    pub out_txt: String,
    pub out_bin: Vec<u8>,
}

/// Terminal data written at one instant in one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoChunk {
    /// Time since the record's `pos`.
    pub offset: Duration,
    pub output: bool,
    pub data: Vec<u8>,
}

struct RunCursor<'a> {
    text: std::str::Chars<'a>,
    binary: &'a [u8],
}

impl<'a> RunCursor<'a> {
    fn take(&mut self, binary: bool, count: u64, run: Run, out: &mut Vec<u8>) -> Result<(), RecordError> {
        let overrun = || RecordError::Overrun { run: run.field() };
        if binary {
            let count = usize::try_from(count).map_err(|_| overrun())?;
            if count > self.binary.len() {
                return Err(overrun());
            }
            out.extend_from_slice(&self.binary[..count]);
            self.binary = &self.binary[count..];
        } else {
            let mut utf8 = [0u8; 4];
            for _ in 0..count {
                let ch = self.text.next().ok_or_else(overrun)?;
                out.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            }
        }
        Ok(())
    }
}

impl IoRecord {
    /// Rebuild the terminal data in write order from the timing trace.
    ///
    /// Adjacent contributions in the same direction with no delay between
    /// them are joined into one chunk.
    pub fn chunks(&self) -> Result<Vec<IoChunk>, RecordError> {
        let entries = timing::parse(&self.timing)?;
        let mut input = RunCursor {
            text: self.in_txt.chars(),
            binary: &self.in_bin,
        };
        let mut output = RunCursor {
            text: self.out_txt.chars(),
            binary: &self.out_bin,
        };

        let mut chunks: Vec<IoChunk> = Vec::new();
        let mut offset = Duration::ZERO;
        for entry in entries {
            let (run, count) = match entry {
                TimingEntry::Delay(ms) => {
                    offset = offset
                        .checked_add(Duration::from_millis(ms))
                        .ok_or(RecordError::DelayOverflow)?;
                    continue;
                }
                TimingEntry::Data(run, count) => (run, count),
            };

            let joins = matches!(
                chunks.last(),
                Some(last) if last.offset == offset && last.output == run.is_output()
            );
            if !joins {
                chunks.push(IoChunk {
                    offset,
                    output: run.is_output(),
                    data: Vec::new(),
                });
            }
            let Some(chunk) = chunks.last_mut() else {
                continue;
            };
            let cursor = if run.is_output() {
                &mut output
            } else {
                &mut input
            };
            cursor.take(run.is_binary(), count, run, &mut chunk.data)?;
        }

        for (cursor, txt, bin) in [
            (&mut input, Run::InTxt, Run::InBin),
            (&mut output, Run::OutTxt, Run::OutBin),
        ] {
            if cursor.text.next().is_some() {
                return Err(RecordError::Leftover { run: txt.field() });
            }
            if !cursor.binary.is_empty() {
                return Err(RecordError::Leftover { run: bin.field() });
            }
        }

        chunks.retain(|chunk| !chunk.data.is_empty());
        Ok(chunks)
    }
}

/// A decoded wire record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Window(WindowRecord),
    Io(IoRecord),
}

impl Record {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[must_use]
    pub fn host(&self) -> &str {
        match self {
            Record::Window(record) => &record.host,
            Record::Io(record) => &record.host,
        }
    }

    #[must_use]
    pub fn user(&self) -> &str {
        match self {
            Record::Window(record) => &record.user,
            Record::Io(record) => &record.user,
        }
    }

    #[must_use]
    pub fn session(&self) -> u32 {
        match self {
            Record::Window(record) => record.session,
            Record::Io(record) => record.session,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            Record::Window(record) => record.id,
            Record::Io(record) => record.id,
        }
    }

    #[must_use]
    pub fn pos(&self) -> Duration {
        match self {
            Record::Window(record) => record.pos,
            Record::Io(record) => record.pos,
        }
    }
}
