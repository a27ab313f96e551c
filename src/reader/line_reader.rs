use std::io::{self, BufRead, Read};

use serde_json::Value;

use crate::config::{LogConfig, DEFAULT_MAX_LINE};
use crate::core::loc::Loc;
use crate::error::{ReaderError, TokenError};
use crate::reader::tokenizer::{JsonTokenizer, Tokenizer};
use crate::reader::Reader;

fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n')
}

/// Reads one value at a time from a newline-delimited byte stream.
///
/// At most one line is buffered. A line that fails to parse is discarded as a
/// whole, so a malformed record never affects the lines after it.
pub struct LineReader<R: BufRead, T: Tokenizer = JsonTokenizer> {
    source: R,
    tokenizer: T,
    line: Vec<u8>,
    pos: usize,
    loc: Loc,
    max_line: usize,
    recover: bool,
    eof: bool,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_tokenizer(source, JsonTokenizer::default(), DEFAULT_MAX_LINE)
    }

    pub fn with_config(source: R, config: &LogConfig) -> Self {
        Self::with_tokenizer(
            source,
            JsonTokenizer::new(config.max_depth),
            config.max_line,
        )
    }
}

impl<R: BufRead, T: Tokenizer> LineReader<R, T> {
    pub fn with_tokenizer(source: R, tokenizer: T, max_line: usize) -> Self {
        Self {
            source,
            tokenizer,
            line: Vec::new(),
            pos: 0,
            loc: Loc::new(),
            max_line: max_line.max(1),
            recover: false,
            eof: false,
        }
    }

    pub fn loc(&self) -> Loc {
        self.loc
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    /// Buffer the next line. Returns `false` at end of stream.
    fn fill(&mut self) -> Result<bool, ReaderError> {
        self.line.clear();
        self.pos = 0;

        // Room for a full line, its newline, and one byte to detect overflow.
        let limit = (self.max_line as u64).saturating_add(2);
        match (&mut self.source).take(limit).read_until(b'\n', &mut self.line) {
            Ok(0) => {
                self.eof = true;
                Ok(false)
            }
            Ok(_) if self.content_len() > self.max_line => {
                let line = self.loc.line();
                if self.line.last() == Some(&b'\n') {
                    self.loc.advance();
                } else {
                    self.recover = true;
                }
                self.line.clear();
                tracing::warn!(line, limit = self.max_line, "discarding overlong line");
                Err(ReaderError::LineTooLong {
                    line,
                    limit: self.max_line,
                })
            }
            Ok(_) => Ok(true),
            Err(source) => {
                let line = self.loc.line();
                self.loc.advance_over(&self.line);
                self.recover = !self.line.ends_with(b"\n");
                self.line.clear();
                Err(ReaderError::Io { line, source })
            }
        }
    }

    fn content_len(&self) -> usize {
        self.line.len() - usize::from(self.line.last() == Some(&b'\n'))
    }

    /// Drop source bytes up to and including the next newline.
    fn skip_line(&mut self) -> Result<(), ReaderError> {
        loop {
            let (found, used) = {
                let available = match self.source.fill_buf() {
                    Ok(available) => available,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(source) => {
                        return Err(ReaderError::Io {
                            line: self.loc.line(),
                            source,
                        })
                    }
                };
                if available.is_empty() {
                    return Ok(());
                }
                match available.iter().position(|&byte| byte == b'\n') {
                    Some(index) => (true, index + 1),
                    None => (false, available.len()),
                }
            };
            self.source.consume(used);
            if found {
                self.loc.advance();
                return Ok(());
            }
        }
    }

    /// Drop the rest of the buffered line, counting its newline.
    fn discard_line(&mut self) {
        self.loc.advance_over(&self.line[self.pos..]);
        self.line.clear();
        self.pos = 0;
    }

    fn skip_blanks(&mut self) {
        while self.pos < self.line.len() && is_blank(self.line[self.pos]) {
            if self.line[self.pos] == b'\n' {
                self.loc.advance();
            }
            self.pos += 1;
        }
    }
}

impl<R: BufRead, T: Tokenizer> Reader for LineReader<R, T> {
    fn read(&mut self) -> Result<Option<Value>, ReaderError> {
        if self.recover {
            self.skip_line()?;
            self.recover = false;
        }

        loop {
            self.skip_blanks();
            if self.pos < self.line.len() {
                break;
            }
            if self.eof || !self.fill()? {
                return Ok(None);
            }
        }

        let line = self.loc.line();
        match self.tokenizer.parse(&self.line[self.pos..]) {
            Ok((value, used)) => {
                let end = self.pos + used;
                self.loc.advance_over(&self.line[self.pos..end]);
                self.pos = end;
                self.skip_blanks();
                Ok(Some(value))
            }
            Err(err) => {
                self.discard_line();
                tracing::warn!(line, error = %err, "discarding malformed line");
                Err(match err {
                    TokenError::Incomplete => ReaderError::IncompleteLine { line },
                    source => ReaderError::Parse { line, source },
                })
            }
        }
    }

    fn loc_get(&self) -> usize {
        self.loc.line()
    }
}
