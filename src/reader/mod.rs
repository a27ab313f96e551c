//! Record readers.
//!
//! A reader yields one structured value per call and tracks the line it has
//! reached. Parse failures are per line: the offending line is dropped and the
//! next call resumes on the line after it.

mod line_reader;
mod tokenizer;

use serde_json::Value;

use crate::core::loc::Loc;
use crate::error::ReaderError;

pub use line_reader::LineReader;
pub use tokenizer::{JsonTokenizer, Tokenizer, MAX_DEPTH_CEILING};

pub trait Reader {
    /// Read the next value; `Ok(None)` at end of stream, repeatably.
    fn read(&mut self) -> Result<Option<Value>, ReaderError>;

    /// Current 1-based line.
    fn loc_get(&self) -> usize;

    /// Render a location for diagnostics.
    fn loc_fmt(&self, loc: usize) -> String {
        Loc::fmt_line(loc)
    }
}

impl<T: Reader + ?Sized> Reader for &mut T {
    fn read(&mut self) -> Result<Option<Value>, ReaderError> {
        (**self).read()
    }

    fn loc_get(&self) -> usize {
        (**self).loc_get()
    }

    fn loc_fmt(&self, loc: usize) -> String {
        (**self).loc_fmt(loc)
    }
}

impl<T: Reader + ?Sized> Reader for Box<T> {
    fn read(&mut self) -> Result<Option<Value>, ReaderError> {
        (**self).read()
    }

    fn loc_get(&self) -> usize {
        (**self).loc_get()
    }

    fn loc_fmt(&self, loc: usize) -> String {
        (**self).loc_fmt(loc)
    }
}
