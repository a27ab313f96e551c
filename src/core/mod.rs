//! Encoding building blocks shared by the sink and the readers.

pub mod accumulator;
pub mod json;
pub mod loc;
pub mod message;
pub mod timing;
