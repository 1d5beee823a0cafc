//! pmguard-trace: the on-disk trace-log format.
//!
//! A trace log is a 16-byte file header (magic, format version, execution
//! id) followed by CRC64-framed, bincode-encoded [`pmguard::trace::TraceRecord`]s.
//! The capture front end appends with [`TraceWriter`]; the replay driver
//! consumes with the iterator-based [`TraceReader`].

pub mod error;
pub mod log;

pub use error::{Result, TraceError};
pub use log::{EntryHeader, TraceFileHeader, TraceReader, TraceWriter};
