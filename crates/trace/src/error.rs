use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("invalid magic bytes in trace header")]
    InvalidMagic,
    #[error("unsupported trace format version {0}")]
    UnsupportedVersion(u32),
    #[error("checksum mismatch at record {seq}: expected {expected:#018x}, found {found:#018x}")]
    ChecksumMismatch { seq: u64, expected: u64, found: u64 },
    #[error("truncated trace entry at record {seq}")]
    Truncated { seq: u64 },
    #[error("record encoding error: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("record decoding error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, TraceError>;
