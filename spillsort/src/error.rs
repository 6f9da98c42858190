//! Error types for the spill codec

use thiserror::Error;

/// Result type for spill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Spill error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// EOF inside a record body
    #[error("truncated record: expected {expected} bytes, got {actual}")]
    TruncatedRecord { expected: usize, actual: usize },

    /// EOF inside a length varint, or between the two length varints
    #[error("truncated length prefix")]
    TruncatedLength,

    /// Length varint does not decode
    #[error("invalid length prefix: {0}")]
    InvalidLength(String),

    /// Compressor init/finalize failure
    #[error("compression error: {0}")]
    Compression(String),

    /// Offsets vector is not monotonic
    #[error("invalid section offsets: {next} precedes {prev}")]
    InvalidOffsets { prev: u64, next: u64 },

    /// Writer hit an earlier error or was already closed
    #[error("writer is poisoned or closed")]
    Poisoned,
}
