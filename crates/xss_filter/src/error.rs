//! Error types.
//!
//! None of these reach callers of the permission checks: the filter logs
//! them and falls back to a more permissive state.

use thiserror::Error;

/// Failure while gathering request parameters.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("POST request has no upload stream")]
    NoUploadStream,

    #[error("short read of POST body: expected {expected} bytes, got {read}")]
    ShortRead { expected: u64, read: u64 },

    #[error("POST body of {0} bytes does not fit in memory")]
    TooLarge(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while loading filter preferences.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid preference JSON: {0}")]
    Json(#[from] serde_json::Error),
}
