//! Error types and handling
//!
//! Common error types used across the crate.

use thiserror::Error;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Recording backend error: {0}")]
    Backend(String),
}

/// Result type alias using ReplayError
pub type ReplayResult<T> = Result<T, ReplayError>;
