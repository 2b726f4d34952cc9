//! Error types for log triage.

use crate::diagnostics::CancelReason;
use thiserror::Error;

/// Result type for triage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end an analysis without a complete result.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be read at all.
    #[error(transparent)]
    FatalInput(#[from] FatalInputError),

    /// The scan stopped cooperatively; any partial result is incomplete.
    #[error("Analysis cancelled ({reason}) after {lines_scanned} lines")]
    Cancelled {
        reason: CancelReason,
        lines_scanned: usize,
    },

    /// Configuration is invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error.
        message: String,
    },

    /// The problem library could not answer a query.
    #[error("Problem library error: {message}")]
    ProblemLibrary {
        /// Error message from the library backend.
        message: String,
    },

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error outside of input streaming.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The input stream is unusable; no partial result exists.
#[derive(Debug, Error)]
pub enum FatalInputError {
    /// The stream closed before delivering any content.
    #[error("Input is empty: stream closed before any content")]
    Empty,

    /// Reading the stream failed.
    #[error("Failed to read input after {bytes_read} bytes: {source}")]
    Read {
        bytes_read: u64,
        #[source]
        source: std::io::Error,
    },
}
