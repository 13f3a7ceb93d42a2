//! Error types for the hydro-grid workspace.

use thiserror::Error;

/// Result type alias using GridError.
pub type GridResult<T> = Result<T, GridError>;

/// Primary error type for grid and raster operations.
#[derive(Debug, Error)]
pub enum GridError {
    /// Malformed header or payload structure.
    #[error("format error: {0}")]
    Format(String),

    /// Payload ended before the header-declared cell count was decoded.
    #[error("truncated payload: expected {expected} bytes, got {got}")]
    TruncatedPayload { expected: usize, got: usize },

    /// Record-type id outside the documented encoding table.
    #[error("unknown record type id: {0}")]
    UnknownRecordType(i64),

    /// Missing backing source.
    #[error("source not found: {0}")]
    NotFound(String),

    /// Arithmetic between incompatibly shaped blocks.
    #[error("shape mismatch: left is {left:?}, right is {right:?}")]
    ShapeMismatch {
        left: (usize, usize, usize),
        right: (usize, usize, usize),
    },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridError {
    /// Create a Format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create a NotFound error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
