//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while reading or interpreting input data.
#[derive(Debug, Error)]
pub enum DataError {
    /// A record's date field could not be parsed
    #[error("Invalid date in field '{field}': {value}")]
    InvalidDate {
        /// Name of the date field
        field: String,
        /// Raw value that failed to parse
        value: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
