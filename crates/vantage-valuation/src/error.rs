//! Error types for valuation inputs.

use thiserror::Error;

/// Result type for valuation input loading.
pub type Result<T> = std::result::Result<T, ValuationError>;

/// Errors that can occur while loading valuation inputs. Derivation itself
/// never fails.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// Unknown multiple name
    #[error("unknown valuation multiple: {0}")]
    UnknownMultiple(String),

    /// Sector averages JSON could not be decoded
    #[error("sector averages deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Sector averages file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
