//! Error types for catalog loading and compilation.

use crate::expr::ParseError;
use thiserror::Error;

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, MetricError>;

/// Errors that can occur while loading or compiling a metric catalog.
///
/// Evaluation itself never fails with this type: metric-local problems are
/// reported as [`CalculationWarning`](crate::CalculationWarning)s.
#[derive(Debug, Error)]
pub enum MetricError {
    /// The dependency graph has a cycle; no evaluation order exists
    #[error("circular dependency among metrics: {}", unresolved.join(", "))]
    CircularDependency {
        /// Metrics that could not be ordered
        unresolved: Vec<String>,
    },

    /// Two definitions share a name
    #[error("duplicate metric definition: {0}")]
    DuplicateMetric(String),

    /// A definition is structurally unusable
    #[error("invalid definition for {metric}: {reason}")]
    InvalidDefinition {
        /// Metric name
        metric: String,
        /// What is wrong with it
        reason: String,
    },

    /// Expression syntax error
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Catalog JSON could not be decoded
    #[error("catalog deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catalog file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_metrics() {
        let err = MetricError::CircularDependency {
            unresolved: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(err.to_string(), "circular dependency among metrics: A, B");
    }
}
