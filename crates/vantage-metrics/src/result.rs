//! Evaluation output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use vantage_data::{DateRange, Value};

/// Outcome of a single metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricStatus {
    /// Non-null value
    Computed,
    /// Null because inputs were missing or a division by zero occurred
    Null,
    /// Null because the calculation failed; a warning was recorded
    Failed,
}

impl fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Computed => "computed",
            Self::Null => "null",
            Self::Failed => "failed",
        })
    }
}

/// Category of a calculation warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    /// Formula could not be parsed
    Parse,
    /// Formula evaluation failed
    Expression,
    /// Aggregation failed or its kind is unknown
    Aggregation,
    /// A transform failed and the built-in was used
    TransformFallback,
    /// An aggregation base is undefined or not numeric
    InvalidInput,
}

/// A metric-local failure, kept alongside the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationWarning {
    /// Metric that produced the warning
    pub metric: String,
    /// Category
    pub kind: WarningKind,
    /// Human-readable detail
    pub message: String,
}

/// How a domain's TTM figures were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalculationType {
    /// Every TTM aggregation had a full window
    Full,
    /// At least one TTM aggregation was scaled up from fewer quarters
    Partial,
    /// No TTM aggregation in the domain
    #[default]
    NotApplicable,
}

/// Per-domain metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainMetadata {
    /// Dates of the records feeding the domain's metrics
    pub date_range: Option<DateRange>,
    /// Largest number of quarters an aggregation in the domain consumed
    pub quarter_count: usize,
    /// Full vs partial TTM
    pub calculation_type: CalculationType,
}

/// Metrics of one domain.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainResult {
    /// Metric values by name
    pub metrics: BTreeMap<String, Value>,
    /// Metadata
    pub metadata: DomainMetadata,
}

/// Output of one [`MetricEngine::evaluate`](crate::MetricEngine::evaluate) call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Ticker of the context
    pub ticker: String,
    /// As-of date of the context
    pub as_of: NaiveDate,
    /// Results grouped by domain
    pub domains: BTreeMap<String, DomainResult>,
    /// Per-metric status
    pub statuses: BTreeMap<String, MetricStatus>,
    /// Metric-local failures
    pub warnings: Vec<CalculationWarning>,
}

impl EvaluationResult {
    /// Value of a metric in any domain.
    pub fn value(&self, metric: &str) -> Option<&Value> {
        self.domains
            .values()
            .find_map(|domain| domain.metrics.get(metric))
    }

    /// Finite numeric value of a metric in any domain.
    pub fn number(&self, metric: &str) -> Option<f64> {
        self.value(metric).and_then(Value::as_f64)
    }

    /// Status of a metric.
    pub fn status(&self, metric: &str) -> Option<MetricStatus> {
        self.statuses.get(metric).copied()
    }

    /// All metric values across domains.
    pub fn flattened(&self) -> BTreeMap<&str, &Value> {
        self.domains
            .values()
            .flat_map(|domain| domain.metrics.iter().map(|(k, v)| (k.as_str(), v)))
            .collect()
    }

    /// Number of metrics with the given status.
    pub fn count(&self, status: MetricStatus) -> usize {
        self.statuses.values().filter(|s| **s == status).count()
    }
}
