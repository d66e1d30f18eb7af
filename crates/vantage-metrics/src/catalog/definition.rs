//! Metric definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vantage_data::{FieldKey, SourceId, Value};

/// How a metric obtains its value. Exactly one payload per definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "sourceKind",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum MetricSource {
    /// Read from a raw series of the calculation context
    ApiField {
        /// Raw series identifier
        #[serde(alias = "apiSource")]
        source: SourceId,
        /// Field or field map to extract
        #[serde(alias = "fieldKey")]
        field: FieldKey,
    },
    /// Quarter-series aggregation over another metric
    Aggregation {
        /// Metric whose quarterly values are aggregated
        #[serde(alias = "baseMetricId")]
        base_metric: String,
        /// Built-in kind or transform id
        #[serde(alias = "aggregationKind")]
        kind: String,
        /// Kind-specific parameters
        #[serde(default, alias = "aggregationParams")]
        params: BTreeMap<String, Value>,
    },
    /// Formula over computed metrics and custom values
    Expression {
        /// Formula source
        formula: String,
    },
}

/// A named metric in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    /// Unique metric name
    pub name: String,
    /// Output grouping, e.g. "valuation"
    pub domain: String,
    /// Where the value comes from
    #[serde(flatten)]
    pub source: MetricSource,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MetricDefinition {
    fn with_source(name: impl Into<String>, domain: impl Into<String>, source: MetricSource) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            source,
            description: None,
        }
    }

    /// Raw-field metric.
    pub fn api_field(
        name: impl Into<String>,
        domain: impl Into<String>,
        source: impl Into<SourceId>,
        field: impl Into<FieldKey>,
    ) -> Self {
        Self::with_source(
            name,
            domain,
            MetricSource::ApiField {
                source: source.into(),
                field: field.into(),
            },
        )
    }

    /// Aggregation metric with no params.
    pub fn aggregation(
        name: impl Into<String>,
        domain: impl Into<String>,
        base_metric: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self::with_source(
            name,
            domain,
            MetricSource::Aggregation {
                base_metric: base_metric.into(),
                kind: kind.into(),
                params: BTreeMap::new(),
            },
        )
    }

    /// Expression metric.
    pub fn expression(
        name: impl Into<String>,
        domain: impl Into<String>,
        formula: impl Into<String>,
    ) -> Self {
        Self::with_source(
            name,
            domain,
            MetricSource::Expression {
                formula: formula.into(),
            },
        )
    }

    /// Set an aggregation parameter. No effect on other kinds.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if let MetricSource::Aggregation { params, .. } = &mut self.source {
            params.insert(key.into(), value.into());
        }
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Source kind as written in catalogs.
    pub const fn source_kind(&self) -> &'static str {
        match self.source {
            MetricSource::ApiField { .. } => "apiField",
            MetricSource::Aggregation { .. } => "aggregation",
            MetricSource::Expression { .. } => "expression",
        }
    }
}
