//! Metric catalog.
//!
//! A [`MetricCatalog`] is the validated, per-run snapshot of metric and
//! transform definitions. [`MetricCatalog::compile`] turns it into the
//! immutable [`CompiledCatalog`] shared by every evaluation of a batch.

mod compiled;
mod definition;
mod transform;

pub use compiled::{CompiledCatalog, CompiledMetric, RejectedTransform};
pub use definition::{MetricDefinition, MetricSource};
pub use transform::TransformDefinition;

use crate::error::{MetricError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// Catalog file layout.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    metrics: Vec<MetricDefinition>,
    #[serde(default)]
    transforms: Vec<TransformDefinition>,
}

/// Validated metric and transform definitions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricCatalog {
    metrics: Vec<MetricDefinition>,
    transforms: BTreeMap<String, TransformDefinition>,
}

impl MetricCatalog {
    /// Validate definitions.
    ///
    /// Metric names must be unique and aggregation metrics must name a base
    /// metric and a kind. Inactive transforms are dropped; two active
    /// transforms may not share an id.
    pub fn new(metrics: Vec<MetricDefinition>, transforms: Vec<TransformDefinition>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for metric in &metrics {
            if metric.name.trim().is_empty() {
                return Err(MetricError::InvalidDefinition {
                    metric: metric.name.clone(),
                    reason: "empty metric name".to_string(),
                });
            }
            if !seen.insert(metric.name.as_str()) {
                return Err(MetricError::DuplicateMetric(metric.name.clone()));
            }
            if let MetricSource::Aggregation {
                base_metric, kind, ..
            } = &metric.source
            {
                if base_metric.trim().is_empty() {
                    return Err(MetricError::InvalidDefinition {
                        metric: metric.name.clone(),
                        reason: "aggregation without a base metric".to_string(),
                    });
                }
                if kind.trim().is_empty() {
                    return Err(MetricError::InvalidDefinition {
                        metric: metric.name.clone(),
                        reason: "aggregation without a kind".to_string(),
                    });
                }
            }
        }

        let mut active = BTreeMap::new();
        for transform in transforms {
            if !transform.is_active {
                debug!(transform = %transform.id, "skipping inactive transform");
                continue;
            }
            if active.contains_key(&transform.id) {
                return Err(MetricError::InvalidDefinition {
                    metric: transform.id,
                    reason: "duplicate active transform id".to_string(),
                });
            }
            active.insert(transform.id.clone(), transform);
        }

        Ok(Self {
            metrics,
            transforms: active,
        })
    }

    /// Parse a catalog from JSON: `{"metrics": [...], "transforms": [...]}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::new(file.metrics, file.transforms)
    }

    /// Read a catalog JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Serialize back to the catalog JSON layout.
    pub fn to_json_string(&self) -> Result<String> {
        let file = CatalogFile {
            metrics: self.metrics.clone(),
            transforms: self.transforms.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Metrics in declaration order.
    pub fn metrics(&self) -> &[MetricDefinition] {
        &self.metrics
    }

    /// Active transforms by id.
    pub const fn transforms(&self) -> &BTreeMap<String, TransformDefinition> {
        &self.transforms
    }

    /// Metric by name.
    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Number of metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the catalog has no metrics.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Parse every formula and transform and order the metrics.
    ///
    /// Fails only on a dependency cycle.
    pub fn compile(self) -> Result<CompiledCatalog> {
        CompiledCatalog::build(self)
    }
}
