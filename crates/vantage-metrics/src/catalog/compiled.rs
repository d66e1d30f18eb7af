//! Compiled catalog: parsed formulas, accepted transforms and the evaluation
//! order, built once and shared by every evaluation.

use super::{MetricCatalog, MetricDefinition, MetricSource};
use crate::error::Result;
use crate::expr::{self, Expr, ParseError, Program};
use crate::graph::{self, DependencyDrift, DependencyGraph};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// A metric definition with its formula parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMetric {
    /// Source definition
    pub definition: MetricDefinition,
    /// Parsed formula for expression metrics; `Err` when the formula is
    /// invalid, in which case the metric always evaluates to null
    pub formula: Option<std::result::Result<Expr, ParseError>>,
}

impl CompiledMetric {
    /// Successfully parsed formula, if any.
    pub fn expression(&self) -> Option<&Expr> {
        self.formula.as_ref().and_then(|f| f.as_ref().ok())
    }
}

/// A transform whose program failed to parse. Aggregations of its kind use
/// the built-in implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTransform {
    /// Transform id
    pub id: String,
    /// Parse failure
    pub error: ParseError,
}

/// Immutable, parsed and ordered catalog.
///
/// Built once per batch and shared read-only (usually behind an `Arc`) by every
/// evaluation in that batch.
#[derive(Debug, Clone)]
pub struct CompiledCatalog {
    metrics: Vec<CompiledMetric>,
    index: BTreeMap<String, usize>,
    transforms: BTreeMap<String, Program>,
    rejected: Vec<RejectedTransform>,
    graph: DependencyGraph,
    drift: Vec<DependencyDrift>,
}

impl CompiledCatalog {
    pub(super) fn build(catalog: MetricCatalog) -> Result<Self> {
        let MetricCatalog {
            metrics,
            transforms: definitions,
        } = catalog;

        let metrics: Vec<CompiledMetric> = metrics
            .into_iter()
            .map(|definition| {
                let formula = match &definition.source {
                    MetricSource::Expression { formula } => {
                        let parsed = expr::parse_formula(formula);
                        if let Err(err) = &parsed {
                            warn!(metric = %definition.name, error = %err, "formula rejected");
                        }
                        Some(parsed)
                    }
                    MetricSource::ApiField { .. } | MetricSource::Aggregation { .. } => None,
                };
                CompiledMetric {
                    definition,
                    formula,
                }
            })
            .collect();

        let mut transforms = BTreeMap::new();
        let mut rejected = Vec::new();
        for (id, definition) in definitions {
            match expr::parse_program(&definition.calculation_code) {
                Ok(program) => {
                    debug!(transform = %id, "transform compiled");
                    transforms.insert(id, program);
                }
                Err(error) => {
                    warn!(transform = %id, error = %error, "transform rejected, built-in will be used");
                    rejected.push(RejectedTransform { id, error });
                }
            }
        }

        let names: BTreeSet<&str> = metrics
            .iter()
            .map(|m| m.definition.name.as_str())
            .collect();
        // an unparsable formula has no token set to compare against
        let drift = metrics
            .iter()
            .filter(|m| !matches!(m.formula, Some(Err(_))))
            .filter_map(|m| graph::audit_drift(&m.definition, m.expression(), &names))
            .collect();
        let nodes = metrics
            .iter()
            .map(|m| {
                (
                    m.definition.name.clone(),
                    graph::token_dependencies(&m.definition, m.expression(), &names),
                )
            })
            .collect();
        let graph = DependencyGraph::build(nodes)?;

        let index = metrics
            .iter()
            .enumerate()
            .map(|(i, m)| (m.definition.name.clone(), i))
            .collect();

        debug!(
            metrics = metrics.len(),
            transforms = transforms.len(),
            "catalog compiled"
        );
        Ok(Self {
            metrics,
            index,
            transforms,
            rejected,
            graph,
            drift,
        })
    }

    /// Metrics in declaration order.
    pub fn metrics(&self) -> &[CompiledMetric] {
        &self.metrics
    }

    /// Metric by name.
    pub fn metric(&self, name: &str) -> Option<&CompiledMetric> {
        self.index.get(name).map(|&i| &self.metrics[i])
    }

    /// Metrics in evaluation order.
    pub fn order(&self) -> impl Iterator<Item = &CompiledMetric> {
        self.graph.order().iter().filter_map(|name| self.metric(name))
    }

    /// Dependency graph.
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Parsed transform programs by aggregation kind.
    pub const fn transforms(&self) -> &BTreeMap<String, Program> {
        &self.transforms
    }

    /// Transforms that failed to parse.
    pub fn rejected_transforms(&self) -> &[RejectedTransform] {
        &self.rejected
    }

    /// Expression metrics whose formula failed to parse.
    pub fn formula_errors(&self) -> impl Iterator<Item = (&str, &ParseError)> {
        self.metrics.iter().filter_map(|m| match &m.formula {
            Some(Err(err)) => Some((m.definition.name.as_str(), err)),
            _ => None,
        })
    }

    /// Differences between token and legacy substring dependency detection.
    pub fn drift(&self) -> &[DependencyDrift] {
        &self.drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TransformDefinition;
    use crate::error::MetricError;

    fn catalog(metrics: Vec<MetricDefinition>, transforms: Vec<TransformDefinition>) -> MetricCatalog {
        MetricCatalog::new(metrics, transforms).unwrap()
    }

    #[test]
    fn test_compile_orders_metrics() {
        let compiled = catalog(
            vec![
                MetricDefinition::expression("PSR", "valuation", "marketCap / revenueTTM"),
                MetricDefinition::aggregation("revenueTTM", "profitability", "revenue", "ttmSumOrScaled"),
                MetricDefinition::api_field("revenue", "profitability", "income", "revenue"),
            ],
            Vec::new(),
        )
        .compile()
        .unwrap();

        let order: Vec<_> = compiled.order().map(|m| m.definition.name.as_str()).collect();
        assert_eq!(order, vec!["revenue", "revenueTTM", "PSR"]);

        // "revenue" is a substring of "revenueTTM" but not a token of the formula
        assert_eq!(compiled.drift().len(), 1);
        assert_eq!(compiled.drift()[0].only_substring, vec!["revenue"]);
        assert_eq!(compiled.graph().dependencies("PSR"), ["revenueTTM"]);
    }

    #[test]
    fn test_cycle_aborts_compile() {
        let err = catalog(
            vec![
                MetricDefinition::expression("A", "d", "B + 1"),
                MetricDefinition::expression("B", "d", "A * 2"),
            ],
            Vec::new(),
        )
        .compile()
        .unwrap_err();
        assert!(
            matches!(err, MetricError::CircularDependency { unresolved } if unresolved == ["A", "B"])
        );
    }

    #[test]
    fn test_bad_formula_is_metric_local() {
        let compiled = catalog(
            vec![
                MetricDefinition::expression("broken", "d", "1 +"),
                MetricDefinition::expression("fine", "d", "2"),
            ],
            Vec::new(),
        )
        .compile()
        .unwrap();
        let errors: Vec<_> = compiled.formula_errors().map(|(name, _)| name).collect();
        assert_eq!(errors, vec!["broken"]);
        assert_eq!(compiled.order().count(), 2);
        assert!(compiled.drift().is_empty());
    }

    #[test]
    fn test_deeply_nested_formula_is_metric_local() {
        let deep = "-".repeat(10_000) + "revenue";
        let compiled = catalog(
            vec![
                MetricDefinition::api_field("revenue", "d", "income", "revenue"),
                MetricDefinition::expression("deep", "d", deep),
            ],
            Vec::new(),
        )
        .compile()
        .unwrap();
        let errors: Vec<_> = compiled
            .formula_errors()
            .map(|(name, err)| (name, err.message.as_str()))
            .collect();
        assert_eq!(errors, vec![("deep", "expression nested too deeply")]);
        assert!(compiled.graph().dependencies("deep").is_empty());
    }

    #[test]
    fn test_unparsable_transform_rejected() {
        let compiled = catalog(
            Vec::new(),
            vec![
                TransformDefinition::new("ttmSumOrScaled", "import os"),
                TransformDefinition::new("median3", "return sorted(quarterly_values)[1]"),
                TransformDefinition::new("first", "return quarterly_values[0]"),
            ],
        )
        .compile()
        .unwrap();
        let rejected: Vec<_> = compiled
            .rejected_transforms()
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(rejected, vec!["median3", "ttmSumOrScaled"]);
        assert!(compiled.transforms().contains_key("first"));
    }
}
