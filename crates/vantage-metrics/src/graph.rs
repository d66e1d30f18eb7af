//! Dependency graph and evaluation order.
//!
//! Edges run from a metric to the metrics it needs:
//!
//! - `apiField`: none
//! - `aggregation`: its base metric, when the base is a catalog metric
//! - `expression`: every other catalog metric named by an identifier token of
//!   the parsed formula
//!
//! Names that are not catalog metrics (custom values) add no edge. The order is
//! Kahn's algorithm with the frontier processed in declaration order, so the
//! same catalog always yields the same order.

use crate::catalog::{MetricDefinition, MetricSource};
use crate::error::{MetricError, Result};
use crate::expr::Expr;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::warn;

/// Acyclic dependency graph with a topological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
    order: Vec<String>,
}

impl DependencyGraph {
    /// Order `nodes` (given in declaration order with their dependencies).
    ///
    /// Dependencies on names that are not nodes are ignored. Fails with
    /// [`MetricError::CircularDependency`] listing every metric that could not
    /// be ordered.
    pub fn build(nodes: Vec<(String, Vec<String>)>) -> Result<Self> {
        let position: BTreeMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();

        let mut in_degree = vec![0usize; nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for (i, (_, deps)) in nodes.iter().enumerate() {
            let unique: BTreeSet<usize> = deps
                .iter()
                .filter_map(|dep| position.get(dep.as_str()).copied())
                .collect();
            in_degree[i] = unique.len();
            for dep in unique {
                dependents[dep].push(i);
            }
        }

        let mut frontier: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(nodes.len());
        while let Some(i) = frontier.pop_front() {
            order.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    frontier.push_back(dependent);
                }
            }
        }

        if order.len() < nodes.len() {
            let unresolved = (0..nodes.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| nodes[i].0.clone())
                .collect();
            return Err(MetricError::CircularDependency { unresolved });
        }

        let order = order.into_iter().map(|i| nodes[i].0.clone()).collect();
        let edges = nodes
            .into_iter()
            .map(|(name, deps)| {
                let deps = deps
                    .into_iter()
                    .filter(|dep| position.contains_key(dep.as_str()))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                (name, deps)
            })
            .collect();
        Ok(Self { edges, order })
    }

    /// Metrics in evaluation order.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// All edges, metric to dependencies.
    pub const fn edges(&self) -> &BTreeMap<String, Vec<String>> {
        &self.edges
    }

    /// Direct dependencies of `metric`.
    pub fn dependencies(&self, metric: &str) -> &[String] {
        self.edges.get(metric).map_or(&[], Vec::as_slice)
    }

    /// Metrics that depend directly on `metric`.
    pub fn dependents(&self, metric: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| deps.iter().any(|d| d == metric))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Catalog metrics a definition depends on, by exact identifier.
///
/// `formula` is the parsed expression of an expression metric; an expression
/// that failed to parse has no dependencies.
pub fn token_dependencies(
    definition: &MetricDefinition,
    formula: Option<&Expr>,
    names: &BTreeSet<&str>,
) -> Vec<String> {
    match &definition.source {
        MetricSource::ApiField { .. } => Vec::new(),
        MetricSource::Aggregation { base_metric, .. } => vec![base_metric.clone()],
        MetricSource::Expression { .. } => formula
            .map(Expr::identifiers)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| id != &definition.name && names.contains(id.as_str()))
            .collect(),
    }
}

/// Catalog metrics whose name occurs anywhere in the formula text.
///
/// This is the legacy detection rule; it is kept only to audit drift against
/// [`token_dependencies`].
pub fn substring_dependencies(definition: &MetricDefinition, names: &BTreeSet<&str>) -> Vec<String> {
    match &definition.source {
        MetricSource::Expression { formula } => names
            .iter()
            .filter(|name| **name != definition.name && formula.contains(**name))
            .map(|name| (*name).to_string())
            .collect(),
        MetricSource::ApiField { .. } | MetricSource::Aggregation { .. } => Vec::new(),
    }
}

/// Difference between substring and token dependency detection for one
/// expression metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyDrift {
    /// Expression metric
    pub metric: String,
    /// Found by substring search only (spurious edges under the old rule)
    pub only_substring: Vec<String>,
    /// Found by token matching only (edges the old rule missed)
    pub only_token: Vec<String>,
}

/// Compare both detection rules for one metric. `None` when they agree.
pub fn audit_drift(
    definition: &MetricDefinition,
    formula: Option<&Expr>,
    names: &BTreeSet<&str>,
) -> Option<DependencyDrift> {
    if !matches!(definition.source, MetricSource::Expression { .. }) {
        return None;
    }
    let by_token: BTreeSet<String> = token_dependencies(definition, formula, names)
        .into_iter()
        .collect();
    let by_substring: BTreeSet<String> = substring_dependencies(definition, names)
        .into_iter()
        .collect();
    if by_token == by_substring {
        return None;
    }
    let drift = DependencyDrift {
        metric: definition.name.clone(),
        only_substring: by_substring.difference(&by_token).cloned().collect(),
        only_token: by_token.difference(&by_substring).cloned().collect(),
    };
    warn!(
        metric = %drift.metric,
        only_substring = ?drift.only_substring,
        only_token = ?drift.only_token,
        "dependency detection differs from substring matching"
    );
    Some(drift)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse_formula;

    fn nodes(spec: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
        spec.iter()
            .map(|(name, deps)| {
                (
                    (*name).to_string(),
                    deps.iter().map(|d| (*d).to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let graph = DependencyGraph::build(nodes(&[
            ("PSR", &["marketCap", "revenueTTM"]),
            ("revenueTTM", &["revenue"]),
            ("marketCap", &[]),
            ("revenue", &[]),
        ]))
        .unwrap();
        assert_eq!(graph.order(), ["marketCap", "revenue", "revenueTTM", "PSR"]);
        assert_eq!(graph.dependencies("PSR"), ["marketCap", "revenueTTM"]);
        assert_eq!(graph.dependents("revenue"), vec!["revenueTTM"]);
    }

    #[test]
    fn test_every_metric_after_its_dependencies() {
        let graph = DependencyGraph::build(nodes(&[
            ("e", &["d", "b"]),
            ("d", &["c"]),
            ("c", &["a", "b"]),
            ("b", &["a"]),
            ("a", &[]),
        ]))
        .unwrap();
        let position = |name: &str| graph.order().iter().position(|n| n == name).unwrap();
        for (name, deps) in graph.edges() {
            for dep in deps {
                assert!(position(dep) < position(name), "{dep} must precede {name}");
            }
        }
    }

    #[test]
    fn test_cycle_is_fatal_and_lists_members() {
        let err = DependencyGraph::build(nodes(&[("A", &["B"]), ("B", &["A"]), ("C", &[])])).unwrap_err();
        let MetricError::CircularDependency { unresolved } = err else {
            panic!("expected a cycle error");
        };
        assert_eq!(unresolved, vec!["A", "B"]);
    }

    #[test]
    fn test_external_names_add_no_edge() {
        let graph = DependencyGraph::build(nodes(&[("PSR", &["marketCap"])])).unwrap();
        assert!(graph.dependencies("PSR").is_empty());
    }

    #[test]
    fn test_edges_keep_only_unique_catalog_names() {
        let graph = DependencyGraph::build(nodes(&[
            ("upside", &["target", "price", "target", "currentPrice"]),
            ("target", &[]),
            ("price", &[]),
        ]))
        .unwrap();
        assert_eq!(graph.order(), ["target", "price", "upside"]);
        assert_eq!(graph.dependencies("upside"), ["price", "target"]);
        assert_eq!(graph.edges().len(), 3);
        assert!(graph.dependencies("price").is_empty());
    }

    #[test]
    fn test_token_dependencies_are_exact() {
        let names: BTreeSet<&str> = ["PE", "PER", "price", "revenue"].into_iter().collect();
        let def = MetricDefinition::expression("upside", "valuation", "price / PER");
        let formula = parse_formula("price / PER").unwrap();
        assert_eq!(
            token_dependencies(&def, Some(&formula), &names),
            vec!["PER", "price"]
        );
        // substring search also picks up "PE" from inside "PER"
        assert_eq!(substring_dependencies(&def, &names), vec!["PE", "PER", "price"]);

        let drift = audit_drift(&def, Some(&formula), &names).unwrap();
        assert_eq!(drift.only_substring, vec!["PE"]);
        assert!(drift.only_token.is_empty());
    }

    #[test]
    fn test_no_drift_when_rules_agree() {
        let names: BTreeSet<&str> = ["marketCap", "revenueTTM"].into_iter().collect();
        let def = MetricDefinition::expression("PSR", "valuation", "marketCap / revenueTTM");
        let formula = parse_formula("marketCap / revenueTTM").unwrap();
        assert!(audit_drift(&def, Some(&formula), &names).is_none());
    }
}
