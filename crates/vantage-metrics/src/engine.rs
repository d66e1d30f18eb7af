//! Metric calculation engine.
//!
//! Walks the compiled catalog in topological order for one calculation
//! context, dispatching each metric to field extraction, aggregation or
//! formula evaluation, then groups the results by domain. Evaluation is pure:
//! the compiled catalog is only read and every call owns its own state.

use crate::aggregation::{AggregationExecutor, AggregationIssue};
use crate::catalog::{CompiledCatalog, CompiledMetric, MetricSource};
use crate::config::EngineConfig;
use crate::evaluator::{ExpressionEvaluator, MetricScope};
use crate::result::{
    CalculationType, CalculationWarning, DomainResult, EvaluationResult,
    MetricStatus, WarningKind,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};
use vantage_data::{
    CalculationContext, DateRange, FieldKey, RawSeries, SourceId, TemporalFilter, Value, extract,
};

/// Data footprint of one computed metric, used for domain metadata.
#[derive(Debug, Clone, Copy, Default)]
struct Provenance {
    date_range: Option<DateRange>,
    quarters: usize,
    /// `Some(scaled)` for a non-null TTM aggregation
    ttm: Option<bool>,
}

/// Value, status and footprint of one metric.
struct Computed {
    value: Value,
    status: MetricStatus,
    provenance: Provenance,
}

impl Computed {
    fn new(value: Value, provenance: Provenance) -> Self {
        let status = if value.is_null() {
            MetricStatus::Null
        } else {
            MetricStatus::Computed
        };
        Self {
            value,
            status,
            provenance,
        }
    }

    fn failed() -> Self {
        Self {
            value: Value::Null,
            status: MetricStatus::Failed,
            provenance: Provenance::default(),
        }
    }
}

/// Evaluates calculation contexts against a shared compiled catalog.
///
/// Cheap to clone; clones share the catalog.
#[derive(Debug, Clone)]
pub struct MetricEngine {
    catalog: Arc<CompiledCatalog>,
    config: EngineConfig,
    filter: TemporalFilter,
}

impl MetricEngine {
    /// Engine with the default configuration.
    pub fn new(catalog: CompiledCatalog) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    /// Engine with a custom configuration.
    pub fn with_config(catalog: CompiledCatalog, config: EngineConfig) -> Self {
        Self::shared(Arc::new(catalog), config)
    }

    /// Engine over an already shared catalog.
    pub fn shared(catalog: Arc<CompiledCatalog>, config: EngineConfig) -> Self {
        let filter = TemporalFilter::new(config.date_field.clone());
        Self {
            catalog,
            config,
            filter,
        }
    }

    /// Compiled catalog.
    pub const fn catalog(&self) -> &Arc<CompiledCatalog> {
        &self.catalog
    }

    /// Engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate every catalog metric for `context`.
    ///
    /// Metric-local failures resolve to null and are reported in
    /// [`EvaluationResult::warnings`]; nothing here fails the whole call.
    pub fn evaluate(&self, context: &CalculationContext) -> EvaluationResult {
        let series = context.filtered_series(&self.filter);
        let executor = AggregationExecutor::new(
            self.catalog.transforms(),
            self.config.ttm_defaults,
            self.config.eval_budget,
        );
        let evaluator = ExpressionEvaluator::new(self.config.eval_budget);

        let mut values: BTreeMap<String, Value> = BTreeMap::new();
        let mut provenance: BTreeMap<String, Provenance> = BTreeMap::new();
        let mut statuses: BTreeMap<String, MetricStatus> = BTreeMap::new();
        let mut warnings = Vec::new();

        for metric in self.catalog.order() {
            let name = &metric.definition.name;
            let mut warn_as = |kind: WarningKind, message: String| {
                warn!(ticker = %context.ticker, metric = %name, ?kind, "{message}");
                warnings.push(CalculationWarning {
                    metric: name.clone(),
                    kind,
                    message,
                });
            };

            let computed = match &metric.definition.source {
                MetricSource::ApiField { source, field } => self.extract_field(&series, source, field),
                MetricSource::Aggregation {
                    base_metric,
                    kind,
                    params,
                } => {
                    let base = values.get(base_metric).or_else(|| context.custom_values.get(base_metric));
                    match base.map(|v| (v.is_null(), v.numeric_series())) {
                        None => {
                            warn_as(
                                WarningKind::InvalidInput,
                                format!("base metric '{base_metric}' is not defined"),
                            );
                            Computed::failed()
                        }
                        Some((true, _)) => Computed::new(Value::Null, Provenance::default()),
                        Some((false, None)) => {
                            warn_as(
                                WarningKind::InvalidInput,
                                format!("base metric '{base_metric}' is not numeric"),
                            );
                            Computed::failed()
                        }
                        Some((false, Some(quarterly))) => {
                            let aggregated = executor.aggregate(kind, &quarterly, params);
                            let status_override = match &aggregated.issue {
                                None => None,
                                Some(issue @ AggregationIssue::TransformFallback { .. }) => {
                                    warn_as(WarningKind::TransformFallback, issue.to_string());
                                    None
                                }
                                Some(issue) => {
                                    warn_as(WarningKind::Aggregation, issue.to_string());
                                    Some(MetricStatus::Failed)
                                }
                            };
                            let base_range = provenance
                                .get(base_metric)
                                .and_then(|p| p.date_range);
                            let outcome = aggregated.outcome;
                            let footprint = Provenance {
                                date_range: base_range,
                                quarters: outcome.quarters_used,
                                ttm: (aggregated.ttm && !outcome.value.is_null()).then_some(outcome.scaled),
                            };
                            let mut computed = Computed::new(outcome.value, footprint);
                            if let Some(status) = status_override {
                                computed.status = status;
                            }
                            computed
                        }
                    }
                }
                MetricSource::Expression { .. } => match &metric.formula {
                    Some(Ok(formula)) => {
                        let scope = MetricScope::new(&values, &context.custom_values);
                        let date_range = self.dependency_range(metric, &provenance);
                        match evaluator.evaluate(formula, &scope) {
                            Ok(value) => Computed::new(
                                value,
                                Provenance {
                                    date_range,
                                    ..Provenance::default()
                                },
                            ),
                            Err(err) if err.is_quiet() => {
                                debug!(ticker = %context.ticker, metric = %name, error = %err, "metric resolved to null");
                                Computed::new(Value::Null, Provenance::default())
                            }
                            Err(err) => {
                                warn_as(WarningKind::Expression, err.to_string());
                                Computed::failed()
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn_as(WarningKind::Parse, err.to_string());
                        Computed::failed()
                    }
                    None => Computed::failed(),
                },
            };

            statuses.insert(name.clone(), computed.status);
            provenance.insert(name.clone(), computed.provenance);
            values.insert(name.clone(), computed.value);
        }

        let result = self.group(context, values, &provenance, statuses, warnings);
        debug!(
            ticker = %result.ticker,
            as_of = %result.as_of,
            computed = result.count(MetricStatus::Computed),
            failed = result.count(MetricStatus::Failed),
            "context evaluated"
        );
        result
    }

    fn extract_field(&self, series: &BTreeMap<SourceId, RawSeries>, source: &str, field: &FieldKey) -> Computed {
        let Some(raw) = series.get(source) else {
            return Computed::new(Value::Null, Provenance::default());
        };
        let extraction = extract(raw, field, &self.config.date_field);
        Computed::new(
            extraction.value,
            Provenance {
                date_range: extraction.date_range,
                ..Provenance::default()
            },
        )
    }

    /// Union of the date ranges of a metric's catalog dependencies.
    fn dependency_range(
        &self,
        metric: &CompiledMetric,
        provenance: &BTreeMap<String, Provenance>,
    ) -> Option<DateRange> {
        self.catalog
            .graph()
            .dependencies(&metric.definition.name)
            .iter()
            .filter_map(|dep| provenance.get(dep).and_then(|p| p.date_range))
            .fold(None, |acc, range| DateRange::merge(acc, Some(range)))
    }

    fn group(
        &self,
        context: &CalculationContext,
        mut values: BTreeMap<String, Value>,
        provenance: &BTreeMap<String, Provenance>,
        statuses: BTreeMap<String, MetricStatus>,
        warnings: Vec<CalculationWarning>,
    ) -> EvaluationResult {
        let mut domains: BTreeMap<String, DomainResult> = BTreeMap::new();
        for metric in self.catalog.metrics() {
            let name = &metric.definition.name;
            let domain = domains.entry(metric.definition.domain.clone()).or_default();
            domain
                .metrics
                .insert(name.clone(), values.remove(name).unwrap_or_default());

            let footprint = provenance.get(name).copied().unwrap_or_default();
            let metadata = &mut domain.metadata;
            metadata.date_range = DateRange::merge(metadata.date_range, footprint.date_range);
            metadata.quarter_count = metadata.quarter_count.max(footprint.quarters);
            metadata.calculation_type = match (metadata.calculation_type, footprint.ttm) {
                (_, None) => metadata.calculation_type,
                (_, Some(true)) | (CalculationType::Partial, Some(false)) => CalculationType::Partial,
                (_, Some(false)) => CalculationType::Full,
            };
        }

        EvaluationResult {
            ticker: context.ticker.clone(),
            as_of: context.as_of,
            domains,
            statuses,
            warnings,
        }
    }
}

impl From<CompiledCatalog> for MetricEngine {
    fn from(catalog: CompiledCatalog) -> Self {
        Self::new(catalog)
    }
}

