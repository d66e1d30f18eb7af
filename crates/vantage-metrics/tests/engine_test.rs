//! End-to-end tests for catalog compilation and context evaluation.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use vantage_data::{CalculationContext, Record, Value};
use vantage_metrics::{
    CalculationType, MetricCatalog, MetricDefinition, MetricEngine, MetricError, MetricStatus,
    TransformDefinition, WarningKind,
};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn income(rows: &[(&str, f64)]) -> Vec<Record> {
    rows.iter()
        .map(|(d, revenue)| Record::new().with("date", *d).with("revenue", *revenue))
        .collect()
}

fn core_catalog() -> Vec<MetricDefinition> {
    vec![
        MetricDefinition::api_field("revenue", "profitability", "income", "revenue"),
        MetricDefinition::aggregation("revenueTTM", "profitability", "revenue", "ttmSumOrScaled"),
        MetricDefinition::expression("PSR", "valuation", "marketCap / revenueTTM"),
    ]
}

fn engine(metrics: Vec<MetricDefinition>, transforms: Vec<TransformDefinition>) -> MetricEngine {
    MetricEngine::new(MetricCatalog::new(metrics, transforms).unwrap().compile().unwrap())
}

fn acme() -> CalculationContext {
    CalculationContext::new("ACME", date("2024-06-30"))
        .with_series(
            "income",
            income(&[
                ("2023-06-30", 24.0),
                ("2024-03-31", 30.0),
                ("2023-09-30", 26.0),
                ("2023-12-31", 28.0),
            ]),
        )
        .with_custom_value("marketCap", 500.0)
}

#[test]
fn test_revenue_ttm_and_psr() {
    let result = engine(core_catalog(), Vec::new()).evaluate(&acme());

    assert_eq!(
        result.value("revenue"),
        Some(&Value::from(vec![30.0, 28.0, 26.0, 24.0]))
    );
    assert_relative_eq!(result.number("revenueTTM").unwrap(), 108.0);
    assert_relative_eq!(result.number("PSR").unwrap(), 500.0 / 108.0, epsilon = 1e-12);
    assert!((result.number("PSR").unwrap() - 4.63).abs() < 0.005);

    // grouped under the declared domains
    assert!(result.domains["profitability"].metrics.contains_key("revenueTTM"));
    assert!(result.domains["valuation"].metrics.contains_key("PSR"));
    assert!(result.warnings.is_empty());
    assert_eq!(result.count(MetricStatus::Computed), 3);
}

#[test]
fn test_domain_metadata() {
    let result = engine(core_catalog(), Vec::new()).evaluate(&acme());

    let profitability = &result.domains["profitability"].metadata;
    assert_eq!(profitability.quarter_count, 4);
    assert_eq!(profitability.calculation_type, CalculationType::Full);
    let range = profitability.date_range.unwrap();
    assert_eq!(range.start, date("2023-06-30"));
    assert_eq!(range.end, date("2024-03-31"));

    // PSR inherits the date range of revenueTTM but has no TTM of its own
    let valuation = &result.domains["valuation"].metadata;
    assert_eq!(valuation.calculation_type, CalculationType::NotApplicable);
    assert_eq!(valuation.date_range, Some(range));
}

#[test]
fn test_no_lookahead() {
    // As of 2024-01-15 only three quarters were published; TTM is scaled
    let context = CalculationContext {
        as_of: date("2024-01-15"),
        ..acme()
    };
    let result = engine(core_catalog(), Vec::new()).evaluate(&context);

    assert_eq!(
        result.value("revenue"),
        Some(&Value::from(vec![28.0, 26.0, 24.0]))
    );
    assert_relative_eq!(result.number("revenueTTM").unwrap(), 78.0 / 3.0 * 4.0, epsilon = 1e-9);
    assert_eq!(
        result.domains["profitability"].metadata.calculation_type,
        CalculationType::Partial
    );
}

#[test]
fn test_missing_source_is_quiet_null() {
    let context = CalculationContext::new("EMPTY", date("2024-06-30")).with_custom_value("marketCap", 500.0);
    let result = engine(core_catalog(), Vec::new()).evaluate(&context);

    assert_eq!(result.value("revenue"), Some(&Value::Null));
    assert_eq!(result.value("revenueTTM"), Some(&Value::Null));
    assert_eq!(result.value("PSR"), Some(&Value::Null));
    assert_eq!(result.status("PSR"), Some(MetricStatus::Null));
    assert!(result.warnings.is_empty());
}

#[test]
fn test_failures_are_metric_local() {
    let mut metrics = core_catalog();
    metrics.push(MetricDefinition::expression("broken", "valuation", "marketCap / "));
    metrics.push(MetricDefinition::expression("unknown", "valuation", "nosuchMetric * 2"));
    metrics.push(MetricDefinition::aggregation("median", "profitability", "revenue", "medianFromQuarter"));
    let result = engine(metrics, Vec::new()).evaluate(&acme());

    assert_relative_eq!(result.number("revenueTTM").unwrap(), 108.0);
    assert_eq!(result.status("broken"), Some(MetricStatus::Failed));
    assert_eq!(result.status("unknown"), Some(MetricStatus::Failed));
    assert_eq!(result.status("median"), Some(MetricStatus::Failed));

    let kinds: Vec<_> = result.warnings.iter().map(|w| (w.metric.as_str(), w.kind)).collect();
    assert!(kinds.contains(&("broken", WarningKind::Parse)));
    assert!(kinds.contains(&("unknown", WarningKind::Expression)));
    assert!(kinds.contains(&("median", WarningKind::Aggregation)));
}

#[test]
fn test_dynamic_transform_and_fallback() {
    let metrics = vec![
        MetricDefinition::api_field("revenue", "profitability", "income", "revenue"),
        MetricDefinition::aggregation("revenueTTM", "profitability", "revenue", "ttmSumOrScaled"),
        MetricDefinition::aggregation("revenueGrowth", "momentum", "revenue", "qoqFromQuarter"),
    ];
    let transforms = vec![
        // halves the TTM so the override is observable
        TransformDefinition::new("ttmSumOrScaled", "result = sum(quarterly_values[:4]) / 2"),
        TransformDefinition::new("qoqFromQuarter", "return quarterly_values[0] / (quarterly_values[1] - 28)"),
    ];
    let result = engine(metrics, transforms).evaluate(&acme());

    assert_relative_eq!(result.number("revenueTTM").unwrap(), 54.0);
    // transform divides by zero, built-in qoq is used
    assert_relative_eq!(result.number("revenueGrowth").unwrap(), 2.0 / 28.0, epsilon = 1e-12);
    assert_eq!(result.status("revenueGrowth"), Some(MetricStatus::Computed));
    assert_eq!(result.warnings[0].kind, WarningKind::TransformFallback);
}

#[test]
fn test_custom_values_feed_expressions() {
    let metrics = vec![
        MetricDefinition::expression("upside", "consensus", "if price > 0 then target / price - 1 else null"),
    ];
    let context = CalculationContext::new("ACME", date("2024-06-30"))
        .with_custom_value("price", 80.0)
        .with_custom_value("target", 100.0);
    let result = engine(metrics, Vec::new()).evaluate(&context);
    assert_relative_eq!(result.number("upside").unwrap(), 0.25);
}

#[test]
fn test_snapshot_quote_passes_through() {
    let metrics = vec![
        MetricDefinition::api_field("price", "valuation", "quote", "price"),
        MetricDefinition::api_field("eps", "valuation", "income", "eps"),
        MetricDefinition::aggregation("epsTTM", "valuation", "eps", "ttmSumOrScaled"),
        MetricDefinition::expression("PER", "valuation", "if epsTTM > 0 then price / epsTTM else null"),
    ];
    let context = CalculationContext::new("ACME", date("2024-06-30"))
        .with_series("quote", Record::new().with("price", 50.0))
        .with_series(
            "income",
            vec![
                Record::new().with("date", "2024-03-31").with("eps", 1.5),
                Record::new().with("date", "2023-12-31").with("eps", 1.0),
            ],
        );
    let result = engine(metrics, Vec::new()).evaluate(&context);

    assert_eq!(result.number("price"), Some(50.0));
    assert_relative_eq!(result.number("epsTTM").unwrap(), 5.0);
    assert_relative_eq!(result.number("PER").unwrap(), 10.0);
}

#[test]
fn test_cycle_fails_before_evaluation() {
    let err = MetricCatalog::new(
        vec![
            MetricDefinition::expression("A", "d", "B + 1"),
            MetricDefinition::expression("B", "d", "A + 1"),
            MetricDefinition::api_field("C", "d", "s", "f"),
        ],
        Vec::new(),
    )
    .unwrap()
    .compile()
    .unwrap_err();

    match err {
        MetricError::CircularDependency { unresolved } => assert_eq!(unresolved, ["A", "B"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_evaluation_is_idempotent() {
    let engine = engine(core_catalog(), Vec::new());
    let context = acme();
    let first = engine.evaluate(&context);
    let second = engine.evaluate(&context);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_catalog_from_json() {
    let catalog = MetricCatalog::from_json_str(
        r#"{
            "metrics": [
                {"name": "revenue", "domain": "profitability", "sourceKind": "apiField",
                 "source": "income", "field": "revenue"},
                {"name": "revenueTTM", "domain": "profitability", "sourceKind": "aggregation",
                 "baseMetricId": "revenue", "aggregationKind": "ttm_sum_or_scaled",
                 "aggregationParams": {"window": 2, "scaleTo": 2}},
                {"name": "PSR", "domain": "valuation", "sourceKind": "expression",
                 "formula": "marketCap / revenueTTM"}
            ]
        }"#,
    )
    .unwrap();
    let result = MetricEngine::new(catalog.compile().unwrap()).evaluate(&acme());
    assert_relative_eq!(result.number("revenueTTM").unwrap(), 58.0);
}
