//! Integration tests for evaluation export and batch summaries.

use chrono::NaiveDate;
use vantage_data::{CalculationContext, Record};
use vantage_metrics::{MetricCatalog, MetricDefinition, MetricEngine, MetricStatus};
use vantage_output::{BatchSummary, ExportFormat, Exporter, MetricRow, ValuationRow};
use vantage_valuation::{SectorAverages, ValuationDeriver, derive_consensus};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn engine() -> MetricEngine {
    let catalog = MetricCatalog::new(
        vec![
            MetricDefinition::api_field("revenue", "profitability", "income", "revenue"),
            MetricDefinition::aggregation("revenueTTM", "profitability", "revenue", "ttmSumOrScaled"),
            MetricDefinition::expression("PSR", "valuation", "marketCap / revenueTTM"),
        ],
        Vec::new(),
    )
    .unwrap();
    MetricEngine::new(catalog.compile().unwrap())
}

fn context(ticker: &str, revenue: f64) -> CalculationContext {
    CalculationContext::new(ticker, date("2024-06-30"))
        .with_series(
            "income",
            vec![
                Record::new().with("date", "2024-03-31").with("revenue", revenue),
                Record::new().with("date", "2023-12-31").with("revenue", revenue),
            ],
        )
        .with_custom_value("marketCap", 400.0)
}

#[test]
fn test_evaluation_to_csv_and_summary() {
    let engine = engine();
    let results: Vec<_> = [context("ACME", 25.0), context("NOREV", 0.0)]
        .iter()
        .map(|ctx| engine.evaluate(ctx))
        .collect();

    let rows: Vec<MetricRow> = results.iter().flat_map(MetricRow::from_evaluation).collect();
    assert_eq!(rows.len(), 6);

    let csv = rows.export_to_string(ExportFormat::Csv).unwrap();
    assert!(csv.contains("ACME,2024-06-30,profitability,revenueTTM,100.0,,computed"));
    // zero revenue gives a quiet null PSR
    assert!(csv.contains("NOREV,2024-06-30,valuation,PSR,,,null"));

    let mut summary = BatchSummary::new();
    for result in &results {
        summary.record(result);
    }
    summary.record_failure("LATE", date("2024-06-30"), "timed out");

    assert_eq!(summary.metrics["PSR"].computed, 1);
    assert_eq!(summary.metrics["PSR"].null, 1);
    assert_eq!(summary.total(), 3);
    assert!(summary.to_ascii_table().contains("LATE @ 2024-06-30: timed out"));
    assert_eq!(results[0].status("PSR"), Some(MetricStatus::Computed));
}

#[test]
fn test_valuation_rows_and_file_export() {
    let engine = engine();
    let result = engine.evaluate(&context("ACME", 25.0));
    let sector = SectorAverages::from([("PSR", 6.0)]);
    let quantitative = ValuationDeriver::default().derive(&result.flattened(), &sector, Some(80.0));
    let qualitative = derive_consensus(Some(88.0), Some(80.0));

    let rows = vec![ValuationRow::new(result.ticker.clone(), result.as_of, &quantitative, &qualitative)];
    let path = std::env::temp_dir().join(format!("vantage-valuation-{}.json", std::process::id()));
    rows.export_to_file(&path, ExportFormat::from_path(&path)).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    let parsed: Vec<ValuationRow> = serde_json::from_str(&written).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(parsed, rows);
    assert!(parsed[0].fair_value.is_some());
    assert_eq!(parsed[0].consensus_disparity, Some(0.1));
}
