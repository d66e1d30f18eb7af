//! Benchmarks for catalog compilation and context evaluation.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use vantage_data::{CalculationContext, Record};
use vantage_metrics::{MetricCatalog, MetricDefinition, MetricEngine, TransformDefinition};

const FIELDS: [&str; 6] = ["revenue", "netIncome", "operatingIncome", "eps", "equity", "shares"];

fn catalog() -> MetricCatalog {
    let mut metrics = Vec::new();
    for field in FIELDS {
        metrics.push(MetricDefinition::api_field(field, "raw", "income", field));
        for kind in ["ttmSumOrScaled", "avgFromQuarter", "qoqFromQuarter", "yoyFromQuarter"] {
            metrics.push(MetricDefinition::aggregation(
                format!("{field}_{kind}"),
                "profitability",
                field,
                kind,
            ));
        }
    }
    metrics.push(MetricDefinition::api_field("price", "valuation", "quote", "price"));
    metrics.push(MetricDefinition::expression(
        "PER",
        "valuation",
        "if eps_ttmSumOrScaled > 0 then price / eps_ttmSumOrScaled else null",
    ));
    metrics.push(MetricDefinition::expression(
        "PBR",
        "valuation",
        "price * shares_avgFromQuarter / equity_avgFromQuarter",
    ));
    metrics.push(MetricDefinition::expression(
        "margin",
        "profitability",
        "round(operatingIncome_ttmSumOrScaled / revenue_ttmSumOrScaled, 4)",
    ));
    let transforms = vec![TransformDefinition::new(
        "avgFromQuarter",
        "w = get(params, 'window', 4)\nvalues = quarterly_values[:w]\nreturn sum(values) / len(values)",
    )];
    MetricCatalog::new(metrics, transforms).unwrap()
}

fn context() -> CalculationContext {
    let records: Vec<Record> = (0..12)
        .map(|q| {
            let mut record = Record::new().with("date", format!("{}-{:02}-28", 2021 + q / 4, (q % 4) * 3 + 3));
            for (i, field) in FIELDS.iter().enumerate() {
                record.insert(*field, 100.0 + (q * 7 + i as i32 * 3) as f64);
            }
            record
        })
        .collect();
    CalculationContext::new("BENCH", "2024-06-30".parse().unwrap())
        .with_series("income", records)
        .with_series("quote", Record::new().with("price", 42.0))
}

fn bench_engine(c: &mut Criterion) {
    c.bench_function("catalog_compile", |b| b.iter(|| black_box(catalog()).compile().unwrap()));

    let engine = MetricEngine::new(catalog().compile().unwrap());
    let context = context();
    c.bench_function("engine_evaluate", |b| b.iter(|| engine.evaluate(black_box(&context))));
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
