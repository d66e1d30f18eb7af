//! Plain-text rendering for terminal output.

use std::fmt::Write;
use vantage::Assessment;
use vantage::data::Value;
use vantage::metrics::{CalculationType, CompiledCatalog, DomainMetadata};
use vantage::valuation::Signal;

fn banner(out: &mut String, title: &str) {
    let _ = writeln!(out, "\n╔══════════════════════════════════════════════════════════════╗");
    let _ = writeln!(out, "║{title:^62}║");
    let _ = writeln!(out, "╚══════════════════════════════════════════════════════════════╝\n");
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Number(n) => format!("{n:.4}"),
        other => serde_json::to_string(other).unwrap_or_else(|_| "?".to_string()),
    }
}

fn format_metadata(metadata: &DomainMetadata) -> String {
    let mut parts = Vec::new();
    if let Some(range) = metadata.date_range {
        parts.push(format!("{} to {}", range.start, range.end));
    }
    if metadata.quarter_count > 0 {
        parts.push(format!("{} quarters", metadata.quarter_count));
    }
    match metadata.calculation_type {
        CalculationType::Full => parts.push("full TTM".to_string()),
        CalculationType::Partial => parts.push("partial TTM".to_string()),
        CalculationType::NotApplicable => {}
    }
    parts.join(", ")
}

fn format_signal(signal: &Signal) -> String {
    match (signal.position, signal.disparity) {
        (Some(position), Some(disparity)) => format!("{position} ({:+.2}%)", disparity * 100.0),
        (Some(position), None) => position.to_string(),
        _ => "n/a".to_string(),
    }
}

/// Render one assessment.
pub(crate) fn render_assessment(assessment: &Assessment) -> String {
    let evaluation = &assessment.evaluation;
    let mut out = String::new();
    banner(&mut out, &format!("{} @ {}", evaluation.ticker, evaluation.as_of));

    for (domain, result) in &evaluation.domains {
        let metadata = format_metadata(&result.metadata);
        if metadata.is_empty() {
            let _ = writeln!(out, "[{domain}]");
        } else {
            let _ = writeln!(out, "[{domain}]  {metadata}");
        }
        for (metric, value) in &result.metrics {
            let _ = writeln!(out, "  {metric:<32} {}", format_value(value));
        }
        out.push('\n');
    }

    if !evaluation.warnings.is_empty() {
        let _ = writeln!(out, "Warnings:");
        for warning in &evaluation.warnings {
            let _ = writeln!(out, "  {} ({:?}): {}", warning.metric, warning.kind, warning.message);
        }
        out.push('\n');
    }

    let quantitative = &assessment.quantitative;
    let _ = writeln!(out, "Valuation:");
    match (quantitative.fair_value, quantitative.method) {
        (Some(fair_value), Some(method)) => {
            let _ = writeln!(out, "  Fair value:   {fair_value:.2} via {method}");
        }
        _ => {
            let _ = writeln!(out, "  Fair value:   n/a");
        }
    }
    let _ = writeln!(out, "  Position:     {}", format_signal(&quantitative.signal()));
    let _ = writeln!(out, "  Consensus:    {}", format_signal(&assessment.qualitative));
    out
}

/// Render the evaluation order with each metric's dependencies.
pub(crate) fn render_graph(catalog: &CompiledCatalog) -> String {
    let graph = catalog.graph();
    let mut out = String::new();
    for (i, metric) in graph.order().iter().enumerate() {
        let dependencies = graph.dependencies(metric);
        if dependencies.is_empty() {
            let _ = writeln!(out, "{:>4}. {metric}", i + 1);
        } else {
            let _ = writeln!(out, "{:>4}. {metric} <- {}", i + 1, dependencies.join(", "));
        }
    }
    out
}

/// Render catalog diagnostics; returns the report and the number of issues.
pub(crate) fn render_check(catalog: &CompiledCatalog) -> (String, usize) {
    let mut out = String::new();
    let mut issues = 0;
    let _ = writeln!(
        out,
        "{} metrics, {} active transforms, no cycles",
        catalog.metrics().len(),
        catalog.transforms().len() + catalog.rejected_transforms().len()
    );

    for (metric, error) in catalog.formula_errors() {
        issues += 1;
        let _ = writeln!(out, "  formula  {metric}: {error}");
    }
    for rejected in catalog.rejected_transforms() {
        issues += 1;
        let _ = writeln!(out, "  transform {}: {} (built-in used)", rejected.id, rejected.error);
    }
    for drift in catalog.drift() {
        issues += 1;
        let _ = writeln!(
            out,
            "  drift    {}: substring-only [{}], token-only [{}]",
            drift.metric,
            drift.only_substring.join(", "),
            drift.only_token.join(", ")
        );
    }
    if issues == 0 {
        let _ = writeln!(out, "catalog is clean");
    }
    (out, issues)
}
