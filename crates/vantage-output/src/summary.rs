//! Batch summary across evaluated contexts.
//!
//! Tallies per-metric statuses and collects contexts that could not be
//! evaluated at all (timeouts, cancellation, malformed input), so a batch run
//! can report coverage without re-reading every result.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use vantage_metrics::{EvaluationResult, MetricStatus};

/// Status counts of one metric across a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTally {
    /// Contexts where the metric has a value.
    pub computed: usize,

    /// Contexts where the metric is null for lack of input.
    pub null: usize,

    /// Contexts where the metric failed with a warning.
    pub failed: usize,
}

impl MetricTally {
    /// Record one status.
    pub const fn add(&mut self, status: MetricStatus) {
        match status {
            MetricStatus::Computed => self.computed += 1,
            MetricStatus::Null => self.null += 1,
            MetricStatus::Failed => self.failed += 1,
        }
    }

    /// Contexts seen.
    pub const fn total(&self) -> usize {
        self.computed + self.null + self.failed
    }

    /// Fraction of contexts with a value.
    pub fn coverage(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.computed as f64 / total as f64,
        }
    }
}

/// A context that produced no evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFailure {
    /// Ticker of the context.
    pub ticker: String,

    /// As-of date of the context.
    pub as_of: NaiveDate,

    /// Why the context was not evaluated.
    pub reason: String,
}

/// Coverage report of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Contexts evaluated.
    pub evaluated: usize,

    /// Warnings across all evaluated contexts.
    pub warnings: usize,

    /// Per-metric status counts.
    pub metrics: BTreeMap<String, MetricTally>,

    /// Contexts that produced no evaluation.
    pub failures: Vec<ContextFailure>,
}

impl BatchSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one evaluation into the summary.
    pub fn record(&mut self, result: &EvaluationResult) {
        self.evaluated += 1;
        self.warnings += result.warnings.len();
        for (metric, status) in &result.statuses {
            self.metrics.entry(metric.clone()).or_default().add(*status);
        }
    }

    /// Record a context that produced no evaluation.
    pub fn record_failure(&mut self, ticker: impl Into<String>, as_of: NaiveDate, reason: impl Into<String>) {
        self.failures.push(ContextFailure {
            ticker: ticker.into(),
            as_of,
            reason: reason.into(),
        });
    }

    /// Contexts submitted, evaluated or not.
    pub fn total(&self) -> usize {
        self.evaluated + self.failures.len()
    }

    /// Format the summary as an ASCII table.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();

        output.push_str("\nBatch Summary\n");
        output.push_str(&"=".repeat(80));
        output.push('\n');
        output.push_str(&format!("  Contexts submitted:       {}\n", self.total()));
        output.push_str(&format!("  Contexts evaluated:       {}\n", self.evaluated));
        output.push_str(&format!("  Contexts failed:          {}\n", self.failures.len()));
        output.push_str(&format!("  Metric warnings:          {}\n", self.warnings));

        if !self.metrics.is_empty() {
            output.push_str("\nMetric Coverage:\n");
            output.push_str(&"-".repeat(80));
            output.push('\n');
            output.push_str(&format!(
                "  {:<36} {:>9} {:>9} {:>9} {:>10}\n",
                "Metric", "Computed", "Null", "Failed", "Coverage"
            ));
            output.push_str(&"-".repeat(80));
            output.push('\n');
            for (metric, tally) in &self.metrics {
                output.push_str(&format!(
                    "  {:<36} {:>9} {:>9} {:>9} {:>9.1}%\n",
                    metric,
                    tally.computed,
                    tally.null,
                    tally.failed,
                    tally.coverage() * 100.0
                ));
            }
        }

        if !self.failures.is_empty() {
            output.push_str("\nFailed Contexts:\n");
            output.push_str(&"-".repeat(80));
            output.push('\n');
            for failure in &self.failures {
                output.push_str(&format!(
                    "  {} @ {}: {}\n",
                    failure.ticker, failure.as_of, failure.reason
                ));
            }
        }

        output.push_str(&"=".repeat(80));
        output.push('\n');
        output
    }

    /// Format the summary as a Markdown table.
    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str("## Batch Summary\n\n");
        output.push_str(&format!(
            "{} of {} contexts evaluated, {} warnings.\n\n",
            self.evaluated,
            self.total(),
            self.warnings
        ));
        output.push_str("| Metric | Computed | Null | Failed | Coverage |\n");
        output.push_str("|--------|---------:|-----:|-------:|---------:|\n");
        for (metric, tally) in &self.metrics {
            output.push_str(&format!(
                "| {} | {} | {} | {} | {:.1}% |\n",
                metric,
                tally.computed,
                tally.null,
                tally.failed,
                tally.coverage() * 100.0
            ));
        }
        output
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} contexts evaluated, {} failed, {} warnings",
            self.evaluated,
            self.total(),
            self.failures.len(),
            self.warnings
        )
    }
}
