//! CSV and JSON export of evaluation results.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use vantage_data::Value;
use vantage_metrics::{EvaluationResult, MetricStatus};
use vantage_valuation::{Multiple, Position, Signal, Valuation};

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer produced invalid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }

    /// Guess the format from a file extension, defaulting to pretty JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::PrettyJson,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" | "prettyjson" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// One metric of one evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRow {
    /// Ticker symbol.
    pub ticker: String,

    /// As-of date of the evaluation.
    pub as_of: NaiveDate,

    /// Metric domain.
    pub domain: String,

    /// Metric name.
    pub metric: String,

    /// Numeric value, empty for null or non-numeric values.
    pub value: Option<f64>,

    /// JSON rendering of list, map, text and boolean values.
    pub detail: Option<String>,

    /// Evaluation status.
    pub status: MetricStatus,
}

impl MetricRow {
    /// Flatten an evaluation into rows, ordered by domain then metric.
    pub fn from_evaluation(result: &EvaluationResult) -> Vec<Self> {
        result
            .domains
            .iter()
            .flat_map(|(domain, metrics)| {
                metrics.metrics.iter().map(move |(metric, value)| Self {
                    ticker: result.ticker.clone(),
                    as_of: result.as_of,
                    domain: domain.clone(),
                    metric: metric.clone(),
                    value: value.as_f64(),
                    detail: detail(value),
                    status: result.status(metric).unwrap_or(MetricStatus::Null),
                })
            })
            .collect()
    }
}

fn detail(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Number(_) => None,
        other => serde_json::to_string(other).ok(),
    }
}

/// Quantitative and qualitative signals of one context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValuationRow {
    /// Ticker symbol.
    pub ticker: String,

    /// As-of date.
    pub as_of: NaiveDate,

    /// Multiple-based fair value.
    pub fair_value: Option<f64>,

    /// Multiple used for the fair value.
    pub method: Option<Multiple>,

    /// Position implied by the fair value.
    pub position: Option<Position>,

    /// Fair-value disparity.
    pub disparity: Option<f64>,

    /// Position implied by the consensus target.
    pub consensus_position: Option<Position>,

    /// Consensus disparity.
    pub consensus_disparity: Option<f64>,
}

impl ValuationRow {
    /// Combine both derivation paths for one context.
    pub fn new(ticker: String, as_of: NaiveDate, quantitative: &Valuation, qualitative: &Signal) -> Self {
        Self {
            ticker,
            as_of,
            fair_value: quantitative.fair_value,
            method: quantitative.method,
            position: quantitative.position,
            disparity: quantitative.disparity,
            consensus_position: qualitative.position,
            consensus_disparity: qualitative.disparity,
        }
    }
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

fn csv_string<T: Serialize>(records: &[T]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

impl Exporter for Vec<MetricRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_string(self),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for Vec<ValuationRow> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_string(self),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for EvaluationResult {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => csv_string(&MetricRow::from_evaluation(self)),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use vantage_metrics::DomainResult;

    fn evaluation() -> EvaluationResult {
        let mut metrics = BTreeMap::new();
        metrics.insert("PSR".to_string(), Value::Number(4.63));
        metrics.insert("revenue".to_string(), Value::from(vec![30.0, 28.0]));
        let mut statuses = BTreeMap::new();
        statuses.insert("PSR".to_string(), MetricStatus::Computed);
        statuses.insert("revenue".to_string(), MetricStatus::Computed);
        EvaluationResult {
            ticker: "ACME".to_string(),
            as_of: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            domains: [(
                "valuation".to_string(),
                DomainResult {
                    metrics,
                    ..DomainResult::default()
                },
            )]
            .into(),
            statuses,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_rows_from_evaluation() {
        let rows = MetricRow::from_evaluation(&evaluation());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metric, "PSR");
        assert_eq!(rows[0].value, Some(4.63));
        assert_eq!(rows[1].detail.as_deref(), Some("[30.0,28.0]"));
    }

    #[test]
    fn test_csv_export() {
        let csv = evaluation().export_to_string(ExportFormat::Csv).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("ticker,as_of,domain,metric,value,detail,status")
        );
        assert_eq!(lines.next(), Some("ACME,2024-06-30,valuation,PSR,4.63,,computed"));
    }

    #[test]
    fn test_json_export() {
        let json = evaluation().export_to_string(ExportFormat::Json).unwrap();
        assert!(json.contains("\"asOf\":\"2024-06-30\""));
        let pretty = evaluation().export_to_string(ExportFormat::PrettyJson).unwrap();
        assert!(pretty.contains("  "));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("out.json")), ExportFormat::PrettyJson);
        assert!("xml".parse::<ExportFormat>().is_err());
    }
}
