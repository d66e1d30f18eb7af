//! Per-evaluation input.

use crate::error::Result;
use crate::record::{RawSeries, SourceId};
use crate::temporal::TemporalFilter;
use crate::value::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Everything the engine needs to evaluate one `(ticker, as-of date)` pair.
///
/// Created per evaluation and never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationContext {
    /// Ticker symbol
    pub ticker: String,
    /// Reference date; statement data published later is invisible
    #[serde(alias = "asOfDate", alias = "as_of")]
    pub as_of: NaiveDate,
    /// Raw series keyed by source id
    #[serde(default, alias = "rawSeriesBySourceId", alias = "raw_series")]
    pub raw_series: BTreeMap<SourceId, RawSeries>,
    /// Precomputed values visible to expressions as if they were metrics
    #[serde(default, alias = "custom_values")]
    pub custom_values: BTreeMap<String, Value>,
}

impl CalculationContext {
    /// Create an empty context.
    pub fn new(ticker: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            as_of,
            raw_series: BTreeMap::new(),
            custom_values: BTreeMap::new(),
        }
    }

    /// Attach a raw series.
    pub fn with_series(mut self, source: impl Into<SourceId>, series: impl Into<RawSeries>) -> Self {
        self.raw_series.insert(source.into(), series.into());
        self
    }

    /// Attach a precomputed value.
    pub fn with_custom_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_values.insert(name.into(), value.into());
        self
    }

    /// Raw series restricted to data valid as of [`Self::as_of`].
    pub fn filtered_series(&self, filter: &TemporalFilter) -> BTreeMap<SourceId, RawSeries> {
        self.raw_series
            .iter()
            .map(|(source, series)| (source.clone(), filter.filter(series, self.as_of)))
            .collect()
    }

    /// Parse a context from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a list of contexts from JSON (a single object is accepted too).
    pub fn many_from_json_str(json: &str) -> Result<Vec<Self>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<CalculationContext>),
            One(Box<CalculationContext>),
        }

        Ok(match serde_json::from_str(json)? {
            OneOrMany::Many(contexts) => contexts,
            OneOrMany::One(context) => vec![*context],
        })
    }

    /// Read a context file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    const CONTEXT: &str = r#"{
        "ticker": "ACME",
        "asOfDate": "2024-03-01",
        "rawSeriesBySourceId": {
            "income-statement": [
                {"date": "2024-01-01", "revenue": 30},
                {"date": "2024-06-01", "revenue": 32}
            ],
            "quote": {"marketCap": 500}
        },
        "customValues": {"priceTarget": 120}
    }"#;

    #[test]
    fn test_parse_original_field_names() {
        let context = CalculationContext::from_json_str(CONTEXT).unwrap();
        assert_eq!(context.ticker, "ACME");
        assert_eq!(context.as_of, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(context.raw_series.len(), 2);
        assert_eq!(context.custom_values["priceTarget"], Value::Number(120.0));
    }

    #[test]
    fn test_filtered_series() {
        let context = CalculationContext::from_json_str(CONTEXT).unwrap();
        let filtered = context.filtered_series(&TemporalFilter::default());
        assert_eq!(filtered["income-statement"].len(), 1);
        assert_eq!(filtered["quote"].len(), 1);
        // the context itself is untouched
        assert_eq!(context.raw_series["income-statement"].len(), 2);
    }

    #[test]
    fn test_builder() {
        let context = CalculationContext::new("ACME", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .with_series("quote", Record::new().with("price", 10.0))
            .with_custom_value("priceTarget", 12.0);
        assert!(matches!(context.raw_series["quote"], RawSeries::Snapshot(_)));
        assert_eq!(context.custom_values.len(), 1);
    }

    #[test]
    fn test_many_accepts_single_object() {
        let contexts = CalculationContext::many_from_json_str(CONTEXT).unwrap();
        assert_eq!(contexts.len(), 1);
    }
}
