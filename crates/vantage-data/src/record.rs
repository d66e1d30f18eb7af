//! Raw time-series records and series containers.

use crate::error::{DataError, Result};
use crate::value::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of an upstream data source (e.g. `"income-statement"`, `"quote"`).
pub type SourceId = String;

/// One row of a source: a map of named fields.
///
/// Statement rows carry a date field; snapshot rows (a live quote, for example)
/// do not.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub const fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Look up a field by dotted path, walking nested maps (`"ratios.pe"`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_map()?.get(part)?;
        }
        Some(current)
    }

    /// All fields of the record.
    pub const fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Parse the record's date.
    ///
    /// Returns `Ok(None)` when the field is absent or null. Accepts `YYYY-MM-DD`
    /// optionally followed by a time component (`2024-03-31T00:00:00`,
    /// `2024-03-31 16:00:00`).
    pub fn date(&self, field: &str) -> Result<Option<NaiveDate>> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Text(raw)) => {
                let day = raw.get(..10).unwrap_or(raw.as_str());
                NaiveDate::parse_from_str(day, "%Y-%m-%d")
                    .map(Some)
                    .map_err(|_| DataError::InvalidDate {
                        field: field.to_string(),
                        value: raw.clone(),
                    })
            }
            Some(other) => Err(DataError::InvalidDate {
                field: field.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Raw input for one source: either a list of records or a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSeries {
    /// Time series of records (statements, historical quotes)
    Records(Vec<Record>),
    /// Single current-state record, never date-filtered
    Snapshot(Record),
}

impl RawSeries {
    /// Number of records in the series (1 for a snapshot).
    pub fn len(&self) -> usize {
        match self {
            Self::Records(records) => records.len(),
            Self::Snapshot(_) => 1,
        }
    }

    /// Returns true if the series holds no records.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Records(records) if records.is_empty())
    }
}

impl From<Vec<Record>> for RawSeries {
    fn from(records: Vec<Record>) -> Self {
        Self::Records(records)
    }
}

impl From<Record> for RawSeries {
    fn from(record: Record) -> Self {
        Self::Snapshot(record)
    }
}
