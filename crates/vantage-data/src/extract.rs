//! Field extraction for raw-source metrics.
//!
//! A [`FieldKey`] either names a single (possibly dotted) field or maps output
//! keys to nested keys. Applied to a list series it yields one entry per record,
//! most-recent-first; applied to a snapshot it yields a single value.

use crate::record::{RawSeries, Record};
use crate::temporal::DateRange;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Field selector of an `apiField` metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldKey {
    /// Single field, dotted paths walk nested maps
    Path(String),
    /// Output key to source key, producing a map per record
    Fields(BTreeMap<String, Self>),
}

impl From<&str> for FieldKey {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

/// Result of extracting a field from a series.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Extracted value
    pub value: Value,
    /// Dates of the records the value was read from
    pub date_range: Option<DateRange>,
}

/// Extract `key` from `series`.
///
/// Dated records are ordered newest first; undated records in a list are
/// treated as current and placed ahead of them. Records whose date cannot be
/// parsed keep their relative position behind the dated ones.
pub fn extract(series: &RawSeries, key: &FieldKey, date_field: &str) -> Extraction {
    match series {
        RawSeries::Snapshot(record) => Extraction {
            value: project(record, key),
            date_range: record
                .date(date_field)
                .ok()
                .flatten()
                .map(DateRange::single),
        },
        RawSeries::Records(records) => {
            let mut dated: Vec<_> = records
                .iter()
                .map(|record| (record.date(date_field), record))
                .collect();
            dated.sort_by_key(|(date, _)| match date {
                Ok(None) => Reverse(Some(chrono::NaiveDate::MAX)),
                Ok(Some(d)) => Reverse(Some(*d)),
                Err(_) => Reverse(None),
            });

            let date_range = DateRange::covering(
                dated
                    .iter()
                    .filter_map(|(date, _)| date.as_ref().ok().copied().flatten()),
            );
            let value = Value::List(
                dated
                    .into_iter()
                    .map(|(_, record)| project(record, key))
                    .collect(),
            );
            Extraction { value, date_range }
        }
    }
}

fn project(record: &Record, key: &FieldKey) -> Value {
    match key {
        FieldKey::Path(path) => record.get(path).cloned().unwrap_or_default(),
        FieldKey::Fields(fields) => Value::Map(
            fields
                .iter()
                .map(|(output, source)| (output.clone(), project(record, source)))
                .collect(),
        ),
    }
}
