//! As-of filtering.
//!
//! A historical metric may only use statement data published on or before the
//! event date. [`TemporalFilter`] enforces that for dated records; undated
//! records and snapshots are current-state data and pass through untouched.

use crate::record::{RawSeries, Record};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inclusive range of record dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Earliest date
    pub start: NaiveDate,
    /// Latest date
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering a single day.
    pub const fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Smallest range covering both inputs.
    pub fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Merge two optional ranges.
    pub fn merge(a: Option<Self>, b: Option<Self>) -> Option<Self> {
        match (a, b) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        }
    }

    /// Range covering every date in the iterator, or `None` if it is empty.
    pub fn covering(dates: impl IntoIterator<Item = NaiveDate>) -> Option<Self> {
        dates
            .into_iter()
            .fold(None, |acc, date| Self::merge(acc, Some(Self::single(date))))
    }
}

/// Restricts raw series to records valid as of a reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalFilter {
    /// Name of the date field on dated records (default: `"date"`)
    pub date_field: String,
}

impl Default for TemporalFilter {
    fn default() -> Self {
        Self {
            date_field: "date".to_string(),
        }
    }
}

impl TemporalFilter {
    /// Create a filter reading dates from `date_field`.
    pub fn new(date_field: impl Into<String>) -> Self {
        Self {
            date_field: date_field.into(),
        }
    }

    /// Filter a series as of `as_of`.
    ///
    /// List series keep records dated on or before `as_of` plus undated records.
    /// Records with an unparsable date are dropped. Snapshots pass through.
    pub fn filter(&self, series: &RawSeries, as_of: NaiveDate) -> RawSeries {
        match series {
            RawSeries::Snapshot(record) => RawSeries::Snapshot(record.clone()),
            RawSeries::Records(records) => RawSeries::Records(
                records
                    .iter()
                    .filter(|record| self.is_valid(record, as_of))
                    .cloned()
                    .collect(),
            ),
        }
    }

    fn is_valid(&self, record: &Record, as_of: NaiveDate) -> bool {
        match record.date(&self.date_field) {
            Ok(Some(date)) => date <= as_of,
            Ok(None) => true,
            Err(e) => {
                debug!("dropping record with unusable date: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_drops_records_after_as_of() {
        let series = RawSeries::Records(vec![
            Record::new().with("date", "2024-01-01").with("v", 1.0),
            Record::new().with("date", "2024-06-01").with("v", 2.0),
        ]);

        let filtered = TemporalFilter::default().filter(&series, day(2024, 3, 1));
        let RawSeries::Records(records) = filtered else {
            panic!("expected records");
        };
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("v").and_then(|v| v.as_f64()), Some(1.0));
    }

    #[test]
    fn test_as_of_is_inclusive() {
        let series = RawSeries::Records(vec![Record::new().with("date", "2024-03-01")]);
        assert_eq!(
            TemporalFilter::default()
                .filter(&series, day(2024, 3, 1))
                .len(),
            1
        );
    }

    #[test]
    fn test_undated_and_snapshot_pass_through() {
        let series = RawSeries::Records(vec![
            Record::new().with("v", 1.0),
            Record::new().with("date", "2030-01-01"),
        ]);
        assert_eq!(
            TemporalFilter::default()
                .filter(&series, day(2024, 1, 1))
                .len(),
            1
        );

        let snapshot = RawSeries::Snapshot(Record::new().with("date", "2030-01-01"));
        assert_eq!(
            TemporalFilter::default().filter(&snapshot, day(2024, 1, 1)),
            snapshot
        );
    }

    #[test]
    fn test_unparsable_date_is_dropped() {
        let series = RawSeries::Records(vec![Record::new().with("date", "soon")]);
        assert!(
            TemporalFilter::default()
                .filter(&series, day(2024, 1, 1))
                .is_empty()
        );
    }

    #[test]
    fn test_custom_date_field() {
        let series = RawSeries::Records(vec![
            Record::new().with("filingDate", "2024-02-15"),
            Record::new().with("filingDate", "2024-05-15"),
        ]);
        let filter = TemporalFilter::new("filingDate");
        assert_eq!(filter.filter(&series, day(2024, 3, 1)).len(), 1);
    }

    #[test]
    fn test_date_range_merge() {
        let range = DateRange::covering([day(2024, 3, 1), day(2023, 12, 1), day(2024, 1, 1)]);
        assert_eq!(
            range,
            Some(DateRange {
                start: day(2023, 12, 1),
                end: day(2024, 3, 1)
            })
        );
        assert_eq!(DateRange::merge(None, None), None);
    }
}
