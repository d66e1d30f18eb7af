//! Built-in quarter-series aggregations.
//!
//! All inputs are most-recent-first.

use crate::config::TtmDefaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use vantage_data::Value;

/// Built-in aggregation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AggregationKind {
    /// Sum of the last `window` quarters, annualized when fewer are available
    TtmSumOrScaled,
    /// Most recent quarter
    LastFromQuarter,
    /// Mean of the last `window` quarters
    AvgFromQuarter,
    /// Quarter-over-quarter growth `(v0 - v1) / v1`
    QoqFromQuarter,
    /// Year-over-year growth `(v0 - v4) / v4`
    YoyFromQuarter,
}

impl AggregationKind {
    /// Every built-in kind.
    pub const ALL: [Self; 5] = [
        Self::TtmSumOrScaled,
        Self::LastFromQuarter,
        Self::AvgFromQuarter,
        Self::QoqFromQuarter,
        Self::YoyFromQuarter,
    ];

    /// Canonical catalog spelling.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TtmSumOrScaled => "ttmSumOrScaled",
            Self::LastFromQuarter => "lastFromQuarter",
            Self::AvgFromQuarter => "avgFromQuarter",
            Self::QoqFromQuarter => "qoqFromQuarter",
            Self::YoyFromQuarter => "yoyFromQuarter",
        }
    }

    /// Resolve a catalog kind, accepting camelCase and snake_case.
    pub fn parse(kind: &str) -> Option<Self> {
        let folded: String = kind
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .into_iter()
            .find(|k| k.name().to_ascii_lowercase() == folded)
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric aggregation parameters after applying defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationParams {
    /// Quarters considered
    pub window: usize,
    /// Minimum quarters for a TTM value
    pub min_points: usize,
    /// Quarter count a partial TTM sum is scaled to
    pub scale_to: usize,
}

impl AggregationParams {
    /// Read `window`, `minPoints` and `scaleTo` (or their snake_case forms)
    /// from catalog params. Missing, negative or non-numeric entries take the
    /// defaults.
    pub fn from_params(params: &BTreeMap<String, Value>, defaults: TtmDefaults) -> Self {
        let read = |keys: &[&str], default: usize| {
            keys.iter()
                .find_map(|key| params.get(*key))
                .and_then(|value| match value {
                    Value::Text(s) => s.trim().parse::<f64>().ok(),
                    other => other.as_f64(),
                })
                .filter(|n| *n >= 0.0)
                .map_or(default, |n| n as usize)
        };
        Self {
            window: read(&["window"], defaults.window),
            min_points: read(&["minPoints", "min_points"], defaults.min_points),
            scale_to: read(&["scaleTo", "scale_to"], defaults.scale_to),
        }
    }
}

impl Default for AggregationParams {
    fn default() -> Self {
        let defaults = TtmDefaults::default();
        Self {
            window: defaults.window,
            min_points: defaults.min_points,
            scale_to: defaults.scale_to,
        }
    }
}

/// Aggregated value and how much data produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    /// Result, null when it could not be computed
    pub value: Value,
    /// Quarterly values consumed
    pub quarters_used: usize,
    /// Whether a TTM sum was rescaled from fewer quarters
    pub scaled: bool,
}

impl AggregationOutcome {
    /// Null result with no data consumed.
    pub const fn null() -> Self {
        Self {
            value: Value::Null,
            quarters_used: 0,
            scaled: false,
        }
    }

    const fn number(value: f64, quarters_used: usize) -> Self {
        Self {
            value: Value::Number(value),
            quarters_used,
            scaled: false,
        }
    }
}

/// Quarters a kind reads and whether the result is a rescaled TTM.
pub fn footprint(kind: AggregationKind, available: usize, params: &AggregationParams) -> (usize, bool) {
    match kind {
        AggregationKind::TtmSumOrScaled => {
            let used = available.min(params.window);
            (used, used > 0 && used < params.scale_to)
        }
        AggregationKind::AvgFromQuarter => (available.min(params.window), false),
        AggregationKind::LastFromQuarter => (available.min(1), false),
        AggregationKind::QoqFromQuarter => (available.min(2), false),
        AggregationKind::YoyFromQuarter => (available.min(5), false),
    }
}

/// Apply a built-in aggregation.
pub fn apply(kind: AggregationKind, values: &[f64], params: &AggregationParams) -> AggregationOutcome {
    match kind {
        AggregationKind::TtmSumOrScaled => ttm_sum_or_scaled(values, params),
        AggregationKind::LastFromQuarter => values
            .first()
            .map_or_else(AggregationOutcome::null, |v| AggregationOutcome::number(*v, 1)),
        AggregationKind::AvgFromQuarter => {
            let window = &values[..values.len().min(params.window)];
            if window.is_empty() {
                return AggregationOutcome::null();
            }
            let mean = window.iter().sum::<f64>() / window.len() as f64;
            AggregationOutcome::number(mean, window.len())
        }
        AggregationKind::QoqFromQuarter => growth(values, 1),
        AggregationKind::YoyFromQuarter => growth(values, 4),
    }
}

fn ttm_sum_or_scaled(values: &[f64], params: &AggregationParams) -> AggregationOutcome {
    let window = &values[..values.len().min(params.window)];
    let count = window.len();
    if count == 0 || count < params.min_points {
        return AggregationOutcome::null();
    }
    let sum: f64 = window.iter().sum();
    if count < params.scale_to {
        AggregationOutcome {
            value: Value::Number(sum / count as f64 * params.scale_to as f64),
            quarters_used: count,
            scaled: true,
        }
    } else {
        AggregationOutcome::number(sum, count)
    }
}

/// `(v0 - v[lag]) / v[lag]`, null when `v[lag]` is missing or zero.
fn growth(values: &[f64], lag: usize) -> AggregationOutcome {
    match (values.first(), values.get(lag)) {
        (Some(current), Some(previous)) if *previous != 0.0 => {
            AggregationOutcome::number((current - previous) / previous, lag + 1)
        }
        _ => AggregationOutcome::null(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn run(kind: AggregationKind, values: &[f64]) -> Option<f64> {
        apply(kind, values, &AggregationParams::default()).value.as_f64()
    }

    #[rstest]
    #[case::full_year(&[30.0, 28.0, 26.0, 24.0], Some(108.0))]
    #[case::two_quarters_scaled(&[30.0, 28.0], Some(116.0))]
    #[case::extra_quarters_ignored(&[30.0, 28.0, 26.0, 24.0, 1000.0], Some(108.0))]
    #[case::no_data(&[], None)]
    fn test_ttm_sum_or_scaled(#[case] values: &[f64], #[case] expected: Option<f64>) {
        assert_eq!(run(AggregationKind::TtmSumOrScaled, values), expected);
    }

    #[test]
    fn test_ttm_min_points() {
        let params = AggregationParams {
            min_points: 3,
            ..AggregationParams::default()
        };
        let outcome = apply(AggregationKind::TtmSumOrScaled, &[1.0, 2.0], &params);
        assert_eq!(outcome.value, Value::Null);

        let outcome = apply(AggregationKind::TtmSumOrScaled, &[1.0, 2.0, 3.0], &params);
        assert_relative_eq!(outcome.value.as_f64().unwrap(), 8.0);
        assert!(outcome.scaled);
        assert_eq!(outcome.quarters_used, 3);
    }

    #[rstest]
    #[case::growth(&[110.0, 100.0], Some(0.1))]
    #[case::zero_base(&[110.0, 0.0], None)]
    #[case::single(&[110.0], None)]
    #[case::empty(&[], None)]
    fn test_qoq(#[case] values: &[f64], #[case] expected: Option<f64>) {
        match (run(AggregationKind::QoqFromQuarter, values), expected) {
            (Some(actual), Some(expected)) => assert_relative_eq!(actual, expected, epsilon = 1e-12),
            (actual, expected) => assert_eq!(actual, expected),
        }
    }

    #[rstest]
    #[case::four_quarters(&[120.0, 1.0, 2.0, 3.0], None)]
    #[case::five_quarters(&[120.0, 1.0, 2.0, 3.0, 100.0], Some(0.2))]
    #[case::zero_base(&[120.0, 1.0, 2.0, 3.0, 0.0], None)]
    fn test_yoy(#[case] values: &[f64], #[case] expected: Option<f64>) {
        match (run(AggregationKind::YoyFromQuarter, values), expected) {
            (Some(actual), Some(expected)) => assert_relative_eq!(actual, expected, epsilon = 1e-12),
            (actual, expected) => assert_eq!(actual, expected),
        }
    }

    #[rstest]
    #[case::last(AggregationKind::LastFromQuarter, &[5.0, 4.0], Some(5.0))]
    #[case::last_empty(AggregationKind::LastFromQuarter, &[], None)]
    #[case::avg(AggregationKind::AvgFromQuarter, &[4.0, 2.0, 6.0, 8.0, 100.0], Some(5.0))]
    #[case::avg_empty(AggregationKind::AvgFromQuarter, &[], None)]
    fn test_last_and_avg(#[case] kind: AggregationKind, #[case] values: &[f64], #[case] expected: Option<f64>) {
        assert_eq!(run(kind, values), expected);
    }

    #[rstest]
    #[case("ttmSumOrScaled", Some(AggregationKind::TtmSumOrScaled))]
    #[case("ttm_sum_or_scaled", Some(AggregationKind::TtmSumOrScaled))]
    #[case("yoy_from_quarter", Some(AggregationKind::YoyFromQuarter))]
    #[case("median", None)]
    fn test_kind_spellings(#[case] name: &str, #[case] expected: Option<AggregationKind>) {
        assert_eq!(AggregationKind::parse(name), expected);
    }

    #[test]
    fn test_params_from_catalog() {
        let params: BTreeMap<String, Value> = [
            ("window".to_string(), Value::Number(8.0)),
            ("min_points".to_string(), Value::Text("2".to_string())),
            ("scaleTo".to_string(), Value::Number(-1.0)),
        ]
        .into_iter()
        .collect();
        let parsed = AggregationParams::from_params(&params, TtmDefaults::default());
        assert_eq!(
            parsed,
            AggregationParams {
                window: 8,
                min_points: 2,
                scale_to: 4,
            }
        );
    }
}
