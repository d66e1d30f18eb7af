//! Position and disparity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Investment position implied by a value estimate versus the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Estimate above price
    Long,
    /// Estimate below price
    Short,
    /// Estimate equal to price
    Neutral,
}

impl Position {
    /// Classify `estimate` against `price`.
    pub fn classify(estimate: f64, price: f64) -> Self {
        if estimate > price {
            Self::Long
        } else if estimate < price {
            Self::Short
        } else {
            Self::Neutral
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Long => "long",
            Self::Short => "short",
            Self::Neutral => "neutral",
        })
    }
}

/// Position and disparity of one estimate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Signal {
    /// Implied position
    pub position: Option<Position>,
    /// `estimate / price - 1`, rounded
    pub disparity: Option<f64>,
}

impl Signal {
    /// Signal of `estimate` against `price`. Empty when either is missing,
    /// non-finite, or the price is not strictly positive.
    pub fn from_estimate(estimate: Option<f64>, price: Option<f64>, decimals: u32) -> Self {
        match (usable(estimate), usable_price(price)) {
            (Some(estimate), Some(price)) => Self {
                position: Some(Position::classify(estimate, price)),
                disparity: disparity(estimate, price, decimals),
            },
            _ => Self::default(),
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

/// `round(estimate / price - 1, decimals)`, `None` when the price is zero.
pub fn disparity(estimate: f64, price: f64, decimals: u32) -> Option<f64> {
    if price == 0.0 {
        return None;
    }
    Some(round_to(estimate / price - 1.0, decimals)).filter(|d| d.is_finite())
}

/// Qualitative signal from an analyst consensus target.
pub fn derive_consensus(target: Option<f64>, current_price: Option<f64>) -> Signal {
    Signal::from_estimate(target, current_price, 4)
}

pub(crate) fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub(crate) fn usable_price(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(120.0, 100.0, Position::Long)]
    #[case(80.0, 100.0, Position::Short)]
    #[case(100.0, 100.0, Position::Neutral)]
    fn test_classify(#[case] estimate: f64, #[case] price: f64, #[case] expected: Position) {
        assert_eq!(Position::classify(estimate, price), expected);
    }

    #[test]
    fn test_disparity_rounding() {
        assert_eq!(disparity(110.0, 90.0, 4), Some(0.2222));
        assert_eq!(disparity(90.0, 110.0, 4), Some(-0.1818));
        assert_eq!(disparity(1.0, 0.0, 4), None);
    }

    #[test]
    fn test_consensus() {
        let signal = derive_consensus(Some(125.0), Some(100.0));
        assert_eq!(signal.position, Some(Position::Long));
        assert_eq!(signal.disparity, Some(0.25));

        assert_eq!(derive_consensus(None, Some(100.0)), Signal::default());
        assert_eq!(derive_consensus(Some(125.0), Some(0.0)), Signal::default());
        assert_eq!(derive_consensus(Some(125.0), Some(f64::NAN)), Signal::default());
    }

    #[test]
    fn test_serialized_position() {
        assert_eq!(serde_json::to_string(&Position::Neutral).unwrap(), r#""neutral""#);
    }
}
