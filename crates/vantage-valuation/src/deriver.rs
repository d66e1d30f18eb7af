//! Peer-relative fair value.

use crate::config::ValuationConfig;
use crate::multiple::{Multiple, MultipleLookup};
use crate::signal::{Position, Signal, disparity, usable_price};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fair-value estimate and the signal it implies.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Valuation {
    /// Sector multiple times the ticker's per-share base
    pub fair_value: Option<f64>,
    /// Position against the current price
    pub position: Option<Position>,
    /// `fair_value / current_price - 1`, rounded
    pub disparity: Option<f64>,
    /// Multiple that produced the estimate
    pub method: Option<Multiple>,
    /// `current_price / own_multiple`
    pub base_per_share: Option<f64>,
}

impl Valuation {
    /// Position and disparity as a [`Signal`].
    pub const fn signal(&self) -> Signal {
        Signal {
            position: self.position,
            disparity: self.disparity,
        }
    }
}

/// Derives fair value through a fallback chain of multiples.
#[derive(Debug, Clone, Default)]
pub struct ValuationDeriver {
    config: ValuationConfig,
}

impl ValuationDeriver {
    /// Deriver with a custom configuration.
    pub const fn with_config(config: ValuationConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    pub const fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Derive fair value, position and disparity.
    ///
    /// The first multiple in the chain whose own and sector values are both
    /// strictly positive is used. Never fails: with no usable multiple or no
    /// usable price the valuation is empty.
    pub fn derive(
        &self,
        own: &(impl MultipleLookup + ?Sized),
        sector: &(impl MultipleLookup + ?Sized),
        current_price: Option<f64>,
    ) -> Valuation {
        let Some(price) = usable_price(current_price) else {
            debug!("no usable current price, skipping valuation");
            return Valuation::default();
        };

        let chosen = self.config.chain.iter().find_map(|&multiple| {
            let own_multiple = own.multiple(multiple).filter(|v| *v > 0.0)?;
            let sector_multiple = sector.multiple(multiple).filter(|v| *v > 0.0)?;
            Some((multiple, own_multiple, sector_multiple))
        });
        let Some((method, own_multiple, sector_multiple)) = chosen else {
            debug!("no usable multiple in chain");
            return Valuation::default();
        };

        let base = price / own_multiple;
        let fair_value = sector_multiple * base;
        if !fair_value.is_finite() {
            return Valuation::default();
        }
        debug!(%method, fair_value, "fair value derived");
        Valuation {
            fair_value: Some(fair_value),
            position: Some(Position::classify(fair_value, price)),
            disparity: disparity(fair_value, price, self.config.disparity_decimals),
            method: Some(method),
            base_per_share: Some(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SectorAverages;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn own(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_per_first() {
        let valuation = ValuationDeriver::default().derive(
            &own(&[("PER", 10.0), ("PBR", 2.0)]),
            &SectorAverages::from([("PER", 15.0), ("PBR", 1.0)]),
            Some(50.0),
        );
        assert_eq!(valuation.method, Some(Multiple::Per));
        assert_relative_eq!(valuation.base_per_share.unwrap(), 5.0);
        assert_relative_eq!(valuation.fair_value.unwrap(), 75.0);
        assert_eq!(valuation.position, Some(Position::Long));
        assert_eq!(valuation.disparity, Some(0.5));
    }

    #[test]
    fn test_negative_per_skips_to_pbr() {
        let valuation = ValuationDeriver::default().derive(
            &own(&[("PER", -5.0), ("PBR", 4.0)]),
            &SectorAverages::from([("PER", 20.0), ("PBR", 2.0)]),
            Some(100.0),
        );
        assert_eq!(valuation.method, Some(Multiple::Pbr));
        assert_relative_eq!(valuation.fair_value.unwrap(), 50.0);
        assert_eq!(valuation.position, Some(Position::Short));
        assert_eq!(valuation.disparity, Some(-0.5));
    }

    #[test]
    fn test_negative_sector_average_skipped() {
        let valuation = ValuationDeriver::default().derive(
            &own(&[("PER", 10.0), ("PBR", 2.0), ("PSR", 4.0)]),
            &SectorAverages::from([("PER", -1.0), ("PSR", 4.0)]),
            Some(100.0),
        );
        assert_eq!(valuation.method, Some(Multiple::Psr));
        assert_eq!(valuation.position, Some(Position::Neutral));
        assert_eq!(valuation.disparity, Some(0.0));
    }

    #[test]
    fn test_nothing_usable() {
        let deriver = ValuationDeriver::default();
        let sector = SectorAverages::from([("PER", 20.0)]);
        assert_eq!(deriver.derive(&own(&[("PER", 0.0)]), &sector, Some(10.0)), Valuation::default());
        assert_eq!(deriver.derive(&own(&[("PER", 5.0)]), &sector, None), Valuation::default());
        assert_eq!(deriver.derive(&own(&[("PER", 5.0)]), &sector, Some(0.0)), Valuation::default());
    }

    #[test]
    fn test_custom_chain() {
        let deriver = ValuationDeriver::with_config(ValuationConfig {
            chain: vec![Multiple::Psr],
            disparity_decimals: 2,
        });
        let valuation = deriver.derive(
            &own(&[("PER", 10.0), ("PSR", 3.0)]),
            &SectorAverages::from([("PER", 20.0), ("PSR", 4.0)]),
            Some(30.0),
        );
        assert_eq!(valuation.method, Some(Multiple::Psr));
        assert_relative_eq!(valuation.fair_value.unwrap(), 40.0);
        assert_eq!(valuation.disparity, Some(0.33));
    }
}
