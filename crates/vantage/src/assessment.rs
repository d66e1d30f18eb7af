//! One context evaluated end to end.

use serde::{Deserialize, Serialize};
use tracing::debug;
use vantage_data::{CalculationContext, Value};
use vantage_metrics::{EvaluationResult, MetricEngine};
use vantage_valuation::{SectorAverages, Signal, Valuation, ValuationDeriver, derive_consensus};

/// Custom value holding the current share price.
pub const CURRENT_PRICE_KEY: &str = "currentPrice";

/// Custom value holding the analyst consensus target price.
pub const CONSENSUS_TARGET_KEY: &str = "consensusTarget";

/// Inputs to both valuation paths that do not come from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValuationInputs {
    /// Peer sector averages of the valuation multiples.
    pub sector_averages: SectorAverages,
    /// Current share price.
    pub current_price: Option<f64>,
    /// Analyst consensus target price.
    pub consensus_target: Option<f64>,
}

impl ValuationInputs {
    /// Inputs with the given sector averages and no prices.
    pub fn new(sector_averages: SectorAverages) -> Self {
        Self {
            sector_averages,
            ..Self::default()
        }
    }

    /// Set the current price.
    pub fn with_price(mut self, price: f64) -> Self {
        self.current_price = Some(price);
        self
    }

    /// Set the consensus target.
    pub fn with_target(mut self, target: f64) -> Self {
        self.consensus_target = Some(target);
        self
    }

    /// Take missing prices from the context's custom values
    /// (`currentPrice`, `consensusTarget`).
    pub fn or_from_context(mut self, context: &CalculationContext) -> Self {
        let custom = |key: &str| context.custom_values.get(key).and_then(Value::as_f64);
        self.current_price = self.current_price.or_else(|| custom(CURRENT_PRICE_KEY));
        self.consensus_target = self.consensus_target.or_else(|| custom(CONSENSUS_TARGET_KEY));
        self
    }
}

/// Metrics and both valuation signals of one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Engine output.
    pub evaluation: EvaluationResult,
    /// Multiple-based fair value.
    pub quantitative: Valuation,
    /// Consensus-target signal.
    pub qualitative: Signal,
}

/// Evaluate `context` and derive both valuation signals from the result.
///
/// The valuation multiples are looked up by name (`PER`, `PBR`, `PSR`) among
/// the computed metrics of every domain.
pub fn assess(
    engine: &MetricEngine,
    deriver: &ValuationDeriver,
    context: &CalculationContext,
    inputs: &ValuationInputs,
) -> Assessment {
    let evaluation = engine.evaluate(context);
    let quantitative = deriver.derive(&evaluation.flattened(), &inputs.sector_averages, inputs.current_price);
    let qualitative = derive_consensus(inputs.consensus_target, inputs.current_price);
    debug!(
        ticker = %evaluation.ticker,
        fair_value = ?quantitative.fair_value,
        position = ?quantitative.position,
        "context assessed"
    );
    Assessment {
        evaluation,
        quantitative,
        qualitative,
    }
}
