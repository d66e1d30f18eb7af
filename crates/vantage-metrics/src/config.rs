//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Defaults for the `ttmSumOrScaled` aggregation, overridable per metric
/// through aggregation params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TtmDefaults {
    /// Number of most recent quarters summed (default: 4)
    pub window: usize,
    /// Minimum quarters required for a value (default: 1)
    pub min_points: usize,
    /// Quarter count the sum is annualized to (default: 4)
    pub scale_to: usize,
}

impl Default for TtmDefaults {
    fn default() -> Self {
        Self {
            window: 4,
            min_points: 1,
            scale_to: 4,
        }
    }
}

/// Configuration for [`MetricEngine`](crate::MetricEngine)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Record field holding the publication date (default: "date")
    pub date_field: String,
    /// Step budget for one formula or transform evaluation (default: 10_000)
    pub eval_budget: usize,
    /// TTM aggregation defaults
    pub ttm_defaults: TtmDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            date_field: "date".to_string(),
            eval_budget: 10_000,
            ttm_defaults: TtmDefaults::default(),
        }
    }
}
