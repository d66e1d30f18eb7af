//! Valuation configuration.

use crate::multiple::Multiple;
use serde::{Deserialize, Serialize};

/// Configuration for [`ValuationDeriver`](crate::ValuationDeriver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValuationConfig {
    /// Multiples tried in order (default: PER, PBR, PSR)
    pub chain: Vec<Multiple>,
    /// Decimal places kept in disparities (default: 4)
    pub disparity_decimals: u32,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            chain: Multiple::CHAIN.to_vec(),
            disparity_decimals: 4,
        }
    }
}
