#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assessment;

// Re-export main types from sub-crates
pub use vantage_data as data;
pub use vantage_metrics as metrics;
pub use vantage_output as output;
pub use vantage_valuation as valuation;

pub use assessment::{
    Assessment, CONSENSUS_TARGET_KEY, CURRENT_PRICE_KEY, ValuationInputs, assess,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
