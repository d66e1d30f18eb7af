#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod deriver;
pub mod error;
pub mod multiple;
pub mod sector;
pub mod signal;

pub use config::ValuationConfig;
pub use deriver::{Valuation, ValuationDeriver};
pub use error::{Result, ValuationError};
pub use multiple::{Multiple, MultipleLookup};
pub use sector::SectorAverages;
pub use signal::{Position, Signal, derive_consensus, disparity, round_to};

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
