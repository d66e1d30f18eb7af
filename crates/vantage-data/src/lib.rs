#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/vantage/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error;
pub mod extract;
pub mod record;
pub mod temporal;
pub mod value;

pub use context::CalculationContext;
pub use error::{DataError, Result};
pub use extract::{Extraction, FieldKey, extract};
pub use record::{RawSeries, Record, SourceId};
pub use temporal::{DateRange, TemporalFilter};
pub use value::Value;

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
