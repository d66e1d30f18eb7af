//! Valuation multiples.

use crate::error::ValuationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use vantage_data::Value;

/// Price multiple usable for peer-relative valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Multiple {
    /// Price to earnings
    #[serde(rename = "PER")]
    Per,
    /// Price to book
    #[serde(rename = "PBR")]
    Pbr,
    /// Price to sales
    #[serde(rename = "PSR")]
    Psr,
}

impl Multiple {
    /// Default fallback chain.
    pub const CHAIN: [Self; 3] = [Self::Per, Self::Pbr, Self::Psr];

    /// Metric name of the multiple.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Per => "PER",
            Self::Pbr => "PBR",
            Self::Psr => "PSR",
        }
    }
}

impl fmt::Display for Multiple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Multiple {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PER" | "PE" => Ok(Self::Per),
            "PBR" | "PB" => Ok(Self::Pbr),
            "PSR" | "PS" => Ok(Self::Psr),
            _ => Err(ValuationError::UnknownMultiple(s.to_string())),
        }
    }
}

/// Anything that can report a multiple's value.
pub trait MultipleLookup {
    /// Value of `multiple`, if present and finite.
    fn multiple(&self, multiple: Multiple) -> Option<f64>;
}

impl MultipleLookup for BTreeMap<String, f64> {
    fn multiple(&self, multiple: Multiple) -> Option<f64> {
        self.get(multiple.name()).copied().filter(|v| v.is_finite())
    }
}

impl MultipleLookup for BTreeMap<String, Value> {
    fn multiple(&self, multiple: Multiple) -> Option<f64> {
        self.get(multiple.name()).and_then(Value::as_f64)
    }
}

impl MultipleLookup for BTreeMap<&str, &Value> {
    fn multiple(&self, multiple: Multiple) -> Option<f64> {
        self.get(multiple.name()).and_then(|v| v.as_f64())
    }
}
