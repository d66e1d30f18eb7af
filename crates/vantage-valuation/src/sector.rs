//! Peer sector averages.

use crate::error::Result;
use crate::multiple::{Multiple, MultipleLookup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Average multiples of a ticker's peer group, keyed by multiple name.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorAverages(BTreeMap<String, f64>);

impl SectorAverages {
    /// Empty averages.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Set the average of a multiple.
    pub fn with(mut self, multiple: Multiple, average: f64) -> Self {
        self.0.insert(multiple.name().to_string(), average);
        self
    }

    /// Average each multiple over peers, using only strictly positive finite
    /// peer values. Multiples with no usable peer value are left out.
    pub fn from_peers<'a>(peers: impl IntoIterator<Item = &'a BTreeMap<String, f64>>) -> Self {
        let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for peer in peers {
            for multiple in Multiple::CHAIN {
                if let Some(value) = peer.multiple(multiple).filter(|v| *v > 0.0) {
                    let entry = sums.entry(multiple.name()).or_default();
                    entry.0 += value;
                    entry.1 += 1;
                }
            }
        }
        Self(
            sums.into_iter()
                .map(|(name, (sum, count))| (name.to_string(), sum / count as f64))
                .collect(),
        )
    }

    /// Parse `{"PER": 18.2, ...}`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a sector averages JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Raw entries.
    pub const fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.0
    }
}

impl MultipleLookup for SectorAverages {
    fn multiple(&self, multiple: Multiple) -> Option<f64> {
        self.0.multiple(multiple)
    }
}

impl<const N: usize> From<[(&str, f64); N]> for SectorAverages {
    fn from(entries: [(&str, f64); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }
}
