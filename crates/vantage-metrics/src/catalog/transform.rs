//! Catalog-supplied aggregation transforms.

use serde::{Deserialize, Serialize};

const fn active() -> bool {
    true
}

/// A calculation program registered under an aggregation kind.
///
/// The program sees `quarterly_values` (most-recent-first list) and `params`
/// (the metric's aggregation params) and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformDefinition {
    /// Aggregation kind this transform serves
    pub id: String,
    /// Descriptive input shape
    #[serde(default)]
    pub input_kind: String,
    /// Descriptive output shape
    #[serde(default)]
    pub output_kind: String,
    /// Program source
    pub calculation_code: String,
    /// Inactive transforms are not loaded
    #[serde(default = "active")]
    pub is_active: bool,
}

impl TransformDefinition {
    /// Active transform with descriptive kinds left empty.
    pub fn new(id: impl Into<String>, calculation_code: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input_kind: String::new(),
            output_kind: String::new(),
            calculation_code: calculation_code.into(),
            is_active: true,
        }
    }

    /// Mark the transform inactive.
    pub const fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
