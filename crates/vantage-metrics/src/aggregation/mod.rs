//! Quarter-series aggregation.
//!
//! An aggregation kind resolves to a catalog transform when an active one is
//! registered under that id, otherwise to a built-in. A failing transform falls
//! back to the built-in of the same kind; with no built-in the result is null.

mod builtin;

pub use builtin::{AggregationKind, AggregationOutcome, AggregationParams, apply, footprint};

use crate::config::TtmDefaults;
use crate::expr::{self, EvalError, MapScope, Program};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use vantage_data::Value;

/// Something that went wrong while aggregating. Never fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationIssue {
    /// The transform raised; the built-in was used instead
    TransformFallback {
        /// Transform id
        kind: String,
        /// Failure
        error: EvalError,
    },
    /// The transform raised and no built-in exists
    TransformFailed {
        /// Transform id
        kind: String,
        /// Failure
        error: EvalError,
    },
    /// Neither a transform nor a built-in matches
    UnknownKind(String),
}

impl std::fmt::Display for AggregationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TransformFallback { kind, error } => {
                write!(f, "transform '{kind}' failed ({error}), used built-in")
            }
            Self::TransformFailed { kind, error } => write!(f, "transform '{kind}' failed: {error}"),
            Self::UnknownKind(kind) => write!(f, "unknown aggregation kind '{kind}'"),
        }
    }
}

/// Aggregation result plus any issue encountered.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    /// Value and data footprint
    pub outcome: AggregationOutcome,
    /// Whether the result belongs to the TTM family (drives domain metadata)
    pub ttm: bool,
    /// Problem encountered, if any
    pub issue: Option<AggregationIssue>,
}

/// Runs aggregations against a set of compiled transforms.
#[derive(Debug, Clone, Copy)]
pub struct AggregationExecutor<'c> {
    transforms: &'c BTreeMap<String, Program>,
    defaults: TtmDefaults,
    budget: usize,
}

impl<'c> AggregationExecutor<'c> {
    /// Executor over `transforms`, with TTM defaults and a per-call step budget.
    pub const fn new(transforms: &'c BTreeMap<String, Program>, defaults: TtmDefaults, budget: usize) -> Self {
        Self {
            transforms,
            defaults,
            budget,
        }
    }

    /// Aggregate most-recent-first `values` with the given kind and params.
    pub fn aggregate(&self, kind: &str, values: &[f64], params: &BTreeMap<String, Value>) -> Aggregated {
        let numeric = AggregationParams::from_params(params, self.defaults);
        let builtin = AggregationKind::parse(kind);
        let ttm = builtin == Some(AggregationKind::TtmSumOrScaled);

        let Some(program) = self.transforms.get(kind) else {
            return match builtin {
                Some(builtin) => Aggregated {
                    outcome: apply(builtin, values, &numeric),
                    ttm,
                    issue: None,
                },
                None => {
                    warn!(kind, "unknown aggregation kind");
                    Aggregated {
                        outcome: AggregationOutcome::null(),
                        ttm,
                        issue: Some(AggregationIssue::UnknownKind(kind.to_string())),
                    }
                }
            };
        };

        match self.run_transform(program, values, params) {
            Ok(value) => {
                let (quarters_used, scaled) = builtin.map_or((values.len(), false), |b| {
                    footprint(b, values.len(), &numeric)
                });
                debug!(kind, "aggregated with catalog transform");
                Aggregated {
                    outcome: AggregationOutcome {
                        scaled: scaled && !value.is_null(),
                        value,
                        quarters_used,
                    },
                    ttm,
                    issue: None,
                }
            }
            Err(error) => match builtin {
                Some(builtin) => {
                    warn!(kind, %error, "transform failed, falling back to built-in");
                    Aggregated {
                        outcome: apply(builtin, values, &numeric),
                        ttm,
                        issue: Some(AggregationIssue::TransformFallback {
                            kind: kind.to_string(),
                            error,
                        }),
                    }
                }
                None => {
                    warn!(kind, %error, "transform failed");
                    Aggregated {
                        outcome: AggregationOutcome::null(),
                        ttm,
                        issue: Some(AggregationIssue::TransformFailed {
                            kind: kind.to_string(),
                            error,
                        }),
                    }
                }
            },
        }
    }

    fn run_transform(
        &self,
        program: &Program,
        values: &[f64],
        params: &BTreeMap<String, Value>,
    ) -> Result<Value, EvalError> {
        let scope = MapScope::from([
            ("quarterly_values", Value::from(values.to_vec())),
            ("params", Value::Map(params.clone())),
        ]);
        expr::run_program(program, &scope, self.budget)
    }
}
