//! Cross-metric formula evaluation.

use crate::expr::{self, EvalError, Expr, Scope};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use vantage_data::Value;

/// Computed metrics layered over caller-supplied custom values.
///
/// A computed metric shadows a custom value of the same name.
#[derive(Debug, Clone, Copy)]
pub struct MetricScope<'a> {
    computed: &'a BTreeMap<String, Value>,
    custom: &'a BTreeMap<String, Value>,
}

impl<'a> MetricScope<'a> {
    /// Scope over computed metrics and custom values.
    pub const fn new(computed: &'a BTreeMap<String, Value>, custom: &'a BTreeMap<String, Value>) -> Self {
        Self { computed, custom }
    }
}

impl Scope for MetricScope<'_> {
    fn get(&self, name: &str) -> Option<&Value> {
        self.computed.get(name).or_else(|| self.custom.get(name))
    }
}

/// Evaluates parsed formulas under a step budget.
#[derive(Debug, Clone, Copy)]
pub struct ExpressionEvaluator {
    budget: usize,
}

impl ExpressionEvaluator {
    /// Evaluator allowing `budget` node visits per formula.
    pub const fn new(budget: usize) -> Self {
        Self { budget }
    }

    /// Evaluate a parsed formula.
    pub fn evaluate(&self, formula: &Expr, scope: &dyn Scope) -> Result<Value, EvalError> {
        expr::evaluate(formula, scope, self.budget)
    }

    /// Parse and evaluate formula text against a map of values.
    ///
    /// Never fails: parse errors and loud evaluation errors are logged as
    /// warnings, quiet ones (missing values, division by zero) at debug level,
    /// and all of them yield null.
    pub fn evaluate_source(&self, formula: &str, values: &BTreeMap<String, Value>) -> Value {
        let parsed = match expr::parse_formula(formula) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(formula, error = %err, "formula rejected");
                return Value::Null;
            }
        };
        match self.evaluate(&parsed, values) {
            Ok(value) => value,
            Err(err) if err.is_quiet() => {
                debug!(formula, error = %err, "formula resolved to null");
                Value::Null
            }
            Err(err) => {
                warn!(formula, error = %err, "formula evaluation failed");
                Value::Null
            }
        }
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new(crate::EngineConfig::default().eval_budget)
    }
}
