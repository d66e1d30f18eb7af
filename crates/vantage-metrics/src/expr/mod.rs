//! Catalog expression language.
//!
//! Formulas and aggregation transforms are configuration data. They are parsed
//! into an explicit AST once per catalog load and interpreted against a
//! restricted scope: arithmetic, comparisons, `if/then/else`, list indexing and
//! slicing, and a fixed function whitelist. There are no loops, no I/O and no
//! access to anything the scope does not expose. Every node visit consumes one
//! unit of a per-call step budget.
//!
//! ```
//! use vantage_data::Value;
//! use vantage_metrics::expr::{self, MapScope};
//!
//! let formula = expr::parse_formula("if revenue > 0 then marketCap / revenue else null").unwrap();
//! let scope = MapScope::from([("marketCap", Value::Number(500.0)), ("revenue", Value::Number(100.0))]);
//! assert_eq!(expr::evaluate(&formula, &scope, 1_000).unwrap(), Value::Number(5.0));
//! ```

pub mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{BinaryOp, Expr, Function, Program, Statement, UnaryOp};
pub use eval::{MapScope, Scope, evaluate, run_program};

use thiserror::Error;

/// Syntax error with its source position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// Description of the problem
    pub message: String,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

/// Runtime failure of an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// A referenced value exists but is null
    #[error("missing value for '{0}'")]
    MissingValue(String),

    /// Null used as an arithmetic or comparison operand
    #[error("null operand for '{0}'")]
    NullOperand(String),

    /// Name not present in the scope
    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    /// Operand types do not fit the operation
    #[error("type error: {0}")]
    Type(String),

    /// Wrong number of function arguments
    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        /// Function name
        function: &'static str,
        /// Accepted argument counts
        expected: &'static str,
        /// Supplied argument count
        actual: usize,
    },

    /// Result outside the function's domain (e.g. `sqrt(-1)`)
    #[error("domain error: {0}")]
    Domain(String),

    /// List index out of range
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index
        index: i64,
        /// List length
        len: usize,
    },

    /// Step budget exhausted
    #[error("evaluation budget of {0} steps exhausted")]
    BudgetExhausted(usize),

    /// Program produced no value
    #[error("program produced no value")]
    NoResult,
}

impl EvalError {
    /// Errors that resolve to null without a warning: missing inputs and
    /// division by zero.
    pub const fn is_quiet(&self) -> bool {
        matches!(
            self,
            Self::DivisionByZero | Self::MissingValue(_) | Self::NullOperand(_)
        )
    }
}

/// Parse a cross-metric formula.
pub fn parse_formula(source: &str) -> Result<Expr, ParseError> {
    parser::Parser::new(source, Function::FORMULA)?.parse_expression()
}

/// Parse an aggregation transform program.
pub fn parse_program(source: &str) -> Result<Program, ParseError> {
    parser::Parser::new(source, Function::TRANSFORM)?.parse_program()
}
