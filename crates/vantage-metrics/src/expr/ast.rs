//! Syntax tree for formulas and transform programs.

use std::collections::BTreeSet;
use std::fmt;
use vantage_data::Value;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `**`
    Pow,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `and`, short-circuiting
    And,
    /// `or`, short-circuiting
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Pow => "**",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "and",
            Self::Or => "or",
        };
        f.write_str(symbol)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical negation
    Not,
}

/// Whitelisted functions. Nothing outside this list can be called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// `abs(x)`
    Abs,
    /// `min(a, b, ...)` or `min(list)`
    Min,
    /// `max(a, b, ...)` or `max(list)`
    Max,
    /// `round(x)` or `round(x, digits)`
    Round,
    /// `sqrt(x)`
    Sqrt,
    /// `pow(x, y)`
    Pow,
    /// `sum(list)`
    Sum,
    /// `len(list | map | text)`
    Len,
    /// `avg(list)`
    Avg,
    /// `float(x)`
    Float,
    /// `int(x)`, truncating
    Int,
    /// `get(map, key, default)`
    Get,
}

impl Function {
    /// Functions available to cross-metric formulas.
    pub const FORMULA: &'static [Self] = &[
        Self::Abs,
        Self::Min,
        Self::Max,
        Self::Round,
        Self::Sqrt,
        Self::Pow,
    ];

    /// Functions available to aggregation transform programs.
    pub const TRANSFORM: &'static [Self] = &[
        Self::Abs,
        Self::Min,
        Self::Max,
        Self::Round,
        Self::Sqrt,
        Self::Pow,
        Self::Sum,
        Self::Len,
        Self::Avg,
        Self::Float,
        Self::Int,
        Self::Get,
    ];

    /// Name as written in source.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Min => "min",
            Self::Max => "max",
            Self::Round => "round",
            Self::Sqrt => "sqrt",
            Self::Pow => "pow",
            Self::Sum => "sum",
            Self::Len => "len",
            Self::Avg => "avg",
            Self::Float => "float",
            Self::Int => "int",
            Self::Get => "get",
        }
    }

    /// Resolve a name against an allow-list.
    pub fn lookup(name: &str, allowed: &[Self]) -> Option<Self> {
        allowed.iter().copied().find(|f| {
            f.name() == name || (*f == Self::Avg && (name == "mean" || name == "average"))
        })
    }
}

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string, boolean or null literal
    Literal(Value),
    /// Metric, custom value or local binding
    Ident(String),
    /// `[a, b, c]`
    List(Vec<Self>),
    /// `-x`, `not x`
    Unary {
        /// Operator
        op: UnaryOp,
        /// Operand
        expr: Box<Self>,
    },
    /// `a op b`
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        left: Box<Self>,
        /// Right operand
        right: Box<Self>,
    },
    /// `f(args...)`
    Call {
        /// Whitelisted function
        function: Function,
        /// Arguments
        args: Vec<Self>,
    },
    /// `target[index]`
    Index {
        /// Indexed value
        target: Box<Self>,
        /// Index or key
        index: Box<Self>,
    },
    /// `target[start:end]`
    Slice {
        /// Sliced list
        target: Box<Self>,
        /// Inclusive start, defaults to 0
        start: Option<Box<Self>>,
        /// Exclusive end, defaults to the length
        end: Option<Box<Self>>,
    },
    /// `target.field`
    Member {
        /// Map value
        target: Box<Self>,
        /// Key
        field: String,
    },
    /// `if condition then a else b`
    Conditional {
        /// Condition
        condition: Box<Self>,
        /// Value when truthy
        then_branch: Box<Self>,
        /// Value when falsy
        else_branch: Box<Self>,
    },
}

impl Expr {
    /// Every identifier referenced by the expression, by exact token.
    ///
    /// Function names and member keys are not identifiers.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers(&self, out: &mut BTreeSet<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Ident(name) => {
                out.insert(name.clone());
            }
            Self::List(items) | Self::Call { args: items, .. } => {
                items.iter().for_each(|e| e.collect_identifiers(out));
            }
            Self::Unary { expr, .. } | Self::Member { target: expr, .. } => {
                expr.collect_identifiers(out);
            }
            Self::Binary { left, right, .. }
            | Self::Index {
                target: left,
                index: right,
            } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Self::Slice { target, start, end } => {
                target.collect_identifiers(out);
                for bound in [start, end].into_iter().flatten() {
                    bound.collect_identifiers(out);
                }
            }
            Self::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.collect_identifiers(out);
                then_branch.collect_identifiers(out);
                else_branch.collect_identifiers(out);
            }
        }
    }
}

/// One statement of a transform program.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `name = expr`
    Assign {
        /// Binding name
        name: String,
        /// Bound expression
        expr: Expr,
    },
    /// `return expr`
    Return(Expr),
    /// Bare expression
    Expr(Expr),
}

/// A parsed transform program.
///
/// Its value is the first `return`, else the binding named `result`, else the
/// last bare expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Statements in source order
    pub statements: Vec<Statement>,
}
