//! Tree-walking interpreter.

use super::EvalError;
use super::ast::{BinaryOp, Expr, Function, Program, Statement, UnaryOp};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use vantage_data::Value;

/// Names visible to an expression.
pub trait Scope {
    /// Look up a name. `None` means the name does not exist at all;
    /// `Some(Value::Null)` means it exists but could not be computed.
    fn get(&self, name: &str) -> Option<&Value>;
}

impl Scope for BTreeMap<String, Value> {
    fn get(&self, name: &str) -> Option<&Value> {
        Self::get(self, name)
    }
}

/// Owned map scope, convenient for tests and transform inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapScope(pub BTreeMap<String, Value>);

impl Scope for MapScope {
    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

impl<const N: usize> From<[(&str, Value); N]> for MapScope {
    fn from(entries: [(&str, Value); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        )
    }
}

/// Evaluate an expression with at most `budget` node visits.
pub fn evaluate<S: Scope + ?Sized>(expr: &Expr, scope: &S, budget: usize) -> Result<Value, EvalError> {
    Interpreter::new(scope, budget).eval(expr)
}

/// Run a transform program with at most `budget` node visits.
pub fn run_program<S: Scope + ?Sized>(
    program: &Program,
    scope: &S,
    budget: usize,
) -> Result<Value, EvalError> {
    let mut interpreter = Interpreter::new(scope, budget);
    let mut last = None;
    for statement in &program.statements {
        match statement {
            Statement::Assign { name, expr } => {
                let value = interpreter.eval(expr)?;
                interpreter.locals.insert(name.clone(), value);
            }
            Statement::Return(expr) => return interpreter.eval(expr),
            Statement::Expr(expr) => last = Some(interpreter.eval(expr)?),
        }
    }
    interpreter
        .locals
        .remove("result")
        .or(last)
        .ok_or(EvalError::NoResult)
}

struct Interpreter<'s, S: ?Sized> {
    scope: &'s S,
    locals: BTreeMap<String, Value>,
    budget: usize,
    remaining: usize,
}

impl<'s, S: Scope + ?Sized> Interpreter<'s, S> {
    const fn new(scope: &'s S, budget: usize) -> Self {
        Self {
            scope,
            locals: BTreeMap::new(),
            budget,
            remaining: budget,
        }
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        if self.remaining == 0 {
            return Err(EvalError::BudgetExhausted(self.budget));
        }
        self.remaining -= 1;
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.tick()?;
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => self.lookup(name),
            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::Unary { op, expr: inner } => {
                let value = self.eval(inner)?;
                match op {
                    UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
                    UnaryOp::Neg => Ok(Value::Number(-number(&value, inner, "-")?)),
                }
            }
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                call(*function, &values, args)
            }
            Expr::Index { target, index } => {
                let container = self.eval(target)?;
                let key = self.eval(index)?;
                subscript(&container, target, &key)
            }
            Expr::Slice { target, start, end } => {
                let container = self.eval(target)?;
                let start = start.as_deref().map(|e| self.eval(e)).transpose()?;
                let end = end.as_deref().map(|e| self.eval(e)).transpose()?;
                slice(&container, target, start.as_ref(), end.as_ref())
            }
            Expr::Member { target, field } => match self.eval(target)? {
                Value::Map(map) => Ok(map.get(field).cloned().unwrap_or_default()),
                Value::Null => Err(missing(target, ".")),
                other => Err(EvalError::Type(format!(
                    "cannot read field '{field}' of {}",
                    other.type_name()
                ))),
            },
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition)?.truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        self.locals
            .get(name)
            .or_else(|| self.scope.get(name))
            .cloned()
            .ok_or_else(|| EvalError::UnknownIdentifier(name.to_string()))
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        match op {
            BinaryOp::And => {
                let lhs = self.eval(left)?;
                if !lhs.truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval(right)?.truthy()))
            }
            BinaryOp::Or => {
                let lhs = self.eval(left)?;
                if lhs.truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval(right)?.truthy()))
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                let equal = match (lhs.as_f64(), rhs.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => lhs == rhs,
                };
                Ok(Value::Bool(equal == (op == BinaryOp::Eq)))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                let ordering = compare(&lhs, left, &rhs, right, op)?;
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => ordering == Ordering::Less,
                    BinaryOp::Le => ordering != Ordering::Greater,
                    BinaryOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            BinaryOp::Add
            | BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Rem
            | BinaryOp::Pow => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                if let (BinaryOp::Add, Value::Text(a), Value::Text(b)) = (op, &lhs, &rhs) {
                    return Ok(Value::Text(format!("{a}{b}")));
                }
                let symbol = op.to_string();
                let a = number(&lhs, left, &symbol)?;
                let b = number(&rhs, right, &symbol)?;
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
                    BinaryOp::Div => a / b,
                    BinaryOp::Rem if b == 0.0 => return Err(EvalError::DivisionByZero),
                    // sign follows the divisor
                    BinaryOp::Rem => a - b * (a / b).floor(),
                    _ => a.powf(b),
                };
                finite(result, &symbol)
            }
        }
    }
}

fn missing(expr: &Expr, op: &str) -> EvalError {
    match expr {
        Expr::Ident(name) => EvalError::MissingValue(name.clone()),
        _ => EvalError::NullOperand(op.to_string()),
    }
}

fn number(value: &Value, expr: &Expr, op: &str) -> Result<f64, EvalError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Bool(b) => Ok(f64::from(u8::from(*b))),
        Value::Null => Err(missing(expr, op)),
        other => Err(EvalError::Type(format!(
            "'{op}' needs a number, got {}",
            other.type_name()
        ))),
    }
}

fn finite(result: f64, op: &str) -> Result<Value, EvalError> {
    if result.is_finite() {
        Ok(Value::Number(result))
    } else {
        Err(EvalError::Domain(format!("'{op}' produced a non-finite result")))
    }
}

fn compare(
    lhs: &Value,
    left: &Expr,
    rhs: &Value,
    right: &Expr,
    op: BinaryOp,
) -> Result<Ordering, EvalError> {
    let symbol = op.to_string();
    match (lhs, rhs) {
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        _ => {
            let a = number(lhs, left, &symbol)?;
            let b = number(rhs, right, &symbol)?;
            a.partial_cmp(&b)
                .ok_or_else(|| EvalError::Domain(format!("cannot order {a} and {b}")))
        }
    }
}

fn list_index(index: &Value, len: usize) -> Result<usize, EvalError> {
    let Some(raw) = index.as_f64().filter(|i| i.fract() == 0.0) else {
        return Err(EvalError::Type(format!(
            "list index must be an integer, got {index}"
        )));
    };
    let i = raw as i64;
    let resolved = if i < 0 { i + len as i64 } else { i };
    if resolved < 0 || resolved >= len as i64 {
        return Err(EvalError::IndexOutOfRange { index: i, len });
    }
    Ok(resolved as usize)
}

fn subscript(container: &Value, target: &Expr, key: &Value) -> Result<Value, EvalError> {
    match container {
        Value::List(items) => Ok(items[list_index(key, items.len())?].clone()),
        Value::Map(map) => match key {
            Value::Text(k) => Ok(map.get(k).cloned().unwrap_or_default()),
            other => Err(EvalError::Type(format!(
                "map key must be text, got {}",
                other.type_name()
            ))),
        },
        Value::Null => Err(missing(target, "[]")),
        other => Err(EvalError::Type(format!("cannot index {}", other.type_name()))),
    }
}

/// Python-style slice bound: negative counts from the end, clamped to `0..=len`.
fn slice_bound(bound: Option<&Value>, len: usize, default: usize) -> Result<usize, EvalError> {
    let Some(bound) = bound else {
        return Ok(default);
    };
    if bound.is_null() {
        return Ok(default);
    }
    let Some(raw) = bound.as_f64().filter(|i| i.fract() == 0.0) else {
        return Err(EvalError::Type(format!(
            "slice bound must be an integer, got {bound}"
        )));
    };
    let i = raw as i64;
    let resolved = if i < 0 { i + len as i64 } else { i };
    Ok(resolved.clamp(0, len as i64) as usize)
}

fn slice(
    container: &Value,
    target: &Expr,
    start: Option<&Value>,
    end: Option<&Value>,
) -> Result<Value, EvalError> {
    match container {
        Value::List(items) => {
            let len = items.len();
            let from = slice_bound(start, len, 0)?;
            let to = slice_bound(end, len, len)?;
            Ok(Value::List(if from < to {
                items[from..to].to_vec()
            } else {
                Vec::new()
            }))
        }
        Value::Null => Err(missing(target, "[:]")),
        other => Err(EvalError::Type(format!("cannot slice {}", other.type_name()))),
    }
}

fn arity(function: Function, values: &[Value], accepted: &[usize], label: &'static str) -> Result<(), EvalError> {
    if accepted.contains(&values.len()) {
        Ok(())
    } else {
        Err(EvalError::Arity {
            function: function.name(),
            expected: label,
            actual: values.len(),
        })
    }
}

/// Numbers of a list argument; every entry must be numeric.
fn numeric_list(function: Function, value: &Value, expr: &Expr) -> Result<Vec<f64>, EvalError> {
    match value {
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => Err(EvalError::NullOperand(function.name().to_string())),
                other => number(other, expr, function.name()),
            })
            .collect(),
        Value::Null => Err(missing(expr, function.name())),
        other => Err(EvalError::Type(format!(
            "{} expects a list, got {}",
            function.name(),
            other.type_name()
        ))),
    }
}

fn call(function: Function, values: &[Value], args: &[Expr]) -> Result<Value, EvalError> {
    let name = function.name();
    let arg = |i: usize| number(&values[i], &args[i], name);

    match function {
        Function::Abs => {
            arity(function, values, &[1], "1")?;
            Ok(Value::Number(arg(0)?.abs()))
        }
        Function::Sqrt => {
            arity(function, values, &[1], "1")?;
            let x = arg(0)?;
            if x < 0.0 {
                return Err(EvalError::Domain(format!("sqrt of negative number {x}")));
            }
            Ok(Value::Number(x.sqrt()))
        }
        Function::Pow => {
            arity(function, values, &[2], "2")?;
            finite(arg(0)?.powf(arg(1)?), name)
        }
        Function::Round => {
            arity(function, values, &[1, 2], "1 or 2")?;
            let x = arg(0)?;
            let digits = if values.len() == 2 { arg(1)?.trunc() as i32 } else { 0 };
            let scale = 10f64.powi(digits);
            finite((x * scale).round() / scale, name)
        }
        Function::Min | Function::Max => {
            if values.is_empty() {
                return Err(EvalError::Arity {
                    function: name,
                    expected: "at least 1",
                    actual: 0,
                });
            }
            let numbers = if values.len() == 1 {
                numeric_list(function, &values[0], &args[0])?
            } else {
                (0..values.len()).map(arg).collect::<Result<Vec<_>, _>>()?
            };
            let pick = if function == Function::Min { f64::min } else { f64::max };
            numbers
                .into_iter()
                .reduce(pick)
                .map(Value::Number)
                .ok_or_else(|| EvalError::Domain(format!("{name} of an empty sequence")))
        }
        Function::Sum => {
            arity(function, values, &[1], "1")?;
            let numbers = numeric_list(function, &values[0], &args[0])?;
            finite(numbers.iter().sum(), name)
        }
        Function::Avg => {
            arity(function, values, &[1], "1")?;
            let numbers = numeric_list(function, &values[0], &args[0])?;
            if numbers.is_empty() {
                return Err(EvalError::DivisionByZero);
            }
            finite(numbers.iter().sum::<f64>() / numbers.len() as f64, name)
        }
        Function::Len => {
            arity(function, values, &[1], "1")?;
            let len = match &values[0] {
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                Value::Text(s) => s.chars().count(),
                Value::Null => return Err(missing(&args[0], name)),
                other => {
                    return Err(EvalError::Type(format!(
                        "len of {} is undefined",
                        other.type_name()
                    )));
                }
            };
            Ok(Value::Number(len as f64))
        }
        Function::Float | Function::Int => {
            arity(function, values, &[1], "1")?;
            let x = match &values[0] {
                Value::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                    EvalError::Type(format!("cannot convert '{s}' to a number"))
                })?,
                _ => arg(0)?,
            };
            let x = if function == Function::Int { x.trunc() } else { x };
            finite(x, name)
        }
        Function::Get => {
            arity(function, values, &[2, 3], "2 or 3")?;
            let default = values.get(2).cloned().unwrap_or_default();
            match (&values[0], &values[1]) {
                (Value::Map(map), Value::Text(key)) => Ok(map
                    .get(key)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .unwrap_or(default)),
                (Value::Null, _) => Ok(default),
                (container, key) => Err(EvalError::Type(format!(
                    "get expects a map and a text key, got {} and {}",
                    container.type_name(),
                    key.type_name()
                ))),
            }
        }
    }
}
