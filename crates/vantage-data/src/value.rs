//! Dynamically-typed values.
//!
//! Raw statement fields, computed metrics and intermediate expression results all
//! share this representation. A computed metric is either a scalar, a list (one
//! entry per quarter, most-recent-first) or a map (multi-field extraction).
//! [`Value::Null`] means "could not compute".

use derive_more::From;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A raw or computed value.
#[derive(Debug, Clone, PartialEq, Default, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing / not computable
    #[default]
    #[from(ignore)]
    Null,
    /// Boolean flag
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Free text (dates, identifiers, categorical fields)
    Text(String),
    /// Ordered values, most-recent-first for quarterly series
    List(Vec<Self>),
    /// Named values
    Map(BTreeMap<String, Self>),
}

impl Value {
    /// Returns the numeric payload if this is a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    /// Returns true for [`Value::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the list payload.
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the map payload.
    pub const fn as_map(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the text payload.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by conditional expressions.
    ///
    /// Null, `false`, zero, NaN, empty text, empty lists and empty maps are falsy.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
        }
    }

    /// Short type name for diagnostics.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Numeric entries of a list, in order, skipping anything that is not a
    /// finite number. A scalar number yields a one-element series.
    pub fn numeric_series(&self) -> Option<Vec<f64>> {
        match self {
            Self::List(items) => Some(items.iter().filter_map(Self::as_f64).collect()),
            Self::Number(_) => self.as_f64().map(|n| vec![n]),
            _ => None,
        }
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Number)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Self::List(values.into_iter().map(Self::Number).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json() {
        let value: Value = serde_json::from_str(r#"{"a": 1, "b": [2.5, null], "c": "x"}"#).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["a"], Value::Number(1.0));
        assert_eq!(
            map["b"],
            Value::List(vec![Value::Number(2.5), Value::Null])
        );
        assert_eq!(map["c"], Value::Text("x".to_string()));
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(Value::Number(-1.0).truthy());
        assert!(!Value::List(vec![]).truthy());
        assert!(Value::Bool(true).truthy());
    }

    #[test]
    fn test_numeric_series_drops_nulls() {
        let value = Value::List(vec![
            Value::Number(3.0),
            Value::Null,
            Value::Text("n/a".into()),
            Value::Number(1.0),
        ]);
        assert_eq!(value.numeric_series(), Some(vec![3.0, 1.0]));
        assert_eq!(Value::Number(2.0).numeric_series(), Some(vec![2.0]));
        assert_eq!(Value::Null.numeric_series(), None);
    }

    #[test]
    fn test_non_finite_is_not_numeric() {
        assert_eq!(Value::Number(f64::NAN).as_f64(), None);
        assert_eq!(Value::Number(f64::INFINITY).as_f64(), None);
    }

    #[test]
    fn test_display() {
        let value = Value::from(vec![1.0, 2.0]);
        assert_eq!(value.to_string(), "[1, 2]");
    }
}
