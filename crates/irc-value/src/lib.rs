#![forbid(unsafe_code)]

pub mod codec;
pub mod expr;
pub mod predicate;

pub use codec::{
    CANONICAL_SENTINELS, SENTINEL_TABLE, Sentinel, UnrepresentableValue, decode, decode_argument,
    encode,
};
pub use expr::{Conversion, ExprError, evaluate};
pub use predicate::{Predicate, PredicateResolutionError};

use std::collections::BTreeMap;
use std::fmt;

/// Native value passed to and returned from a target.
///
/// `Complex` never comes out of the codec; it only appears as a target result.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Complex { re: f64, im: f64 },
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Complex { .. } => "complex",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Real numeric view. Booleans are not numeric here.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_real_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_nan(&self) -> bool {
        match self {
            Self::Float(v) => v.is_nan(),
            Self::Complex { re, im } => re.is_nan() || im.is_nan(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_infinite(&self) -> bool {
        match self {
            Self::Float(v) => v.is_infinite(),
            Self::Complex { re, im } => re.is_infinite() || im.is_infinite(),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Complex { re, im } => {
                if im.is_sign_negative() {
                    write!(f, "({re:?}-{:?}j)", im.abs())
                } else {
                    write!(f, "({re:?}+{im:?}j)")
                }
            }
            Self::Str(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (idx, (key, item)) in entries.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key:?}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Value;
    use std::collections::BTreeMap;

    #[test]
    fn display_matches_report_format() {
        assert_eq!(Value::Float(5.0).to_string(), "5.0");
        assert_eq!(Value::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Int(-3).to_string(), "-3");
        assert_eq!(Value::from("a\"b").to_string(), "\"a\\\"b\"");
        assert_eq!(
            Value::Complex { re: 1.0, im: -2.0 }.to_string(),
            "(1.0-2.0j)"
        );

        let mut map = BTreeMap::new();
        map.insert("k".to_string(), Value::List(vec![Value::Null, Value::Bool(true)]));
        assert_eq!(Value::Map(map).to_string(), "{\"k\": [null, true]}");
    }

    #[test]
    fn complex_classification_looks_at_both_components() {
        let nan_imag = Value::Complex {
            re: 0.0,
            im: f64::NAN,
        };
        assert!(nan_imag.is_nan());
        assert!(!nan_imag.is_infinite());

        let inf_real = Value::Complex {
            re: f64::NEG_INFINITY,
            im: 1.0,
        };
        assert!(inf_real.is_infinite());
        assert!(!Value::Int(7).is_nan());
        assert_eq!(Value::Bool(true).as_f64(), None);
    }
}
