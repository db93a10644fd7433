#![forbid(unsafe_code)]

//! Restricted conversion evaluator.
//!
//! Accepts exactly `identifier(literal)` where the identifier is one of
//! `float`, `int`, `str` and the literal is a quoted string, a numeric
//! literal, or empty. Nothing else is reachable.

use crate::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Float,
    Int,
    Str,
}

impl Conversion {
    pub const ALL: [Self; 3] = [Self::Float, Self::Int, Self::Str];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Str => "str",
        }
    }

    fn parse(ident: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|conv| conv.name() == ident)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    NotACall,
    UnknownConversion(String),
    MalformedLiteral(String),
    ConversionFailed {
        conversion: Conversion,
        literal: String,
    },
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotACall => write!(f, "expression is not of the form name(literal)"),
            Self::UnknownConversion(name) => {
                write!(f, "conversion `{name}` is not one of float, int, str")
            }
            Self::MalformedLiteral(raw) => write!(f, "malformed literal `{raw}`"),
            Self::ConversionFailed {
                conversion,
                literal,
            } => write!(f, "{}() cannot convert `{literal}`", conversion.name()),
        }
    }
}

impl std::error::Error for ExprError {}

enum Literal {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
}

/// Cheap prefix test used by the codec before attempting evaluation.
#[must_use]
pub fn looks_like_conversion(text: &str) -> bool {
    Conversion::ALL
        .iter()
        .any(|conv| text.strip_prefix(conv.name()).is_some_and(|rest| rest.starts_with('(')))
}

pub fn evaluate(text: &str) -> Result<Value, ExprError> {
    let trimmed = text.trim();
    let open = trimmed.find('(').ok_or(ExprError::NotACall)?;
    let inner = trimmed[open + 1..]
        .strip_suffix(')')
        .ok_or(ExprError::NotACall)?;
    let ident = trimmed[..open].trim();
    let conversion =
        Conversion::parse(ident).ok_or_else(|| ExprError::UnknownConversion(ident.to_string()))?;
    let literal = parse_literal(inner.trim())?;
    apply(conversion, literal)
}

fn parse_literal(raw: &str) -> Result<Literal, ExprError> {
    if raw.is_empty() {
        return Ok(Literal::Empty);
    }
    for quote in ['\'', '"'] {
        if raw.starts_with(quote) {
            let body = raw[1..]
                .strip_suffix(quote)
                .ok_or_else(|| ExprError::MalformedLiteral(raw.to_string()))?;
            if body.contains(quote) || body.contains('\\') {
                return Err(ExprError::MalformedLiteral(raw.to_string()));
            }
            return Ok(Literal::Text(body.to_string()));
        }
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(Literal::Int(v));
    }
    let is_numeric_token = raw
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if is_numeric_token && let Ok(v) = raw.parse::<f64>() {
        return Ok(Literal::Float(v));
    }
    Err(ExprError::MalformedLiteral(raw.to_string()))
}

fn apply(conversion: Conversion, literal: Literal) -> Result<Value, ExprError> {
    let failed = |literal: &str| ExprError::ConversionFailed {
        conversion,
        literal: literal.to_string(),
    };
    match (conversion, literal) {
        (Conversion::Float, Literal::Empty) => Ok(Value::Float(0.0)),
        (Conversion::Float, Literal::Int(v)) => Ok(Value::Float(v as f64)),
        (Conversion::Float, Literal::Float(v)) => Ok(Value::Float(v)),
        (Conversion::Float, Literal::Text(text)) => {
            parse_float_text(&text).map(Value::Float).ok_or_else(|| failed(&text))
        }
        (Conversion::Int, Literal::Empty) => Ok(Value::Int(0)),
        (Conversion::Int, Literal::Int(v)) => Ok(Value::Int(v)),
        (Conversion::Int, Literal::Float(v)) => {
            let truncated = v.trunc();
            if truncated.is_finite() && truncated.abs() < 9.2e18 {
                Ok(Value::Int(truncated as i64))
            } else {
                Err(failed(&v.to_string()))
            }
        }
        (Conversion::Int, Literal::Text(text)) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| failed(&text)),
        (Conversion::Str, Literal::Empty) => Ok(Value::Str(String::new())),
        (Conversion::Str, Literal::Text(text)) => Ok(Value::Str(text)),
        (Conversion::Str, Literal::Int(v)) => Ok(Value::Str(v.to_string())),
        (Conversion::Str, Literal::Float(v)) => Ok(Value::Str(format!("{v:?}"))),
    }
}

/// `float(str)` semantics: surrounding whitespace ignored, `nan`, `inf` and
/// `infinity` accepted in any case with an optional sign.
fn parse_float_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let (sign, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1.0, &trimmed[1..]),
        Some(b'+') => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    let lowered = body.to_ascii_lowercase();
    match lowered.as_str() {
        "nan" => return Some(f64::NAN),
        "inf" | "infinity" => return Some(sign * f64::INFINITY),
        _ => {}
    }
    let plain = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !plain || body.is_empty() || body.starts_with(['+', '-']) {
        return None;
    }
    body.parse::<f64>().ok().map(|v| sign * v)
}
