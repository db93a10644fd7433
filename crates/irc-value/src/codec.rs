#![forbid(unsafe_code)]

use crate::Value;
use crate::expr;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentinel {
    NotANumber,
    PositiveInfinity,
    NegativeInfinity,
    Null,
    True,
    False,
}

impl Sentinel {
    #[must_use]
    pub fn value(self) -> Value {
        match self {
            Self::NotANumber => Value::Float(f64::NAN),
            Self::PositiveInfinity => Value::Float(f64::INFINITY),
            Self::NegativeInfinity => Value::Float(f64::NEG_INFINITY),
            Self::Null => Value::Null,
            Self::True => Value::Bool(true),
            Self::False => Value::Bool(false),
        }
    }

    /// Exact, case-sensitive lookup in [`SENTINEL_TABLE`].
    #[must_use]
    pub fn lookup(token: &str) -> Option<Self> {
        SENTINEL_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == token)
            .map(|(_, sentinel)| *sentinel)
    }
}

/// Every token that decodes to a non-JSON-native value.
pub const SENTINEL_TABLE: [(&str, Sentinel); 9] = [
    ("NaN", Sentinel::NotANumber),
    ("Infinity", Sentinel::PositiveInfinity),
    ("-Infinity", Sentinel::NegativeInfinity),
    ("__nan__", Sentinel::NotANumber),
    ("__inf__", Sentinel::PositiveInfinity),
    ("__-inf__", Sentinel::NegativeInfinity),
    ("__none__", Sentinel::Null),
    ("__true__", Sentinel::True),
    ("__false__", Sentinel::False),
];

/// Tokens produced by [`encode`].
pub const CANONICAL_SENTINELS: [&str; 3] = ["NaN", "Infinity", "-Infinity"];

#[derive(Debug, Clone, PartialEq)]
pub struct UnrepresentableValue {
    pub value: Value,
}

impl fmt::Display for UnrepresentableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} value {} has no IR representation",
            self.value.type_name(),
            self.value
        )
    }
}

impl std::error::Error for UnrepresentableValue {}

/// Decodes an IR value. Strings that are not exact sentinels pass through.
#[must_use]
pub fn decode(raw: &JsonValue) -> Value {
    decode_with(raw, &|text| {
        Sentinel::lookup(text).map_or_else(|| Value::Str(text.to_string()), Sentinel::value)
    })
}

/// Decodes a call argument: sentinels, then `float(..)`/`int(..)`/`str(..)`
/// conversions, then literal double-quote unwrapping.
#[must_use]
pub fn decode_argument(raw: &JsonValue) -> Value {
    decode_with(raw, &decode_argument_string)
}

fn decode_argument_string(text: &str) -> Value {
    if let Some(sentinel) = Sentinel::lookup(text) {
        return sentinel.value();
    }
    if expr::looks_like_conversion(text) {
        if let Ok(value) = expr::evaluate(text) {
            return value;
        }
        return Value::Str(text.to_string());
    }
    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') {
        return Value::Str(text[1..text.len() - 1].to_string());
    }
    Value::Str(text.to_string())
}

fn decode_with(raw: &JsonValue, on_string: &dyn Fn(&str) -> Value) -> Value {
    match raw {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(v) => Value::Bool(*v),
        JsonValue::Number(number) => decode_number(number),
        JsonValue::String(text) => on_string(text),
        JsonValue::Array(items) => Value::List(
            items
                .iter()
                .map(|item| decode_with(item, on_string))
                .collect(),
        ),
        JsonValue::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(key, item)| (key.clone(), decode_with(item, on_string)))
                .collect::<BTreeMap<_, _>>(),
        ),
    }
}

fn decode_number(number: &Number) -> Value {
    if let Some(v) = number.as_i64() {
        Value::Int(v)
    } else if let Some(v) = number.as_u64() {
        Value::Float(v as f64)
    } else {
        Value::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

/// Encodes a native value for persistence. Non-finite floats become
/// canonical sentinels. Complex numbers are rejected, and so are strings that
/// are themselves sentinel tokens, since they would decode as something else.
pub fn encode(value: &Value) -> Result<JsonValue, UnrepresentableValue> {
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Int(v) => JsonValue::Number(Number::from(*v)),
        Value::Float(v) => encode_float(*v),
        Value::Complex { .. } => {
            return Err(UnrepresentableValue {
                value: value.clone(),
            });
        }
        Value::Str(text) if Sentinel::lookup(text).is_some() => {
            return Err(UnrepresentableValue {
                value: value.clone(),
            });
        }
        Value::Str(text) => JsonValue::String(text.clone()),
        Value::List(items) => {
            JsonValue::Array(items.iter().map(encode).collect::<Result<Vec<_>, _>>()?)
        }
        Value::Map(entries) => {
            let mut out = JsonMap::new();
            for (key, item) in entries {
                out.insert(key.clone(), encode(item)?);
            }
            JsonValue::Object(out)
        }
    })
}

fn encode_float(v: f64) -> JsonValue {
    if v.is_nan() {
        JsonValue::String(CANONICAL_SENTINELS[0].to_string())
    } else if v == f64::INFINITY {
        JsonValue::String(CANONICAL_SENTINELS[1].to_string())
    } else if v == f64::NEG_INFINITY {
        JsonValue::String(CANONICAL_SENTINELS[2].to_string())
    } else {
        Number::from_f64(v).map_or(JsonValue::Null, JsonValue::Number)
    }
}
