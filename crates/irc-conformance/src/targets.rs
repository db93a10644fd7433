#![forbid(unsafe_code)]

//! Demonstration targets reachable from the command-line tools.

use irc_runtime::{ErrorKind, Kwargs, TargetError, TargetRegistry, bind_argument, check_arity};
use irc_value::Value;
use regex::Regex;
use std::f64::consts::PI;
use std::sync::LazyLock;

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z0-9]+\b").expect("valid regex"));

pub fn builtin_registry() -> Result<TargetRegistry, String> {
    let mut registry = TargetRegistry::new();
    registry
        .register("division:divide", divide)?
        .alias("examples.division:divide", "division:divide")?
        .register("string_utils:is_palindrome", is_palindrome)?
        .register("string_utils:find_longest_word", find_longest_word)?
        .register("arith:power", power)?;
    Ok(registry)
}

fn numeric(function: &str, value: &Value) -> Result<f64, TargetError> {
    value.as_f64().ok_or_else(|| {
        TargetError::type_mismatch(format!(
            "{function}() arguments must be numeric, got {}",
            value.type_name()
        ))
    })
}

fn text<'a>(function: &str, value: &'a Value) -> Result<&'a str, TargetError> {
    value.as_str().ok_or_else(|| {
        TargetError::type_mismatch(format!(
            "{function}() expects a str, got {}",
            value.type_name()
        ))
    })
}

/// `a / b` as a float.
pub fn divide(args: &[Value], kwargs: &Kwargs) -> Result<Value, TargetError> {
    check_arity("divide", args, kwargs, &["a", "b"])?;
    let a = numeric("divide", bind_argument("divide", args, kwargs, 0, "a")?)?;
    let b = numeric("divide", bind_argument("divide", args, kwargs, 1, "b")?)?;
    if b == 0.0 {
        return Err(TargetError::new(
            ErrorKind::DivisionByZero,
            "Cannot divide by zero",
        ));
    }
    Ok(Value::Float(a / b))
}

/// Case-insensitive, ignoring everything but ASCII letters and digits.
pub fn is_palindrome(args: &[Value], kwargs: &Kwargs) -> Result<Value, TargetError> {
    check_arity("is_palindrome", args, kwargs, &["s"])?;
    let raw = text("is_palindrome", bind_argument("is_palindrome", args, kwargs, 0, "s")?)?;
    let cleaned = NON_ALNUM.replace_all(raw, "").to_ascii_lowercase();
    Ok(Value::Bool(cleaned.chars().eq(cleaned.chars().rev())))
}

/// First of the longest alphanumeric words, or null when there is none.
pub fn find_longest_word(args: &[Value], kwargs: &Kwargs) -> Result<Value, TargetError> {
    check_arity("find_longest_word", args, kwargs, &["sentence"])?;
    let sentence = text(
        "find_longest_word",
        bind_argument("find_longest_word", args, kwargs, 0, "sentence")?,
    )?;
    let mut longest: Option<&str> = None;
    for word in WORD.find_iter(sentence).map(|m| m.as_str()) {
        if longest.is_none_or(|best| word.chars().count() > best.chars().count()) {
            longest = Some(word);
        }
    }
    Ok(longest.map_or(Value::Null, Value::from))
}

/// `base ** exponent`. Integer operands with a non-negative exponent stay
/// integral; a negative base with a fractional exponent yields a complex
/// principal value.
pub fn power(args: &[Value], kwargs: &Kwargs) -> Result<Value, TargetError> {
    check_arity("power", args, kwargs, &["base", "exponent"])?;
    let base = bind_argument("power", args, kwargs, 0, "base")?;
    let exponent = bind_argument("power", args, kwargs, 1, "exponent")?;

    if let (Value::Int(b), Value::Int(e)) = (base, exponent)
        && *e >= 0
    {
        let exp = u32::try_from(*e).map_err(|_| overflow("integer exponent too large"))?;
        return b
            .checked_pow(exp)
            .map(Value::Int)
            .ok_or_else(|| overflow("integer result out of range"));
    }

    let b = numeric("power", base)?;
    let e = numeric("power", exponent)?;
    if b == 0.0 && e < 0.0 {
        return Err(TargetError::new(
            ErrorKind::DivisionByZero,
            "0.0 cannot be raised to a negative power",
        ));
    }
    if b < 0.0 && e.is_finite() && e.fract() != 0.0 {
        let magnitude = (-b).powf(e);
        let angle = e * PI;
        return Ok(Value::Complex {
            re: magnitude * angle.cos(),
            im: magnitude * angle.sin(),
        });
    }

    let result = b.powf(e);
    if result.is_infinite() && b.is_finite() && e.is_finite() {
        return Err(overflow("Numerical result out of range"));
    }
    Ok(Value::Float(result))
}

fn overflow(message: &str) -> TargetError {
    TargetError::new(ErrorKind::Overflow, message)
}
