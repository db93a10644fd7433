#![forbid(unsafe_code)]

pub mod policy;
pub mod registry;

pub use policy::{InvocationPolicy, SerialInvoker};
pub use registry::{TargetRef, TargetRegistry, TargetResolutionError, TargetResolver};

use irc_value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Host-neutral error kind. Persisted by [`ErrorKind::name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorKind {
    DivisionByZero,
    TypeMismatch,
    InvalidArgument,
    Overflow,
    Timeout,
    Panic,
    Other(String),
}

const ERROR_KIND_ALIASES: [(&str, ErrorKind); 13] = [
    ("DivisionByZero", ErrorKind::DivisionByZero),
    ("ZeroDivisionError", ErrorKind::DivisionByZero),
    ("ZeroDivisionKind", ErrorKind::DivisionByZero),
    ("TypeMismatch", ErrorKind::TypeMismatch),
    ("TypeError", ErrorKind::TypeMismatch),
    ("InvalidArgument", ErrorKind::InvalidArgument),
    ("ValueError", ErrorKind::InvalidArgument),
    ("Overflow", ErrorKind::Overflow),
    ("OverflowError", ErrorKind::Overflow),
    ("Timeout", ErrorKind::Timeout),
    ("TimeoutError", ErrorKind::Timeout),
    ("Panic", ErrorKind::Panic),
    ("RuntimePanic", ErrorKind::Panic),
];

impl ErrorKind {
    /// Maps canonical names and known host spellings; anything else is kept
    /// verbatim as [`ErrorKind::Other`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        let trimmed = name.trim();
        ERROR_KIND_ALIASES
            .iter()
            .find(|(alias, _)| *alias == trimmed)
            .map_or_else(|| Self::Other(trimmed.to_string()), |(_, kind)| kind.clone())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::DivisionByZero => "DivisionByZero",
            Self::TypeMismatch => "TypeMismatch",
            Self::InvalidArgument => "InvalidArgument",
            Self::Overflow => "Overflow",
            Self::Timeout => "Timeout",
            Self::Panic => "Panic",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ErrorKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ErrorKind> for String {
    fn from(value: ErrorKind) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error raised by a target invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TargetError {
    pub kind: ErrorKind,
    pub message: String,
}

impl TargetError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch, message)
    }
}

pub type Kwargs = BTreeMap<String, Value>;

/// A callable under test.
pub trait Invocable: Send + Sync {
    fn invoke(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, TargetError>;
}

impl<F> Invocable for F
where
    F: Fn(&[Value], &Kwargs) -> Result<Value, TargetError> + Send + Sync,
{
    fn invoke(&self, args: &[Value], kwargs: &Kwargs) -> Result<Value, TargetError> {
        self(args, kwargs)
    }
}

/// Fetches parameter `index` positionally or by `name`, rejecting both.
pub fn bind_argument<'a>(
    function: &str,
    args: &'a [Value],
    kwargs: &'a Kwargs,
    index: usize,
    name: &str,
) -> Result<&'a Value, TargetError> {
    match (args.get(index), kwargs.get(name)) {
        (Some(_), Some(_)) => Err(TargetError::type_mismatch(format!(
            "{function}() got multiple values for argument '{name}'"
        ))),
        (Some(value), None) | (None, Some(value)) => Ok(value),
        (None, None) => Err(TargetError::type_mismatch(format!(
            "{function}() missing required argument '{name}'"
        ))),
    }
}

/// Rejects surplus positional arguments and unknown keywords.
pub fn check_arity(
    function: &str,
    args: &[Value],
    kwargs: &Kwargs,
    params: &[&str],
) -> Result<(), TargetError> {
    if args.len() > params.len() {
        return Err(TargetError::type_mismatch(format!(
            "{function}() takes {} positional arguments but {} were given",
            params.len(),
            args.len()
        )));
    }
    if let Some(unknown) = kwargs.keys().find(|key| !params.contains(&key.as_str())) {
        return Err(TargetError::type_mismatch(format!(
            "{function}() got an unexpected keyword argument '{unknown}'"
        )));
    }
    Ok(())
}
