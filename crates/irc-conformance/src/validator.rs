#![forbid(unsafe_code)]

use crate::IrRunConfig;
use crate::log::{IrLogEntry, maybe_append_ir_log};
use irc_ir::{Case, Expectation, IrDocument, IrError, LoadedDocument, SchemaCheck, load_document};
use irc_runtime::{
    ErrorKind, Invocable, Kwargs, SerialInvoker, TargetRef, TargetResolutionError,
    TargetResolver,
};
use irc_value::{Predicate, PredicateResolutionError, Value, decode, decode_argument, encode};
use serde::{Serialize, Serializer};
use serde_json::{Value as JsonValue, json};
use std::path::Path;
use std::sync::Arc;

/// What a single target call did.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Returned(Value),
    Raised { kind: ErrorKind, message: String },
}

impl Observed {
    /// Report form: the encoded value, or `{"exception": kind}`. Values the
    /// codec cannot express are rendered as text.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Returned(value) => {
                encode(value).unwrap_or_else(|_| JsonValue::String(value.to_string()))
            }
            Self::Raised { kind, message } => json!({"exception": kind.name(), "message": message}),
        }
    }
}

impl Serialize for Observed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub case_id: String,
    pub valid: bool,
    pub actual: Observed,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub target: String,
    pub results: Vec<ValidationResult>,
    pub repaired: bool,
    pub schema: SchemaCheck,
}

impl ValidationReport {
    pub fn mismatches(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|result| !result.valid)
    }

    #[must_use]
    pub fn mismatch_count(&self) -> usize {
        self.mismatches().count()
    }

    #[must_use]
    pub fn all_valid(&self) -> bool {
        self.results.iter().all(|result| result.valid)
    }
}

/// Conditions that abort a run. Mismatches are never errors.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Ir(#[from] IrError),
    #[error(transparent)]
    TargetResolution(#[from] TargetResolutionError),
    #[error("case `{case_id}`: {source}")]
    PredicateResolution {
        case_id: String,
        #[source]
        source: PredicateResolutionError,
    },
    #[error("{0}")]
    Log(String),
}

/// Loads `path` with the run's schema settings and logs repair or
/// schema-skip notices.
pub fn load_for_run(path: &Path, config: &IrRunConfig) -> Result<LoadedDocument, ValidationError> {
    let loaded = load_document(path, &config.load_options())?;
    let target = loaded.document.target.as_str();
    if loaded.repaired() {
        maybe_append_ir_log(&IrLogEntry::notice(
            target,
            "syntax_repaired",
            format!("{} parsed after syntax repair", path.display()),
        ))
        .map_err(ValidationError::Log)?;
    }
    if let SchemaCheck::Skipped { path: schema, reason } = &loaded.schema {
        maybe_append_ir_log(&IrLogEntry::notice(
            target,
            "schema_skipped",
            format!("{}: {reason}", schema.display()),
        ))
        .map_err(ValidationError::Log)?;
    }
    Ok(loaded)
}

pub fn validate_path(
    path: &Path,
    resolver: &dyn TargetResolver,
    config: &IrRunConfig,
) -> Result<ValidationReport, ValidationError> {
    let loaded = load_for_run(path, config)?;
    validate_loaded(&loaded, resolver, config)
}

pub fn validate_loaded(
    loaded: &LoadedDocument,
    resolver: &dyn TargetResolver,
    config: &IrRunConfig,
) -> Result<ValidationReport, ValidationError> {
    Ok(ValidationReport {
        target: loaded.document.target.clone(),
        results: validate_document(&loaded.document, resolver, config)?,
        repaired: loaded.repaired(),
        schema: loaded.schema.clone(),
    })
}

/// One result per case, in document order. The target is resolved once and
/// its calls are never overlapped.
pub fn validate_document(
    document: &IrDocument,
    resolver: &dyn TargetResolver,
    config: &IrRunConfig,
) -> Result<Vec<ValidationResult>, ValidationError> {
    let target_ref = TargetRef::parse(&document.target).map_err(|detail| TargetResolutionError {
        target: document.target.clone(),
        detail,
    })?;
    let target = resolver.resolve(&target_ref)?;
    let mut invoker = config.policy().invoker();

    let mut results = Vec::with_capacity(document.cases.len());
    for case in &document.cases {
        let result = validate_case(case, &target, &mut invoker, config.default_tolerance)?;
        maybe_append_ir_log(&IrLogEntry {
            phase: "validate".to_string(),
            target: document.target.clone(),
            case_id: Some(result.case_id.clone()),
            valid: Some(result.valid),
            reason_code: reason_code(&case.expectation, &result).to_string(),
            reason: result.reason.clone(),
            actual: Some(result.actual.to_json()),
        })
        .map_err(ValidationError::Log)?;
        results.push(result);
    }
    Ok(results)
}

fn validate_case(
    case: &Case,
    target: &Arc<dyn Invocable>,
    invoker: &mut SerialInvoker,
    default_tolerance: f64,
) -> Result<ValidationResult, ValidationError> {
    let predicate = match &case.expectation {
        Expectation::Predicate { name } => Some(Predicate::resolve(name).map_err(|source| {
            ValidationError::PredicateResolution {
                case_id: case.id.clone(),
                source,
            }
        })?),
        _ => None,
    };

    let args: Vec<Value> = case.call.args.iter().map(decode_argument).collect();
    let kwargs: Kwargs = case
        .call
        .kwargs
        .iter()
        .map(|(name, raw)| (name.clone(), decode_argument(raw)))
        .collect();

    let actual = match invoker.invoke(target, args, kwargs) {
        Ok(value) => Observed::Returned(value),
        Err(err) => Observed::Raised {
            kind: err.kind,
            message: err.message,
        },
    };
    let reason = judge(&case.expectation, predicate, &actual, default_tolerance);
    Ok(ValidationResult {
        case_id: case.id.clone(),
        valid: reason.is_none(),
        actual,
        reason,
    })
}

/// `None` when the observation satisfies the expectation, otherwise the
/// mismatch reason.
fn judge(
    expectation: &Expectation,
    predicate: Option<Predicate>,
    actual: &Observed,
    default_tolerance: f64,
) -> Option<String> {
    match (expectation, actual) {
        (Expectation::Raises { types }, Observed::Raised { kind, message }) => {
            if types.contains(kind) {
                None
            } else {
                Some(format!(
                    "wrong error kind: expected one of [{}], got {kind}: {message}",
                    kind_list(types)
                ))
            }
        }
        (Expectation::Raises { types }, Observed::Returned(value)) => Some(format!(
            "expected error [{}], got normal return {value}",
            kind_list(types)
        )),
        (_, Observed::Raised { kind, message }) => {
            Some(format!("unexpected error {kind}: {message}"))
        }
        (Expectation::Equals { value, tolerance }, Observed::Returned(returned)) => {
            let expected = decode(value);
            let tolerance = tolerance.unwrap_or(default_tolerance);
            if values_match(returned, &expected, tolerance) {
                None
            } else {
                Some(format!(
                    "expected {expected} (tolerance {tolerance:e}), got {returned}"
                ))
            }
        }
        (Expectation::Predicate { name }, Observed::Returned(returned)) => match predicate {
            Some(predicate) if predicate.apply(returned) => None,
            _ => Some(format!("predicate {name} not satisfied by {returned}")),
        },
    }
}

fn kind_list(types: &[ErrorKind]) -> String {
    types
        .iter()
        .map(ErrorKind::name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn reason_code(expectation: &Expectation, result: &ValidationResult) -> &'static str {
    if result.valid {
        return "valid";
    }
    match (expectation, &result.actual) {
        (Expectation::Raises { .. }, Observed::Raised { .. }) => "wrong_error_kind",
        (Expectation::Raises { .. }, Observed::Returned(_)) => "expected_error",
        (_, Observed::Raised { .. }) => "unexpected_error",
        (Expectation::Predicate { .. }, _) => "predicate_unsatisfied",
        (Expectation::Equals { .. }, _) => "value_mismatch",
    }
}

/// Numeric operands match when equal or within `tolerance`; NaN never does.
/// Containers match element-wise with exact numeric comparison, where NaN
/// matches NaN so re-encoded results compare equal to themselves.
#[must_use]
pub fn values_match(actual: &Value, expected: &Value, tolerance: f64) -> bool {
    match (actual, expected) {
        (Value::Int(a), Value::Int(e)) => {
            a == e || ((i128::from(*a) - i128::from(*e)).unsigned_abs() as f64) <= tolerance
        }
        (Value::Complex { .. }, _) | (_, Value::Complex { .. }) => {
            match (complex_parts(actual), complex_parts(expected)) {
                (Some((ar, ai)), Some((er, ei))) => {
                    close(ar, er, tolerance) && close(ai, ei, tolerance)
                }
                _ => false,
            }
        }
        _ => match (actual.as_f64(), expected.as_f64()) {
            (Some(a), Some(e)) => close(a, e, tolerance),
            _ => structurally_equal(actual, expected),
        },
    }
}

fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
    actual == expected || (actual - expected).abs() <= tolerance
}

fn complex_parts(value: &Value) -> Option<(f64, f64)> {
    match value {
        Value::Complex { re, im } => Some((*re, *im)),
        other => other.as_f64().map(|re| (re, 0.0)),
    }
}

fn structurally_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::List(a), Value::List(e)) => {
            a.len() == e.len() && a.iter().zip(e).all(|(a, e)| element_equal(a, e))
        }
        (Value::Map(a), Value::Map(e)) => {
            a.len() == e.len()
                && a.iter()
                    .zip(e)
                    .all(|((ak, av), (ek, ev))| ak == ek && element_equal(av, ev))
        }
        _ => actual == expected,
    }
}

fn element_equal(actual: &Value, expected: &Value) -> bool {
    if actual.is_nan() && expected.is_nan() {
        return true;
    }
    values_match(actual, expected, 0.0)
}
