#![forbid(unsafe_code)]

//! Rewrites drifted expectations from observed behavior.

use crate::IrRunConfig;
use crate::log::{IrLogEntry, maybe_append_ir_log};
use crate::validator::{Observed, ValidationError, load_for_run, validate_loaded};
use irc_ir::{Expectation, IrError, persist_document, write_text};
use irc_runtime::TargetResolver;
use irc_value::{Predicate, UnrepresentableValue, Value, encode};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorrectionOutcome {
    pub corrected: usize,
    /// Number of mismatched cases found by the fresh validation run.
    pub total: usize,
    pub case_count: usize,
    pub mismatches: Vec<Mismatch>,
    /// The source only parsed after syntax repair.
    pub repaired: bool,
    /// Where the document was written; `None` when nothing was written.
    pub output_path: Option<PathBuf>,
    pub input_sha256: String,
    pub output_sha256: Option<String>,
}

impl CorrectionOutcome {
    #[must_use]
    pub fn wrote_document(&self) -> bool {
        self.output_path.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorrectionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("case `{case_id}` needs manual review: {source}")]
    Unrepresentable {
        case_id: String,
        #[source]
        source: UnrepresentableValue,
    },
    #[error(transparent)]
    Persist(IrError),
    #[error("{0}")]
    Log(String),
}

/// Corrects `document_path` with default run settings, writing to
/// `output_path` or back in place.
pub fn correct(
    document_path: &Path,
    resolver: &dyn TargetResolver,
    output_path: Option<&Path>,
) -> Result<CorrectionOutcome, CorrectionError> {
    correct_with_config(document_path, resolver, output_path, &IrRunConfig::default_paths())
}

pub fn correct_with_config(
    document_path: &Path,
    resolver: &dyn TargetResolver,
    output_path: Option<&Path>,
    config: &IrRunConfig,
) -> Result<CorrectionOutcome, CorrectionError> {
    let loaded = load_for_run(document_path, config)?;
    let report = validate_loaded(&loaded, resolver, config)?;
    let output = output_path.unwrap_or(document_path).to_path_buf();

    let mut outcome = CorrectionOutcome {
        corrected: 0,
        total: report.mismatch_count(),
        case_count: report.results.len(),
        mismatches: Vec::new(),
        repaired: loaded.repaired(),
        output_path: None,
        input_sha256: sha256_hex(loaded.raw.as_bytes()),
        output_sha256: None,
    };

    if outcome.total == 0 {
        if let Some(repaired_text) = &loaded.repaired_text {
            write_text(&output, repaired_text).map_err(CorrectionError::Persist)?;
            outcome.output_sha256 = Some(sha256_hex(repaired_text.as_bytes()));
            outcome.output_path = Some(output);
        }
        return Ok(outcome);
    }

    // Every replacement is built before anything is written.
    let mut replacements = Vec::with_capacity(outcome.total);
    for result in report.mismatches() {
        let expectation = synthesize_expectation(&result.actual, config.default_tolerance)
            .map_err(|source| CorrectionError::Unrepresentable {
                case_id: result.case_id.clone(),
                source,
            })?;
        replacements.push((result, expectation));
    }

    let mut document = loaded.document.clone();
    let target = document.target.clone();
    for (result, expectation) in replacements {
        let Some(case) = document.case_mut(&result.case_id) else {
            continue;
        };
        let reason = result.reason.clone().unwrap_or_default();
        maybe_append_ir_log(&IrLogEntry {
            phase: "correct".to_string(),
            target: target.clone(),
            case_id: Some(result.case_id.clone()),
            valid: Some(false),
            reason_code: format!("rewritten_as_{}", expectation.kind()),
            reason: Some(reason.clone()),
            actual: Some(result.actual.to_json()),
        })
        .map_err(CorrectionError::Log)?;
        case.expectation = expectation;
        outcome.mismatches.push(Mismatch {
            id: result.case_id.clone(),
            reason,
        });
        outcome.corrected += 1;
    }

    let written = persist_document(&output, &document).map_err(CorrectionError::Persist)?;
    outcome.output_sha256 = Some(sha256_hex(&written));
    outcome.output_path = Some(output);
    Ok(outcome)
}

/// Expectation that the observed outcome satisfies. Complex results other
/// than NaN, and strings that spell a sentinel token, have no IR form and are
/// rejected.
pub fn synthesize_expectation(
    observed: &Observed,
    tolerance: f64,
) -> Result<Expectation, UnrepresentableValue> {
    let value = match observed {
        Observed::Raised { kind, .. } => {
            return Ok(Expectation::Raises {
                types: vec![kind.clone()],
            });
        }
        Observed::Returned(value) => value,
    };

    match value {
        Value::Complex { .. } if value.is_nan() => Ok(predicate(Predicate::IsNotANumber)),
        Value::Complex { .. } => Err(UnrepresentableValue {
            value: value.clone(),
        }),
        Value::Float(v) if v.is_nan() => Ok(predicate(Predicate::IsNotANumber)),
        Value::Float(v) if v.is_infinite() => Ok(predicate(Predicate::IsInfinite)),
        other => Ok(Expectation::Equals {
            value: encode(other)?,
            tolerance: Some(tolerance),
        }),
    }
}

fn predicate(predicate: Predicate) -> Expectation {
    Expectation::Predicate {
        name: predicate.name().to_string(),
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}
