use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use irc_conformance::{
    CorrectionError, IrLogEntry, IrRunConfig, ValidationError, builtin_registry, correct,
    correct_with_config, set_ir_log_path, sha256_hex, validate_path,
};
use irc_ir::{Expectation, IrError, LoadOptions, SchemaCheck, load_document, parse_with_repair};
use irc_runtime::{ErrorKind, Kwargs, TargetError, TargetRegistry};
use irc_value::Value;
use serde_json::json;

static STAGED: AtomicUsize = AtomicUsize::new(0);

/// Copies a fixture into a fresh `<tmp>/ir/` directory, optionally with the
/// sibling `schemas/` directory so discovery finds it.
fn stage(fixture: &str, with_schema: bool) -> PathBuf {
    let cfg = IrRunConfig::default_paths();
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let seq = STAGED.fetch_add(1, Ordering::Relaxed);
    let root = std::env::temp_dir().join(format!(
        "irc_smoke_{}_{ts}_{seq}",
        fixture.trim_end_matches(".json")
    ));
    let ir_dir = root.join("ir");
    fs::create_dir_all(&ir_dir).expect("create staging dir");
    let dest = ir_dir.join(fixture);
    fs::copy(cfg.fixture_root.join("ir").join(fixture), &dest).expect("copy fixture");
    if with_schema {
        let schema_dir = root.join("schemas");
        fs::create_dir_all(&schema_dir).expect("create schema dir");
        fs::copy(
            cfg.fixture_root.join("schemas/ir_schema.json"),
            schema_dir.join("ir_schema.json"),
        )
        .expect("copy schema");
    }
    dest
}

fn stage_text(name: &str, text: &str, with_schema: bool) -> PathBuf {
    let path = stage("division_valid.json", with_schema);
    let dest = path.with_file_name(name);
    fs::write(&dest, text).expect("write staged text");
    dest
}

fn expectation_of(path: &Path, id: &str) -> Expectation {
    let loaded = load_document(path, &LoadOptions::default()).expect("reload");
    loaded
        .document
        .case(id)
        .map(|case| case.expectation.clone())
        .expect("case present")
}

#[test]
fn checked_in_fixtures_validate_against_discovered_schema() {
    let cfg = IrRunConfig::default_paths();
    let registry = builtin_registry().expect("registry");
    let path = cfg.fixture_root.join("ir/division_valid.json");
    let report = validate_path(&path, &registry, &cfg).expect("validation runs");

    assert!(report.all_valid(), "unexpected mismatches: {:?}", report.results);
    assert_eq!(report.results.len(), 5);
    assert!(matches!(report.schema, SchemaCheck::Validated(_)));
    assert!(!report.repaired);
}

#[test]
fn correcting_a_correct_document_is_a_byte_for_byte_no_op() {
    let path = stage("division_valid.json", true);
    let before = fs::read(&path).expect("read before");
    let registry = builtin_registry().expect("registry");

    let outcome = correct(&path, &registry, None).expect("correction runs");
    assert_eq!(outcome.corrected, 0);
    assert_eq!(outcome.total, 0);
    assert_eq!(outcome.case_count, 5);
    assert!(!outcome.wrote_document());
    assert_eq!(outcome.input_sha256, sha256_hex(&before));
    assert_eq!(fs::read(&path).expect("read after"), before);
}

#[test]
fn drifted_expectations_are_rewritten_from_observed_outcomes() {
    let path = stage("division_drift.json", true);
    let registry = builtin_registry().expect("registry");

    let outcome = correct(&path, &registry, None).expect("correction runs");
    assert_eq!(outcome.corrected, 3);
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.case_count, 4);
    let ids: Vec<&str> = outcome.mismatches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["divide_by_zero", "divide_tiny_divisor", "divide_nan"]);
    assert!(outcome.mismatches[0].reason.contains("DivisionByZero"));
    assert_eq!(outcome.output_path.as_deref(), Some(path.as_path()));

    assert_eq!(
        expectation_of(&path, "divide_by_zero"),
        Expectation::Raises {
            types: vec![ErrorKind::DivisionByZero]
        }
    );
    assert_eq!(
        expectation_of(&path, "divide_tiny_divisor"),
        Expectation::Equals {
            value: json!(1e308),
            tolerance: Some(1e-10)
        }
    );
    assert_eq!(
        expectation_of(&path, "divide_nan"),
        Expectation::Predicate {
            name: "is-not-a-number".to_string()
        }
    );
    assert_eq!(
        expectation_of(&path, "divide_10_by_2"),
        Expectation::Equals {
            value: json!(5.0),
            tolerance: None
        }
    );

    let after_first = fs::read(&path).expect("read corrected");
    assert_eq!(outcome.output_sha256, Some(sha256_hex(&after_first)));

    let second = correct(&path, &registry, None).expect("second run");
    assert_eq!(second.corrected, 0);
    assert!(!second.wrote_document());
    assert_eq!(fs::read(&path).expect("read again"), after_first);

    let cfg = IrRunConfig::default_paths();
    assert!(validate_path(&path, &registry, &cfg).expect("revalidate").all_valid());
}

#[test]
fn explicit_output_path_leaves_the_source_untouched() {
    let path = stage("string_utils.json", false);
    let out = path.with_file_name("string_utils.corrected.json");
    let before = fs::read(&path).expect("read source");
    let registry = builtin_registry().expect("registry");

    let outcome = correct(&path, &registry, Some(&out)).expect("correction runs");
    assert_eq!(outcome.corrected, 1);
    assert_eq!(outcome.mismatches[0].id, "not_a_palindrome");
    assert_eq!(fs::read(&path).expect("source after"), before);
    assert_eq!(
        expectation_of(&out, "not_a_palindrome"),
        Expectation::Equals {
            value: json!(false),
            tolerance: Some(1e-10)
        }
    );
}

#[test]
fn repaired_sources_are_written_back_as_valid_json() {
    let path = stage("float_idioms.json", true);
    let registry = builtin_registry().expect("registry");

    let outcome = correct(&path, &registry, None).expect("correction runs");
    assert!(outcome.repaired);
    assert_eq!(outcome.corrected, 0);
    assert!(outcome.wrote_document());

    let text = fs::read_to_string(&path).expect("read repaired");
    assert!(!text.contains("float('nan')"));
    let (_, repaired_again) = parse_with_repair(&text).expect("now valid JSON");
    assert!(repaired_again.is_none());

    let second = correct(&path, &registry, None).expect("second run");
    assert!(!second.repaired);
    assert!(!second.wrote_document());
}

#[test]
fn unrepairable_syntax_reports_line_and_column() {
    let path = stage_text(
        "broken.json",
        "{\n  \"target\": \"division:divide\",\n  \"cases\": [\n    {\"id\": \"a\", \"call\": {\"args\": [float('nan'), 1]}, \"expectation\": {\"predicate\": {\"name\": \"is-not-a-number\"}}}\n  ]\n",
        false,
    );
    let before = fs::read(&path).expect("read before");
    let registry = builtin_registry().expect("registry");

    let err = correct(&path, &registry, None).expect_err("missing brace is fatal");
    match err {
        CorrectionError::Validation(ValidationError::Ir(IrError::Syntax(diag))) => {
            assert!(diag.repair_attempted);
            assert!(diag.line >= 5);
            assert!(diag.to_string().contains("line"));
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
    assert_eq!(fs::read(&path).expect("read after"), before);
}

#[test]
fn schema_violations_are_fatal_and_structural() {
    let path = stage_text(
        "bad_tolerance.json",
        r#"{"target": "division:divide", "cases": [{"id": "x", "call": {}, "expectation": {"equals": {"value": 1, "tolerance": -1}}}]}"#,
        true,
    );
    let registry = builtin_registry().expect("registry");
    let err = correct(&path, &registry, None).expect_err("schema violation");
    match err {
        CorrectionError::Validation(ValidationError::Ir(ir)) => {
            assert!(matches!(ir, IrError::SchemaViolation { .. }));
            assert!(ir.is_structural());
        }
        other => panic!("expected schema violation, got {other:?}"),
    }
}

#[test]
fn complex_results_abort_correction_without_writing() {
    let path = stage_text(
        "power.json",
        r#"{"target": "arith:power", "cases": [
            {"id": "square", "call": {"args": [3, 2]}, "expectation": {"equals": {"value": 10}}},
            {"id": "root_of_negative", "call": {"args": [-8, 0.5]}, "expectation": {"equals": {"value": 0}}}
        ]}"#,
        false,
    );
    let before = fs::read(&path).expect("read before");
    let registry = builtin_registry().expect("registry");

    let err = correct(&path, &registry, None).expect_err("complex result");
    assert!(
        matches!(err, CorrectionError::Unrepresentable { ref case_id, .. } if case_id == "root_of_negative")
    );
    assert_eq!(fs::read(&path).expect("read after"), before);
}

#[test]
fn string_results_spelling_a_sentinel_need_manual_review() {
    let path = stage_text(
        "longest.json",
        r#"{"target": "string_utils:find_longest_word", "cases": [
            {"id": "plain", "call": {"args": ["a bb"]}, "expectation": {"equals": {"value": "a"}}},
            {"id": "nan_word", "call": {"args": ["NaN a"]}, "expectation": {"equals": {"value": "x"}}}
        ]}"#,
        false,
    );
    let before = fs::read(&path).expect("read before");
    let registry = builtin_registry().expect("registry");

    for _ in 0..2 {
        let err = correct(&path, &registry, None).expect_err("ambiguous string result");
        assert!(
            matches!(err, CorrectionError::Unrepresentable { ref case_id, .. } if case_id == "nan_word")
        );
        assert!(err.to_string().contains("manual review"));
        assert_eq!(fs::read(&path).expect("read after"), before);
    }
}

#[test]
fn unresolved_targets_abort_before_any_write() {
    let path = stage_text(
        "unknown.json",
        r#"{"target": "nowhere:divide", "cases": []}"#,
        false,
    );
    let registry = builtin_registry().expect("registry");
    let err = correct(&path, &registry, None).expect_err("unknown module");
    assert!(matches!(
        err,
        CorrectionError::Validation(ValidationError::TargetResolution(_))
    ));
}

#[test]
fn slow_targets_are_corrected_to_timeout() {
    let path = stage_text(
        "slow.json",
        r#"{"target": "slow:wait", "cases": [{"id": "w", "call": {}, "expectation": {"equals": {"value": 1}}}]}"#,
        false,
    );
    let mut registry = TargetRegistry::new();
    registry
        .register(
            "slow:wait",
            |_args: &[Value], _kwargs: &Kwargs| -> Result<Value, TargetError> {
                std::thread::sleep(Duration::from_millis(500));
                Ok(Value::Int(1))
            },
        )
        .expect("register");
    let cfg = IrRunConfig {
        timeout: Some(Duration::from_millis(20)),
        ..IrRunConfig::default_paths()
    };

    let outcome = correct_with_config(&path, &registry, None, &cfg).expect("correction runs");
    assert_eq!(outcome.corrected, 1);
    assert_eq!(
        expectation_of(&path, "w"),
        Expectation::Raises {
            types: vec![ErrorKind::Timeout]
        }
    );
}

#[test]
fn timed_out_calls_do_not_overlap_later_cases() {
    let path = stage_text(
        "overlap.json",
        r#"{"target": "busy:hold", "cases": [
            {"id": "first", "call": {}, "expectation": {"equals": {"value": null}}},
            {"id": "second", "call": {}, "expectation": {"equals": {"value": null}}},
            {"id": "third", "call": {}, "expectation": {"equals": {"value": null}}}
        ]}"#,
        false,
    );
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (active_in, peak_in) = (Arc::clone(&active), Arc::clone(&peak));
    let mut registry = TargetRegistry::new();
    registry
        .register(
            "busy:hold",
            move |_args: &[Value], _kwargs: &Kwargs| -> Result<Value, TargetError> {
                let now = active_in.fetch_add(1, Ordering::SeqCst) + 1;
                peak_in.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(300));
                active_in.fetch_sub(1, Ordering::SeqCst);
                Ok(Value::Null)
            },
        )
        .expect("register");
    let cfg = IrRunConfig {
        timeout: Some(Duration::from_millis(20)),
        ..IrRunConfig::default_paths()
    };

    let outcome = correct_with_config(&path, &registry, None, &cfg).expect("correction runs");
    assert_eq!(outcome.corrected, 3);
    assert!(outcome.mismatches[1].reason.contains("previous call still running"));
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    for id in ["first", "second", "third"] {
        assert_eq!(
            expectation_of(&path, id),
            Expectation::Raises {
                types: vec![ErrorKind::Timeout]
            }
        );
    }
}

#[test]
fn run_log_records_each_case() {
    let path = stage_text(
        "logged.json",
        r#"{"target": "logcheck:divide", "cases": [
            {"id": "ok", "call": {"args": [10, 2]}, "expectation": {"equals": {"value": 5.0}}},
            {"id": "tiny", "call": {"args": [1, 1e-308]}, "expectation": {"predicate": {"name": "is-infinite"}}},
            {"id": "zero", "call": {"args": [1, 0]}, "expectation": {"equals": {"value": 99}}}
        ]}"#,
        false,
    );
    let log_path = path.with_file_name("run_log.jsonl");
    let mut registry = TargetRegistry::new();
    registry
        .register("logcheck:divide", irc_conformance::targets::divide)
        .expect("register");

    set_ir_log_path(Some(log_path.clone()));
    let outcome = correct(&path, &registry, None);
    set_ir_log_path(None);
    assert_eq!(outcome.expect("correction runs").corrected, 2);

    let entries: Vec<IrLogEntry> = fs::read_to_string(&log_path)
        .expect("log written")
        .lines()
        .map(|line| serde_json::from_str::<IrLogEntry>(line).expect("log line is JSON"))
        .filter(|entry| entry.target == "logcheck:divide")
        .collect();

    let validated: Vec<(&str, Option<bool>, &str)> = entries
        .iter()
        .filter(|e| e.phase == "validate")
        .map(|e| (e.case_id.as_deref().unwrap_or(""), e.valid, e.reason_code.as_str()))
        .collect();
    assert_eq!(
        validated,
        [
            ("ok", Some(true), "valid"),
            ("tiny", Some(false), "predicate_unsatisfied"),
            ("zero", Some(false), "unexpected_error"),
        ]
    );

    let corrections: Vec<(&str, &str)> = entries
        .iter()
        .filter(|e| e.phase == "correct")
        .map(|e| (e.case_id.as_deref().unwrap_or(""), e.reason_code.as_str()))
        .collect();
    assert_eq!(
        corrections,
        [("tiny", "rewritten_as_equals"), ("zero", "rewritten_as_raises")]
    );
}
