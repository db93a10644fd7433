#![forbid(unsafe_code)]

use irc_conformance::{
    IrRunConfig, ValidationResult, builtin_registry, parse_timeout_ms, set_ir_log_path,
    validate_path,
};
use serde::Serialize;
use std::path::PathBuf;

const USAGE: &str =
    "Usage: validate_ir <ir_file> [--schema <path>] [--timeout-ms <n>] [--log-path <path>]";

#[derive(Debug, Serialize)]
struct ValidationSummary<'a> {
    status: &'static str,
    target: &'a str,
    repaired: bool,
    case_count: usize,
    mismatch_count: usize,
    results: &'a [ValidationResult],
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut cfg = IrRunConfig::from_env()?;
    let mut ir_path: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--schema" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--schema requires a value".to_string())?;
                cfg.schema_path = Some(PathBuf::from(value));
            }
            "--timeout-ms" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--timeout-ms requires a value".to_string())?;
                cfg.timeout = Some(parse_timeout_ms(&value)?);
            }
            "--log-path" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--log-path requires a value".to_string())?;
                set_ir_log_path(Some(PathBuf::from(value)));
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                return Ok(());
            }
            flag if flag.starts_with("--") => return Err(format!("unknown argument: {flag}")),
            positional => {
                if ir_path.replace(PathBuf::from(positional)).is_some() {
                    return Err(format!("unexpected extra argument: {positional}\n{USAGE}"));
                }
            }
        }
    }
    let ir_path = ir_path.ok_or_else(|| USAGE.to_string())?;

    let registry = builtin_registry()?;
    let report = validate_path(&ir_path, &registry, &cfg).map_err(|err| err.to_string())?;

    let mismatch_count = report.mismatch_count();
    let summary = ValidationSummary {
        status: if mismatch_count == 0 { "pass" } else { "fail" },
        target: &report.target,
        repaired: report.repaired,
        case_count: report.results.len(),
        mismatch_count,
        results: &report.results,
    };
    let summary_json = serde_json::to_string_pretty(&summary)
        .map_err(|err| format!("failed serializing summary: {err}"))?;
    println!("{summary_json}");

    if mismatch_count > 0 {
        std::process::exit(2);
    }
    Ok(())
}
