#![forbid(unsafe_code)]

use irc_conformance::{
    IrRunConfig, builtin_registry, correct_with_config, parse_timeout_ms, set_ir_log_path,
};
use std::path::PathBuf;

const USAGE: &str = "Usage: correct_ir <ir_file> [--out <path>] [--schema <path>] [--timeout-ms <n>] [--log-path <path>]";

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut cfg = IrRunConfig::from_env()?;
    let mut ir_path: Option<PathBuf> = None;
    let mut out_path: Option<PathBuf> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out_path = Some(PathBuf::from(flag_value(&mut args, "--out")?)),
            "--schema" => cfg.schema_path = Some(PathBuf::from(flag_value(&mut args, "--schema")?)),
            "--timeout-ms" => {
                cfg.timeout = Some(parse_timeout_ms(&flag_value(&mut args, "--timeout-ms")?)?);
            }
            "--log-path" => {
                set_ir_log_path(Some(PathBuf::from(flag_value(&mut args, "--log-path")?)));
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
    let outcome = correct_with_config(&ir_path, &registry, out_path.as_deref(), &cfg)
        .map_err(|err| err.to_string())?;

    if outcome.repaired {
        println!("repaired IR syntax in {}", ir_path.display());
    }
    if outcome.total == 0 {
        println!("all test cases valid ({} cases)", outcome.case_count);
    } else {
        println!(
            "corrected {} of {} failing cases",
            outcome.corrected, outcome.total
        );
        for mismatch in &outcome.mismatches {
            println!("  - {}: {}", mismatch.id, mismatch.reason);
        }
    }
    if let Some(path) = &outcome.output_path {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn flag_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} requires a value"))
}
