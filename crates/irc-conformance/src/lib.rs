#![forbid(unsafe_code)]

pub mod corrector;
pub mod log;
pub mod targets;
pub mod validator;

pub use corrector::{
    CorrectionError, CorrectionOutcome, Mismatch, correct, correct_with_config, sha256_hex,
    synthesize_expectation,
};
pub use log::{IR_LOG_PATH_ENV, IrLogEntry, set_ir_log_path};
pub use targets::builtin_registry;
pub use validator::{
    Observed, ValidationError, ValidationReport, ValidationResult, load_for_run,
    validate_document, validate_loaded, validate_path, values_match,
};

use irc_ir::LoadOptions;
use irc_runtime::InvocationPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Tolerance used for `equals` expectations that carry none, and written
/// into corrected expectations.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

pub const SCHEMA_PATH_ENV: &str = "IRC_SCHEMA_PATH";
pub const TARGET_TIMEOUT_ENV: &str = "IRC_TARGET_TIMEOUT_MS";
pub const DEFAULT_TOLERANCE_ENV: &str = "IRC_DEFAULT_TOLERANCE";

#[derive(Debug, Clone, PartialEq)]
pub struct IrRunConfig {
    pub default_tolerance: f64,
    /// Explicit schema; otherwise `<ir_dir>/../schemas/ir_schema.json` is
    /// used when `discover_schema` is set and the file exists.
    pub schema_path: Option<PathBuf>,
    pub discover_schema: bool,
    pub timeout: Option<Duration>,
    pub fixture_root: PathBuf,
}

impl IrRunConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            default_tolerance: DEFAULT_TOLERANCE,
            schema_path: None,
            discover_schema: true,
            timeout: None,
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
        }
    }

    /// Defaults overlaid with `IRC_*` environment variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default_paths();
        if let Some(raw) = non_empty(lookup(SCHEMA_PATH_ENV)) {
            config.schema_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = non_empty(lookup(TARGET_TIMEOUT_ENV)) {
            config.timeout = Some(parse_timeout_ms(&raw)?);
        }
        if let Some(raw) = non_empty(lookup(DEFAULT_TOLERANCE_ENV)) {
            config.default_tolerance = parse_tolerance(&raw)?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            schema_path: self.schema_path.clone(),
            discover_schema: self.discover_schema,
        }
    }

    #[must_use]
    pub fn policy(&self) -> InvocationPolicy {
        self.timeout
            .map_or_else(InvocationPolicy::unbounded, InvocationPolicy::with_timeout)
    }
}

impl Default for IrRunConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn parse_timeout_ms(raw: &str) -> Result<Duration, String> {
    let millis = raw
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("invalid timeout `{raw}` (expected milliseconds): {err}"))?;
    if millis == 0 {
        return Err(format!("invalid timeout `{raw}`: must be greater than zero"));
    }
    Ok(Duration::from_millis(millis))
}

pub fn parse_tolerance(raw: &str) -> Result<f64, String> {
    match raw.trim().parse::<f64>() {
        Ok(tol) if tol.is_finite() && tol >= 0.0 => Ok(tol),
        Ok(_) => Err(format!("invalid tolerance `{raw}`: must be a finite number >= 0")),
        Err(err) => Err(format!("invalid tolerance `{raw}`: {err}")),
    }
}
