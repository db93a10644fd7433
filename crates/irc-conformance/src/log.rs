#![forbid(unsafe_code)]

//! JSON-lines run log. Disabled unless a path is set or `IRC_LOG_PATH` is
//! present in the environment.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

pub const IR_LOG_PATH_ENV: &str = "IRC_LOG_PATH";

static IR_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrLogEntry {
    /// `validate`, `correct` or `notice`.
    pub phase: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
    pub reason_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<JsonValue>,
}

impl IrLogEntry {
    #[must_use]
    pub fn notice(target: &str, reason_code: &str, reason: impl Into<String>) -> Self {
        Self {
            phase: "notice".to_string(),
            target: target.to_string(),
            case_id: None,
            valid: None,
            reason_code: reason_code.to_string(),
            reason: Some(reason.into()),
            actual: None,
        }
    }
}

pub fn set_ir_log_path(path: Option<PathBuf>) {
    let cell = IR_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

pub(crate) fn maybe_append_ir_log(entry: &IrLogEntry) -> Result<(), String> {
    let configured = IR_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let from_env = std::env::var_os(IR_LOG_PATH_ENV).map(PathBuf::from);
    let Some(path) = configured.or(from_env) else {
        return Ok(());
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry)
        .map_err(|err| format!("failed serializing IR log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| format!("failed appending IR log {}: {err}", path.display()))
}
