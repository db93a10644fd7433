#![forbid(unsafe_code)]

use crate::IrError;
use serde_json::Value as JsonValue;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SCHEMA_RELATIVE: [&str; 3] = ["..", "schemas", "ir_schema.json"];

/// What happened to the optional schema conformance step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaCheck {
    Validated(PathBuf),
    /// A schema was configured but could not be used. Not fatal.
    Skipped { path: PathBuf, reason: String },
    NotConfigured,
}

impl SchemaCheck {
    #[must_use]
    pub fn was_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// `<ir_dir>/../schemas/ir_schema.json`, when that file exists.
#[must_use]
pub fn discover_schema_path(ir_path: &Path) -> Option<PathBuf> {
    let base = ir_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let candidate = DEFAULT_SCHEMA_RELATIVE
        .iter()
        .fold(base.to_path_buf(), |acc, part| acc.join(part));
    candidate.is_file().then_some(candidate)
}

/// Validates `document` against the schema at `schema_path`. Only an actual
/// violation is an error; an unreadable or invalid schema is skipped.
pub fn check_schema(document: &JsonValue, schema_path: Option<&Path>) -> Result<SchemaCheck, IrError> {
    let Some(path) = schema_path else {
        return Ok(SchemaCheck::NotConfigured);
    };
    let skipped = |reason: String| SchemaCheck::Skipped {
        path: path.to_path_buf(),
        reason,
    };

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => return Ok(skipped(format!("cannot read schema: {err}"))),
    };
    let schema: JsonValue = match serde_json::from_str(&raw) {
        Ok(schema) => schema,
        Err(err) => return Ok(skipped(format!("schema is not valid JSON: {err}"))),
    };
    let validator = match jsonschema::validator_for(&schema) {
        Ok(validator) => validator,
        Err(err) => return Ok(skipped(format!("schema is not a valid JSON Schema: {err}"))),
    };

    if let Some(violation) = validator.iter_errors(document).next() {
        return Err(IrError::SchemaViolation {
            schema: path.to_path_buf(),
            message: violation.to_string(),
        });
    }
    Ok(SchemaCheck::Validated(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::{SchemaCheck, check_schema, discover_schema_path};
    use crate::IrError;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name: &str) -> PathBuf {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let dir = std::env::temp_dir().join(format!("irc_ir_schema_{name}_{ts}"));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    const SCHEMA: &str = r#"{
        "type": "object",
        "required": ["target", "cases"],
        "properties": {
            "target": {"type": "string"},
            "cases": {"type": "array"}
        }
    }"#;

    #[test]
    fn no_schema_is_not_an_error() {
        assert_eq!(
            check_schema(&json!({}), None).expect("no schema"),
            SchemaCheck::NotConfigured
        );
    }

    #[test]
    fn conforming_and_violating_documents() {
        let dir = temp_dir("conform");
        let schema_path = dir.join("ir_schema.json");
        fs::write(&schema_path, SCHEMA).expect("write schema");

        let ok = check_schema(&json!({"target": "m:f", "cases": []}), Some(&schema_path))
            .expect("conforms");
        assert_eq!(ok, SchemaCheck::Validated(schema_path.clone()));

        let err = check_schema(&json!({"target": 7, "cases": []}), Some(&schema_path))
            .expect_err("violates");
        assert!(matches!(err, IrError::SchemaViolation { .. }));
        assert!(err.is_structural());
        assert!(err.to_string().contains("\"string\""));
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn unusable_schema_is_skipped() {
        let dir = temp_dir("broken");
        let schema_path = dir.join("ir_schema.json");
        fs::write(&schema_path, "{not json").expect("write schema");
        let check = check_schema(&json!({}), Some(&schema_path)).expect("skip");
        assert!(check.was_skipped());

        let missing = dir.join("absent.json");
        assert!(check_schema(&json!({}), Some(&missing)).expect("skip").was_skipped());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn discovers_sibling_schemas_directory() {
        let root = temp_dir("discover");
        let ir_dir = root.join("ir");
        let schema_dir = root.join("schemas");
        fs::create_dir_all(&ir_dir).expect("ir dir");
        let ir_file = ir_dir.join("doc.json");
        assert!(discover_schema_path(&ir_file).is_none());

        fs::create_dir_all(&schema_dir).expect("schema dir");
        fs::write(schema_dir.join("ir_schema.json"), SCHEMA).expect("write schema");
        let found = discover_schema_path(&ir_file).expect("discovered");
        assert!(found.ends_with("ir_schema.json"));
        assert!(found.is_file());
        let _ = fs::remove_dir_all(root);
    }
}
