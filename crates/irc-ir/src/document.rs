#![forbid(unsafe_code)]

use crate::repair::parse_with_repair;
use crate::schema::{SchemaCheck, check_schema, discover_schema_path};
use crate::structure::validate_structure;
use crate::IrError;
use irc_runtime::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A target reference plus its ordered cases. Unknown top-level keys are
/// carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrDocument {
    pub target: String,
    pub cases: Vec<Case>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

impl IrDocument {
    #[must_use]
    pub fn case(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|case| case.id == id)
    }

    pub fn case_mut(&mut self, id: &str) -> Option<&mut Case> {
        self.cases.iter_mut().find(|case| case.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub call: Call,
    pub expectation: Expectation,
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

/// Raw (still encoded) call arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Call {
    #[serde(default)]
    pub args: Vec<JsonValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kwargs: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Raises {
        types: Vec<ErrorKind>,
    },
    Equals {
        value: JsonValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tolerance: Option<f64>,
    },
    Predicate {
        name: String,
    },
}

impl Expectation {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Raises { .. } => "raises",
            Self::Equals { .. } => "equals",
            Self::Predicate { .. } => "predicate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Explicit schema; takes precedence over discovery.
    pub schema_path: Option<PathBuf>,
    pub discover_schema: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            schema_path: None,
            discover_schema: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub document: IrDocument,
    /// Text exactly as read.
    pub raw: String,
    /// Set when the text only parsed after syntax repair.
    pub repaired_text: Option<String>,
    pub schema: SchemaCheck,
}

impl LoadedDocument {
    #[must_use]
    pub fn repaired(&self) -> bool {
        self.repaired_text.is_some()
    }
}

/// Reads `path` and runs parse, repair, schema and structure checks.
pub fn load_document(path: &Path, options: &LoadOptions) -> Result<LoadedDocument, IrError> {
    let raw = fs::read_to_string(path).map_err(|source| IrError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let schema_path = match &options.schema_path {
        Some(explicit) => Some(explicit.clone()),
        None if options.discover_schema => discover_schema_path(path),
        None => None,
    };
    parse_document(raw, schema_path.as_deref())
}

pub fn parse_document(raw: String, schema_path: Option<&Path>) -> Result<LoadedDocument, IrError> {
    let (value, repaired_text) = parse_with_repair(&raw).map_err(IrError::Syntax)?;
    let schema = check_schema(&value, schema_path)?;
    validate_structure(&value)?;
    let document: IrDocument = serde_json::from_value(value)
        .map_err(|err| IrError::structural("$", err.to_string()))?;
    Ok(LoadedDocument {
        document,
        raw,
        repaired_text,
        schema,
    })
}

/// Pretty-printed JSON with a trailing newline.
pub fn render_document(document: &IrDocument) -> Result<String, IrError> {
    let mut text = serde_json::to_string_pretty(document).map_err(IrError::Serialize)?;
    text.push('\n');
    Ok(text)
}

/// Writes the rendered document and returns the bytes written.
pub fn persist_document(path: &Path, document: &IrDocument) -> Result<Vec<u8>, IrError> {
    let text = render_document(document)?;
    write_text(path, &text)?;
    Ok(text.into_bytes())
}

pub fn write_text(path: &Path, text: &str) -> Result<(), IrError> {
    fs::write(path, text).map_err(|source| IrError::Write {
        path: path.to_path_buf(),
        source,
    })
}
