#![forbid(unsafe_code)]

pub mod document;
pub mod repair;
pub mod schema;
pub mod structure;

pub use document::{
    Call, Case, Expectation, IrDocument, LoadOptions, LoadedDocument, load_document,
    parse_document, persist_document, render_document, write_text,
};
pub use repair::{REPAIR_IDIOMS, SyntaxDiagnostic, parse_with_repair, repair};
pub use schema::{SchemaCheck, check_schema, discover_schema_path};
pub use structure::validate_structure;

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum IrError {
    #[error("failed reading IR file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed writing IR file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0}")]
    Syntax(SyntaxDiagnostic),
    #[error("invalid IR structure at `{field}`: {message}")]
    Structural { field: String, message: String },
    #[error("schema validation failed against {}: {message}", .schema.display())]
    SchemaViolation { schema: PathBuf, message: String },
    #[error("failed serializing IR document: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl IrError {
    pub(crate) fn structural(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Structural {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Schema violations count as structural defects.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. } | Self::SchemaViolation { .. })
    }
}
