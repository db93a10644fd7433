#![forbid(unsafe_code)]

//! Best-effort textual repair of IR sources that use float-construction
//! expressions where JSON sentinel strings belong.

use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairIdiom {
    pub pattern: &'static str,
    pub replacement: &'static str,
    pub description: &'static str,
}

/// Applied in order. Each pattern only matches in a value position (after
/// `[`, `:` or `,`) and swallows surrounding double quotes so an
/// already-quoted idiom does not end up double-quoted.
pub const REPAIR_IDIOMS: [RepairIdiom; 3] = [
    RepairIdiom {
        pattern: r#"(?P<lead>[\[:,]\s*)"?float\(\s*['"][+-]?(?i:nan)['"]\s*\)"?"#,
        replacement: r#""NaN""#,
        description: r#"float('nan') -> "NaN""#,
    },
    RepairIdiom {
        pattern: r#"(?P<lead>[\[:,]\s*)"?float\(\s*['"]-(?i:inf|infinity)['"]\s*\)"?"#,
        replacement: r#""-Infinity""#,
        description: r#"float('-inf') -> "-Infinity""#,
    },
    RepairIdiom {
        pattern: r#"(?P<lead>[\[:,]\s*)"?float\(\s*['"]\+?(?i:inf|infinity)['"]\s*\)"?"#,
        replacement: r#""Infinity""#,
        description: r#"float('inf') -> "Infinity""#,
    },
];

static COMPILED_IDIOMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    REPAIR_IDIOMS
        .iter()
        .map(|idiom| Regex::new(idiom.pattern).expect("valid repair idiom regex"))
        .collect()
});

const COMMON_ISSUES: [&str; 3] = [
    "float('nan') / float('inf') written as code instead of JSON strings",
    r#"use "NaN", "Infinity", "-Infinity" as string values instead"#,
    "missing commas, quotes, or brackets",
];

/// Returns the rewritten text and whether anything changed.
#[must_use]
pub fn repair(raw: &str) -> (String, bool) {
    let mut text = raw.to_string();
    for (idiom, regex) in REPAIR_IDIOMS.iter().zip(COMPILED_IDIOMS.iter()) {
        if regex.is_match(&text) {
            text = regex
                .replace_all(&text, |caps: &Captures<'_>| {
                    format!("{}{}", &caps["lead"], idiom.replacement)
                })
                .into_owned();
        }
    }
    let changed = text != raw;
    (text, changed)
}

/// Parses `raw`, attempting one repair pass on failure. On success returns
/// the repaired text when a repair was needed.
pub fn parse_with_repair(raw: &str) -> Result<(JsonValue, Option<String>), SyntaxDiagnostic> {
    let first_error = match serde_json::from_str::<JsonValue>(raw) {
        Ok(value) => return Ok((value, None)),
        Err(err) => err,
    };

    let (fixed, changed) = repair(raw);
    if !changed {
        return Err(SyntaxDiagnostic::from_json_error(raw, &first_error, false));
    }
    match serde_json::from_str::<JsonValue>(&fixed) {
        Ok(value) => Ok((value, Some(fixed))),
        Err(err) => Err(SyntaxDiagnostic::from_json_error(&fixed, &err, true)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxDiagnostic {
    pub line: usize,
    pub column: usize,
    pub source_line: String,
    pub message: String,
    pub repair_attempted: bool,
}

impl SyntaxDiagnostic {
    fn from_json_error(text: &str, err: &serde_json::Error, repair_attempted: bool) -> Self {
        let rendered = err.to_string();
        let message = rendered
            .rsplit_once(" at line ")
            .map_or(rendered.as_str(), |(head, _)| head)
            .to_string();
        let line = err.line();
        let source_line = text
            .lines()
            .nth(line.saturating_sub(1))
            .unwrap_or_default()
            .to_string();
        Self {
            line,
            column: err.column(),
            source_line,
            message,
            repair_attempted,
        }
    }

    /// Caret line aligned under the offending character of the trimmed
    /// source line.
    #[must_use]
    pub fn caret(&self) -> String {
        let trimmed = self.source_line.trim_start();
        let leading = self.source_line.len() - trimmed.len();
        let byte_offset = self.column.saturating_sub(1).saturating_sub(leading);
        let width = trimmed
            .char_indices()
            .take_while(|(idx, _)| *idx < byte_offset)
            .count();
        format!("{}^", " ".repeat(width))
    }
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repair_attempted {
            writeln!(
                f,
                "JSON syntax errors remain after auto-repair at line {}, column {}:",
                self.line, self.column
            )?;
        } else {
            writeln!(
                f,
                "Invalid JSON syntax in IR file at line {}, column {}:",
                self.line, self.column
            )?;
        }
        writeln!(f, "  {}", self.source_line.trim())?;
        writeln!(f, "  {}", self.caret())?;
        writeln!(f, "Error: {}", self.message)?;
        writeln!(f, "Auto-repairable idioms:")?;
        for idiom in &REPAIR_IDIOMS {
            writeln!(f, "  - {}", idiom.description)?;
        }
        if !self.repair_attempted {
            writeln!(f, "Common issues:")?;
            for issue in COMMON_ISSUES {
                writeln!(f, "  - {issue}")?;
            }
        }
        Ok(())
    }
}
