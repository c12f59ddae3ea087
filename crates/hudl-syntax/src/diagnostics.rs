//! Structured error reports with source positions.
//!
//! Every stage of the pipeline reports failures through [`Diagnostic`] so
//! the dev server and CLI render them uniformly: path, 1-based line/column,
//! severity, short human message.

use crate::span::{LineCol, Span};
use serde::Serialize;

/// Severity of a reported problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single report against one source file.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// Source path, as given by the caller.
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    /// Build a diagnostic by resolving `span` against `source`.
    pub fn at(
        file: impl Into<String>,
        source: &str,
        span: Span,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        let pos = LineCol::of(source, span.start);
        Self {
            file: file.into(),
            line: pos.line,
            column: pos.column,
            severity,
            message: message.into(),
        }
    }

    pub fn error(
        file: impl Into<String>,
        source: &str,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self::at(file, source, span, Severity::Error, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.line, self.column, self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_position_from_span() {
        let src = "el {\n    bogus\n}";
        let span = Span::new(src.find("bogus").unwrap(), src.find("bogus").unwrap() + 5);
        let diag = Diagnostic::error("card.hudl", src, span, "unknown node");
        assert_eq!(diag.line, 2);
        assert_eq!(diag.column, 5);
        assert_eq!(diag.to_string(), "card.hudl:2:5: unknown node");
    }
}
