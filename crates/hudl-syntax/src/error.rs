//! Syntax error type.

use crate::span::Span;
use thiserror::Error;

/// A node-grammar violation, pointing at the offending source range.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct SyntaxError {
    pub span: Span,
    pub message: String,
}

impl SyntaxError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_message() {
        let err = SyntaxError::new(Span::new(4, 9), "unterminated string");
        assert_eq!(err.to_string(), "unterminated string");
    }
}
