//! Error types for schema parsing, wire decoding, and the text format.

use hudl_syntax::Span;
use thiserror::Error;

/// An embedded IDL parse or resolution failure. The span points into the
/// source document the schema block was lifted from.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct SchemaError {
    pub span: Span,
    pub message: String,
}

impl SchemaError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// Wire-format input could not be decoded against the declared schema.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("decode error at byte {offset}: {message}")]
pub struct DecodeError {
    pub offset: usize,
    pub message: String,
}

impl DecodeError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// A problem in a text-format preview file.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TextFormatError {
    #[error("line {line}: {message}")]
    At { line: usize, message: String },
    #[error("{0}")]
    Other(String),
}

impl TextFormatError {
    pub fn at(line: usize, message: impl Into<String>) -> Self {
        Self::At {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display() {
        let err = DecodeError::new(12, "truncated varint");
        assert_eq!(err.to_string(), "decode error at byte 12: truncated varint");
    }

    #[test]
    fn text_format_error_display() {
        let err = TextFormatError::at(3, "unexpected '}'");
        assert_eq!(err.to_string(), "line 3: unexpected '}'");
    }
}
