//! Expression errors.

use thiserror::Error;

/// Parse or evaluation failure for one expression.
///
/// Offsets are relative to the expression source; the interpreter maps them
/// back onto the template span when it reports a `RuntimeEvalError`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExprError {
    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },
    #[error("{message}")]
    Eval { message: String },
}

impl ExprError {
    pub fn parse(offset: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            message: message.into(),
        }
    }

    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }
}
