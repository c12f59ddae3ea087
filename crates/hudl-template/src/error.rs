//! Error types for the transform and render stages.

use hudl_syntax::Span;
use thiserror::Error;

/// Structural misuse of control flow, selectors, or reactive sugar.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct TransformError {
    pub span: Span,
    pub message: String,
}

impl TransformError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

/// A structural problem that prevents the render from continuing: unknown
/// component, recursion blowup, deadline exceeded.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{component}: {message}")]
pub struct RenderError {
    pub component: String,
    pub span: Option<Span>,
    pub message: String,
}

impl RenderError {
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            span: None,
            message: message.into(),
        }
    }

    pub fn at(component: impl Into<String>, span: Span, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            span: Some(span),
            message: message.into(),
        }
    }
}

/// A non-fatal expression failure captured during rendering. The render
/// continues with an `ERROR` marker in the output; these accumulate in the
/// render's error sink.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message}")]
pub struct RuntimeEvalError {
    pub span: Span,
    pub message: String,
}

impl RuntimeEvalError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}
