//! The expression language evaluated inside backticks.
//!
//! A small declarative language over the typed value space: identifier
//! resolution against a scope stack, field/index access, arithmetic and
//! comparison operators, short-circuit logic, a ternary, and a whitelisted
//! set of built-in functions. Evaluation is fail-soft from the caller's
//! point of view: errors come back as a distinct [`ExprError`] so the
//! interpreter can substitute its `ERROR` marker and keep rendering.

pub mod ast;
pub mod error;
pub mod escape;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod scope;

pub use ast::{BinOp, Expr, Literal, UnaryOp};
pub use error::ExprError;
pub use escape::{escape_html, Escaped};
pub use eval::{evaluate, Evaluated};
pub use parser::parse_expression;
pub use scope::Scope;

use hudl_schema::Value;

/// Parse and evaluate in one step.
pub fn eval_str(source: &str, scope: &Scope) -> Result<Evaluated, ExprError> {
    let expr = parse_expression(source)?;
    evaluate(&expr, scope)
}

/// Convenience for tests and callers that only need the value.
pub fn eval_value(source: &str, scope: &Scope) -> Result<Value, ExprError> {
    eval_str(source, scope).map(|e| e.value)
}
