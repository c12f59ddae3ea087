//! Syntax layer for Hudl templates.
//!
//! Source text goes through two stages before any semantic analysis:
//! a sugar [`normalize`] pass that rewrites shorthand forms into the strict
//! node grammar, and the [`parser`] which lifts normalized text into a raw
//! node tree with lossless source spans. Semantic interpretation of node
//! names (selectors, control flow, components) happens downstream.

pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod normalize;
pub mod parser;
pub mod raw;
pub mod span;

pub use diagnostics::{Diagnostic, Severity};
pub use error::SyntaxError;
pub use normalize::normalize;
pub use parser::parse_document;
pub use raw::{Comment, CommentKind, RawDocument, RawEntry, RawNode, RawValue};
pub use span::{LineCol, Span};

/// Normalize and parse source text in one step.
///
/// This is the entry point used by the transformer and the dev server.
///
/// # Examples
///
/// ```
/// let doc = hudl_syntax::parse("el { div.card \"hi\" }").unwrap();
/// assert_eq!(doc.nodes.len(), 1);
/// assert_eq!(doc.nodes[0].name, "el");
/// ```
pub fn parse(source: &str) -> Result<RawDocument, SyntaxError> {
    let normalized = normalize(source);
    parse_document(&normalized)
}
