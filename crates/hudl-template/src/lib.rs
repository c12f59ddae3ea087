//! Template semantics for Hudl.
//!
//! Takes the raw node tree from `hudl-syntax` and gives it meaning: the
//! [`transform`] pass resolves selector shorthands, component metadata,
//! control flow, reactive-attribute sugar and imports into a typed AST;
//! the [`render`] pass walks that AST against decoded input data and emits
//! HTML; [`format`] canonicalizes source text.

pub mod ast;
pub mod compile;
pub mod error;
pub mod format;
pub mod reactive;
pub mod render;
pub mod style;
pub mod transform;

pub use ast::{
    AttrValue, CasePattern, CompiledComponent, Component, Document, EachNode, Element, IfNode,
    Node, ReactiveAttr, StyleBlock, SwitchCase, SwitchNode, TemplateExpr, TextNode, TextSegment,
};
pub use compile::{compile_document, CompileError, CompiledDocument};
pub use error::{RenderError, RuntimeEvalError, TransformError};
pub use format::{format_source, FormatOptions};
pub use render::{render, ComponentSource, RenderOptions, RenderOutput};
pub use transform::{transform, TransformOutput};
