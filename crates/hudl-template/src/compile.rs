//! Source text → compiled components, in one call.
//!
//! This is the pipeline the dev server runs on every file load: normalize
//! and parse, lift schema blocks, transform, and bundle each component
//! with its document's schema.

use crate::ast::CompiledComponent;
use crate::error::TransformError;
use crate::transform::transform;
use hudl_schema::{parse::compile_schema, Schema, SchemaError};
use hudl_syntax::{Span, SyntaxError};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Any failure on the way from text to components.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
}

impl CompileError {
    pub fn span(&self) -> Span {
        match self {
            CompileError::Syntax(e) => e.span,
            CompileError::Schema(e) => e.span,
            CompileError::Transform(e) => e.span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Syntax(e) => &e.message,
            CompileError::Schema(e) => &e.message,
            CompileError::Transform(e) => &e.message,
        }
    }
}

/// A fully compiled source document.
#[derive(Debug, Clone)]
pub struct CompiledDocument {
    pub name: String,
    pub schema: Schema,
    pub imports: Vec<String>,
    pub components: Vec<Arc<CompiledComponent>>,
    /// Non-fatal findings (unknown data types and the like).
    pub warnings: Vec<(Span, String)>,
}

/// Compile one document.
///
/// `doc_name` is the logical name (file stem); `base_dir` anchors schema
/// imports; `known` holds component names already visible in the registry.
pub fn compile_document(
    source: &str,
    doc_name: &str,
    base_dir: Option<&Path>,
    known: &HashSet<String>,
) -> Result<CompiledDocument, CompileError> {
    let raw = hudl_syntax::parse(source)?;

    let blocks: Vec<(String, Span)> = raw
        .schema_blocks()
        .map(|c| (c.text.clone(), c.span))
        .collect();
    let schema = compile_schema(&blocks, base_dir)?;

    let output = transform(&raw, doc_name, &schema, known)?;

    let components = output
        .document
        .components
        .iter()
        .map(|component| {
            Arc::new(CompiledComponent {
                component: component.clone(),
                schema: schema.clone(),
                imports: output.document.imports.clone(),
            })
        })
        .collect();

    Ok(CompiledDocument {
        name: output.document.name,
        schema,
        imports: output.document.imports,
        components,
        warnings: output.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_schema_and_components_together() {
        let source = r#"/**
message CardData {
    string title = 1;
}
*/

// name: Card
// data: CardData

el {
    h1 `title`
}
"#;
        let doc = compile_document(source, "card", None, &HashSet::new()).unwrap();
        assert_eq!(doc.components.len(), 1);
        assert_eq!(doc.components[0].component.name, "Card");
        assert!(doc.components[0].schema.message("CardData").is_some());
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn syntax_error_propagates() {
        let err = compile_document("el {", "bad", None, &HashSet::new()).unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
    }

    #[test]
    fn schema_error_propagates() {
        let source = "/**\nmessage Broken {\n*/\nel {}\n";
        let err = compile_document(source, "bad", None, &HashSet::new()).unwrap_err();
        assert!(matches!(err, CompileError::Schema(_)));
    }

    #[test]
    fn unknown_data_type_is_a_warning() {
        let source = "// data: Nope\nel {\n    div {}\n}";
        let doc = compile_document(source, "warns", None, &HashSet::new()).unwrap();
        assert_eq!(doc.warnings.len(), 1);
    }
}
