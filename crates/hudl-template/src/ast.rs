//! The typed template AST.
//!
//! One tagged sum per node kind with an exhaustive match in the
//! interpreter; component references are by name into the registry, never
//! by pointer, so hot reload can swap entries without ownership cycles.

use crate::error::RuntimeEvalError;
use hudl_expr::{Evaluated, ExprError, Scope};
use hudl_schema::Schema;
use hudl_syntax::Span;
use indexmap::IndexMap;

/// A fully transformed source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Logical name: the file stem.
    pub name: String,
    pub components: Vec<Component>,
    /// Import paths as written in the `import { ... }` block.
    pub imports: Vec<String>,
}

/// A named, invocable template.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    /// Declared input message type, from `// data:`.
    pub data_type: Option<String>,
    pub roots: Vec<Node>,
    pub span: Span,
}

impl Component {
    /// Tag of the first root element, if any. The dev server injects the
    /// live-reload script only when this is `html`.
    pub fn root_tag(&self) -> Option<&str> {
        self.roots.iter().find_map(|n| match n {
            Node::Element(el) => Some(el.tag.as_str()),
            _ => None,
        })
    }
}

/// A component bundled with the schema model of its defining document;
/// this is what the registry stores and the interpreter resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledComponent {
    pub component: Component,
    pub schema: Schema,
    /// Names visible to component calls from this document (its own
    /// components plus everything exported by its import closure).
    pub imports: Vec<String>,
}

/// An expression embedded in the template, parsed once at transform time.
/// Parse failures are kept and surface as runtime evaluation errors, so a
/// bad expression degrades that one emission point instead of the whole
/// document.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateExpr {
    pub source: String,
    pub span: Span,
    parsed: Result<hudl_expr::Expr, ExprError>,
}

impl TemplateExpr {
    pub fn new(source: impl Into<String>, span: Span) -> Self {
        let source = source.into();
        let parsed = hudl_expr::parse_expression(&source);
        Self {
            source,
            span,
            parsed,
        }
    }

    pub fn eval(&self, scope: &Scope) -> Result<Evaluated, RuntimeEvalError> {
        let expr = self
            .parsed
            .as_ref()
            .map_err(|e| RuntimeEvalError::new(self.span, format!("in '{}': {e}", self.source)))?;
        hudl_expr::evaluate(expr, scope)
            .map_err(|e| RuntimeEvalError::new(self.span, format!("in '{}': {e}", self.source)))
    }

    /// True when the expression is a single `raw(...)` call.
    pub fn is_raw_call(&self) -> bool {
        matches!(&self.parsed, Ok(expr) if expr.is_raw_call())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(TextNode),
    Expression(TemplateExpr),
    If(IfNode),
    Switch(SwitchNode),
    Each(EachNode),
    ComponentCall(ComponentCall),
    /// The single child-insertion marker of a layout component.
    Slot,
    StyleBlock(StyleBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: IndexMap<String, AttrValue>,
    pub reactive: Vec<ReactiveAttr>,
    pub children: Vec<Node>,
    pub span: Span,
}

/// Literal segments interleaved with expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub segments: Vec<TextSegment>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextSegment {
    Literal(String),
    Expr(TemplateExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Static(String),
    /// A whole-value expression (`disabled=`locked``).
    Expression(TemplateExpr),
    /// A quoted value with embedded backtick expressions
    /// (`href="`base`/page"`).
    Interpolated(Vec<TextSegment>),
}

/// A reactive attribute before lowering: surface name (`on:click`,
/// `.active`, `let:count`, `bind`...), optional value, modifier chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactiveAttr {
    pub name: String,
    pub value: Option<String>,
    pub modifiers: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: TemplateExpr,
    pub then_children: Vec<Node>,
    pub else_children: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchNode {
    pub subject: TemplateExpr,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Vec<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub pattern: CasePattern,
    pub children: Vec<Node>,
}

/// Case patterns are resolved at interpret time.
#[derive(Debug, Clone, PartialEq)]
pub enum CasePattern {
    /// Bare word: an enum symbol.
    Symbol(String),
    /// Quoted string: matches by equality.
    Literal(String),
    /// Backtick expression: evaluated with the subject bound as `it`.
    Expr(TemplateExpr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EachNode {
    pub binding: String,
    pub iterable: TemplateExpr,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentCall {
    pub name: String,
    /// Single positional input expression, when given.
    pub arg: Option<TemplateExpr>,
    /// Named properties; when present the input becomes a map of the
    /// evaluated values.
    pub props: Vec<(String, AttrValue)>,
    /// Slot content inserted at the target's `#content` marker.
    pub children: Vec<Node>,
    pub span: Span,
}

/// A scoped style block: flat declarations apply to the enclosing element
/// through the generated class; nested rules are prefixed with it.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleBlock {
    pub declarations: Vec<(String, String)>,
    pub rules: Vec<StyleRule>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_expr_parses_once() {
        let expr = TemplateExpr::new("1 + 2", Span::default());
        let scope = Scope::new();
        assert_eq!(
            expr.eval(&scope).unwrap().value,
            hudl_schema::Value::Int(3)
        );
    }

    #[test]
    fn broken_expression_fails_at_eval_time() {
        let expr = TemplateExpr::new("1 +", Span::new(4, 8));
        let scope = Scope::new();
        let err = expr.eval(&scope).unwrap_err();
        assert_eq!(err.span, Span::new(4, 8));
        assert!(err.message.contains("1 +"));
    }

    #[test]
    fn raw_detection() {
        assert!(TemplateExpr::new("raw(x)", Span::default()).is_raw_call());
        assert!(!TemplateExpr::new("size(x)", Span::default()).is_raw_call());
    }
}
