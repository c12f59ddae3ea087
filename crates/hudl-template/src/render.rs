//! The template interpreter.
//!
//! Walks the typed AST against decoded input data and emits HTML.
//! Expression failures are fail-soft: the emission point degrades to an
//! `ERROR` marker and the failure lands in the render's error sink.
//! Structural failures (unknown component, runaway recursion, deadline)
//! abort the render with a [`RenderError`].

use crate::ast::{
    AttrValue, CasePattern, CompiledComponent, ComponentCall, Element, Node, TemplateExpr,
    TextSegment,
};
use crate::error::{RenderError, RuntimeEvalError};
use crate::reactive;
use crate::style;
use hudl_expr::{escape_html, Scope};
use hudl_schema::Value;
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where the interpreter resolves component names. The dev server backs
/// this with its registry; tests use a plain map.
pub trait ComponentSource {
    fn component(&self, name: &str) -> Option<Arc<CompiledComponent>>;
}

impl ComponentSource for IndexMap<String, Arc<CompiledComponent>> {
    fn component(&self, name: &str) -> Option<Arc<CompiledComponent>> {
        self.get(name).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Wall-clock budget for one render; runaway evaluation aborts with a
    /// `RenderError` when it runs out.
    pub deadline: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(5),
        }
    }
}

/// A completed render: the HTML, the error sink, and the root element's
/// tag (the dev server injects live reload only when it is `html`).
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub html: String,
    pub errors: Vec<RuntimeEvalError>,
    pub root_tag: Option<String>,
}

/// Render one component with a decoded input value (or [`Value::Null`]).
pub fn render(
    name: &str,
    input: &Value,
    source: &dyn ComponentSource,
    options: &RenderOptions,
) -> Result<RenderOutput, RenderError> {
    let compiled = source
        .component(name)
        .ok_or_else(|| RenderError::new(name, format!("unknown component '{name}'")))?;

    let mut renderer = Renderer {
        source,
        deadline: Instant::now() + options.deadline,
        errors: Vec::new(),
        depth: 0,
    };

    let scope = component_scope(&compiled, input);
    let mut html = String::new();
    renderer.nodes(&compiled, &compiled.component.roots, &scope, None, &mut html)?;

    Ok(RenderOutput {
        html,
        errors: renderer.errors,
        root_tag: compiled.component.root_tag().map(str::to_string),
    })
}

/// Root frame: the input message's fields plus the schema's enum symbols
/// as constants.
fn component_scope(compiled: &CompiledComponent, input: &Value) -> Scope {
    let mut scope = Scope::with_input(input);
    for (_, en) in &compiled.schema.enums {
        for (symbol, number) in &en.values {
            scope.bind(
                symbol,
                Value::Enum(hudl_schema::EnumValue {
                    symbol: symbol.clone(),
                    number: *number,
                }),
            );
        }
    }
    scope
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "loop",
    "multiple",
    "muted",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "selected",
];

const MAX_COMPONENT_DEPTH: usize = 64;

struct Renderer<'a> {
    source: &'a dyn ComponentSource,
    deadline: Instant,
    errors: Vec<RuntimeEvalError>,
    depth: usize,
}

impl<'a> Renderer<'a> {
    fn nodes(
        &mut self,
        owner: &CompiledComponent,
        nodes: &[Node],
        scope: &Scope,
        slot: Option<&str>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        for node in nodes {
            self.node(owner, node, scope, slot, out)?;
        }
        Ok(())
    }

    fn node(
        &mut self,
        owner: &CompiledComponent,
        node: &Node,
        scope: &Scope,
        slot: Option<&str>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        self.check_deadline(owner)?;
        match node {
            Node::Element(el) => self.element(owner, el, scope, slot, out),
            Node::Text(text) => {
                for segment in &text.segments {
                    self.segment(segment, scope, out);
                }
                Ok(())
            }
            Node::Expression(expr) => {
                self.segment(&TextSegment::Expr(expr.clone()), scope, out);
                Ok(())
            }
            Node::If(node) => {
                match self.eval(&node.condition, scope) {
                    Some(value) if value.value.is_truthy() => {
                        self.nodes(owner, &node.then_children, scope, slot, out)?;
                    }
                    Some(_) => {
                        if let Some(else_children) = &node.else_children {
                            self.nodes(owner, else_children, scope, slot, out)?;
                        }
                    }
                    None => self.error_marker(out),
                }
                Ok(())
            }
            Node::Switch(node) => self.switch(owner, node, scope, slot, out),
            Node::Each(node) => self.each(owner, node, scope, slot, out),
            Node::ComponentCall(call) => self.component_call(owner, call, scope, slot, out),
            Node::Slot => {
                if let Some(content) = slot {
                    out.push_str(content);
                }
                Ok(())
            }
            Node::StyleBlock(block) => {
                // The enclosing element already picked up the scope class.
                let class = style::scope_class(&owner.component.name, block);
                out.push_str("<style>");
                out.push_str(&style::serialize(block, &class));
                out.push_str("</style>");
                Ok(())
            }
        }
    }

    fn element(
        &mut self,
        owner: &CompiledComponent,
        el: &Element,
        scope: &Scope,
        slot: Option<&str>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        out.push('<');
        out.push_str(&el.tag);

        // Stable order: id, class, declared attributes, reactive.
        if let Some(id) = &el.id {
            out.push_str(" id=\"");
            out.push_str(&escape_html(id));
            out.push('"');
        }

        let mut classes = el.classes.clone();
        for child in &el.children {
            if let Node::StyleBlock(block) = child {
                classes.push(style::scope_class(&owner.component.name, block));
            }
        }
        if !classes.is_empty() {
            out.push_str(" class=\"");
            out.push_str(&escape_html(&classes.join(" ")));
            out.push('"');
        }

        for (name, value) in &el.attributes {
            self.attribute(name, value, scope, out);
        }

        for attr in &el.reactive {
            let (name, value) = reactive::lower(attr);
            out.push(' ');
            out.push_str(&name);
            if let Some(value) = value {
                out.push_str("=\"");
                out.push_str(&value.replace('"', "&quot;"));
                out.push('"');
            }
        }

        out.push('>');

        if VOID_ELEMENTS.contains(&el.tag.as_str()) {
            return Ok(());
        }

        self.nodes(owner, &el.children, scope, slot, out)?;

        out.push_str("</");
        out.push_str(&el.tag);
        out.push('>');
        Ok(())
    }

    fn attribute(&mut self, name: &str, value: &AttrValue, scope: &Scope, out: &mut String) {
        match value {
            AttrValue::Static(text) => {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html(text));
                out.push('"');
            }
            AttrValue::Expression(expr) => {
                let evaluated = match self.eval(expr, scope) {
                    Some(e) => e,
                    None => {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"ERROR\"");
                        return;
                    }
                };
                let boolean_form = matches!(evaluated.value, Value::Bool(_))
                    || BOOLEAN_ATTRIBUTES.contains(&name);
                if boolean_form {
                    if evaluated.value.is_truthy() {
                        out.push(' ');
                        out.push_str(name);
                    }
                    return;
                }
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html(&evaluated.value.to_display()));
                out.push('"');
            }
            AttrValue::Interpolated(segments) => {
                let mut value = String::new();
                for segment in segments {
                    match segment {
                        TextSegment::Literal(text) => value.push_str(text),
                        TextSegment::Expr(expr) => match self.eval(expr, scope) {
                            Some(e) => value.push_str(&e.value.to_display()),
                            None => value.push_str("ERROR"),
                        },
                    }
                }
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_html(&value));
                out.push('"');
            }
        }
    }

    fn segment(&mut self, segment: &TextSegment, scope: &Scope, out: &mut String) {
        match segment {
            TextSegment::Literal(text) => out.push_str(&escape_html(text)),
            TextSegment::Expr(expr) => match self.eval(expr, scope) {
                Some(evaluated) => {
                    let text = evaluated.value.to_display();
                    if evaluated.pre_escaped {
                        out.push_str(&text);
                    } else {
                        out.push_str(&escape_html(&text));
                    }
                }
                None => self.error_marker_with_title(out),
            },
        }
    }

    fn switch(
        &mut self,
        owner: &CompiledComponent,
        node: &crate::ast::SwitchNode,
        scope: &Scope,
        slot: Option<&str>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let subject = match self.eval(&node.subject, scope) {
            Some(e) => e.value,
            None => {
                self.error_marker(out);
                return Ok(());
            }
        };

        for case in &node.cases {
            let matched = match &case.pattern {
                CasePattern::Symbol(symbol) => match &subject {
                    Value::Enum(e) => e.symbol == *symbol,
                    Value::String(s) => s == symbol,
                    _ => false,
                },
                CasePattern::Literal(literal) => subject.to_display() == *literal,
                CasePattern::Expr(expr) => {
                    let mut child = scope.clone();
                    child.push_frame();
                    child.bind("it", subject.clone());
                    match expr.eval(&child) {
                        Ok(e) => e.value.is_truthy(),
                        Err(err) => {
                            self.errors.push(err);
                            false
                        }
                    }
                }
            };
            if matched {
                return self.nodes(owner, &case.children, scope, slot, out);
            }
        }

        if let Some(default) = &node.default {
            return self.nodes(owner, default, scope, slot, out);
        }
        Ok(())
    }

    fn each(
        &mut self,
        owner: &CompiledComponent,
        node: &crate::ast::EachNode,
        scope: &Scope,
        slot: Option<&str>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let iterable = match self.eval(&node.iterable, scope) {
            Some(e) => e.value,
            None => {
                self.error_marker(out);
                return Ok(());
            }
        };

        let items: Vec<Value> = match iterable {
            Value::List(items) => items,
            Value::Map(map) => map
                .into_iter()
                .map(|(key, value)| {
                    let mut entry = IndexMap::new();
                    entry.insert("key".to_string(), Value::String(key));
                    entry.insert("value".to_string(), value);
                    Value::Map(entry)
                })
                .collect(),
            Value::Null => Vec::new(),
            other => {
                self.errors.push(RuntimeEvalError::new(
                    node.iterable.span,
                    format!(
                        "each over '{}' needs a list or map, got {}",
                        node.iterable.source,
                        other.type_name()
                    ),
                ));
                self.error_marker(out);
                return Ok(());
            }
        };

        for (index, item) in items.into_iter().enumerate() {
            self.check_deadline(owner)?;
            let mut child = scope.clone();
            child.push_frame();
            child.bind(&node.binding, item);
            child.bind(format!("{}_idx", node.binding), Value::Int(index as i64));
            child.bind("_index", Value::Int(index as i64));
            self.nodes(owner, &node.children, &child, slot, out)?;
        }
        Ok(())
    }

    fn component_call(
        &mut self,
        owner: &CompiledComponent,
        call: &ComponentCall,
        scope: &Scope,
        slot: Option<&str>,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let target = self.source.component(&call.name).ok_or_else(|| {
            RenderError::at(
                owner.component.name.clone(),
                call.span,
                format!("unknown component '{}'", call.name),
            )
        })?;

        if self.depth >= MAX_COMPONENT_DEPTH {
            return Err(RenderError::at(
                owner.component.name.clone(),
                call.span,
                format!("component nesting deeper than {MAX_COMPONENT_DEPTH}; call cycle?"),
            ));
        }

        // Input: named props build a map; otherwise the positional
        // expression (or null).
        let input = if !call.props.is_empty() {
            let mut map = IndexMap::new();
            for (key, value) in &call.props {
                let evaluated = match value {
                    AttrValue::Static(text) => Value::String(text.clone()),
                    AttrValue::Expression(expr) => {
                        self.eval(expr, scope).map(|e| e.value).unwrap_or(Value::Null)
                    }
                    AttrValue::Interpolated(segments) => {
                        let mut text = String::new();
                        for segment in segments {
                            match segment {
                                TextSegment::Literal(t) => text.push_str(t),
                                TextSegment::Expr(expr) => match self.eval(expr, scope) {
                                    Some(e) => text.push_str(&e.value.to_display()),
                                    None => text.push_str("ERROR"),
                                },
                            }
                        }
                        Value::String(text)
                    }
                };
                map.insert(key.clone(), evaluated);
            }
            Value::Map(map)
        } else if let Some(arg) = &call.arg {
            self.eval(arg, scope).map(|e| e.value).unwrap_or(Value::Null)
        } else {
            Value::Null
        };

        // Slot content renders in the caller's scope.
        let slot_html = if call.children.is_empty() {
            None
        } else {
            let mut buffer = String::new();
            self.nodes(owner, &call.children, scope, slot, &mut buffer)?;
            Some(buffer)
        };

        let child_scope = component_scope(&target, &input);
        self.depth += 1;
        let result = self.nodes(
            &target,
            &target.component.roots,
            &child_scope,
            slot_html.as_deref(),
            out,
        );
        self.depth -= 1;
        result
    }

    fn eval(&mut self, expr: &TemplateExpr, scope: &Scope) -> Option<hudl_expr::Evaluated> {
        match expr.eval(scope) {
            Ok(evaluated) => Some(evaluated),
            Err(err) => {
                self.errors.push(err);
                None
            }
        }
    }

    fn error_marker(&mut self, out: &mut String) {
        out.push_str("ERROR");
    }

    /// Marker for text positions: carries the failure message in a title
    /// attribute so it is inspectable in the browser.
    fn error_marker_with_title(&mut self, out: &mut String) {
        let message = self
            .errors
            .last()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        out.push_str("<span title=\"");
        out.push_str(&escape_html(&message));
        out.push_str("\">ERROR</span>");
    }

    fn check_deadline(&self, owner: &CompiledComponent) -> Result<(), RenderError> {
        if Instant::now() >= self.deadline {
            return Err(RenderError::new(
                owner.component.name.clone(),
                "render deadline exceeded",
            ));
        }
        Ok(())
    }
}
