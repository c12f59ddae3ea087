//! Raw tree → typed AST.
//!
//! Resolves selector shorthands, component metadata comments, control-flow
//! constructs, reactive-attribute sugar, special links, and imports.
//! Structural misuse (an `else` without its `if`, a `case` outside a
//! `switch`, two ids on one element) is a [`TransformError`]; a declared
//! data type that the schema does not define is a warning, because the
//! schema may still be on its way in another file.

use crate::ast::{
    AttrValue, CasePattern, Component, ComponentCall, Document, EachNode, Element, IfNode, Node,
    ReactiveAttr, StyleBlock, StyleRule, SwitchCase, SwitchNode, TemplateExpr, TextNode,
    TextSegment,
};
use crate::error::TransformError;
use hudl_schema::Schema;
use hudl_syntax::{RawDocument, RawNode, RawValue, Span};
use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// The transformer's result: the typed document plus non-fatal findings.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub document: Document,
    pub warnings: Vec<(Span, String)>,
}

/// Transform a parsed document.
///
/// `doc_name` is the logical name (file stem); it doubles as the component
/// name when a top-level element has no `// name:` comment. `known`
/// carries component names already visible in the registry so that calls
/// to them resolve; capitalized names resolve as component calls either
/// way and are checked at render time.
pub fn transform(
    raw: &RawDocument,
    doc_name: &str,
    schema: &Schema,
    known: &HashSet<String>,
) -> Result<TransformOutput, TransformError> {
    let ctx = Ctx { known };
    let mut components = Vec::new();
    let mut imports = Vec::new();
    let mut warnings = Vec::new();

    let metadata = scan_metadata(raw);
    let mut consumed_up_to = 0usize;

    for node in &raw.nodes {
        if node.name == "import" && !node.string_name {
            collect_imports(node, &mut imports);
            continue;
        }
        if node.string_name {
            return Err(TransformError::new(
                node.name_span,
                "text content is not allowed at document level",
            ));
        }

        let meta = metadata.between(consumed_up_to, node.span.start);
        consumed_up_to = node.span.end;
        let name = meta
            .name
            .clone()
            .unwrap_or_else(|| doc_name.to_string());

        // The top-level element is a wrapper; the component's roots are
        // its children.
        let (tilde, rest) = split_tilde(node.child_nodes());
        if let Some(t) = tilde.first() {
            return Err(TransformError::new(
                t.name_span,
                "reactive attribute block outside an element",
            ));
        }
        let roots = ctx.children(&rest)?;

        let slots = count_slots(&roots);
        if slots > 1 {
            return Err(TransformError::new(
                node.name_span,
                format!("component '{name}' has {slots} slot markers; at most one is allowed"),
            ));
        }

        if let Some(data_type) = &meta.data_type {
            if schema.message(data_type).is_none() {
                warnings.push((
                    node.name_span,
                    format!("component '{name}' declares unknown data type '{data_type}'"),
                ));
            }
        }

        components.push(Component {
            name,
            data_type: meta.data_type.clone(),
            roots,
            span: node.span,
        });
    }

    Ok(TransformOutput {
        document: Document {
            name: doc_name.to_string(),
            components,
            imports,
        },
        warnings,
    })
}

struct Ctx<'a> {
    known: &'a HashSet<String>,
}

/// Component metadata comments, associated with the next top-level node.
#[derive(Default)]
struct Metadata {
    entries: Vec<(usize, MetaEntry)>,
}

#[derive(Default, Clone)]
struct MetaEntry {
    name: Option<String>,
    data_type: Option<String>,
}

fn scan_metadata(raw: &RawDocument) -> Metadata {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    static DATA_RE: OnceLock<Regex> = OnceLock::new();
    let name_re = NAME_RE.get_or_init(|| Regex::new(r"^name:\s*(\w+)").unwrap());
    let data_re = DATA_RE.get_or_init(|| Regex::new(r"^data:\s*([\w.]+)").unwrap());

    let mut entries: Vec<(usize, MetaEntry)> = Vec::new();
    for comment in raw.line_comments() {
        let mut entry = MetaEntry::default();
        if let Some(caps) = name_re.captures(&comment.text) {
            entry.name = Some(caps[1].to_string());
        }
        if let Some(caps) = data_re.captures(&comment.text) {
            entry.data_type = Some(caps[1].to_string());
        }
        if entry.name.is_some() || entry.data_type.is_some() {
            entries.push((comment.span.start, entry));
        }
    }
    Metadata { entries }
}

impl Metadata {
    /// Merge the metadata comments sitting between the previous top-level
    /// node and this one; each component only sees its own header block.
    fn between(&self, after: usize, before: usize) -> MetaEntry {
        let mut merged = MetaEntry::default();
        for (offset, entry) in &self.entries {
            if *offset >= after && *offset < before {
                if entry.name.is_some() {
                    merged.name = entry.name.clone();
                }
                if entry.data_type.is_some() {
                    merged.data_type = entry.data_type.clone();
                }
            }
        }
        merged
    }
}

fn collect_imports(node: &RawNode, imports: &mut Vec<String>) {
    for entry in node.arguments() {
        if let Some(path) = entry.as_str() {
            imports.push(path.to_string());
        }
    }
    for child in node.child_nodes() {
        imports.push(child.name.clone());
    }
}

fn count_slots(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            Node::Slot => 1,
            Node::Element(el) => count_slots(&el.children),
            Node::If(n) => {
                count_slots(&n.then_children)
                    + n.else_children.as_deref().map_or(0, count_slots)
            }
            Node::Switch(n) => {
                n.cases.iter().map(|c| count_slots(&c.children)).sum::<usize>()
                    + n.default.as_deref().map_or(0, count_slots)
            }
            Node::Each(n) => count_slots(&n.children),
            Node::ComponentCall(c) => count_slots(&c.children),
            _ => 0,
        })
        .sum()
}

/// Partition a child list into reactive (`~`) blocks and everything else.
fn split_tilde<'n>(children: &'n [RawNode]) -> (Vec<&'n RawNode>, Vec<&'n RawNode>) {
    let mut tilde = Vec::new();
    let mut rest = Vec::new();
    for child in children {
        if !child.string_name && child.name == "~" {
            tilde.push(child);
        } else {
            rest.push(child);
        }
    }
    (tilde, rest)
}

impl<'a> Ctx<'a> {
    fn children(&self, nodes: &[&RawNode]) -> Result<Vec<Node>, TransformError> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < nodes.len() {
            let node = nodes[i];

            // Text and expression nodes come from string-literal names.
            if node.string_name {
                out.push(text_or_expression(node));
                i += 1;
                continue;
            }

            match node.name.as_str() {
                "if" => {
                    let condition = expression_arg(node, "if needs a condition expression")?;
                    let (tilde, rest) = split_tilde(node.child_nodes());
                    reject_tilde(&tilde)?;
                    let then_children = self.children(&rest)?;

                    let mut else_children = None;
                    if let Some(next) = nodes.get(i + 1) {
                        if !next.string_name && next.name == "else" {
                            let (tilde, rest) = split_tilde(next.child_nodes());
                            reject_tilde(&tilde)?;
                            else_children = Some(self.children(&rest)?);
                            i += 1;
                        }
                    }

                    out.push(Node::If(IfNode {
                        condition,
                        then_children,
                        else_children,
                    }));
                }
                "else" => {
                    return Err(TransformError::new(
                        node.name_span,
                        "'else' without a matching 'if'",
                    ));
                }
                "switch" => out.push(self.switch(node)?),
                "case" | "default" => {
                    return Err(TransformError::new(
                        node.name_span,
                        format!("'{}' outside a 'switch'", node.name),
                    ));
                }
                "each" => out.push(self.each(node)?),
                "#content" => out.push(Node::Slot),
                "style" => out.push(Node::StyleBlock(style_block(node)?)),
                "~" => {
                    return Err(TransformError::new(
                        node.name_span,
                        "reactive attribute block outside an element",
                    ));
                }
                "import" => {
                    return Err(TransformError::new(
                        node.name_span,
                        "'import' is only allowed at document level",
                    ));
                }
                "_stylesheet" => out.push(self.special_link(node, "link")?),
                "_script" => out.push(self.special_link(node, "script")?),
                name if self.is_component(name) => out.push(self.component_call(node)?),
                _ => out.push(self.element(node)?),
            }
            i += 1;
        }
        Ok(out)
    }

    /// A name resolves as a component call when the registry already knows
    /// it, or when it is capitalized (HTML tags never are); unknown names
    /// fail at render time, which keeps hot reload order-independent.
    fn is_component(&self, name: &str) -> bool {
        self.known.contains(name)
            || name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
    }

    fn switch(&self, node: &RawNode) -> Result<Node, TransformError> {
        let subject = expression_arg(node, "switch needs a subject expression")?;
        let mut cases = Vec::new();
        let mut default = None;

        for child in node.child_nodes() {
            if child.string_name {
                return Err(TransformError::new(
                    child.name_span,
                    "switch blocks may only contain 'case' and 'default'",
                ));
            }
            match child.name.as_str() {
                "case" => {
                    let entry = child.arguments().next().ok_or_else(|| {
                        TransformError::new(child.name_span, "case needs a pattern")
                    })?;
                    let pattern = match &entry.value {
                        RawValue::Word(w) => CasePattern::Symbol(w.clone()),
                        RawValue::String(s) => match entry.value.expression() {
                            Some(expr) => {
                                CasePattern::Expr(TemplateExpr::new(expr, entry.span))
                            }
                            None => CasePattern::Literal(s.clone()),
                        },
                        other => CasePattern::Literal(other.to_display()),
                    };
                    let (tilde, rest) = split_tilde(child.child_nodes());
                    reject_tilde(&tilde)?;
                    cases.push(SwitchCase {
                        pattern,
                        children: self.children(&rest)?,
                    });
                }
                "default" => {
                    if default.is_some() {
                        return Err(TransformError::new(
                            child.name_span,
                            "switch has more than one 'default'",
                        ));
                    }
                    let (tilde, rest) = split_tilde(child.child_nodes());
                    reject_tilde(&tilde)?;
                    default = Some(self.children(&rest)?);
                }
                other => {
                    return Err(TransformError::new(
                        child.name_span,
                        format!("unexpected '{other}' in switch; expected 'case' or 'default'"),
                    ));
                }
            }
        }

        if cases.is_empty() {
            return Err(TransformError::new(
                node.name_span,
                "switch needs at least one case",
            ));
        }

        Ok(Node::Switch(SwitchNode {
            subject,
            cases,
            default,
        }))
    }

    fn each(&self, node: &RawNode) -> Result<Node, TransformError> {
        let mut args = node.arguments();
        let binding = match args.next().map(|e| &e.value) {
            Some(RawValue::Word(w)) => w.clone(),
            _ => {
                return Err(TransformError::new(
                    node.name_span,
                    "each needs a loop-variable name",
                ));
            }
        };
        if !is_identifier(&binding) {
            return Err(TransformError::new(
                node.name_span,
                format!("'{binding}' is not a valid loop-variable name"),
            ));
        }
        let iterable = match args.next() {
            Some(entry) => entry_expression(entry)?,
            None => {
                return Err(TransformError::new(
                    node.name_span,
                    "each needs an iterable expression",
                ));
            }
        };

        let (tilde, rest) = split_tilde(node.child_nodes());
        reject_tilde(&tilde)?;
        Ok(Node::Each(EachNode {
            binding,
            iterable,
            children: self.children(&rest)?,
        }))
    }

    fn component_call(&self, node: &RawNode) -> Result<Node, TransformError> {
        let mut arg = None;
        let mut props = Vec::new();
        for entry in &node.entries {
            match &entry.name {
                Some(key) => props.push((key.clone(), attr_value(entry)?)),
                None => {
                    if arg.is_some() {
                        return Err(TransformError::new(
                            entry.span,
                            "component call takes at most one input expression",
                        ));
                    }
                    arg = Some(entry_expression(entry)?);
                }
            }
        }

        let (tilde, rest) = split_tilde(node.child_nodes());
        reject_tilde(&tilde)?;
        Ok(Node::ComponentCall(ComponentCall {
            name: node.name.clone(),
            arg,
            props,
            children: self.children(&rest)?,
            span: node.span,
        }))
    }

    fn special_link(&self, node: &RawNode, tag: &str) -> Result<Node, TransformError> {
        let mut attributes = IndexMap::new();
        if tag == "link" {
            attributes.insert("rel".to_string(), AttrValue::Static("stylesheet".into()));
        }
        let target_attr = if tag == "link" { "href" } else { "src" };
        if let Some(entry) = node.arguments().next() {
            attributes.insert(target_attr.to_string(), attr_value(entry)?);
        } else {
            return Err(TransformError::new(
                node.name_span,
                format!("'{}' needs a path", node.name),
            ));
        }
        for (key, entry) in node.properties() {
            attributes.insert(key.to_string(), attr_value(entry)?);
        }

        Ok(Node::Element(Element {
            tag: tag.to_string(),
            id: None,
            classes: Vec::new(),
            attributes,
            reactive: Vec::new(),
            children: Vec::new(),
            span: node.span,
        }))
    }

    fn element(&self, node: &RawNode) -> Result<Node, TransformError> {
        // Binding shorthand: `input~>query~debounce:300ms`.
        let (selector, bind_attr) = match node.name.split_once("~>") {
            Some((selector, rest)) => {
                let mut parts = rest.split('~');
                let signal = parts.next().unwrap_or_default().to_string();
                if signal.is_empty() {
                    return Err(TransformError::new(
                        node.name_span,
                        "binding shorthand '~>' needs a signal name",
                    ));
                }
                let modifiers = parts.map(str::to_string).collect();
                (
                    selector.to_string(),
                    Some(ReactiveAttr {
                        name: "bind".to_string(),
                        value: Some(signal),
                        modifiers,
                        span: node.name_span,
                    }),
                )
            }
            None => (node.name.clone(), None),
        };

        let (tag, mut id, mut classes) = parse_selector(&selector, node.name_span)?;

        let mut attributes: IndexMap<String, AttrValue> = IndexMap::new();
        let mut reactive = Vec::new();
        let mut children = Vec::new();

        for entry in &node.entries {
            match &entry.name {
                Some(key) if key.starts_with('~') => {
                    let value = strip_backticks(&entry.value.to_display()).to_string();
                    reactive.push(reactive_from_name(&key[1..], Some(value), entry.span));
                }
                Some(key) => match key.as_str() {
                    "id" => id = Some(entry.value.to_display()),
                    "class" => classes.extend(
                        entry
                            .value
                            .to_display()
                            .split_whitespace()
                            .map(str::to_string),
                    ),
                    _ => {
                        if attributes.contains_key(key) {
                            return Err(TransformError::new(
                                entry.span,
                                format!("duplicate attribute '{key}'"),
                            ));
                        }
                        attributes.insert(key.clone(), attr_value(entry)?);
                    }
                },
                None => match &entry.value {
                    RawValue::Word(w) if w.starts_with('~') => {
                        reactive.push(reactive_from_name(&w[1..], None, entry.span));
                    }
                    value => {
                        if let Some(expr) = value.expression() {
                            children.push(Node::Expression(TemplateExpr::new(expr, entry.span)));
                        } else {
                            children.push(text_from_string(&value.to_display(), entry.span));
                        }
                    }
                },
            }
        }

        if let Some(bind) = bind_attr {
            reactive.push(bind);
        }

        let (tilde, rest) = split_tilde(node.child_nodes());
        for block in tilde {
            for spec in block.child_nodes() {
                if spec.string_name {
                    return Err(TransformError::new(
                        spec.name_span,
                        "reactive blocks hold attribute specs, not text",
                    ));
                }
                reactive.extend(reactive_specs(spec)?);
            }
        }

        children.extend(self.children(&rest)?);

        Ok(Node::Element(Element {
            tag,
            id,
            classes,
            attributes,
            reactive,
            children,
            span: node.span,
        }))
    }
}

fn reject_tilde(tilde: &[&RawNode]) -> Result<(), TransformError> {
    if let Some(t) = tilde.first() {
        return Err(TransformError::new(
            t.name_span,
            "reactive attribute block outside an element",
        ));
    }
    Ok(())
}

/// Expand one tilde-block line into reactive attributes. A line usually
/// holds one spec (`on:click "$n++"`), but several may share it
/// (`on:click "@post('/x')" .warn $isWarn`): a bare word that reads as an
/// attribute name starts the next spec.
fn reactive_specs(spec: &RawNode) -> Result<Vec<ReactiveAttr>, TransformError> {
    let mut out = Vec::new();
    let mut current = reactive_from_name(&spec.name, None, spec.name_span);

    for entry in &spec.entries {
        if entry.name.is_some() {
            return Err(TransformError::new(
                entry.span,
                "reactive specs take their value after a space, not '='",
            ));
        }
        if let RawValue::Word(word) = &entry.value {
            if is_reactive_name(word) {
                out.push(current);
                current = reactive_from_name(word, None, entry.span);
                continue;
            }
        }
        if current.value.is_some() {
            return Err(TransformError::new(
                entry.span,
                format!("reactive attribute '{}' has more than one value", current.name),
            ));
        }
        current.value = Some(strip_backticks(&entry.value.to_display()).to_string());
    }
    out.push(current);
    Ok(out)
}

/// Words that read as reactive attribute names when they appear mid-line.
fn is_reactive_name(word: &str) -> bool {
    let base = word.split('~').next().unwrap_or(word);
    (base.len() > 1 && base.starts_with('.'))
        || base.contains(':')
        || matches!(
            base,
            "show" | "text" | "ref" | "bind" | "persist" | "teleport" | "scrollIntoView"
        )
}

/// Inline reactive attribute: name already has its leading `~` removed;
/// remaining `~` separators carry modifiers.
fn reactive_from_name(name: &str, value: Option<String>, span: Span) -> ReactiveAttr {
    let mut parts = name.split('~');
    let base = parts.next().unwrap_or_default().to_string();
    ReactiveAttr {
        name: base,
        value,
        modifiers: parts.map(str::to_string).collect(),
        span,
    }
}

fn strip_backticks(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('`') && s.ends_with('`') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn expression_arg(node: &RawNode, missing: &str) -> Result<TemplateExpr, TransformError> {
    match node.arguments().next() {
        Some(entry) => entry_expression(entry),
        None => Err(TransformError::new(node.name_span, missing)),
    }
}

/// Lift an entry into an expression: wrapped backtick sources evaluate as
/// written; bare words read as identifier expressions; quoted strings as
/// string literals.
fn entry_expression(entry: &hudl_syntax::RawEntry) -> Result<TemplateExpr, TransformError> {
    if let Some(src) = entry.value.expression() {
        return Ok(TemplateExpr::new(src, entry.span));
    }
    match &entry.value {
        RawValue::Word(w) => Ok(TemplateExpr::new(w.clone(), entry.span)),
        RawValue::String(s) => Ok(TemplateExpr::new(quote_literal(s), entry.span)),
        RawValue::Int(i) => Ok(TemplateExpr::new(i.to_string(), entry.span)),
        RawValue::Float(f) => Ok(TemplateExpr::new(f.to_string(), entry.span)),
        RawValue::Bool(b) => Ok(TemplateExpr::new(b.to_string(), entry.span)),
        RawValue::Null => Ok(TemplateExpr::new("null", entry.span)),
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn attr_value(entry: &hudl_syntax::RawEntry) -> Result<AttrValue, TransformError> {
    if let Some(src) = entry.value.expression() {
        return Ok(AttrValue::Expression(TemplateExpr::new(src, entry.span)));
    }
    match &entry.value {
        RawValue::String(s) if s.contains('`') => {
            Ok(AttrValue::Interpolated(split_segments(s, entry.span)))
        }
        other => Ok(AttrValue::Static(other.to_display())),
    }
}

fn text_or_expression(node: &RawNode) -> Node {
    if let Some(expr) = node.name_expression() {
        return Node::Expression(TemplateExpr::new(expr, node.name_span));
    }
    text_from_string(&node.name, node.name_span)
}

fn text_from_string(content: &str, span: Span) -> Node {
    Node::Text(TextNode {
        segments: split_segments(content, span),
        span,
    })
}

/// Split interpolated text on backticks: even chunks are literal, odd are
/// expressions.
fn split_segments(content: &str, span: Span) -> Vec<TextSegment> {
    let mut segments = Vec::new();
    for (i, part) in content.split('`').enumerate() {
        if i % 2 == 0 {
            if !part.is_empty() {
                segments.push(TextSegment::Literal(part.to_string()));
            }
        } else {
            segments.push(TextSegment::Expr(TemplateExpr::new(part, span)));
        }
    }
    segments
}

fn style_block(node: &RawNode) -> Result<StyleBlock, TransformError> {
    let mut declarations = Vec::new();
    let mut rules = Vec::new();

    for child in node.child_nodes() {
        if child.string_name {
            return Err(TransformError::new(
                child.name_span,
                "style blocks hold declarations, not text",
            ));
        }
        if child.children.is_some() {
            let mut decls = Vec::new();
            for prop in child.child_nodes() {
                decls.push(style_declaration(prop)?);
            }
            rules.push(StyleRule {
                selector: child.name.clone(),
                declarations: decls,
            });
        } else {
            declarations.push(style_declaration(child)?);
        }
    }

    Ok(StyleBlock {
        declarations,
        rules,
        span: node.span,
    })
}

fn style_declaration(node: &RawNode) -> Result<(String, String), TransformError> {
    let value = node
        .arguments()
        .next()
        .map(|e| e.value.to_display())
        .ok_or_else(|| {
            TransformError::new(
                node.name_span,
                format!("style property '{}' needs a value", node.name),
            )
        })?;
    Ok((node.name.clone(), value))
}

/// Split a selector like `div#root.card.wide` into tag, id, classes.
/// A leading `.` or `#` implies a `div` tag.
fn parse_selector(
    selector: &str,
    span: Span,
) -> Result<(String, Option<String>, Vec<String>), TransformError> {
    let mut tag = String::new();
    let mut id = None;
    let mut classes = Vec::new();

    let mut mode = 't';
    let mut current = String::new();

    let commit = |mode: char,
                  current: &mut String,
                  tag: &mut String,
                  id: &mut Option<String>,
                  classes: &mut Vec<String>|
     -> Result<(), TransformError> {
        let token = std::mem::take(current);
        match mode {
            't' => *tag = token,
            'i' => {
                if token.is_empty() {
                    return Err(TransformError::new(span, "empty id in selector"));
                }
                if id.replace(token).is_some() {
                    return Err(TransformError::new(span, "selector has more than one '#id'"));
                }
            }
            _ => {
                if token.is_empty() {
                    return Err(TransformError::new(span, "empty class in selector"));
                }
                classes.push(token);
            }
        }
        Ok(())
    };

    for c in selector.chars() {
        match c {
            '#' => {
                commit(mode, &mut current, &mut tag, &mut id, &mut classes)?;
                mode = 'i';
            }
            '.' => {
                commit(mode, &mut current, &mut tag, &mut id, &mut classes)?;
                mode = 'c';
            }
            _ => current.push(c),
        }
    }
    commit(mode, &mut current, &mut tag, &mut id, &mut classes)?;

    if tag.is_empty() {
        tag = "div".to_string();
    }
    if !is_tag_name(&tag) {
        return Err(TransformError::new(
            span,
            format!("'{tag}' is not a valid element name"),
        ));
    }

    Ok((tag, id, classes))
}

fn is_tag_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
