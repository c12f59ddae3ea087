//! Recursive-descent parser for the node grammar.
//!
//! Grammar (informal):
//!
//! ```text
//! document = node*
//! node     = name entry* ("{" node* "}")? terminator
//! entry    = word "=" value   (named property)
//!          | value            (positional)
//! value    = string | raw-string | word
//! ```
//!
//! Bare words in value position are interpreted as integers, floats,
//! booleans, `null`, or otherwise as strings, so `each item` and
//! `let:count 0` both parse without quoting.

use crate::error::SyntaxError;
use crate::lexer::{lex, Token, TokenKind};
use crate::raw::{RawDocument, RawEntry, RawNode, RawValue};
use crate::span::Span;

/// Parse normalized source into a raw document.
pub fn parse_document(input: &str) -> Result<RawDocument, SyntaxError> {
    let out = lex(input)?;
    let mut parser = Parser {
        tokens: out.tokens,
        pos: 0,
    };
    let nodes = parser.parse_nodes(false)?;
    parser.expect_eof()?;
    Ok(RawDocument {
        nodes,
        comments: out.comments,
    })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn skip_terminators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Terminator) {
            self.bump();
        }
    }

    fn parse_nodes(&mut self, in_block: bool) -> Result<Vec<RawNode>, SyntaxError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_terminators();
            match &self.peek().kind {
                TokenKind::Eof => {
                    if in_block {
                        return Err(SyntaxError::new(self.peek().span, "unclosed '{' block"));
                    }
                    return Ok(nodes);
                }
                TokenKind::RBrace => {
                    if !in_block {
                        return Err(SyntaxError::new(self.peek().span, "unmatched '}'"));
                    }
                    return Ok(nodes);
                }
                _ => nodes.push(self.parse_node()?),
            }
        }
    }

    fn parse_node(&mut self) -> Result<RawNode, SyntaxError> {
        let name_tok = self.bump();
        let (name, name_span, string_name) = match name_tok.kind {
            TokenKind::Word(w) => (w, name_tok.span, false),
            // A string in node position is text content (or an expression,
            // when the string still carries backticks from normalization).
            TokenKind::Str { value, .. } => (value, name_tok.span, true),
            other => {
                return Err(SyntaxError::new(
                    name_tok.span,
                    format!("expected node name, found {}", describe(&other)),
                ));
            }
        };

        let mut entries = Vec::new();
        let mut children = None;
        let mut span = name_span;

        loop {
            match &self.peek().kind {
                TokenKind::Terminator | TokenKind::Eof => {
                    if !matches!(self.peek().kind, TokenKind::Eof) {
                        self.bump();
                    }
                    break;
                }
                TokenKind::RBrace => break,
                TokenKind::LBrace => {
                    let open = self.bump();
                    let block = self.parse_nodes(true)?;
                    let close = self.bump(); // RBrace, guaranteed by parse_nodes
                    span = span.merge(open.span).merge(close.span);
                    children = Some(block);
                    // Anything after a child block belongs to the next node.
                    self.terminate_after_block()?;
                    break;
                }
                TokenKind::Equals => {
                    return Err(SyntaxError::new(
                        self.peek().span,
                        "unexpected '=' without a property name",
                    ));
                }
                _ => {
                    let entry = self.parse_entry()?;
                    span = span.merge(entry.span);
                    entries.push(entry);
                }
            }
        }

        Ok(RawNode {
            name,
            name_span,
            string_name,
            entries,
            children,
            span,
        })
    }

    /// After `}` the node is done. A terminator is consumed when present;
    /// a following name starts a sibling node on the same line, so
    /// `case A { ... } case B { ... }` works without semicolons.
    fn terminate_after_block(&mut self) -> Result<(), SyntaxError> {
        if matches!(self.peek().kind, TokenKind::Terminator) {
            self.bump();
        }
        Ok(())
    }

    fn parse_entry(&mut self) -> Result<RawEntry, SyntaxError> {
        let first = self.bump();
        match first.kind {
            TokenKind::Word(w) => {
                if matches!(self.peek().kind, TokenKind::Equals) {
                    self.bump(); // '='
                    let (value, vspan) = self.parse_value()?;
                    Ok(RawEntry {
                        name: Some(w),
                        value,
                        span: first.span.merge(vspan),
                    })
                } else {
                    Ok(RawEntry {
                        name: None,
                        value: word_to_value(&w),
                        span: first.span,
                    })
                }
            }
            TokenKind::Str { value, .. } => Ok(RawEntry {
                name: None,
                value: RawValue::String(value),
                span: first.span,
            }),
            other => Err(SyntaxError::new(
                first.span,
                format!("expected value, found {}", describe(&other)),
            )),
        }
    }

    fn parse_value(&mut self) -> Result<(RawValue, Span), SyntaxError> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::Str { value, .. } => Ok((RawValue::String(value), tok.span)),
            TokenKind::Word(w) => Ok((word_to_value(&w), tok.span)),
            other => Err(SyntaxError::new(
                tok.span,
                format!("expected property value, found {}", describe(&other)),
            )),
        }
    }

    fn expect_eof(&mut self) -> Result<(), SyntaxError> {
        self.skip_terminators();
        match &self.peek().kind {
            TokenKind::Eof => Ok(()),
            other => Err(SyntaxError::new(
                self.peek().span,
                format!("unexpected {} after document end", describe(other)),
            )),
        }
    }
}

fn word_to_value(w: &str) -> RawValue {
    match w {
        "true" => return RawValue::Bool(true),
        "false" => return RawValue::Bool(false),
        "null" => return RawValue::Null,
        _ => {}
    }
    if let Ok(i) = w.parse::<i64>() {
        return RawValue::Int(i);
    }
    if w.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-') {
        if let Ok(f) = w.parse::<f64>() {
            return RawValue::Float(f);
        }
    }
    RawValue::Word(w.to_string())
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Word(w) => format!("'{w}'"),
        TokenKind::Str { .. } => "string".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::Equals => "'='".to_string(),
        TokenKind::Terminator => "end of node".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn parse(input: &str) -> RawDocument {
        parse_document(&normalize(input)).unwrap()
    }

    #[test]
    fn single_line_nesting() {
        let doc = parse(r#"el { .card { h1#title "Hi" } }"#);
        assert_eq!(doc.nodes.len(), 1);
        let el = &doc.nodes[0];
        assert_eq!(el.name, "el");
        let card = &el.child_nodes()[0];
        assert_eq!(card.name, ".card");
        let h1 = &card.child_nodes()[0];
        assert_eq!(h1.name, "h1#title");
        assert_eq!(h1.entries[0].value, RawValue::String("Hi".into()));
    }

    #[test]
    fn properties_and_arguments() {
        let doc = parse(r#"a href="/login" target=_blank "Login""#);
        let a = &doc.nodes[0];
        assert_eq!(a.property("href").unwrap().as_str(), Some("/login"));
        assert_eq!(a.property("target").unwrap().as_str(), Some("_blank"));
        let args: Vec<_> = a.arguments().collect();
        assert_eq!(args.len(), 1);
        assert_eq!(args[0].as_str(), Some("Login"));
    }

    #[test]
    fn backtick_expression_value() {
        let doc = parse("h1 `title`");
        let h1 = &doc.nodes[0];
        let arg = h1.arguments().next().unwrap();
        assert_eq!(arg.value.expression(), Some("title"));
    }

    #[test]
    fn bare_word_scalars() {
        let doc = parse("x a=1 b=2.5 c=true d=null e=text");
        let n = &doc.nodes[0];
        assert_eq!(n.property("a").unwrap().value, RawValue::Int(1));
        assert_eq!(n.property("b").unwrap().value, RawValue::Float(2.5));
        assert_eq!(n.property("c").unwrap().value, RawValue::Bool(true));
        assert_eq!(n.property("d").unwrap().value, RawValue::Null);
        assert_eq!(n.property("e").unwrap().value, RawValue::Word("text".into()));
    }

    #[test]
    fn quoted_and_bare_values_stay_distinct() {
        let doc = parse("switch `s` { case S_ACTIVE {}; case \"S_ACTIVE\" {} }");
        let switch = &doc.nodes[0];
        let cases = switch.child_nodes();
        assert_eq!(
            cases[0].arguments().next().unwrap().value,
            RawValue::Word("S_ACTIVE".into())
        );
        assert_eq!(
            cases[1].arguments().next().unwrap().value,
            RawValue::String("S_ACTIVE".into())
        );
    }

    #[test]
    fn siblings_by_newline_and_semicolon() {
        let doc = parse("div\nspan; p");
        let names: Vec<_> = doc.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["div", "span", "p"]);
    }

    #[test]
    fn empty_children_block() {
        let doc = parse("div {}");
        assert_eq!(doc.nodes[0].children, Some(vec![]));
        let doc = parse("div");
        assert_eq!(doc.nodes[0].children, None);
    }

    #[test]
    fn if_else_siblings_after_normalization() {
        let doc = parse("if `ok` { span \"y\" } else { span \"n\" }");
        let names: Vec<_> = doc.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["if", "else"]);
    }

    #[test]
    fn import_block_paths() {
        let doc = parse("import {\n    ./layout\n    ./widgets\n}");
        let import = &doc.nodes[0];
        let paths: Vec<_> = import.child_nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(paths, vec!["./layout", "./widgets"]);
    }

    #[test]
    fn comments_delivered() {
        let doc = parse("// name: Card\n/** message M { string a = 1; } */\nel {}");
        assert_eq!(doc.line_comments().count(), 1);
        assert_eq!(doc.schema_blocks().count(), 1);
        assert!(doc.schema_blocks().next().unwrap().text.contains("message M"));
    }

    #[test]
    fn unclosed_block_is_error() {
        let err = parse_document("div {").unwrap_err();
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn unmatched_close_is_error() {
        let err = parse_document("div }").unwrap_err();
        assert!(err.message.contains("unmatched"));
    }

    #[test]
    fn siblings_after_block_on_one_line() {
        let doc = parse("switch `s` { case A { span \"a\" } case B { span \"b\" } default { span \"?\" } }");
        let switch = &doc.nodes[0];
        let names: Vec<_> = switch.child_nodes().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["case", "case", "default"]);
    }

    #[test]
    fn error_spans_point_into_source() {
        let src = "div {\n  p \"ok\"\n";
        let err = parse_document(src).unwrap_err();
        assert!(err.span.start <= src.len());
    }

    #[test]
    fn string_child_is_marked() {
        let doc = parse("button { \"Go\" }");
        let child = &doc.nodes[0].child_nodes()[0];
        assert!(child.string_name);
        assert_eq!(child.name, "Go");
    }

    #[test]
    fn expression_child_is_marked() {
        let doc = parse("span { `status` }");
        let child = &doc.nodes[0].child_nodes()[0];
        assert_eq!(child.name_expression(), Some("status"));
    }

    #[test]
    fn tilde_block_child() {
        let doc = parse("button {\n    ~ {\n        on:click \"$count++\"\n    }\n    \"Go\"\n}");
        let button = &doc.nodes[0];
        assert_eq!(button.child_nodes()[0].name, "~");
        let tilde = &button.child_nodes()[0];
        assert_eq!(tilde.child_nodes()[0].name, "on:click");
    }
}
