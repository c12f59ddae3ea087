//! Text-format preview data.
//!
//! Preview files (`<component>[_<label>].preview.txtpb`) hold mock inputs
//! in the IDL's text format. This module parses them into [`Value`]s and
//! generates a default skeleton for a message type, used when the dev
//! server is asked for a preview that does not exist yet.

use crate::error::TextFormatError;
use crate::model::{FieldType, Schema};
use crate::value::{EnumValue, MessageValue, Value};
use std::collections::HashSet;

/// Parse text-format `input` as a message of type `message_name`.
pub fn parse(input: &str, message_name: &str, schema: &Schema) -> Result<Value, TextFormatError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        schema,
    };
    let value = parser.parse_message_body(message_name, true)?;
    parser.expect_done()?;
    Ok(value)
}

/// Generate a default skeleton for `message_name`: every field present with
/// its zero value, nested messages expanded, recursion cut with a comment.
pub fn skeleton(message_name: &str, schema: &Schema) -> Result<String, TextFormatError> {
    let mut visited = HashSet::new();
    skeleton_inner(message_name, schema, &mut visited, 0)
}

fn skeleton_inner(
    message_name: &str,
    schema: &Schema,
    visited: &mut HashSet<String>,
    depth: usize,
) -> Result<String, TextFormatError> {
    let message = schema.message(message_name).ok_or_else(|| {
        TextFormatError::Other(format!("unknown message type '{message_name}'"))
    })?;
    let indent = "  ".repeat(depth);

    if !visited.insert(message_name.to_string()) {
        return Ok(format!("{indent}# recursive: {message_name}\n"));
    }

    let mut out = String::new();
    for field in &message.fields {
        if field.repeated {
            out.push_str(&format!("{indent}# repeated\n"));
        }
        match &field.ty {
            FieldType::String | FieldType::Bytes => {
                out.push_str(&format!("{indent}{}: \"\"\n", field.name));
            }
            FieldType::Bool => {
                out.push_str(&format!("{indent}{}: false\n", field.name));
            }
            FieldType::Double | FieldType::Float => {
                out.push_str(&format!("{indent}{}: 0.0\n", field.name));
            }
            FieldType::Map(_, _) => {
                out.push_str(&format!("{indent}{} {{\n{indent}}}\n", field.name));
            }
            FieldType::Named(name) => {
                if let Some(en) = schema.enum_def(name) {
                    let default = en.symbol_for(0).unwrap_or("UNKNOWN");
                    out.push_str(&format!("{indent}{}: {default}\n", field.name));
                } else {
                    out.push_str(&format!("{indent}{} {{\n", field.name));
                    out.push_str(&skeleton_inner(name, schema, visited, depth + 1)?);
                    out.push_str(&format!("{indent}}}\n"));
                }
            }
            _ => {
                out.push_str(&format!("{indent}{}: 0\n", field.name));
            }
        }
    }

    visited.remove(message_name);
    Ok(out)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Colon,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
}

#[derive(Debug, Clone)]
struct Spanned {
    tok: Tok,
    line: usize,
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, TextFormatError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    let mut line = 1;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            ' ' | '\t' | '\r' => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            ':' => {
                out.push(Spanned { tok: Tok::Colon, line });
                i += 1;
            }
            '{' => {
                out.push(Spanned { tok: Tok::LBrace, line });
                i += 1;
            }
            '}' => {
                out.push(Spanned { tok: Tok::RBrace, line });
                i += 1;
            }
            '[' => {
                out.push(Spanned { tok: Tok::LBracket, line });
                i += 1;
            }
            ']' => {
                out.push(Spanned { tok: Tok::RBracket, line });
                i += 1;
            }
            ',' => {
                out.push(Spanned { tok: Tok::Comma, line });
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                loop {
                    match chars.get(i) {
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            i += 1;
                            match chars.get(i) {
                                Some('n') => s.push('\n'),
                                Some('t') => s.push('\t'),
                                Some('r') => s.push('\r'),
                                Some(&other) => s.push(other),
                                None => {
                                    return Err(TextFormatError::at(line, "unterminated string"));
                                }
                            }
                            i += 1;
                        }
                        Some(&ch) => {
                            if ch == '\n' {
                                line += 1;
                            }
                            s.push(ch);
                            i += 1;
                        }
                        None => return Err(TextFormatError::at(line, "unterminated string")),
                    }
                }
                out.push(Spanned { tok: Tok::Str(s), line });
            }
            '-' | '0'..='9' => {
                let start = i;
                if c == '-' {
                    i += 1;
                }
                let mut is_float = false;
                while let Some(&ch) = chars.get(i) {
                    match ch {
                        '0'..='9' => i += 1,
                        '.' | 'e' | 'E' | '+' => {
                            is_float = true;
                            i += 1;
                        }
                        '-' if is_float => i += 1,
                        _ => break,
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let tok = if is_float {
                    Tok::Float(
                        text.parse()
                            .map_err(|_| TextFormatError::at(line, format!("bad float '{text}'")))?,
                    )
                } else {
                    Tok::Int(
                        text.parse()
                            .map_err(|_| TextFormatError::at(line, format!("bad integer '{text}'")))?,
                    )
                };
                out.push(Spanned { tok, line });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while let Some(&ch) = chars.get(i) {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let word: String = chars[start..i].iter().collect();
                let tok = match word.as_str() {
                    "true" => Tok::Bool(true),
                    "false" => Tok::Bool(false),
                    _ => Tok::Ident(word),
                };
                out.push(Spanned { tok, line });
            }
            other => {
                return Err(TextFormatError::at(
                    line,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }
    Ok(out)
}

struct Parser<'a> {
    tokens: Vec<Spanned>,
    pos: usize,
    schema: &'a Schema,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Spanned> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn expect_done(&self) -> Result<(), TextFormatError> {
        if self.pos < self.tokens.len() {
            return Err(TextFormatError::at(self.line(), "trailing content"));
        }
        Ok(())
    }

    /// Parse `field: value` entries until `}` (or end of input at top
    /// level), producing a message with defaults for absent fields.
    fn parse_message_body(
        &mut self,
        message_name: &str,
        top_level: bool,
    ) -> Result<Value, TextFormatError> {
        let message = self
            .schema
            .message(message_name)
            .ok_or_else(|| {
                TextFormatError::Other(format!("unknown message type '{message_name}'"))
            })?
            .clone();
        let mut out = MessageValue::new(message_name);

        loop {
            match self.peek().map(|t| t.tok.clone()) {
                None if top_level => break,
                Some(Tok::RBrace) if !top_level => break,
                Some(Tok::Ident(name)) => {
                    self.bump();
                    let field = message.field_by_name(&name).ok_or_else(|| {
                        TextFormatError::at(
                            self.line(),
                            format!("unknown field '{name}' on message '{message_name}'"),
                        )
                    })?;
                    let field = field.clone();
                    let value = self.parse_field_value(&field.ty)?;
                    if field.repeated {
                        match (out.fields.get_mut(&field.name), value) {
                            (Some(Value::List(list)), Value::List(mut more)) => {
                                list.append(&mut more)
                            }
                            (Some(Value::List(list)), single) => list.push(single),
                            (_, Value::List(items)) => {
                                out.fields.insert(field.name.clone(), Value::List(items));
                            }
                            (_, single) => {
                                out.fields.insert(field.name.clone(), Value::List(vec![single]));
                            }
                        }
                    } else {
                        out.fields.insert(field.name.clone(), value);
                    }
                    out.explicit.insert(field.name.clone());
                }
                Some(other) => {
                    return Err(TextFormatError::at(
                        self.line(),
                        format!("expected field name, found {other:?}"),
                    ));
                }
                None => {
                    return Err(TextFormatError::at(
                        self.line(),
                        format!("unterminated message '{message_name}'"),
                    ));
                }
            }
        }

        for field in &message.fields {
            if out.fields.contains_key(&field.name) {
                continue;
            }
            let value = if field.repeated {
                Value::List(Vec::new())
            } else {
                self.schema.default_value(&field.ty)
            };
            out.fields.insert(field.name.clone(), value);
        }

        Ok(Value::Message(out))
    }

    fn parse_field_value(&mut self, ty: &FieldType) -> Result<Value, TextFormatError> {
        // Message-typed fields use `name { ... }` without a colon; scalars use
        // `name: value`. A colon before `{` is tolerated either way.
        if matches!(self.peek().map(|t| &t.tok), Some(Tok::Colon)) {
            self.bump();
        }

        match self.peek().map(|t| t.tok.clone()) {
            Some(Tok::LBrace) => {
                self.bump();
                let value = match ty {
                    FieldType::Named(name) if !self.schema.is_enum(name) => {
                        self.parse_message_body(name, false)?
                    }
                    FieldType::Map(_, value_ty) => self.parse_map_body(value_ty)?,
                    _ => {
                        return Err(TextFormatError::at(
                            self.line(),
                            "braces are only valid for message and map fields",
                        ));
                    }
                };
                match self.bump().map(|t| t.tok) {
                    Some(Tok::RBrace) => Ok(value),
                    _ => Err(TextFormatError::at(self.line(), "expected '}'")),
                }
            }
            Some(Tok::LBracket) => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    match self.peek().map(|t| t.tok.clone()) {
                        Some(Tok::RBracket) => {
                            self.bump();
                            break;
                        }
                        Some(Tok::Comma) => {
                            self.bump();
                        }
                        Some(_) => items.push(self.parse_field_value(ty)?),
                        None => {
                            return Err(TextFormatError::at(self.line(), "unterminated list"));
                        }
                    }
                }
                Ok(Value::List(items))
            }
            Some(Tok::Str(s)) => {
                self.bump();
                match ty {
                    FieldType::Bytes => Ok(Value::Bytes(s.into_bytes())),
                    _ => Ok(Value::String(s)),
                }
            }
            Some(Tok::Int(n)) => {
                self.bump();
                match ty {
                    FieldType::Double | FieldType::Float => Ok(Value::Float(n as f64)),
                    _ => Ok(Value::Int(n)),
                }
            }
            Some(Tok::Float(f)) => {
                self.bump();
                Ok(Value::Float(f))
            }
            Some(Tok::Bool(b)) => {
                self.bump();
                Ok(Value::Bool(b))
            }
            Some(Tok::Ident(word)) => {
                self.bump();
                match ty {
                    FieldType::Named(name) => {
                        let en = self.schema.enum_def(name).ok_or_else(|| {
                            TextFormatError::at(
                                self.line(),
                                format!("'{word}' used where message '{name}' was expected"),
                            )
                        })?;
                        let number = en.number_for(&word).ok_or_else(|| {
                            TextFormatError::at(
                                self.line(),
                                format!("unknown enum value '{word}' for '{name}'"),
                            )
                        })?;
                        Ok(Value::Enum(EnumValue {
                            symbol: word,
                            number,
                        }))
                    }
                    _ => Err(TextFormatError::at(
                        self.line(),
                        format!("unexpected identifier '{word}'"),
                    )),
                }
            }
            other => Err(TextFormatError::at(
                self.line(),
                format!("expected value, found {other:?}"),
            )),
        }
    }

    /// `field { key: "k" value: v }` entries were already consumed up to the
    /// opening brace; maps in preview files use `key: value` pairs directly.
    fn parse_map_body(&mut self, value_ty: &FieldType) -> Result<Value, TextFormatError> {
        let mut map = indexmap::IndexMap::new();
        loop {
            match self.peek().map(|t| t.tok.clone()) {
                Some(Tok::RBrace) | None => break,
                Some(Tok::Ident(key)) => {
                    self.bump();
                    let value = self.parse_field_value(value_ty)?;
                    map.insert(key, value);
                }
                Some(Tok::Str(key)) => {
                    self.bump();
                    let value = self.parse_field_value(value_ty)?;
                    map.insert(key, value);
                }
                Some(other) => {
                    return Err(TextFormatError::at(
                        self.line(),
                        format!("expected map key, found {other:?}"),
                    ));
                }
            }
        }
        Ok(Value::Map(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_block;
    use hudl_syntax::Span;

    fn schema(text: &str) -> Schema {
        parse_block(text, Span::default()).unwrap()
    }

    #[test]
    fn parse_scalars() {
        let schema = schema("message D { string name = 1; int32 count = 2; bool on = 3; }");
        let value = parse("name: \"Ada\"\ncount: 3\non: true\n", "D", &schema).unwrap();
        let Value::Message(msg) = value else { panic!() };
        assert_eq!(msg.get("name"), Some(&Value::String("Ada".into())));
        assert_eq!(msg.get("count"), Some(&Value::Int(3)));
        assert_eq!(msg.get("on"), Some(&Value::Bool(true)));
    }

    #[test]
    fn absent_fields_take_defaults() {
        let schema = schema("message D { string name = 1; int32 count = 2; }");
        let Value::Message(msg) = parse("name: \"x\"\n", "D", &schema).unwrap() else {
            panic!()
        };
        assert_eq!(msg.get("count"), Some(&Value::Int(0)));
        assert!(!msg.is_set("count"));
    }

    #[test]
    fn repeated_by_repetition() {
        let schema = schema("message D { repeated string items = 1; }");
        let Value::Message(msg) =
            parse("items: \"a\"\nitems: \"b\"\n", "D", &schema).unwrap()
        else {
            panic!()
        };
        assert_eq!(
            msg.get("items"),
            Some(&Value::List(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
    }

    #[test]
    fn repeated_by_list_syntax() {
        let schema = schema("message D { repeated int32 nums = 1; }");
        let Value::Message(msg) = parse("nums: [1, 2, 3]\n", "D", &schema).unwrap() else {
            panic!()
        };
        assert_eq!(
            msg.get("nums"),
            Some(&Value::List(vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3)
            ]))
        );
    }

    #[test]
    fn nested_message_block() {
        let schema = schema(
            "message D { Inner inner = 1; }\nmessage Inner { string city = 1; }",
        );
        let Value::Message(msg) =
            parse("inner {\n  city: \"NYC\"\n}\n", "D", &schema).unwrap()
        else {
            panic!()
        };
        let Some(Value::Message(inner)) = msg.get("inner") else { panic!() };
        assert_eq!(inner.get("city"), Some(&Value::String("NYC".into())));
    }

    #[test]
    fn enum_by_symbol() {
        let schema = schema("enum S { S_A = 0; S_B = 1; }\nmessage D { S status = 1; }");
        let Value::Message(msg) = parse("status: S_B\n", "D", &schema).unwrap() else {
            panic!()
        };
        match msg.get("status") {
            Some(Value::Enum(e)) => {
                assert_eq!(e.symbol, "S_B");
                assert_eq!(e.number, 1);
            }
            other => panic!("expected enum, got {other:?}"),
        }
    }

    #[test]
    fn comments_and_single_quotes() {
        let schema = schema("message D { string name = 1; }");
        let Value::Message(msg) =
            parse("# mock data\nname: 'quoted'\n", "D", &schema).unwrap()
        else {
            panic!()
        };
        assert_eq!(msg.get("name"), Some(&Value::String("quoted".into())));
    }

    #[test]
    fn unknown_field_errors_with_line() {
        let schema = schema("message D { string name = 1; }");
        let err = parse("\nbogus: 1\n", "D", &schema).unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn skeleton_covers_all_fields() {
        let schema = schema(
            "enum S { S_A = 0; }\nmessage D { string name = 1; int32 n = 2; bool b = 3; S s = 4; repeated string tags = 5; }",
        );
        let text = skeleton("D", &schema).unwrap();
        assert!(text.contains("name: \"\""));
        assert!(text.contains("n: 0"));
        assert!(text.contains("b: false"));
        assert!(text.contains("s: S_A"));
        assert!(text.contains("# repeated"));
    }

    #[test]
    fn skeleton_expands_nested_and_cuts_recursion() {
        let schema = schema(
            "message Node { string label = 1; Node next = 2; }",
        );
        let text = skeleton("Node", &schema).unwrap();
        assert!(text.contains("next {"));
        assert!(text.contains("# recursive: Node"));
    }

    #[test]
    fn skeleton_roundtrips_through_parse() {
        let schema = schema(
            "message D { string name = 1; int32 n = 2; repeated string tags = 3; }",
        );
        let text = skeleton("D", &schema).unwrap();
        let value = parse(&text, "D", &schema).unwrap();
        let Value::Message(msg) = value else { panic!() };
        assert_eq!(msg.get("name"), Some(&Value::String(String::new())));
    }
}
