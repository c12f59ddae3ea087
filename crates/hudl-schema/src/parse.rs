//! Parser for the embedded proto3 subset.
//!
//! Supported grammar:
//!
//! ```text
//! file    = (syntax | import | message | enum)*
//! syntax  = "syntax" "=" string ";"
//! import  = "import" string ";"
//! message = "message" Ident "{" field* "}"
//! field   = ["repeated"] type Ident "=" int ";"
//!         | "map" "<" type "," type ">" Ident "=" int ";"
//! enum    = "enum" Ident "{" (Ident "=" int ";")* "}"
//! ```
//!
//! Imports resolve relative to the document's directory: the referenced
//! `.hudl` file is read, its schema blocks parsed, and the definitions
//! merged. Resolution is memoized per canonical path, which also makes
//! import cycles terminate.

use crate::error::SchemaError;
use crate::model::{EnumDef, Field, FieldType, Message, Schema};
use hudl_syntax::Span;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Parse every schema block of a document and resolve its imports against
/// `base_dir` (the directory holding the document, when known).
pub fn compile_schema(
    blocks: &[(String, Span)],
    base_dir: Option<&Path>,
) -> Result<Schema, SchemaError> {
    let mut visited = HashSet::new();
    compile_inner(blocks, base_dir, &mut visited)
}

fn compile_inner(
    blocks: &[(String, Span)],
    base_dir: Option<&Path>,
    visited: &mut HashSet<PathBuf>,
) -> Result<Schema, SchemaError> {
    let mut schema = Schema::default();
    for (text, span) in blocks {
        let parsed = parse_block(text, *span)?;
        for import in &parsed.imports {
            if let Some(dir) = base_dir {
                let imported = resolve_import(dir, import, *span, visited)?;
                schema.absorb(imported);
            }
        }
        schema.imports.extend(parsed.imports.clone());
        schema.absorb(parsed);
    }
    Ok(schema)
}

fn resolve_import(
    dir: &Path,
    import: &str,
    span: Span,
    visited: &mut HashSet<PathBuf>,
) -> Result<Schema, SchemaError> {
    let mut path = dir.join(import);
    if path.extension().is_none() {
        path.set_extension("hudl");
    }
    let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
    if !visited.insert(canonical) {
        // Already being resolved (cycle) or done; either way nothing new.
        return Ok(Schema::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|e| {
        SchemaError::new(span, format!("cannot read import '{}': {e}", path.display()))
    })?;
    let doc = hudl_syntax::parse(&content)
        .map_err(|e| SchemaError::new(span, format!("import '{import}': {}", e.message)))?;
    let blocks: Vec<(String, Span)> = doc
        .schema_blocks()
        .map(|c| (c.text.clone(), c.span))
        .collect();
    compile_inner(&blocks, path.parent(), visited)
}

/// Parse a single `/** ... */` payload.
pub fn parse_block(text: &str, block_span: Span) -> Result<Schema, SchemaError> {
    let tokens = tokenize(text, block_span)?;
    Parser { tokens, pos: 0 }.parse_file()
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Str(String),
    Int(i64),
    Punct(char),
}

#[derive(Debug, Clone)]
struct Spanned {
    tok: Tok,
    span: Span,
}

fn tokenize(text: &str, base: Span) -> Result<Vec<Spanned>, SchemaError> {
    let mut out = Vec::new();
    let bytes: Vec<char> = text.chars().collect();
    let mut i = 0;

    let span_at = |start: usize, end: usize| Span::new(base.start + start, base.start + end);

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '/' if bytes.get(i + 1) == Some(&'/') => {
                while i < bytes.len() && bytes[i] != '\n' {
                    i += 1;
                }
            }
            '{' | '}' | '=' | ';' | '<' | '>' | ',' => {
                out.push(Spanned {
                    tok: Tok::Punct(c),
                    span: span_at(i, i + 1),
                });
                i += 1;
            }
            '"' => {
                let start = i;
                i += 1;
                let mut s = String::new();
                while i < bytes.len() && bytes[i] != '"' {
                    s.push(bytes[i]);
                    i += 1;
                }
                if i >= bytes.len() {
                    return Err(SchemaError::new(
                        span_at(start, i),
                        "unterminated string in schema block",
                    ));
                }
                i += 1;
                out.push(Spanned {
                    tok: Tok::Str(s),
                    span: span_at(start, i),
                });
            }
            '-' | '0'..='9' => {
                let start = i;
                if c == '-' {
                    i += 1;
                }
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = bytes[start..i].iter().collect();
                let value = text.parse::<i64>().map_err(|_| {
                    SchemaError::new(span_at(start, i), format!("invalid number '{text}'"))
                })?;
                out.push(Spanned {
                    tok: Tok::Int(value),
                    span: span_at(start, i),
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == '_' || bytes[i] == '.')
                {
                    i += 1;
                }
                out.push(Spanned {
                    tok: Tok::Ident(bytes[start..i].iter().collect()),
                    span: span_at(start, i),
                });
            }
            other => {
                return Err(SchemaError::new(
                    span_at(i, i + 1),
                    format!("unexpected character '{other}' in schema block"),
                ));
            }
        }
    }
    Ok(out)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
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

    fn here(&self) -> Span {
        self.peek()
            .map(|t| t.span)
            .or_else(|| self.tokens.last().map(|t| t.span))
            .unwrap_or_default()
    }

    fn expect_punct(&mut self, p: char) -> Result<(), SchemaError> {
        match self.bump() {
            Some(Spanned {
                tok: Tok::Punct(c), ..
            }) if c == p => Ok(()),
            Some(t) => Err(SchemaError::new(t.span, format!("expected '{p}'"))),
            None => Err(SchemaError::new(self.here(), format!("expected '{p}'"))),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), SchemaError> {
        match self.bump() {
            Some(Spanned {
                tok: Tok::Ident(name),
                span,
            }) => Ok((name, span)),
            Some(t) => Err(SchemaError::new(t.span, "expected identifier")),
            None => Err(SchemaError::new(self.here(), "expected identifier")),
        }
    }

    fn expect_int(&mut self) -> Result<i64, SchemaError> {
        match self.bump() {
            Some(Spanned {
                tok: Tok::Int(n), ..
            }) => Ok(n),
            Some(t) => Err(SchemaError::new(t.span, "expected number")),
            None => Err(SchemaError::new(self.here(), "expected number")),
        }
    }

    fn parse_file(&mut self) -> Result<Schema, SchemaError> {
        let mut schema = Schema::default();
        while let Some(t) = self.peek().cloned() {
            match &t.tok {
                Tok::Ident(kw) if kw == "syntax" => {
                    self.bump();
                    self.expect_punct('=')?;
                    match self.bump() {
                        Some(Spanned { tok: Tok::Str(v), span }) => {
                            if v != "proto3" {
                                return Err(SchemaError::new(
                                    span,
                                    format!("unsupported syntax '{v}', only proto3 is supported"),
                                ));
                            }
                        }
                        other => {
                            let span = other.map(|t| t.span).unwrap_or(self.here());
                            return Err(SchemaError::new(span, "expected syntax string"));
                        }
                    }
                    self.expect_punct(';')?;
                }
                Tok::Ident(kw) if kw == "import" => {
                    self.bump();
                    match self.bump() {
                        Some(Spanned { tok: Tok::Str(p), .. }) => schema.imports.push(p),
                        other => {
                            let span = other.map(|t| t.span).unwrap_or(self.here());
                            return Err(SchemaError::new(span, "expected import path string"));
                        }
                    }
                    self.expect_punct(';')?;
                }
                Tok::Ident(kw) if kw == "message" => {
                    let message = self.parse_message()?;
                    schema.messages.insert(message.name.clone(), message);
                }
                Tok::Ident(kw) if kw == "enum" => {
                    let en = self.parse_enum()?;
                    schema.enums.insert(en.name.clone(), en);
                }
                _ => {
                    return Err(SchemaError::new(
                        t.span,
                        "expected 'message', 'enum', 'import', or 'syntax'",
                    ));
                }
            }
        }
        Ok(schema)
    }

    fn parse_message(&mut self) -> Result<Message, SchemaError> {
        self.bump(); // 'message'
        let (name, name_span) = self.expect_ident()?;
        self.expect_punct('{')?;

        let mut fields = Vec::new();
        loop {
            match self.peek().map(|t| t.tok.clone()) {
                Some(Tok::Punct('}')) => {
                    self.bump();
                    break;
                }
                Some(Tok::Ident(kw)) if kw == "message" || kw == "enum" => {
                    return Err(SchemaError::new(
                        self.here(),
                        "nested definitions are not supported; declare them at top level",
                    ));
                }
                Some(_) => fields.push(self.parse_field()?),
                None => {
                    return Err(SchemaError::new(
                        name_span,
                        format!("unterminated message '{name}'"),
                    ));
                }
            }
        }

        Ok(Message { name, fields })
    }

    fn parse_field(&mut self) -> Result<Field, SchemaError> {
        let mut repeated = false;
        if let Some(Spanned {
            tok: Tok::Ident(kw),
            ..
        }) = self.peek()
        {
            if kw == "repeated" {
                repeated = true;
                self.bump();
            } else if kw == "optional" {
                // proto3 explicit presence; tracked like any singular field.
                self.bump();
            }
        }

        let (type_name, type_span) = self.expect_ident()?;

        let ty = if type_name == "map" {
            if repeated {
                return Err(SchemaError::new(type_span, "map fields cannot be repeated"));
            }
            self.expect_punct('<')?;
            let (key_name, key_span) = self.expect_ident()?;
            let key = FieldType::from_name(&key_name);
            if !key.is_scalar() {
                return Err(SchemaError::new(key_span, "map keys must be scalar types"));
            }
            self.expect_punct(',')?;
            let (value_name, _) = self.expect_ident()?;
            self.expect_punct('>')?;
            FieldType::Map(Box::new(key), Box::new(FieldType::from_name(&value_name)))
        } else {
            FieldType::from_name(&type_name)
        };

        let (field_name, _) = self.expect_ident()?;
        self.expect_punct('=')?;
        let number = self.expect_int()?;
        if number <= 0 {
            return Err(SchemaError::new(
                type_span,
                format!("field '{field_name}' has invalid tag {number}"),
            ));
        }
        self.expect_punct(';')?;

        Ok(Field {
            name: field_name,
            number: number as u32,
            ty,
            repeated,
        })
    }

    fn parse_enum(&mut self) -> Result<EnumDef, SchemaError> {
        self.bump(); // 'enum'
        let (name, name_span) = self.expect_ident()?;
        self.expect_punct('{')?;

        let mut values = Vec::new();
        loop {
            match self.peek().map(|t| t.tok.clone()) {
                Some(Tok::Punct('}')) => {
                    self.bump();
                    break;
                }
                Some(Tok::Ident(_)) => {
                    let (entry_name, _) = self.expect_ident()?;
                    self.expect_punct('=')?;
                    let number = self.expect_int()?;
                    self.expect_punct(';')?;
                    values.push((entry_name, number as i32));
                }
                _ => {
                    return Err(SchemaError::new(
                        name_span,
                        format!("unterminated enum '{name}'"),
                    ));
                }
            }
        }

        Ok(EnumDef { name, values })
    }
}
