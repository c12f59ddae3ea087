//! Tokenizer for the node grammar.
//!
//! Words are deliberately permissive: the selector sugar (`div#root.card`),
//! tilde attributes (`~on:click~once`), signal references (`$count`) and
//! import paths (`./layout`) all lex as a single [`TokenKind::Word`]. The
//! structural characters (whitespace, `{`, `}`, `;`, `=`, `"`) end a word.

use crate::error::SyntaxError;
use crate::raw::{Comment, CommentKind};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Bare word: node names, bare values, property keys.
    Word(String),
    /// `"..."` with escapes applied, or `#"..."#` verbatim.
    Str { value: String, raw: bool },
    LBrace,
    RBrace,
    Equals,
    /// Node terminator: newline or `;`.
    Terminator,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Output of the lexer: tokens plus every comment encountered, with spans.
pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

pub fn lex(input: &str) -> Result<LexOutput, SyntaxError> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    chars: Vec<char>,
    /// Byte offset of each char, plus one trailing entry for EOF.
    offsets: Vec<usize>,
    pos: usize,
    input: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        let mut chars = Vec::new();
        let mut offsets = Vec::new();
        for (off, ch) in input.char_indices() {
            chars.push(ch);
            offsets.push(off);
        }
        offsets.push(input.len());
        Self {
            chars,
            offsets,
            pos: 0,
            input,
        }
    }

    fn offset(&self) -> usize {
        self.offsets[self.pos]
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn run(mut self) -> Result<LexOutput, SyntaxError> {
        let mut tokens = Vec::new();
        let mut comments = Vec::new();

        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    let start = self.offset();
                    self.bump();
                    push_terminator(&mut tokens, Span::new(start, self.offset()));
                }
                ';' => {
                    let start = self.offset();
                    self.bump();
                    push_terminator(&mut tokens, Span::new(start, self.offset()));
                }
                '{' => {
                    let start = self.offset();
                    self.bump();
                    tokens.push(Token {
                        kind: TokenKind::LBrace,
                        span: Span::new(start, self.offset()),
                    });
                }
                '}' => {
                    let start = self.offset();
                    self.bump();
                    tokens.push(Token {
                        kind: TokenKind::RBrace,
                        span: Span::new(start, self.offset()),
                    });
                }
                '=' => {
                    let start = self.offset();
                    self.bump();
                    tokens.push(Token {
                        kind: TokenKind::Equals,
                        span: Span::new(start, self.offset()),
                    });
                }
                '"' => tokens.push(self.lex_string()?),
                '/' if self.peek2() == Some('/') => {
                    comments.push(self.lex_line_comment());
                }
                '/' if self.peek2() == Some('*') => {
                    comments.push(self.lex_block_comment()?);
                }
                '#' if self.hash_opens_raw() => tokens.push(self.lex_raw_string()?),
                _ => tokens.push(self.lex_word()),
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::point(self.input.len()),
        });

        Ok(LexOutput { tokens, comments })
    }

    fn lex_string(&mut self) -> Result<Token, SyntaxError> {
        let start = self.offset();
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('"') => {
                    return Ok(Token {
                        kind: TokenKind::Str { value, raw: false },
                        span: Span::new(start, self.offset()),
                    });
                }
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('"') => value.push('"'),
                    Some('\\') => value.push('\\'),
                    Some('/') => value.push('/'),
                    Some(other) => {
                        return Err(SyntaxError::new(
                            Span::new(start, self.offset()),
                            format!("unknown escape sequence '\\{other}'"),
                        ));
                    }
                    None => {
                        return Err(SyntaxError::new(
                            Span::new(start, self.offset()),
                            "unterminated string",
                        ));
                    }
                },
                Some(c) => value.push(c),
                None => {
                    return Err(SyntaxError::new(
                        Span::new(start, self.offset()),
                        "unterminated string",
                    ));
                }
            }
        }
    }

    fn hash_opens_raw(&self) -> bool {
        let mut i = self.pos;
        while self.chars.get(i) == Some(&'#') {
            i += 1;
        }
        i > self.pos && self.chars.get(i) == Some(&'"')
    }

    fn lex_raw_string(&mut self) -> Result<Token, SyntaxError> {
        let start = self.offset();
        let mut hashes = 0;
        while self.peek() == Some('#') {
            self.bump();
            hashes += 1;
        }
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                Some('"') if self.raw_closes(hashes) => {
                    self.bump();
                    for _ in 0..hashes {
                        self.bump();
                    }
                    return Ok(Token {
                        kind: TokenKind::Str { value, raw: true },
                        span: Span::new(start, self.offset()),
                    });
                }
                Some(c) => {
                    value.push(c);
                    self.bump();
                }
                None => {
                    return Err(SyntaxError::new(
                        Span::new(start, self.offset()),
                        "unterminated raw string",
                    ));
                }
            }
        }
    }

    fn raw_closes(&self, hashes: usize) -> bool {
        (1..=hashes).all(|k| self.chars.get(self.pos + k) == Some(&'#'))
    }

    fn lex_line_comment(&mut self) -> Comment {
        let start = self.offset();
        self.bump();
        self.bump();
        let text_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
        let text: String = self.chars[text_start..self.pos].iter().collect();
        Comment {
            kind: CommentKind::Line,
            text: text.trim().to_string(),
            span: Span::new(start, self.offset()),
        }
    }

    fn lex_block_comment(&mut self) -> Result<Comment, SyntaxError> {
        let start = self.offset();
        self.bump(); // '/'
        self.bump(); // '*'
        // A third '*' (but not '/**/'-style emptiness) marks a schema block.
        let schema = self.peek() == Some('*') && self.peek2() != Some('/');
        if schema {
            self.bump();
        }
        let text_start = self.pos;
        loop {
            match self.peek() {
                Some('*') if self.peek2() == Some('/') => {
                    let text: String = self.chars[text_start..self.pos].iter().collect();
                    self.bump();
                    self.bump();
                    return Ok(Comment {
                        kind: if schema {
                            CommentKind::Schema
                        } else {
                            CommentKind::Block
                        },
                        text: text.trim().to_string(),
                        span: Span::new(start, self.offset()),
                    });
                }
                Some(_) => {
                    self.bump();
                }
                None => {
                    return Err(SyntaxError::new(
                        Span::new(start, self.offset()),
                        "unterminated block comment",
                    ));
                }
            }
        }
    }

    fn lex_word(&mut self) -> Token {
        let start = self.offset();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '=' | '"') {
                break;
            }
            // A comment can begin mid-stream right after a word.
            if c == '/' && matches!(self.peek2(), Some('/') | Some('*')) {
                break;
            }
            self.bump();
        }
        let end = self.offset();
        Token {
            kind: TokenKind::Word(self.input[start..end].to_string()),
            span: Span::new(start, end),
        }
    }
}

/// Collapse runs of terminators so the parser only ever sees one.
fn push_terminator(tokens: &mut Vec<Token>, span: Span) {
    if !matches!(
        tokens.last().map(|t| &t.kind),
        Some(TokenKind::Terminator) | None
    ) {
        tokens.push(Token {
            kind: TokenKind::Terminator,
            span,
        });
    }
}
