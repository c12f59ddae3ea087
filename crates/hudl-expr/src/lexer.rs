//! Expression tokenizer.

use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    In,
    // punctuation
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Question,
    Colon,
    // operators
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    AndAnd,
    OrOr,
    Bang,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub offset: usize,
}

pub fn lex(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let offset = i;
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
                continue;
            }
            '.' => {
                out.push(Token { tok: Tok::Dot, offset });
                i += 1;
            }
            ',' => {
                out.push(Token { tok: Tok::Comma, offset });
                i += 1;
            }
            '(' => {
                out.push(Token { tok: Tok::LParen, offset });
                i += 1;
            }
            ')' => {
                out.push(Token { tok: Tok::RParen, offset });
                i += 1;
            }
            '[' => {
                out.push(Token { tok: Tok::LBracket, offset });
                i += 1;
            }
            ']' => {
                out.push(Token { tok: Tok::RBracket, offset });
                i += 1;
            }
            '?' => {
                out.push(Token { tok: Tok::Question, offset });
                i += 1;
            }
            ':' => {
                out.push(Token { tok: Tok::Colon, offset });
                i += 1;
            }
            '+' => {
                out.push(Token { tok: Tok::Plus, offset });
                i += 1;
            }
            '-' => {
                out.push(Token { tok: Tok::Minus, offset });
                i += 1;
            }
            '*' => {
                out.push(Token { tok: Tok::Star, offset });
                i += 1;
            }
            '/' => {
                out.push(Token { tok: Tok::Slash, offset });
                i += 1;
            }
            '%' => {
                out.push(Token { tok: Tok::Percent, offset });
                i += 1;
            }
            '=' if chars.get(i + 1) == Some(&'=') => {
                out.push(Token { tok: Tok::EqEq, offset });
                i += 2;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                out.push(Token { tok: Tok::NotEq, offset });
                i += 2;
            }
            '!' => {
                out.push(Token { tok: Tok::Bang, offset });
                i += 1;
            }
            '<' if chars.get(i + 1) == Some(&'=') => {
                out.push(Token { tok: Tok::Le, offset });
                i += 2;
            }
            '<' => {
                out.push(Token { tok: Tok::Lt, offset });
                i += 1;
            }
            '>' if chars.get(i + 1) == Some(&'=') => {
                out.push(Token { tok: Tok::Ge, offset });
                i += 2;
            }
            '>' => {
                out.push(Token { tok: Tok::Gt, offset });
                i += 1;
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                out.push(Token { tok: Tok::AndAnd, offset });
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                out.push(Token { tok: Tok::OrOr, offset });
                i += 2;
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
                                Some(&ch) => s.push(ch),
                                None => {
                                    return Err(ExprError::parse(offset, "unterminated string"));
                                }
                            }
                            i += 1;
                        }
                        Some(&ch) => {
                            s.push(ch);
                            i += 1;
                        }
                        None => return Err(ExprError::parse(offset, "unterminated string")),
                    }
                }
                out.push(Token { tok: Tok::Str(s), offset });
            }
            '0'..='9' => {
                let start = i;
                let mut is_float = false;
                while let Some(&ch) = chars.get(i) {
                    match ch {
                        '0'..='9' => i += 1,
                        // A dot is part of the number only when a digit
                        // follows; `items[0].size()` must not lex `0.` here.
                        '.' if chars
                            .get(i + 1)
                            .is_some_and(|c| c.is_ascii_digit()) =>
                        {
                            is_float = true;
                            i += 1;
                        }
                        'e' | 'E' if is_float => {
                            i += 1;
                            if matches!(chars.get(i), Some('+') | Some('-')) {
                                i += 1;
                            }
                        }
                        _ => break,
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let tok = if is_float {
                    Tok::Float(text.parse().map_err(|_| {
                        ExprError::parse(start, format!("invalid number '{text}'"))
                    })?)
                } else {
                    Tok::Int(text.parse().map_err(|_| {
                        ExprError::parse(start, format!("invalid number '{text}'"))
                    })?)
                };
                out.push(Token { tok, offset: start });
            }
            c if c.is_alphabetic() || c == '_' || c == '$' || c == '@' => {
                let start = i;
                while let Some(&ch) = chars.get(i) {
                    if ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '@' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let word: String = chars[start..i].iter().collect();
                let tok = match word.as_str() {
                    "true" => Tok::True,
                    "false" => Tok::False,
                    "null" => Tok::Null,
                    "in" => Tok::In,
                    _ => Tok::Ident(word),
                };
                out.push(Token { tok, offset: start });
            }
            other => {
                return Err(ExprError::parse(
                    offset,
                    format!("unexpected character '{other}'"),
                ));
            }
        }
    }

    Ok(out)
}
