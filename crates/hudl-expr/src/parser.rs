//! Precedence-climbing parser for the expression grammar.

use crate::ast::{BinOp, Expr, Literal, UnaryOp};
use crate::error::ExprError;
use crate::lexer::{lex, Tok, Token};

/// Parse one expression; the whole input must be consumed.
pub fn parse_expression(input: &str) -> Result<Expr, ExprError> {
    let tokens = lex(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.len(),
    };
    let expr = parser.ternary()?;
    if let Some(t) = parser.peek() {
        return Err(ExprError::parse(
            t.offset,
            "unexpected trailing content in expression",
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn here(&self) -> usize {
        self.peek().map(|t| t.offset).unwrap_or(self.input_len)
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek().map(|t| &t.tok) == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: Tok, what: &str) -> Result<(), ExprError> {
        if self.eat(&tok) {
            Ok(())
        } else {
            Err(ExprError::parse(self.here(), format!("expected {what}")))
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.binary(0)?;
        if self.eat(&Tok::Question) {
            let then = self.ternary()?;
            self.expect(Tok::Colon, "':' in ternary")?;
            let otherwise = self.ternary()?;
            return Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        loop {
            let Some(op) = self.peek().and_then(|t| bin_op(&t.tok)) else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let right = self.binary(prec + 1)?;
            left = Expr::Binary(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(&Tok::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(&Tok::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Tok::Dot) {
                let name = match self.bump() {
                    Some(Token {
                        tok: Tok::Ident(name),
                        ..
                    }) => name,
                    other => {
                        let offset = other.map(|t| t.offset).unwrap_or(self.input_len);
                        return Err(ExprError::parse(offset, "expected field name after '.'"));
                    }
                };
                if self.eat(&Tok::LParen) {
                    let args = self.arguments()?;
                    expr = Expr::Method(Box::new(expr), name, args);
                } else {
                    expr = Expr::Field(Box::new(expr), name);
                }
            } else if self.eat(&Tok::LBracket) {
                let index = self.ternary()?;
                self.expect(Tok::RBracket, "']'")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        let Some(token) = self.bump() else {
            return Err(ExprError::parse(self.input_len, "unexpected end of expression"));
        };
        match token.tok {
            Tok::Int(n) => Ok(Expr::Literal(Literal::Int(n))),
            Tok::Float(f) => Ok(Expr::Literal(Literal::Float(f))),
            Tok::Str(s) => Ok(Expr::Literal(Literal::String(s))),
            Tok::True => Ok(Expr::Literal(Literal::Bool(true))),
            Tok::False => Ok(Expr::Literal(Literal::Bool(false))),
            Tok::Null => Ok(Expr::Literal(Literal::Null)),
            Tok::LParen => {
                let inner = self.ternary()?;
                self.expect(Tok::RParen, "')'")?;
                Ok(inner)
            }
            Tok::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Tok::RBracket) {
                    loop {
                        items.push(self.ternary()?);
                        if self.eat(&Tok::Comma) {
                            continue;
                        }
                        self.expect(Tok::RBracket, "']'")?;
                        break;
                    }
                }
                Ok(Expr::Call("list".into(), items))
            }
            Tok::Ident(name) => {
                if self.eat(&Tok::LParen) {
                    let args = self.arguments()?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(ExprError::parse(
                token.offset,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&Tok::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.ternary()?);
            if self.eat(&Tok::Comma) {
                continue;
            }
            self.expect(Tok::RParen, "')'")?;
            break;
        }
        Ok(args)
    }
}

fn bin_op(tok: &Tok) -> Option<BinOp> {
    Some(match tok {
        Tok::EqEq => BinOp::Eq,
        Tok::NotEq => BinOp::Ne,
        Tok::Lt => BinOp::Lt,
        Tok::Le => BinOp::Le,
        Tok::Gt => BinOp::Gt,
        Tok::Ge => BinOp::Ge,
        Tok::In => BinOp::In,
        Tok::Plus => BinOp::Add,
        Tok::Minus => BinOp::Sub,
        Tok::Star => BinOp::Mul,
        Tok::Slash => BinOp::Div,
        Tok::Percent => BinOp::Rem,
        Tok::AndAnd => BinOp::And,
        Tok::OrOr => BinOp::Or,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        parse_expression(input).unwrap()
    }

    #[test]
    fn precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let expr = parse("1 + 2 * 3");
        match expr {
            Expr::Binary(_, BinOp::Add, right) => {
                assert!(matches!(*right, Expr::Binary(_, BinOp::Mul, _)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        let expr = parse("a + 1 > b");
        assert!(matches!(expr, Expr::Binary(_, BinOp::Gt, _)));
    }

    #[test]
    fn logic_binds_loosest() {
        let expr = parse("a > 1 && b < 2 || c");
        assert!(matches!(expr, Expr::Binary(_, BinOp::Or, _)));
    }

    #[test]
    fn field_chains() {
        assert_eq!(
            parse("user.profile.name"),
            Expr::Field(
                Box::new(Expr::Field(
                    Box::new(Expr::Ident("user".into())),
                    "profile".into()
                )),
                "name".into()
            )
        );
    }

    #[test]
    fn index_access() {
        let expr = parse("m[\"k\"]");
        assert!(matches!(expr, Expr::Index(_, _)));
    }

    #[test]
    fn calls_and_methods() {
        assert_eq!(
            parse("size(items)"),
            Expr::Call("size".into(), vec![Expr::Ident("items".into())])
        );
        let expr = parse("name.matches('^a')");
        assert!(matches!(expr, Expr::Method(_, ref m, _) if m == "matches"));
    }

    #[test]
    fn ternary_nests_right() {
        let expr = parse("a ? 1 : b ? 2 : 3");
        match expr {
            Expr::Ternary(_, _, otherwise) => {
                assert!(matches!(*otherwise, Expr::Ternary(_, _, _)));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unary_operators() {
        assert_eq!(
            parse("!done"),
            Expr::Unary(UnaryOp::Not, Box::new(Expr::Ident("done".into())))
        );
        assert_eq!(
            parse("-x"),
            Expr::Unary(UnaryOp::Neg, Box::new(Expr::Ident("x".into())))
        );
    }

    #[test]
    fn list_literal() {
        let expr = parse("[1, 2]");
        assert!(matches!(expr, Expr::Call(ref name, ref args) if name == "list" && args.len() == 2));
    }

    #[test]
    fn raw_call_detected() {
        assert!(parse("raw(html)").is_raw_call());
        assert!(!parse("size(html)").is_raw_call());
    }

    #[test]
    fn in_operator() {
        let expr = parse("'a' in tags");
        assert!(matches!(expr, Expr::Binary(_, BinOp::In, _)));
    }

    #[test]
    fn trailing_garbage_rejected() {
        assert!(parse_expression("a b").is_err());
    }

    #[test]
    fn empty_input_rejected() {
        assert!(parse_expression("").is_err());
    }
}
