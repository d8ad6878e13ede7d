//! Recursive-descent parser for the routing condition language.
//!
//! Grammar, highest precedence last:
//!
//! ```text
//! expr     := or
//! or       := and ( 'or' and )*
//! and      := not ( 'and' not )*
//! not      := 'not' not | cmp
//! cmp      := primary ( ('=='|'!='|'<'|'<='|'>'|'>=') primary
//!                     | 'is' ['not'] 'None' )?
//! primary  := literal | path | '(' expr ')' | 'len' '(' path ')'
//! path     := root ( '.' ident | '[' key ']' )*
//! ```

use serde_json::Value;

use super::lexer::{Spanned, Token};
use crate::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ast {
    Or(Vec<Ast>),
    And(Vec<Ast>),
    Not(Box<Ast>),
    Compare {
        lhs: Box<Ast>,
        op: CmpOp,
        rhs: Box<Ast>,
    },
    IsNone {
        operand: Box<Ast>,
        negated: bool,
    },
    Literal(Value),
    Path(Path),
    Len(Path),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// State root a path is allowed to start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Root {
    Context,
    Artifacts,
    Quality,
}

impl Root {
    fn from_ident(name: &str) -> Option<Self> {
        match name {
            "context" => Some(Root::Context),
            "artifacts" => Some(Root::Artifacts),
            "quality" => Some(Root::Quality),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Field(String),
    Index(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Path {
    pub root: Root,
    pub segments: Vec<Segment>,
}

pub(crate) fn parse(tokens: &[Spanned], source_len: usize) -> Result<Ast, ExprError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: source_len,
    };
    let ast = parser.parse_or()?;
    if let Some(trailing) = parser.peek() {
        return Err(ExprError::syntax(
            trailing.offset,
            format!("unexpected token {:?}", trailing.token),
        ));
    }
    Ok(ast)
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    end: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Spanned> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn offset(&self) -> usize {
        self.peek().map(|s| s.offset).unwrap_or(self.end)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek().map(|s| &s.token) == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ExprError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(ExprError::syntax(self.offset(), format!("expected {what}")))
        }
    }

    fn parse_or(&mut self) -> Result<Ast, ExprError> {
        let first = self.parse_and()?;
        if !self.eat(&Token::Or) {
            return Ok(first);
        }
        let mut operands = vec![first, self.parse_and()?];
        while self.eat(&Token::Or) {
            operands.push(self.parse_and()?);
        }
        Ok(Ast::Or(operands))
    }

    fn parse_and(&mut self) -> Result<Ast, ExprError> {
        let first = self.parse_not()?;
        if !self.eat(&Token::And) {
            return Ok(first);
        }
        let mut operands = vec![first, self.parse_not()?];
        while self.eat(&Token::And) {
            operands.push(self.parse_not()?);
        }
        Ok(Ast::And(operands))
    }

    fn parse_not(&mut self) -> Result<Ast, ExprError> {
        if self.eat(&Token::Not) {
            Ok(Ast::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_cmp()
        }
    }

    fn parse_cmp(&mut self) -> Result<Ast, ExprError> {
        let lhs = self.parse_primary()?;

        let op = match self.peek().map(|s| &s.token) {
            Some(Token::Eq) => Some(CmpOp::Eq),
            Some(Token::Ne) => Some(CmpOp::Ne),
            Some(Token::Lt) => Some(CmpOp::Lt),
            Some(Token::Le) => Some(CmpOp::Le),
            Some(Token::Gt) => Some(CmpOp::Gt),
            Some(Token::Ge) => Some(CmpOp::Ge),
            _ => None,
        };

        if let Some(op) = op {
            self.advance();
            let rhs = self.parse_primary()?;
            return Ok(Ast::Compare {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            });
        }

        if self.eat(&Token::Is) {
            let negated = self.eat(&Token::Not);
            self.expect(Token::None, "'None' after 'is'")?;
            return Ok(Ast::IsNone {
                operand: Box::new(lhs),
                negated,
            });
        }

        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Ast, ExprError> {
        let offset = self.offset();
        let spanned = self
            .advance()
            .ok_or_else(|| ExprError::syntax(offset, "unexpected end of expression"))?;

        match &spanned.token {
            Token::Int(n) => Ok(Ast::Literal(Value::from(*n))),
            Token::Float(f) => Ok(Ast::Literal(
                serde_json::Number::from_f64(*f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            )),
            Token::Str(s) => Ok(Ast::Literal(Value::String(s.clone()))),
            Token::True => Ok(Ast::Literal(Value::Bool(true))),
            Token::False => Ok(Ast::Literal(Value::Bool(false))),
            Token::None => Ok(Ast::Literal(Value::Null)),
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Len => {
                self.expect(Token::LParen, "'(' after len")?;
                let path = self.parse_path()?;
                self.expect(Token::RParen, "')' after len path")?;
                Ok(Ast::Len(path))
            }
            Token::Ident(name) => {
                let root = Root::from_ident(name)
                    .ok_or_else(|| ExprError::UnknownRoot(name.clone()))?;
                self.parse_path_segments(root)
            }
            other => Err(ExprError::syntax(
                spanned.offset,
                format!("unexpected token {other:?}"),
            )),
        }
    }

    fn parse_path(&mut self) -> Result<Path, ExprError> {
        let offset = self.offset();
        let spanned = self
            .advance()
            .ok_or_else(|| ExprError::syntax(offset, "expected a state path"))?;
        let name = match &spanned.token {
            Token::Ident(name) => name.clone(),
            other => {
                return Err(ExprError::syntax(
                    spanned.offset,
                    format!("expected a state path, found {other:?}"),
                ))
            }
        };
        let root = Root::from_ident(&name).ok_or(ExprError::UnknownRoot(name))?;
        match self.parse_path_segments(root)? {
            Ast::Path(path) => Ok(path),
            _ => unreachable!("parse_path_segments only builds paths"),
        }
    }

    fn parse_path_segments(&mut self, root: Root) -> Result<Ast, ExprError> {
        let mut segments = Vec::new();
        loop {
            if self.eat(&Token::Dot) {
                let offset = self.offset();
                match self.advance() {
                    Some(Spanned {
                        token: Token::Ident(name),
                        ..
                    }) => segments.push(Segment::Field(name.clone())),
                    _ => {
                        return Err(ExprError::syntax(offset, "expected identifier after '.'"))
                    }
                }
            } else if self.eat(&Token::LBracket) {
                let offset = self.offset();
                let segment = match self.advance() {
                    Some(Spanned {
                        token: Token::Str(key),
                        ..
                    }) => Segment::Field(key.clone()),
                    Some(Spanned {
                        token: Token::Int(index),
                        ..
                    }) if *index >= 0 => Segment::Index(*index as usize),
                    _ => {
                        return Err(ExprError::syntax(
                            offset,
                            "expected a string key or index inside '[...]'",
                        ))
                    }
                };
                self.expect(Token::RBracket, "']'")?;
                segments.push(segment);
            } else {
                break;
            }
        }
        Ok(Ast::Path(Path { root, segments }))
    }
}
