//! Recursive-descent parser producing the rule AST.
//!
//! Precedence, lowest first:
//! or, and, not, comparison (chainable), + -, * / // %, unary - +, ** (right assoc).

use crate::expr::ExprError;
use crate::expr::Value;
use crate::expr::lexer::{Spanned, Token};

/// Deepest AST the parser will build. Counts parentheses, prefix operators and
/// each extra operand of a left-associative chain.
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Value),
    Name(String),
    Unary(UnaryOp, Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    /// `a < b <= c` is kept as one chain so `b` is evaluated once.
    Compare(Box<Node>, Vec<(CmpOp, Node)>),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

impl Node {
    /// Collect referenced names in source order (duplicates kept out).
    pub fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Literal(_) => {}
            Node::Name(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
            Node::Unary(_, inner) | Node::Not(inner) => inner.collect_names(out),
            Node::Binary(_, l, r) | Node::And(l, r) | Node::Or(l, r) => {
                l.collect_names(out);
                r.collect_names(out);
            }
            Node::Compare(first, rest) => {
                first.collect_names(out);
                for (_, node) in rest {
                    node.collect_names(out);
                }
            }
        }
    }
}

pub struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, tokens: Vec<Spanned>) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    /// Parse the whole token stream as a single expression.
    pub fn parse(mut self) -> Result<Node, ExprError> {
        if self.tokens.is_empty() {
            return Err(self.error_at(0, "empty expression"));
        }
        let node = self.parse_or()?;
        if let Some(extra) = self.tokens.get(self.pos) {
            return Err(self.error_at(
                extra.offset,
                format!("unexpected {} after complete expression", extra.token.describe()),
            ));
        }
        Ok(node)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            expr: self.src.to_string(),
            offset,
            message: message.into(),
        }
    }

    fn descend(&mut self) -> Result<(), ExprError> {
        if self.depth == MAX_NESTING {
            let at = self.tokens.get(self.pos).map_or(self.src.len(), |s| s.offset);
            return Err(self.error_at(
                at,
                format!("expression nested deeper than {} levels", MAX_NESTING),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_and()?;
        let mut levels = 0;
        while self.eat(&Token::Or) {
            self.descend()?;
            levels += 1;
            let rhs = self.parse_and()?;
            node = Node::Or(Box::new(node), Box::new(rhs));
        }
        self.depth -= levels;
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_not()?;
        let mut levels = 0;
        while self.eat(&Token::And) {
            self.descend()?;
            levels += 1;
            let rhs = self.parse_not()?;
            node = Node::And(Box::new(node), Box::new(rhs));
        }
        self.depth -= levels;
        Ok(node)
    }

    fn parse_not(&mut self) -> Result<Node, ExprError> {
        if self.eat(&Token::Not) {
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Node::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Node, ExprError> {
        let first = self.parse_sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Le) => CmpOp::Le,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Ge) => CmpOp::Ge,
                Some(Token::EqEq) => CmpOp::Eq,
                Some(Token::NotEq) => CmpOp::Ne,
                _ => break,
            };
            self.pos += 1;
            rest.push((op, self.parse_sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Node::Compare(Box::new(first), rest))
        }
    }

    fn parse_sum(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_term()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let rhs = self.parse_term()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
        self.depth -= levels;
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Node, ExprError> {
        let mut node = self.parse_unary()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::DoubleSlash) => BinaryOp::FloorDiv,
                Some(Token::Percent) => BinaryOp::Mod,
                _ => break,
            };
            self.pos += 1;
            self.descend()?;
            levels += 1;
            let rhs = self.parse_unary()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
        self.depth -= levels;
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<Node, ExprError> {
        let op = if self.eat(&Token::Minus) {
            UnaryOp::Neg
        } else if self.eat(&Token::Plus) {
            UnaryOp::Pos
        } else {
            return self.parse_power();
        };
        self.descend()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Node::Unary(op, Box::new(operand)))
    }

    fn parse_power(&mut self) -> Result<Node, ExprError> {
        let base = self.parse_atom()?;
        if self.eat(&Token::DoubleStar) {
            // Exponent may carry its own sign: 2 ** -1 == 0.5, while -2 ** 2 == -4.
            self.descend()?;
            let exponent = self.parse_unary()?;
            self.depth -= 1;
            return Ok(Node::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_atom(&mut self) -> Result<Node, ExprError> {
        let Some(Spanned { token, offset }) = self.advance() else {
            return Err(self.error_at(self.src.len(), "unexpected end of expression"));
        };
        match token {
            Token::Number(n) => Ok(Node::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Node::Literal(Value::Str(s))),
            Token::True => Ok(Node::Literal(Value::Bool(true))),
            Token::False => Ok(Node::Literal(Value::Bool(false))),
            Token::None => Ok(Node::Literal(Value::Null)),
            Token::Ident(name) => Ok(Node::Name(name)),
            Token::LParen => {
                self.descend()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                if !self.eat(&Token::RParen) {
                    let at = self
                        .tokens
                        .get(self.pos)
                        .map(|s| s.offset)
                        .unwrap_or(self.src.len());
                    return Err(self.error_at(at, "expected ')'"));
                }
                Ok(inner)
            }
            other => Err(self.error_at(offset, format!("unexpected {}", other.describe()))),
        }
    }
}
