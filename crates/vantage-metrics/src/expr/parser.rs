//! Recursive-descent parser.
//!
//! Precedence, loosest first: `if/then/else`, `or`, `and`, `not`, comparisons,
//! `+ -`, `* / %`, unary `-`, `**`, postfix (`[..]`, `.field`), atoms.

use super::ParseError;
use super::ast::{BinaryOp, Expr, Function, Program, Statement, UnaryOp};
use super::lexer::{Keyword, Lexer, Token, TokenKind};
use vantage_data::Value;

/// Deepest nesting of parentheses, brackets, calls and prefix operators.
const MAX_DEPTH: usize = 128;

pub(crate) struct Parser<'f> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    functions: &'f [Function],
}

impl<'f> Parser<'f> {
    pub(crate) fn new(source: &str, functions: &'f [Function]) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: Lexer::new(source).tokenize()?,
            pos: 0,
            depth: 0,
            functions,
        })
    }

    /// Parse a single expression spanning the whole input.
    /// Line breaks are insignificant inside a single expression.
    pub(crate) fn parse_expression(mut self) -> Result<Expr, ParseError> {
        self.tokens.retain(|t| t.kind != TokenKind::Separator);
        let expr = self.expression()?;
        self.expect_eof()?;
        Ok(expr)
    }

    /// Parse a sequence of statements.
    pub(crate) fn parse_program(mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            if self.check(&TokenKind::Eof) {
                break;
            }
            statements.push(self.statement()?);
            if !self.check(&TokenKind::Eof) && !self.check(&TokenKind::Separator) {
                return Err(self.error_here("expected end of statement"));
            }
        }
        if statements.is_empty() {
            return Err(self.error_here("empty program"));
        }
        Ok(Program { statements })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        if self.eat_keyword(Keyword::Return) {
            return Ok(Statement::Return(self.expression()?));
        }
        if let TokenKind::Identifier(name) = &self.peek().kind
            && self.peek_at(1).kind == TokenKind::Assign
        {
            let name = name.clone();
            self.pos += 2;
            return Ok(Statement::Assign {
                name,
                expr: self.expression()?,
            });
        }
        Ok(Statement::Expr(self.expression()?))
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.nested(Self::conditional)
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword(Keyword::If) {
            let condition = self.expression()?;
            self.expect_keyword(Keyword::Then)?;
            let then_branch = self.expression()?;
            self.expect_keyword(Keyword::Else)?;
            let else_branch = self.expression()?;
            return Ok(Expr::Conditional {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }
        self.or()
    }

    fn or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.and()?;
        while self.eat_keyword(Keyword::Or) {
            let right = self.and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.not()?;
        while self.eat_keyword(Keyword::And) {
            let right = self.not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ParseError> {
        if self.eat_keyword(Keyword::Not) {
            let expr = self.nested(Self::not)?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.additive()?;
        let op = match self.peek().kind {
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::Ne,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.additive()?;
        Ok(binary(op, left, right))
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind {
            TokenKind::Minus => {
                self.pos += 1;
                let expr = self.nested(Self::unary)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            TokenKind::Plus => {
                self.pos += 1;
                self.nested(Self::unary)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.postfix()?;
        if self.check(&TokenKind::StarStar) {
            self.pos += 1;
            let exponent = self.nested(Self::unary)?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.atom()?;
        loop {
            match self.peek().kind {
                TokenKind::LBracket => {
                    self.pos += 1;
                    expr = self.subscript(expr)?;
                }
                TokenKind::Dot => {
                    self.pos += 1;
                    let TokenKind::Identifier(field) = self.peek().kind.clone() else {
                        return Err(self.error_here("expected field name after '.'"));
                    };
                    self.pos += 1;
                    expr = Expr::Member {
                        target: Box::new(expr),
                        field,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn subscript(&mut self, target: Expr) -> Result<Expr, ParseError> {
        let start = if self.check(&TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.expression()?))
        };

        if self.check(&TokenKind::Colon) {
            self.pos += 1;
            let end = if self.check(&TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.expression()?))
            };
            self.expect(&TokenKind::RBracket, "']'")?;
            return Ok(Expr::Slice {
                target: Box::new(target),
                start,
                end,
            });
        }

        self.expect(&TokenKind::RBracket, "']'")?;
        let index = start.ok_or_else(|| self.error_here("expected index"))?;
        Ok(Expr::Index {
            target: Box::new(target),
            index,
        })
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        let Token { kind, line, column } = self.peek().clone();
        let at = |message: String| ParseError {
            message,
            line,
            column,
        };
        self.pos += 1;
        match kind {
            TokenKind::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            TokenKind::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            TokenKind::Keyword(Keyword::True) => Ok(Expr::Literal(Value::Bool(true))),
            TokenKind::Keyword(Keyword::False) => Ok(Expr::Literal(Value::Bool(false))),
            TokenKind::Keyword(Keyword::Null) => Ok(Expr::Literal(Value::Null)),
            TokenKind::Identifier(name) if self.check(&TokenKind::LParen) => {
                let function = Function::lookup(&name, self.functions)
                    .ok_or_else(|| at(format!("function '{name}' is not allowed")))?;
                self.pos += 1;
                let args = self.arguments(&TokenKind::RParen, "')'")?;
                Ok(Expr::Call { function, args })
            }
            TokenKind::Identifier(name) => Ok(Expr::Ident(name)),
            TokenKind::LParen => {
                let expr = self.expression()?;
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => Ok(Expr::List(
                self.arguments(&TokenKind::RBracket, "']'")?,
            )),
            TokenKind::Eof => Err(at("unexpected end of input".to_string())),
            other => Err(at(format!("unexpected token {other:?}"))),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn arguments(&mut self, close: &TokenKind, label: &str) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(close) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.check(&TokenKind::Comma) {
                self.pos += 1;
                if self.check(close) {
                    self.pos += 1;
                    return Ok(args);
                }
                continue;
            }
            self.expect(close, label)?;
            return Ok(args);
        }
    }

    /// Run `rule` one nesting level deeper.
    fn nested<T>(&mut self, rule: fn(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error_here("expression nested too deeply"));
        }
        self.depth += 1;
        let result = rule(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check(&TokenKind::Keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected '{}'", format!("{keyword:?}").to_lowercase())))
        }
    }

    fn expect(&mut self, kind: &TokenKind, label: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error_here(format!("expected {label}")))
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.error_here("unexpected trailing input"))
        }
    }

    fn skip_separators(&mut self) {
        while self.check(&TokenKind::Separator) {
            self.pos += 1;
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError {
            message: message.into(),
            line: token.line,
            column: token.column,
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}
