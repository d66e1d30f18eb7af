//! Tokenizer for formulas and transform programs.

use super::ParseError;
use std::iter::Peekable;
use std::str::Chars;

/// Reserved words. Matched case-insensitively; `None`/`True`/`False` are
/// accepted as spellings of `null`/`true`/`false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    If,
    Then,
    Else,
    And,
    Or,
    Not,
    True,
    False,
    Null,
    Return,
}

impl Keyword {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "if" => Some(Self::If),
            "then" => Some(Self::Then),
            "else" => Some(Self::Else),
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "not" => Some(Self::Not),
            "true" => Some(Self::True),
            "false" => Some(Self::False),
            "null" | "none" => Some(Self::Null),
            "return" => Some(Self::Return),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    Number(f64),
    Str(String),
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    EqEq,
    NotEq,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    /// Statement separator: newline or `;`
    Separator,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

pub(crate) struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            input: source.chars().peekable(),
            line: 1,
            column: 0,
        }
    }

    /// Tokenize the whole input, ending with [`TokenKind::Eof`].
    pub(crate) fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.input.next();
        if let Some(c) = ch {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.input.peek() == Some(&expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.input.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '#' => {
                    while let Some(&c) = self.input.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn error(&self, message: impl Into<String>, line: usize, column: usize) -> ParseError {
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_trivia();

        let line = self.line;
        let column = self.column + 1;
        let token = |kind| Token { kind, line, column };

        let Some(c) = self.advance() else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match c {
            '\n' | ';' => TokenKind::Separator,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' if self.eat('*') => TokenKind::StarStar,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '<' if self.eat('=') => TokenKind::Le,
            '<' => TokenKind::Lt,
            '>' if self.eat('=') => TokenKind::Ge,
            '>' => TokenKind::Gt,
            '=' if self.eat('=') => TokenKind::EqEq,
            '=' => TokenKind::Assign,
            '!' if self.eat('=') => TokenKind::NotEq,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' if self.input.peek().is_some_and(char::is_ascii_digit) => {
                self.lex_number(c, line, column)?
            }
            '.' => TokenKind::Dot,
            '"' | '\'' => self.lex_string(c, line, column)?,
            c if c.is_ascii_digit() => self.lex_number(c, line, column)?,
            c if c.is_alphabetic() || c == '_' => self.lex_word(c),
            other => {
                return Err(self.error(format!("unexpected character '{other}'"), line, column));
            }
        };

        Ok(token(kind))
    }

    fn lex_word(&mut self, first: char) -> TokenKind {
        let mut buf = String::from(first);
        while let Some(&c) = self.input.peek() {
            if c.is_alphanumeric() || c == '_' {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Keyword::from_word(&buf).map_or(TokenKind::Identifier(buf), TokenKind::Keyword)
    }

    fn lex_number(&mut self, first: char, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        let mut buf = String::from(first);
        let mut seen_exponent = false;
        while let Some(&c) = self.input.peek() {
            if c.is_ascii_digit() || c == '.' || c == '_' {
                if c != '_' {
                    buf.push(c);
                }
                self.advance();
            } else if (c == 'e' || c == 'E') && !seen_exponent {
                seen_exponent = true;
                buf.push(c);
                self.advance();
                if let Some(&sign) = self.input.peek()
                    && (sign == '+' || sign == '-')
                {
                    buf.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }
        buf.parse::<f64>()
            .map(TokenKind::Number)
            .map_err(|_| self.error(format!("invalid number '{buf}'"), line, column))
    }

    fn lex_string(&mut self, quote: char, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        let mut buf = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => return Ok(TokenKind::Str(buf)),
                Some('\\') => match self.advance() {
                    Some('n') => buf.push('\n'),
                    Some('t') => buf.push('\t'),
                    Some(other) => buf.push(other),
                    None => break,
                },
                Some('\n') | None => break,
                Some(c) => buf.push(c),
            }
        }
        Err(self.error("unterminated string literal", line, column))
    }
}
