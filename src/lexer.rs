//! Tokenizer for NanoScript source.
//!
//! Produces the whole token stream up front; the parser never pulls tokens
//! lazily. The stream always ends with exactly one `Eof` token.

use std::fmt;

use crate::error::{CompileError, Result};

/// 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Int,
    Ident,
    If,
    Out,
    // operators
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
    // delimiters
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Position,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }
}

/// Split `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    i: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            i: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.i + offset).copied()
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn pos(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.i).copied()?;
        self.i += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if is_space(c) {
                self.bump();
            } else if c == '/' && self.peek_at(1) == Some('/') {
                // the newline itself is eaten on the next turn of the loop
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    /// Consume characters while `accept` holds and return them.
    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|&c| accept(c)) {
            text.push(c);
            self.bump();
        }
        text
    }

    fn run(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia();
            let start = self.pos();
            let Some(c) = self.peek() else {
                tokens.push(Token::new(TokenKind::Eof, "", start));
                break;
            };

            if c.is_ascii_digit() {
                let digits = self.take_while(|c| c.is_ascii_digit());
                tokens.push(Token::new(TokenKind::Int, digits, start));
                continue;
            }
            if c.is_ascii_alphabetic() || c == '_' {
                let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                let kind = match word.as_str() {
                    "if" => TokenKind::If,
                    "out" => TokenKind::Out,
                    _ => TokenKind::Ident,
                };
                tokens.push(Token::new(kind, word, start));
                continue;
            }

            self.bump();
            let next_is_eq = self.peek() == Some('=');
            let (kind, text) = match c {
                '=' if next_is_eq => (TokenKind::Eq, "=="),
                '=' => (TokenKind::Assign, "="),
                '!' if next_is_eq => (TokenKind::Neq, "!="),
                '!' => {
                    return Err(CompileError::Lex {
                        line: start.line,
                        col: start.col,
                        message: "unexpected '!' (only '!=' is allowed)".into(),
                    })
                }
                '<' if next_is_eq => (TokenKind::Leq, "<="),
                '<' => (TokenKind::Lt, "<"),
                '>' if next_is_eq => (TokenKind::Geq, ">="),
                '>' => (TokenKind::Gt, ">"),
                '+' => (TokenKind::Plus, "+"),
                '-' => (TokenKind::Minus, "-"),
                '*' => (TokenKind::Star, "*"),
                '/' => (TokenKind::Slash, "/"),
                ';' => (TokenKind::Semicolon, ";"),
                '(' => (TokenKind::LParen, "("),
                ')' => (TokenKind::RParen, ")"),
                '{' => (TokenKind::LBrace, "{"),
                '}' => (TokenKind::RBrace, "}"),
                other => {
                    return Err(CompileError::Lex {
                        line: start.line,
                        col: start.col,
                        message: format!("unexpected character '{other}'"),
                    })
                }
            };
            if text.len() == 2 {
                self.bump();
            }
            tokens.push(Token::new(kind, text, start));
        }

        Ok(tokens)
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}
