//! Recursive-descent parser for NanoScript.
//!
//! Statements are chosen by their leading token; expressions use one
//! function per precedence level:
//!
//! ```text
//! expr       := comparison
//! comparison := addsub (('=='|'!='|'<'|'>'|'<='|'>=') addsub)*
//! addsub     := muldiv (('+'|'-') muldiv)*
//! muldiv     := primary (('*'|'/') primary)*
//! primary    := INT | IDENT | '(' expr ')'
//! ```
//!
//! Every level is left-associative, comparisons included, so `a < b < c`
//! means `(a < b) < c`.
//!
//! Nesting of parentheses and `if` bodies is capped at [`MAX_NESTING`] and
//! expression trees at [`MAX_EXPR_DEPTH`] levels, which bounds the recursion
//! of both the parser and the code generator.

use crate::ast::{BinaryOperator, Expr, Program, Stmt};
use crate::error::{CompileError, Result};
use crate::lexer::{tokenize, Token, TokenKind};

pub const MAX_NESTING: usize = 256;
pub const MAX_EXPR_DEPTH: usize = 1024;

/// Entry point for turning a token stream into an AST.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    nesting: usize,
    // depth of the expression most recently returned by a precedence level
    expr_depth: usize,
}

impl Parser {
    /// The stream must end with an `Eof` token, as `tokenize` guarantees.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            nesting: 0,
            expr_depth: 0,
        }
    }

    /// Tokenize and parse a complete program from raw source text.
    pub fn parse_source(src: &str) -> Result<Program> {
        Self::new(tokenize(src)?).parse()
    }

    pub fn parse(mut self) -> Result<Program> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::Eof) {
            statements.push(self.statement()?);
        }
        Ok(Program { statements })
    }

    // ---- token helpers ----

    fn peek(&self) -> Result<&Token> {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .ok_or_else(|| CompileError::Internal("parser received an empty token stream".into()))
    }

    fn peek_kind(&self) -> Result<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().is_ok_and(|t| t.kind == kind)
    }

    fn advance(&mut self) -> Result<Token> {
        let tok = self.peek()?.clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        Ok(tok)
    }

    fn error_here(&self, expected: &str) -> CompileError {
        match self.peek() {
            Ok(tok) => CompileError::Parse {
                line: tok.pos.line,
                col: tok.pos.col,
                expected: expected.to_string(),
                found: tok.text.clone(),
            },
            Err(err) => err,
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.error_here(expected))
        }
    }

    /// Consume the opening token of a nested construct, failing past the cap.
    fn open_nested(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        if self.check(kind) && self.nesting >= MAX_NESTING {
            return Err(self.error_here(&format!("nesting deeper than {MAX_NESTING} levels")));
        }
        let tok = self.expect(kind, expected)?;
        self.nesting += 1;
        Ok(tok)
    }

    fn close_nested(&mut self, kind: TokenKind, expected: &str) -> Result<Token> {
        let tok = self.expect(kind, expected)?;
        self.nesting -= 1;
        Ok(tok)
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Stmt> {
        match self.peek_kind()? {
            TokenKind::If => self.if_stmt(),
            TokenKind::Out => self.out_stmt(),
            TokenKind::Ident => self.assignment(),
            _ => Err(self.error_here("expected a statement ('if', 'out' or an assignment)")),
        }
    }

    fn assignment(&mut self) -> Result<Stmt> {
        let id = self.expect(TokenKind::Ident, "expected identifier")?;
        self.expect(TokenKind::Assign, "expected '=' after identifier")?;
        let value = self.expr()?;
        self.expect(TokenKind::Semicolon, "expected ';' after expression")?;
        Ok(Stmt::Assignment {
            name: id.text,
            value,
            pos: id.pos,
        })
    }

    fn if_stmt(&mut self) -> Result<Stmt> {
        let kw = self.expect(TokenKind::If, "expected 'if'")?;
        self.expect(TokenKind::LParen, "expected '(' after 'if'")?;
        let condition = self.expr()?;
        self.expect(TokenKind::RParen, "expected ')' after condition")?;
        self.open_nested(TokenKind::LBrace, "expected '{' to open if-body")?;

        let mut body = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            body.push(self.statement()?);
        }
        self.close_nested(TokenKind::RBrace, "expected '}' to close if-body")?;

        Ok(Stmt::If {
            condition,
            body,
            pos: kw.pos,
        })
    }

    fn out_stmt(&mut self) -> Result<Stmt> {
        let kw = self.expect(TokenKind::Out, "expected 'out'")?;
        let value = self.expr()?;
        self.expect(TokenKind::Semicolon, "expected ';' after out-expression")?;
        Ok(Stmt::Out { value, pos: kw.pos })
    }

    // ---- expressions ----

    fn expr(&mut self) -> Result<Expr> {
        self.comparison()
    }

    /// Fold `next (op next)*` into a left-leaning chain of binary nodes.
    fn binary_level(
        &mut self,
        op_for: fn(TokenKind) -> Option<BinaryOperator>,
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        let mut depth = self.expr_depth;
        while let Some(op) = op_for(self.peek_kind()?) {
            let op_tok = self.advance()?;
            let right = next(self)?;
            depth = depth.max(self.expr_depth) + 1;
            if depth > MAX_EXPR_DEPTH {
                return Err(CompileError::Parse {
                    line: op_tok.pos.line,
                    col: op_tok.pos.col,
                    expected: format!("expression deeper than {MAX_EXPR_DEPTH} levels"),
                    found: op_tok.text,
                });
            }
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos: op_tok.pos,
            };
        }
        self.expr_depth = depth;
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        self.binary_level(
            |kind| match kind {
                TokenKind::Eq => Some(BinaryOperator::Eq),
                TokenKind::Neq => Some(BinaryOperator::Neq),
                TokenKind::Lt => Some(BinaryOperator::Lt),
                TokenKind::Gt => Some(BinaryOperator::Gt),
                TokenKind::Leq => Some(BinaryOperator::Leq),
                TokenKind::Geq => Some(BinaryOperator::Geq),
                _ => None,
            },
            Self::add_sub,
        )
    }

    fn add_sub(&mut self) -> Result<Expr> {
        self.binary_level(
            |kind| match kind {
                TokenKind::Plus => Some(BinaryOperator::Add),
                TokenKind::Minus => Some(BinaryOperator::Sub),
                _ => None,
            },
            Self::mul_div,
        )
    }

    fn mul_div(&mut self) -> Result<Expr> {
        self.binary_level(
            |kind| match kind {
                TokenKind::Star => Some(BinaryOperator::Mul),
                TokenKind::Slash => Some(BinaryOperator::Div),
                _ => None,
            },
            Self::primary,
        )
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek_kind()? {
            TokenKind::Int => {
                let tok = self.advance()?;
                let value = tok.text.parse::<i64>().map_err(|_| CompileError::Parse {
                    line: tok.pos.line,
                    col: tok.pos.col,
                    expected: "integer literal out of range for a 64-bit integer".into(),
                    found: tok.text.clone(),
                })?;
                self.expr_depth = 1;
                Ok(Expr::IntLiteral { value, pos: tok.pos })
            }
            TokenKind::Ident => {
                let tok = self.advance()?;
                self.expr_depth = 1;
                Ok(Expr::Variable {
                    name: tok.text,
                    pos: tok.pos,
                })
            }
            TokenKind::LParen => {
                self.open_nested(TokenKind::LParen, "expected '('")?;
                let inner = self.expr()?;
                self.close_nested(TokenKind::RParen, "expected ')' to close expression")?;
                Ok(inner)
            }
            _ => Err(self.error_here("expected expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Position;

    fn parse(src: &str) -> Program {
        Parser::parse_source(src).unwrap()
    }

    fn only_out_value(src: &str) -> Expr {
        match parse(src).statements.pop() {
            Some(Stmt::Out { value, .. }) => value,
            other => panic!("expected out statement, got {other:?}"),
        }
    }

    /// Render an expression fully parenthesised to make shape assertions short.
    fn show(e: &Expr) -> String {
        match e {
            Expr::IntLiteral { value, .. } => value.to_string(),
            Expr::Variable { name, .. } => name.clone(),
            Expr::BinaryOp { op, left, right, .. } => {
                format!("({} {} {})", show(left), op, show(right))
            }
        }
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(show(&only_out_value("out 2 + 3 * 4;")), "(2 + (3 * 4))");
    }

    #[test]
    fn arithmetic_is_left_associative() {
        assert_eq!(show(&only_out_value("out 10 - 3 - 2;")), "((10 - 3) - 2)");
        assert_eq!(show(&only_out_value("out 8 / 4 / 2;")), "((8 / 4) / 2)");
    }

    #[test]
    fn comparisons_chain_to_the_left() {
        assert_eq!(show(&only_out_value("out a < b < c;")), "((a < b) < c)");
    }

    #[test]
    fn comparison_is_weakest() {
        assert_eq!(show(&only_out_value("out a + 1 >= b * 2;")), "((a + 1) >= (b * 2))");
    }

    #[test]
    fn parentheses_override_precedence() {
        assert_eq!(show(&only_out_value("out (2 + 3) * 4;")), "((2 + 3) * 4)");
    }

    #[test]
    fn if_body_holds_nested_statements() {
        let program = parse("if (x == 1) {\n  y = 2;\n  if (y) { out y; }\n}\nout 0;");
        assert_eq!(program.statements.len(), 2);
        match &program.statements[0] {
            Stmt::If { body, pos, .. } => {
                assert_eq!(*pos, Position::new(1, 1));
                assert_eq!(body.len(), 2);
                assert!(matches!(body[1], Stmt::If { .. }));
            }
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn empty_if_body_is_allowed() {
        let program = parse("if (1) { }");
        assert!(matches!(&program.statements[0], Stmt::If { body, .. } if body.is_empty()));
    }

    #[test]
    fn binary_node_sits_at_operator_position() {
        let value = only_out_value("out 1 +\n 2;");
        assert_eq!(value.pos(), Position::new(1, 7));
    }

    #[test]
    fn missing_semicolon_reports_offending_token() {
        let err = Parser::parse_source("x = 1\nout x;").unwrap_err();
        match err {
            CompileError::Parse { line, col, expected, found } => {
                assert_eq!((line, col), (2, 1));
                assert!(expected.contains("';'"));
                assert_eq!(found, "out");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn statement_cannot_start_with_literal() {
        let err = Parser::parse_source("42;").unwrap_err();
        assert!(matches!(err, CompileError::Parse { line: 1, col: 1, .. }));
    }

    #[test]
    fn unclosed_if_body_fails_at_eof() {
        let err = Parser::parse_source("if (1) { out 1;").unwrap_err();
        match err {
            CompileError::Parse { expected, found, .. } => {
                assert!(expected.contains("'}'"));
                assert_eq!(found, "");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unbalanced_paren_is_rejected() {
        assert!(Parser::parse_source("out (1 + 2;").is_err());
    }

    #[test]
    fn literal_overflow_is_a_parse_error() {
        let err = Parser::parse_source("out 9223372036854775808;").unwrap_err();
        assert!(err.to_string().contains("out of range"));
        let program = parse("out 9223372036854775807;");
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn runaway_parentheses_are_a_parse_error() {
        let depth = 10_000;
        let src = format!("out {}1{};", "(".repeat(depth), ")".repeat(depth));
        let err = Parser::parse_source(&src).unwrap_err();
        match err {
            CompileError::Parse { line, col, expected, found } => {
                assert_eq!(line, 1);
                assert_eq!(col as usize, 5 + MAX_NESTING);
                assert!(expected.contains("nesting"), "{expected}");
                assert_eq!(found, "(");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn nesting_up_to_the_cap_is_accepted() {
        let src = format!("out {}1{};", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(show(&only_out_value(&src)), "1");

        let ifs = format!("{}out 1;{}", "if (1) { ".repeat(MAX_NESTING), " }".repeat(MAX_NESTING));
        assert_eq!(parse(&ifs).statements.len(), 1);
    }

    #[test]
    fn runaway_if_nesting_is_a_parse_error() {
        let depth = MAX_NESTING + 1;
        let src = format!("{}out 1;{}", "if (1) { ".repeat(depth), " }".repeat(depth));
        let err = Parser::parse_source(&src).unwrap_err();
        assert!(err.to_string().contains("nesting"), "{err}");
    }

    #[test]
    fn runaway_operator_chain_is_a_parse_error() {
        // a lone literal is one level, each operator adds one
        let src = format!("out 1{};", " + 1".repeat(MAX_EXPR_DEPTH));
        let err = Parser::parse_source(&src).unwrap_err();
        assert!(matches!(err, CompileError::Parse { ref found, .. } if found == "+"), "{err}");

        let src = format!("out 1{};", " + 1".repeat(MAX_EXPR_DEPTH - 1));
        assert!(Parser::parse_source(&src).is_ok());
    }
}
