//! Abstract syntax tree nodes for the NanoScript language.

use std::fmt;

use crate::lexer::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Gt,
    Leq,
    Geq,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Leq => "<=",
            BinaryOperator::Geq => ">=",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    // 64-bit signed literal
    IntLiteral { value: i64, pos: Position },
    Variable { name: String, pos: Position },
    // `pos` is the operator token
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
        pos: Position,
    },
}

impl Expr {
    pub fn pos(&self) -> Position {
        match self {
            Expr::IntLiteral { pos, .. }
            | Expr::Variable { pos, .. }
            | Expr::BinaryOp { pos, .. } => *pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `name = value;`
    Assignment { name: String, value: Expr, pos: Position },
    /// `if (condition) { body }`; the body opens no new scope.
    If {
        condition: Expr,
        body: Vec<Stmt>,
        pos: Position,
    },
    /// `out value;` prints the value followed by a newline.
    Out { value: Expr, pos: Position },
}

/// Top-level container for a parsed NanoScript program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
