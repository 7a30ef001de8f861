use std::path::PathBuf;

use inkwell::builder::BuilderError;
use thiserror::Error;

/// Every way a compilation can fail. All of them are fatal.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("lex error at line {line}, col {col}: {message}")]
    Lex { line: u32, col: u32, message: String },

    #[error("parse error at line {line}, col {col}: {expected} (got '{found}')")]
    Parse {
        line: u32,
        col: u32,
        expected: String,
        found: String,
    },

    #[error("undefined variable `{name}` at line {line}, col {col}")]
    UndefinedVariable { name: String, line: u32, col: u32 },

    #[error("internal codegen error: {0}")]
    Internal(String),

    #[error("cannot write IR to {}: {message}", path.display())]
    Emit { path: PathBuf, message: String },
}

impl CompileError {
    /// Line the error points at, when it has one.
    pub fn line(&self) -> Option<u32> {
        match self {
            CompileError::Lex { line, .. }
            | CompileError::Parse { line, .. }
            | CompileError::UndefinedVariable { line, .. } => Some(*line),
            CompileError::Internal(_) | CompileError::Emit { .. } => None,
        }
    }

    /// True for generator defects rather than misuse of the language.
    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Internal(_))
    }

    /// Short classification string used for logging.
    pub fn category(&self) -> &'static str {
        match self {
            CompileError::Lex { .. } => "lex",
            CompileError::Parse { .. } => "parse",
            CompileError::UndefinedVariable { .. } => "undefined-variable",
            CompileError::Internal(_) => "internal",
            CompileError::Emit { .. } => "emit",
        }
    }
}

impl From<BuilderError> for CompileError {
    fn from(err: BuilderError) -> Self {
        CompileError::Internal(format!("instruction builder failed: {err}"))
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
