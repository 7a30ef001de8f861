//! NanoScript compiler: source text to LLVM IR.
//!
//! `lexer` → `parser` → `codegen`, each stage consuming the previous one's
//! output. The [`link`] module hands the finished IR to an external toolchain.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod link;
pub mod parser;
pub mod profile;

use std::path::Path;

use inkwell::context::Context as LlvmContext;
use tracing::debug;

pub use codegen::{Codegen, SourceInfo};
pub use error::CompileError;
pub use profile::{BuildProfile, DebugInfo, OptLevel, Preset, TargetEnv};

use crate::parser::Parser;

fn run_pipeline<T>(
    source: &str,
    source_path: &Path,
    profile: BuildProfile,
    finish: impl FnOnce(&Codegen<'_>) -> error::Result<T>,
) -> error::Result<T> {
    let tokens = lexer::tokenize(source)?;
    debug!(tokens = tokens.len(), "lexed source");
    let program = Parser::new(tokens).parse()?;
    debug!(statements = program.statements.len(), "parsed program");

    let ctx = LlvmContext::create();
    let mut cg = Codegen::new(&ctx, &SourceInfo::from_path(source_path), profile)?;
    cg.generate(&program)?;
    finish(&cg)
}

/// Compile `source` and return the textual IR.
///
/// `source_path` only labels debug metadata; it is never read.
pub fn compile_to_ir(
    source: &str,
    source_path: &Path,
    profile: BuildProfile,
) -> error::Result<String> {
    run_pipeline(source, source_path, profile, |cg| Ok(cg.emit_ir()))
}

/// Compile `source` and write the IR artifact to `out_path`.
pub fn compile_to_file(
    source: &str,
    source_path: &Path,
    profile: BuildProfile,
    out_path: &Path,
) -> error::Result<()> {
    run_pipeline(source, source_path, profile, |cg| cg.write_ir(out_path))
}
