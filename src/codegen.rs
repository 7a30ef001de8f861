//! LLVM IR generation for NanoScript programs using Inkwell.
//!
//! One pass over the AST builds a module with a single `main` function.
//! Variables live in `alloca` slots hoisted into the entry block the first
//! time their name is assigned, so a slot exists on every path even when
//! the assignment sits inside an `if` body that never runs.

use std::collections::HashMap;
use std::ffi::CStr;
use std::path::Path;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context as LlvmContext;
use inkwell::debug_info::{
    debug_metadata_version, AsDIScope, DIBasicType, DICompileUnit, DIFile, DIFlags,
    DIFlagsConstants, DISubprogram, DWARFEmissionKind, DWARFSourceLanguage, DebugInfoBuilder,
};
use inkwell::llvm_sys::core::{LLVMAddAlias2, LLVMSetVisibility};
use inkwell::llvm_sys::LLVMVisibility;
use inkwell::module::{FlagBehavior, Linkage, Module};
use inkwell::passes::PassBuilderOptions;
use inkwell::targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine};
use inkwell::types::{AsTypeRef, FunctionType, IntType};
use inkwell::values::{
    AsValueRef, FunctionValue, GlobalValue, InstructionOpcode, InstructionValue, IntValue,
    PointerValue,
};
use inkwell::{AddressSpace, GlobalVisibility, IntPredicate};
use tracing::{debug, info};

use crate::ast::{BinaryOperator, Expr, Program, Stmt};
use crate::error::{CompileError, Result};
use crate::lexer::Position;
use crate::profile::{BuildProfile, TargetEnv};

const MODULE_NAME: &str = "nanoscript";
const PRODUCER: &str = concat!("NanoScript Compiler ", env!("CARGO_PKG_VERSION"));

// printf template for one signed 64-bit integer and a newline
const PRINT_TEMPLATE: &[u8] = b"%lld\n\0";

/// Symbol wasi-libc's `_start` calls instead of `main`.
const SANDBOX_ENTRY_ALIAS: &CStr = c"__main_void";

const DW_ATE_SIGNED: u32 = 0x05;
const DWARF_VERSION: u64 = 5;

/// Provenance of the program, used only for debug metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub file_name: String,
    pub directory: String,
}

impl SourceInfo {
    pub fn from_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<stdin>".to_string());
        let directory = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| ".".to_string());
        Self {
            file_name,
            directory,
        }
    }
}

struct DebugContext<'ctx> {
    builder: DebugInfoBuilder<'ctx>,
    unit: DICompileUnit<'ctx>,
    file: DIFile<'ctx>,
    int64: DIBasicType<'ctx>,
    // set once `main` exists
    subprogram: Option<DISubprogram<'ctx>>,
}

/// Generates LLVM IR for one program under one build profile.
pub struct Codegen<'ctx> {
    ctx: &'ctx LlvmContext,
    builder: Builder<'ctx>,
    module: Module<'ctx>,
    profile: BuildProfile,
    target_machine: TargetMachine,
    i64_t: IntType<'ctx>,
    i32_t: IntType<'ctx>,
    printf: FunctionValue<'ctx>,
    fmt: GlobalValue<'ctx>,
    slots: HashMap<String, PointerValue<'ctx>>,
    debug: Option<DebugContext<'ctx>>,
    generated: bool,
}

impl<'ctx> Codegen<'ctx> {
    /// Create a module configured for `profile.target`, with `printf` and the
    /// print template already declared.
    pub fn new(ctx: &'ctx LlvmContext, source: &SourceInfo, profile: BuildProfile) -> Result<Self> {
        let module = ctx.create_module(MODULE_NAME);
        module.set_source_file_name(&source.file_name);
        let builder = ctx.create_builder();
        let i64_t = ctx.i64_type();
        let i32_t = ctx.i32_type();

        let target_machine = create_target_machine(profile)?;
        module.set_triple(&target_machine.get_triple());
        module.set_data_layout(&target_machine.get_target_data().get_data_layout());

        let debug = if profile.debug_info.is_present() {
            module.add_basic_value_flag(
                "Dwarf Version",
                FlagBehavior::Warning,
                i32_t.const_int(DWARF_VERSION, false),
            );
            module.add_basic_value_flag(
                "Debug Info Version",
                FlagBehavior::Warning,
                i32_t.const_int(u64::from(debug_metadata_version()), false),
            );
            Some(create_debug_context(&module, source, profile)?)
        } else {
            None
        };

        // declare i32 @printf(ptr, ...)
        let ptr_t = ctx.i8_type().ptr_type(AddressSpace::default());
        let printf_ty = i32_t.fn_type(&[ptr_t.into()], true);
        let printf = module.add_function("printf", printf_ty, Some(Linkage::External));

        let template = ctx.const_string(PRINT_TEMPLATE, false);
        let fmt = module.add_global(template.get_type(), None, ".fmt");
        fmt.set_initializer(&template);
        fmt.set_constant(true);
        fmt.set_linkage(Linkage::Private);
        fmt.set_unnamed_addr(true);
        fmt.set_alignment(1);

        Ok(Self {
            ctx,
            builder,
            module,
            profile,
            target_machine,
            i64_t,
            i32_t,
            printf,
            fmt,
            slots: HashMap::new(),
            debug,
            generated: false,
        })
    }

    /// Walk the AST, build `main`, verify the module and run the optimization
    /// pipeline the profile asks for.
    pub fn generate(&mut self, program: &Program) -> Result<()> {
        if self.generated {
            return Err(CompileError::Internal(
                "generate called twice on the same module".into(),
            ));
        }
        self.generated = true;

        let main_fn = self.create_entry_function()?;
        for stmt in &program.statements {
            self.gen_stmt(stmt, main_fn)?;
        }

        self.set_debug_loc(Position::new(1, 1));
        self.builder.build_return(Some(&self.i32_t.const_zero()))?;

        if let Some(dbg) = &self.debug {
            dbg.builder.finalize();
        }

        self.verify()?;
        self.optimize()?;
        info!(
            statements = program.statements.len(),
            slots = self.slots.len(),
            profile = %self.profile,
            "generated module"
        );
        Ok(())
    }

    /// Textual IR of the module in its current state.
    pub fn emit_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn write_ir(&self, path: &Path) -> Result<()> {
        self.module
            .print_to_file(path)
            .map_err(|e| CompileError::Emit {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        info!(path = %path.display(), "wrote IR");
        Ok(())
    }

    // ---- module scaffolding ----

    fn create_entry_function(&mut self) -> Result<FunctionValue<'ctx>> {
        let main_ty = self.i32_t.fn_type(&[], false);
        let main_fn = self.module.add_function("main", main_ty, Some(Linkage::External));

        if self.profile.target == TargetEnv::Wasi {
            main_fn.as_global_value().set_visibility(GlobalVisibility::Hidden);
            self.add_sandbox_entry_alias(main_fn, main_ty);
        }

        if let Some(dbg) = self.debug.as_mut() {
            let ret_ty = dbg
                .builder
                .create_basic_type("int", 32, DW_ATE_SIGNED, DIFlags::ZERO)
                .map_err(|e| CompileError::Internal(e.to_string()))?;
            let sub_ty = dbg.builder.create_subroutine_type(
                dbg.file,
                Some(ret_ty.as_type()),
                &[],
                DIFlags::ZERO,
            );
            let subprogram = dbg.builder.create_function(
                dbg.unit.as_debug_info_scope(),
                "main",
                None,
                dbg.file,
                1,
                sub_ty,
                false,
                true,
                1,
                DIFlags::PROTOTYPED,
                self.profile.optimization.is_optimized(),
            );
            main_fn.set_subprogram(subprogram);
            dbg.subprogram = Some(subprogram);
        }

        let entry = self.ctx.append_basic_block(main_fn, "entry");
        self.builder.position_at_end(entry);
        self.builder.unset_current_debug_location();
        Ok(main_fn)
    }

    /// Emit `@__main_void = hidden alias i32 (), ptr @main`.
    fn add_sandbox_entry_alias(&self, main_fn: FunctionValue<'ctx>, main_ty: FunctionType<'ctx>) {
        // SAFETY: the module, the function type and the aliasee all come from
        // `self.ctx`, and the alias name is a NUL-terminated static.
        unsafe {
            let alias = LLVMAddAlias2(
                self.module.as_mut_ptr(),
                main_ty.as_type_ref(),
                0,
                main_fn.as_value_ref(),
                SANDBOX_ENTRY_ALIAS.as_ptr(),
            );
            LLVMSetVisibility(alias, LLVMVisibility::LLVMHiddenVisibility);
        }
        debug!("emitted sandbox entry alias");
    }

    fn set_debug_loc(&self, pos: Position) {
        let Some(dbg) = &self.debug else { return };
        let Some(subprogram) = dbg.subprogram else { return };
        let loc = dbg.builder.create_debug_location(
            self.ctx,
            pos.line,
            pos.col,
            subprogram.as_debug_info_scope(),
            None,
        );
        self.builder.set_current_debug_location(loc);
    }

    /// Allocate the slot for `name` in the entry block, after any slots
    /// already there, and leave the builder where it was.
    fn allocate_slot(
        &mut self,
        name: &str,
        pos: Position,
        function: FunctionValue<'ctx>,
    ) -> Result<PointerValue<'ctx>> {
        let entry = function
            .get_first_basic_block()
            .ok_or_else(|| CompileError::Internal("entry function has no entry block".into()))?;
        let resume = self
            .builder
            .get_insert_block()
            .ok_or_else(|| CompileError::Internal("builder is not positioned".into()))?;

        let anchor = first_non_alloca(entry);
        match anchor {
            Some(instr) => self.builder.position_before(&instr),
            None => self.builder.position_at_end(entry),
        }
        let slot = self.builder.build_alloca(self.i64_t, name)?;

        if let Some(dbg) = &self.debug {
            if let Some(subprogram) = dbg.subprogram {
                let scope = subprogram.as_debug_info_scope();
                let var = dbg.builder.create_auto_variable(
                    scope,
                    name,
                    dbg.file,
                    pos.line,
                    dbg.int64.as_type(),
                    true,
                    DIFlags::ZERO,
                    0,
                );
                let loc = dbg
                    .builder
                    .create_debug_location(self.ctx, pos.line, pos.col, scope, None);
                let expr = dbg.builder.create_expression(Vec::new());
                match anchor {
                    Some(instr) => dbg.builder.insert_declare_before_instruction(
                        slot,
                        Some(var),
                        Some(expr),
                        loc,
                        instr,
                    ),
                    None => dbg
                        .builder
                        .insert_declare_at_end(slot, Some(var), Some(expr), loc, entry),
                };
            }
        }

        self.builder.position_at_end(resume);
        self.slots.insert(name.to_string(), slot);
        debug!(slot = name, line = pos.line, "allocated slot");
        Ok(slot)
    }

    fn verify(&self) -> Result<()> {
        self.module.verify().map_err(|e| {
            CompileError::Internal(format!("LLVM module verification failed:\n{e}"))
        })
    }

    fn optimize(&self) -> Result<()> {
        let Some(passes) = self.profile.optimization.pipeline() else {
            return Ok(());
        };
        info!(passes, "running optimization pipeline");
        self.module
            .run_passes(passes, &self.target_machine, PassBuilderOptions::create())
            .map_err(|e| {
                CompileError::Internal(format!("optimization pipeline `{passes}` failed: {e}"))
            })
    }

    // ---- statements ----

    fn gen_stmt(&mut self, stmt: &Stmt, function: FunctionValue<'ctx>) -> Result<()> {
        match stmt {
            Stmt::Assignment { name, value, pos } => {
                self.gen_assignment(name, value, *pos, function)
            }
            Stmt::If {
                condition,
                body,
                pos,
            } => self.gen_if(condition, body, *pos, function),
            Stmt::Out { value, pos } => self.gen_out(value, *pos),
        }
    }

    fn gen_assignment(
        &mut self,
        name: &str,
        value: &Expr,
        pos: Position,
        function: FunctionValue<'ctx>,
    ) -> Result<()> {
        self.set_debug_loc(pos);
        // the slot exists before the right-hand side is lowered
        let slot = match self.slots.get(name) {
            Some(slot) => *slot,
            None => self.allocate_slot(name, pos, function)?,
        };
        let v = self.gen_expr(value)?;
        self.set_debug_loc(pos);
        self.builder.build_store(slot, v)?;
        Ok(())
    }

    /// Lower to `cond -> then -> merge`; the builder ends up in `merge`.
    fn gen_if(
        &mut self,
        condition: &Expr,
        body: &[Stmt],
        pos: Position,
        function: FunctionValue<'ctx>,
    ) -> Result<()> {
        self.set_debug_loc(pos);
        let cond = self.gen_expr(condition)?;
        self.set_debug_loc(pos);
        let zero = self.i64_t.const_zero();
        let is_true = self
            .builder
            .build_int_compare(IntPredicate::NE, cond, zero, "ifcond")?;

        let then_bb = self.ctx.append_basic_block(function, "then");
        let merge_bb = self.ctx.append_basic_block(function, "merge");
        self.builder.build_conditional_branch(is_true, then_bb, merge_bb)?;

        self.builder.position_at_end(then_bb);
        for stmt in body {
            self.gen_stmt(stmt, function)?;
        }
        if !self.block_is_terminated() {
            self.builder.build_unconditional_branch(merge_bb)?;
        }

        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn gen_out(&mut self, value: &Expr, pos: Position) -> Result<()> {
        self.set_debug_loc(pos);
        let v = self.gen_expr(value)?;
        self.set_debug_loc(pos);
        self.builder.build_call(
            self.printf,
            &[self.fmt.as_pointer_value().into(), v.into()],
            "",
        )?;
        Ok(())
    }

    fn block_is_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .is_some_and(|bb| bb.get_terminator().is_some())
    }

    // ---- expressions ----

    fn gen_expr(&mut self, expr: &Expr) -> Result<IntValue<'ctx>> {
        match expr {
            Expr::IntLiteral { value, pos } => {
                self.set_debug_loc(*pos);
                Ok(self.i64_t.const_int(*value as u64, true))
            }
            Expr::Variable { name, pos } => {
                self.set_debug_loc(*pos);
                let slot = *self
                    .slots
                    .get(name)
                    .ok_or_else(|| CompileError::UndefinedVariable {
                        name: name.clone(),
                        line: pos.line,
                        col: pos.col,
                    })?;
                Ok(self
                    .builder
                    .build_load(self.i64_t, slot, name)?
                    .into_int_value())
            }
            Expr::BinaryOp {
                op,
                left,
                right,
                pos,
            } => {
                let l = self.gen_expr(left)?;
                let r = self.gen_expr(right)?;
                self.set_debug_loc(*pos);
                self.gen_binary(*op, l, r)
            }
        }
    }

    fn gen_binary(
        &self,
        op: BinaryOperator,
        l: IntValue<'ctx>,
        r: IntValue<'ctx>,
    ) -> Result<IntValue<'ctx>> {
        let b = &self.builder;
        let (predicate, name) = match op {
            BinaryOperator::Add => return Ok(b.build_int_add(l, r, "add")?),
            BinaryOperator::Sub => return Ok(b.build_int_sub(l, r, "sub")?),
            BinaryOperator::Mul => return Ok(b.build_int_mul(l, r, "mul")?),
            // division by zero is left to the target's trap behaviour
            BinaryOperator::Div => return Ok(b.build_int_signed_div(l, r, "div")?),
            BinaryOperator::Eq => (IntPredicate::EQ, "eq"),
            BinaryOperator::Neq => (IntPredicate::NE, "ne"),
            BinaryOperator::Lt => (IntPredicate::SLT, "lt"),
            BinaryOperator::Gt => (IntPredicate::SGT, "gt"),
            BinaryOperator::Leq => (IntPredicate::SLE, "le"),
            BinaryOperator::Geq => (IntPredicate::SGE, "ge"),
        };
        let flag = b.build_int_compare(predicate, l, r, name)?;
        // true widens to exactly 1
        Ok(b.build_int_z_extend(flag, self.i64_t, "cmpext")?)
    }
}

fn create_target_machine(profile: BuildProfile) -> Result<TargetMachine> {
    Target::initialize_all(&InitializationConfig::default());
    let triple = profile.target.triple();
    let triple_text = triple.as_str().to_string_lossy().into_owned();
    let target = Target::from_triple(&triple).map_err(|e| {
        CompileError::Internal(format!("no LLVM target for {triple_text}: {e}"))
    })?;
    target
        .create_target_machine(
            &triple,
            "generic",
            "",
            profile.optimization.llvm_level(),
            RelocMode::PIC,
            CodeModel::Default,
        )
        .ok_or_else(|| {
            CompileError::Internal(format!("cannot create target machine for {triple_text}"))
        })
}

fn create_debug_context<'ctx>(
    module: &Module<'ctx>,
    source: &SourceInfo,
    profile: BuildProfile,
) -> Result<DebugContext<'ctx>> {
    let (builder, unit) = module.create_debug_info_builder(
        true,
        DWARFSourceLanguage::C,
        &source.file_name,
        &source.directory,
        PRODUCER,
        profile.optimization.is_optimized(),
        "",
        0,
        "",
        DWARFEmissionKind::Full,
        0,
        false,
        false,
        "",
        "",
    );
    let file = unit.get_file();
    let int64 = builder
        .create_basic_type("int64", 64, DW_ATE_SIGNED, DIFlags::ZERO)
        .map_err(|e| CompileError::Internal(e.to_string()))?;
    Ok(DebugContext {
        builder,
        unit,
        file,
        int64,
        subprogram: None,
    })
}

fn first_non_alloca<'ctx>(block: BasicBlock<'ctx>) -> Option<InstructionValue<'ctx>> {
    let mut cursor = block.get_first_instruction();
    while let Some(instr) = cursor {
        if instr.get_opcode() != InstructionOpcode::Alloca {
            return Some(instr);
        }
        cursor = instr.get_next_instruction();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::profile::{DebugInfo, OptLevel, Preset};

    fn source() -> SourceInfo {
        SourceInfo::from_path(Path::new("/work/demo.nano"))
    }

    fn lower(src: &str, profile: BuildProfile) -> Result<String> {
        let program = Parser::parse_source(src)?;
        let ctx = LlvmContext::create();
        let mut cg = Codegen::new(&ctx, &source(), profile)?;
        cg.generate(&program)?;
        Ok(cg.emit_ir())
    }

    fn plain() -> BuildProfile {
        BuildProfile::default().with_debug_info(DebugInfo::Absent)
    }

    #[test]
    fn source_info_splits_path() {
        let info = source();
        assert_eq!(info.file_name, "demo.nano");
        assert_eq!(info.directory, "/work");
        assert_eq!(SourceInfo::from_path(Path::new("x.nano")).directory, ".");
    }

    #[test]
    fn out_calls_printf_with_the_template() {
        let ir = lower("out 42;", plain()).unwrap();
        assert!(ir.contains("declare i32 @printf(ptr, ...)"), "{ir}");
        assert!(ir.contains("c\"%lld\\0A\\00"), "{ir}");
        assert!(ir.contains("i64 42"), "{ir}");
        assert!(ir.contains("ret i32 0"), "{ir}");
    }

    #[test]
    fn reading_an_unassigned_name_fails() {
        let err = lower("x = 1;\nout y;", plain()).unwrap_err();
        match err {
            CompileError::UndefinedVariable { name, line, col } => {
                assert_eq!(name, "y");
                assert_eq!((line, col), (2, 5));
            }
            other => panic!("expected undefined variable, got {other:?}"),
        }
    }

    #[test]
    fn resolution_follows_textual_order() {
        let err = lower("out y;\ny = 1;", plain()).unwrap_err();
        assert!(matches!(err, CompileError::UndefinedVariable { line: 1, .. }));
    }

    #[test]
    fn slot_from_untaken_branch_is_still_declared() {
        let ir = lower("if (0) { z = 5; } out z;", plain()).unwrap();
        let alloca = ir.find("%z = alloca i64").expect("slot for z");
        let branch = ir.find("br i1").expect("conditional branch");
        assert!(alloca < branch, "slot must be in the entry block:\n{ir}");
    }

    #[test]
    fn each_name_gets_one_slot() {
        let ir = lower("x = 1; x = x + 1; if (x) { x = 3; } out x;", plain()).unwrap();
        assert_eq!(ir.matches("alloca i64").count(), 1, "{ir}");
    }

    #[test]
    fn first_assignment_may_read_its_own_slot() {
        let ir = lower("x = x + 1;\nout x;", plain()).unwrap();
        assert_eq!(ir.matches("alloca i64").count(), 1, "{ir}");
        assert!(ir.contains("load i64, ptr %x"), "{ir}");
    }

    #[test]
    fn if_lowers_to_then_and_merge() {
        let ir = lower("x = 3;\nif (x) { out x; }\nout 0;", plain()).unwrap();
        assert!(ir.contains("icmp ne i64"), "{ir}");
        assert!(ir.contains("then:"), "{ir}");
        assert!(ir.contains("merge:"), "{ir}");
        assert!(ir.contains("br label %merge"), "{ir}");
    }

    #[test]
    fn nested_ifs_verify() {
        let src = "a = 1;\nif (a) {\n  b = 2;\n  if (b > a) { out b; }\n  out a;\n}\nout 7;";
        assert!(lower(src, plain()).is_ok());
    }

    #[test]
    fn comparisons_widen_to_i64() {
        let ir = lower("a = 1; b = 2; out a < b;", plain()).unwrap();
        assert!(ir.contains("icmp slt i64"), "{ir}");
        assert!(ir.contains("zext i1"), "{ir}");
    }

    #[test]
    fn division_is_signed() {
        let ir = lower("a = 7; b = 2; out a / b;", plain()).unwrap();
        assert!(ir.contains("sdiv i64"), "{ir}");
    }

    #[test]
    fn debug_info_describes_main_and_slots() {
        let ir = lower("x = 1;\nout x;", BuildProfile::default()).unwrap();
        assert!(ir.contains("!DICompileUnit("), "{ir}");
        assert!(ir.contains("!DIFile(filename: \"demo.nano\", directory: \"/work\")"), "{ir}");
        assert!(ir.contains("!DISubprogram(name: \"main\""), "{ir}");
        assert!(ir.contains("!DILocalVariable(name: \"x\""), "{ir}");
        assert!(ir.contains("llvm.dbg.declare"), "{ir}");
        assert!(ir.contains("\"Debug Info Version\""), "{ir}");
        assert!(ir.contains("\"Dwarf Version\", i32 5"), "{ir}");
    }

    #[test]
    fn every_instruction_in_main_has_a_location() {
        let src = "a = 1;\nif (a < 3) {\n  b = a + 2;\n  out b;\n}\nout a;\n";
        let ir = lower(src, BuildProfile::default()).unwrap();
        let start = ir.find("define i32 @main()").expect("main definition");
        let body = &ir[start..];
        let end = body.find("\n}\n").expect("end of main");
        let instructions: Vec<&str> = body[..end]
            .lines()
            .skip(1)
            .filter(|line| line.starts_with("  ") && !line.trim().is_empty())
            .collect();
        assert!(instructions.len() > 10, "{ir}");
        for line in instructions {
            assert!(line.contains("!dbg"), "no location on `{}`:\n{ir}", line.trim());
        }
    }

    #[test]
    fn no_debug_info_means_no_metadata() {
        let ir = lower("x = 1;\nout x;", plain()).unwrap();
        assert!(!ir.contains("DICompileUnit"), "{ir}");
        assert!(!ir.contains("llvm.dbg.declare"), "{ir}");
    }

    #[test]
    fn wasi_target_hides_main_behind_alias() {
        let profile = plain().with_target(TargetEnv::Wasi);
        let ir = lower("out 1;", profile).unwrap();
        assert!(ir.contains("target triple = \"wasm32-unknown-wasi\""), "{ir}");
        assert!(ir.contains("@__main_void = hidden alias"), "{ir}");
        assert!(ir.contains("define hidden i32 @main()"), "{ir}");
        assert!(ir.contains("target datalayout = \"e-m:e-p:32:32"), "{ir}");
    }

    #[test]
    fn native_target_has_no_alias() {
        let ir = lower("out 1;", plain()).unwrap();
        assert!(!ir.contains("__main_void"), "{ir}");
        assert!(ir.contains("define i32 @main()"), "{ir}");
    }

    #[test]
    fn balanced_pipeline_promotes_slots() {
        let profile = plain().with_optimization(OptLevel::Balanced);
        let ir = lower("x = 2 + 3 * 4;\nout x;", profile).unwrap();
        assert!(!ir.contains("alloca"), "{ir}");
        assert!(ir.contains("i64 14"), "{ir}");
    }

    #[test]
    fn aggressive_with_debug_info_is_legal() {
        let profile = BuildProfile::from_preset(Preset::Shipping, TargetEnv::Native)
            .with_debug_info(DebugInfo::Present);
        let ir = lower("x = 5;\nif (x > 2) { out x; }", profile).unwrap();
        assert!(ir.contains("isOptimized: true"), "{ir}");
    }

    #[test]
    fn generation_is_deterministic() {
        let src = "b = 1;\na = 2;\nif (a > b) { c = a - b; out c; }\nout a * b;";
        for profile in [BuildProfile::default(), plain().with_target(TargetEnv::Wasi)] {
            assert_eq!(lower(src, profile).unwrap(), lower(src, profile).unwrap());
        }
    }

    #[test]
    fn generating_twice_is_an_internal_error() {
        let program = Parser::parse_source("out 1;").unwrap();
        let ctx = LlvmContext::create();
        let mut cg = Codegen::new(&ctx, &source(), plain()).unwrap();
        cg.generate(&program).unwrap();
        let err = cg.generate(&program).unwrap_err();
        assert!(err.is_internal());
    }
}
