use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::Context;
use clap::Parser as ClapParser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use nanoscript::link::{self, ClangToolchain};
use nanoscript::{
    compile_to_file, BuildProfile, CompileError, DebugInfo, OptLevel, Preset, TargetEnv,
};

/// Compile a NanoScript program to a native binary or a WASI module.
#[derive(Debug, ClapParser)]
#[command(name = "nanoc", version)]
struct Cli {
    /// Source file (`.nano`).
    input: PathBuf,

    /// Path for the produced artifact. Defaults to <stem>, <stem>.wasm or <stem>.ll.
    output: Option<PathBuf>,

    /// debug (O0 + DWARF), development (O2 + DWARF) or shipping (O3/LTO, no debug info).
    #[arg(long, env = "NANOSCRIPT_CONFIG", default_value = "debug")]
    config: Preset,

    /// Override the optimization level of the preset: none, balanced, aggressive.
    #[arg(long)]
    opt: Option<OptLevel>,

    /// Override debug metadata of the preset: on, off.
    #[arg(long)]
    debug_info: Option<DebugInfo>,

    /// Emit a wasm32-wasi module instead of a native binary.
    #[arg(long)]
    wasm: bool,

    /// Stop after writing the LLVM IR.
    #[arg(long)]
    emit_ir: bool,

    /// Keep the intermediate `.ll` next to the output.
    #[arg(long)]
    keep_ir: bool,

    /// Log pipeline stages to stderr.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn profile(&self) -> BuildProfile {
        let target = if self.wasm { TargetEnv::Wasi } else { TargetEnv::Native };
        let mut profile = BuildProfile::from_preset(self.config, target);
        if let Some(opt) = self.opt {
            profile = profile.with_optimization(opt);
        }
        if let Some(debug_info) = self.debug_info {
            profile = profile.with_debug_info(debug_info);
        }
        profile
    }

    fn output(&self, profile: &BuildProfile) -> PathBuf {
        if let Some(out) = &self.output {
            return out.clone();
        }
        let ext = if self.emit_ir {
            Some("ll")
        } else {
            profile.target.artifact_extension()
        };
        // append rather than replace, so `prog.v2.nano` keeps its `.v2`
        let mut name = OsString::from(self.input.file_stem().unwrap_or(self.input.as_os_str()));
        if let Some(ext) = ext {
            name.push(".");
            name.push(ext);
        }
        PathBuf::from(name)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Debug metadata wants an absolute path so debuggers can find the source.
fn absolute(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let profile = cli.profile();
    let output = cli.output(&profile);

    let src = fs::read_to_string(&cli.input).with_context(|| format!("reading {:?}", cli.input))?;
    let source_path = absolute(&cli.input)?;

    if cli.emit_ir {
        compile_to_file(&src, &source_path, profile, &output).map_err(report)?;
        println!("Wrote IR '{}' [{}]", output.display(), profile);
        return Ok(());
    }

    // find the toolchain before anything is written next to the output
    let toolchain = ClangToolchain::discover()?;
    link::emit_and_consume(&toolchain, &output, &profile, cli.keep_ir, |ir| {
        compile_to_file(&src, &source_path, profile, ir).map_err(report)
    })?;

    println!(
        "Compiled '{}' -> '{}' [{}]",
        cli.input.display(),
        output.display(),
        profile
    );
    match profile.target {
        TargetEnv::Wasi => println!("Run:   wasmtime {}", output.display()),
        TargetEnv::Native => println!("Run:   ./{}", output.display()),
    }
    Ok(())
}

fn report(err: CompileError) -> anyhow::Error {
    error!(category = err.category(), line = ?err.line(), "compilation failed");
    anyhow::Error::new(err).context("compilation error")
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
