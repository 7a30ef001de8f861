//! Turning the emitted `.ll` artifact into something runnable.
//!
//! The compiler only talks to an [`ArtifactConsumer`]; `ClangToolchain` is
//! the stock implementation and is found on `PATH` rather than at a fixed
//! install location.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::profile::{BuildProfile, OptLevel, TargetEnv};

pub const CLANG_ENV: &str = "NANOSCRIPT_CLANG";
pub const WASI_SYSROOT_ENV: &str = "WASI_SYSROOT";

/// Anything that can turn an IR file into the final artifact.
pub trait ArtifactConsumer {
    fn consume(&self, artifact: &Path, output: &Path, profile: &BuildProfile) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClangToolchain {
    clang: PathBuf,
    wasi_sysroot: Option<PathBuf>,
}

impl ClangToolchain {
    pub fn new(clang: impl Into<PathBuf>, wasi_sysroot: Option<PathBuf>) -> Self {
        Self {
            clang: clang.into(),
            wasi_sysroot,
        }
    }

    /// `$NANOSCRIPT_CLANG` if set, otherwise `clang` from `PATH`.
    pub fn discover() -> Result<Self> {
        let clang = match std::env::var_os(CLANG_ENV).filter(|v| !v.is_empty()) {
            Some(explicit) => PathBuf::from(explicit),
            None => which::which("clang").with_context(|| {
                format!("clang not found on PATH (set {CLANG_ENV} to override)")
            })?,
        };
        let wasi_sysroot = std::env::var_os(WASI_SYSROOT_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        debug!(clang = %clang.display(), ?wasi_sysroot, "discovered toolchain");
        Ok(Self::new(clang, wasi_sysroot))
    }

    /// Build the clang invocation without running it.
    pub fn command(
        &self,
        artifact: &Path,
        output: &Path,
        profile: &BuildProfile,
    ) -> Result<Command> {
        let mut args: Vec<OsString> = Vec::new();
        match profile.target {
            TargetEnv::Wasi => {
                let sysroot = self.wasi_sysroot.as_ref().with_context(|| {
                    format!("the wasm target needs a WASI sysroot; set {WASI_SYSROOT_ENV}")
                })?;
                args.push("--target=wasm32-wasi".into());
                let mut flag = OsString::from("--sysroot=");
                flag.push(sysroot);
                args.push(flag);
            }
            TargetEnv::Native => {
                // the module triple may be spelled differently from clang's own
                args.push("-Wno-override-module".into());
            }
        }
        if profile.debug_info.is_present() {
            args.push("-g".into());
        }
        match profile.optimization {
            OptLevel::None => {}
            OptLevel::Balanced => args.push("-O2".into()),
            OptLevel::Aggressive => args.push("-O3".into()),
        }
        args.push(artifact.into());
        args.push("-o".into());
        args.push(output.into());

        let mut cmd = Command::new(&self.clang);
        cmd.args(args);
        Ok(cmd)
    }
}

impl ArtifactConsumer for ClangToolchain {
    fn consume(&self, artifact: &Path, output: &Path, profile: &BuildProfile) -> Result<()> {
        let mut cmd = self.command(artifact, output, profile)?;
        info!(command = ?cmd, "invoking toolchain");
        let status = cmd
            .status()
            .with_context(|| format!("running {}", self.clang.display()))?;
        if !status.success() {
            match status.code() {
                Some(code) => bail!("link step failed (exit {code})"),
                None => bail!("link step terminated by a signal"),
            }
        }
        Ok(())
    }
}

/// `<output>.tmp.ll`, the IR file handed to the consumer.
pub fn intermediate_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_os_string();
    path.push(".tmp.ll");
    PathBuf::from(path)
}

/// Deletes the intermediate IR when dropped, unless it is to be kept.
struct IntermediateIr {
    path: PathBuf,
    keep: bool,
}

impl Drop for IntermediateIr {
    fn drop(&mut self) {
        if self.keep || !self.path.exists() {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed intermediate IR"),
            Err(err) => {
                info!(path = %self.path.display(), %err, "could not remove intermediate IR")
            }
        }
    }
}

/// Write the IR with `emit` to [`intermediate_path`] and pass it to `consumer`.
///
/// The intermediate file is gone afterwards, whether emission or linking
/// failed or not, unless `keep_ir` is set. Returns its path.
pub fn emit_and_consume(
    consumer: &dyn ArtifactConsumer,
    output: &Path,
    profile: &BuildProfile,
    keep_ir: bool,
    emit: impl FnOnce(&Path) -> Result<()>,
) -> Result<PathBuf> {
    let ir = IntermediateIr {
        path: intermediate_path(output),
        keep: keep_ir,
    };
    emit(&ir.path)?;
    consumer.consume(&ir.path, output, profile)?;
    Ok(ir.path.clone())
}
