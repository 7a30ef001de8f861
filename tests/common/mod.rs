#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Result};
use nanoscript::link::{ArtifactConsumer, ClangToolchain};
use nanoscript::{compile_to_file, BuildProfile, TargetEnv};
use tempfile::TempDir;

pub fn source_path() -> PathBuf {
    PathBuf::from("/tmp/nanoscript-tests/prog.nano")
}

/// Scratch directory plus a toolchain, or `None` when no clang is installed.
pub struct TestSetup {
    pub dir: TempDir,
    pub toolchain: ClangToolchain,
}

pub fn setup_toolchain() -> Option<TestSetup> {
    let toolchain = ClangToolchain::discover().ok()?;
    let dir = tempfile::tempdir().ok()?;
    Some(TestSetup { dir, toolchain })
}

impl TestSetup {
    /// Compile, link natively and run `src`, returning its stdout.
    pub fn run(&self, src: &str, profile: BuildProfile) -> Result<String> {
        assert_eq!(profile.target, TargetEnv::Native);
        let ir = self.dir.path().join("prog.ll");
        let exe = self.dir.path().join("prog");
        compile_to_file(src, &source_path(), profile, &ir)?;
        self.toolchain.consume(&ir, &exe, &profile)?;
        run_binary(&exe)
    }
}

fn run_binary(exe: &Path) -> Result<String> {
    let output = Command::new(exe).output()?;
    if !output.status.success() {
        bail!("program exited with {:?}", output.status.code());
    }
    Ok(String::from_utf8(output.stdout)?)
}
