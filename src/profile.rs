//! Build profile: optimization level, debug metadata, and target environment.
//!
//! The three axes are independent. The named presets (`debug`,
//! `development`, `shipping`) only fill in the first two; the target is
//! always chosen separately.

use std::fmt;
use std::str::FromStr;

use inkwell::targets::{TargetMachine, TargetTriple};
use inkwell::OptimizationLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    #[default]
    None,
    Balanced,
    /// Whole-program (LTO) pipeline at the highest level.
    Aggressive,
}

impl OptLevel {
    /// New-pass-manager pipeline text, or `None` when nothing should run.
    pub fn pipeline(self) -> Option<&'static str> {
        match self {
            OptLevel::None => None,
            OptLevel::Balanced => Some("default<O2>"),
            OptLevel::Aggressive => Some("lto<O3>"),
        }
    }

    pub fn llvm_level(self) -> OptimizationLevel {
        match self {
            OptLevel::None => OptimizationLevel::None,
            OptLevel::Balanced => OptimizationLevel::Default,
            OptLevel::Aggressive => OptimizationLevel::Aggressive,
        }
    }

    pub fn is_optimized(self) -> bool {
        self != OptLevel::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugInfo {
    #[default]
    Present,
    Absent,
}

impl DebugInfo {
    pub fn is_present(self) -> bool {
        self == DebugInfo::Present
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetEnv {
    #[default]
    Native,
    /// WebAssembly with the WASI system interface.
    Wasi,
}

pub const WASI_TRIPLE: &str = "wasm32-unknown-wasi";

impl TargetEnv {
    pub fn triple(self) -> TargetTriple {
        match self {
            TargetEnv::Native => TargetMachine::get_default_triple(),
            TargetEnv::Wasi => TargetTriple::create(WASI_TRIPLE),
        }
    }

    /// Conventional file extension of the final artifact.
    pub fn artifact_extension(self) -> Option<&'static str> {
        match self {
            TargetEnv::Native => None,
            TargetEnv::Wasi => Some("wasm"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildProfile {
    pub optimization: OptLevel,
    pub debug_info: DebugInfo,
    pub target: TargetEnv,
}

impl BuildProfile {
    pub fn new(optimization: OptLevel, debug_info: DebugInfo, target: TargetEnv) -> Self {
        Self {
            optimization,
            debug_info,
            target,
        }
    }

    pub fn from_preset(preset: Preset, target: TargetEnv) -> Self {
        let (optimization, debug_info) = match preset {
            Preset::Debug => (OptLevel::None, DebugInfo::Present),
            Preset::Development => (OptLevel::Balanced, DebugInfo::Present),
            Preset::Shipping => (OptLevel::Aggressive, DebugInfo::Absent),
        };
        Self::new(optimization, debug_info, target)
    }

    pub fn with_optimization(self, optimization: OptLevel) -> Self {
        Self { optimization, ..self }
    }

    pub fn with_debug_info(self, debug_info: DebugInfo) -> Self {
        Self { debug_info, ..self }
    }

    pub fn with_target(self, target: TargetEnv) -> Self {
        Self { target, ..self }
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.optimization, self.debug_info, self.target)
    }
}

/// Named starting points for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Debug,
    Development,
    Shipping,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {axis} '{value}', expected one of: {expected}")]
pub struct ParseProfileError {
    axis: &'static str,
    value: String,
    expected: &'static str,
}

fn unknown(axis: &'static str, value: &str, expected: &'static str) -> ParseProfileError {
    ParseProfileError {
        axis,
        value: value.to_string(),
        expected,
    }
}

impl FromStr for Preset {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Preset::Debug),
            "development" | "dev" => Ok(Preset::Development),
            "shipping" | "release" => Ok(Preset::Shipping),
            _ => Err(unknown("config", s, "debug, development, shipping")),
        }
    }
}

impl FromStr for OptLevel {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Ok(OptLevel::None),
            "balanced" | "2" => Ok(OptLevel::Balanced),
            "aggressive" | "3" | "lto" => Ok(OptLevel::Aggressive),
            _ => Err(unknown("optimization level", s, "none, balanced, aggressive")),
        }
    }
}

impl FromStr for DebugInfo {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "true" | "yes" | "present" => Ok(DebugInfo::Present),
            "off" | "false" | "no" | "absent" => Ok(DebugInfo::Absent),
            _ => Err(unknown("debug-info setting", s, "on, off")),
        }
    }
}

impl FromStr for TargetEnv {
    type Err = ParseProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(TargetEnv::Native),
            "wasm" | "wasi" | "wasm32-wasi" => Ok(TargetEnv::Wasi),
            _ => Err(unknown("target", s, "native, wasm")),
        }
    }
}

impl fmt::Display for OptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptLevel::None => "O0",
            OptLevel::Balanced => "O2",
            OptLevel::Aggressive => "O3+LTO",
        })
    }
}

impl fmt::Display for DebugInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DebugInfo::Present => "DWARF",
            DebugInfo::Absent => "no debug info",
        })
    }
}

impl fmt::Display for TargetEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetEnv::Native => "native",
            TargetEnv::Wasi => "wasm",
        })
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Preset::Debug => "debug",
            Preset::Development => "development",
            Preset::Shipping => "shipping",
        })
    }
}
