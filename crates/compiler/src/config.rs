//! Compiler configuration
//!
//! The middle end is target-aware only through the runtime catalog: the
//! `(os, arch)` pair selects which syscall names are injected as callable
//! symbols. Configuration comes from CLI flags or an optional TOML file:
//!
//! ```toml
//! target-os = "linux"
//! target-arch = "x86_64"
//! inject-syscalls = true
//! ```

use crate::error::{CompileError, ErrorKind, Result};
use crate::runtime::{Arch, Os};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BlangConfig {
    /// `linux` or `bsd`.
    pub target_os: String,
    /// `x86_64` or `arm64`.
    pub target_arch: String,
    /// Make kernel routines callable without declarations.
    pub inject_syscalls: bool,
    /// Echo the ITA stream to stderr after the table pass.
    pub dump_ir: bool,
}

impl Default for BlangConfig {
    fn default() -> Self {
        BlangConfig {
            target_os: "linux".to_string(),
            target_arch: "x86_64".to_string(),
            inject_syscalls: true,
            dump_ir: false,
        }
    }
}

impl BlangConfig {
    /// Parse configuration from a TOML string; unspecified keys keep
    /// their defaults.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| {
            CompileError::new(
                ErrorKind::InvalidAst,
                format!("failed to parse config: {}", e),
            )
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CompileError::new(
                ErrorKind::InvalidAst,
                format!("cannot read config \"{}\": {}", path.display(), e),
            )
        })?;
        Self::from_toml(&contents).map_err(|mut err| {
            err.detail = format!("\"{}\": {}", path.display(), err.detail);
            err
        })
    }

    pub fn os(&self) -> Result<Os> {
        match self.target_os.as_str() {
            "linux" => Ok(Os::Linux),
            "bsd" | "freebsd" | "openbsd" => Ok(Os::Bsd),
            other => Err(CompileError::new(
                ErrorKind::InvalidAst,
                format!("unknown target os \"{}\"", other),
            )),
        }
    }

    pub fn arch(&self) -> Result<Arch> {
        match self.target_arch.as_str() {
            "x86_64" | "x86-64" | "amd64" => Ok(Arch::X86_64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            other => Err(CompileError::new(
                ErrorKind::InvalidAst,
                format!("unknown target arch \"{}\"", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_linux_x86_64() {
        let config = BlangConfig::default();
        assert_eq!(config.os().unwrap(), Os::Linux);
        assert_eq!(config.arch().unwrap(), Arch::X86_64);
        assert!(config.inject_syscalls);
    }

    #[test]
    fn parses_kebab_case_toml() {
        let config = BlangConfig::from_toml(
            "target-os = \"bsd\"\ntarget-arch = \"arm64\"\ninject-syscalls = false\n",
        )
        .unwrap();
        assert_eq!(config.os().unwrap(), Os::Bsd);
        assert_eq!(config.arch().unwrap(), Arch::Arm64);
        assert!(!config.inject_syscalls);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(BlangConfig::from_toml("target-os = [").is_err());
    }

    #[test]
    fn unknown_targets_are_rejected() {
        let config = BlangConfig {
            target_os: "plan9".to_string(),
            ..BlangConfig::default()
        };
        assert!(config.os().is_err());
    }

    #[test]
    fn loads_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blang.toml");
        std::fs::write(&path, "target-arch = \"arm64\"\ndump-ir = true\n").unwrap();
        let config = BlangConfig::load(&path).unwrap();
        assert_eq!(config.arch().unwrap(), Arch::Arm64);
        assert!(config.dump_ir);
        // unspecified keys keep their defaults
        assert_eq!(config.os().unwrap(), Os::Linux);
    }

    #[test]
    fn missing_files_error_cleanly() {
        let err = BlangConfig::load(Path::new("/nonexistent/blang.toml")).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::InvalidAst);
    }
}
