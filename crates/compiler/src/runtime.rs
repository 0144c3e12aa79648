//! Runtime and standard library catalog
//!
//! The standard library ships as a prebuilt object per platform; the
//! middle end only needs to know which names exist, their arities, and
//! which of them produce a value. Before the object-table pass runs these
//! names are injected into the hoisted symbol set as
//! `function_definition` entries so call sites resolve without a body.
//!
//! printf(10):
//!   format string plus up to nine variadic arguments
//!   ("int=%d, float=%f, double=%g, string=%s, char=%c")
//! print(2):
//!   type-safe print for buffer addresses and strings
//! putchar(1) / getchar(0):
//!   single-byte stdout/stdin

use crate::ast::HoistedSymbols;
use crate::error::{CompileError, ErrorKind, Result};

/// `(name, maximum arity)` for the prebuilt library routines.
pub const LIBRARY: [(&str, usize); 4] = [
    ("printf", 10),
    ("print", 2),
    ("putchar", 1),
    ("getchar", 0),
];

/// Library functions that accept anything up to their arity bound.
pub const VARIADIC: [&str; 1] = ["printf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Bsd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Arm64,
}

/// Kernel routines addressable from B source, per platform. The set is
/// the classic Unix call surface B programs were written against; all
/// four platform pairs currently expose the same names.
pub fn syscalls(_os: Os, _arch: Arch) -> &'static [&'static str] {
    &[
        "exit", "fork", "read", "write", "open", "close", "creat", "seek", "link", "unlink",
        "chdir", "chmod", "chown", "stat", "time",
    ]
}

pub fn is_library_function(name: &str) -> bool {
    LIBRARY.iter().any(|(library_name, _)| *library_name == name)
}

pub fn is_variadic(name: &str) -> bool {
    VARIADIC.contains(&name)
}

pub fn is_syscall(name: &str, os: Os, arch: Arch) -> bool {
    syscalls(os, arch).contains(&name)
}

/// Library arity bound, when the name is a library routine.
pub fn library_arity(name: &str) -> Option<usize> {
    LIBRARY
        .iter()
        .find(|(library_name, _)| *library_name == name)
        .map(|(_, arity)| *arity)
}

/// Does a call to `name` produce a value to read out of `RET`?
///
/// Library routines are sinks except `getchar`; everything else (user
/// functions, syscalls) is assumed to return a word.
pub fn call_returns_value(name: &str) -> bool {
    !is_library_function(name) || name == "getchar"
}

/// Reject call sites with impossible argument counts. Variadic functions
/// accept anything up to their bound; the rest are exact.
pub fn check_call_arity(name: &str, argument_count: usize) -> Result<()> {
    let Some(arity) = library_arity(name) else {
        return Ok(());
    };
    let ok = if is_variadic(name) {
        argument_count <= arity
    } else {
        argument_count == arity
    };
    if !ok {
        return Err(CompileError::new(
            ErrorKind::RuntimeCatalogMismatch,
            format!(
                "\"{}\" takes {}{} arguments, call passes {}",
                name,
                if is_variadic(name) { "up to " } else { "" },
                arity,
                argument_count
            ),
        ));
    }
    Ok(())
}

/// Mark the whole catalog as defined functions in the hoisted symbol set
/// so calls resolve without a compiled body.
pub fn inject(hoisted: &mut HoistedSymbols, os: Os, arch: Arch, with_syscalls: bool) {
    for (name, _) in LIBRARY {
        hoisted.inject_function(name);
    }
    if with_syscalls {
        for name in syscalls(os, arch) {
            hoisted.inject_function(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_membership() {
        assert!(is_library_function("printf"));
        assert!(!is_library_function("exp"));
        assert_eq!(library_arity("print"), Some(2));
    }

    #[test]
    fn only_getchar_returns_among_library_calls() {
        assert!(call_returns_value("getchar"));
        assert!(!call_returns_value("printf"));
        assert!(!call_returns_value("putchar"));
        assert!(call_returns_value("exp"));
        assert!(call_returns_value("write"));
    }

    #[test]
    fn variadic_accepts_up_to_bound() {
        assert!(check_call_arity("printf", 3).is_ok());
        assert!(check_call_arity("printf", 10).is_ok());
        assert!(check_call_arity("printf", 11).is_err());
    }

    #[test]
    fn exact_arity_is_enforced() {
        assert!(check_call_arity("putchar", 1).is_ok());
        assert!(check_call_arity("putchar", 2).is_err());
        // unknown names are user functions, not checked here
        assert!(check_call_arity("exp", 7).is_ok());
    }

    #[test]
    fn injection_defines_the_catalog() {
        let mut hoisted = HoistedSymbols::empty();
        inject(&mut hoisted, Os::Linux, Arch::X86_64, true);
        assert_eq!(hoisted.kind_of("printf"), Some("function_definition"));
        assert_eq!(hoisted.kind_of("write"), Some("function_definition"));
    }
}
