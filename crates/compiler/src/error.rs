//! Compile errors
//!
//! Every failure in the middle end is fatal: the first error aborts the
//! invocation. Errors render as `<location> error: <kind>: <detail>`,
//! where the location comes from the hoisted symbol table when the
//! offending identifier has an entry there, and otherwise from the
//! enclosing function.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UndefinedSymbol,
    DuplicateDefinition,
    TypeMismatch,
    OutOfRangeIndex,
    InvalidAst,
    InvalidStatement,
    StackOverflow,
    RuntimeCatalogMismatch,
}

impl ErrorKind {
    fn label(self) -> &'static str {
        match self {
            ErrorKind::UndefinedSymbol => "undefined symbol",
            ErrorKind::DuplicateDefinition => "duplicate definition",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::OutOfRangeIndex => "out-of-range index",
            ErrorKind::InvalidAst => "invalid AST",
            ErrorKind::InvalidStatement => "invalid statement",
            ErrorKind::StackOverflow => "stack overflow",
            ErrorKind::RuntimeCatalogMismatch => "runtime catalog mismatch",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub detail: String,
    /// `file-less` source position (`line:column`) or enclosing scope name.
    pub location: Option<String>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        CompileError {
            kind,
            detail: detail.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn undefined_symbol(name: &str) -> Self {
        CompileError::new(
            ErrorKind::UndefinedSymbol,
            format!("\"{}\" is not defined", name),
        )
    }

    pub fn invalid_ast(detail: impl Into<String>) -> Self {
        CompileError::new(ErrorKind::InvalidAst, detail)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(
                f,
                "{} error: {}: {}",
                location,
                self.kind.label(),
                self.detail
            ),
            None => write!(f, "error: {}: {}", self.kind.label(), self.detail),
        }
    }
}

impl std::error::Error for CompileError {}

pub type Result<T> = std::result::Result<T, CompileError>;
