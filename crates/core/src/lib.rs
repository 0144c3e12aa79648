//! blang core: the semantic data model shared by the middle end
//!
//! B is untyped at the source level; every cell is a word. The compiler
//! still tracks a small set of storage types for literals and vectors so
//! the back ends know widths and which immediates need rip-relative data
//! labels.
//!
//! # Modules
//!
//! - `types`: primitive type tags, storage widths, and the `Datum` triple
//!   with its canonical `(value:type:size)` text form
//! - `operators`: the closed operator set with precedence and arity
//! - `symbols`: the scoped symbol table (scalars, vectors, pointers)
//! - `quad`: ITA opcodes and the quadruple instruction cell

pub mod operators;
pub mod quad;
pub mod symbols;
pub mod types;

pub use operators::Operator;
pub use quad::{Opcode, Quadruple, make_label, make_temporary, quad, quad3};
pub use symbols::{SymbolTable, SymbolValue};
pub use types::{Datum, TypeTag, WORD_SIZE};
