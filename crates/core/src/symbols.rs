//! Scoped symbol table
//!
//! Maps identifiers to a typed value, a vector of values, or a pointer
//! target. Lookup of an undefined name is a hard error at the caller; the
//! table itself only answers `Option`s so each pass can attach its own
//! location and error kind.

use crate::types::Datum;
use std::collections::HashMap;

/// What a name is bound to at program or block scope.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolValue {
    Scalar(Datum),
    Vector(Vec<Datum>),
    /// Pointer to a named lvalue; the spelling is the target name.
    Pointer(String),
}

impl SymbolValue {
    pub fn as_scalar(&self) -> Option<&Datum> {
        match self {
            SymbolValue::Scalar(datum) => Some(datum),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Datum]> {
        match self {
            SymbolValue::Vector(items) => Some(items),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolValue>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Insert or overwrite; idempotent by design so re-declaration in the
    /// same scope just refreshes the binding.
    pub fn define(&mut self, name: impl Into<String>, value: SymbolValue) {
        self.entries.insert(name.into(), value);
    }

    pub fn define_scalar(&mut self, name: impl Into<String>, datum: Datum) {
        self.define(name, SymbolValue::Scalar(datum));
    }

    /// Parameter teardown at function exit.
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(name);
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolValue> {
        self.entries.get(name)
    }

    pub fn lookup_scalar(&self, name: &str) -> Option<&Datum> {
        self.lookup(name).and_then(SymbolValue::as_scalar)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// A name is a pointer when it was bound as one, or when its scalar
    /// spelling is an address (`&target`).
    pub fn is_pointer(&self, name: &str) -> bool {
        match self.entries.get(name) {
            Some(SymbolValue::Pointer(_)) => true,
            Some(SymbolValue::Scalar(datum)) => datum.value.starts_with('&'),
            _ => false,
        }
    }

    pub fn pointer_target(&self, name: &str) -> Option<&str> {
        match self.entries.get(name)? {
            SymbolValue::Pointer(target) => Some(target),
            SymbolValue::Scalar(datum) => datum.value.strip_prefix('&').map(str::trim),
            SymbolValue::Vector(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SymbolValue)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_lookup() {
        let mut table = SymbolTable::new();
        table.define_scalar("x", Datum::int("5"));
        assert!(table.is_defined("x"));
        assert_eq!(table.lookup_scalar("x"), Some(&Datum::int("5")));
        assert!(table.lookup("y").is_none());
    }

    #[test]
    fn redefinition_overwrites() {
        let mut table = SymbolTable::new();
        table.define_scalar("x", Datum::int("1"));
        table.define_scalar("x", Datum::int("2"));
        assert_eq!(table.lookup_scalar("x").unwrap().value, "2");
    }

    #[test]
    fn remove_unbinds() {
        let mut table = SymbolTable::new();
        table.define_scalar("p", Datum::word());
        table.remove("p");
        assert!(!table.is_defined("p"));
    }

    #[test]
    fn pointer_detection() {
        use crate::types::TypeTag;
        let mut table = SymbolTable::new();
        table.define("k", SymbolValue::Pointer("m".into()));
        table.define_scalar("j", Datum::new("&m", TypeTag::Word, 8));
        table.define_scalar("m", Datum::int("3"));
        assert!(table.is_pointer("k"));
        assert!(table.is_pointer("j"));
        assert!(!table.is_pointer("m"));
        assert_eq!(table.pointer_target("k"), Some("m"));
        assert_eq!(table.pointer_target("j"), Some("m"));
    }
}
