//! JSON AST ingestion
//!
//! The front end hands over two JSON values: the program tree and the
//! hoisted symbol map. `AstNode` is a thin checked view over
//! `serde_json::Value`; a missing field or an unexpected shape is an
//! invalid-AST compile error, never a panic.
//!
//! Program nodes follow `{node, root, left, right}`:
//!
//! ```json
//! { "node": "statement", "root": "if",
//!   "left": { ...predicate... },
//!   "right": [ { ...then-block... }, null ] }
//! ```

use crate::error::{CompileError, Result};
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
pub struct AstNode<'a> {
    value: &'a Value,
}

impl<'a> AstNode<'a> {
    pub fn new(value: &'a Value) -> Self {
        AstNode { value }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn is_array(&self) -> bool {
        self.value.is_array()
    }

    fn field(&self, name: &str) -> Result<&'a Value> {
        self.value
            .get(name)
            .ok_or_else(|| CompileError::invalid_ast(format!("node is missing \"{}\"", name)))
    }

    pub fn has(&self, name: &str) -> bool {
        self.value.get(name).is_some()
    }

    /// The `node` discriminator, e.g. `statement` or `relation_expression`.
    pub fn kind(&self) -> Result<&'a str> {
        self.field("node")?
            .as_str()
            .ok_or_else(|| CompileError::invalid_ast("\"node\" is not a string"))
    }

    pub fn root(&self) -> Result<AstNode<'a>> {
        Ok(AstNode::new(self.field("root")?))
    }

    /// `root` as a string; numeric roots are rendered as their spelling.
    pub fn root_text(&self) -> Result<String> {
        let root = self.field("root")?;
        match root {
            Value::String(text) => Ok(text.clone()),
            Value::Number(number) => Ok(number.to_string()),
            _ => Err(CompileError::invalid_ast("\"root\" is not a name or number")),
        }
    }

    /// First element of an array-valued `root`, the operator spelling of
    /// relation and assignment nodes (`"root": ["=", null]`).
    pub fn root_operator(&self) -> Result<String> {
        match self.field("root")? {
            Value::Array(items) => items
                .first()
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| CompileError::invalid_ast("operator root is empty")),
            Value::String(text) => Ok(text.clone()),
            _ => Err(CompileError::invalid_ast("\"root\" is not an operator")),
        }
    }

    /// Second element of an array-valued `root`, used by compound
    /// assignment (`"root": ["=", "+"]`).
    pub fn root_operator_suffix(&self) -> Option<String> {
        self.value
            .get("root")?
            .as_array()?
            .get(1)?
            .as_str()
            .map(str::to_owned)
    }

    pub fn left(&self) -> Result<AstNode<'a>> {
        Ok(AstNode::new(self.field("left")?))
    }

    pub fn right(&self) -> Result<AstNode<'a>> {
        Ok(AstNode::new(self.field("right")?))
    }

    pub fn as_array(&self) -> Result<Vec<AstNode<'a>>> {
        self.value
            .as_array()
            .map(|items| items.iter().map(AstNode::new).collect())
            .ok_or_else(|| CompileError::invalid_ast("expected an array node"))
    }

    pub fn as_int(&self) -> Result<i64> {
        self.value
            .as_i64()
            .ok_or_else(|| CompileError::invalid_ast("expected an integer node"))
    }

    pub fn as_text(&self) -> Result<&'a str> {
        self.value
            .as_str()
            .ok_or_else(|| CompileError::invalid_ast("expected a string node"))
    }

    /// Require `node == expected`, the builder-entry assertion.
    pub fn expect_kind(&self, expected: &str) -> Result<()> {
        let kind = self.kind()?;
        if kind != expected {
            return Err(CompileError::invalid_ast(format!(
                "expected \"{}\" node, found \"{}\"",
                expected, kind
            )));
        }
        Ok(())
    }

    /// Require `root == expected` for statement dispatch.
    pub fn expect_root(&self, expected: &str) -> Result<()> {
        let root = self.root_text()?;
        if root != expected {
            return Err(CompileError::invalid_ast(format!(
                "expected \"{}\" statement, found \"{}\"",
                expected, root
            )));
        }
        Ok(())
    }
}

/// The hoisted symbol map from the front end: every program-scope name
/// with its declaration kind, source position, and (for vectors) size.
#[derive(Debug, Clone)]
pub struct HoistedSymbols {
    map: Value,
}

impl HoistedSymbols {
    pub fn new(map: Value) -> Result<Self> {
        if !map.is_object() {
            return Err(CompileError::invalid_ast("symbol AST is not an object"));
        }
        Ok(HoistedSymbols { map })
    }

    pub fn empty() -> Self {
        HoistedSymbols {
            map: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.get(name).is_some()
    }

    /// Declaration kind: `lvalue`, `vector_lvalue`, `function_definition`,
    /// or `label`.
    pub fn kind_of(&self, name: &str) -> Option<&str> {
        self.map.get(name)?.get("type")?.as_str()
    }

    pub fn size_of(&self, name: &str) -> Option<u64> {
        self.map.get(name)?.get("size")?.as_u64()
    }

    /// `line:column` for error prefixes.
    pub fn location_of(&self, name: &str) -> Option<String> {
        let entry = self.map.get(name)?;
        let line = entry.get("line")?.as_u64()?;
        let column = entry.get("column")?.as_u64()?;
        Some(format!("{}:{}", line, column))
    }

    pub fn names(&self) -> Vec<String> {
        match self.map.as_object() {
            Some(object) => object.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Inject a synthetic `function_definition` entry; used by the runtime
    /// catalog so library calls resolve in the object-table pass.
    pub fn inject_function(&mut self, name: &str) {
        if let Some(object) = self.map.as_object_mut() {
            object
                .entry(name.to_string())
                .or_insert_with(|| serde_json::json!({ "type": "function_definition" }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn checked_field_access() {
        let value = json!({ "node": "statement", "root": "block", "left": [] });
        let node = AstNode::new(&value);
        assert_eq!(node.kind().unwrap(), "statement");
        assert_eq!(node.root_text().unwrap(), "block");
        assert!(node.right().is_err());
    }

    #[test]
    fn operator_roots() {
        let value = json!({ "node": "assignment_expression", "root": ["=", null] });
        let node = AstNode::new(&value);
        assert_eq!(node.root_operator().unwrap(), "=");
        assert_eq!(node.root_operator_suffix(), None);

        let compound = json!({ "node": "assignment_expression", "root": ["=", "+"] });
        assert_eq!(
            AstNode::new(&compound).root_operator_suffix(),
            Some("+".to_string())
        );
    }

    #[test]
    fn numeric_root_spelling() {
        let value = json!({ "node": "number_literal", "root": 42 });
        assert_eq!(AstNode::new(&value).root_text().unwrap(), "42");
    }

    #[test]
    fn hoisted_symbol_queries() {
        let symbols = HoistedSymbols::new(json!({
            "main": { "type": "function_definition", "line": 1, "column": 1 },
            "mess": { "type": "vector_lvalue", "line": 2, "column": 1, "size": 6 },
        }))
        .unwrap();
        assert_eq!(symbols.kind_of("main"), Some("function_definition"));
        assert_eq!(symbols.size_of("mess"), Some(6));
        assert_eq!(symbols.location_of("mess").as_deref(), Some("2:1"));
        assert!(!symbols.contains("exp"));
    }

    #[test]
    fn injection_is_idempotent() {
        let mut symbols = HoistedSymbols::empty();
        symbols.inject_function("printf");
        symbols.inject_function("printf");
        assert_eq!(symbols.kind_of("printf"), Some("function_definition"));
    }
}
