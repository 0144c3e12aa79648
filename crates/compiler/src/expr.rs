//! Expression parsing (AST node -> `Expression` tree)
//!
//! One AST expression node becomes one owning `Expression`. The tree
//! lives only for the lowering of a single statement; the operand queue
//! holds `Rc` handles into it.

use crate::ast::{AstNode, HoistedSymbols};
use crate::error::{CompileError, ErrorKind, Result};
use blang_core::types::{Datum, TypeTag};
use blang_core::{Operator, SymbolTable, SymbolValue};

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant immediate.
    Literal(Datum),
    /// Named variable with its currently-known type.
    LValue(String, Datum),
    Unary(Operator, Box<Expression>),
    /// Binary operators, and the ternary (arity 2 or 4).
    Relation(Operator, Vec<Expression>),
    /// Call; the callee is an `LValue`.
    Function(Box<Expression>, Vec<Expression>),
    /// The assignment `lhs = rhs`.
    Symbol(Box<Expression>, Box<Expression>),
    /// Parenthesised sub-expression; transparent, affects ordering only.
    Pointer(Box<Expression>),
    /// Vector literal initialiser.
    Array(Vec<Datum>),
}

impl Expression {
    /// Spelling used when the operand reaches an instruction directly.
    pub fn spelling(&self) -> String {
        match self {
            Expression::Literal(datum) => datum.format(),
            Expression::LValue(name, _) => name.clone(),
            Expression::Pointer(sub) => sub.spelling(),
            Expression::Function(callee, _) => callee.spelling(),
            Expression::Symbol(lhs, _) => lhs.spelling(),
            Expression::Unary(op, sub) => format!("{} {}", op, sub.spelling()),
            Expression::Relation(op, args) if args.len() == 2 => {
                format!("{} {} {}", args[0].spelling(), op, args[1].spelling())
            }
            Expression::Relation(op, _) => op.spelling().to_string(),
            Expression::Array(_) => String::new(),
        }
    }
}

/// Decode B escapes: the escape character is `*`, not `\`.
fn decode_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '*' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('e') => out.push('\u{4}'),
            Some('*') => out.push('*'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => out.push(other),
            None => out.push('*'),
        }
    }
    out
}

pub struct ExpressionParser<'a> {
    symbols: &'a SymbolTable,
    hoisted: &'a HoistedSymbols,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(symbols: &'a SymbolTable, hoisted: &'a HoistedSymbols) -> Self {
        ExpressionParser { symbols, hoisted }
    }

    fn undefined(&self, name: &str) -> CompileError {
        let err = CompileError::undefined_symbol(name);
        match self.hoisted.location_of(name) {
            Some(location) => err.at(location),
            None => err,
        }
    }

    pub fn parse(&self, node: AstNode<'_>) -> Result<Expression> {
        match node.kind()? {
            "number_literal" => self.parse_number(node),
            "string_literal" => self.parse_string(node),
            "constant_literal" => self.parse_constant(node),
            "lvalue" => self.parse_lvalue(node),
            "vector_lvalue" => self.parse_vector_lvalue(node),
            "indirect_lvalue" => self.parse_indirect_lvalue(node),
            "assignment_expression" => self.parse_assignment(node),
            "function_expression" => self.parse_function(node),
            "relation_expression" => self.parse_relation(node),
            "unary_expression" => self.parse_unary(node),
            "pre_inc_dec_expression" => self.parse_inc_dec(node, true),
            "post_inc_dec_expression" => self.parse_inc_dec(node, false),
            "address_of_expression" => self.parse_address_of(node),
            "evaluated_expression" => {
                let sub = self.parse(node.left()?)?;
                Ok(Expression::Pointer(Box::new(sub)))
            }
            other => Err(CompileError::invalid_ast(format!(
                "malformed expression node \"{}\"",
                other
            ))),
        }
    }

    fn parse_number(&self, node: AstNode<'_>) -> Result<Expression> {
        let spelling = node.root_text()?;
        let datum = Datum::from_number_spelling(&spelling).ok_or_else(|| {
            CompileError::invalid_ast(format!("\"{}\" is not a number literal", spelling))
        })?;
        Ok(Expression::Literal(datum))
    }

    fn parse_string(&self, node: AstNode<'_>) -> Result<Expression> {
        let raw = node.root_text()?;
        let contents = raw
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(&raw);
        Ok(Expression::Literal(Datum::string(decode_escapes(contents))))
    }

    /// A single-quoted character constant carries its numeric code in the
    /// datum spelling: `'a'` becomes `('97':byte:1)`.
    fn parse_constant(&self, node: AstNode<'_>) -> Result<Expression> {
        let raw = node.root_text()?;
        let contents = raw
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(&raw);
        let decoded = decode_escapes(contents);
        let code = decoded
            .chars()
            .next()
            .ok_or_else(|| CompileError::invalid_ast("empty character constant"))?
            as u32;
        Ok(Expression::Literal(Datum::new(
            format!("'{}'", code),
            TypeTag::Byte,
            1,
        )))
    }

    fn parse_lvalue(&self, node: AstNode<'_>) -> Result<Expression> {
        let name = node.root_text()?;
        let datum = match self.symbols.lookup(&name) {
            Some(SymbolValue::Scalar(datum)) => datum.clone(),
            Some(SymbolValue::Vector(items)) => items.first().cloned().unwrap_or_else(Datum::null),
            Some(SymbolValue::Pointer(_)) => Datum::word(),
            None if self.hoisted.contains(&name) => Datum::word(),
            None => return Err(self.undefined(&name)),
        };
        Ok(Expression::LValue(name, datum))
    }

    fn parse_vector_lvalue(&self, node: AstNode<'_>) -> Result<Expression> {
        let name = node.root_text()?;
        if !self.symbols.is_defined(&name) && !self.hoisted.contains(&name) {
            return Err(self.undefined(&name));
        }
        let index = self.parse(node.left()?)?;
        let index_text = match &index {
            Expression::Literal(datum) => datum.value.clone(),
            other => other.spelling(),
        };
        let element = self.element_datum(&name, &index_text);
        Ok(Expression::LValue(format!("{}[{}]", name, index_text), element))
    }

    fn element_datum(&self, name: &str, index: &str) -> Datum {
        match self.symbols.lookup(name) {
            Some(SymbolValue::Vector(items)) => index
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i))
                .or_else(|| items.first())
                .cloned()
                .unwrap_or_else(Datum::null),
            Some(SymbolValue::Scalar(datum)) if datum.tag == TypeTag::Byte => {
                Datum::new("'0'", TypeTag::Byte, 1)
            }
            _ => Datum::word(),
        }
    }

    fn parse_indirect_lvalue(&self, node: AstNode<'_>) -> Result<Expression> {
        let target = node.left()?;
        let name = target.root_text()?;
        if !self.symbols.is_defined(&name) {
            return Err(self.undefined(&name));
        }
        let datum = self
            .symbols
            .pointer_target(&name)
            .and_then(|t| self.symbols.lookup_scalar(t).cloned())
            .unwrap_or_else(Datum::word);
        Ok(Expression::LValue(format!("*{}", name), datum))
    }

    fn parse_assignment(&self, node: AstNode<'_>) -> Result<Expression> {
        let lhs = self.parse(node.left()?)?;
        if !matches!(lhs, Expression::LValue(..)) {
            return Err(CompileError::new(
                ErrorKind::InvalidStatement,
                "invalid assignment target",
            ));
        }
        let rhs = self.parse(node.right()?)?;
        // compound assignment `=op` desugars to `lhs = lhs op rhs`
        let rhs = match node
            .root_operator_suffix()
            .as_deref()
            .and_then(Operator::binary_from_spelling)
        {
            Some(op) => Expression::Relation(op, vec![lhs.clone(), rhs]),
            None => rhs,
        };
        Ok(Expression::Symbol(Box::new(lhs), Box::new(rhs)))
    }

    fn parse_function(&self, node: AstNode<'_>) -> Result<Expression> {
        let callee_node = node.left()?;
        let name = callee_node.root_text()?;
        if !self.symbols.is_defined(&name) && !self.hoisted.contains(&name) {
            return Err(self.undefined(&name));
        }
        let callee = Expression::LValue(name, Datum::word());
        let right = node.right()?;
        let mut args = Vec::new();
        if !right.is_null() {
            for arg in right.as_array()? {
                if arg.is_null() {
                    continue;
                }
                args.push(self.parse(arg)?);
            }
        }
        Ok(Expression::Function(Box::new(callee), args))
    }

    fn parse_relation(&self, node: AstNode<'_>) -> Result<Expression> {
        let spelling = node.root_operator()?;
        let op = Operator::binary_from_spelling(&spelling).ok_or_else(|| {
            CompileError::invalid_ast(format!("unknown relation operator \"{}\"", spelling))
        })?;
        if op == Operator::BTernary {
            // cond ? then : else lowers as four operands with a sentinel 1
            let cond = self.parse(node.left()?)?;
            let arms = node.right()?.as_array()?;
            if arms.len() != 2 {
                return Err(CompileError::invalid_ast("ternary expects two arms"));
            }
            let then_arm = self.parse(arms[0])?;
            let else_arm = self.parse(arms[1])?;
            return Ok(Expression::Relation(
                op,
                vec![cond, then_arm, else_arm, Expression::Literal(Datum::int("1"))],
            ));
        }
        let lhs = self.parse(node.left()?)?;
        let rhs = self.parse(node.right()?)?;
        Ok(Expression::Relation(op, vec![lhs, rhs]))
    }

    fn parse_unary(&self, node: AstNode<'_>) -> Result<Expression> {
        let spelling = node.root_operator()?;
        let op = Operator::unary_from_spelling(&spelling).ok_or_else(|| {
            CompileError::invalid_ast(format!("unknown unary operator \"{}\"", spelling))
        })?;
        let sub = self.parse(node.left()?)?;
        Ok(Expression::Unary(op, Box::new(sub)))
    }

    fn parse_inc_dec(&self, node: AstNode<'_>, prefix: bool) -> Result<Expression> {
        let spelling = node.root_operator()?;
        let op = match (spelling.as_str(), prefix) {
            ("++", true) => Operator::PreInc,
            ("++", false) => Operator::PostInc,
            ("--", true) => Operator::PreDec,
            ("--", false) => Operator::PostDec,
            _ => {
                return Err(CompileError::invalid_ast(format!(
                    "unknown increment operator \"{}\"",
                    spelling
                )));
            }
        };
        let sub = self.parse(node.left()?)?;
        Ok(Expression::Unary(op, Box::new(sub)))
    }

    fn parse_address_of(&self, node: AstNode<'_>) -> Result<Expression> {
        let sub = self.parse(node.left()?)?;
        Ok(Expression::Unary(Operator::UAddrOf, Box::new(sub)))
    }

    /// Parse a vector definition's initialiser list; every entry must be
    /// a constant.
    pub fn parse_initialiser(&self, nodes: &[AstNode<'_>]) -> Result<Expression> {
        let mut items = Vec::with_capacity(nodes.len());
        for node in nodes {
            if node.is_null() {
                continue;
            }
            match self.parse(*node)? {
                Expression::Literal(datum) => items.push(datum),
                _ => {
                    return Err(CompileError::invalid_ast(
                        "vector initialiser is not a literal",
                    ));
                }
            }
        }
        Ok(Expression::Array(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_one(symbols: &SymbolTable, value: serde_json::Value) -> Result<Expression> {
        let hoisted = HoistedSymbols::empty();
        let parser = ExpressionParser::new(symbols, &hoisted);
        parser.parse(AstNode::new(&value))
    }

    #[test]
    fn number_literals() {
        let symbols = SymbolTable::new();
        let expr = parse_one(&symbols, json!({ "node": "number_literal", "root": 5 })).unwrap();
        assert_eq!(expr, Expression::Literal(Datum::int("5")));
    }

    #[test]
    fn string_strips_quotes_and_decodes_escapes() {
        let symbols = SymbolTable::new();
        let expr = parse_one(
            &symbols,
            json!({ "node": "string_literal", "root": "\"hi*n\"" }),
        )
        .unwrap();
        assert_eq!(expr, Expression::Literal(Datum::string("hi\n")));
    }

    #[test]
    fn character_constant_keeps_numeric_code() {
        let symbols = SymbolTable::new();
        let expr =
            parse_one(&symbols, json!({ "node": "constant_literal", "root": "'9'" })).unwrap();
        assert_eq!(
            expr,
            Expression::Literal(Datum::new("'57'", TypeTag::Byte, 1))
        );
    }

    #[test]
    fn undefined_lvalue_is_an_error() {
        let symbols = SymbolTable::new();
        let err = parse_one(&symbols, json!({ "node": "lvalue", "root": "x" })).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol);
    }

    #[test]
    fn assignment_requires_lvalue_target() {
        let mut symbols = SymbolTable::new();
        symbols.define_scalar("x", Datum::null());
        let err = parse_one(
            &symbols,
            json!({
                "node": "assignment_expression",
                "root": ["=", null],
                "left": { "node": "number_literal", "root": 1 },
                "right": { "node": "number_literal", "root": 2 },
            }),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidStatement);
    }

    #[test]
    fn compound_assignment_desugars() {
        let mut symbols = SymbolTable::new();
        symbols.define_scalar("x", Datum::null());
        let expr = parse_one(
            &symbols,
            json!({
                "node": "assignment_expression",
                "root": ["=", "+"],
                "left": { "node": "lvalue", "root": "x" },
                "right": { "node": "number_literal", "root": 2 },
            }),
        )
        .unwrap();
        let Expression::Symbol(_, rhs) = expr else {
            panic!("expected assignment");
        };
        assert!(matches!(*rhs, Expression::Relation(Operator::BAdd, _)));
    }

    #[test]
    fn ternary_has_four_operands() {
        let mut symbols = SymbolTable::new();
        symbols.define_scalar("x", Datum::null());
        let expr = parse_one(
            &symbols,
            json!({
                "node": "relation_expression",
                "root": ["?"],
                "left": { "node": "lvalue", "root": "x" },
                "right": [
                    { "node": "number_literal", "root": 1 },
                    { "node": "number_literal", "root": 2 },
                ],
            }),
        )
        .unwrap();
        let Expression::Relation(Operator::BTernary, args) = expr else {
            panic!("expected ternary relation");
        };
        assert_eq!(args.len(), 4);
        assert_eq!(args[3], Expression::Literal(Datum::int("1")));
    }

    #[test]
    fn vector_lvalue_spelling() {
        let mut symbols = SymbolTable::new();
        symbols.define(
            "mess",
            SymbolValue::Vector(vec![Datum::string("too bad"), Datum::string("tough luck")]),
        );
        symbols.define_scalar("i", Datum::null());
        let expr = parse_one(
            &symbols,
            json!({
                "node": "vector_lvalue",
                "root": "mess",
                "left": { "node": "number_literal", "root": 1 },
            }),
        )
        .unwrap();
        let Expression::LValue(name, datum) = expr else {
            panic!("expected lvalue");
        };
        assert_eq!(name, "mess[1]");
        assert_eq!(datum, Datum::string("tough luck"));
    }

    #[test]
    fn initialiser_lists_become_arrays() {
        let symbols = SymbolTable::new();
        let hoisted = HoistedSymbols::empty();
        let parser = ExpressionParser::new(&symbols, &hoisted);
        let values = [
            json!({ "node": "string_literal", "root": "\"too bad\"" }),
            json!({ "node": "number_literal", "root": 7 }),
        ];
        let nodes: Vec<AstNode<'_>> = values.iter().map(AstNode::new).collect();
        let expr = parser.parse_initialiser(&nodes).unwrap();
        let Expression::Array(items) = expr else {
            panic!("expected an array");
        };
        assert_eq!(items, [Datum::string("too bad"), Datum::int("7")]);
    }

    #[test]
    fn indirect_lvalue_spelling() {
        let mut symbols = SymbolTable::new();
        symbols.define("k", SymbolValue::Pointer("m".into()));
        symbols.define_scalar("m", Datum::int("3"));
        let expr = parse_one(
            &symbols,
            json!({
                "node": "indirect_lvalue",
                "left": { "node": "lvalue", "root": "k" },
            }),
        )
        .unwrap();
        assert_eq!(expr, Expression::LValue("*k".into(), Datum::int("3")));
    }
}
