//! ITA construction: statement AST -> labelled linear quadruples
//!
//! Structured control flow lowers to labelled jumps through a stack of
//! continuation labels. Each block produces two streams: predicate and
//! straight-line instructions stay inline, branch bodies collect
//! separately and append at the end of the enclosing block. Fall-through
//! is arranged so a false predicate lands on the construct's
//! continuation label without an extra jump.
//!
//! Auto-allocated labels (`_LN`) and temporaries (`_tN`) share one
//! counter that resets at every function entry, as do the `_pN` argument
//! slots.

use crate::ast::{AstNode, HoistedSymbols};
use crate::error::{CompileError, ErrorKind, Result};
use crate::expr::{Expression, ExpressionParser};
use crate::queue::expression_to_queue;
use crate::runtime;
use crate::temp::queue_to_instructions;
use blang_core::quad::{Opcode, Quadruple, make_label, make_temporary, quad, quad3};
use blang_core::types::{Datum, TypeTag};
use blang_core::{SymbolTable, SymbolValue};

/// Continuation-label stack. The top is the innermost continuation; the
/// root handle anchors the function's fall-through to `LEAVE`.
#[derive(Debug, Default)]
pub struct Branch {
    stack: Vec<Quadruple>,
    root: Option<Quadruple>,
}

impl Branch {
    fn with_root(root: Quadruple) -> Self {
        Branch {
            stack: Vec::new(),
            root: Some(root),
        }
    }

    fn push(&mut self, label: Quadruple) {
        self.stack.push(label);
    }

    fn pop(&mut self) -> Option<Quadruple> {
        self.stack.pop()
    }

    fn peek(&self) -> Option<&Quadruple> {
        self.stack.last()
    }

    fn root(&self) -> Option<&Quadruple> {
        self.root.as_ref()
    }
}

pub struct ItaBuilder<'a> {
    pub symbols: SymbolTable,
    pub globals: SymbolTable,
    hoisted: &'a HoistedSymbols,
    counter: i32,
    slot: i32,
    branch: Branch,
    current_function: Option<String>,
}

impl<'a> ItaBuilder<'a> {
    pub fn new(hoisted: &'a HoistedSymbols) -> Self {
        ItaBuilder {
            symbols: SymbolTable::new(),
            globals: SymbolTable::new(),
            hoisted,
            counter: 0,
            slot: 0,
            branch: Branch::default(),
            current_function: None,
        }
    }

    fn locate(&self, err: CompileError, name: &str) -> CompileError {
        if err.location.is_some() {
            return err;
        }
        match self.hoisted.location_of(name) {
            Some(location) => err.at(location),
            None => match &self.current_function {
                Some(function) => err.at(format!("in function {}", function)),
                None => err,
            },
        }
    }

    /// Program entry: vector definitions first, then functions in source
    /// order.
    pub fn build_from_definitions(&mut self, node: AstNode<'_>) -> Result<Vec<Quadruple>> {
        node.expect_kind("program")?;
        node.expect_root("definitions")?;
        let definitions = node.left()?.as_array()?;
        for definition in &definitions {
            if !definition.is_null() && definition.kind()? == "vector_definition" {
                self.build_from_vector_definition(*definition)?;
            }
        }
        let mut instructions = Vec::new();
        for definition in &definitions {
            if !definition.is_null() && definition.kind()? == "function_definition" {
                instructions.extend(self.build_from_function_definition(*definition)?);
            }
        }
        Ok(instructions)
    }

    pub fn build_from_vector_definition(&mut self, node: AstNode<'_>) -> Result<()> {
        node.expect_kind("vector_definition")?;
        let name = node.root_text()?;
        let size_node = node.left()?;
        let values_node = node.right()?;
        let parser = ExpressionParser::new(&self.symbols, self.hoisted);
        let values = if values_node.is_null() {
            Vec::new()
        } else {
            values_node.as_array()?
        };
        if values.is_empty() {
            // size-only definition; the declared size lives in the
            // hoisted symbol entry, the symbol keeps the size literal
            let size = match parser.parse(size_node)? {
                Expression::Literal(datum) => datum,
                _ => {
                    return Err(self.locate(
                        CompileError::invalid_ast("vector size is not a literal"),
                        &name,
                    ));
                }
            };
            self.globals.define_scalar(&name, size);
            return Ok(());
        }
        let declared = size_node.root()?.as_int().unwrap_or(-1);
        if declared != values.len() as i64 {
            return Err(self.locate(
                CompileError::new(
                    ErrorKind::InvalidAst,
                    "invalid vector definition, size of vector and value entries do not match",
                ),
                &name,
            ));
        }
        let initialiser = parser
            .parse_initialiser(&values)
            .map_err(|err| self.locate(err, &name))?;
        let Expression::Array(items) = initialiser else {
            return Err(self.locate(
                CompileError::invalid_ast("vector initialiser is malformed"),
                &name,
            ));
        };
        self.globals.define(&name, SymbolValue::Vector(items));
        Ok(())
    }

    pub fn build_from_function_definition(&mut self, node: AstNode<'_>) -> Result<Vec<Quadruple>> {
        node.expect_kind("function_definition")?;
        let name = node.root_text()?;
        self.current_function = Some(name.clone());
        let parameters = node.left()?;
        let block = node.right()?;

        self.symbols.define_scalar(&name, Datum::word());

        let mut bound = Vec::new();
        let mut suffix = Vec::new();
        if parameters.is_array() {
            for ident in parameters.as_array()? {
                if ident.is_null() {
                    continue;
                }
                match ident.kind()? {
                    "lvalue" => {
                        let parameter = ident.root_text()?;
                        self.symbols.define_scalar(&parameter, Datum::word());
                        suffix.push(parameter.clone());
                        bound.push(parameter);
                    }
                    "vector_lvalue" => {
                        let parameter = ident.root_text()?;
                        let size = ident.left()?.root()?.as_int()?;
                        self.symbols.define_scalar(
                            &parameter,
                            Datum::new("'0'", TypeTag::Byte, size.max(0) as usize),
                        );
                        suffix.push(parameter.clone());
                        bound.push(parameter);
                    }
                    "indirect_lvalue" => {
                        let parameter = ident.left()?.root_text()?;
                        self.symbols.define_scalar(&parameter, Datum::word());
                        suffix.push(format!("*{}", parameter));
                        bound.push(parameter);
                    }
                    other => {
                        return Err(CompileError::invalid_ast(format!(
                            "unexpected parameter node \"{}\"",
                            other
                        )));
                    }
                }
            }
        }

        // the label carries the parameter list; the object table parses
        // it back out of the parenthesised suffix
        let label = if suffix.is_empty() {
            format!("__{}", name)
        } else {
            format!("__{}({})", name, suffix.join(","))
        };

        let mut instructions = vec![quad(Opcode::Label, label, ""), quad(Opcode::FuncStart, "", "")];

        self.counter = 0;
        self.slot = 0;
        let root_label = make_label(&mut self.counter);
        self.branch = Branch::with_root(root_label);

        instructions.extend(self.build_from_block_statement(block, true)?);
        instructions.push(quad(Opcode::FuncEnd, "", ""));

        for parameter in bound {
            self.symbols.remove(&parameter);
        }
        self.current_function = None;
        Ok(instructions)
    }

    pub fn build_from_block_statement(
        &mut self,
        node: AstNode<'_>,
        root_function_scope: bool,
    ) -> Result<Vec<Quadruple>> {
        node.expect_kind("statement")?;
        node.expect_root("block")?;
        let statements = node.left()?.as_array()?;
        let mut stream = Vec::new();
        let mut branches = Vec::new();
        self.build_statements(&statements, &mut stream, &mut branches)?;
        if root_function_scope {
            let root = self
                .branch
                .root()
                .cloned()
                .ok_or_else(|| CompileError::invalid_ast("function scope has no root branch"))?;
            stream.push(root);
            stream.push(quad(Opcode::Leave, "", ""));
        } else {
            self.seal_branch_fall_through(&mut stream, &branches);
        }
        stream.extend(branches);
        Ok(stream)
    }

    /// Inside a nested block the branch bodies are appended directly
    /// behind the inline stream; a convergence label at the stream's end
    /// must not fall through into them. Route the fall-through to the
    /// enclosing continuation instead. (The root scope needs no seal: the
    /// root label and `LEAVE` already sit in between.)
    fn seal_branch_fall_through(&self, stream: &mut Vec<Quadruple>, branches: &[Quadruple]) {
        if branches.is_empty() || stream.last().is_some_and(Quadruple::is_jump) {
            return;
        }
        if let Some(target) = self.branch.peek() {
            stream.push(quad(Opcode::Goto, target.op1.clone(), ""));
        }
    }

    fn build_statements(
        &mut self,
        statements: &[AstNode<'_>],
        stream: &mut Vec<Quadruple>,
        branches: &mut Vec<Quadruple>,
    ) -> Result<()> {
        for statement in statements {
            if statement.is_null() {
                continue;
            }
            statement.expect_kind("statement")?;
            match statement.root_text()?.as_str() {
                "auto" => self.build_from_auto_statement(*statement, stream)?,
                "extrn" => self.build_from_extrn_statement(*statement, stream)?,
                "if" => {
                    let (inline, body) = self.build_from_if_statement(*statement)?;
                    stream.extend(inline);
                    branches.extend(body);
                }
                "while" => {
                    let (inline, body) = self.build_from_while_statement(*statement)?;
                    stream.extend(inline);
                    branches.extend(body);
                }
                "switch" => {
                    let (inline, body) = self.build_from_switch_statement(*statement)?;
                    stream.extend(inline);
                    branches.extend(body);
                }
                "rvalue" => {
                    let (instructions, _) = self.lower_rvalue_node(statement.left()?)?;
                    stream.extend(instructions);
                }
                "label" => stream.extend(self.build_from_label_statement(*statement)?),
                "goto" => stream.extend(self.build_from_goto_statement(*statement)?),
                "return" => stream.extend(self.build_from_return_statement(*statement)?),
                "block" => {
                    let inner = self.build_from_block_statement(*statement, false)?;
                    stream.extend(inner);
                }
                "break" => {
                    return Err(CompileError::new(
                        ErrorKind::InvalidStatement,
                        "break outside of a switch case",
                    ));
                }
                "case" => {
                    return Err(CompileError::new(
                        ErrorKind::InvalidStatement,
                        "case outside of a switch",
                    ));
                }
                other => {
                    return Err(CompileError::invalid_ast(format!(
                        "unknown statement kind \"{}\"",
                        other
                    )));
                }
            }
        }
        Ok(())
    }

    /// A branch body is either a block or a single statement.
    fn lower_branch_body(&mut self, node: AstNode<'_>) -> Result<Vec<Quadruple>> {
        if node.is_null() {
            return Ok(Vec::new());
        }
        if node.root_text()? == "block" {
            return self.build_from_block_statement(node, false);
        }
        let mut stream = Vec::new();
        let mut branches = Vec::new();
        self.build_statements(&[node], &mut stream, &mut branches)?;
        self.seal_branch_fall_through(&mut stream, &branches);
        stream.extend(branches);
        Ok(stream)
    }

    /// Lower an rvalue node (an expression, or the front end's
    /// line-grouped arrays of expressions) to instructions. Also returns
    /// the spelling of the final operand for value positions that emit no
    /// instructions (`return(x)`).
    fn lower_rvalue_node(
        &mut self,
        node: AstNode<'_>,
    ) -> Result<(Vec<Quadruple>, Option<String>)> {
        let mut instructions = Vec::new();
        let mut last_operand = None;
        if node.is_array() {
            for expression in node.as_array()? {
                if expression.is_null() {
                    continue;
                }
                if expression.is_array() {
                    for inner in expression.as_array()? {
                        if inner.is_null() {
                            continue;
                        }
                        self.lower_one_expression(inner, &mut instructions, &mut last_operand)?;
                    }
                } else {
                    self.lower_one_expression(expression, &mut instructions, &mut last_operand)?;
                }
            }
        } else {
            self.lower_one_expression(node, &mut instructions, &mut last_operand)?;
        }
        Ok((instructions, last_operand))
    }

    fn lower_one_expression(
        &mut self,
        node: AstNode<'_>,
        instructions: &mut Vec<Quadruple>,
        last_operand: &mut Option<String>,
    ) -> Result<()> {
        let expression = {
            let parser = ExpressionParser::new(&self.symbols, self.hoisted);
            parser.parse(node)?
        };
        check_call_arities(&expression)?;
        let queue = expression_to_queue(&expression, &mut self.slot);
        let lowered = queue_to_instructions(&queue, &mut self.counter);
        if lowered.is_empty() {
            *last_operand = Some(expression.spelling());
        } else {
            *last_operand = None;
        }
        instructions.extend(lowered);
        Ok(())
    }

    /// Turn a predicate into a "truthy" comparator so `IF` always reads a
    /// single named value.
    fn build_comparator(
        &mut self,
        node: AstNode<'_>,
        stream: &mut Vec<Quadruple>,
    ) -> Result<String> {
        let expression = {
            let parser = ExpressionParser::new(&self.symbols, self.hoisted);
            parser.parse(node)?
        };
        check_call_arities(&expression)?;
        let mut root = &expression;
        while let Expression::Pointer(sub) = root {
            root = sub;
        }
        match root {
            Expression::Literal(_) | Expression::LValue(..) => {
                let temp =
                    make_temporary(&mut self.counter, format!("CMP {}", root.spelling()));
                let name = temp.op1.clone();
                stream.push(temp);
                Ok(name)
            }
            Expression::Function(..) => {
                let queue = expression_to_queue(root, &mut self.slot);
                stream.extend(queue_to_instructions(&queue, &mut self.counter));
                let temp = make_temporary(&mut self.counter, "CMP RET");
                let name = temp.op1.clone();
                stream.push(temp);
                Ok(name)
            }
            _ => {
                let queue = expression_to_queue(root, &mut self.slot);
                let lowered = queue_to_instructions(&queue, &mut self.counter);
                stream.extend(lowered);
                match stream.last() {
                    Some(last) => Ok(last.op1.clone()),
                    None => {
                        let temp =
                            make_temporary(&mut self.counter, format!("CMP {}", root.spelling()));
                        let name = temp.op1.clone();
                        stream.push(temp);
                        Ok(name)
                    }
                }
            }
        }
    }

    fn build_from_if_statement(
        &mut self,
        node: AstNode<'_>,
    ) -> Result<(Vec<Quadruple>, Vec<Quadruple>)> {
        node.expect_root("if")?;
        let predicate = node.left()?;
        let blocks = node.right()?.as_array()?;
        if blocks.is_empty() {
            return Err(CompileError::invalid_ast("if statement has no body"));
        }

        let mut stream = Vec::new();
        let mut branches = Vec::new();

        let cont = make_label(&mut self.counter);
        let jump = make_label(&mut self.counter);

        let comparator = self.build_comparator(predicate, &mut stream)?;
        stream.push(quad3(Opcode::If, comparator, Opcode::Goto.spelling(), jump.op1.clone()));

        self.branch.push(cont.clone());
        branches.push(jump);
        branches.extend(self.lower_branch_body(blocks[0])?);

        let has_else = blocks.len() > 1 && !blocks[1].is_null();
        if has_else {
            let else_label = make_label(&mut self.counter);
            if !branches.last().is_some_and(Quadruple::is_jump) {
                branches.push(quad(Opcode::Goto, cont.op1.clone(), ""));
            }
            stream.push(quad(Opcode::Goto, else_label.op1.clone(), ""));
            branches.push(else_label);
            branches.extend(self.lower_branch_body(blocks[1])?);
        }
        // convergence point; a false predicate falls through here
        stream.push(cont.clone());

        if !branches.last().is_some_and(Quadruple::is_jump) {
            let target = self.branch.peek().map(|label| label.op1.clone());
            if let Some(target) = target {
                branches.push(quad(Opcode::Goto, target, ""));
            }
        }
        self.branch.pop();
        Ok((stream, branches))
    }

    fn build_from_while_statement(
        &mut self,
        node: AstNode<'_>,
    ) -> Result<(Vec<Quadruple>, Vec<Quadruple>)> {
        node.expect_root("while")?;
        let predicate = node.left()?;
        let blocks = node.right()?.as_array()?;
        if blocks.is_empty() {
            return Err(CompileError::invalid_ast("while statement has no body"));
        }

        let mut stream = Vec::new();
        let mut branches = Vec::new();

        let start = make_label(&mut self.counter);
        let cont = make_label(&mut self.counter);
        let jump = make_label(&mut self.counter);

        stream.push(start.clone());
        let comparator = self.build_comparator(predicate, &mut stream)?;
        stream.push(quad3(Opcode::If, comparator, Opcode::Goto.spelling(), jump.op1.clone()));
        // predicate false falls through to the continuation
        stream.push(cont);

        self.branch.push(start);
        branches.push(jump);
        branches.extend(self.lower_branch_body(blocks[0])?);
        if !branches.last().is_some_and(Quadruple::is_jump) {
            let target = self.branch.peek().map(|label| label.op1.clone());
            if let Some(target) = target {
                // loop back to re-test the predicate
                branches.push(quad(Opcode::Goto, target, ""));
            }
        }
        self.branch.pop();
        Ok((stream, branches))
    }

    fn build_from_switch_statement(
        &mut self,
        node: AstNode<'_>,
    ) -> Result<(Vec<Quadruple>, Vec<Quadruple>)> {
        node.expect_root("switch")?;
        let predicate = node.left()?;
        let cases = node.right()?.as_array()?;

        let mut stream = Vec::new();
        let mut branches = Vec::new();

        let comparator = self.build_comparator(predicate, &mut stream)?;

        let mut case_starts: Vec<Quadruple> = Vec::new();
        let mut last_case_open = false;
        for case in &cases {
            if case.is_null() {
                continue;
            }
            case.expect_kind("statement")?;
            case.expect_root("case")?;

            let start = make_label(&mut self.counter);
            let jump = make_label(&mut self.counter);
            self.branch.push(start.clone());

            let value = {
                let parser = ExpressionParser::new(&self.symbols, self.hoisted);
                parser.parse(case.left()?)?
            };
            let Expression::Literal(value) = value else {
                return Err(CompileError::new(
                    ErrorKind::InvalidAst,
                    "case value is not a constant",
                ));
            };
            stream.push(quad3(
                Opcode::JmpE,
                comparator.clone(),
                value.format(),
                jump.op1.clone(),
            ));

            let mut body_statements = case.right()?.as_array()?;
            let had_break = body_statements
                .last()
                .map(|statement| {
                    !statement.is_null()
                        && statement.root_text().as_deref().unwrap_or_default() == "break"
                })
                .unwrap_or(false);
            if had_break {
                body_statements.pop();
            }

            branches.push(jump);
            let mut case_stream = Vec::new();
            let mut case_branches = Vec::new();
            self.build_statements(&body_statements, &mut case_stream, &mut case_branches)?;
            // a case whose body carries nested branches cannot fall
            // through to the next case; it exits via its start label
            self.seal_branch_fall_through(&mut case_stream, &case_branches);
            case_stream.extend(case_branches);
            branches.extend(case_stream);

            if had_break && !branches.last().is_some_and(Quadruple::is_jump) {
                // break exits through the case's own start label, which
                // unwinds to the common landing pad below
                branches.push(quad(Opcode::Goto, start.op1.clone(), ""));
            }
            last_case_open = !had_break;
            self.branch.pop();
            case_starts.push(start);
        }

        if last_case_open
            && !branches.last().is_some_and(Quadruple::is_jump)
            && let Some(last_start) = case_starts.last()
        {
            branches.push(quad(Opcode::Goto, last_start.op1.clone(), ""));
        }

        // fall-through landing pad: the collected case labels unwind in
        // reverse, adjacent, at the end of the inline stream
        for start in case_starts.into_iter().rev() {
            stream.push(start);
        }
        Ok((stream, branches))
    }

    fn build_from_label_statement(&mut self, node: AstNode<'_>) -> Result<Vec<Quadruple>> {
        node.expect_root("label")?;
        let names = node.left()?.as_array()?;
        let name = names
            .first()
            .ok_or_else(|| CompileError::invalid_ast("label statement has no name"))?
            .as_text()?;
        Ok(vec![quad(Opcode::Label, format!("_L_{}", name), "")])
    }

    fn build_from_goto_statement(&mut self, node: AstNode<'_>) -> Result<Vec<Quadruple>> {
        node.expect_root("goto")?;
        let names = node.left()?.as_array()?;
        let name = names
            .first()
            .ok_or_else(|| CompileError::invalid_ast("goto statement has no target"))?
            .as_text()?;
        if self.hoisted.kind_of(name) != Some("label") {
            return Err(self.locate(
                CompileError::new(
                    ErrorKind::UndefinedSymbol,
                    format!("label \"{}\" does not exist", name),
                ),
                name,
            ));
        }
        Ok(vec![quad(Opcode::Goto, format!("_L_{}", name), "")])
    }

    fn build_from_return_statement(&mut self, node: AstNode<'_>) -> Result<Vec<Quadruple>> {
        node.expect_root("return")?;
        let (mut instructions, last_operand) = self.lower_rvalue_node(node.left()?)?;
        let value = match instructions.last() {
            Some(last) => last.op1.clone(),
            None => last_operand.unwrap_or_default(),
        };
        instructions.push(quad(Opcode::Ret, value, ""));
        Ok(instructions)
    }

    fn build_from_auto_statement(
        &mut self,
        node: AstNode<'_>,
        stream: &mut Vec<Quadruple>,
    ) -> Result<()> {
        node.expect_root("auto")?;
        for ident in node.left()?.as_array()? {
            if ident.is_null() {
                continue;
            }
            match ident.kind()? {
                "lvalue" => {
                    let name = ident.root_text()?;
                    self.symbols.define_scalar(&name, Datum::null());
                    stream.push(quad(Opcode::Locl, name, ""));
                }
                "vector_lvalue" => {
                    let name = ident.root_text()?;
                    let size = ident.left()?.root()?.as_int()?;
                    self.symbols.define_scalar(
                        &name,
                        Datum::new("'0'", TypeTag::Byte, size.max(0) as usize),
                    );
                    stream.push(quad(Opcode::Locl, name, ""));
                }
                "indirect_lvalue" => {
                    let name = ident.left()?.root_text()?;
                    self.symbols.define_scalar(&name, Datum::word());
                    stream.push(quad(Opcode::Locl, format!("*{}", name), ""));
                }
                other => {
                    return Err(CompileError::invalid_ast(format!(
                        "unexpected auto declarator \"{}\"",
                        other
                    )));
                }
            }
        }
        Ok(())
    }

    fn build_from_extrn_statement(
        &mut self,
        node: AstNode<'_>,
        stream: &mut Vec<Quadruple>,
    ) -> Result<()> {
        node.expect_root("extrn")?;
        for ident in node.left()?.as_array()? {
            if ident.is_null() {
                continue;
            }
            let name = ident.root_text()?;
            let Some(global) = self.globals.lookup(&name).cloned() else {
                return Err(self.locate(
                    CompileError::new(
                        ErrorKind::UndefinedSymbol,
                        format!("global symbol \"{}\" not defined for extrn statement", name),
                    ),
                    &name,
                ));
            };
            self.symbols.define(&name, global);
            stream.push(quad(Opcode::Globl, name, ""));
        }
        Ok(())
    }
}

/// Reject calls with impossible argument counts against the runtime
/// catalog before lowering.
fn check_call_arities(expression: &Expression) -> Result<()> {
    match expression {
        Expression::Function(callee, args) => {
            if let Expression::LValue(name, _) = callee.as_ref() {
                runtime::check_call_arity(name, args.len())?;
            }
            for arg in args {
                check_call_arities(arg)?;
            }
            Ok(())
        }
        Expression::Unary(_, sub) | Expression::Pointer(sub) => check_call_arities(sub),
        Expression::Relation(_, args) => {
            for arg in args {
                check_call_arities(arg)?;
            }
            Ok(())
        }
        Expression::Symbol(lhs, rhs) => {
            check_call_arities(lhs)?;
            check_call_arities(rhs)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::emit;
    use serde_json::{Value, json};

    fn hoisted(entries: &[(&str, &str)]) -> HoistedSymbols {
        let mut map = serde_json::Map::new();
        for (name, kind) in entries {
            map.insert(
                (*name).to_string(),
                json!({ "type": kind, "line": 1, "column": 1 }),
            );
        }
        HoistedSymbols::new(Value::Object(map)).unwrap()
    }

    fn statement(root: &str, left: Value) -> Value {
        json!({ "node": "statement", "root": root, "left": left })
    }

    fn auto(names: &[&str]) -> Value {
        let idents: Vec<Value> = names
            .iter()
            .map(|name| json!({ "node": "lvalue", "root": name }))
            .collect();
        statement("auto", Value::Array(idents))
    }

    fn number(value: i64) -> Value {
        json!({ "node": "number_literal", "root": value })
    }

    fn lvalue(name: &str) -> Value {
        json!({ "node": "lvalue", "root": name })
    }

    fn assign(target: &str, rhs: Value) -> Value {
        json!({
            "node": "assignment_expression",
            "root": ["=", null],
            "left": lvalue(target),
            "right": rhs,
        })
    }

    fn relation(op: &str, lhs: Value, rhs: Value) -> Value {
        json!({
            "node": "relation_expression",
            "root": [op],
            "left": lhs,
            "right": rhs,
        })
    }

    fn rvalue_statement(expression: Value) -> Value {
        statement("rvalue", json!([[expression]]))
    }

    fn block(statements: Vec<Value>) -> Value {
        json!({
            "node": "statement",
            "root": "block",
            "left": statements,
        })
    }

    fn function(name: &str, parameters: Value, body: Value) -> Value {
        json!({
            "node": "function_definition",
            "root": name,
            "left": parameters,
            "right": body,
        })
    }

    fn build(symbols: &HoistedSymbols, definition: Value) -> String {
        let mut builder = ItaBuilder::new(symbols);
        let instructions = builder
            .build_from_function_definition(AstNode::new(&definition))
            .unwrap();
        emit(&instructions)
    }

    #[test]
    fn assignment_with_call_and_grouping() {
        // S1: main() { auto x; x = exp(5, 5) * (6 + 6); }
        let symbols = hoisted(&[
            ("main", "function_definition"),
            ("exp", "function_definition"),
            ("x", "lvalue"),
        ]);
        let call = json!({
            "node": "function_expression",
            "root": "exp",
            "left": lvalue("exp"),
            "right": [number(5), number(5)],
        });
        let group = json!({
            "node": "evaluated_expression",
            "left": relation("+", number(6), number(6)),
        });
        let body = block(vec![
            auto(&["x"]),
            rvalue_statement(assign("x", relation("*", call, group))),
        ]);
        let text = build(&symbols, function("main", json!([null]), body));
        assert_eq!(
            text,
            "\
__main:
 BeginFunc ;
LOCL x;
_p1 = (5:int:4);
_p2 = (5:int:4);
PUSH _p2;
PUSH _p1;
CALL exp;
POP 16;
_t2 = RET;
_t3 = _t2;
_t4 = (6:int:4) + (6:int:4);
_t5 = _t3 * _t4;
x = _t5;
_L1:
LEAVE;
 EndFunc ;
"
        );
    }

    #[test]
    fn recursion_with_relational_or() {
        // S2: exp(x, y) { if (x == 1 || y == 1) return(x * y);
        //                 return(exp(x - 1, y - 1)); }
        let symbols = hoisted(&[("exp", "function_definition")]);
        let predicate = relation(
            "==",
            lvalue("x"),
            relation("||", number(1), relation("==", lvalue("y"), number(1))),
        );
        let then_return = statement("return", json!([relation("*", lvalue("x"), lvalue("y"))]));
        let recursive_call = json!({
            "node": "function_expression",
            "root": "exp",
            "left": lvalue("exp"),
            "right": [
                relation("-", lvalue("x"), number(1)),
                relation("-", lvalue("y"), number(1)),
            ],
        });
        let body = block(vec![
            json!({
                "node": "statement",
                "root": "if",
                "left": predicate,
                "right": [then_return, null],
            }),
            statement("return", json!([recursive_call])),
        ]);
        let parameters = json!([lvalue("x"), lvalue("y")]);
        let text = build(&symbols, function("exp", parameters, body));
        assert_eq!(
            text,
            "\
__exp(x,y):
 BeginFunc ;
_t4 = y == (1:int:4);
_t5 = (1:int:4) || _t4;
_t6 = x == _t5;
IF _t6 GOTO _L3;
_L2:
_t8 = x - (1:int:4);
_p1 = _t8;
_t9 = y - (1:int:4);
_p2 = _t9;
PUSH _p2;
PUSH _p1;
CALL exp;
POP 16;
_t10 = RET;
RET _t10;
_L1:
LEAVE;
_L3:
_t7 = x * y;
RET _t7;
 EndFunc ;
"
        );
    }

    #[test]
    fn while_loops_retest_their_predicates() {
        // S3: two sequential loops, then a trailing assignment
        let symbols = hoisted(&[("main", "function_definition")]);
        let post_dec = |name: &str| {
            json!({
                "node": "post_inc_dec_expression",
                "root": ["--"],
                "left": lvalue(name),
            })
        };
        let post_inc = |name: &str| {
            json!({
                "node": "post_inc_dec_expression",
                "root": ["++"],
                "left": lvalue(name),
            })
        };
        let loop_one = json!({
            "node": "statement",
            "root": "while",
            "left": relation(">=", lvalue("x"), number(0)),
            "right": [block(vec![
                rvalue_statement(post_dec("x")),
                rvalue_statement(post_dec("y")),
                rvalue_statement(assign("x", lvalue("y"))),
            ])],
        });
        let loop_two = json!({
            "node": "statement",
            "root": "while",
            "left": relation("<=", lvalue("x"), number(100)),
            "right": [rvalue_statement(post_inc("x"))],
        });
        let body = block(vec![
            auto(&["x", "y"]),
            rvalue_statement(assign("x", number(1))),
            rvalue_statement(assign("y", number(10))),
            loop_one,
            loop_two,
            rvalue_statement(assign("x", number(2))),
        ]);
        let text = build(&symbols, function("main", json!([null]), body));
        assert_eq!(
            text,
            "\
__main:
 BeginFunc ;
LOCL x;
LOCL y;
x = (1:int:4);
y = (10:int:4);
_L2:
_t5 = x >= (0:int:4);
IF _t5 GOTO _L4;
_L3:
_L6:
_t9 = x <= (100:int:4);
IF _t9 GOTO _L8;
_L7:
x = (2:int:4);
_L1:
LEAVE;
_L4:
x = --x;
y = --y;
x = y;
GOTO _L2;
_L8:
x = ++x;
GOTO _L6;
 EndFunc ;
"
        );
    }

    #[test]
    fn switch_with_fall_through_and_break() {
        // S4: case 1 falls through into case 2; case 0 and 2 break
        let symbols = hoisted(&[("main", "function_definition")]);
        let case = |value: i64, statements: Vec<Value>| {
            json!({
                "node": "statement",
                "root": "case",
                "left": number(value),
                "right": statements,
            })
        };
        let break_statement = json!({ "node": "statement", "root": "break" });
        let switch = json!({
            "node": "statement",
            "root": "switch",
            "left": lvalue("x"),
            "right": [
                case(0, vec![rvalue_statement(assign("y", number(1))), break_statement.clone()]),
                case(1, vec![rvalue_statement(assign("y", number(2)))]),
                case(2, vec![rvalue_statement(assign("x", number(5))), break_statement]),
            ],
        });
        let body = block(vec![
            auto(&["x", "y"]),
            rvalue_statement(assign("x", number(5))),
            switch,
            rvalue_statement(assign("y", number(10))),
        ]);
        let text = build(&symbols, function("main", json!([null]), body));
        assert_eq!(
            text,
            "\
__main:
 BeginFunc ;
LOCL x;
LOCL y;
x = (5:int:4);
_t2 = CMP x;
JMP_E _t2 (0:int:4) _L4;
JMP_E _t2 (1:int:4) _L6;
JMP_E _t2 (2:int:4) _L8;
_L7:
_L5:
_L3:
y = (10:int:4);
_L1:
LEAVE;
_L4:
y = (1:int:4);
GOTO _L3;
_L6:
y = (2:int:4);
_L8:
x = (5:int:4);
GOTO _L7;
 EndFunc ;
"
        );
    }

    #[test]
    fn goto_targets_a_translated_label() {
        // S5: a forward label, a call, and a back-edge goto
        let symbols = hoisted(&[
            ("main", "function_definition"),
            ("add", "function_definition"),
            ("ADD", "label"),
        ]);
        let call = json!({
            "node": "function_expression",
            "root": "add",
            "left": lvalue("add"),
            "right": [number(2), number(5)],
        });
        let body = block(vec![
            auto(&["x", "y"]),
            statement("label", json!(["ADD"])),
            rvalue_statement(assign("x", call)),
            rvalue_statement(assign("y", number(10))),
            statement("goto", json!(["ADD"])),
        ]);
        let text = build(&symbols, function("main", json!([null]), body));
        assert_eq!(
            text,
            "\
__main:
 BeginFunc ;
LOCL x;
LOCL y;
_L_ADD:
_p1 = (2:int:4);
_p2 = (5:int:4);
PUSH _p2;
PUSH _p1;
CALL add;
POP 16;
_t2 = RET;
x = _t2;
y = (10:int:4);
GOTO _L_ADD;
_L1:
LEAVE;
 EndFunc ;
"
        );
    }

    #[test]
    fn goto_to_an_unknown_label_is_rejected() {
        let symbols = hoisted(&[("main", "function_definition")]);
        let body = block(vec![statement("goto", json!(["NOWHERE"]))]);
        let mut builder = ItaBuilder::new(&symbols);
        let definition = function("main", json!([null]), body);
        let err = builder
            .build_from_function_definition(AstNode::new(&definition))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol);
    }

    #[test]
    fn if_else_routes_both_arms_to_the_convergence_label() {
        let symbols = hoisted(&[("main", "function_definition")]);
        let if_else = json!({
            "node": "statement",
            "root": "if",
            "left": lvalue("x"),
            "right": [
                rvalue_statement(assign("y", number(1))),
                rvalue_statement(assign("y", number(2))),
            ],
        });
        let body = block(vec![auto(&["x", "y"]), if_else]);
        let text = build(&symbols, function("main", json!([null]), body));
        assert_eq!(
            text,
            "\
__main:
 BeginFunc ;
LOCL x;
LOCL y;
_t4 = CMP x;
IF _t4 GOTO _L3;
GOTO _L5;
_L2:
_L1:
LEAVE;
_L3:
y = (1:int:4);
GOTO _L2;
_L5:
y = (2:int:4);
GOTO _L2;
 EndFunc ;
"
        );
    }

    #[test]
    fn extrn_requires_a_global() {
        let symbols = hoisted(&[("main", "function_definition")]);
        let body = block(vec![statement(
            "extrn",
            json!([{ "node": "lvalue", "root": "mess" }]),
        )]);
        let mut builder = ItaBuilder::new(&symbols);
        let definition = function("main", json!([null]), body);
        let err = builder
            .build_from_function_definition(AstNode::new(&definition))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndefinedSymbol);
    }

    #[test]
    fn vector_definitions_populate_globals_first() {
        let symbols = hoisted(&[
            ("main", "function_definition"),
            ("mess", "vector_lvalue"),
        ]);
        let program = json!({
            "node": "program",
            "root": "definitions",
            "left": [
                function(
                    "main",
                    json!([null]),
                    block(vec![statement(
                        "extrn",
                        json!([{ "node": "lvalue", "root": "mess" }]),
                    )]),
                ),
                {
                    "node": "vector_definition",
                    "root": "mess",
                    "left": number(2),
                    "right": [
                        { "node": "string_literal", "root": "\"too bad\"" },
                        { "node": "string_literal", "root": "\"tough luck\"" },
                    ],
                },
            ],
        });
        let mut builder = ItaBuilder::new(&symbols);
        let instructions = builder
            .build_from_definitions(AstNode::new(&program))
            .unwrap();
        let text = emit(&instructions);
        assert!(text.contains("GLOBL mess;"));
        assert_eq!(
            builder.globals.lookup("mess").unwrap().as_vector().unwrap().len(),
            2
        );
    }

    #[test]
    fn temporaries_are_assigned_exactly_once_per_function() {
        // invariant 1: every _tN target appears once in the stream
        let symbols = hoisted(&[
            ("main", "function_definition"),
            ("exp", "function_definition"),
        ]);
        let call = json!({
            "node": "function_expression",
            "root": "exp",
            "left": lvalue("exp"),
            "right": [number(5), number(5)],
        });
        let body = block(vec![
            auto(&["x"]),
            rvalue_statement(assign("x", relation("+", call, number(1)))),
        ]);
        let mut builder = ItaBuilder::new(&symbols);
        let definition = function("main", json!([null]), body);
        let instructions = builder
            .build_from_function_definition(AstNode::new(&definition))
            .unwrap();
        let mut seen = std::collections::HashSet::new();
        for quadruple in &instructions {
            if quadruple.op == Opcode::Mov && quadruple.op1.starts_with("_t") {
                assert!(seen.insert(quadruple.op1.clone()), "{} assigned twice", quadruple.op1);
            }
        }
    }

    #[test]
    fn nested_branches_route_through_the_enclosing_loop() {
        // while (x >= 5) { if (x > 1) x = 0; } -- the if's convergence
        // label must loop back to the re-test, not fall into the then-arm
        let symbols = hoisted(&[("main", "function_definition")]);
        let nested = json!({
            "node": "statement",
            "root": "if",
            "left": relation(">", lvalue("x"), number(1)),
            "right": [rvalue_statement(assign("x", number(0))), null],
        });
        let outer = json!({
            "node": "statement",
            "root": "while",
            "left": relation(">=", lvalue("x"), number(5)),
            "right": [block(vec![nested])],
        });
        let body = block(vec![auto(&["x"]), outer]);
        let text = build(&symbols, function("main", json!([null]), body));
        assert_eq!(
            text,
            "\
__main:
 BeginFunc ;
LOCL x;
_L2:
_t5 = x >= (5:int:4);
IF _t5 GOTO _L4;
_L3:
_L1:
LEAVE;
_L4:
_t8 = x > (1:int:4);
IF _t8 GOTO _L7;
_L6:
GOTO _L2;
_L7:
x = (0:int:4);
GOTO _L6;
 EndFunc ;
"
        );
    }

    #[test]
    fn if_targets_exist_within_the_function() {
        // invariant 4: every IF target label is emitted later
        let symbols = hoisted(&[("main", "function_definition")]);
        let nested = json!({
            "node": "statement",
            "root": "if",
            "left": relation(">", lvalue("x"), number(1)),
            "right": [rvalue_statement(assign("x", number(0))), null],
        });
        let outer = json!({
            "node": "statement",
            "root": "while",
            "left": relation(">=", lvalue("x"), number(5)),
            "right": [block(vec![nested])],
        });
        let body = block(vec![auto(&["x"]), outer]);
        let mut builder = ItaBuilder::new(&symbols);
        let definition = function("main", json!([null]), body);
        let instructions = builder
            .build_from_function_definition(AstNode::new(&definition))
            .unwrap();
        let labels: std::collections::HashSet<_> = instructions
            .iter()
            .filter(|q| q.op == Opcode::Label)
            .map(|q| q.op1.clone())
            .collect();
        for quadruple in &instructions {
            if quadruple.op == Opcode::If {
                assert!(labels.contains(&quadruple.op3), "missing {}", quadruple.op3);
            }
        }
    }
}
