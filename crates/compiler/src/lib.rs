//! blang compiler middle end
//!
//! Consumes the front end's two JSON values (the hoisted symbol map and
//! the program tree), lowers the program to ITA quadruples, runs the
//! object-table pass over them, and emits the textual ITA stream plus
//! the data-section side sets the native back ends consume.
//!
//! ```text
//! symbols.json + ast.json
//!        |
//!   ItaBuilder      (expressions -> queue -> temporaries, branches)
//!        |
//!   object table    (frames, pointer/vector discipline, literals)
//!        |
//!   textual ITA + data-section side sets
//! ```

pub mod ast;
pub mod config;
pub mod emit;
pub mod error;
pub mod expr;
pub mod ita;
pub mod object;
pub mod queue;
pub mod runtime;
pub mod table;
pub mod temp;

pub use ast::{AstNode, HoistedSymbols};
pub use config::BlangConfig;
pub use error::{CompileError, ErrorKind, Result};
pub use ita::ItaBuilder;
pub use object::ObjectTable;

use tracing::debug;

/// Everything a back end needs from one invocation.
#[derive(Debug)]
pub struct CompileOutput {
    /// The canonical textual ITA stream.
    pub text: String,
    /// Checked instructions, in emission order.
    pub instructions: Vec<blang_core::Quadruple>,
    /// Frames, vectors, and the rip-relative literal sets.
    pub objects: ObjectTable,
}

/// Compile a parsed program: hoist, lower, type-check, emit.
pub fn compile(
    symbols: serde_json::Value,
    program: serde_json::Value,
    config: &BlangConfig,
) -> Result<CompileOutput> {
    let mut hoisted = HoistedSymbols::new(symbols)?;
    runtime::inject(
        &mut hoisted,
        config.os()?,
        config.arch()?,
        config.inject_syscalls,
    );

    let mut builder = ItaBuilder::new(&hoisted);
    let instructions = builder.build_from_definitions(AstNode::new(&program))?;
    debug!(instructions = instructions.len(), "lowered program to ITA");

    let globals = builder.globals.clone();
    let (instructions, objects) = table::build_object_table(instructions, hoisted, globals)?;
    debug!(
        functions = objects.functions.len(),
        vectors = objects.vectors.len(),
        "object table sealed"
    );

    let text = emit::emit(&instructions);
    Ok(CompileOutput {
        text,
        instructions,
        objects,
    })
}

/// Compile from raw JSON text, the CLI entry point.
pub fn compile_from_json(
    symbols_json: &str,
    program_json: &str,
    config: &BlangConfig,
) -> Result<CompileOutput> {
    let symbols: serde_json::Value = serde_json::from_str(symbols_json)
        .map_err(|e| CompileError::invalid_ast(format!("symbol AST is not valid JSON: {}", e)))?;
    let program: serde_json::Value = serde_json::from_str(program_json)
        .map_err(|e| CompileError::invalid_ast(format!("program AST is not valid JSON: {}", e)))?;
    compile(symbols, program, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s1_program() -> (serde_json::Value, serde_json::Value) {
        let symbols = json!({
            "main": { "type": "function_definition", "line": 1, "column": 1 },
            "exp": { "type": "function_definition", "line": 6, "column": 1 },
            "x": { "type": "lvalue", "line": 2, "column": 8 },
        });
        let program = json!({
            "node": "program",
            "root": "definitions",
            "left": [{
                "node": "function_definition",
                "root": "main",
                "left": [null],
                "right": {
                    "node": "statement",
                    "root": "block",
                    "left": [
                        {
                            "node": "statement",
                            "root": "auto",
                            "left": [{ "node": "lvalue", "root": "x" }],
                        },
                        {
                            "node": "statement",
                            "root": "rvalue",
                            "left": [[{
                                "node": "assignment_expression",
                                "root": ["=", null],
                                "left": { "node": "lvalue", "root": "x" },
                                "right": {
                                    "node": "relation_expression",
                                    "root": ["*"],
                                    "left": {
                                        "node": "function_expression",
                                        "root": "exp",
                                        "left": { "node": "lvalue", "root": "exp" },
                                        "right": [
                                            { "node": "number_literal", "root": 5 },
                                            { "node": "number_literal", "root": 5 },
                                        ],
                                    },
                                    "right": {
                                        "node": "evaluated_expression",
                                        "left": {
                                            "node": "relation_expression",
                                            "root": ["+"],
                                            "left": { "node": "number_literal", "root": 6 },
                                            "right": { "node": "number_literal", "root": 6 },
                                        },
                                    },
                                },
                            }]],
                        },
                    ],
                },
            }],
        });
        (symbols, program)
    }

    #[test]
    fn end_to_end_pipeline_produces_checked_ita() {
        let (symbols, program) = s1_program();
        let output = compile(symbols, program, &BlangConfig::default()).unwrap();
        assert!(output.text.contains("__main:"));
        assert!(output.text.contains("CALL exp;"));
        assert!(output.text.contains("x = _t5;"));
        let frame = output.objects.functions.get("main").unwrap();
        assert!(frame.locals.is_defined("x"));
    }

    #[test]
    fn calls_against_the_runtime_catalog_resolve() {
        let symbols = json!({
            "main": { "type": "function_definition", "line": 1, "column": 1 },
        });
        let program = json!({
            "node": "program",
            "root": "definitions",
            "left": [{
                "node": "function_definition",
                "root": "main",
                "left": [null],
                "right": {
                    "node": "statement",
                    "root": "block",
                    "left": [{
                        "node": "statement",
                        "root": "rvalue",
                        "left": [[{
                            "node": "function_expression",
                            "root": "putchar",
                            "left": { "node": "lvalue", "root": "putchar" },
                            "right": [{ "node": "number_literal", "root": 65 }],
                        }]],
                    }],
                },
            }],
        });
        let output = compile(symbols, program, &BlangConfig::default()).unwrap();
        assert!(output.text.contains("CALL putchar;"));
        // void library call: no RET temporary follows the POP
        assert!(!output.text.contains("RET;"));
    }

    #[test]
    fn malformed_json_is_an_invalid_ast_error() {
        let err = compile_from_json("{", "{}", &BlangConfig::default()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAst);
    }
}
