//! ITA text emission
//!
//! The textual stream is the canonical interchange with the back ends.
//! Binary right-hand sides travel whole in `op2`, so `MOV` prints the
//! concatenation of `op2` and `op3`; the pair is only split for in-place
//! unaries (`x = --x;`).

use blang_core::quad::{Opcode, Quadruple};
use std::fmt::Write;

pub fn emit_quadruple(out: &mut String, quadruple: &Quadruple) {
    match quadruple.op {
        Opcode::Label => {
            let _ = writeln!(out, "{}:", quadruple.op1);
        }
        Opcode::FuncStart | Opcode::FuncEnd => {
            let _ = writeln!(out, " {} ;", quadruple.op.spelling());
        }
        Opcode::Leave => {
            let _ = writeln!(out, "LEAVE;");
        }
        Opcode::Goto | Opcode::Push | Opcode::Pop | Opcode::Call | Opcode::Ret | Opcode::Locl
        | Opcode::Globl => {
            let _ = writeln!(out, "{} {};", quadruple.op.spelling(), quadruple.op1);
        }
        Opcode::If => {
            let _ = writeln!(out, "IF {} GOTO {};", quadruple.op1, quadruple.op3);
        }
        Opcode::JmpE => {
            let _ = writeln!(
                out,
                "JMP_E {} {} {};",
                quadruple.op1, quadruple.op2, quadruple.op3
            );
        }
        Opcode::Mov => {
            let _ = writeln!(out, "{} = {}{};", quadruple.op1, quadruple.op2, quadruple.op3);
        }
        Opcode::Cmp | Opcode::Noop => {}
    }
}

pub fn emit(instructions: &[Quadruple]) -> String {
    let mut out = String::new();
    for quadruple in instructions {
        emit_quadruple(&mut out, quadruple);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blang_core::quad::{quad, quad3};

    #[test]
    fn textual_forms() {
        let program = [
            quad(Opcode::Label, "__exp(x,y)", ""),
            quad(Opcode::FuncStart, "", ""),
            quad(Opcode::Locl, "x", ""),
            quad(Opcode::Mov, "_t2", "(5:int:4) || (2:int:4)"),
            quad3(Opcode::Mov, "x", "--", "x"),
            quad3(Opcode::If, "_t2", "GOTO", "_L4"),
            quad3(Opcode::JmpE, "_t2", "(0:int:4)", "_L4"),
            quad(Opcode::Push, "_p1", ""),
            quad(Opcode::Pop, "16", ""),
            quad(Opcode::Call, "exp", ""),
            quad(Opcode::Ret, "_t2", ""),
            quad(Opcode::Goto, "_L1", ""),
            quad(Opcode::Leave, "", ""),
            quad(Opcode::FuncEnd, "", ""),
        ];
        let expected = "\
__exp(x,y):
 BeginFunc ;
LOCL x;
_t2 = (5:int:4) || (2:int:4);
x = --x;
IF _t2 GOTO _L4;
JMP_E _t2 (0:int:4) _L4;
PUSH _p1;
POP 16;
CALL exp;
RET _t2;
GOTO _L1;
LEAVE;
 EndFunc ;
";
        assert_eq!(emit(&program), expected);
    }
}
