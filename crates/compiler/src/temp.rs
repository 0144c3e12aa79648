//! Temporary construction: operand queue -> straight-line quadruples
//!
//! Consumes a precedence-ordered queue and emits `MOV` quadruples over
//! freshly-minted `_tN` names. Two stacks drive the translation: raw
//! operand handles not yet consumed, and the names of temporaries already
//! holding sub-results.
//!
//! Example:
//!
//! ```text
//! main() {
//!   auto x;
//!   x = (5 + 5) * (6 + 6);
//! }
//! ```
//!
//! becomes
//!
//! ```text
//! __main:
//!  BeginFunc ;
//! _t2 = (5:int:4) + (5:int:4);
//! _t3 = (6:int:4) + (6:int:4);
//! _t4 = _t2 * _t3;
//! x = _t4;
//! _L1:
//! LEAVE;
//!  EndFunc ;
//! ```

use crate::expr::Expression;
use crate::queue::{QueueItem, RValueQueue};
use crate::runtime;
use blang_core::Operator;
use blang_core::quad::{Opcode, Quadruple, make_temporary, quad, quad3};
use blang_core::types::{Datum, WORD_SIZE, is_parameter_slot};
use std::rc::Rc;

/// Resolve an operand to a name, emitting instructions for any compound
/// sub-expression along the way. Literals and lvalues inline their
/// spelling; parenthesised groups recurse; relations and unaries mint a
/// temporary for their result.
fn materialize(
    operand: &Expression,
    counter: &mut i32,
    instructions: &mut Vec<Quadruple>,
) -> String {
    match operand {
        Expression::Literal(datum) => datum.format(),
        Expression::LValue(name, _) => name.clone(),
        Expression::Pointer(sub) => materialize(sub, counter, instructions),
        Expression::Unary(op, sub) => {
            let name = materialize(sub, counter, instructions);
            let temp = make_temporary(counter, format!("{} {}", op, name));
            let result = temp.op1.clone();
            instructions.push(temp);
            result
        }
        Expression::Relation(op, args) if args.len() == 2 => {
            let lhs = materialize(&args[0], counter, instructions);
            let rhs = materialize(&args[1], counter, instructions);
            let temp = make_temporary(counter, format!("{} {} {}", lhs, op, rhs));
            let result = temp.op1.clone();
            instructions.push(temp);
            result
        }
        Expression::Relation(_, args) if args.len() == 4 => {
            let cond = materialize(&args[0], counter, instructions);
            let then_arm = materialize(&args[1], counter, instructions);
            let else_arm = materialize(&args[2], counter, instructions);
            ternary_chain(cond, then_arm, else_arm, counter, instructions)
        }
        Expression::Relation(op, _) => op.spelling().to_string(),
        Expression::Function(callee, _) => callee.spelling(),
        Expression::Symbol(lhs, _) => lhs.spelling(),
        Expression::Array(_) => String::new(),
    }
}

/// `_tA = C ? T; _tB = _tA : E; POP 8` -- the trailing POP balances the
/// sentinel the queue discipline accounts for, whether or not the value
/// is consumed.
fn ternary_chain(
    cond: String,
    then_arm: String,
    else_arm: String,
    counter: &mut i32,
    instructions: &mut Vec<Quadruple>,
) -> String {
    let first = make_temporary(counter, format!("{} ? {}", cond, then_arm));
    let first_name = first.op1.clone();
    instructions.push(first);
    let second = make_temporary(counter, format!("{} : {}", first_name, else_arm));
    let result = second.op1.clone();
    instructions.push(second);
    instructions.push(quad(Opcode::Pop, WORD_SIZE.to_string(), ""));
    result
}

pub struct TemporaryBuilder<'a> {
    operands: Vec<Rc<Expression>>,
    temporaries: Vec<String>,
    pub instructions: Vec<Quadruple>,
    counter: &'a mut i32,
    params_on_stack: i32,
}

impl<'a> TemporaryBuilder<'a> {
    pub fn new(counter: &'a mut i32) -> Self {
        TemporaryBuilder {
            operands: Vec::new(),
            temporaries: Vec::new(),
            instructions: Vec::new(),
            counter,
            params_on_stack: 0,
        }
    }

    pub fn run(mut self, queue: &RValueQueue) -> Vec<Quadruple> {
        for item in queue {
            match item {
                QueueItem::Operand(operand) => self.operands.push(Rc::clone(operand)),
                QueueItem::Op(op) => self.apply(*op),
            }
        }
        self.instructions
    }

    fn apply(&mut self, op: Operator) {
        match op {
            Operator::BAssign => self.assignment(),
            Operator::UCall => self.call(),
            Operator::UPush => self.push_argument(),
            Operator::BTernary => self.ternary(),
            _ if op.is_binary() => self.binary(op),
            _ => self.unary(op),
        }
    }

    fn materialize_operand(&mut self, operand: &Expression) -> String {
        materialize(operand, self.counter, &mut self.instructions)
    }

    fn mint(&mut self, rhs: String) -> String {
        let temp = make_temporary(self.counter, rhs);
        let name = temp.op1.clone();
        self.instructions.push(temp);
        name
    }

    /// Binary pop policy, three cases in priority order.
    fn binary(&mut self, op: Operator) {
        if self.temporaries.len() >= 2 {
            // two pending sub-results: combine them directly
            let rhs = self.temporaries.pop().unwrap();
            let lhs = self.temporaries.pop().unwrap();
            let name = self.mint(format!("{} {} {}", lhs, op, rhs));
            self.temporaries.push(name);
            return;
        }
        if self.temporaries.len() == 1 && !self.operands.is_empty() {
            // one pending sub-result (the left side; its queue segment ran
            // first) plus a raw operand on the right
            let pending = self.temporaries.pop().unwrap();
            let lhs = self.mint(pending);
            let operand = self.operands.pop().unwrap();
            let rhs = self.materialize_operand(&operand);
            let name = self.mint(format!("{} {} {}", lhs, op, rhs));
            self.temporaries.push(name);
            return;
        }
        if self.operands.len() >= 2 {
            // raw operands only; the synthesized result goes back on the
            // operand stack so a relation chain threads left-to-right
            let rhs_operand = self.operands.pop().unwrap();
            let lhs_operand = self.operands.pop().unwrap();
            let lhs = self.materialize_operand(&lhs_operand);
            let rhs = self.materialize_operand(&rhs_operand);
            let name = self.mint(format!("{} {} {}", lhs, op, rhs));
            self.operands
                .push(Rc::new(Expression::LValue(name, Datum::word())));
            return;
        }
        if let Some(operand) = self.operands.pop() {
            // degenerate: a single raw operand against whatever the last
            // instruction produced
            let rhs = self.materialize_operand(&operand);
            if let Some(last) = self.instructions.last() {
                let lhs = last.op1.clone();
                let name = self.mint(format!("{} {} {}", lhs, op, rhs));
                self.temporaries.push(name);
            }
        }
    }

    fn unary(&mut self, op: Operator) {
        // in-place operators mutate the lvalue waiting on the operand
        // stack; value unaries apply to the pending sub-result first
        if op.is_in_place()
            && let Some(Expression::LValue(name, _)) = self.operands.last().map(|o| o.as_ref())
        {
            let name = name.clone();
            self.instructions
                .push(quad3(Opcode::Mov, name.clone(), op.spelling(), name));
            return;
        }
        if let Some(pending) = self.temporaries.pop() {
            let name = self.mint(format!("{} {}", op, pending));
            self.temporaries.push(name);
            return;
        }
        let Some(operand) = self.operands.pop() else {
            return;
        };
        let rhs = self.materialize_operand(&operand);
        let name = self.mint(format!("{} {}", op, rhs));
        self.temporaries.push(name);
    }

    fn assignment(&mut self) {
        if let Some(rhs) = self.temporaries.pop() {
            let Some(target) = self.operands.pop() else {
                return;
            };
            let lhs = self.materialize_operand(&target);
            self.instructions.push(quad(Opcode::Mov, lhs, rhs));
            return;
        }
        if self.operands.len() >= 2 {
            let rhs_operand = self.operands.pop().unwrap();
            let lhs_operand = self.operands.pop().unwrap();
            let lhs = self.materialize_operand(&lhs_operand);
            let rhs = self.materialize_operand(&rhs_operand);
            self.instructions.push(quad(Opcode::Mov, lhs, rhs));
            return;
        }
        if let Some(target) = self.operands.pop() {
            // the right-hand side already ran (a void-path call); bind the
            // target to the last produced lvalue
            let lhs = self.materialize_operand(&target);
            if let Some(last) = self.instructions.last() {
                let rhs = last.op1.clone();
                self.instructions.push(quad(Opcode::Mov, lhs, rhs));
            }
        }
    }

    fn call(&mut self) {
        let Some(callee) = self.operands.pop() else {
            return;
        };
        let name = self.materialize_operand(&callee);
        self.instructions.push(quad(Opcode::Call, name.clone(), ""));
        if self.params_on_stack > 0 {
            let bytes = self.params_on_stack as usize * WORD_SIZE;
            self.instructions.push(quad(Opcode::Pop, bytes.to_string(), ""));
        }
        self.params_on_stack = 0;
        if runtime::call_returns_value(&name) {
            let temp = self.mint("RET".to_string());
            self.temporaries.push(temp);
        }
    }

    fn push_argument(&mut self) {
        // the queue places the `_pN` slot operand directly before PUSH
        let from_slot = matches!(
            self.operands.last().map(|o| o.as_ref()),
            Some(Expression::LValue(name, _)) if is_parameter_slot(name)
        );
        let rhs = if from_slot {
            let operand = self.operands.pop().unwrap();
            self.materialize_operand(&operand)
        } else if let Some(pending) = self.temporaries.pop() {
            pending
        } else if let Some(operand) = self.operands.pop() {
            self.materialize_operand(&operand)
        } else {
            return;
        };
        self.instructions.push(quad(Opcode::Push, rhs, ""));
        self.params_on_stack += 1;
    }

    fn ternary(&mut self) {
        // pop order: else, then, cond; sub-results sit on the temporary
        // stack, raw values on the operand stack
        let mut pop_value = |builder: &mut Self| -> Option<String> {
            if let Some(pending) = builder.temporaries.pop() {
                return Some(pending);
            }
            let operand = builder.operands.pop()?;
            Some(builder.materialize_operand(&operand))
        };
        let Some(else_arm) = pop_value(self) else { return };
        let Some(then_arm) = pop_value(self) else { return };
        let Some(cond) = pop_value(self) else { return };
        let result = ternary_chain(cond, then_arm, else_arm, self.counter, &mut self.instructions);
        self.operands.push(Rc::new(Expression::LValue(
            result,
            Datum::word(),
        )));
    }
}

/// Lower one statement-level queue into quadruples.
pub fn queue_to_instructions(queue: &RValueQueue, counter: &mut i32) -> Vec<Quadruple> {
    if queue.is_empty() {
        return Vec::new();
    }
    TemporaryBuilder::new(counter).run(queue)
}
