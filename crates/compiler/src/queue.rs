//! Operand queue construction
//!
//! Flattens an `Expression` tree into a precedence-ordered linear
//! sequence of operand handles and operator tokens for the temporary
//! builder. A `Pointer` (parenthesised) sub-expression nested under an
//! operator stays a single operand, which defers its reshaping until both
//! sides of the surrounding operator have been emitted; at the root of a
//! statement it is transparent.
//!
//! Call arguments are staged through `_pN` parameter slots: slots are
//! numbered in pre-order across nested calls, each argument is assigned
//! into its slot, and the slots are pushed in reverse before `CALL`.

use crate::expr::Expression;
use blang_core::Operator;
use blang_core::types::Datum;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum QueueItem {
    Operand(Rc<Expression>),
    Op(Operator),
}

pub type RValueQueue = Vec<QueueItem>;

pub struct QueueBuilder<'a> {
    queue: RValueQueue,
    /// `_pN` slot counter; function-scoped, like the temporary counter.
    slot: &'a mut i32,
}

impl<'a> QueueBuilder<'a> {
    pub fn new(slot: &'a mut i32) -> Self {
        QueueBuilder {
            queue: Vec::new(),
            slot,
        }
    }

    pub fn build(mut self, expression: &Expression) -> RValueQueue {
        // the grouping barrier is meaningless at statement root
        let mut root = expression;
        while let Expression::Pointer(sub) = root {
            root = sub;
        }
        self.enqueue(root);
        self.queue
    }

    fn push_operand(&mut self, expression: Expression) {
        self.queue.push(QueueItem::Operand(Rc::new(expression)));
    }

    fn enqueue(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(_)
            | Expression::LValue(..)
            | Expression::Pointer(_)
            | Expression::Array(_) => {
                self.push_operand(expression.clone());
            }
            Expression::Unary(op, sub) => {
                self.enqueue(sub);
                self.queue.push(QueueItem::Op(*op));
            }
            Expression::Relation(op, args) if args.len() == 4 => {
                // ternary: cond, then, else flatten; the sentinel stays in
                // the tree and is balanced by the builder's trailing POP
                self.enqueue(&args[0]);
                self.enqueue(&args[1]);
                self.enqueue(&args[2]);
                self.queue.push(QueueItem::Op(*op));
            }
            Expression::Relation(op, args) => {
                for arg in args {
                    self.enqueue(arg);
                }
                self.queue.push(QueueItem::Op(*op));
            }
            Expression::Symbol(lhs, rhs) => {
                // LHS operand first: it waits at the bottom of the operand
                // stack while the RHS queue runs
                self.push_operand((**lhs).clone());
                self.enqueue(rhs);
                self.queue.push(QueueItem::Op(Operator::BAssign));
            }
            Expression::Function(callee, args) => {
                let mut slots = Vec::with_capacity(args.len());
                for arg in args {
                    *self.slot += 1;
                    let name = format!("_p{}", self.slot);
                    slots.push(name.clone());
                    self.push_operand(Expression::LValue(name, Datum::word()));
                    self.enqueue(arg);
                    self.queue.push(QueueItem::Op(Operator::BAssign));
                }
                for name in slots.iter().rev() {
                    self.push_operand(Expression::LValue(name.clone(), Datum::word()));
                    self.queue.push(QueueItem::Op(Operator::UPush));
                }
                self.push_operand((**callee).clone());
                self.queue.push(QueueItem::Op(Operator::UCall));
            }
        }
    }
}

/// Flatten one statement-level expression.
pub fn expression_to_queue(expression: &Expression, slot: &mut i32) -> RValueQueue {
    QueueBuilder::new(slot).build(expression)
}
