//! The operator catalog
//!
//! One table drives both the expression parser and the operand-queue
//! builder; precedence 1 is assignment, 14 is postfix. "In-place"
//! operators mutate their lvalue operand directly and never mint a
//! temporary when applied to a plain lvalue.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    BAssign,
    BAdd,
    BSub,
    BMul,
    BDiv,
    BMod,
    BTernary,
    REq,
    RNeq,
    RLt,
    RGt,
    RLe,
    RGe,
    RAnd,
    ROr,
    PreInc,
    PostInc,
    PreDec,
    PostDec,
    UNot,
    UOnesComplement,
    UMinus,
    UPlus,
    UAddrOf,
    UIndirection,
    USubscript,
    UCall,
    UPush,
    And,
    Or,
    Xor,
    LShift,
    RShift,
}

impl Operator {
    pub fn spelling(self) -> &'static str {
        match self {
            Operator::BAssign => "=",
            Operator::BAdd => "+",
            Operator::BSub => "-",
            Operator::BMul => "*",
            Operator::BDiv => "/",
            Operator::BMod => "%",
            Operator::BTernary => "?",
            Operator::REq => "==",
            Operator::RNeq => "!=",
            Operator::RLt => "<",
            Operator::RGt => ">",
            Operator::RLe => "<=",
            Operator::RGe => ">=",
            Operator::RAnd => "&&",
            Operator::ROr => "||",
            Operator::PreInc | Operator::PostInc => "++",
            Operator::PreDec | Operator::PostDec => "--",
            Operator::UNot => "!",
            Operator::UOnesComplement => "~",
            Operator::UMinus => "-",
            Operator::UPlus => "+",
            Operator::UAddrOf => "&",
            Operator::UIndirection => "*",
            Operator::USubscript => "[]",
            Operator::UCall => "()",
            Operator::UPush => "push",
            Operator::And => "&",
            Operator::Or => "|",
            Operator::Xor => "^",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Operator::BAssign
            | Operator::BAdd
            | Operator::BSub
            | Operator::BMul
            | Operator::BDiv
            | Operator::BMod
            | Operator::BTernary
            | Operator::REq
            | Operator::RNeq
            | Operator::RLt
            | Operator::RGt
            | Operator::RLe
            | Operator::RGe
            | Operator::RAnd
            | Operator::ROr
            | Operator::And
            | Operator::Or
            | Operator::Xor
            | Operator::LShift
            | Operator::RShift => 2,
            _ => 1,
        }
    }

    pub fn precedence(self) -> u8 {
        match self {
            Operator::BAssign => 1,
            Operator::BTernary => 2,
            Operator::ROr => 3,
            Operator::RAnd => 4,
            Operator::Or => 5,
            Operator::Xor => 6,
            Operator::And => 7,
            Operator::REq | Operator::RNeq => 8,
            Operator::RLt | Operator::RGt | Operator::RLe | Operator::RGe => 9,
            Operator::LShift | Operator::RShift => 10,
            Operator::BAdd | Operator::BSub => 11,
            Operator::BMul | Operator::BDiv | Operator::BMod => 12,
            Operator::UNot
            | Operator::UOnesComplement
            | Operator::UMinus
            | Operator::UPlus
            | Operator::PreInc
            | Operator::PreDec
            | Operator::UAddrOf
            | Operator::UIndirection => 13,
            Operator::PostInc | Operator::PostDec | Operator::USubscript | Operator::UCall
            | Operator::UPush => 14,
        }
    }

    /// Mutates its lvalue operand directly.
    pub fn is_in_place(self) -> bool {
        matches!(
            self,
            Operator::PreInc | Operator::PostInc | Operator::PreDec | Operator::PostDec
        )
    }

    pub fn is_binary(self) -> bool {
        self.arity() == 2
    }

    /// Binary operator from an AST relation spelling.
    pub fn binary_from_spelling(spelling: &str) -> Option<Operator> {
        Some(match spelling {
            "+" => Operator::BAdd,
            "-" => Operator::BSub,
            "*" => Operator::BMul,
            "/" => Operator::BDiv,
            "%" => Operator::BMod,
            "==" => Operator::REq,
            "!=" => Operator::RNeq,
            "<" => Operator::RLt,
            ">" => Operator::RGt,
            "<=" => Operator::RLe,
            ">=" => Operator::RGe,
            "&&" => Operator::RAnd,
            "||" => Operator::ROr,
            "&" => Operator::And,
            "|" => Operator::Or,
            "^" => Operator::Xor,
            "<<" => Operator::LShift,
            ">>" => Operator::RShift,
            "?" => Operator::BTernary,
            _ => return None,
        })
    }

    /// Unary operator from an AST unary-expression spelling.
    pub fn unary_from_spelling(spelling: &str) -> Option<Operator> {
        Some(match spelling {
            "!" => Operator::UNot,
            "~" => Operator::UOnesComplement,
            "-" => Operator::UMinus,
            "+" => Operator::UPlus,
            "&" => Operator::UAddrOf,
            "*" => Operator::UIndirection,
            _ => return None,
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.spelling())
    }
}
