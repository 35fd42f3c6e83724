//! Formula operators

use gridcalc_core::{CompareToken, FormulaError, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
    Concatenate,
    Compare(CompareToken),
    Negate,
    UnaryPlus,
    Percent,
}

impl Operator {
    /// Operator for a token with the given operand count
    pub fn parse(token: &str, arity: usize) -> Option<Self> {
        match (token, arity) {
            ("+", 2) => Some(Operator::Plus),
            ("-", 2) => Some(Operator::Minus),
            ("*", 2) => Some(Operator::Multiply),
            ("/", 2) => Some(Operator::Divide),
            ("^", 2) => Some(Operator::Power),
            ("&", 2) => Some(Operator::Concatenate),
            ("-", 1) => Some(Operator::Negate),
            ("+", 1) => Some(Operator::UnaryPlus),
            ("%", 1) => Some(Operator::Percent),
            (other, 2) => CompareToken::from_token(other).map(Operator::Compare),
            _ => None,
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Operator::Negate | Operator::UnaryPlus | Operator::Percent => 1,
            _ => 2,
        }
    }

    /// Apply to forced operand values. A wrong operand count is `#VALUE!`.
    pub fn apply(self, operands: &[Value]) -> Value {
        match (self, operands) {
            (Operator::Negate, [x]) => x.negative(),
            (Operator::UnaryPlus, [x]) => x.clone(),
            (Operator::Percent, [x]) => x.percent(),
            (Operator::Plus, [a, b]) => a.plus(b),
            (Operator::Minus, [a, b]) => a.minus(b),
            (Operator::Multiply, [a, b]) => a.multiply(b),
            (Operator::Divide, [a, b]) => a.divided(b),
            (Operator::Power, [a, b]) => a.power(b),
            (Operator::Concatenate, [a, b]) => a.concatenate_back(b),
            (Operator::Compare(op), [a, b]) => a.compare(b, op),
            (op, operands) => Value::Error(FormulaError::arg_count(
                &format!("{:?}", op),
                &op.arity().to_string(),
                operands.len(),
            )),
        }
    }
}
