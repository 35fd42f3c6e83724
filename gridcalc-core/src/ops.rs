//! Operator algebra over value kinds
//!
//! Every binary operator is total over (kind x kind): it always yields a
//! `Value`, possibly an error. Errors short-circuit left to right, arrays
//! broadcast scalars cell by cell, and arithmetic is decimal exact.
//!
//! Coercion rules:
//! - `Null` is `0` in arithmetic, `""` against text, `FALSE` against booleans.
//! - Booleans are `1`/`0` in arithmetic and when compared with numbers.
//! - Text never becomes a number in arithmetic (`#VALUE!`).
//! - Across kinds, text orders above numbers and booleans.

use crate::wildcard;
use crate::{FormulaError, Number, NumberError, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Relational operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareToken {
    Equals,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl CompareToken {
    /// Longest tokens first so `<=` is not read as `<`
    const PREFIXES: [(&'static str, CompareToken); 6] = [
        ("<>", CompareToken::NotEqual),
        ("<=", CompareToken::LessThanOrEqual),
        (">=", CompareToken::GreaterThanOrEqual),
        ("<", CompareToken::LessThan),
        (">", CompareToken::GreaterThan),
        ("=", CompareToken::Equals),
    ];

    pub fn token(self) -> &'static str {
        match self {
            CompareToken::Equals => "=",
            CompareToken::NotEqual => "<>",
            CompareToken::LessThan => "<",
            CompareToken::LessThanOrEqual => "<=",
            CompareToken::GreaterThan => ">",
            CompareToken::GreaterThanOrEqual => ">=",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::PREFIXES.iter().find(|(t, _)| *t == token).map(|(_, op)| *op)
    }

    /// Split a leading relational token off `text`.
    pub fn split_prefix(text: &str) -> Option<(Self, &str)> {
        Self::PREFIXES
            .iter()
            .find_map(|(t, op)| text.strip_prefix(t).map(|rest| (*op, rest)))
    }

    /// Operator to use when the operands swap sides
    pub fn reverse(self) -> Self {
        match self {
            CompareToken::LessThan => CompareToken::GreaterThan,
            CompareToken::LessThanOrEqual => CompareToken::GreaterThanOrEqual,
            CompareToken::GreaterThan => CompareToken::LessThan,
            CompareToken::GreaterThanOrEqual => CompareToken::LessThanOrEqual,
            other => other,
        }
    }

    /// `None` means unordered (NaN): only `<>` holds.
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        let Some(ordering) = ordering else {
            return self == CompareToken::NotEqual;
        };
        match self {
            CompareToken::Equals => ordering == Ordering::Equal,
            CompareToken::NotEqual => ordering != Ordering::Equal,
            CompareToken::LessThan => ordering == Ordering::Less,
            CompareToken::LessThanOrEqual => ordering != Ordering::Greater,
            CompareToken::GreaterThan => ordering == Ordering::Greater,
            CompareToken::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for CompareToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arithmetic {
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
}

impl Arithmetic {
    fn apply(self, a: &Number, b: &Number) -> Value {
        let result = match self {
            Arithmetic::Plus => Ok(a.add(b)),
            Arithmetic::Minus => Ok(a.sub(b)),
            Arithmetic::Multiply => Ok(a.mul(b)),
            Arithmetic::Divide => a.checked_div(b),
            Arithmetic::Power => a.pow_real(b),
        };
        match result {
            Ok(n) if n.to_f64().is_some_and(f64::is_nan) => Value::Error(FormulaError::num()),
            Ok(n) => Value::Number(n),
            Err(e) => Value::Error(number_error(e)),
        }
    }
}

fn number_error(err: NumberError) -> FormulaError {
    FormulaError::from(err)
}

impl Value {
    // ========== Arithmetic ==========

    pub fn plus(&self, other: &Value) -> Value {
        self.arithmetic(other, Arithmetic::Plus)
    }

    pub fn minus(&self, other: &Value) -> Value {
        self.arithmetic(other, Arithmetic::Minus)
    }

    pub fn multiply(&self, other: &Value) -> Value {
        self.arithmetic(other, Arithmetic::Multiply)
    }

    /// Division by `0`, `FALSE` or an empty value is `#DIV/0!`.
    pub fn divided(&self, other: &Value) -> Value {
        self.arithmetic(other, Arithmetic::Divide)
    }

    pub fn power(&self, other: &Value) -> Value {
        self.arithmetic(other, Arithmetic::Power)
    }

    pub fn negative(&self) -> Value {
        Value::Number(Number::zero()).minus(self)
    }

    pub fn reciprocal(&self) -> Value {
        Value::Number(Number::one()).divided(self)
    }

    pub fn percent(&self) -> Value {
        self.divided(&Value::number(100))
    }

    fn arithmetic(&self, other: &Value, op: Arithmetic) -> Value {
        match (self, other) {
            (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e.clone()),
            (Value::Array(a), Value::Array(b)) => {
                Value::Array(a.zip_broadcast(b, |x, y| x.arithmetic(y, op)))
            }
            (Value::Array(a), scalar) => Value::Array(a.map(|x| x.arithmetic(scalar, op))),
            (scalar, Value::Array(b)) => Value::Array(b.map(|y| scalar.arithmetic(y, op))),
            (Value::Text(_), _) | (_, Value::Text(_)) => Value::Error(FormulaError::type_error(
                "Number",
                "Text",
            )),
            (
                Value::Null | Value::Bool(_) | Value::Number(_),
                Value::Null | Value::Bool(_) | Value::Number(_),
            ) => op.apply(&self.arithmetic_number(), &other.arithmetic_number()),
        }
    }

    /// Numeric view of a null, boolean or number operand
    fn arithmetic_number(&self) -> Number {
        match self {
            Value::Number(n) => n.clone(),
            Value::Bool(b) => Number::from_i64(i64::from(*b)),
            Value::Null | Value::Text(_) | Value::Error(_) | Value::Array(_) => Number::zero(),
        }
    }

    // ========== Comparison ==========

    /// Relational comparison, yielding a boolean (or an array of booleans).
    pub fn compare(&self, other: &Value, op: CompareToken) -> Value {
        match (self, other) {
            (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e.clone()),
            (Value::Array(a), Value::Array(b)) => {
                Value::Array(a.zip_broadcast(b, |x, y| x.compare(y, op)))
            }
            (Value::Array(a), scalar) => Value::Array(a.map(|x| x.compare(scalar, op))),
            (scalar, Value::Array(b)) => Value::Array(b.map(|y| scalar.compare(y, op))),
            _ => Value::Bool(op.holds(scalar_ordering(self, other))),
        }
    }

    /// Wildcard comparison against a `*`/`?`/`~` pattern.
    ///
    /// Only text matches a text pattern; `=` and `<>` test the match, the
    /// relational operators and every non-text pairing fall back to
    /// `compare`.
    pub fn wildcard(&self, pattern: &Value, op: CompareToken) -> Value {
        match (self, pattern) {
            (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e.clone()),
            (Value::Array(a), Value::Array(b)) => {
                Value::Array(a.zip_broadcast(b, |x, y| x.wildcard(y, op)))
            }
            (Value::Array(a), scalar) => Value::Array(a.map(|x| x.wildcard(scalar, op))),
            (scalar, Value::Array(b)) => Value::Array(b.map(|y| scalar.wildcard(y, op))),
            (Value::Text(text), Value::Text(pattern)) => match op {
                CompareToken::Equals => Value::Bool(wildcard::is_match(pattern, text)),
                CompareToken::NotEqual => Value::Bool(!wildcard::is_match(pattern, text)),
                _ => self.compare(&Value::Text(pattern.clone()), op),
            },
            _ => self.compare(pattern, op),
        }
    }

    // ========== Concatenation ==========

    /// `self` followed by `other`
    pub fn concatenate_back(&self, other: &Value) -> Value {
        self.concatenate(other, false)
    }

    /// `other` followed by `self`
    pub fn concatenate_front(&self, other: &Value) -> Value {
        self.concatenate(other, true)
    }

    fn concatenate(&self, other: &Value, front: bool) -> Value {
        match (self, other) {
            (Value::Error(e), _) | (_, Value::Error(e)) => Value::Error(e.clone()),
            (Value::Array(a), Value::Array(b)) => {
                Value::Array(a.zip_broadcast(b, |x, y| x.concatenate(y, front)))
            }
            (Value::Array(a), scalar) => Value::Array(a.map(|x| x.concatenate(scalar, front))),
            (scalar, Value::Array(b)) => Value::Array(b.map(|y| scalar.concatenate(y, front))),
            _ => {
                let (first, second) = if front { (other, self) } else { (self, other) };
                let mut text = first.concat_text().unwrap_or_default();
                text.push_str(&second.concat_text().unwrap_or_default());
                Value::Text(text)
            }
        }
    }
}

/// Ordering of two scalars. Null takes the kind of the other side.
fn scalar_ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, other) => scalar_ordering(&null_stand_in(other), other),
        (other, Value::Null) => scalar_ordering(other, &null_stand_in(other)),

        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.as_str().cmp(b.as_str())),

        (Value::Bool(a), Value::Number(b)) => Number::from_i64(i64::from(*a)).partial_cmp(b),
        (Value::Number(a), Value::Bool(b)) => a.partial_cmp(&Number::from_i64(i64::from(*b))),

        (Value::Text(_), Value::Number(_) | Value::Bool(_)) => Some(Ordering::Greater),
        (Value::Number(_) | Value::Bool(_), Value::Text(_)) => Some(Ordering::Less),

        // Filtered out by the callers before ordering scalars
        (Value::Error(_) | Value::Array(_), _) | (_, Value::Error(_) | Value::Array(_)) => None,
    }
}

fn null_stand_in(other: &Value) -> Value {
    match other {
        Value::Text(_) => Value::Text(String::new()),
        Value::Bool(_) => Value::Bool(false),
        _ => Value::Number(Number::zero()),
    }
}
