//! Node results: a computed value or a lazy reference

use crate::{FormulaError, ReferenceObject, Value};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Reference(ReferenceObject),
}

impl Operand {
    /// Force to a value. A single-cell reference reads as its cell; wider
    /// references become arrays.
    pub fn into_value(self) -> Value {
        match self {
            Operand::Value(v) => v,
            Operand::Reference(r) => force_reference(&r),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Operand::Value(v) => v.clone(),
            Operand::Reference(r) => force_reference(r),
        }
    }

    /// Scalar view: a single-cell reference or 1x1 array reads as its cell.
    pub fn to_scalar(&self) -> Value {
        match self {
            Operand::Reference(r) if r.is_cell() => r.value_at(0, 0).unwrap_or(Value::Null),
            Operand::Value(Value::Array(a)) if a.len() == 1 => {
                a.get(0, 0).cloned().unwrap_or(Value::Null)
            }
            other => other.to_value(),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceObject> {
        match self {
            Operand::Reference(r) => Some(r),
            Operand::Value(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&FormulaError> {
        self.as_value().and_then(Value::as_error)
    }

    pub fn is_error(&self) -> bool {
        self.as_error().is_some()
    }

    /// Ranges and arrays, as opposed to scalars
    pub fn is_range(&self) -> bool {
        matches!(self, Operand::Reference(_) | Operand::Value(Value::Array(_)))
    }

    /// `(rows, columns)`; scalars are 1x1.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Operand::Reference(r) => (r.row_count(), r.column_count()),
            Operand::Value(Value::Array(a)) => (a.rows(), a.columns()),
            Operand::Value(_) => (1, 1),
        }
    }

    /// Cell at an offset from the top-left corner
    pub fn cell(&self, row_offset: usize, column_offset: usize) -> Option<Value> {
        match self {
            Operand::Reference(r) => r.value_at(row_offset, column_offset),
            Operand::Value(Value::Array(a)) => a.get(row_offset, column_offset).cloned(),
            Operand::Value(v) => (row_offset == 0 && column_offset == 0).then(|| v.clone()),
        }
    }

    /// Every cell in row-major order
    pub fn cells(&self) -> Vec<Value> {
        match self {
            Operand::Reference(r) => r.iter().map(|(_, _, v)| v).collect(),
            Operand::Value(Value::Array(a)) => a.values().to_vec(),
            Operand::Value(v) => vec![v.clone()],
        }
    }
}

fn force_reference(r: &ReferenceObject) -> Value {
    if r.is_cell() {
        r.value_at(0, 0).unwrap_or(Value::Null)
    } else {
        Value::Array(r.to_array())
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(v) => write!(f, "{}", v),
            Operand::Reference(r) => write!(f, "{}", r),
        }
    }
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Value(Value::Null)
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<ReferenceObject> for Operand {
    fn from(r: ReferenceObject) -> Self {
        Operand::Reference(r)
    }
}

impl From<FormulaError> for Operand {
    fn from(e: FormulaError) -> Self {
        Operand::Value(Value::Error(e))
    }
}
