//! Value objects
//!
//! A closed set of kinds: null, boolean, number, text, error and array.
//! Errors are values and propagate through computations; the operator
//! algebra over these kinds lives in `ops`.

use crate::{ArrayValue, ErrorType, FormulaError, Number};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Computed scalar-or-array result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    Error(FormulaError),
    Array(ArrayValue),
}

impl Value {
    /// Value-object factory for literal tokens.
    ///
    /// `TRUE`/`FALSE` become booleans, error tokens become errors, numeric
    /// text becomes a number, `"quoted"` text is unquoted (with `""` as an
    /// escaped quote) and anything else is kept as text.
    pub fn from_literal(token: &str) -> Value {
        if let Some(kind) = ErrorType::from_token(token) {
            return Value::Error(FormulaError::new(kind));
        }
        if token.eq_ignore_ascii_case("TRUE") {
            return Value::Bool(true);
        }
        if token.eq_ignore_ascii_case("FALSE") {
            return Value::Bool(false);
        }
        if let Ok(n) = Number::from_str(token) {
            return Value::Number(n);
        }
        if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
            return Value::Text(token[1..token.len() - 1].replace("\"\"", "\""));
        }
        Value::Text(token.to_string())
    }

    pub fn number(n: i64) -> Value {
        Value::Number(Number::from_i64(n))
    }

    pub fn error(kind: ErrorType) -> Value {
        Value::Error(FormulaError::new(kind))
    }

    // ========== Safe Accessors (never panic) ==========

    pub fn as_number(&self) -> Option<&Number> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&FormulaError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Kind name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::Text(_) => "Text",
            Value::Error(_) => "Error",
            Value::Array(_) => "Array",
        }
    }

    // ========== Type Coercion ==========

    /// Explicit numeric coercion, as applied to direct function arguments.
    /// Unlike the operator algebra this parses numeric text.
    pub fn coerce_to_number(&self) -> Result<Number, FormulaError> {
        match self {
            Value::Number(n) => Ok(n.clone()),
            Value::Bool(b) => Ok(Number::from_i64(i64::from(*b))),
            Value::Null => Ok(Number::zero()),
            Value::Text(s) => Number::from_str(s)
                .map_err(|_| FormulaError::type_error("Number", "Text")),
            Value::Error(e) => Err(e.clone()),
            Value::Array(_) => Err(FormulaError::type_error("Number", "Array")),
        }
    }

    /// Text form used by concatenation. Arrays have no scalar text form.
    pub fn concat_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(bool_text(*b).to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Error(e) => Some(e.token().to_string()),
            Value::Array(_) => None,
        }
    }
}

fn bool_text(b: bool) -> &'static str {
    if b { "TRUE" } else { "FALSE" }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => f.write_str(bool_text(*b)),
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Error(e) => f.write_str(e.token()),
            Value::Array(a) => {
                // Array-constant notation: {1,2;3,4}
                let rows: Vec<String> = a
                    .to_rows()
                    .iter()
                    .map(|row| row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(","))
                    .collect();
                write!(f, "{{{}}}", rows.join(";"))
            }
        }
    }
}

// From implementations for convenience
impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from_i64(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::from_f64(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<FormulaError> for Value {
    fn from(e: FormulaError) -> Self {
        Value::Error(e)
    }
}

impl From<ArrayValue> for Value {
    fn from(a: ArrayValue) -> Self {
        Value::Array(a)
    }
}
