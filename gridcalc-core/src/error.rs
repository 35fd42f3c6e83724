//! Spreadsheet error values
//!
//! Errors never crash the interpreter. They are ordinary values that
//! propagate through computations (first error wins) and are rendered as
//! their canonical token when they reach a cell.

use crate::NumberError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fixed error taxonomy with canonical tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    /// Type mismatch or missing operand
    Value,
    DivByZero,
    /// Unresolved lambda binding or array overflow
    Spill,
    Name,
    Ref,
    Na,
    Num,
}

impl ErrorType {
    pub const ALL: [ErrorType; 7] = [
        ErrorType::Value,
        ErrorType::DivByZero,
        ErrorType::Spill,
        ErrorType::Name,
        ErrorType::Ref,
        ErrorType::Na,
        ErrorType::Num,
    ];

    /// Token surfaced to hosts and users
    pub fn token(self) -> &'static str {
        match self {
            ErrorType::Value => "#VALUE!",
            ErrorType::DivByZero => "#DIV/0!",
            ErrorType::Spill => "#SPILL!",
            ErrorType::Name => "#NAME?",
            ErrorType::Ref => "#REF!",
            ErrorType::Na => "#N/A",
            ErrorType::Num => "#NUM!",
        }
    }

    /// Parse a canonical token (case-insensitive)
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|kind| kind.token().eq_ignore_ascii_case(token))
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Error value carried by `Value::Error`.
///
/// The message is diagnostic only; two errors are equal when their kinds are.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind}")]
pub struct FormulaError {
    pub kind: ErrorType,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl FormulaError {
    pub fn new(kind: ErrorType) -> Self {
        Self { kind, message: None }
    }

    /// Builder: attach a diagnostic message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn token(&self) -> &'static str {
        self.kind.token()
    }

    // ========== Common Error Constructors ==========

    pub fn value() -> Self {
        Self::new(ErrorType::Value)
    }

    pub fn div_by_zero() -> Self {
        Self::new(ErrorType::DivByZero)
    }

    pub fn spill() -> Self {
        Self::new(ErrorType::Spill)
    }

    pub fn name(name: &str) -> Self {
        Self::new(ErrorType::Name).with_message(format!("Unknown name: {}", name))
    }

    pub fn reference() -> Self {
        Self::new(ErrorType::Ref)
    }

    pub fn na() -> Self {
        Self::new(ErrorType::Na)
    }

    pub fn num() -> Self {
        Self::new(ErrorType::Num)
    }

    pub fn type_error(expected: &str, got: &str) -> Self {
        Self::value().with_message(format!("Expected {}, got {}", expected, got))
    }

    pub fn arg_count(func: &str, expected: &str, got: usize) -> Self {
        Self::value().with_message(format!("{}() expects {} arguments, got {}", func, expected, got))
    }
}

impl PartialEq for FormulaError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for FormulaError {}

impl From<ErrorType> for FormulaError {
    fn from(kind: ErrorType) -> Self {
        Self::new(kind)
    }
}

impl From<NumberError> for FormulaError {
    fn from(err: NumberError) -> Self {
        let kind = match err {
            NumberError::ParseError(_) => ErrorType::Value,
            NumberError::DivisionByZero => ErrorType::DivByZero,
            NumberError::DomainError(_) => ErrorType::Num,
        };
        Self::new(kind).with_message(err.to_string())
    }
}
