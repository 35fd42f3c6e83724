//! Function executor traits

use async_trait::async_trait;
use gridcalc_core::Operand;
use serde::Serialize;

/// Metadata about a function argument
#[derive(Debug, Clone, Serialize)]
pub struct ArgMeta {
    pub name: &'static str,
    pub typ: &'static str,
    pub description: &'static str,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl ArgMeta {
    pub const fn required(name: &'static str, typ: &'static str, description: &'static str) -> Self {
        Self { name, typ, description, optional: false, default: None }
    }

    pub const fn optional(name: &'static str, typ: &'static str, description: &'static str, default: &'static str) -> Self {
        Self { name, typ, description, optional: true, default: Some(default) }
    }
}

/// Metadata for a function executor
#[derive(Debug, Clone, Serialize)]
pub struct FunctionMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub args: &'static [ArgMeta],
    pub returns: &'static str,
    pub examples: &'static [&'static str],
    pub category: &'static str,
}

impl FunctionMeta {
    /// Accepted argument count range
    pub fn arity(&self) -> (usize, usize) {
        let required = self.args.iter().filter(|a| !a.optional).count();
        (required, self.args.len())
    }
}

/// Spreadsheet function.
///
/// Arguments arrive as evaluated operands: scalars, arrays, or unforced
/// references. Failures are returned as error values, never raised.
#[async_trait]
pub trait FunctionExecutor: Send + Sync {
    fn meta(&self) -> FunctionMeta;

    fn calculate(&self, args: &[Operand]) -> Operand;

    /// Whether calls must go through `calculate_async`
    fn is_async(&self) -> bool {
        false
    }

    async fn calculate_async(&self, args: &[Operand]) -> Operand {
        self.calculate(args)
    }
}
