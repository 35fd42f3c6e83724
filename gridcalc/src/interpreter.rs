//! Tree interpreter
//!
//! Walks an AST depth-first, left to right, executing every child before
//! its parent. The order is observable: nodes may read cells written into
//! the runtime dataset earlier in the same pass, so siblings are never
//! reordered or run concurrently, even on the async path.

use crate::ast::AstNode;
use gridcalc_core::{
    CellData, CellRange, DataLayers, Dataset, FormulaError, Operand, RawValue, CellValueType,
    ReferenceObject, Value,
};
use gridcalc_plugin::{InterpreterConfig, InterpreterOptions};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a node sees while executing
pub struct Runtime<'a> {
    config: &'a InterpreterConfig,
    data: &'a Arc<Dataset>,
}

impl<'a> Runtime<'a> {
    pub fn config(&self) -> &'a InterpreterConfig {
        self.config
    }

    pub fn options(&self) -> &'a InterpreterOptions {
        &self.config.options
    }

    /// Reference reading the runtime overlay first, then the active dataset
    pub fn reference(&self, unit_id: &str, sheet_id: &str, range: CellRange) -> ReferenceObject {
        let layers = DataLayers::new(vec![Arc::clone(self.data), Arc::clone(&self.config.dataset)]);
        ReferenceObject::new(unit_id, sheet_id, range, layers)
    }
}

/// Post-order walk: children in order, then the node itself.
pub(crate) fn walk(node: &mut AstNode, runtime: &mut Runtime<'_>) {
    for child in node.children_mut() {
        walk(child, runtime);
    }
    node.execute(runtime);
}

/// Same order as `walk`; only asynchronous function nodes are awaited.
pub(crate) fn walk_async<'a, 'r: 'a>(node: &'a mut AstNode, runtime: &'a mut Runtime<'r>) -> BoxFuture<'a, ()> {
    Box::pin(async move {
        if !node.is_async() {
            walk(node, runtime);
            return;
        }
        for child in node.children_mut() {
            walk_async(child, runtime).await;
        }
        node.execute_async(runtime).await;
    })
}

/// One evaluation pass over one or more trees.
///
/// Owns a private runtime dataset that results are written into; it is
/// created empty and discarded with the interpreter.
pub struct Interpreter {
    config: InterpreterConfig,
    runtime: Arc<Dataset>,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Self { config, runtime: Arc::new(Dataset::new()) }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Evaluate a tree synchronously. A missing root is `#VALUE!`.
    pub fn execute(&mut self, root: Option<&mut AstNode>) -> Operand {
        let Some(root) = root else {
            tracing::debug!("execute called without a root node");
            return Operand::from(FormulaError::value().with_message("No formula to evaluate"));
        };
        tracing::debug!(
            token = root.token(),
            sheet = %self.config.sheet_id,
            row = self.config.row,
            column = self.config.column,
            "executing formula"
        );

        let mut runtime = Runtime { config: &self.config, data: &self.runtime };
        walk(root, &mut runtime);
        Self::root_result(root)
    }

    /// Evaluate a tree, awaiting asynchronous functions in walk order.
    /// Trees without async functions take the synchronous path.
    pub async fn execute_async(&mut self, root: Option<&mut AstNode>) -> Operand {
        let Some(root) = root else {
            tracing::debug!("execute_async called without a root node");
            return Operand::from(FormulaError::value().with_message("No formula to evaluate"));
        };
        if !Self::check_async_node(root) {
            tracing::trace!(token = root.token(), "no async functions; using synchronous walk");
            return self.execute(Some(root));
        }

        tracing::debug!(token = root.token(), "executing formula asynchronously");
        let mut runtime = Runtime { config: &self.config, data: &self.runtime };
        walk_async(root, &mut runtime).await;
        Self::root_result(root)
    }

    fn root_result(root: &AstNode) -> Operand {
        root.value()
            .cloned()
            .unwrap_or_else(|| Operand::from(FormulaError::value().with_message("Formula produced no value")))
    }

    /// Full-tree scan, lambda bodies included, for asynchronous function nodes.
    pub fn check_async_node(node: &AstNode) -> bool {
        node.is_async_function()
            || node.children().iter().any(Self::check_async_node)
            || node.lambda_body().is_some_and(Self::check_async_node)
    }

    /// Write a result anchored at `(row, column)` of `sheet_id`.
    ///
    /// Arrays and references scatter row-major from the anchor. Results
    /// larger than `max_spill_cells` write a single `#SPILL!` instead.
    pub fn set_runtime_data(&mut self, row: usize, column: usize, sheet_id: &str, result: &Operand) {
        let (rows, columns) = result.shape();
        let max = self.config.options.max_spill_cells;
        let unit_id = self.config.unit_id.clone();
        let data = Arc::make_mut(&mut self.runtime);

        if rows.saturating_mul(columns) > max {
            tracing::warn!(rows, columns, max, "result exceeds spill limit");
            let spill = Self::object_value_to_cell_value(&Value::Error(FormulaError::spill()));
            data.set_cell(&unit_id, sheet_id, row, column, spill);
            return;
        }

        match result {
            Operand::Value(Value::Array(array)) => {
                for (r, c, value) in array.iter() {
                    data.set_cell(&unit_id, sheet_id, row + r, column + c, Self::object_value_to_cell_value(value));
                }
            }
            Operand::Reference(reference) => {
                let origin = reference.range();
                for (r, c, value) in reference.iter() {
                    let cell = Self::object_value_to_cell_value(&value);
                    data.set_cell(&unit_id, sheet_id, row + r - origin.start_row, column + c - origin.start_column, cell);
                }
            }
            Operand::Value(value) => {
                data.set_cell(&unit_id, sheet_id, row, column, Self::object_value_to_cell_value(value));
            }
        }
        tracing::trace!(sheet = sheet_id, row, column, rows, columns, "runtime data written");
    }

    /// Write a result at the active cell
    pub fn commit(&mut self, result: &Operand) {
        let (row, column, sheet_id) = (self.config.row, self.config.column, self.config.sheet_id.clone());
        self.set_runtime_data(row, column, &sheet_id, result);
    }

    /// Host cell for a value. Errors are stored as their token; arrays as
    /// their top-left cell.
    pub fn object_value_to_cell_value(value: &Value) -> CellData {
        match value {
            Value::Null => CellData::empty(),
            Value::Number(n) => CellData::number(n.clone()),
            Value::Bool(b) => CellData::boolean(*b),
            Value::Text(s) => CellData::text(s.clone()),
            Value::Error(e) => CellData {
                v: Some(RawValue::Text(e.token().to_string())),
                t: Some(CellValueType::String),
            },
            Value::Array(a) => a
                .get(0, 0)
                .map(Self::object_value_to_cell_value)
                .unwrap_or_default(),
        }
    }

    pub fn runtime_data(&self) -> &Dataset {
        &self.runtime
    }

    pub fn into_runtime_data(self) -> Dataset {
        Arc::try_unwrap(self.runtime).unwrap_or_else(|shared| (*shared).clone())
    }
}
