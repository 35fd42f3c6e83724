//! Dense row-major arrays of values

use crate::{FormulaError, Value};
use serde::{Deserialize, Serialize};

/// Materialised 2-D grid of values, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    rows: usize,
    columns: usize,
    cells: Vec<Value>,
}

impl ArrayValue {
    /// Create from row-major cells. Fails with `#VALUE!` if the cell count
    /// does not match the shape.
    pub fn new(rows: usize, columns: usize, cells: Vec<Value>) -> Result<Self, FormulaError> {
        if rows.checked_mul(columns) != Some(cells.len()) {
            return Err(FormulaError::value().with_message(format!(
                "{} cells do not fill a {}x{} array",
                cells.len(),
                rows,
                columns
            )));
        }
        Ok(Self { rows, columns, cells })
    }

    /// Create from nested rows; short rows are padded with `Null`.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let row_count = rows.len();
        let mut cells = Vec::with_capacity(row_count * columns);
        for mut row in rows {
            row.resize(columns, Value::Null);
            cells.extend(row);
        }
        Self { rows: row_count, columns, cells }
    }

    pub fn filled(rows: usize, columns: usize, value: Value) -> Self {
        Self { rows, columns, cells: vec![value; rows * columns] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        if row >= self.rows || column >= self.columns {
            return None;
        }
        self.cells.get(row * self.columns + column)
    }

    pub fn values(&self) -> &[Value] {
        &self.cells
    }

    /// Row-major `(row, column, value)` triples. Restartable: every call
    /// starts from the top-left cell.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &Value)> + '_ {
        let columns = self.columns.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, v)| (i / columns, i % columns, v))
    }

    pub fn to_rows(&self) -> Vec<Vec<Value>> {
        if self.columns == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.cells.chunks(self.columns).map(<[Value]>::to_vec).collect()
    }

    /// Apply `f` to every cell, preserving the shape.
    pub fn map(&self, f: impl FnMut(&Value) -> Value) -> Self {
        Self {
            rows: self.rows,
            columns: self.columns,
            cells: self.cells.iter().map(f).collect(),
        }
    }

    /// Pairwise combination with spreadsheet broadcasting: a dimension of
    /// size 1 stretches to the other operand's size, positions outside
    /// either shape become `#N/A`.
    pub fn zip_broadcast(&self, other: &Self, mut f: impl FnMut(&Value, &Value) -> Value) -> Self {
        let rows = self.rows.max(other.rows);
        let columns = self.columns.max(other.columns);
        let mut cells = Vec::with_capacity(rows * columns);

        for row in 0..rows {
            for column in 0..columns {
                let cell = match (self.broadcast_get(row, column), other.broadcast_get(row, column)) {
                    (Some(a), Some(b)) => f(a, b),
                    _ => Value::Error(FormulaError::na()),
                };
                cells.push(cell);
            }
        }

        Self { rows, columns, cells }
    }

    fn broadcast_get(&self, row: usize, column: usize) -> Option<&Value> {
        let row = if self.rows == 1 { 0 } else { row };
        let column = if self.columns == 1 { 0 } else { column };
        self.get(row, column)
    }
}
