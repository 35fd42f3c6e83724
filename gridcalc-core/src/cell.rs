//! Host cell representation
//!
//! A cell is a raw value plus an optional type tag. The tag decides how the
//! raw value is read back: a number stored with the text tag stays text.

use crate::{ErrorType, Number, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stored type tag. Serialised as its integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CellValueType {
    String = 1,
    Boolean = 2,
    Number = 3,
}

impl TryFrom<u8> for CellValueType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(CellValueType::String),
            2 => Ok(CellValueType::Boolean),
            3 => Ok(CellValueType::Number),
            other => Err(format!("unknown cell value type {}", other)),
        }
    }
}

impl From<CellValueType> for u8 {
    fn from(t: CellValueType) -> u8 {
        t as u8
    }
}

/// Raw stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Text(String),
    Number(Number),
}

/// One cell as hosts store it: `{ "v": ..., "t": ... }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellData {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub v: Option<RawValue>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub t: Option<CellValueType>,
}

impl CellData {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn number(n: impl Into<Number>) -> Self {
        Self { v: Some(RawValue::Number(n.into())), t: Some(CellValueType::Number) }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self { v: Some(RawValue::Text(s.into())), t: Some(CellValueType::String) }
    }

    pub fn boolean(b: bool) -> Self {
        Self { v: Some(RawValue::Bool(b)), t: Some(CellValueType::Boolean) }
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_none()
    }

    /// Read the cell as a value, honouring its type tag.
    pub fn to_value(&self) -> Value {
        let Some(raw) = &self.v else {
            return Value::Null;
        };

        match (self.t, raw) {
            (Some(CellValueType::String), RawValue::Text(s)) => text_value(s),
            (Some(CellValueType::String), RawValue::Number(n)) => Value::Text(n.to_string()),
            (Some(CellValueType::String), RawValue::Bool(b)) => {
                Value::Text(if *b { "TRUE" } else { "FALSE" }.to_string())
            }

            (Some(CellValueType::Boolean), RawValue::Bool(b)) => Value::Bool(*b),
            (Some(CellValueType::Boolean), RawValue::Number(n)) => Value::Bool(!n.is_zero()),
            (Some(CellValueType::Boolean), RawValue::Text(s)) => {
                Value::Bool(s.eq_ignore_ascii_case("TRUE") || s == "1")
            }

            (Some(CellValueType::Number), RawValue::Text(s)) => match Number::from_str(s.trim()) {
                Ok(n) => Value::Number(n),
                Err(_) => text_value(s),
            },

            (_, RawValue::Number(n)) => Value::Number(n.clone()),
            (_, RawValue::Bool(b)) => Value::Bool(*b),
            (None, RawValue::Text(s)) => text_value(s),
        }
    }
}

/// Errors are persisted as their token; read them back as errors.
fn text_value(s: &str) -> Value {
    match ErrorType::from_token(s) {
        Some(kind) => Value::error(kind),
        None => Value::Text(s.to_string()),
    }
}

/// Dense grid of cells for one sheet. Grows on write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SparseCells", into = "SparseCells")]
pub struct CellMatrix {
    rows: Vec<Vec<Option<CellData>>>,
}

/// Serialised form: `{ "row": { "column": cell } }`
type SparseCells = BTreeMap<usize, BTreeMap<usize, CellData>>;

impl CellMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from nested rows of cells
    pub fn from_rows(rows: Vec<Vec<CellData>>) -> Self {
        let mut matrix = Self::new();
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                matrix.set(r, c, cell);
            }
        }
        matrix
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&CellData> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    pub fn set(&mut self, row: usize, column: usize, cell: CellData) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= column {
            cells.resize_with(column + 1, || None);
        }
        cells[column] = Some(cell);
    }

    /// Number of rows allocated so far
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Widest allocated row
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Populated cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &CellData)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter_map(move |(c, cell)| cell.as_ref().map(|cell| (r, c, cell)))
        })
    }
}

impl From<SparseCells> for CellMatrix {
    fn from(sparse: SparseCells) -> Self {
        let mut matrix = CellMatrix::new();
        for (r, row) in sparse {
            for (c, cell) in row {
                matrix.set(r, c, cell);
            }
        }
        matrix
    }
}

impl From<CellMatrix> for SparseCells {
    fn from(matrix: CellMatrix) -> Self {
        let mut sparse = SparseCells::new();
        for (r, c, cell) in matrix.cells() {
            sparse.entry(r).or_default().insert(c, cell.clone());
        }
        sparse
    }
}
