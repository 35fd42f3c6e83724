//! Lazy cell-range references
//!
//! A `ReferenceObject` does not own cell data. It reads through a stack of
//! shared dataset layers (runtime overlay first, then the active dataset)
//! each time it is iterated, so iteration is lazy and restartable.

use crate::{ArrayValue, CellData, Dataset, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Inclusive rectangular range, zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRange {
    pub start_row: usize,
    pub start_column: usize,
    pub end_row: usize,
    pub end_column: usize,
}

impl CellRange {
    /// Corners may be given in any order.
    pub fn new(row_a: usize, column_a: usize, row_b: usize, column_b: usize) -> Self {
        Self {
            start_row: row_a.min(row_b),
            start_column: column_a.min(column_b),
            end_row: row_a.max(row_b),
            end_column: column_a.max(column_b),
        }
    }

    pub fn cell(row: usize, column: usize) -> Self {
        Self::new(row, column, row, column)
    }

    pub fn row_count(&self) -> usize {
        self.end_row - self.start_row + 1
    }

    pub fn column_count(&self) -> usize {
        self.end_column - self.start_column + 1
    }

    pub fn cell_count(&self) -> usize {
        self.row_count().saturating_mul(self.column_count())
    }

    pub fn contains(&self, row: usize, column: usize) -> bool {
        (self.start_row..=self.end_row).contains(&row)
            && (self.start_column..=self.end_column).contains(&column)
    }
}

/// Read-only dataset stack; earlier layers shadow later ones.
#[derive(Clone, Default)]
pub struct DataLayers {
    layers: Vec<Arc<Dataset>>,
}

impl DataLayers {
    pub fn new(layers: Vec<Arc<Dataset>>) -> Self {
        Self { layers }
    }

    pub fn single(dataset: Arc<Dataset>) -> Self {
        Self { layers: vec![dataset] }
    }

    /// Cell from the first layer that holds it. A blank written into an
    /// upper layer shadows the layers below.
    pub fn lookup(&self, unit_id: &str, sheet_id: &str, row: usize, column: usize) -> Option<&CellData> {
        self.layers
            .iter()
            .find_map(|layer| layer.get_cell(unit_id, sheet_id, row, column))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl fmt::Debug for DataLayers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataLayers").field("layers", &self.layers.len()).finish()
    }
}

/// Handle to a rectangle of cells in one sheet
#[derive(Debug, Clone)]
pub struct ReferenceObject {
    unit_id: String,
    sheet_id: String,
    range: CellRange,
    data: DataLayers,
}

impl ReferenceObject {
    pub fn new(
        unit_id: impl Into<String>,
        sheet_id: impl Into<String>,
        range: CellRange,
        data: DataLayers,
    ) -> Self {
        Self { unit_id: unit_id.into(), sheet_id: sheet_id.into(), range, data }
    }

    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }

    pub fn sheet_id(&self) -> &str {
        &self.sheet_id
    }

    pub fn range(&self) -> CellRange {
        self.range
    }

    pub fn row_count(&self) -> usize {
        self.range.row_count()
    }

    pub fn column_count(&self) -> usize {
        self.range.column_count()
    }

    /// Single-cell reference
    pub fn is_cell(&self) -> bool {
        self.range.cell_count() == 1
    }

    /// Value at an offset from the top-left corner; `None` outside the range.
    pub fn value_at(&self, row_offset: usize, column_offset: usize) -> Option<Value> {
        if row_offset >= self.row_count() || column_offset >= self.column_count() {
            return None;
        }
        Some(self.read(self.range.start_row + row_offset, self.range.start_column + column_offset))
    }

    fn read(&self, row: usize, column: usize) -> Value {
        self.data
            .lookup(&self.unit_id, &self.sheet_id, row, column)
            .map(CellData::to_value)
            .unwrap_or(Value::Null)
    }

    /// Lazy row-major `(row, column, value)` over absolute positions.
    pub fn iter(&self) -> ReferenceIter<'_> {
        ReferenceIter { reference: self, index: 0 }
    }

    /// Force into an eager array of the same shape
    pub fn to_array(&self) -> ArrayValue {
        let cells: Vec<Value> = self.iter().map(|(_, _, v)| v).collect();
        ArrayValue::from_rows(
            cells
                .chunks(self.column_count())
                .map(<[Value]>::to_vec)
                .collect(),
        )
    }
}

impl PartialEq for ReferenceObject {
    /// Same target, regardless of which data layers back it
    fn eq(&self, other: &Self) -> bool {
        self.unit_id == other.unit_id && self.sheet_id == other.sheet_id && self.range == other.range
    }
}

impl fmt::Display for ReferenceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.range;
        write!(
            f,
            "{}!R{}C{}:R{}C{}",
            self.sheet_id,
            r.start_row + 1,
            r.start_column + 1,
            r.end_row + 1,
            r.end_column + 1
        )
    }
}

pub struct ReferenceIter<'a> {
    reference: &'a ReferenceObject,
    index: usize,
}

impl Iterator for ReferenceIter<'_> {
    type Item = (usize, usize, Value);

    fn next(&mut self) -> Option<Self::Item> {
        let range = self.reference.range;
        if self.index >= range.cell_count() {
            return None;
        }
        let row = range.start_row + self.index / range.column_count();
        let column = range.start_column + self.index % range.column_count();
        self.index += 1;
        Some((row, column, self.reference.read(row, column)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reference.range.cell_count().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ReferenceIter<'_> {}
