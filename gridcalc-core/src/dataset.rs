//! Workbook data: unit → sheet → cell grid

use crate::{CellData, CellMatrix};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    units: HashMap<String, HashMap<String, CellMatrix>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: install a sheet
    pub fn with_sheet(
        mut self,
        unit_id: impl Into<String>,
        sheet_id: impl Into<String>,
        matrix: CellMatrix,
    ) -> Self {
        self.units
            .entry(unit_id.into())
            .or_default()
            .insert(sheet_id.into(), matrix);
        self
    }

    pub fn sheet(&self, unit_id: &str, sheet_id: &str) -> Option<&CellMatrix> {
        self.units.get(unit_id)?.get(sheet_id)
    }

    /// Mutable sheet, created empty on first use
    pub fn sheet_mut(&mut self, unit_id: &str, sheet_id: &str) -> &mut CellMatrix {
        self.units
            .entry(unit_id.to_string())
            .or_default()
            .entry(sheet_id.to_string())
            .or_default()
    }

    pub fn get_cell(&self, unit_id: &str, sheet_id: &str, row: usize, column: usize) -> Option<&CellData> {
        self.sheet(unit_id, sheet_id)?.get(row, column)
    }

    pub fn set_cell(&mut self, unit_id: &str, sheet_id: &str, row: usize, column: usize, cell: CellData) {
        self.sheet_mut(unit_id, sheet_id).set(row, column, cell);
    }

    pub fn is_empty(&self) -> bool {
        self.units.values().all(HashMap::is_empty)
    }
}
