//! Interpreter configuration

use crate::FunctionRegistry;
use gridcalc_core::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub const ENV_MAX_PARAMETER_DEPTH: &str = "GRIDCALC_MAX_PARAMETER_DEPTH";
pub const ENV_MAX_SPILL_CELLS: &str = "GRIDCALC_MAX_SPILL_CELLS";

/// Evaluation limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterOptions {
    /// Longest lambda parameter chain followed before giving up with `#SPILL!`
    pub max_parameter_depth: usize,
    /// Largest array or range written back into the runtime dataset
    pub max_spill_cells: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self { max_parameter_depth: 64, max_spill_cells: 1_000_000 }
    }
}

impl InterpreterOptions {
    /// Defaults overridden by `GRIDCALC_*` environment variables. Unparseable
    /// values are ignored.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(depth) = env_usize(ENV_MAX_PARAMETER_DEPTH) {
            options.max_parameter_depth = depth;
        }
        if let Some(cells) = env_usize(ENV_MAX_SPILL_CELLS) {
            options.max_spill_cells = cells;
        }
        options
    }

    pub fn with_max_parameter_depth(mut self, depth: usize) -> Self {
        self.max_parameter_depth = depth;
        self
    }

    pub fn with_max_spill_cells(mut self, cells: usize) -> Self {
        self.max_spill_cells = cells;
        self
    }
}

fn env_usize(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring invalid interpreter option");
            None
        }
    }
}

/// Everything one evaluation needs from its host: the active cell, the
/// data it reads, and the functions it may call.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub unit_id: String,
    pub sheet_id: String,
    pub row: usize,
    pub column: usize,
    pub dataset: Arc<Dataset>,
    /// Sheet display name → sheet id, for `Name!A1` references
    pub sheet_names: HashMap<String, String>,
    pub registry: Arc<FunctionRegistry>,
    pub options: InterpreterOptions,
}

impl InterpreterConfig {
    pub fn new(unit_id: impl Into<String>, sheet_id: impl Into<String>, registry: Arc<FunctionRegistry>) -> Self {
        Self {
            unit_id: unit_id.into(),
            sheet_id: sheet_id.into(),
            row: 0,
            column: 0,
            dataset: Arc::new(Dataset::new()),
            sheet_names: HashMap::new(),
            registry,
            options: InterpreterOptions::default(),
        }
    }

    pub fn with_dataset(mut self, dataset: impl Into<Arc<Dataset>>) -> Self {
        self.dataset = dataset.into();
        self
    }

    /// Builder: active cell
    pub fn with_cell(mut self, row: usize, column: usize) -> Self {
        self.row = row;
        self.column = column;
        self
    }

    pub fn with_sheet_name(mut self, name: impl Into<String>, sheet_id: impl Into<String>) -> Self {
        self.sheet_names.insert(name.into(), sheet_id.into());
        self
    }

    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    /// Sheet id for a display name; ids are accepted as their own names.
    pub fn resolve_sheet(&self, name: &str) -> Option<String> {
        if let Some(id) = self.sheet_names.get(name) {
            return Some(id.clone());
        }
        if let Some((_, id)) = self.sheet_names.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            return Some(id.clone());
        }
        let known = self.sheet_names.values().any(|id| id == name)
            || self.dataset.sheet(&self.unit_id, name).is_some()
            || name == self.sheet_id;
        known.then(|| name.to_string())
    }
}
