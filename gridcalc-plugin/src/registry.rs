//! Function Registry

use crate::{FunctionExecutor, FunctionMeta};
use gridcalc_core::{FormulaError, Operand};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Name → executor lookup. Names are case-insensitive.
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn FunctionExecutor>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function<F: FunctionExecutor + 'static>(mut self, f: F) -> Self {
        self.register(f);
        self
    }

    pub fn register<F: FunctionExecutor + 'static>(&mut self, f: F) {
        self.register_arc(Arc::new(f));
    }

    pub fn register_arc(&mut self, f: Arc<dyn FunctionExecutor>) {
        let name = f.meta().name.to_lowercase();
        if self.functions.insert(name.clone(), f).is_some() {
            tracing::debug!(function = %name, "replaced registered function");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn FunctionExecutor>> {
        self.functions.get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn call(&self, name: &str, args: &[Operand]) -> Operand {
        match self.get(name) {
            Some(f) => f.calculate(args),
            None => Operand::from(self.unknown_function(name)),
        }
    }

    pub async fn call_async(&self, name: &str, args: &[Operand]) -> Operand {
        match self.get(name) {
            Some(f) if f.is_async() => f.calculate_async(args).await,
            Some(f) => f.calculate(args),
            None => Operand::from(self.unknown_function(name)),
        }
    }

    /// `#NAME?` for an unregistered function, with close matches as a hint
    pub fn unknown_function(&self, name: &str) -> FormulaError {
        tracing::debug!(function = %name, "unknown function");
        let similar = self.close_matches(name);
        if similar.is_empty() {
            return FormulaError::name(name);
        }
        let suggestions: Vec<&str> = similar.iter().take(5).map(|s| s.as_str()).collect();
        FormulaError::name(name).with_message(format!(
            "Unknown function: {}. Similar: {}",
            name,
            suggestions.join(", ")
        ))
    }

    /// Metadata for one function
    pub fn help(&self, name: &str) -> Option<FunctionMeta> {
        self.get(name).map(|f| f.meta())
    }

    /// Metadata for every function, optionally filtered by category, sorted by name
    pub fn list_functions(&self, category: Option<&str>) -> Vec<FunctionMeta> {
        let mut metas: Vec<FunctionMeta> = self
            .functions
            .values()
            .map(|f| f.meta())
            .filter(|m| category.map_or(true, |c| m.category.eq_ignore_ascii_case(c)))
            .collect();
        metas.sort_by(|a, b| a.name.cmp(b.name));
        metas
    }

    /// Registered names within two edits of `name`, closest first
    fn close_matches(&self, name: &str) -> Vec<String> {
        let query = name.to_lowercase();
        let mut matches: Vec<(usize, &String)> = self
            .functions
            .keys()
            .map(|candidate| (edit_distance(&query, candidate), candidate))
            .filter(|(distance, _)| *distance <= MAX_HINT_DISTANCE)
            .collect();
        matches.sort();
        matches.into_iter().map(|(_, candidate)| candidate.to_uppercase()).collect()
    }
}

const MAX_HINT_DISTANCE: usize = 2;

/// Levenshtein distance over chars, one row at a time
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = diagonal + usize::from(ca != *cb);
            diagonal = row[j + 1];
            row[j + 1] = substitute.min(row[j] + 1).min(diagonal + 1);
        }
    }
    row[b.len()]
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry").field("functions", &self.names()).finish()
    }
}
