//! GridCalc Standard Library

pub mod functions;

use gridcalc_plugin::FunctionRegistry;

/// Load standard library into registry
pub fn load_standard_library(registry: FunctionRegistry) -> FunctionRegistry {
    registry
        .with_function(functions::Sum)
        .with_function(functions::Sumif)
        .with_function(functions::Countif)
        .with_function(functions::Averageif)
}

/// Create registry with standard library
pub fn standard_registry() -> FunctionRegistry {
    load_standard_library(FunctionRegistry::new())
}
