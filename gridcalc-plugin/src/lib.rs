//! GridCalc Plugin System
//!
//! Provides the seams between the interpreter and the functions it calls:
//! - `FunctionExecutor`: a spreadsheet function (sync, optionally async)
//! - `FunctionRegistry`: case-insensitive name lookup
//! - `InterpreterConfig`: active cell, dataset and limits for one evaluation

mod context;
mod registry;
mod traits;

pub use context::{InterpreterConfig, InterpreterOptions, ENV_MAX_PARAMETER_DEPTH, ENV_MAX_SPILL_CELLS};
pub use registry::FunctionRegistry;
pub use traits::{ArgMeta, FunctionExecutor, FunctionMeta};

/// Re-export core types for function authors
pub mod prelude {
    pub use crate::{
        ArgMeta, FunctionExecutor, FunctionMeta, FunctionRegistry, InterpreterConfig,
        InterpreterOptions,
    };
    pub use gridcalc_core::prelude::*;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gridcalc_core::{ErrorType, Operand, Value};
    use std::sync::Arc;

    struct Double;

    static DOUBLE_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "Number", "Value to double")];

    impl FunctionExecutor for Double {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "DOUBLE",
                description: "Twice the argument",
                usage: "DOUBLE(x)",
                args: &DOUBLE_ARGS,
                returns: "Number",
                examples: &["DOUBLE(2) → 4"],
                category: "test",
            }
        }

        fn calculate(&self, args: &[Operand]) -> Operand {
            match args.first() {
                Some(a) => Operand::from(a.to_scalar().plus(&a.to_scalar())),
                None => Operand::from(Value::error(ErrorType::Value)),
            }
        }
    }

    struct Remote;

    #[async_trait]
    impl FunctionExecutor for Remote {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "REMOTE",
                description: "Answer fetched asynchronously",
                usage: "REMOTE()",
                args: &[],
                returns: "Number",
                examples: &[],
                category: "test",
            }
        }

        fn calculate(&self, _args: &[Operand]) -> Operand {
            Operand::from(Value::error(ErrorType::Na))
        }

        fn is_async(&self) -> bool {
            true
        }

        async fn calculate_async(&self, _args: &[Operand]) -> Operand {
            tokio::task::yield_now().await;
            Operand::from(Value::number(42))
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn test_lookup_is_case_insensitive() {
            let registry = FunctionRegistry::new().with_function(Double);
            assert!(registry.contains("double"));
            assert!(registry.get("Double").is_some());
            assert_eq!(registry.names(), vec!["double".to_string()]);
        }

        #[test]
        fn test_call() {
            let registry = FunctionRegistry::new().with_function(Double);
            let r = registry.call("DOUBLE", &[Operand::from(Value::number(21))]);
            assert_eq!(r, Operand::from(Value::number(42)));
        }

        #[test]
        fn test_unknown_function_suggests() {
            let registry = FunctionRegistry::new().with_function(Double);
            let r = registry.call("DOUBL", &[]);
            let err = r.as_error().unwrap();
            assert_eq!(err.kind, ErrorType::Name);
            assert!(err.message.as_deref().unwrap().contains("DOUBLE"));
        }

        #[test]
        fn test_hint_lists_closest_first() {
            let registry = FunctionRegistry::new().with_function(Double).with_function(Remote);
            let err = registry.unknown_function("remoe");
            assert_eq!(err.message.as_deref(), Some("Unknown function: remoe. Similar: REMOTE"));

            // Nothing within two edits
            let err = registry.unknown_function("average");
            assert_eq!(err.message.as_deref(), Some("Unknown name: average"));
        }

        #[test]
        fn test_meta() {
            let registry = FunctionRegistry::new().with_function(Double).with_function(Remote);
            assert_eq!(registry.help("double").unwrap().arity(), (1, 1));
            assert_eq!(registry.list_functions(Some("test")).len(), 2);
            assert!(registry.list_functions(Some("math")).is_empty());
        }

        #[tokio::test]
        async fn test_call_async() {
            let registry = FunctionRegistry::new().with_function(Double).with_function(Remote);
            assert_eq!(registry.call_async("remote", &[]).await, Operand::from(Value::number(42)));
            assert_eq!(
                registry.call_async("double", &[Operand::from(Value::number(1))]).await,
                Operand::from(Value::number(2))
            );
            assert!(registry.get("remote").unwrap().is_async());
            assert!(!registry.get("double").unwrap().is_async());
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_option_defaults() {
            let options = InterpreterOptions::default();
            assert_eq!(options.max_parameter_depth, 64);
            assert_eq!(options.max_spill_cells, 1_000_000);
        }

        #[test]
        fn test_options_builders() {
            let options = InterpreterOptions::default()
                .with_max_parameter_depth(3)
                .with_max_spill_cells(10);
            assert_eq!(options, InterpreterOptions { max_parameter_depth: 3, max_spill_cells: 10 });
        }

        #[test]
        fn test_resolve_sheet() {
            let config = InterpreterConfig::new("book", "s1", Arc::new(FunctionRegistry::new()))
                .with_sheet_name("Sheet1", "s1")
                .with_sheet_name("Data", "s2");
            assert_eq!(config.resolve_sheet("data").as_deref(), Some("s2"));
            assert_eq!(config.resolve_sheet("s1").as_deref(), Some("s1"));
            assert_eq!(config.resolve_sheet("Missing"), None);
        }
    }
}
