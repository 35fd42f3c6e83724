//! GridCalc - Spreadsheet formula evaluation
//!
//! Takes parser output (`LexerNode` trees), builds an AST with
//! prioritised node factories and evaluates it against a dataset. Results
//! can be written back into a runtime dataset that later formulas in the
//! same pass read before the host data.

pub mod ast;
mod interpreter;
mod lexer;

pub use ast::{AstBuilder, AstNode, LambdaScope, NodeFactory, NodeType, Operator};
pub use interpreter::{BoxFuture, Interpreter, Runtime};
pub use lexer::LexerNode;

use gridcalc_core::{Dataset, Operand, Value};
use gridcalc_plugin::{FunctionRegistry, InterpreterConfig, InterpreterOptions};
use serde::Serialize;
use std::sync::Arc;

/// Result of evaluating one formula for one cell
#[derive(Debug, Clone, Serialize)]
pub struct CalcOutcome {
    /// Forced value of the formula
    pub value: Value,
    pub row: usize,
    pub column: usize,
    /// Runtime dataset after the result was written back
    pub runtime: Dataset,
}

/// Main GridCalc engine
pub struct FormulaEngine {
    registry: Arc<FunctionRegistry>,
    builder: Arc<AstBuilder>,
    options: InterpreterOptions,
}

impl FormulaEngine {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            builder: Arc::new(AstBuilder::new()),
            options: InterpreterOptions::from_env(),
        }
    }

    pub fn with_standard_library() -> Self {
        Self::new(gridcalc_std::standard_registry())
    }

    pub fn with_options(mut self, options: InterpreterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Interpreter configuration for a cell of `sheet_id`, sharing this
    /// engine's functions and limits
    pub fn config(&self, unit_id: &str, sheet_id: &str) -> InterpreterConfig {
        InterpreterConfig::new(unit_id, sheet_id, Arc::clone(&self.registry)).with_options(self.options)
    }

    pub fn build(&self, lexer: &LexerNode, config: &InterpreterConfig) -> AstNode {
        self.builder.build(lexer, config)
    }

    /// Build, evaluate and write back one formula
    pub fn calculate(&self, lexer: &LexerNode, config: InterpreterConfig) -> CalcOutcome {
        let mut root = self.build(lexer, &config);
        let mut interpreter = Interpreter::new(config);
        let result = interpreter.execute(Some(&mut root));
        Self::finish(interpreter, result)
    }

    /// `calculate`, awaiting asynchronous functions
    pub async fn calculate_async(&self, lexer: &LexerNode, config: InterpreterConfig) -> CalcOutcome {
        let mut root = self.build(lexer, &config);
        let mut interpreter = Interpreter::new(config);
        let result = interpreter.execute_async(Some(&mut root)).await;
        Self::finish(interpreter, result)
    }

    fn finish(mut interpreter: Interpreter, result: Operand) -> CalcOutcome {
        interpreter.commit(&result);
        let (row, column) = (interpreter.config().row, interpreter.config().column);
        CalcOutcome {
            value: result.into_value(),
            row,
            column,
            runtime: interpreter.into_runtime_data(),
        }
    }
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::with_standard_library()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gridcalc_core::{ArrayValue, CellData, ErrorType, Number};
    use gridcalc_plugin::{ArgMeta, FunctionExecutor, FunctionMeta};
    use std::sync::Mutex;

    const UNIT: &str = "workbook";
    const SHEET: &str = "sheet1";

    /// A1:A4 = 1, 4, 44, 444; B2:B4 = test1, test2, mock; C2:C4 = 1, 1, 1
    const FIXTURE: &str = r#"{
        "workbook": {
            "sheet1": {
                "0": { "0": { "v": 1 } },
                "1": { "0": { "v": 4 }, "1": { "v": "test1", "t": 1 }, "2": { "v": 1 } },
                "2": { "0": { "v": 44 }, "1": { "v": "test2", "t": 1 }, "2": { "v": 1 } },
                "3": { "0": { "v": 444 }, "1": { "v": "mock", "t": 1 }, "2": { "v": 1 } }
            }
        }
    }"#;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn dataset() -> Dataset {
        serde_json::from_str(FIXTURE).unwrap()
    }

    fn config_for(registry: FunctionRegistry) -> InterpreterConfig {
        InterpreterConfig::new(UNIT, SHEET, Arc::new(registry))
            .with_dataset(dataset())
            .with_sheet_name("Sheet1", SHEET)
            .with_cell(9, 9)
    }

    fn config() -> InterpreterConfig {
        config_for(gridcalc_std::standard_registry())
    }

    fn eval(lexer: &LexerNode) -> Value {
        eval_with(lexer, config())
    }

    fn eval_with(lexer: &LexerNode, config: InterpreterConfig) -> Value {
        let mut root = AstBuilder::new().build(lexer, &config);
        Interpreter::new(config).execute(Some(&mut root)).into_value()
    }

    fn leaf(token: &str) -> LexerNode {
        LexerNode::leaf(token)
    }

    fn error_kind(value: &Value) -> Option<ErrorType> {
        value.as_error().map(|e| e.kind)
    }

    fn number_cell(n: i64) -> CellData {
        CellData::number(Number::from_i64(n))
    }

    static TRACE_ARGS: [ArgMeta; 1] = [ArgMeta::required("x", "Any", "Value to record")];

    /// Records each call's first argument, returns it unchanged
    struct Trace {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FunctionExecutor for Trace {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "TRACE",
                description: "Record an argument and return it",
                usage: "TRACE(x)",
                args: &TRACE_ARGS,
                returns: "Any",
                examples: &[],
                category: "test",
            }
        }

        fn calculate(&self, args: &[Operand]) -> Operand {
            let value = args.first().map(Operand::to_scalar).unwrap_or_default();
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(value.to_string());
            }
            Operand::from(value)
        }
    }

    /// Asynchronous lookup of a constant
    struct Fetch;

    #[async_trait]
    impl FunctionExecutor for Fetch {
        fn meta(&self) -> FunctionMeta {
            FunctionMeta {
                name: "FETCH",
                description: "Value fetched asynchronously",
                usage: "FETCH()",
                args: &[],
                returns: "Number",
                examples: &[],
                category: "test",
            }
        }

        fn calculate(&self, _args: &[Operand]) -> Operand {
            Operand::from(Value::number(42))
        }

        fn is_async(&self) -> bool {
            true
        }

        async fn calculate_async(&self, _args: &[Operand]) -> Operand {
            tokio::task::yield_now().await;
            Operand::from(Value::number(42))
        }
    }

    mod interpreter_tests {
        use super::*;

        #[test]
        fn test_missing_root_is_value_error() {
            init_tracing();
            let result = Interpreter::new(config()).execute(None).into_value();
            assert_eq!(error_kind(&result), Some(ErrorType::Value));
        }

        #[test]
        fn test_arithmetic() {
            let formula = LexerNode::operator("*", LexerNode::operator("+", leaf("1"), leaf("2")), leaf("4"));
            assert_eq!(eval(&formula), Value::number(12));
        }

        #[test]
        fn test_division_by_zero() {
            let formula = LexerNode::operator("/", leaf("42"), leaf("0"));
            assert_eq!(error_kind(&eval(&formula)), Some(ErrorType::DivByZero));
        }

        #[test]
        fn test_sumif_over_range() {
            init_tracing();
            let formula = LexerNode::call("SUMIF", vec![leaf("A1:A4"), leaf("\">40\"")]);
            assert_eq!(eval(&formula), Value::number(488));
        }

        #[test]
        fn test_sumif_with_wildcard_and_sum_range() {
            let formula = LexerNode::call("SUMIF", vec![leaf("B2:B4"), leaf("\"test*\""), leaf("C2:C4")]);
            assert_eq!(eval(&formula), Value::number(2));
        }

        #[test]
        fn test_reference_cell_in_arithmetic() {
            let formula = LexerNode::operator("+", leaf("A2"), leaf("Sheet1!A3"));
            assert_eq!(eval(&formula), Value::number(48));
        }

        #[test]
        fn test_array_constant() {
            let formula = LexerNode::call("SUM", vec![leaf("{1,2;3,4}")]);
            assert_eq!(eval(&formula), Value::number(10));
        }

        #[test]
        fn test_ragged_array_constant() {
            assert_eq!(error_kind(&eval(&leaf("{1,2;3}"))), Some(ErrorType::Value));
        }

        #[test]
        fn test_children_run_depth_first_left_to_right() {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let registry = gridcalc_std::standard_registry().with_function(Trace { calls: Arc::clone(&calls) });
            let formula = LexerNode::call(
                "TRACE",
                vec![LexerNode::operator(
                    "+",
                    LexerNode::call("TRACE", vec![leaf("1")]),
                    LexerNode::call("TRACE", vec![leaf("2")]),
                )],
            );
            assert_eq!(eval_with(&formula, config_for(registry)), Value::number(3));
            assert_eq!(*calls.lock().unwrap(), vec!["1", "2", "3"]);
        }

        #[test]
        fn test_check_async_node() {
            let config = config_for(gridcalc_std::standard_registry().with_function(Fetch));
            let builder = AstBuilder::new();

            let sync_tree = builder.build(&LexerNode::operator("+", leaf("1"), leaf("2")), &config);
            assert!(!Interpreter::check_async_node(&sync_tree));

            let lambda = LexerNode::lambda(&["x"], LexerNode::operator("+", leaf("x"), LexerNode::call("FETCH", vec![])))
                .invoke(vec![leaf("1")]);
            let async_tree = builder.build(&lambda, &config);
            assert!(async_tree.is_async());
            assert!(Interpreter::check_async_node(&async_tree));
        }

        #[tokio::test]
        async fn test_async_matches_sync() {
            init_tracing();
            let config = config_for(gridcalc_std::standard_registry().with_function(Fetch));
            let formula = LexerNode::operator(
                "+",
                LexerNode::call("FETCH", vec![]),
                LexerNode::call("SUMIF", vec![leaf("A1:A4"), leaf("\">40\"")]),
            );

            let builder = AstBuilder::new();
            let mut sync_root = builder.build(&formula, &config);
            let mut async_root = builder.build(&formula, &config);

            let sync = Interpreter::new(config.clone()).execute(Some(&mut sync_root));
            let async_result = Interpreter::new(config).execute_async(Some(&mut async_root)).await;

            assert_eq!(async_result.into_value(), Value::number(530));
            assert_eq!(sync.into_value(), Value::number(530));
        }

        #[tokio::test]
        async fn test_async_keeps_walk_order() {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let registry = gridcalc_std::standard_registry()
                .with_function(Trace { calls: Arc::clone(&calls) })
                .with_function(Fetch);
            let config = config_for(registry);
            let formula = LexerNode::call(
                "TRACE",
                vec![LexerNode::operator(
                    "+",
                    LexerNode::call("TRACE", vec![LexerNode::call("FETCH", vec![])]),
                    LexerNode::call("TRACE", vec![leaf("2")]),
                )],
            );

            let mut root = AstBuilder::new().build(&formula, &config);
            assert!(Interpreter::check_async_node(&root));
            let result = Interpreter::new(config).execute_async(Some(&mut root)).await;

            assert_eq!(result.into_value(), Value::number(44));
            assert_eq!(*calls.lock().unwrap(), vec!["42", "2", "44"]);
        }

        #[tokio::test]
        async fn test_async_without_async_functions() {
            let formula = LexerNode::call("SUM", vec![leaf("A1:A4")]);
            let config = config();
            let mut root = AstBuilder::new().build(&formula, &config);
            let result = Interpreter::new(config).execute_async(Some(&mut root)).await;
            assert_eq!(result.into_value(), Value::number(493));
        }

        #[tokio::test]
        async fn test_async_missing_root() {
            let result = Interpreter::new(config()).execute_async(None).await;
            assert_eq!(error_kind(&result.into_value()), Some(ErrorType::Value));
        }
    }

    mod lambda_tests {
        use super::*;

        #[test]
        fn test_invocation() {
            let formula = LexerNode::lambda(&["x", "y"], LexerNode::operator("+", leaf("x"), leaf("y")))
                .invoke(vec![leaf("2"), leaf("3")]);
            assert_eq!(eval(&formula), Value::number(5));
        }

        #[test]
        fn test_parameter_forwarded_to_inner_lambda() {
            let inner = LexerNode::lambda(&["y"], LexerNode::operator("*", leaf("y"), leaf("2")))
                .invoke(vec![leaf("x")]);
            let formula = LexerNode::lambda(&["x"], inner).invoke(vec![leaf("21")]);
            assert_eq!(eval(&formula), Value::number(42));
        }

        #[test]
        fn test_chain_without_terminal_binding_spills() {
            init_tracing();
            let inner = LexerNode::lambda(&["y"], leaf("y")).invoke(vec![leaf("x")]);
            let formula = LexerNode::lambda(&["x"], inner).invoke(vec![]);
            assert_eq!(error_kind(&eval(&formula)), Some(ErrorType::Spill));
        }

        #[test]
        fn test_too_many_arguments() {
            let formula = LexerNode::lambda(&["x"], leaf("x")).invoke(vec![leaf("1"), leaf("2")]);
            assert_eq!(error_kind(&eval(&formula)), Some(ErrorType::Value));
        }

        #[test]
        fn test_defined_but_not_invoked() {
            let formula = LexerNode::lambda(&["x"], leaf("x"));
            assert_eq!(error_kind(&eval(&formula)), Some(ErrorType::Value));
        }

        #[test]
        fn test_parameter_shadows_cell_address() {
            // A1 holds 1 in the dataset; inside the lambda it is the parameter
            let formula = LexerNode::lambda(&["A1"], LexerNode::operator("*", leaf("A1"), leaf("2")))
                .invoke(vec![leaf("4")]);
            assert_eq!(eval(&formula), Value::number(8));
        }

        #[test]
        fn test_parameter_bound_to_range() {
            let formula = LexerNode::lambda(&["r"], LexerNode::call("SUM", vec![leaf("r")]))
                .invoke(vec![leaf("A1:A4")]);
            assert_eq!(eval(&formula), Value::number(493));
        }
    }

    mod factory_tests {
        use super::*;

        #[test]
        fn test_unknown_function_is_name_error() {
            let formula = LexerNode::call("SUMIFF", vec![leaf("A1:A4"), leaf("1")]);
            let result = eval(&formula);
            let err = result.as_error().unwrap();
            assert_eq!(err.kind, ErrorType::Name);
            assert!(err.message.as_deref().unwrap().contains("SUMIF"));
        }

        #[test]
        fn test_unclaimed_token_is_name_error() {
            let root = AstBuilder::new().build(&leaf("undefined_name"), &config());
            assert_eq!(root.node_type(), NodeType::Error);
            assert_eq!(root.error_value().map(|e| e.kind), Some(ErrorType::Name));
        }

        #[test]
        fn test_unknown_sheet_is_ref_error() {
            let result = eval(&LexerNode::operator("+", leaf("Missing!A1"), leaf("1")));
            assert_eq!(error_kind(&result), Some(ErrorType::Ref));
        }

        #[test]
        fn test_out_of_range_address_is_ref_error() {
            assert_eq!(error_kind(&eval(&leaf("A99999999"))), Some(ErrorType::Ref));
        }

        #[test]
        fn test_node_types() {
            let config = config();
            let builder = AstBuilder::new();
            let formula = LexerNode::operator("+", leaf("A1"), LexerNode::call("SUM", vec![leaf("\"x\"")]));
            let root = builder.build(&formula, &config);
            assert_eq!(root.node_type(), NodeType::Operator);
            assert_eq!(root.children()[0].node_type(), NodeType::Reference);
            assert_eq!(root.children()[1].node_type(), NodeType::Function);
            assert_eq!(root.children()[1].children()[0].node_type(), NodeType::Value);
        }

        #[test]
        fn test_empty_builder_claims_nothing() {
            let root = AstBuilder::empty().build(&leaf("1"), &config());
            assert_eq!(root.node_type(), NodeType::Error);
        }

        #[test]
        fn test_lexer_tree_from_json() {
            let json = r#"{
                "token": "&",
                "children": [
                    { "token": "\"total: \"" },
                    { "token": "SUM", "is_call": true, "children": [{ "token": "A1:A2" }] }
                ]
            }"#;
            let lexer: LexerNode = serde_json::from_str(json).unwrap();
            assert_eq!(eval(&lexer), Value::from("total: 5"));
        }
    }

    mod write_back_tests {
        use super::*;

        fn grid() -> Operand {
            Operand::from(Value::Array(ArrayValue::from_rows(vec![
                vec![Value::number(1), Value::number(2)],
                vec![Value::number(3), Value::from("four")],
            ])))
        }

        #[test]
        fn test_array_scatters_from_anchor() {
            let mut interpreter = Interpreter::new(config());
            interpreter.set_runtime_data(5, 5, SHEET, &grid());
            let data = interpreter.runtime_data();
            assert_eq!(data.get_cell(UNIT, SHEET, 5, 5), Some(&number_cell(1)));
            assert_eq!(data.get_cell(UNIT, SHEET, 6, 5), Some(&number_cell(3)));
            assert_eq!(data.get_cell(UNIT, SHEET, 6, 6), Some(&CellData::text("four")));
        }

        #[test]
        fn test_spill_limit_writes_single_error() {
            let options = InterpreterOptions::default().with_max_spill_cells(3);
            let mut interpreter = Interpreter::new(config().with_options(options));
            interpreter.set_runtime_data(0, 0, SHEET, &grid());

            let data = interpreter.runtime_data();
            let anchor = data.get_cell(UNIT, SHEET, 0, 0).map(CellData::to_value);
            assert_eq!(anchor.as_ref().and_then(error_kind), Some(ErrorType::Spill));
            assert!(data.get_cell(UNIT, SHEET, 0, 1).map_or(true, CellData::is_empty));
        }

        #[test]
        fn test_reference_result_scatters_values() {
            let config = config();
            let mut root = AstBuilder::new().build(&leaf("A2:A3"), &config);
            let mut interpreter = Interpreter::new(config);
            let result = interpreter.execute(Some(&mut root));
            interpreter.set_runtime_data(0, 3, SHEET, &result);

            let data = interpreter.runtime_data();
            assert_eq!(data.get_cell(UNIT, SHEET, 0, 3), Some(&number_cell(4)));
            assert_eq!(data.get_cell(UNIT, SHEET, 1, 3), Some(&number_cell(44)));
        }

        #[test]
        fn test_cell_values() {
            assert_eq!(Interpreter::object_value_to_cell_value(&Value::Null), CellData::empty());
            assert_eq!(Interpreter::object_value_to_cell_value(&Value::Bool(true)), CellData::boolean(true));
            let err = Interpreter::object_value_to_cell_value(&Value::error(ErrorType::Na));
            assert_eq!(err.to_value(), Value::error(ErrorType::Na));
        }

        #[test]
        fn test_runtime_overlay_read_by_later_formula() {
            let config = config().with_cell(0, 0);
            let builder = AstBuilder::new();
            let mut interpreter = Interpreter::new(config.clone());

            let mut first = builder.build(&LexerNode::operator("+", leaf("1"), leaf("1")), &config);
            let result = interpreter.execute(Some(&mut first));
            interpreter.commit(&result);

            // A1 is 1 in the dataset, 2 in the runtime overlay
            let mut second = builder.build(&LexerNode::operator("*", leaf("A1"), leaf("10")), &config);
            assert_eq!(interpreter.execute(Some(&mut second)).into_value(), Value::number(20));
        }

        #[test]
        fn test_blank_result_shadows_dataset_cell() {
            let config = config().with_cell(0, 0);
            let builder = AstBuilder::new();
            let mut interpreter = Interpreter::new(config.clone());

            let mut first = builder.build(&leaf("D9"), &config);
            let result = interpreter.execute(Some(&mut first));
            interpreter.commit(&result);

            let mut second = builder.build(&leaf("A1"), &config);
            assert_eq!(interpreter.execute(Some(&mut second)).into_value(), Value::Null);
            // Neighbours still come from the dataset
            let mut third = builder.build(&leaf("A2"), &config);
            assert_eq!(interpreter.execute(Some(&mut third)).into_value(), Value::number(4));
        }
    }

    mod engine_tests {
        use super::*;

        #[test]
        fn test_calculate_commits_to_active_cell() {
            let engine = FormulaEngine::default();
            let config = engine.config(UNIT, SHEET).with_dataset(dataset()).with_cell(4, 0);
            let outcome = engine.calculate(&LexerNode::call("SUM", vec![leaf("A1:A4")]), config);

            assert_eq!(outcome.value, Value::number(493));
            assert_eq!((outcome.row, outcome.column), (4, 0));
            assert_eq!(outcome.runtime.get_cell(UNIT, SHEET, 4, 0), Some(&number_cell(493)));
        }

        #[tokio::test]
        async fn test_calculate_async() {
            let engine = FormulaEngine::new(gridcalc_std::standard_registry().with_function(Fetch));
            let config = engine.config(UNIT, SHEET);
            let formula = LexerNode::operator("/", LexerNode::call("FETCH", vec![]), leaf("4"));
            let outcome = engine.calculate_async(&formula, config).await;
            assert_eq!(outcome.value.to_string(), "10.5");
        }

        #[test]
        fn test_single_cell_formula_yields_scalar() {
            let engine = FormulaEngine::default();
            let config = engine.config(UNIT, SHEET).with_dataset(dataset());
            let outcome = engine.calculate(&leaf("A2"), config);
            assert_eq!(outcome.value, Value::number(4));
        }

        #[test]
        fn test_outcome_serializes() {
            let engine = FormulaEngine::default();
            let outcome = engine.calculate(&leaf("TRUE"), engine.config(UNIT, SHEET));
            let json = serde_json::to_value(&outcome).unwrap();
            assert_eq!(json["runtime"][UNIT][SHEET]["0"]["0"]["v"], serde_json::json!(true));
        }

        #[test]
        fn test_registry_exposes_standard_library() {
            let engine = FormulaEngine::default();
            assert!(engine.registry().contains("sumif"));
            assert!(engine.registry().contains("AVERAGEIF"));
        }
    }
}
