//! Aggregate functions

use gridcalc_plugin::prelude::*;

pub struct Sum;

static SUM_ARGS: [ArgMeta; 1] = [ArgMeta::required("values", "Number...", "Values or ranges to sum")];
static SUM_EXAMPLES: [&str; 2] = ["SUM(1, 2, 3) → 6", "SUM(A1:A4)"];

impl FunctionExecutor for Sum {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "SUM",
            description: "Sum of values. Text and booleans inside ranges are ignored",
            usage: "SUM(a, b, ...)",
            args: &SUM_ARGS,
            returns: "Number",
            examples: &SUM_EXAMPLES,
            category: "aggregate",
        }
    }

    fn calculate(&self, args: &[Operand]) -> Operand {
        if args.is_empty() {
            return FormulaError::arg_count("SUM", "at least 1", 0).into();
        }

        let mut total = Number::zero();
        for arg in args {
            if arg.is_range() {
                for cell in arg.cells() {
                    match cell {
                        Value::Number(n) => total = total.add(&n),
                        Value::Error(e) => return e.into(),
                        _ => {}
                    }
                }
            } else {
                match arg.to_scalar().coerce_to_number() {
                    Ok(n) => total = total.add(&n),
                    Err(e) => return e.into(),
                }
            }
        }
        Value::Number(total).into()
    }
}
