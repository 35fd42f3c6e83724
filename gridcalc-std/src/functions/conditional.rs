//! Conditional aggregation: SUMIF, COUNTIF, AVERAGEIF
//!
//! The criteria range and the aggregated range are walked in lockstep by
//! offset, so both must have the same shape. Matching cells that are not
//! numbers (text, booleans, blanks, errors) are skipped, not fatal.

use super::criteria::Criteria;
use gridcalc_plugin::prelude::*;

/// Resolve `(range, criteria, [target])` into matched target cells.
fn matched_targets(name: &str, args: &[Operand], allow_target: bool) -> Result<Vec<Value>, FormulaError> {
    let max = if allow_target { 3 } else { 2 };
    if args.len() < 2 || args.len() > max {
        let expected = if allow_target { "2 or 3" } else { "2" };
        return Err(FormulaError::arg_count(name, expected, args.len()));
    }

    let range = &args[0];
    let target = args.get(2).unwrap_or(range);
    for arg in [range, target] {
        if let Some(e) = arg.as_error() {
            return Err(e.clone());
        }
    }

    let criteria = Criteria::parse(&args[1])?;

    if range.shape() != target.shape() {
        let (rows, columns) = range.shape();
        let (target_rows, target_columns) = target.shape();
        return Err(FormulaError::value().with_message(format!(
            "{}: range is {}x{} but the aggregated range is {}x{}",
            name, rows, columns, target_rows, target_columns
        )));
    }

    let matched: Vec<Value> = range
        .cells()
        .into_iter()
        .zip(target.cells())
        .filter(|(cell, _)| criteria.matches(cell))
        .map(|(_, target)| target)
        .collect();

    tracing::trace!(function = name, ?criteria, matched = matched.len(), "criteria applied");
    Ok(matched)
}

/// Decimal-exact sum of the numeric cells, with their count
fn numeric_total(cells: &[Value]) -> (Number, usize) {
    cells
        .iter()
        .filter_map(Value::as_number)
        .fold((Number::zero(), 0), |(total, count), n| (total.add(n), count + 1))
}

fn finish(result: Result<Value, FormulaError>) -> Operand {
    match result {
        Ok(v) => v.into(),
        Err(e) => e.into(),
    }
}

pub struct Sumif;

static SUMIF_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("range", "Range", "Cells tested against the criteria"),
    ArgMeta::required("criteria", "Text|Number", "Condition such as \">40\" or \"test*\""),
    ArgMeta::optional("sum_range", "Range", "Cells to add; defaults to range", "range"),
];
static SUMIF_EXAMPLES: [&str; 2] = ["SUMIF(A1:A4, \">40\")", "SUMIF(B2:B4, \"test*\", C2:C4)"];

impl FunctionExecutor for Sumif {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "SUMIF",
            description: "Sum of the cells whose criteria cell matches",
            usage: "SUMIF(range, criteria, [sum_range])",
            args: &SUMIF_ARGS,
            returns: "Number",
            examples: &SUMIF_EXAMPLES,
            category: "conditional",
        }
    }

    fn calculate(&self, args: &[Operand]) -> Operand {
        finish(matched_targets("SUMIF", args, true).map(|cells| Value::Number(numeric_total(&cells).0)))
    }
}

pub struct Countif;

static COUNTIF_ARGS: [ArgMeta; 2] = [
    ArgMeta::required("range", "Range", "Cells tested against the criteria"),
    ArgMeta::required("criteria", "Text|Number", "Condition such as \"<>x\""),
];
static COUNTIF_EXAMPLES: [&str; 1] = ["COUNTIF(B2:B4, \"test*\")"];

impl FunctionExecutor for Countif {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "COUNTIF",
            description: "Number of cells matching the criteria",
            usage: "COUNTIF(range, criteria)",
            args: &COUNTIF_ARGS,
            returns: "Number",
            examples: &COUNTIF_EXAMPLES,
            category: "conditional",
        }
    }

    fn calculate(&self, args: &[Operand]) -> Operand {
        finish(matched_targets("COUNTIF", args, false).map(|cells| Value::from(cells.len() as i64)))
    }
}

pub struct Averageif;

static AVERAGEIF_ARGS: [ArgMeta; 3] = [
    ArgMeta::required("range", "Range", "Cells tested against the criteria"),
    ArgMeta::required("criteria", "Text|Number", "Condition such as \">=10\""),
    ArgMeta::optional("average_range", "Range", "Cells to average; defaults to range", "range"),
];
static AVERAGEIF_EXAMPLES: [&str; 1] = ["AVERAGEIF(A1:A4, \">1\")"];

impl FunctionExecutor for Averageif {
    fn meta(&self) -> FunctionMeta {
        FunctionMeta {
            name: "AVERAGEIF",
            description: "Mean of the numeric cells whose criteria cell matches",
            usage: "AVERAGEIF(range, criteria, [average_range])",
            args: &AVERAGEIF_ARGS,
            returns: "Number",
            examples: &AVERAGEIF_EXAMPLES,
            category: "conditional",
        }
    }

    fn calculate(&self, args: &[Operand]) -> Operand {
        finish(matched_targets("AVERAGEIF", args, true).and_then(|cells| {
            let (total, count) = numeric_total(&cells);
            let mean = total.checked_div(&Number::from_i64(count as i64))?;
            Ok(Value::Number(mean))
        }))
    }
}
