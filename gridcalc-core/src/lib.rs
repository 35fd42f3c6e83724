//! GridCalc Core - Fundamental types
//!
//! This crate provides the core types used throughout GridCalc:
//! - `Number`: Arbitrary precision decimals with an infinity escape hatch
//! - `Value`: Value objects (null, boolean, number, text, error, array) and
//!   their operator algebra
//! - `FormulaError`: Spreadsheet errors carried as values
//! - `Dataset` / `ReferenceObject`: Cell data and lazy range handles

mod array;
mod cell;
mod dataset;
mod error;
mod number;
mod operand;
mod ops;
mod reference;
mod value;
pub mod wildcard;

pub use array::ArrayValue;
pub use cell::{CellData, CellMatrix, CellValueType, RawValue};
pub use dataset::Dataset;
pub use error::{ErrorType, FormulaError};
pub use number::{Number, NumberError};
pub use operand::Operand;
pub use ops::CompareToken;
pub use reference::{CellRange, DataLayers, ReferenceIter, ReferenceObject};
pub use value::Value;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ArrayValue, CellData, CompareToken, Dataset, ErrorType, FormulaError, Number, Operand,
        ReferenceObject, Value,
    };
}
