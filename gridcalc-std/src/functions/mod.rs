//! Built-in spreadsheet functions

mod aggregate;
mod conditional;
pub mod criteria;

pub use aggregate::Sum;
pub use conditional::{Averageif, Countif, Sumif};
pub use criteria::Criteria;
