//! Abstract syntax tree
//!
//! Lexer nodes are turned into executable AST nodes by prioritised
//! factories. Lambda parameters share scopes with the LAMBDA node that
//! declares them.

mod address;
mod factory;
mod lambda;
mod node;
mod operator;

pub use address::{looks_like_reference, parse_a1, parse_range, AddressError, CellAddress, RangeAddress};
pub use factory::{
    AstBuilder, BuildContext, FunctionFactory, LambdaFactory, LambdaParameterFactory, NodeFactory,
    OperatorFactory, ReferenceFactory, ValueFactory,
};
pub use lambda::{Binding, LambdaScope};
pub use node::{AstNode, NodeType};
pub use operator::Operator;
