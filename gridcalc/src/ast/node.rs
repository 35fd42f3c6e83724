//! AST nodes
//!
//! A node wraps its children, a cached result, and an async flag that is
//! set when the node or any descendant calls an asynchronous function.
//! `execute` assumes every child has already been executed; the
//! interpreter drives the post-order walk.

use super::lambda::{Binding, LambdaScope};
use super::operator::Operator;
use crate::interpreter::{walk, walk_async, BoxFuture, Runtime};
use gridcalc_core::{CellRange, FormulaError, Operand, Value};
use gridcalc_plugin::FunctionExecutor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Value,
    Operator,
    Function,
    Reference,
    Lambda,
    LambdaParameter,
    Error,
}

impl NodeType {
    /// Factory ranking; higher claims a lexer node first.
    pub fn priority(self) -> u32 {
        match self {
            NodeType::LambdaParameter => 60,
            NodeType::Lambda => 50,
            NodeType::Function => 40,
            NodeType::Operator => 30,
            NodeType::Value => 20,
            NodeType::Reference => 10,
            NodeType::Error => 0,
        }
    }
}

enum NodeKind {
    Value(Value),
    Operator(Operator),
    Function(Arc<dyn FunctionExecutor>),
    Reference { unit_id: String, sheet_id: String, range: CellRange },
    Lambda(LambdaDefinition),
    LambdaParameter { name: String, scope: LambdaScope },
    Error(FormulaError),
}

struct LambdaDefinition {
    parameters: Vec<String>,
    scope: LambdaScope,
    body: Box<AstNode>,
    invoked: bool,
}

impl LambdaDefinition {
    /// Bind invocation arguments to parameter names, in order.
    fn bind(&self, args: &[AstNode]) -> Result<(), FormulaError> {
        if !self.invoked {
            return Err(FormulaError::value().with_message("LAMBDA defined but never called"));
        }
        if args.len() > self.parameters.len() {
            return Err(FormulaError::arg_count(
                "LAMBDA",
                &self.parameters.len().to_string(),
                args.len(),
            ));
        }

        self.scope.clear();
        for (name, arg) in self.parameters.iter().zip(args) {
            let binding = match &arg.kind {
                NodeKind::LambdaParameter { name: forwarded, scope } => Binding::Parameter {
                    name: forwarded.clone(),
                    scope: scope.clone(),
                },
                _ => Binding::Resolved(arg.result.clone().unwrap_or_else(missing_operand)),
            };
            self.scope.bind(name, binding);
        }
        Ok(())
    }
}

fn missing_operand() -> Operand {
    Operand::from(FormulaError::value().with_message("Operand was not evaluated"))
}

pub struct AstNode {
    token: String,
    kind: NodeKind,
    children: Vec<AstNode>,
    result: Option<Operand>,
    is_async: bool,
}

impl AstNode {
    fn new(token: impl Into<String>, kind: NodeKind, children: Vec<AstNode>) -> Self {
        let is_async = children.iter().any(AstNode::is_async)
            || match &kind {
                NodeKind::Function(f) => f.is_async(),
                NodeKind::Lambda(lambda) => lambda.body.is_async(),
                _ => false,
            };
        Self { token: token.into(), kind, children, result: None, is_async }
    }

    // ========== Constructors ==========

    pub fn literal(token: impl Into<String>, value: Value) -> Self {
        Self::new(token, NodeKind::Value(value), Vec::new())
    }

    pub fn error(token: impl Into<String>, error: FormulaError) -> Self {
        Self::new(token, NodeKind::Error(error), Vec::new())
    }

    pub fn operator(token: impl Into<String>, op: Operator, children: Vec<AstNode>) -> Self {
        Self::new(token, NodeKind::Operator(op), children)
    }

    pub fn function(token: impl Into<String>, executor: Arc<dyn FunctionExecutor>, children: Vec<AstNode>) -> Self {
        Self::new(token, NodeKind::Function(executor), children)
    }

    pub fn reference(
        token: impl Into<String>,
        unit_id: impl Into<String>,
        sheet_id: impl Into<String>,
        range: CellRange,
    ) -> Self {
        let kind = NodeKind::Reference { unit_id: unit_id.into(), sheet_id: sheet_id.into(), range };
        Self::new(token, kind, Vec::new())
    }

    /// `invocation` holds the call arguments; `None` for a lambda that is
    /// only defined.
    pub fn lambda(
        token: impl Into<String>,
        parameters: Vec<String>,
        scope: LambdaScope,
        body: AstNode,
        invocation: Option<Vec<AstNode>>,
    ) -> Self {
        let invoked = invocation.is_some();
        let definition = LambdaDefinition { parameters, scope, body: Box::new(body), invoked };
        Self::new(token, NodeKind::Lambda(definition), invocation.unwrap_or_default())
    }

    pub fn parameter(token: impl Into<String>, scope: LambdaScope) -> Self {
        let token = token.into();
        let kind = NodeKind::LambdaParameter { name: token.clone(), scope };
        Self::new(token, kind, Vec::new())
    }

    // ========== Accessors ==========

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn node_type(&self) -> NodeType {
        match &self.kind {
            NodeKind::Value(_) => NodeType::Value,
            NodeKind::Operator(_) => NodeType::Operator,
            NodeKind::Function(_) => NodeType::Function,
            NodeKind::Reference { .. } => NodeType::Reference,
            NodeKind::Lambda(_) => NodeType::Lambda,
            NodeKind::LambdaParameter { .. } => NodeType::LambdaParameter,
            NodeKind::Error(_) => NodeType::Error,
        }
    }

    pub fn children(&self) -> &[AstNode] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [AstNode] {
        &mut self.children
    }

    /// Cached result of the last `execute`
    pub fn value(&self) -> Option<&Operand> {
        self.result.as_ref()
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Whether this node itself must be awaited
    pub fn is_async_function(&self) -> bool {
        matches!(&self.kind, NodeKind::Function(f) if f.is_async())
    }

    /// Body of a LAMBDA node
    pub fn lambda_body(&self) -> Option<&AstNode> {
        match &self.kind {
            NodeKind::Lambda(lambda) => Some(&lambda.body),
            _ => None,
        }
    }

    /// Build-time error carried by an ERROR node
    pub fn error_value(&self) -> Option<&FormulaError> {
        match &self.kind {
            NodeKind::Error(e) => Some(e),
            _ => None,
        }
    }

    // ========== Execution ==========

    /// Evaluate this node from its children's cached results.
    pub fn execute(&mut self, runtime: &mut Runtime<'_>) {
        let result = match &mut self.kind {
            NodeKind::Value(v) => Operand::from(v.clone()),
            NodeKind::Error(e) => Operand::from(e.clone()),
            NodeKind::Operator(op) => {
                let operands: Vec<Value> = self.children.iter().map(child_value).collect();
                Operand::from(op.apply(&operands))
            }
            NodeKind::Function(f) => f.calculate(&child_operands(&self.children)),
            NodeKind::Reference { unit_id, sheet_id, range } => {
                Operand::from(runtime.reference(unit_id, sheet_id, *range))
            }
            NodeKind::LambdaParameter { name, scope } => scope
                .resolve(name, runtime.options().max_parameter_depth)
                .unwrap_or_else(Operand::from),
            NodeKind::Lambda(lambda) => match lambda.bind(&self.children) {
                Ok(()) => {
                    walk(&mut lambda.body, runtime);
                    lambda.body.value().cloned().unwrap_or_else(missing_operand)
                }
                Err(e) => Operand::from(e),
            },
        };
        self.result = Some(result);
    }

    /// Same contract as `execute`, awaiting asynchronous functions.
    pub fn execute_async<'a, 'r: 'a>(&'a mut self, runtime: &'a mut Runtime<'r>) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if let NodeKind::Function(f) = &self.kind {
                if f.is_async() {
                    let f = Arc::clone(f);
                    let args = child_operands(&self.children);
                    self.result = Some(f.calculate_async(&args).await);
                    return;
                }
            }

            if let NodeKind::Lambda(lambda) = &mut self.kind {
                let result = match lambda.bind(&self.children) {
                    Ok(()) => {
                        walk_async(&mut lambda.body, runtime).await;
                        lambda.body.value().cloned().unwrap_or_else(missing_operand)
                    }
                    Err(e) => Operand::from(e),
                };
                self.result = Some(result);
                return;
            }

            self.execute(runtime);
        })
    }
}

/// Forced value of an evaluated child; unevaluated children are `#VALUE!`.
fn child_value(child: &AstNode) -> Value {
    child
        .result
        .clone()
        .map(Operand::into_value)
        .unwrap_or_else(|| missing_operand().into_value())
}

fn child_operands(children: &[AstNode]) -> Vec<Operand> {
    children
        .iter()
        .map(|c| c.result.clone().unwrap_or_else(missing_operand))
        .collect()
}

impl fmt::Debug for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AstNode");
        s.field("token", &self.token)
            .field("type", &self.node_type())
            .field("is_async", &self.is_async)
            .field("children", &self.children);
        if let Some(body) = self.lambda_body() {
            s.field("body", body);
        }
        s.field("result", &self.result).finish()
    }
}
