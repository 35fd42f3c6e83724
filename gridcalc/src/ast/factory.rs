//! Node factories
//!
//! Several factories may claim the same lexer node (a lambda parameter
//! named like a cell address, say). They are consulted in descending
//! priority and the first claim wins. Construction never fails: anything
//! left unclaimed becomes an ERROR node.

use super::address::{self, AddressError};
use super::lambda::LambdaScope;
use super::node::{AstNode, NodeType};
use super::operator::Operator;
use crate::lexer::LexerNode;
use gridcalc_core::{ArrayValue, ErrorType, FormulaError, Number, Value};
use gridcalc_plugin::InterpreterConfig;

/// State threaded through one tree build
pub struct BuildContext<'c> {
    config: &'c InterpreterConfig,
    /// Open LAMBDA scopes, innermost last
    scopes: Vec<(Vec<String>, LambdaScope)>,
}

impl<'c> BuildContext<'c> {
    pub fn new(config: &'c InterpreterConfig) -> Self {
        Self { config, scopes: Vec::new() }
    }

    pub fn config(&self) -> &'c InterpreterConfig {
        self.config
    }

    /// Scope of the innermost open lambda declaring `name`
    pub fn parameter_scope(&self, name: &str) -> Option<&LambdaScope> {
        self.scopes
            .iter()
            .rev()
            .find(|(names, _)| names.iter().any(|n| n.eq_ignore_ascii_case(name)))
            .map(|(_, scope)| scope)
    }

    fn innermost_scope(&self) -> Option<&LambdaScope> {
        self.scopes.last().map(|(_, scope)| scope)
    }
}

pub trait NodeFactory: Send + Sync {
    fn node_type(&self) -> NodeType;

    fn priority(&self) -> u32 {
        self.node_type().priority()
    }

    fn claims(&self, lexer: &LexerNode, ctx: &BuildContext<'_>) -> bool;

    fn create(&self, lexer: &LexerNode, builder: &AstBuilder, ctx: &mut BuildContext<'_>) -> AstNode;
}

/// Builds an AST from parser output using prioritised factories
pub struct AstBuilder {
    factories: Vec<Box<dyn NodeFactory>>,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::empty()
            .with_factory(LambdaParameterFactory)
            .with_factory(LambdaFactory)
            .with_factory(FunctionFactory)
            .with_factory(OperatorFactory)
            .with_factory(ValueFactory)
            .with_factory(ReferenceFactory)
    }

    /// Builder with no factories; every token becomes an ERROR node.
    pub fn empty() -> Self {
        Self { factories: Vec::new() }
    }

    pub fn with_factory<F: NodeFactory + 'static>(mut self, factory: F) -> Self {
        self.factories.push(Box::new(factory));
        // Stable: equal priorities keep registration order
        self.factories.sort_by_key(|f| std::cmp::Reverse(f.priority()));
        self
    }

    pub fn build(&self, lexer: &LexerNode, config: &InterpreterConfig) -> AstNode {
        let mut ctx = BuildContext::new(config);
        self.build_node(lexer, &mut ctx)
    }

    pub fn build_node(&self, lexer: &LexerNode, ctx: &mut BuildContext<'_>) -> AstNode {
        match self.factories.iter().find(|f| f.claims(lexer, ctx)) {
            Some(factory) => factory.create(lexer, self, ctx),
            None => {
                tracing::debug!(token = %lexer.token, "no factory claimed token");
                AstNode::error(&lexer.token, FormulaError::name(&lexer.token))
            }
        }
    }

    pub fn build_children(&self, children: &[LexerNode], ctx: &mut BuildContext<'_>) -> Vec<AstNode> {
        children.iter().map(|child| self.build_node(child, ctx)).collect()
    }
}

impl Default for AstBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Factories ==========

pub struct LambdaParameterFactory;

impl NodeFactory for LambdaParameterFactory {
    fn node_type(&self) -> NodeType {
        NodeType::LambdaParameter
    }

    fn claims(&self, lexer: &LexerNode, ctx: &BuildContext<'_>) -> bool {
        lexer.is_leaf() && ctx.parameter_scope(&lexer.token).is_some()
    }

    fn create(&self, lexer: &LexerNode, _builder: &AstBuilder, ctx: &mut BuildContext<'_>) -> AstNode {
        match ctx.parameter_scope(&lexer.token) {
            Some(scope) => AstNode::parameter(&lexer.token, scope.clone()),
            None => AstNode::error(&lexer.token, FormulaError::spill()),
        }
    }
}

pub struct LambdaFactory;

impl NodeFactory for LambdaFactory {
    fn node_type(&self) -> NodeType {
        NodeType::Lambda
    }

    fn claims(&self, lexer: &LexerNode, _ctx: &BuildContext<'_>) -> bool {
        lexer.is_call && lexer.token.eq_ignore_ascii_case("LAMBDA")
    }

    fn create(&self, lexer: &LexerNode, builder: &AstBuilder, ctx: &mut BuildContext<'_>) -> AstNode {
        let Some((body, declared)) = lexer.children.split_last() else {
            return AstNode::error(&lexer.token, FormulaError::arg_count("LAMBDA", "at least 1", 0));
        };

        let mut parameters = Vec::with_capacity(declared.len());
        for param in declared {
            if !param.is_leaf() || param.token.is_empty() {
                return AstNode::error(
                    &lexer.token,
                    FormulaError::value().with_message(format!("Invalid LAMBDA parameter: {}", param.token)),
                );
            }
            parameters.push(param.token.clone());
        }

        // Arguments are evaluated in the caller's scope
        let invocation = lexer
            .invocation
            .as_ref()
            .map(|args| builder.build_children(args, ctx));

        let scope = ctx.innermost_scope().map(LambdaScope::child).unwrap_or_default();
        ctx.scopes.push((parameters.clone(), scope.clone()));
        let body = builder.build_node(body, ctx);
        ctx.scopes.pop();

        AstNode::lambda(&lexer.token, parameters, scope, body, invocation)
    }
}

pub struct FunctionFactory;

impl NodeFactory for FunctionFactory {
    fn node_type(&self) -> NodeType {
        NodeType::Function
    }

    fn claims(&self, lexer: &LexerNode, _ctx: &BuildContext<'_>) -> bool {
        lexer.is_call
    }

    fn create(&self, lexer: &LexerNode, builder: &AstBuilder, ctx: &mut BuildContext<'_>) -> AstNode {
        let registry = &ctx.config().registry;
        match registry.get(&lexer.token) {
            Some(executor) => {
                let children = builder.build_children(&lexer.children, ctx);
                AstNode::function(&lexer.token, executor, children)
            }
            None => {
                let error = registry.unknown_function(&lexer.token);
                AstNode::error(&lexer.token, error)
            }
        }
    }
}

pub struct OperatorFactory;

impl NodeFactory for OperatorFactory {
    fn node_type(&self) -> NodeType {
        NodeType::Operator
    }

    fn claims(&self, lexer: &LexerNode, _ctx: &BuildContext<'_>) -> bool {
        !lexer.is_call && Operator::parse(&lexer.token, lexer.children.len()).is_some()
    }

    fn create(&self, lexer: &LexerNode, builder: &AstBuilder, ctx: &mut BuildContext<'_>) -> AstNode {
        match Operator::parse(&lexer.token, lexer.children.len()) {
            Some(op) => {
                let children = builder.build_children(&lexer.children, ctx);
                AstNode::operator(&lexer.token, op, children)
            }
            None => AstNode::error(&lexer.token, FormulaError::name(&lexer.token)),
        }
    }
}

pub struct ValueFactory;

impl ValueFactory {
    fn is_literal(token: &str) -> bool {
        token.eq_ignore_ascii_case("TRUE")
            || token.eq_ignore_ascii_case("FALSE")
            || ErrorType::from_token(token).is_some()
            || Number::from_str(token).is_ok()
            || (token.len() >= 2 && token.starts_with('"') && token.ends_with('"'))
            || (token.starts_with('{') && token.ends_with('}'))
    }

    /// Array constant `{1,2;3,4}`: `;` separates rows, `,` separates cells.
    fn parse_array(token: &str) -> Value {
        let inner = &token[1..token.len() - 1];
        if inner.trim().is_empty() {
            return Value::Error(FormulaError::value().with_message("Empty array constant"));
        }
        let rows: Vec<Vec<Value>> = inner
            .split(';')
            .map(|row| row.split(',').map(|cell| Value::from_literal(cell.trim())).collect())
            .collect();
        let width = rows[0].len();
        if rows.iter().any(|r| r.len() != width) {
            return Value::Error(FormulaError::value().with_message("Ragged array constant"));
        }
        Value::Array(ArrayValue::from_rows(rows))
    }
}

impl NodeFactory for ValueFactory {
    fn node_type(&self) -> NodeType {
        NodeType::Value
    }

    fn claims(&self, lexer: &LexerNode, _ctx: &BuildContext<'_>) -> bool {
        lexer.is_leaf() && Self::is_literal(&lexer.token)
    }

    fn create(&self, lexer: &LexerNode, _builder: &AstBuilder, _ctx: &mut BuildContext<'_>) -> AstNode {
        let token = lexer.token.as_str();
        let value = if token.starts_with('{') && token.ends_with('}') && token.len() >= 2 {
            Self::parse_array(token)
        } else {
            Value::from_literal(token)
        };
        AstNode::literal(token, value)
    }
}

pub struct ReferenceFactory;

impl NodeFactory for ReferenceFactory {
    fn node_type(&self) -> NodeType {
        NodeType::Reference
    }

    fn claims(&self, lexer: &LexerNode, _ctx: &BuildContext<'_>) -> bool {
        lexer.is_leaf() && address::looks_like_reference(&lexer.token)
    }

    fn create(&self, lexer: &LexerNode, _builder: &AstBuilder, ctx: &mut BuildContext<'_>) -> AstNode {
        let config = ctx.config();
        let resolved = address::parse_range(&lexer.token).and_then(|parsed| {
            let sheet_id = match &parsed.sheet {
                Some(name) => config
                    .resolve_sheet(name)
                    .ok_or_else(|| AddressError::UnknownSheet(name.clone()))?,
                None => config.sheet_id.clone(),
            };
            Ok((sheet_id, parsed.range))
        });

        match resolved {
            Ok((sheet_id, range)) => AstNode::reference(&lexer.token, &config.unit_id, sheet_id, range),
            Err(e) => {
                tracing::debug!(token = %lexer.token, error = %e, "invalid reference");
                AstNode::error(&lexer.token, FormulaError::reference().with_message(e.to_string()))
            }
        }
    }
}
