//! Parser output consumed by the AST builder
//!
//! Formula text is tokenised and parsed elsewhere; this is the tree shape
//! that arrives here. Operators carry their operands as children, calls
//! carry their arguments, and a LAMBDA carries its parameter names followed
//! by its body, with the invocation arguments kept separately.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexerNode {
    pub token: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LexerNode>,

    /// `NAME(...)` call syntax
    #[serde(default)]
    pub is_call: bool,

    /// Arguments of an immediately invoked LAMBDA: `LAMBDA(x, x + 1)(5)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation: Option<Vec<LexerNode>>,
}

impl LexerNode {
    pub fn leaf(token: impl Into<String>) -> Self {
        Self { token: token.into(), children: Vec::new(), is_call: false, invocation: None }
    }

    pub fn call(name: impl Into<String>, args: Vec<LexerNode>) -> Self {
        Self { token: name.into(), children: args, is_call: true, invocation: None }
    }

    pub fn operator(op: impl Into<String>, left: LexerNode, right: LexerNode) -> Self {
        Self { token: op.into(), children: vec![left, right], is_call: false, invocation: None }
    }

    /// Prefix `-`/`+` or postfix `%`
    pub fn unary(op: impl Into<String>, operand: LexerNode) -> Self {
        Self { token: op.into(), children: vec![operand], is_call: false, invocation: None }
    }

    pub fn lambda(parameters: &[&str], body: LexerNode) -> Self {
        let mut children: Vec<LexerNode> = parameters.iter().map(|p| LexerNode::leaf(*p)).collect();
        children.push(body);
        Self::call("LAMBDA", children)
    }

    /// Builder: invoke a LAMBDA with arguments
    pub fn invoke(mut self, args: Vec<LexerNode>) -> Self {
        self.invocation = Some(args);
        self
    }

    pub fn is_leaf(&self) -> bool {
        !self.is_call && self.children.is_empty()
    }
}
