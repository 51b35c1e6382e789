// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Expression AST
//!
//! A closed set of node variants. Every [`Node`] owns its children outright
//! and carries the `[start, end)` span of the text it was parsed from.

use super::literal::LiteralValue;
use super::operator::{BinaryOperator, IncDecOperator, UnaryOperator};
use crate::parser::span::Span;
use std::sync::Arc;

/// A node of the expression tree with its source span
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node payload
    pub kind: NodeKind,
    /// Source span
    pub span: Span,
}

/// Which element(s) a selection keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionVariant {
    /// `?[...]`, every matching element
    All,
    /// `^[...]`, the first matching element
    First,
    /// `$[...]`, the last matching element
    Last,
}

impl SelectionVariant {
    /// Opening bracket of the selection
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::All => "?[",
            Self::First => "^[",
            Self::Last => "$[",
        }
    }
}

/// The main expression node variants
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Literal value (string, number, boolean, null)
    Literal(LiteralValue),

    /// Property or field access on the active context object (e.g., "name")
    PropertyOrField {
        /// Property name
        name: Arc<str>,
        /// Reached through `?.`
        null_safe: bool,
    },

    /// Method call on the active context object (e.g., "substring(1, 3)")
    MethodReference {
        /// Method name
        name: Arc<str>,
        /// Call arguments
        args: Vec<Node>,
        /// Reached through `?.`
        null_safe: bool,
    },

    /// Call of a function stored in a variable (e.g., "#reverse('abc')")
    FunctionReference {
        /// Function name without `#`
        name: Arc<str>,
        /// Call arguments
        args: Vec<Node>,
    },

    /// Variable reference (e.g., "#this", "#root", "#count")
    VariableReference {
        /// Variable name without `#`
        name: Arc<str>,
    },

    /// Bean reference (e.g., "@orders", "&orderFactory")
    BeanReference {
        /// Bean name without the sigil
        name: Arc<str>,
        /// `&` factory reference
        factory: bool,
    },

    /// Type reference (e.g., "T(Integer)", "T(String[])")
    TypeReference {
        /// Qualified type name
        name: Arc<str>,
        /// Number of trailing `[]` pairs
        dimensions: usize,
    },

    /// Constructor call (e.g., "new Person('x')")
    ConstructorReference {
        /// Qualified type name
        type_name: Arc<str>,
        /// Constructor arguments
        args: Vec<Node>,
    },

    /// Array construction (e.g., "new int[3]", "new String[]{'a'}")
    ArrayConstructor {
        /// Qualified component type name
        type_name: Arc<str>,
        /// One entry per `[]` pair, `None` when the dimension is omitted
        dimensions: Vec<Option<Node>>,
        /// Inline initializer list
        initializer: Option<Box<Node>>,
    },

    /// Index access (e.g., "[0]", "['key']")
    Indexer {
        /// Index expression
        index: Box<Node>,
        /// Reached through `?.`
        null_safe: bool,
    },

    /// Collection selection (e.g., "?[age > 18]")
    Selection {
        /// Which matches to keep
        variant: SelectionVariant,
        /// Boolean criteria evaluated per element
        criteria: Box<Node>,
        /// Reached through `?.`
        null_safe: bool,
    },

    /// Collection projection (e.g., "![name]")
    Projection {
        /// Expression evaluated per element
        expression: Box<Node>,
        /// Reached through `?.`
        null_safe: bool,
    },

    /// Inline list (e.g., "{1, 2, 3}")
    InlineList(Vec<Node>),

    /// Inline map (e.g., "{a: 1, b: 2}")
    InlineMap(Vec<(Node, Node)>),

    /// Navigation chain (e.g., "a.b[0].c()")
    Compound(Vec<Node>),

    /// Assignment (e.g., "name = 'x'")
    Assign {
        /// Reference being written
        target: Box<Node>,
        /// Value expression
        value: Box<Node>,
    },

    /// Elvis (e.g., "name ?: 'unknown'")
    Elvis {
        /// Preferred value
        value: Box<Node>,
        /// Used when the value is null or empty
        fallback: Box<Node>,
    },

    /// Ternary (e.g., "a > b ? a : b")
    Ternary {
        /// Boolean condition
        condition: Box<Node>,
        /// Result when true
        if_true: Box<Node>,
        /// Result when false
        if_false: Box<Node>,
    },

    /// Binary operation (e.g., "age > 18")
    Binary {
        /// Operator
        op: BinaryOperator,
        /// Left operand
        left: Box<Node>,
        /// Right operand
        right: Box<Node>,
    },

    /// Unary operation (e.g., "-5", "!active")
    Unary {
        /// Operator
        op: UnaryOperator,
        /// Operand
        operand: Box<Node>,
    },

    /// Increment or decrement (e.g., "count++", "--count")
    IncDec {
        /// Operator
        op: IncDecOperator,
        /// Prefix form
        prefix: bool,
        /// Writable operand
        operand: Box<Node>,
    },
}

impl Node {
    /// Create a node
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Start offset of the node
    pub fn start(&self) -> usize {
        self.span.start
    }

    /// End offset of the node
    pub fn end(&self) -> usize {
        self.span.end
    }

    /// Direct children in source order
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Literal(_)
            | NodeKind::PropertyOrField { .. }
            | NodeKind::VariableReference { .. }
            | NodeKind::BeanReference { .. }
            | NodeKind::TypeReference { .. } => Vec::new(),
            NodeKind::MethodReference { args, .. }
            | NodeKind::FunctionReference { args, .. }
            | NodeKind::ConstructorReference { args, .. } => args.iter().collect(),
            NodeKind::ArrayConstructor {
                dimensions,
                initializer,
                ..
            } => dimensions
                .iter()
                .flatten()
                .chain(initializer.as_deref())
                .collect(),
            NodeKind::Indexer { index, .. } => vec![index],
            NodeKind::Selection { criteria, .. } => vec![criteria],
            NodeKind::Projection { expression, .. } => vec![expression],
            NodeKind::InlineList(items) | NodeKind::Compound(items) => items.iter().collect(),
            NodeKind::InlineMap(entries) => entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            NodeKind::Assign { target, value } => vec![target, value],
            NodeKind::Elvis { value, fallback } => vec![value, fallback],
            NodeKind::Ternary {
                condition,
                if_true,
                if_false,
            } => vec![condition, if_true, if_false],
            NodeKind::Binary { left, right, .. } => vec![left, right],
            NodeKind::Unary { operand, .. } | NodeKind::IncDec { operand, .. } => vec![operand],
        }
    }

    /// Visit this node and all descendants, parents first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// True when any node in the tree satisfies `predicate`
    pub fn any(&self, predicate: &impl Fn(&Node) -> bool) -> bool {
        predicate(self) || self.children().into_iter().any(|child| child.any(predicate))
    }

    /// True for a literal node
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    /// Name of a bare property reference, used for map keys like `map[key]`
    pub fn as_property_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::PropertyOrField { name, .. } => Some(name),
            _ => None,
        }
    }
}
