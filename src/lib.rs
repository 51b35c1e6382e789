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

//! Embeddable expression language engine
//!
//! Expressions are parsed once by an [`ExpressionParser`] and evaluated
//! any number of times against an [`EvaluationContext`]:
//!
//! ```
//! use kestrel_expr::{ExpressionParser, StandardEvaluationContext, Value};
//!
//! let parser = ExpressionParser::new();
//! let expr = parser.parse_expression("'Hello ' + #name").unwrap();
//! let ctx = StandardEvaluationContext::new().with_variable("name", Value::from("World"));
//! assert_eq!(expr.get_value(&ctx).unwrap(), Value::from("Hello World"));
//! ```
//!
//! Member access goes through pluggable resolver chains (see [`resolver`])
//! over a runtime class model (see [`model`]). Expressions evaluated often
//! enough can be compiled into closure trees with inline caches; see
//! [`compiler`] and [`CompilerMode`].

pub mod ast;
pub mod compiler;
pub mod core;
pub mod evaluator;
pub mod model;
pub mod parser;
pub mod resolver;

pub use crate::core::{
    AccessError, ConversionError, Error, ErrorCategory, EvalError, EvalResult, MessageKind,
    ParseError, Result, TypeDescriptor, TypedValue, Value,
};
pub use ast::{Node, NodeKind};
pub use compiler::CompilationState;
pub use evaluator::{
    CompilerMode, EvaluationContext, Expression, ParserConfig, SimpleEvaluationContext,
    StandardEvaluationContext, StandardExpression,
};
pub use model::{ClassDescriptor, TypeRegistry};
pub use parser::{ExpressionParser, TemplateContext};
