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

//! Expression evaluation
//!
//! Evaluation walks the AST against an [`EvaluationContext`], which
//! supplies the root object, variables and the resolver chains used for
//! member access. Per-evaluation state (the active context object stack,
//! scope roots, compilation bookkeeping) lives in an internal state value
//! created for each call, so one parsed expression can be evaluated from
//! many threads at once.

pub(crate) mod assign;
pub(crate) mod collection;
pub mod config;
pub mod context;
pub mod expression;
pub(crate) mod indexer;
pub(crate) mod interpreter;
pub(crate) mod numeric;
pub(crate) mod operators;
pub(crate) mod reference;
pub(crate) mod state;
pub(crate) mod value_ref;

pub use config::{CompilerMode, ParserConfig};
pub use context::{EvaluationContext, SimpleEvaluationContext, StandardEvaluationContext};
pub use expression::{CompositeExpression, Expression, LiteralExpression, StandardExpression};
pub use operators::{MAX_CONCATENATED_STRING_LENGTH, MAX_REGEX_LENGTH, MAX_REPEATED_TEXT_SIZE};
pub use reference::MAX_ARRAY_ELEMENTS;
