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

//! Compiled routines and the guards their inline caches check

use crate::core::{EvalResult, TypeDescriptor, TypedValue, Value};
use crate::evaluator::state::EvalState;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// One compiled node: evaluates against the state like the interpreter does
pub(crate) type Routine = Arc<dyn Fn(&mut EvalState<'_>) -> EvalResult<TypedValue> + Send + Sync>;

/// Runtime shape an inline cache was filled for
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shape {
    Null,
    Instance(TypeDescriptor),
    /// A type reference used as a target, for static members
    Static(TypeDescriptor),
}

impl Shape {
    pub(crate) fn of(value: &Value) -> Self {
        match value {
            Value::Type(ty) => Shape::Static(ty.clone()),
            other => other.type_descriptor().map_or(Shape::Null, Shape::Instance),
        }
    }
}

/// The resolver chain an inline cache was filled against.
///
/// Entries are compared by identity. Holding the `Arc`s keeps their
/// addresses from being reused by another context's resolvers.
pub(crate) struct ResolverSet<T: ?Sized>(SmallVec<[Arc<T>; 2]>);

impl<T: ?Sized> ResolverSet<T> {
    pub(crate) fn of(resolvers: &[Arc<T>]) -> Self {
        Self(resolvers.iter().cloned().collect())
    }

    /// True when `resolvers` is the same chain, in the same order
    pub(crate) fn matches(&self, resolvers: &[Arc<T>]) -> bool {
        self.0.len() == resolvers.len()
            && self.0.iter().zip(resolvers).all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

/// Attribute errors without a position to the node starting at `start`
pub(crate) fn positioned(start: usize, routine: Routine) -> Routine {
    Arc::new(move |state| routine(state).map_err(|e| e.or_position(start)))
}

/// A whole expression lowered to a closure tree
pub struct CompiledExpression {
    source: Arc<str>,
    routine: Routine,
}

impl CompiledExpression {
    pub(crate) fn new(source: Arc<str>, routine: Routine) -> Self {
        Self { source, routine }
    }

    /// Expression text this routine was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn run(&self, state: &mut EvalState<'_>) -> EvalResult<TypedValue> {
        (self.routine)(state)
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
