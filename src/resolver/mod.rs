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

//! Member resolution strategies
//!
//! The evaluator asks each registered strategy in turn whether it can handle
//! a `(target, name)` pair and uses the first that can. Each strategy owns its
//! own cache keyed on the target class, the member name and whether the
//! target is a class (static access).

pub mod binding;
pub(crate) mod cache;
pub mod map_accessor;
pub(crate) mod overload;
pub mod reflective;

pub use binding::{DataBindingMethodResolver, DataBindingPropertyAccessor};
pub use map_accessor::MapAccessor;
pub use reflective::{
    ReflectiveConstructorResolver, ReflectiveMethodResolver, ReflectivePropertyAccessor,
};

use crate::core::{AccessError, EvalResult, TypeDescriptor, TypedValue, Value};
use crate::evaluator::EvaluationContext;
use crate::model::TypeRegistry;
use std::sync::Arc;

/// Direct property reader handed to the compiler, bypassing resolution
pub type CompiledReader = Arc<dyn Fn(&Value) -> Result<TypedValue, AccessError> + Send + Sync>;

/// Reads and writes named properties of a target value
pub trait PropertyAccessor: Send + Sync {
    /// Classes this accessor is specific to; `None` means it is tried for every target
    fn specific_target_classes(&self) -> Option<Vec<TypeDescriptor>> {
        None
    }

    /// True when `name` can be read from `target`
    fn can_read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<bool, AccessError>;

    /// Read `name` from `target`
    fn read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> EvalResult<TypedValue>;

    /// True when `name` can be written on `target`
    fn can_write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<bool, AccessError>;

    /// Write `value` to `name` on `target`
    fn write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        value: Value,
    ) -> EvalResult<()>;

    /// Reader valid for every target of the same class as `target`
    fn compilable_reader(
        &self,
        _context: &dyn EvaluationContext,
        _target: &Value,
        _name: &str,
    ) -> Option<CompiledReader> {
        None
    }
}

/// Invokes one resolved method
pub trait MethodExecutor: Send + Sync {
    /// Invoke on `target`; arguments are converted to the parameter types here
    fn execute(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        args: Vec<Value>,
    ) -> EvalResult<TypedValue>;

    /// True when the compiler may cache this executor behind a type guard
    fn is_specializable(&self) -> bool {
        false
    }
}

/// Finds a method for a target and argument types
pub trait MethodResolver: Send + Sync {
    /// Resolve `name` on `target`; `None` in `arg_types` marks a null argument
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> Result<Option<Arc<dyn MethodExecutor>>, AccessError>;
}

/// Invokes one resolved constructor
pub trait ConstructorExecutor: Send + Sync {
    /// Construct an instance from the supplied arguments
    fn execute(&self, context: &dyn EvaluationContext, args: Vec<Value>) -> EvalResult<TypedValue>;
}

/// Finds a constructor for a type name and argument types
pub trait ConstructorResolver: Send + Sync {
    /// Resolve a constructor of `type_name`
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        type_name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> EvalResult<Option<Arc<dyn ConstructorExecutor>>>;
}

/// Reads and writes `target[index]` for custom target kinds
pub trait IndexAccessor: Send + Sync {
    /// Classes this accessor is specific to; `None` means it is tried for every target
    fn specific_target_classes(&self) -> Option<Vec<TypeDescriptor>> {
        None
    }

    /// True when `target[index]` can be read
    fn can_read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        index: &Value,
    ) -> Result<bool, AccessError>;

    /// Read `target[index]`
    fn read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        index: &Value,
    ) -> EvalResult<TypedValue>;

    /// True when `target[index]` can be written
    fn can_write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        index: &Value,
    ) -> Result<bool, AccessError>;

    /// Write `target[index]`
    fn write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        index: &Value,
        value: Value,
    ) -> EvalResult<()>;
}

/// Accessors to try for `target`, most specific first.
///
/// Accessors naming the exact target class come first, then those naming a
/// supertype, then the generic ones. Specific accessors that do not apply are
/// skipped, and a null target only sees generic accessors.
pub(crate) fn accessors_to_try<T: ?Sized>(
    accessors: &[Arc<T>],
    target: &Value,
    registry: &TypeRegistry,
    classes: impl Fn(&T) -> Option<Vec<TypeDescriptor>>,
) -> Vec<Arc<T>> {
    let target_type = target.type_descriptor();
    let mut exact = Vec::new();
    let mut inherited = Vec::new();
    let mut generic = Vec::new();
    for accessor in accessors {
        match (classes(accessor.as_ref()), &target_type) {
            (None, _) => generic.push(accessor.clone()),
            (Some(_), None) => {}
            (Some(specific), Some(ty)) => {
                if specific.contains(ty) {
                    exact.push(accessor.clone());
                } else if specific.iter().any(|s| registry.is_assignable(s, ty)) {
                    inherited.push(accessor.clone());
                }
            }
        }
    }
    exact.extend(inherited);
    exact.extend(generic);
    exact
}

/// `get` + capitalized property name
pub(crate) fn accessor_method_name(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{prefix}{}{}", first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}
