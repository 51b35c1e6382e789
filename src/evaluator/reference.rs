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

//! Named references: properties, methods, functions, variables, beans,
//! types and constructors

use super::context::EvaluationContext;
use super::interpreter::evaluate;
use super::state::EvalState;
use crate::ast::Node;
use crate::core::{
    ArrayRef, EvalError, EvalResult, FunctionRef, ListRef, MapRef, MessageKind, TypeDescriptor,
    TypedValue, Value,
};
use crate::model::primitive_type;
use crate::resolver::overload::{argument_types, convert_arguments};
use crate::resolver::{MethodExecutor, PropertyAccessor, accessors_to_try};
use std::sync::Arc;

/// Array construction at or above this many elements is rejected
pub const MAX_ARRAY_ELEMENTS: usize = 256 * 1024;

/// `name(Type,Type)` as used in method diagnostics
pub(crate) fn format_method(name: &str, arg_types: &[Option<TypeDescriptor>]) -> String {
    let args: Vec<String> = arg_types
        .iter()
        .map(|t| t.as_ref().map_or_else(|| "null".to_string(), |t| t.name()))
        .collect();
    format!("{name}({})", args.join(","))
}

/// Class name used in diagnostics, the described type for a type target
fn target_type_name(ctx: &dyn EvaluationContext, target: &Value) -> String {
    match target {
        Value::Type(ty) => ctx.type_registry().canonical_name(ty),
        other => match other.type_descriptor() {
            Some(ty) => ctx.type_registry().canonical_name(&ty),
            None => "null".to_string(),
        },
    }
}

fn property_accessors(ctx: &dyn EvaluationContext, target: &Value) -> Vec<Arc<dyn PropertyAccessor>> {
    accessors_to_try(
        ctx.property_accessors(),
        target,
        ctx.type_registry(),
        |a| a.specific_target_classes(),
    )
}

/// First accessor able to read `name` from `target`
pub(crate) fn find_reader(
    ctx: &dyn EvaluationContext,
    target: &Value,
    name: &str,
) -> EvalResult<Option<Arc<dyn PropertyAccessor>>> {
    for accessor in property_accessors(ctx, target) {
        if accessor.can_read(ctx, target, name)? {
            return Ok(Some(accessor));
        }
    }
    Ok(None)
}

/// Read a property through the accessor chain
pub(crate) fn read_property(
    ctx: &dyn EvaluationContext,
    target: &TypedValue,
    name: &str,
) -> EvalResult<TypedValue> {
    let value = target.value();
    if let Some(accessor) = find_reader(ctx, value, name)? {
        return accessor.read(ctx, value, name);
    }
    Err(if value.is_null() {
        EvalError::new(MessageKind::PropertyOrFieldNotReadableOnNull, [name])
    } else {
        EvalError::new(
            MessageKind::PropertyOrFieldNotReadable,
            [name.to_string(), target_type_name(ctx, value)],
        )
    })
}

/// Write a property through the accessor chain
pub(crate) fn write_property(
    ctx: &dyn EvaluationContext,
    target: &Value,
    name: &str,
    value: Value,
) -> EvalResult<()> {
    for accessor in property_accessors(ctx, target) {
        if accessor.can_write(ctx, target, name)? {
            return accessor.write(ctx, target, name, value);
        }
    }
    Err(if target.is_null() {
        EvalError::new(MessageKind::PropertyOrFieldNotWritableOnNull, [name])
    } else {
        EvalError::new(
            MessageKind::PropertyOrFieldNotWritable,
            [name.to_string(), target_type_name(ctx, target)],
        )
    })
}

pub(crate) fn is_property_writable(ctx: &dyn EvaluationContext, target: &Value, name: &str) -> bool {
    property_accessors(ctx, target)
        .iter()
        .any(|a| a.can_write(ctx, target, name).unwrap_or(false))
}

/// Default instance for a declared type, used when auto-growing null references
fn default_instance(ctx: &dyn EvaluationContext, ty: &TypeDescriptor) -> EvalResult<Value> {
    let unable = || EvalError::new(MessageKind::UnableToDynamicallyCreateObject, [ty.name()]);
    match ty {
        TypeDescriptor::List => Ok(Value::List(ListRef::new(Vec::new()))),
        TypeDescriptor::Map => Ok(Value::Map(MapRef::new())),
        TypeDescriptor::Array(_) => Err(unable()),
        other => {
            let class = ctx.type_registry().class_for(other).ok_or_else(unable)?;
            let constructor = class.default_constructor().ok_or_else(unable)?;
            constructor
                .invoke(Vec::new())
                .map_err(|e| unable().with_cause(e))
        }
    }
}

/// Evaluate a property reference against the active context object.
///
/// With `grow` set and null-reference auto-grow enabled, a null result is
/// replaced by a default instance of the declared type and written back.
pub(crate) fn property(
    state: &mut EvalState<'_>,
    name: &str,
    null_safe: bool,
    grow: bool,
) -> EvalResult<TypedValue> {
    let target = state.active_context_object();
    if null_safe && target.is_null() {
        return Ok(TypedValue::NULL);
    }
    let ctx = state.context();
    let result = read_property(ctx, &target, name)?;
    if !(grow && result.is_null() && state.config().auto_grow_null_references) {
        return Ok(result);
    }
    let Some(declared) = result.declared_type().cloned() else {
        return Ok(result);
    };
    if !is_property_writable(ctx, target.value(), name) {
        return Ok(result);
    }
    let created = default_instance(ctx, &declared)?;
    log::trace!("auto-grew null property '{name}' to {}", declared.name());
    write_property(ctx, target.value(), name, created.clone())?;
    Ok(TypedValue::with_type(created, declared))
}

/// Evaluate arguments against the current scope root
pub(crate) fn method_arguments(state: &mut EvalState<'_>, args: &[Node]) -> EvalResult<Vec<Value>> {
    let scope = state.scope_root();
    state.with_active(scope, |state| {
        args.iter()
            .map(|arg| evaluate(arg, state).map(TypedValue::into_value))
            .collect()
    })
}

/// First executor any method resolver returns for `name` on `target`
pub(crate) fn resolve_method(
    ctx: &dyn EvaluationContext,
    target: &Value,
    name: &str,
    arg_types: &[Option<TypeDescriptor>],
) -> EvalResult<Option<Arc<dyn MethodExecutor>>> {
    for resolver in ctx.method_resolvers() {
        if let Some(executor) = resolver.resolve(ctx, target, name, arg_types)? {
            return Ok(Some(executor));
        }
    }
    Ok(None)
}

/// Invoke `name` on the active context object
pub(crate) fn method(
    state: &mut EvalState<'_>,
    name: &str,
    args: &[Node],
    null_safe: bool,
) -> EvalResult<TypedValue> {
    let target = state.active_context_object();
    let values = method_arguments(state, args)?;
    invoke_method(state, &target, name, values, null_safe).map(|(result, _)| result)
}

/// Resolve and invoke `name` on `target` with evaluated arguments.
///
/// Also returns the executor used, `None` when a null-safe call on null
/// short-circuited.
pub(crate) fn invoke_method(
    state: &mut EvalState<'_>,
    target: &TypedValue,
    name: &str,
    values: Vec<Value>,
    null_safe: bool,
) -> EvalResult<(TypedValue, Option<Arc<dyn MethodExecutor>>)> {
    let arg_types = argument_types(&values);
    if target.is_null() {
        if null_safe {
            return Ok((TypedValue::NULL, None));
        }
        return Err(EvalError::new(
            MessageKind::MethodCallOnNullObjectNotAllowed,
            [format_method(name, &arg_types)],
        ));
    }
    let ctx = state.context();
    let Some(executor) = resolve_method(ctx, target.value(), name, &arg_types)? else {
        return Err(EvalError::new(
            MessageKind::MethodNotFound,
            [format_method(name, &arg_types), target_type_name(ctx, target.value())],
        ));
    };
    if !executor.is_specializable() {
        state.mark_unspecializable();
    }
    let result = executor.execute(ctx, target.value(), values)?;
    Ok((result, Some(executor)))
}

/// Call a registered function with already evaluated arguments
pub(crate) fn call_function(
    ctx: &dyn EvaluationContext,
    name: &str,
    function: &FunctionRef,
    args: Vec<Value>,
) -> EvalResult<Value> {
    let params = function.params();
    let arity_ok = if function.is_varargs() {
        args.len() + 1 >= params.len()
    } else {
        args.len() == params.len()
    };
    if !arity_ok {
        return Err(EvalError::new(
            MessageKind::IncorrectNumberOfArgumentsToFunction,
            [name.to_string(), args.len().to_string(), params.len().to_string()],
        ));
    }
    let args = convert_arguments(ctx.type_converter(), params, function.is_varargs(), args)?;
    function.call(args).map_err(|e| {
        EvalError::new(
            MessageKind::ExceptionDuringFunctionCall,
            [name.to_string(), e.message()],
        )
        .with_cause(e)
    })
}

/// `#name(args)`
pub(crate) fn function(state: &mut EvalState<'_>, name: &str, args: &[Node]) -> EvalResult<TypedValue> {
    let function = lookup_function(state, name)?;
    let values = method_arguments(state, args)?;
    call_function(state.context(), name, &function, values).map(TypedValue::new)
}

/// The function a `#name(...)` reference calls
pub(crate) fn lookup_function(state: &EvalState<'_>, name: &str) -> EvalResult<FunctionRef> {
    match state.context().lookup_variable(name) {
        None | Some(Value::Null) => Err(EvalError::new(MessageKind::FunctionNotDefined, [name])),
        Some(Value::Function(f)) => Ok(f),
        Some(other) => Err(EvalError::new(
            MessageKind::FunctionReferenceCannotBeInvoked,
            [name.to_string(), other.type_name()],
        )),
    }
}

/// `@name` or `&name`
pub(crate) fn bean(state: &EvalState<'_>, name: &str, factory: bool) -> EvalResult<TypedValue> {
    let ctx = state.context();
    let Some(resolver) = ctx.bean_resolver() else {
        return Err(EvalError::new(MessageKind::NoBeanResolverRegistered, [name]));
    };
    let lookup = if factory { format!("&{name}") } else { name.to_string() };
    resolver
        .resolve(ctx, &lookup)
        .map(TypedValue::new)
        .map_err(|e| {
            EvalError::new(
                MessageKind::ExceptionDuringBeanResolution,
                [lookup.clone(), e.message()],
            )
            .with_cause(e)
        })
}

/// `T(name[]...)`
pub(crate) fn type_reference(
    state: &EvalState<'_>,
    name: &str,
    dimensions: usize,
) -> EvalResult<TypedValue> {
    let mut ty = state.context().type_locator().find_type(name)?;
    for _ in 0..dimensions {
        ty = TypeDescriptor::array_of(ty);
    }
    Ok(TypedValue::with_type(Value::Type(ty), TypeDescriptor::Class))
}

/// `new Type(args)`
pub(crate) fn constructor(
    state: &mut EvalState<'_>,
    type_name: &str,
    args: &[Node],
) -> EvalResult<TypedValue> {
    let values = args
        .iter()
        .map(|arg| evaluate(arg, state).map(TypedValue::into_value))
        .collect::<EvalResult<Vec<_>>>()?;
    let arg_types = argument_types(&values);
    let ctx = state.context();
    for resolver in ctx.constructor_resolvers() {
        if let Some(executor) = resolver.resolve(ctx, type_name, &arg_types)? {
            return executor.execute(ctx, values);
        }
    }
    Err(EvalError::new(
        MessageKind::ConstructorNotFound,
        [type_name.to_string(), format_method("", &arg_types)],
    ))
}

fn dimension(state: &mut EvalState<'_>, node: &Node) -> EvalResult<usize> {
    let value = evaluate(node, state)?.into_value();
    let size = state.convert(&value, &TypeDescriptor::Integer)?;
    let size = size.as_i64().unwrap_or_default();
    usize::try_from(size).map_err(|_| EvalError::new(MessageKind::NegativeArrayDimension, [size]))
}

fn build_array(component: &TypeDescriptor, default: &Value, sizes: &[usize]) -> Value {
    match sizes {
        [] => default.clone(),
        [last] => Value::Array(ArrayRef::new(component.clone(), vec![default.clone(); *last])),
        [first, rest @ ..] => {
            let mut inner = component.clone();
            for _ in 0..rest.len() {
                inner = TypeDescriptor::array_of(inner);
            }
            let elements = (0..*first)
                .map(|_| build_array(component, default, rest))
                .collect();
            Value::Array(ArrayRef::new(inner, elements))
        }
    }
}

/// `new type[d1][d2]` or `new type[]{...}`
pub(crate) fn array_constructor(
    state: &mut EvalState<'_>,
    type_name: &str,
    dimensions: &[Option<Node>],
    initializer: Option<&Node>,
) -> EvalResult<TypedValue> {
    let component = state.context().type_locator().find_type(type_name)?;
    let default = primitive_type(type_name).map_or(Value::Null, |(_, default)| default);
    let array = match initializer {
        Some(init) => {
            if dimensions.len() > 1 {
                return Err(EvalError::new(
                    MessageKind::MultidimArrayInitializerNotSupported,
                    crate::core::error::NO_INSERTS,
                ));
            }
            let items = match &init.kind {
                crate::ast::NodeKind::InlineList(items) => items.as_slice(),
                _ => std::slice::from_ref(init),
            };
            if let Some(Some(declared)) = dimensions.first() {
                let size = dimension(state, declared)?;
                if size != items.len() {
                    return Err(EvalError::new(
                        MessageKind::InitializerLengthIncorrect,
                        crate::core::error::NO_INSERTS,
                    ));
                }
            }
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                let value = evaluate(item, state)?.into_value();
                elements.push(state.convert(&value, &component)?);
            }
            Value::Array(ArrayRef::new(component.clone(), elements))
        }
        None => {
            let mut sizes = Vec::with_capacity(dimensions.len());
            for node in dimensions.iter().flatten() {
                sizes.push(dimension(state, node)?);
            }
            let total = sizes.iter().try_fold(1usize, |acc, s| acc.checked_mul(*s));
            if total.is_none_or(|t| t >= MAX_ARRAY_ELEMENTS) {
                return Err(EvalError::new(
                    MessageKind::MaxArrayElementsThresholdExceeded,
                    [MAX_ARRAY_ELEMENTS],
                ));
            }
            build_array(&component, &default, &sizes)
        }
    };
    Ok(TypedValue::new(array))
}
