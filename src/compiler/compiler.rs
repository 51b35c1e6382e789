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

//! Expression compiler
//!
//! Lowers an AST into a tree of closures. Each closure reproduces the
//! interpreter's behavior for its node through the same evaluator helpers,
//! and member accesses additionally keep a monomorphic inline cache keyed
//! on the runtime shape of the target and on the resolver chain of the
//! context that filled it. A cache miss completes the node on the generic
//! path and flags the run so the owning expression drops the compiled form.

use super::routine::{CompiledExpression, ResolverSet, Routine, Shape, positioned};
use crate::ast::{BinaryOperator, Node, NodeKind, SelectionVariant, UnaryOperator};
use crate::core::{
    EvalError, EvalResult, ListRef, MapRef, MessageKind, TypeDescriptor, TypedValue, Value,
};
use crate::evaluator::interpreter::describe_failure;
use crate::evaluator::numeric::NumericKind;
use crate::evaluator::state::EvalState;
use crate::evaluator::{collection, indexer, operators, reference};
use crate::resolver::overload::argument_types;
use crate::resolver::{CompiledReader, MethodExecutor, MethodResolver, PropertyAccessor};
use once_cell::sync::OnceCell;
use smallvec::SmallVec;
use std::sync::Arc;
use thiserror::Error;

/// Why an expression could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// The tree contains a node kind with no compiled form
    #[error("expression cannot be compiled: {0}")]
    Unsupported(String),
    /// The tree is nested deeper than the compiler allows
    #[error("maximum compilation depth {0} exceeded")]
    MaxDepthExceeded(usize),
}

/// Result type for compilation operations
pub type CompilationResult<T> = Result<T, CompilationError>;

/// Configuration for the expression compiler
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Maximum node depth before compilation is refused
    pub max_depth: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

/// True when no node in `ast` is excluded from compilation.
///
/// Assignment, increment and decrement, bean references and constructor
/// calls always run interpreted.
pub fn is_compilable(ast: &Node) -> bool {
    !ast.any(&|node| {
        matches!(
            node.kind,
            NodeKind::Assign { .. }
                | NodeKind::IncDec { .. }
                | NodeKind::BeanReference { .. }
                | NodeKind::ConstructorReference { .. }
                | NodeKind::ArrayConstructor { .. }
        )
    })
}

type ArgTypes = SmallVec<[Option<TypeDescriptor>; 4]>;

/// Compiles parsed expressions into closure trees
#[derive(Debug, Clone, Default)]
pub struct ExpressionCompiler {
    config: CompilerConfig,
}

impl ExpressionCompiler {
    /// Compiler with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiler with a custom configuration
    pub fn with_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// Compile `ast`, parsed from `source`
    pub fn compile(&self, source: &str, ast: &Node) -> CompilationResult<CompiledExpression> {
        if !is_compilable(ast) {
            return Err(CompilationError::Unsupported(ast.to_string()));
        }
        let routine = self.node(ast, 0)?;
        log::trace!("compiled '{source}'");
        Ok(CompiledExpression::new(Arc::from(source), routine))
    }

    fn node(&self, node: &Node, depth: usize) -> CompilationResult<Routine> {
        if depth > self.config.max_depth {
            return Err(CompilationError::MaxDepthExceeded(self.config.max_depth));
        }
        let depth = depth + 1;
        let routine: Routine = match &node.kind {
            NodeKind::Literal(literal) => {
                let value = literal.to_typed_value();
                Arc::new(move |_: &mut EvalState<'_>| Ok(value.clone()))
            }
            NodeKind::PropertyOrField { name, null_safe } => property(name.clone(), *null_safe, false),
            NodeKind::MethodReference {
                name,
                args,
                null_safe,
            } => method(name.clone(), self.nodes(args, depth)?, *null_safe),
            NodeKind::FunctionReference { name, args } => {
                function(name.clone(), self.nodes(args, depth)?)
            }
            NodeKind::VariableReference { name } => {
                let name = name.clone();
                Arc::new(move |s: &mut EvalState<'_>| Ok(s.lookup_variable(&name)))
            }
            NodeKind::TypeReference { name, dimensions } => {
                let (name, dimensions) = (name.clone(), *dimensions);
                Arc::new(move |s: &mut EvalState<'_>| reference::type_reference(s, &name, dimensions))
            }
            NodeKind::Indexer { index, null_safe } => {
                let bare_name: Option<Arc<str>> = index.as_property_name().map(Arc::from);
                index_access(self.node(index, depth)?, bare_name, *null_safe)
            }
            NodeKind::Selection {
                variant,
                criteria,
                null_safe,
            } => selection(*variant, self.node(criteria, depth)?, criteria.start(), *null_safe),
            NodeKind::Projection {
                expression,
                null_safe,
            } => {
                let expression = self.node(expression, depth)?;
                let null_safe = *null_safe;
                Arc::new(move |s: &mut EvalState<'_>| {
                    collection::project(s, &|s| expression(s), null_safe)
                })
            }
            NodeKind::InlineList(items) => {
                let items = self.nodes(items, depth)?;
                Arc::new(move |s: &mut EvalState<'_>| {
                    let values = evaluate_all(&items, s)?;
                    Ok(TypedValue::new(Value::List(ListRef::new(values))))
                })
            }
            NodeKind::InlineMap(entries) => self.inline_map(entries, depth)?,
            NodeKind::Compound(parts) => self.compound(parts, depth)?,
            NodeKind::Elvis { value, fallback } => {
                let (value, fallback) = (self.node(value, depth)?, self.node(fallback, depth)?);
                Arc::new(move |s: &mut EvalState<'_>| {
                    let result = value(s)?;
                    let absent = match result.value() {
                        Value::Null => true,
                        Value::String(text) => text.is_empty(),
                        _ => false,
                    };
                    if absent { fallback(s) } else { Ok(result) }
                })
            }
            NodeKind::Ternary {
                condition,
                if_true,
                if_false,
            } => {
                let at = condition.start();
                let condition = self.node(condition, depth)?;
                let (if_true, if_false) = (self.node(if_true, depth)?, self.node(if_false, depth)?);
                Arc::new(move |s: &mut EvalState<'_>| {
                    let test = condition(s)?;
                    let test = operators::to_boolean(s.context(), test.value(), "?")
                        .map_err(|e| e.or_position(at))?;
                    if test { if_true(s) } else { if_false(s) }
                })
            }
            NodeKind::Binary {
                op: op @ (BinaryOperator::And | BinaryOperator::Or),
                left,
                right,
            } => {
                let (left_at, right_at) = (left.start(), right.start());
                let (left, right) = (self.node(left, depth)?, self.node(right, depth)?);
                let op = *op;
                Arc::new(move |s: &mut EvalState<'_>| {
                    let symbol = op.symbol();
                    let lhs = left(s)?;
                    let lhs = operators::to_boolean(s.context(), lhs.value(), symbol)
                        .map_err(|e| e.or_position(left_at))?;
                    if lhs == (op == BinaryOperator::Or) {
                        return Ok(TypedValue::boolean(lhs));
                    }
                    let rhs = right(s)?;
                    let rhs = operators::to_boolean(s.context(), rhs.value(), symbol)
                        .map_err(|e| e.or_position(right_at))?;
                    Ok(TypedValue::boolean(rhs))
                })
            }
            NodeKind::Binary { op, left, right } => binary(
                *op,
                self.node(left, depth)?,
                self.node(right, depth)?,
                Arc::from(node.to_string()),
            ),
            NodeKind::Unary { op, operand } => {
                let (op, operand) = (*op, self.node(operand, depth)?);
                Arc::new(move |s: &mut EvalState<'_>| {
                    let value = operand(s)?;
                    let ctx = s.context();
                    let result = match op {
                        UnaryOperator::Not => {
                            Value::Boolean(!operators::to_boolean(ctx, value.value(), "!")?)
                        }
                        UnaryOperator::Negate => operators::negate(ctx, value.value())?,
                        UnaryOperator::Positive => operators::positive(ctx, value.value())?,
                    };
                    Ok(TypedValue::new(result))
                })
            }
            NodeKind::Assign { .. }
            | NodeKind::IncDec { .. }
            | NodeKind::BeanReference { .. }
            | NodeKind::ConstructorReference { .. }
            | NodeKind::ArrayConstructor { .. } => {
                return Err(CompilationError::Unsupported(node.to_string()));
            }
        };
        Ok(positioned(node.start(), routine))
    }

    fn nodes(&self, nodes: &[Node], depth: usize) -> CompilationResult<Vec<Routine>> {
        nodes.iter().map(|n| self.node(n, depth)).collect()
    }

    fn inline_map(&self, entries: &[(Node, Node)], depth: usize) -> CompilationResult<Routine> {
        let mut compiled = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let key = match key.as_property_name() {
                Some(name) => {
                    let name = TypedValue::new(Value::String(Arc::from(name)));
                    Arc::new(move |_: &mut EvalState<'_>| Ok(name.clone())) as Routine
                }
                None => self.node(key, depth)?,
            };
            compiled.push((key, self.node(value, depth)?));
        }
        Ok(Arc::new(move |s: &mut EvalState<'_>| {
            let map = MapRef::new();
            for (key, value) in &compiled {
                let key = key(s)?.into_value();
                map.insert(key, value(s)?.into_value());
            }
            Ok(TypedValue::new(Value::Map(map)))
        }))
    }

    fn compound(&self, parts: &[Node], depth: usize) -> CompilationResult<Routine> {
        let mut steps: Vec<(Routine, bool)> = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let routine = match &part.kind {
                NodeKind::PropertyOrField { name, null_safe } => {
                    let grow = parts.get(i + 1).is_some_and(|n| {
                        matches!(n.kind, NodeKind::Indexer { .. } | NodeKind::PropertyOrField { .. })
                    });
                    positioned(part.start(), property(name.clone(), *null_safe, grow))
                }
                _ => self.node(part, depth)?,
            };
            steps.push((routine, crate::evaluator::interpreter::is_null_safe(part)));
        }
        Ok(Arc::new(move |s: &mut EvalState<'_>| {
            let Some(((first, _), rest)) = steps.split_first() else {
                return Ok(s.active_context_object());
            };
            let mut current = first(s)?;
            for (step, null_safe) in rest {
                if current.is_null() && *null_safe {
                    return Ok(TypedValue::NULL);
                }
                current = s.with_active(current, |s| step(s))?;
            }
            Ok(current)
        }))
    }
}

fn evaluate_all(routines: &[Routine], state: &mut EvalState<'_>) -> EvalResult<Vec<Value>> {
    routines
        .iter()
        .map(|r| r(state).map(TypedValue::into_value))
        .collect()
}

type PropertyCache = (Shape, ResolverSet<dyn PropertyAccessor>, CompiledReader);
type MethodCache = (Shape, ArgTypes, ResolverSet<dyn MethodResolver>, Arc<dyn MethodExecutor>);

fn property(name: Arc<str>, null_safe: bool, grow: bool) -> Routine {
    let cache: OnceCell<PropertyCache> = OnceCell::new();
    Arc::new(move |s: &mut EvalState<'_>| {
        let target = s.active_context_object();
        if null_safe && target.is_null() {
            return Ok(TypedValue::NULL);
        }
        // growing writes back through the accessor chain
        if grow && s.config().auto_grow_null_references {
            return reference::property(s, &name, null_safe, grow);
        }
        let shape = Shape::of(target.value());
        if let Some((cached, accessors, reader)) = cache.get() {
            if *cached == shape && accessors.matches(s.context().property_accessors()) {
                match reader(target.value()) {
                    Err(err) if err.kind() == MessageKind::PropertyOrFieldNotReadable => {}
                    result => return result.map_err(EvalError::from),
                }
            }
            log::trace!("property '{name}' guard missed for {shape:?}");
            s.mark_guard_failure();
            return reference::property(s, &name, null_safe, grow);
        }
        if shape != Shape::Null {
            let ctx = s.context();
            if let Some(accessor) = reference::find_reader(ctx, target.value(), &name)? {
                if let Some(reader) = accessor.compilable_reader(ctx, target.value(), &name) {
                    let _ = cache.set((shape, ResolverSet::of(ctx.property_accessors()), reader));
                }
            }
        }
        reference::property(s, &name, null_safe, grow)
    })
}

fn method(name: Arc<str>, args: Vec<Routine>, null_safe: bool) -> Routine {
    let cache: OnceCell<MethodCache> = OnceCell::new();
    Arc::new(move |s: &mut EvalState<'_>| {
        let target = s.active_context_object();
        let scope = s.scope_root();
        let values = s.with_active(scope, |s| evaluate_all(&args, s))?;
        let types: ArgTypes = argument_types(&values).into_iter().collect();
        let shape = Shape::of(target.value());
        if let Some((cached_shape, cached_types, resolvers, executor)) = cache.get() {
            if shape != Shape::Null
                && *cached_shape == shape
                && *cached_types == types
                && resolvers.matches(s.context().method_resolvers())
            {
                return executor.execute(s.context(), target.value(), values);
            }
            log::trace!("method '{name}' guard missed for {shape:?}");
            s.mark_guard_failure();
        }
        let (result, executor) = reference::invoke_method(s, &target, &name, values, null_safe)?;
        if let Some(executor) = executor.filter(|e| e.is_specializable()) {
            let resolvers = ResolverSet::of(s.context().method_resolvers());
            let _ = cache.set((shape, types, resolvers, executor));
        }
        Ok(result)
    })
}

fn function(name: Arc<str>, args: Vec<Routine>) -> Routine {
    Arc::new(move |s: &mut EvalState<'_>| {
        let function = reference::lookup_function(s, &name)?;
        let scope = s.scope_root();
        let values = s.with_active(scope, |s| evaluate_all(&args, s))?;
        reference::call_function(s.context(), &name, &function, values).map(TypedValue::new)
    })
}

fn index_access(index: Routine, bare_name: Option<Arc<str>>, null_safe: bool) -> Routine {
    Arc::new(move |s: &mut EvalState<'_>| {
        let target = s.active_context_object();
        if target.is_null() {
            if null_safe {
                return Ok(TypedValue::NULL);
            }
            return Err(EvalError::new(
                MessageKind::CannotIndexIntoNullValue,
                crate::core::error::NO_INSERTS,
            ));
        }
        let key = match (target.value(), &bare_name) {
            (Value::Map(_), Some(name)) => Value::String(name.clone()),
            _ => {
                let scope = s.scope_root();
                s.with_active(scope, |s| index(s))?.into_value()
            }
        };
        indexer::resolve(s, target, key)?.get(s)
    })
}

fn selection(variant: SelectionVariant, criteria: Routine, at: usize, null_safe: bool) -> Routine {
    Arc::new(move |s: &mut EvalState<'_>| {
        collection::select(s, variant, &|s| criteria(s), at, null_safe)
    })
}

fn binary(op: BinaryOperator, left: Routine, right: Routine, text: Arc<str>) -> Routine {
    let specialized = !matches!(
        op,
        BinaryOperator::InstanceOf | BinaryOperator::Matches | BinaryOperator::Between
    );
    let kinds: OnceCell<(NumericKind, NumericKind)> = OnceCell::new();
    Arc::new(move |s: &mut EvalState<'_>| {
        let lhs = left(s)?;
        let rhs = right(s)?;
        let (l, r) = (lhs.value(), rhs.value());
        let observed = NumericKind::of(l).zip(NumericKind::of(r));
        let result = match (kinds.get(), observed) {
            (Some(cached), Some(seen)) if *cached == seen => {
                match operators::numeric_fast(op, l, r) {
                    Ok(Some(value)) => Ok(value),
                    Ok(None) => operators::apply(s.context(), op, l, r),
                    Err(err) => Err(err),
                }
            }
            (Some(_), _) => {
                log::trace!("operator '{}' guard missed", op.symbol());
                s.mark_guard_failure();
                operators::apply(s.context(), op, l, r)
            }
            (None, seen) => {
                if let Some(seen) = seen.filter(|_| specialized) {
                    let _ = kinds.set(seen);
                }
                operators::apply(s.context(), op, l, r)
            }
        };
        result
            .map(TypedValue::new)
            .map_err(|e| describe_failure(e, || text.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parser::InternalParser;

    fn parse(text: &str) -> Node {
        InternalParser::parse(text).unwrap()
    }

    #[test]
    fn test_ineligible_nodes_are_rejected() {
        for text in ["a = 1", "count++", "@bean", "new Person('x')", "new int[3]"] {
            let ast = parse(text);
            assert!(!is_compilable(&ast), "{text}");
            assert!(matches!(
                ExpressionCompiler::new().compile(text, &ast),
                Err(CompilationError::Unsupported(_))
            ));
        }
    }

    #[test]
    fn test_depth_limit() {
        let compiler = ExpressionCompiler::with_config(CompilerConfig { max_depth: 2 });
        let text = "1 + (2 + (3 + 4))";
        assert_eq!(
            compiler.compile(text, &parse(text)).unwrap_err(),
            CompilationError::MaxDepthExceeded(2)
        );
    }

    #[test]
    fn test_compiled_source_is_kept() {
        let compiled = ExpressionCompiler::new().compile("1 + 2", &parse("1 + 2")).unwrap();
        assert_eq!(compiled.source(), "1 + 2");
    }
}
