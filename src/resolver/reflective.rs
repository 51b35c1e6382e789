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

//! Reflective resolvers over the registered class model
//!
//! Properties are found through a zero-argument `getX`/`isX` method first,
//! then through a declared property. A class value (`T(Foo)`) exposes the
//! static members of `Foo`, then the instance members of `Class`.

use super::cache::{MemberCache, MemberKey};
use super::overload::{Signature, convert_arguments, select_best};
use super::{
    CompiledReader, ConstructorExecutor, ConstructorResolver, MethodExecutor, MethodResolver,
    PropertyAccessor, accessor_method_name,
};
use crate::core::{
    AccessError, EvalError, EvalResult, MessageKind, TypeDescriptor, TypedValue, Value,
};
use crate::evaluator::EvaluationContext;
use crate::model::{ConstructorDescriptor, MethodDescriptor, PropertyDescriptor, TypeRegistry};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

const CLASS_CLASS: &str = "Class";

/// Something a property read resolves to
#[derive(Clone)]
pub(crate) enum ReadMember {
    Field(PropertyDescriptor),
    Getter(MethodDescriptor),
}

impl ReadMember {
    fn declared_type(&self) -> &TypeDescriptor {
        match self {
            ReadMember::Field(property) => property.declared_type(),
            ReadMember::Getter(method) => method.return_type(),
        }
    }

    pub(crate) fn read(&self, name: &str, target: &Value) -> Result<TypedValue, AccessError> {
        let value = match self {
            ReadMember::Field(property) => property.get(target),
            ReadMember::Getter(method) => method.invoke(target, Vec::new()),
        }
        .map_err(|err| {
            AccessError::new(MessageKind::ExceptionDuringPropertyRead, [name.to_string(), err.message()])
        })?;
        Ok(TypedValue::with_type(value, self.declared_type().clone()))
    }
}

impl fmt::Debug for ReadMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadMember::Field(property) => write!(f, "Field({})", property.name()),
            ReadMember::Getter(method) => write!(f, "Getter({})", method.name()),
        }
    }
}

/// Something a property write resolves to
#[derive(Clone)]
enum WriteMember {
    Field(PropertyDescriptor),
    Setter(MethodDescriptor),
}

impl WriteMember {
    fn declared_type(&self) -> &TypeDescriptor {
        match self {
            WriteMember::Field(property) => property.declared_type(),
            WriteMember::Setter(method) => &method.params()[0],
        }
    }
}

/// Class whose members a target exposes, and whether access is static
fn member_key(
    registry: &TypeRegistry,
    target: &Value,
    name: &str,
    instance_only: bool,
) -> Option<MemberKey> {
    let (class, is_static) = match target {
        Value::Null => return None,
        Value::Type(ty) if !instance_only => (Arc::from(registry.canonical_name(ty)), true),
        other => (registry.class_of(other)?.name_arc(), false),
    };
    Some(MemberKey {
        class,
        name: Arc::from(name),
        is_static,
    })
}

struct MemberFilter {
    is_static: bool,
    exclude_object_members: bool,
}

impl MemberFilter {
    fn method(&self, method: &MethodDescriptor) -> bool {
        !(self.exclude_object_members && method.is_declared_on_object())
            && (!self.is_static || method.is_static())
    }

    fn property(&self, property: &PropertyDescriptor) -> bool {
        !(self.exclude_object_members && property.is_declared_on_object())
            && (!self.is_static || property.is_static())
    }
}

fn find_in_class(
    registry: &TypeRegistry,
    class: &str,
    name: &str,
    filter: &MemberFilter,
) -> Option<ReadMember> {
    let chain = registry.superclass_chain(class);
    let get = accessor_method_name("get", name);
    let is = accessor_method_name("is", name);
    let getter = chain.iter().flat_map(|c| c.methods().iter()).find(|m| {
        m.params().is_empty()
            && filter.method(m)
            && (m.name() == get || (m.name() == is && *m.return_type() == TypeDescriptor::Boolean))
    });
    if let Some(getter) = getter {
        return Some(ReadMember::Getter(getter.clone()));
    }
    chain
        .iter()
        .filter_map(|c| c.property(name))
        .find(|p| p.is_readable() && filter.property(p))
        .map(|p| ReadMember::Field(p.clone()))
}

fn find_read_member(
    registry: &TypeRegistry,
    key: &MemberKey,
    exclude_object_members: bool,
) -> Option<ReadMember> {
    let filter = MemberFilter {
        is_static: key.is_static,
        exclude_object_members,
    };
    find_in_class(registry, &key.class, &key.name, &filter).or_else(|| {
        key.is_static
            .then(|| {
                let instance = MemberFilter {
                    is_static: false,
                    exclude_object_members,
                };
                find_in_class(registry, CLASS_CLASS, &key.name, &instance)
            })
            .flatten()
    })
}

fn find_write_member(
    registry: &TypeRegistry,
    key: &MemberKey,
    exclude_object_members: bool,
) -> Option<WriteMember> {
    let filter = MemberFilter {
        is_static: key.is_static,
        exclude_object_members,
    };
    let chain = registry.superclass_chain(&key.class);
    let set = accessor_method_name("set", &key.name);
    let setter = chain
        .iter()
        .flat_map(|c| c.methods().iter())
        .find(|m| m.name() == set && m.params().len() == 1 && filter.method(m));
    if let Some(setter) = setter {
        return Some(WriteMember::Setter(setter.clone()));
    }
    chain
        .iter()
        .filter_map(|c| c.property(&key.name))
        .find(|p| p.is_writable() && filter.property(p))
        .map(|p| WriteMember::Field(p.clone()))
}

/// Property accessor walking getters, setters and declared properties
pub struct ReflectivePropertyAccessor {
    allow_write: bool,
    instance_only: bool,
    exclude_object_members: bool,
    readers: MemberCache<MemberKey, ReadMember>,
    writers: MemberCache<MemberKey, WriteMember>,
}

impl fmt::Debug for ReflectivePropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectivePropertyAccessor")
            .field("allow_write", &self.allow_write)
            .field("instance_only", &self.instance_only)
            .field("readers", &self.readers)
            .finish()
    }
}

impl Default for ReflectivePropertyAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectivePropertyAccessor {
    /// Read-write accessor over static and instance members
    pub fn new() -> Self {
        Self::with_options(true, false, false)
    }

    /// Accessor that never writes
    pub fn read_only() -> Self {
        Self::with_options(false, false, false)
    }

    pub(crate) fn with_options(allow_write: bool, instance_only: bool, exclude_object_members: bool) -> Self {
        Self {
            allow_write,
            instance_only,
            exclude_object_members,
            readers: MemberCache::new("property-read"),
            writers: MemberCache::new("property-write"),
        }
    }

    fn reader(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Option<ReadMember> {
        let registry = context.type_registry();
        let key = member_key(registry, target, name, self.instance_only)?;
        let found: Result<_, ()> = self.readers.get_or_try_insert(key.clone(), || {
            Ok(find_read_member(registry, &key, self.exclude_object_members))
        });
        found.ok().flatten()
    }

    fn writer(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Option<WriteMember> {
        if !self.allow_write {
            return None;
        }
        let registry = context.type_registry();
        let key = member_key(registry, target, name, self.instance_only)?;
        let found: Result<_, ()> = self.writers.get_or_try_insert(key.clone(), || {
            Ok(find_write_member(registry, &key, self.exclude_object_members))
        });
        found.ok().flatten()
    }
}

impl PropertyAccessor for ReflectivePropertyAccessor {
    fn can_read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<bool, AccessError> {
        Ok(self.reader(context, target, name).is_some())
    }

    fn read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> EvalResult<TypedValue> {
        match self.reader(context, target, name) {
            Some(member) => Ok(member.read(name, target)?),
            None => Err(EvalError::new(
                MessageKind::PropertyOrFieldNotReadable,
                [name.to_string(), target.type_name()],
            )),
        }
    }

    fn can_write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<bool, AccessError> {
        Ok(self.writer(context, target, name).is_some())
    }

    fn write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        value: Value,
    ) -> EvalResult<()> {
        let Some(member) = self.writer(context, target, name) else {
            return Err(EvalError::new(
                MessageKind::PropertyOrFieldNotWritable,
                [name.to_string(), target.type_name()],
            ));
        };
        let value = context
            .type_converter()
            .convert_value(&value, member.declared_type())?;
        let written = match &member {
            WriteMember::Field(property) => property.set(target, value),
            WriteMember::Setter(method) => method.invoke(target, vec![value]).map(|_| ()),
        };
        written.map_err(|err| {
            EvalError::new(
                MessageKind::ExceptionDuringPropertyWrite,
                [name.to_string(), err.message()],
            )
            .with_cause(err)
        })
    }

    fn compilable_reader(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Option<CompiledReader> {
        let member = self.reader(context, target, name)?;
        let name: Arc<str> = Arc::from(name);
        Some(Arc::new(move |target: &Value| member.read(&name, target)))
    }
}

type ArgTypes = SmallVec<[Option<TypeDescriptor>; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InvocationKey {
    member: MemberKey,
    arg_types: ArgTypes,
}

/// Executor for a method found on the class model
pub(crate) struct ReflectiveMethodExecutor {
    method: MethodDescriptor,
    class: Arc<str>,
}

impl MethodExecutor for ReflectiveMethodExecutor {
    fn execute(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        args: Vec<Value>,
    ) -> EvalResult<TypedValue> {
        let args = convert_arguments(
            context.type_converter(),
            self.method.params(),
            self.method.is_varargs(),
            args,
        )?;
        let result = self.method.invoke(target, args).map_err(|err| {
            EvalError::new(
                MessageKind::ExceptionDuringMethodInvocation,
                [self.method.name().to_string(), self.class.to_string(), err.message()],
            )
            .with_cause(err)
        })?;
        Ok(TypedValue::with_type(result, self.method.return_type().clone()))
    }

    fn is_specializable(&self) -> bool {
        true
    }
}

/// Method resolver over the class model with overload selection
pub struct ReflectiveMethodResolver {
    instance_only: bool,
    exclude_object_members: bool,
    cache: MemberCache<InvocationKey, Arc<ReflectiveMethodExecutor>>,
}

impl fmt::Debug for ReflectiveMethodResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectiveMethodResolver")
            .field("instance_only", &self.instance_only)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Default for ReflectiveMethodResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectiveMethodResolver {
    /// Resolver over static and instance methods
    pub fn new() -> Self {
        Self::with_options(false, false)
    }

    pub(crate) fn with_options(instance_only: bool, exclude_object_members: bool) -> Self {
        Self {
            instance_only,
            exclude_object_members,
            cache: MemberCache::new("method"),
        }
    }

    fn candidates(&self, registry: &TypeRegistry, key: &MemberKey) -> Vec<MethodDescriptor> {
        let keep = |m: &MethodDescriptor| {
            !(self.exclude_object_members && m.is_declared_on_object())
                && !(self.instance_only && m.is_static())
        };
        let mut methods: Vec<MethodDescriptor> = registry
            .methods_named(&key.class, &key.name)
            .into_iter()
            .filter(|m| keep(m) && (!key.is_static || m.is_static()))
            .collect();
        if key.is_static {
            methods.extend(
                registry
                    .methods_named(CLASS_CLASS, &key.name)
                    .into_iter()
                    .filter(|m| keep(m) && !m.is_static()),
            );
        }
        methods
    }
}

impl MethodResolver for ReflectiveMethodResolver {
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> Result<Option<Arc<dyn MethodExecutor>>, AccessError> {
        let registry = context.type_registry();
        let Some(member) = member_key(registry, target, name, self.instance_only) else {
            return Ok(None);
        };
        let key = InvocationKey {
            member,
            arg_types: arg_types.iter().cloned().collect(),
        };
        let found = self.cache.get_or_try_insert(key.clone(), || {
            let methods = self.candidates(registry, &key.member);
            let signatures: Vec<Signature<'_>> = methods
                .iter()
                .map(|m| Signature {
                    params: m.params(),
                    varargs: m.is_varargs(),
                    bridge: m.is_bridge(),
                })
                .collect();
            let best = select_best(&signatures, arg_types, context.type_converter());
            Ok::<_, AccessError>(best.map(|(index, _)| {
                Arc::new(ReflectiveMethodExecutor {
                    method: methods[index].clone(),
                    class: key.member.class.clone(),
                })
            }))
        })?;
        Ok(found.map(|executor| executor as Arc<dyn MethodExecutor>))
    }
}

/// Executor for a constructor found on the class model
pub(crate) struct ReflectiveConstructorExecutor {
    constructor: ConstructorDescriptor,
    ty: TypeDescriptor,
}

impl ConstructorExecutor for ReflectiveConstructorExecutor {
    fn execute(&self, context: &dyn EvaluationContext, args: Vec<Value>) -> EvalResult<TypedValue> {
        let args = convert_arguments(
            context.type_converter(),
            self.constructor.params(),
            self.constructor.is_varargs(),
            args,
        )?;
        let value = self.constructor.invoke(args).map_err(|err| {
            EvalError::new(
                MessageKind::ConstructorInvocationProblem,
                [self.ty.name(), err.message()],
            )
            .with_cause(err)
        })?;
        Ok(TypedValue::with_type(value, self.ty.clone()))
    }
}

/// Constructor resolver locating the type through the context's type locator
pub struct ReflectiveConstructorResolver {
    cache: MemberCache<InvocationKey, Arc<ReflectiveConstructorExecutor>>,
}

impl fmt::Debug for ReflectiveConstructorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectiveConstructorResolver")
            .field("cache", &self.cache)
            .finish()
    }
}

impl Default for ReflectiveConstructorResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReflectiveConstructorResolver {
    /// New resolver with an empty cache
    pub fn new() -> Self {
        Self {
            cache: MemberCache::new("constructor"),
        }
    }
}

impl ConstructorResolver for ReflectiveConstructorResolver {
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        type_name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> EvalResult<Option<Arc<dyn ConstructorExecutor>>> {
        let ty = context.type_locator().find_type(type_name)?;
        let registry = context.type_registry();
        let Some(class) = registry.class_for(&ty) else {
            return Ok(None);
        };
        let key = InvocationKey {
            member: MemberKey {
                class: class.name_arc(),
                name: Arc::from("<init>"),
                is_static: true,
            },
            arg_types: arg_types.iter().cloned().collect(),
        };
        let found = self.cache.get_or_try_insert(key, || {
            let signatures: Vec<Signature<'_>> = class
                .constructors()
                .iter()
                .map(|c| Signature {
                    params: c.params(),
                    varargs: c.is_varargs(),
                    bridge: false,
                })
                .collect();
            let best = select_best(&signatures, arg_types, context.type_converter());
            Ok::<_, EvalError>(best.map(|(index, _)| {
                Arc::new(ReflectiveConstructorExecutor {
                    constructor: class.constructors()[index].clone(),
                    ty: ty.clone(),
                })
            }))
        })?;
        Ok(found.map(|executor| executor as Arc<dyn ConstructorExecutor>))
    }
}
