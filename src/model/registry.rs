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

//! Registry of class descriptors

use super::descriptor::{ClassDescriptor, MethodDescriptor, OBJECT_CLASS, PropertyDescriptor};
use crate::core::{TypeDescriptor, Value};
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Class used for array values
pub(crate) const ARRAY_CLASS: &str = "Array";

/// Concurrent registry of [`ClassDescriptor`]s keyed by qualified name.
///
/// Registration is additive; re-registering a name replaces the descriptor.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    classes: DashMap<Arc<str>, Arc<ClassDescriptor>>,
    aliases: DashMap<Arc<str>, Arc<str>>,
}

impl TypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in classes
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        super::builtins::register_builtins(&registry);
        registry
    }

    /// Register a class, replacing any previous descriptor of the same name
    pub fn register(&self, class: ClassDescriptor) -> Arc<ClassDescriptor> {
        let class = Arc::new(class);
        log::trace!("registering class {}", class.name());
        self.classes.insert(class.name_arc(), class.clone());
        class
    }

    /// Make `alias` resolve to the class registered as `target`
    pub fn register_alias(&self, alias: impl Into<Arc<str>>, target: impl Into<Arc<str>>) {
        self.aliases.insert(alias.into(), target.into());
    }

    /// Look up a class by name or alias
    pub fn lookup(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        if let Some(class) = self.classes.get(name) {
            return Some(class.value().clone());
        }
        let target = self.aliases.get(name)?.value().clone();
        self.classes.get(&*target).map(|c| c.value().clone())
    }

    /// True when a class or alias named `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Class describing values of type `ty`
    pub fn class_for(&self, ty: &TypeDescriptor) -> Option<Arc<ClassDescriptor>> {
        match ty {
            TypeDescriptor::Array(_) => self.lookup(ARRAY_CLASS),
            TypeDescriptor::Named(name) => self.lookup(name),
            other => other.builtin_name().and_then(|name| self.lookup(name)),
        }
    }

    /// Class of a runtime value, `None` for null
    pub fn class_of(&self, value: &Value) -> Option<Arc<ClassDescriptor>> {
        self.class_for(&value.type_descriptor()?)
    }

    /// Canonical class name for `ty`, resolving aliases
    pub fn canonical_name(&self, ty: &TypeDescriptor) -> String {
        match self.class_for(ty) {
            Some(class) if !matches!(ty, TypeDescriptor::Array(_)) => class.name().to_string(),
            _ => ty.name(),
        }
    }

    /// `name` followed by its superclasses, most specific first
    pub fn superclass_chain(&self, name: &str) -> Vec<Arc<ClassDescriptor>> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut next = self.lookup(name);
        while let Some(class) = next {
            if !seen.insert(class.name_arc()) {
                break;
            }
            next = class.superclass().and_then(|s| self.lookup(s));
            chain.push(class);
        }
        chain
    }

    /// Every class and interface `name` is assignable to, including itself
    pub fn supertypes(&self, name: &str) -> FxHashSet<Arc<str>> {
        let mut seen = FxHashSet::default();
        let mut pending: Vec<Arc<str>> = vec![Arc::from(name)];
        while let Some(current) = pending.pop() {
            let Some(class) = self.lookup(&current) else {
                seen.insert(current);
                continue;
            };
            if !seen.insert(class.name_arc()) {
                continue;
            }
            seen.insert(current);
            pending.extend(class.superclass().map(Arc::from));
            pending.extend(class.interfaces().iter().cloned());
        }
        seen.insert(Arc::from(OBJECT_CLASS));
        seen
    }

    /// First property named `name` along the superclass chain
    pub fn find_property(&self, class: &str, name: &str) -> Option<PropertyDescriptor> {
        self.superclass_chain(class)
            .iter()
            .find_map(|c| c.property(name).cloned())
    }

    /// Methods named `name`, declared on the class first, then its superclasses
    pub fn methods_named(&self, class: &str, name: &str) -> Vec<MethodDescriptor> {
        self.superclass_chain(class)
            .iter()
            .flat_map(|c| c.methods().iter().filter(|m| m.name() == name).cloned())
            .collect()
    }

    /// True when a value of type `source` can be used where `target` is expected
    pub fn is_assignable(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> bool {
        match (target, source) {
            _ if target == source => true,
            (TypeDescriptor::Object, _) => true,
            (TypeDescriptor::Number, s) => {
                s.is_numeric() || self.supertypes(&s.name()).contains("Number")
            }
            (TypeDescriptor::Array(t), TypeDescriptor::Array(s)) => self.is_assignable(t, s),
            (_, TypeDescriptor::Array(_)) | (TypeDescriptor::Array(_), _) => false,
            (t, s) => {
                let target_name = self.canonical_name(t);
                let source_name = self.canonical_name(s);
                target_name == source_name || self.supertypes(&source_name).contains(&*target_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignability_walks_hierarchy() {
        let registry = TypeRegistry::with_builtins();
        registry.register(ClassDescriptor::new("Animal"));
        registry.register(ClassDescriptor::new("Named"));
        registry.register(
            ClassDescriptor::new("Dog")
                .with_superclass("Animal")
                .with_interface("Named"),
        );
        let dog = TypeDescriptor::named("Dog");
        assert!(registry.is_assignable(&TypeDescriptor::named("Animal"), &dog));
        assert!(registry.is_assignable(&TypeDescriptor::named("Named"), &dog));
        assert!(registry.is_assignable(&TypeDescriptor::Object, &dog));
        assert!(!registry.is_assignable(&dog, &TypeDescriptor::named("Animal")));
        assert!(registry.is_assignable(&TypeDescriptor::Number, &TypeDescriptor::Long));
        assert!(!registry.is_assignable(&TypeDescriptor::Long, &TypeDescriptor::Integer));
    }

    #[test]
    fn test_aliases_resolve() {
        let registry = TypeRegistry::with_builtins();
        assert_eq!(registry.lookup("ArrayList").map(|c| c.name().to_string()), Some("List".into()));
        assert!(registry.is_assignable(&TypeDescriptor::named("Collection"), &TypeDescriptor::List));
    }

    #[test]
    fn test_method_lookup_prefers_declaring_class() {
        let registry = TypeRegistry::with_builtins();
        let methods = registry.methods_named("Integer", "toString");
        assert!(!methods.is_empty());
        assert!(!methods[0].is_declared_on_object());
        assert!(methods.last().unwrap().is_declared_on_object());
    }
}
