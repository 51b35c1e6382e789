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

//! Runtime class model
//!
//! Registered [`ClassDescriptor`]s stand in for the host type system: the
//! reflective resolvers walk them to find properties, methods and
//! constructors, and the type services below consult them for lookup,
//! conversion and assignability.

pub mod bean;
pub mod builtins;
pub mod comparator;
pub mod converter;
pub mod descriptor;
pub mod locator;
pub mod overloader;
pub mod registry;

pub use bean::{BeanResolver, StaticBeanResolver};
pub use builtins::{MAP_ENTRY_CLASS, MapEntry};
pub use comparator::{StandardTypeComparator, TypeComparator};
pub use converter::{StandardTypeConverter, TypeConverter};
pub use descriptor::{
    ClassDescriptor, ConstructorBody, ConstructorDescriptor, MethodBody, MethodDescriptor,
    PropertyDescriptor, PropertyGetter, PropertySetter,
};
pub use locator::{StandardTypeLocator, TypeLocator, UnsupportedTypeLocator, primitive_type};
pub use overloader::{OperatorOverloader, StandardOperatorOverloader};
pub use registry::TypeRegistry;
