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

//! Shared fixtures: a small inventor/address class model and evaluation helpers

#![allow(dead_code)]

use kestrel_expr::core::{AccessError, ListRef};
use kestrel_expr::model::{
    ConstructorDescriptor, MethodDescriptor, PropertyDescriptor,
};
use kestrel_expr::{
    ClassDescriptor, EvalError, EvaluationContext, Expression, ExpressionParser, ParserConfig,
    StandardEvaluationContext, TypeDescriptor, TypeRegistry, Value,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Embedder object with interior mutability, exposed as class `Inventor`
#[derive(Debug)]
pub struct Inventor {
    pub name: Mutex<String>,
    pub age: Mutex<i32>,
    pub inventions: ListRef,
    pub address: Mutex<Value>,
    /// Number of times `describe()` ran
    pub calls: AtomicUsize,
}

impl Inventor {
    pub fn new(name: &str, age: i32, inventions: &[&str]) -> Self {
        Self {
            name: Mutex::new(name.to_string()),
            age: Mutex::new(age),
            inventions: ListRef::new(inventions.iter().map(|s| Value::from(*s)).collect()),
            address: Mutex::new(Value::Null),
            calls: AtomicUsize::new(0),
        }
    }
}

/// Exposed as class `Address`, default constructible
#[derive(Debug, Default)]
pub struct Address {
    pub city: Mutex<String>,
}

fn this<T: 'static>(target: &Value) -> Result<&T, AccessError> {
    match target {
        Value::Object(object) => object
            .downcast_ref::<T>()
            .ok_or_else(|| AccessError::failed(format!("unexpected {}", object.class_name()))),
        other => Err(AccessError::failed(format!("unexpected {}", other.type_name()))),
    }
}

fn string_arg(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::to_display_string).unwrap_or_default()
}

fn address_class() -> ClassDescriptor {
    ClassDescriptor::new("Address")
        .with_constructor(ConstructorDescriptor::new(vec![], |_| {
            Ok(Value::object("Address", Address::default()))
        }))
        .with_property(PropertyDescriptor::read_write(
            "city",
            TypeDescriptor::String,
            |t| Ok(Value::from(this::<Address>(t)?.city.lock().as_str())),
            |t, v| {
                *this::<Address>(t)?.city.lock() = v.to_display_string();
                Ok(())
            },
        ))
}

fn inventor_class() -> ClassDescriptor {
    ClassDescriptor::new("Inventor")
        .with_constructor(ConstructorDescriptor::new(vec![TypeDescriptor::String], |args| {
            Ok(Value::object("Inventor", Inventor::new(&string_arg(&args, 0), 0, &[])))
        }))
        .with_constructor(ConstructorDescriptor::new(
            vec![TypeDescriptor::String, TypeDescriptor::Integer],
            |args| {
                let age = args.get(1).and_then(Value::as_i64).unwrap_or(0) as i32;
                Ok(Value::object("Inventor", Inventor::new(&string_arg(&args, 0), age, &[])))
            },
        ))
        .with_property(PropertyDescriptor::read_write(
            "name",
            TypeDescriptor::String,
            |t| Ok(Value::from(this::<Inventor>(t)?.name.lock().as_str())),
            |t, v| {
                *this::<Inventor>(t)?.name.lock() = v.to_display_string();
                Ok(())
            },
        ))
        .with_property(PropertyDescriptor::read_write(
            "age",
            TypeDescriptor::Integer,
            |t| Ok(Value::Integer(*this::<Inventor>(t)?.age.lock())),
            |t, v| {
                let age = v.as_i64().ok_or_else(|| AccessError::failed("age must be a number"))?;
                *this::<Inventor>(t)?.age.lock() = age as i32;
                Ok(())
            },
        ))
        .with_property(PropertyDescriptor::read_only(
            "inventions",
            TypeDescriptor::List,
            |t| Ok(Value::List(this::<Inventor>(t)?.inventions.clone())),
        ))
        .with_property(PropertyDescriptor::read_write(
            "address",
            TypeDescriptor::named("Address"),
            |t| Ok(this::<Inventor>(t)?.address.lock().clone()),
            |t, v| {
                *this::<Inventor>(t)?.address.lock() = v;
                Ok(())
            },
        ))
        .with_property(PropertyDescriptor::constant(
            "KIND",
            TypeDescriptor::String,
            Value::from("inventor"),
        ))
        .with_method(MethodDescriptor::new(
            "greet",
            vec![TypeDescriptor::String],
            TypeDescriptor::String,
            |t, args| {
                let me = this::<Inventor>(t)?;
                Ok(Value::from(format!("Hello {}, I am {}", string_arg(&args, 0), me.name.lock())))
            },
        ))
        .with_method(MethodDescriptor::new(
            "describe",
            vec![],
            TypeDescriptor::String,
            |t, _| {
                let me = this::<Inventor>(t)?;
                me.calls.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from(format!("{} ({})", me.name.lock(), me.age.lock())))
            },
        ))
        .with_method(MethodDescriptor::new(
            "score",
            vec![TypeDescriptor::Integer],
            TypeDescriptor::String,
            |_, _| Ok(Value::from("int")),
        ))
        .with_method(MethodDescriptor::new(
            "score",
            vec![TypeDescriptor::Double],
            TypeDescriptor::String,
            |_, _| Ok(Value::from("double")),
        ))
        .with_method(
            MethodDescriptor::new(
                "join",
                vec![TypeDescriptor::array_of(TypeDescriptor::String)],
                TypeDescriptor::String,
                |_, args| {
                    let parts = match args.first() {
                        Some(Value::Array(array)) => array
                            .snapshot()
                            .iter()
                            .map(Value::to_display_string)
                            .collect::<Vec<_>>(),
                        _ => Vec::new(),
                    };
                    Ok(Value::from(parts.join("-")))
                },
            )
            .with_varargs(),
        )
        .with_method(MethodDescriptor::new(
            "fail",
            vec![],
            TypeDescriptor::String,
            |_, _| Err(AccessError::failed("boom")),
        ))
}

/// Built-in registry plus the fixture classes
pub fn registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::with_builtins();
    registry.register(address_class());
    registry.register(inventor_class());
    Arc::new(registry)
}

pub fn tesla() -> Value {
    Value::object(
        "Inventor",
        Inventor::new("Nikola Tesla", 86, &["induction motor", "AC", "radio"]),
    )
}

/// Standard context rooted at [`tesla`]
pub fn context() -> StandardEvaluationContext {
    StandardEvaluationContext::with_registry(registry()).with_root(tesla())
}

pub fn parse(text: &str) -> Expression {
    ExpressionParser::new()
        .parse_expression(text)
        .unwrap_or_else(|e| panic!("failed to parse '{text}': {e}"))
}

pub fn parse_with(config: ParserConfig, text: &str) -> Expression {
    ExpressionParser::with_config(config)
        .parse_expression(text)
        .unwrap_or_else(|e| panic!("failed to parse '{text}': {e}"))
}

pub fn eval_in(ctx: &dyn EvaluationContext, text: &str) -> Value {
    parse(text)
        .get_value(ctx)
        .unwrap_or_else(|e| panic!("failed to evaluate '{text}': {e}"))
}

/// Evaluate against the standard fixture context
pub fn eval(text: &str) -> Value {
    eval_in(&context(), text)
}

pub fn eval_error_in(ctx: &dyn EvaluationContext, text: &str) -> EvalError {
    match parse(text).get_value(ctx) {
        Ok(value) => panic!("'{text}' evaluated to {value:?}, expected an error"),
        Err(err) => err,
    }
}

pub fn eval_error(text: &str) -> EvalError {
    eval_error_in(&context(), text)
}

pub fn strings(items: &[&str]) -> Value {
    Value::list(items.iter().map(|s| Value::from(*s)).collect())
}

pub fn ints(items: &[i32]) -> Value {
    Value::list(items.iter().map(|i| Value::Integer(*i)).collect())
}

/// Install a test logger once; output shows with `RUST_LOG` set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
