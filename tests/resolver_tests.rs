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

//! Resolver chains: map access, data-binding contexts, custom accessors

mod common;

use common::{context, eval_error_in, eval_in, registry, tesla, Inventor};
use kestrel_expr::core::{AccessError, EvalResult, TypedValue};
use kestrel_expr::resolver::{IndexAccessor, MapAccessor, PropertyAccessor};
use kestrel_expr::{
    EvaluationContext, MessageKind, SimpleEvaluationContext, StandardEvaluationContext,
    TypeDescriptor, Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn settings() -> Value {
    Value::map([
        (Value::from("timeout"), Value::Integer(30)),
        (Value::from("host"), Value::from("localhost")),
    ])
}

#[test]
fn test_map_keys_read_as_properties() {
    let ctx = StandardEvaluationContext::new()
        .with_property_accessor(MapAccessor::new())
        .with_root(settings());
    assert_eq!(eval_in(&ctx, "timeout * 2"), Value::Integer(60));
    assert_eq!(eval_in(&ctx, "host.toUpperCase()"), Value::from("LOCALHOST"));
    assert_eq!(eval_in(&ctx, "size()"), Value::Integer(2));
    assert_eq!(
        eval_error_in(&ctx, "missing").kind(),
        MessageKind::PropertyOrFieldNotReadable
    );
}

#[test]
fn test_map_accessor_writes_entries() {
    let root = settings();
    let ctx = StandardEvaluationContext::new()
        .with_property_accessor(MapAccessor::new())
        .with_root(root.clone());
    assert_eq!(eval_in(&ctx, "retries = 3"), Value::Integer(3));
    assert_eq!(eval_in(&ctx, "timeout = 45"), Value::Integer(45));
    let Value::Map(map) = root else { unreachable!() };
    assert_eq!(map.get(&Value::from("retries")), Some(Value::Integer(3)));
    assert_eq!(map.get(&Value::from("timeout")), Some(Value::Integer(45)));
}

#[test]
fn test_read_only_map_accessor_rejects_writes() {
    let ctx = StandardEvaluationContext::new()
        .with_property_accessor(MapAccessor::read_only())
        .with_root(settings());
    assert_eq!(eval_in(&ctx, "timeout"), Value::Integer(30));
    assert_eq!(
        eval_error_in(&ctx, "timeout = 1").kind(),
        MessageKind::PropertyOrFieldNotWritable
    );
}

fn read_only_binding() -> SimpleEvaluationContext {
    SimpleEvaluationContext::for_read_only_data_binding()
        .with_registry(registry())
        .with_root(tesla())
}

#[rstest]
#[case("name", Value::from("Nikola Tesla"))]
#[case("age + 1", Value::Integer(87))]
#[case("inventions[2]", Value::from("radio"))]
#[case("inventions[0] + '!'", Value::from("induction motor!"))]
#[case("address?.city ?: name", Value::from("Nikola Tesla"))]
fn test_read_only_binding_reads(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(eval_in(&read_only_binding(), text), expected);
}

#[rstest]
#[case("name = 'Edison'", MessageKind::PropertyOrFieldNotWritable)]
#[case("T(String)", MessageKind::TypeNotFound)]
#[case("new Inventor('Edison')", MessageKind::ConstructorNotFound)]
#[case("@inventor", MessageKind::NoBeanResolverRegistered)]
#[case("#x = 1", MessageKind::VariableAssignmentNotSupported)]
fn test_read_only_binding_restrictions(#[case] text: &str, #[case] kind: MessageKind) {
    assert_eq!(eval_error_in(&read_only_binding(), text).kind(), kind);
}

#[test]
fn test_binding_methods_need_opt_in() {
    let ctx = read_only_binding();
    assert_eq!(eval_error_in(&ctx, "greet('Ada')").kind(), MessageKind::MethodNotFound);
    assert_eq!(eval_error_in(&ctx, "name.length()").kind(), MessageKind::MethodNotFound);

    let ctx = read_only_binding().with_instance_methods();
    assert_eq!(
        eval_in(&ctx, "greet('Ada')"),
        Value::from("Hello Ada, I am Nikola Tesla")
    );
    assert_eq!(eval_error_in(&ctx, "getClass()").kind(), MessageKind::MethodNotFound);
}

#[test]
fn test_read_write_binding_writes_properties() {
    let root = tesla();
    let ctx = SimpleEvaluationContext::for_read_write_data_binding()
        .with_registry(registry())
        .with_root(root.clone())
        .with_variable("newName", "Nikola");
    assert_eq!(eval_in(&ctx, "name = #newName"), Value::from("Nikola"));
    // the result is the assigned value before conversion to the property type
    assert_eq!(eval_in(&ctx, "age = '40'"), Value::from("40"));
    let Value::Object(object) = root else { unreachable!() };
    let inventor = object.downcast_ref::<Inventor>().unwrap();
    assert_eq!(*inventor.name.lock(), "Nikola");
    assert_eq!(*inventor.age.lock(), 40);
}

#[test]
fn test_assignment_disabled_rejects_every_form() {
    let ctx = SimpleEvaluationContext::for_read_write_data_binding()
        .with_registry(registry())
        .with_root(tesla())
        .with_assignment_disabled();
    for text in ["name = 'x'", "age++", "--age"] {
        assert_eq!(
            eval_error_in(&ctx, text).kind(),
            MessageKind::AssignmentNotSupported,
            "{text}"
        );
    }
    assert_eq!(eval_in(&ctx, "age"), Value::Integer(86));
}

/// Serves `name` for inventors only
struct ShoutingNameAccessor;

impl PropertyAccessor for ShoutingNameAccessor {
    fn specific_target_classes(&self) -> Option<Vec<TypeDescriptor>> {
        Some(vec![TypeDescriptor::named("Inventor")])
    }

    fn can_read(&self, _: &dyn EvaluationContext, _: &Value, name: &str) -> Result<bool, AccessError> {
        Ok(name == "name")
    }

    fn read(&self, _: &dyn EvaluationContext, _: &Value, _: &str) -> EvalResult<TypedValue> {
        Ok(TypedValue::new(Value::from("NIKOLA TESLA")))
    }

    fn can_write(&self, _: &dyn EvaluationContext, _: &Value, _: &str) -> Result<bool, AccessError> {
        Ok(false)
    }

    fn write(&self, _: &dyn EvaluationContext, _: &Value, _: &str, _: Value) -> EvalResult<()> {
        Ok(())
    }
}

/// Serves `nickname` for any target
struct NicknameAccessor;

impl PropertyAccessor for NicknameAccessor {
    fn can_read(&self, _: &dyn EvaluationContext, _: &Value, name: &str) -> Result<bool, AccessError> {
        Ok(name == "nickname")
    }

    fn read(&self, _: &dyn EvaluationContext, target: &Value, _: &str) -> EvalResult<TypedValue> {
        Ok(TypedValue::new(Value::from(format!("the {}", target.type_name()))))
    }

    fn can_write(&self, _: &dyn EvaluationContext, _: &Value, _: &str) -> Result<bool, AccessError> {
        Ok(false)
    }

    fn write(&self, _: &dyn EvaluationContext, _: &Value, _: &str, _: Value) -> EvalResult<()> {
        Ok(())
    }
}

#[test]
fn test_specific_accessors_take_priority() {
    let ctx = context()
        .with_property_accessor(NicknameAccessor)
        .with_property_accessor(ShoutingNameAccessor);
    assert_eq!(eval_in(&ctx, "name"), Value::from("NIKOLA TESLA"));
    assert_eq!(eval_in(&ctx, "age"), Value::Integer(86));
    assert_eq!(eval_in(&ctx, "nickname"), Value::from("the Inventor"));
    assert_eq!(eval_in(&ctx, "'x'.nickname"), Value::from("the String"));
}

/// `inventor[n]` reads and writes the inventions list
struct InventionIndexAccessor;

fn inventions(target: &Value) -> Option<kestrel_expr::core::ListRef> {
    match target {
        Value::Object(object) => object
            .downcast_ref::<Inventor>()
            .map(|inventor| inventor.inventions.clone()),
        _ => None,
    }
}

impl IndexAccessor for InventionIndexAccessor {
    fn specific_target_classes(&self) -> Option<Vec<TypeDescriptor>> {
        Some(vec![TypeDescriptor::named("Inventor")])
    }

    fn can_read(&self, _: &dyn EvaluationContext, _: &Value, index: &Value) -> Result<bool, AccessError> {
        Ok(matches!(index, Value::Integer(_)))
    }

    fn read(&self, _: &dyn EvaluationContext, target: &Value, index: &Value) -> EvalResult<TypedValue> {
        let list = inventions(target).ok_or_else(|| AccessError::failed("not an inventor"))?;
        let position = index.as_i64().unwrap_or(-1);
        let value = usize::try_from(position)
            .ok()
            .and_then(|i| list.get(i))
            .unwrap_or(Value::Null);
        Ok(TypedValue::new(value))
    }

    fn can_write(&self, _: &dyn EvaluationContext, _: &Value, index: &Value) -> Result<bool, AccessError> {
        Ok(matches!(index, Value::Integer(_)))
    }

    fn write(&self, _: &dyn EvaluationContext, target: &Value, index: &Value, value: Value) -> EvalResult<()> {
        let list = inventions(target).ok_or_else(|| AccessError::failed("not an inventor"))?;
        let position = index.as_i64().and_then(|i| usize::try_from(i).ok()).unwrap_or(0);
        if let Some(slot) = list.write().get_mut(position) {
            *slot = value;
        }
        Ok(())
    }
}

#[test]
fn test_index_accessor_handles_custom_targets() {
    let root = tesla();
    let ctx = context()
        .with_root(root.clone())
        .with_index_accessor(InventionIndexAccessor);
    assert_eq!(eval_in(&ctx, "[1]"), Value::from("AC"));
    assert_eq!(eval_in(&ctx, "[9]"), Value::Null);
    // string keys fall through to property lookup
    assert_eq!(eval_in(&ctx, "['name']"), Value::from("Nikola Tesla"));
    assert_eq!(eval_in(&ctx, "[0] = 'polyphase motor'"), Value::from("polyphase motor"));
    assert_eq!(eval_in(&ctx, "inventions[0]"), Value::from("polyphase motor"));
}

#[test]
fn test_index_accessor_ignores_other_classes() {
    let ctx = context().with_index_accessor(InventionIndexAccessor);
    assert_eq!(eval_in(&ctx, "{10, 20}[1]"), Value::Integer(20));
    assert_eq!(eval_in(&ctx, "'abc'[2]"), Value::from("c"));
}
