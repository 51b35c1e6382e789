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

//! End-to-end evaluation against the fixture class model

mod common;

use common::{context, eval, eval_error, eval_error_in, eval_in, ints, parse, parse_with, strings};
use kestrel_expr::core::{ArrayRef, FunctionRef};
use kestrel_expr::model::StaticBeanResolver;
use kestrel_expr::{
    EvaluationContext, MessageKind, ParserConfig, StandardEvaluationContext, TypeDescriptor, Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("7 / 2", Value::Integer(3))]
#[case("7 % 3", Value::Integer(1))]
#[case("2 ^ 10", Value::Integer(1024))]
#[case("2 ^ 31", Value::Long(2_147_483_648))]
#[case("1 + 2L", Value::Long(3))]
#[case("1.5 + 1", Value::Double(2.5))]
#[case("2147483647 + 1", Value::Integer(i32::MIN))]
#[case("-(3 - 5)", Value::Integer(2))]
#[case("'a' + 1", Value::from("a1"))]
#[case("null + 'x'", Value::from("nullx"))]
#[case("'ab' * 3", Value::from("ababab"))]
#[case("'c' - 2", Value::from("a"))]
fn test_arithmetic(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(eval(text), expected);
}

#[rstest]
#[case("1 < 2L", true)]
#[case("2.0 == 2", true)]
#[case("'abc' lt 'abd'", true)]
#[case("null < 1", true)]
#[case("null == null", true)]
#[case("'x' != 'x'", false)]
#[case("3 between {1, 3}", true)]
#[case("0 between {1, 3}", false)]
#[case("'Tesla' matches 'T[a-z]+'", true)]
#[case("'Tesla!' matches 'T[a-z]+'", false)]
#[case("'abc' instanceof T(String)", true)]
#[case("1 instanceof T(Number)", true)]
#[case("null instanceof T(Object)", false)]
#[case("true and !false", true)]
#[case("false or not true", false)]
fn test_relational_and_logical(#[case] text: &str, #[case] expected: bool) {
    assert_eq!(eval(text), Value::Boolean(expected));
}

#[test]
fn test_logical_operators_short_circuit() {
    // the right operand would raise when evaluated
    assert_eq!(eval("false and nosuch"), Value::Boolean(false));
    assert_eq!(eval("true or nosuch"), Value::Boolean(true));
    assert_eq!(eval_error("null and true").kind(), MessageKind::NullOperandForBoolean);
}

#[rstest]
#[case("null ?: 'fallback'", Value::from("fallback"))]
#[case("'' ?: 'fallback'", Value::from("fallback"))]
#[case("name ?: 'fallback'", Value::from("Nikola Tesla"))]
#[case("age > 80 ? 'senior' : 'junior'", Value::from("senior"))]
fn test_conditionals(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(eval(text), expected);
}

#[rstest]
#[case("name", Value::from("Nikola Tesla"))]
#[case("name.length()", Value::Integer(12))]
#[case("inventions[1]", Value::from("AC"))]
#[case("inventions.size()", Value::Integer(3))]
#[case("#root.age", Value::Integer(86))]
#[case("#this.name.toUpperCase()", Value::from("NIKOLA TESLA"))]
#[case("KIND", Value::from("inventor"))]
#[case("'text'[1]", Value::from("e"))]
#[case("greet('you')", Value::from("Hello you, I am Nikola Tesla"))]
#[case("score(1)", Value::from("int"))]
#[case("score(1.5)", Value::from("double"))]
#[case("join('a', 'b', 'c')", Value::from("a-b-c"))]
#[case("join()", Value::from(""))]
#[case("T(Math).max(3, 7)", Value::Integer(7))]
#[case("T(Integer).parseInt('42') + 1", Value::Integer(43))]
#[case("new Inventor('Ada', 36).age", Value::Integer(36))]
fn test_member_access(#[case] text: &str, #[case] expected: Value) {
    assert_eq!(eval(text), expected);
}

#[test]
fn test_collection_operators() {
    assert_eq!(eval("inventions.?[length() > 2]"), strings(&["induction motor", "radio"]));
    assert_eq!(eval("inventions.^[length() > 2]"), Value::from("induction motor"));
    assert_eq!(eval("inventions.$[length() > 2]"), Value::from("radio"));
    assert_eq!(eval("inventions.^[length() > 99]"), Value::Null);
    assert_eq!(eval("inventions.![length()]"), ints(&[15, 2, 5]));
    assert_eq!(eval("{1, 2, 3}.![#this * 2]"), ints(&[2, 4, 6]));
    assert_eq!(
        eval("{a: 1, b: 2, c: 3}.?[value > 1]"),
        Value::map([(Value::from("b"), Value::Integer(2)), (Value::from("c"), Value::Integer(3))])
    );
    assert_eq!(
        eval("{a: 1, b: 2, c: 3}.$[value > 1]"),
        Value::map([(Value::from("c"), Value::Integer(3))])
    );
    assert_eq!(eval("{a: 1, b: 2}[b]"), Value::Integer(2));
    assert_eq!(eval("{a: 1, b: 2}['a']"), Value::Integer(1));
}

#[test]
fn test_selection_requires_boolean_criteria() {
    let err = eval_error("inventions.?[length()]");
    assert_eq!(err.kind(), MessageKind::ResultOfSelectionCriteriaIsNotBoolean);
}

#[test]
fn test_inline_lists_are_fresh_per_evaluation() {
    let ctx = context();
    let expr = parse("{1, 2}");
    let first = expr.get_value(&ctx).unwrap();
    let second = expr.get_value(&ctx).unwrap();
    let (Value::List(a), Value::List(b)) = (&first, &second) else {
        panic!("expected lists");
    };
    assert!(!a.ptr_eq(b));
}

#[test]
fn test_arrays() {
    assert_eq!(
        eval("new int[3]"),
        Value::Array(ArrayRef::new(TypeDescriptor::Integer, vec![Value::Integer(0); 3]))
    );
    assert_eq!(eval("new String[]{'a', 'b'}[1]"), Value::from("b"));
    assert_eq!(eval_error("new int[-1]").kind(), MessageKind::NegativeArrayDimension);
    assert_eq!(
        eval_error("new int[2]{1, 2, 3}").kind(),
        MessageKind::InitializerLengthIncorrect
    );
}

#[test]
fn test_variables_and_functions() {
    let ctx = context().with_variable("x", 5);
    ctx.register_function(
        "reverse",
        FunctionRef::new("reverse", vec![TypeDescriptor::String], |args| {
            let text = args.first().map(Value::to_display_string).unwrap_or_default();
            Ok(Value::from(text.chars().rev().collect::<String>()))
        }),
    );
    assert_eq!(eval_in(&ctx, "#x * 2"), Value::Integer(10));
    assert_eq!(eval_in(&ctx, "#missing"), Value::Null);
    assert_eq!(eval_in(&ctx, "#reverse('abc')"), Value::from("cba"));
    assert_eq!(eval_in(&ctx, "#reverse(123)"), Value::from("321"));
    // arguments see the root, as method arguments do
    assert_eq!(eval_in(&ctx, "inventions.#reverse(name)"), Value::from("alseT alokiN"));
    assert_eq!(
        eval_error_in(&ctx, "#reverse('a', 'b')").kind(),
        MessageKind::IncorrectNumberOfArgumentsToFunction
    );
    assert_eq!(eval_error_in(&ctx, "#nothing()").kind(), MessageKind::FunctionNotDefined);
    assert_eq!(
        eval_error_in(&ctx, "#x()").kind(),
        MessageKind::FunctionReferenceCannotBeInvoked
    );
}

#[test]
fn test_bean_references() {
    let ctx = context().with_bean_resolver(
        StaticBeanResolver::new()
            .with_bean("greeting", "hi")
            .with_bean("&greeting", "factory"),
    );
    assert_eq!(eval_in(&ctx, "@greeting.toUpperCase()"), Value::from("HI"));
    assert_eq!(eval_in(&ctx, "&greeting"), Value::from("factory"));
    assert_eq!(
        eval_error_in(&ctx, "@missing").kind(),
        MessageKind::ExceptionDuringBeanResolution
    );
    assert_eq!(eval_error("@greeting").kind(), MessageKind::NoBeanResolverRegistered);
}

#[test]
fn test_assignment_and_increment() {
    let ctx = context();
    assert_eq!(eval_in(&ctx, "name = 'Ada'"), Value::from("Ada"));
    assert_eq!(eval_in(&ctx, "name"), Value::from("Ada"));
    assert_eq!(eval_in(&ctx, "age++"), Value::Integer(86));
    assert_eq!(eval_in(&ctx, "++age"), Value::Integer(88));
    assert_eq!(eval_in(&ctx, "age--"), Value::Integer(88));
    assert_eq!(eval_in(&ctx, "age"), Value::Integer(87));
    assert_eq!(eval_in(&ctx, "#count = 4"), Value::Integer(4));
    assert_eq!(ctx.lookup_variable("count"), Some(Value::Integer(4)));
    assert_eq!(eval_in(&ctx, "inventions[0] = 'tesla coil'"), Value::from("tesla coil"));
    assert_eq!(eval_in(&ctx, "inventions[0]"), Value::from("tesla coil"));

    assert_eq!(eval_error_in(&ctx, "'x' = 1").kind(), MessageKind::NotAssignable);
    assert_eq!(eval_error_in(&ctx, "KIND = 'x'").kind(), MessageKind::PropertyOrFieldNotWritable);
    assert_eq!(eval_error_in(&ctx, "1++").kind(), MessageKind::OperandNotIncrementable);
    assert_eq!(eval_error_in(&ctx, "name--").kind(), MessageKind::OperandNotDecrementable);
}

#[test]
fn test_set_value_through_expression() {
    let ctx = context();
    let expr = parse("address");
    assert_eq!(expr.get_value_type(&ctx).unwrap(), Some(TypeDescriptor::named("Address")));
    assert!(expr.is_writable(&ctx).unwrap());
    let address = eval_in(&ctx, "new Address()");
    expr.set_value(&ctx, address).unwrap();
    parse("address.city").set_value(&ctx, "Smiljan").unwrap();
    assert_eq!(eval_in(&ctx, "address.city"), Value::from("Smiljan"));

    let err = parse("name.length()").set_value(&ctx, 1).unwrap_err();
    assert_eq!(err.kind(), MessageKind::NotAssignable);
}

#[test]
fn test_typed_value_conversion() {
    let ctx = context();
    assert_eq!(
        parse("age").get_typed_value(&ctx, &TypeDescriptor::String).unwrap(),
        Value::from("86")
    );
    assert_eq!(
        parse("'12'").get_typed_value(&ctx, &TypeDescriptor::Long).unwrap(),
        Value::Long(12)
    );
    let err = parse("'twelve'").get_typed_value(&ctx, &TypeDescriptor::Integer).unwrap_err();
    assert_eq!(err.kind(), MessageKind::ConversionFailed);
}

#[test]
fn test_evaluate_with_root_override() {
    let ctx = context();
    let other = eval_in(&ctx, "new Inventor('Ada', 36)");
    let expr = parse("name + ' ' + age");
    assert_eq!(expr.evaluate_with_root(&ctx, other).unwrap().into_value(), Value::from("Ada 36"));
    assert_eq!(expr.get_value(&ctx).unwrap(), Value::from("Nikola Tesla 86"));
}

#[test]
fn test_null_safe_navigation() {
    assert_eq!(eval("address?.city"), Value::Null);
    assert_eq!(eval("address?.city.length()"), Value::Null);
    assert_eq!(eval("address?.[0]"), Value::Null);
    let err = eval_error("address.city");
    assert_eq!(err.kind(), MessageKind::PropertyOrFieldNotReadableOnNull);
    assert_eq!(eval_error("address.toString()").kind(), MessageKind::MethodCallOnNullObjectNotAllowed);
    assert_eq!(eval_error("address[0]").kind(), MessageKind::CannotIndexIntoNullValue);
}

#[test]
fn test_auto_grow_null_references() {
    let ctx = context();
    let config = ParserConfig::new().with_auto_grow_null_references(true);
    let expr = parse_with(config, "address.city");
    assert_eq!(expr.get_value(&ctx).unwrap(), Value::from(""));
    assert!(!eval_in(&ctx, "address").is_null());
}

#[test]
fn test_auto_grow_collections() {
    let grow = ParserConfig::new()
        .with_auto_grow_collections(true)
        .with_maximum_auto_grow_size(10);
    let ctx = StandardEvaluationContext::new().with_variable("list", ints(&[1]));
    parse_with(grow.clone(), "#list[3] = 4").get_value(&ctx).unwrap();
    assert_eq!(
        ctx.lookup_variable("list"),
        Some(Value::list(vec![Value::Integer(1), Value::Null, Value::Null, Value::Integer(4)]))
    );
    let err = parse_with(grow, "#list[20] = 1").get_value(&ctx).unwrap_err();
    assert_eq!(err.kind(), MessageKind::UnableToGrowCollection);
    let err = parse("#list[20] = 1").get_value(&ctx).unwrap_err();
    assert_eq!(err.kind(), MessageKind::CollectionIndexOutOfBounds);
    assert_eq!(parse("#list[7]").get_value(&ctx).unwrap_err().kind(), MessageKind::CollectionIndexOutOfBounds);
}

#[rstest]
#[case("nosuch", MessageKind::PropertyOrFieldNotReadable)]
#[case("nosuch()", MessageKind::MethodNotFound)]
#[case("fail()", MessageKind::ExceptionDuringMethodInvocation)]
#[case("new Inventor(1, 2, 3)", MessageKind::ConstructorNotFound)]
#[case("T(NoSuchType)", MessageKind::TypeNotFound)]
#[case("'abc' * -1", MessageKind::NegativeRepeatedTextCount)]
#[case("'abc' * 100", MessageKind::MaxRepeatedTextSizeExceeded)]
#[case("1 instanceof 'x'", MessageKind::InstanceofOperatorNeedsClassOperand)]
#[case("1 matches 'x'", MessageKind::InvalidFirstOperandForMatchesOperator)]
#[case("'a' matches '('", MessageKind::InvalidPattern)]
#[case("1 between 2", MessageKind::BetweenRightOperandMustBeTwoElementList)]
#[case("{1} < {2}", MessageKind::NotComparable)]
#[case("inventions[5]", MessageKind::CollectionIndexOutOfBounds)]
#[case("'abc'[5]", MessageKind::StringIndexOutOfBounds)]
#[case("age.?[true]", MessageKind::InvalidTypeForSelection)]
#[case("age.![1]", MessageKind::ProjectionNotSupportedOnType)]
fn test_evaluation_errors(#[case] text: &str, #[case] kind: MessageKind) {
    let err = eval_error(text);
    assert_eq!(err.kind(), kind, "{text}: {err}");
}

#[test]
fn test_error_inserts_and_position() {
    let err = eval_error("name.nosuch");
    assert_eq!(err.inserts(), &["nosuch".to_string(), "String".to_string()]);
    assert_eq!(err.position(), Some(5));

    let err = eval_error("1 + 10 / 0");
    assert_eq!(err.kind(), MessageKind::DivisionByZero);
    assert_eq!(err.inserts(), &["(10 / 0)".to_string()]);
    assert_eq!(err.position(), Some(4));

    let err = eval_error("greet()");
    assert_eq!(err.inserts(), &["greet()".to_string(), "Inventor".to_string()]);
}

#[test]
fn test_method_failure_keeps_cause() {
    let err = eval_error("fail()");
    assert!(err.cause().is_some());
    assert!(err.message().contains("boom"), "{}", err.message());
}
