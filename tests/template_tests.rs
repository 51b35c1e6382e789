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

//! Template parsing and rendering

mod common;

use common::context;
use kestrel_expr::{
    Expression, ExpressionParser, MessageKind, ParseError, TemplateContext, TypeDescriptor, Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn template(text: &str) -> Expression {
    try_template(text).unwrap_or_else(|e| panic!("failed to parse template '{text}': {e}"))
}

fn try_template(text: &str) -> Result<Expression, ParseError> {
    ExpressionParser::new().parse_template(text, &TemplateContext::default())
}

fn render(text: &str) -> Value {
    template(text).get_value(&context()).unwrap()
}

#[rstest]
#[case("Name: #{name}, age #{age}", "Name: Nikola Tesla, age 86")]
#[case("#{name.length()}#{age}", "1286")]
#[case("#{ {1, 2, 3}.size() } items", "3 items")]
#[case("key=#{ {'k': 'v'}['k'] }", "key=v")]
#[case("#{ 'a}b' }!", "a}b!")]
#[case("[#{address}]", "[]")]
#[case("#{inventions[0]} and #{inventions.size() - 1} more", "induction motor and 2 more")]
#[case("#{age > 80} / #{2.5}", "true / 2.5")]
fn test_render(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(render(text), Value::from(expected));
}

#[test]
fn test_template_shapes() {
    assert!(matches!(template("plain text"), Expression::Literal(_)));
    assert!(matches!(template(""), Expression::Literal(_)));
    assert!(matches!(template("#{ age }"), Expression::Standard(_)));
    let Expression::Composite(composite) = template("a #{age} b") else {
        panic!("expected a composite");
    };
    assert_eq!(composite.parts().len(), 3);
    assert_eq!(composite.expression_string(), "a #{age} b");
}

#[test]
fn test_single_expression_keeps_its_type() {
    assert_eq!(render("#{age}"), Value::Integer(86));
    assert_eq!(render("plain"), Value::from("plain"));
}

#[test]
fn test_custom_delimiters() {
    let delimiters = TemplateContext::new("${", "}");
    let expr = ExpressionParser::new()
        .parse_template("${name} is ${age > 80 ? 'old' : 'young'}, #{not this}", &delimiters)
        .unwrap();
    assert_eq!(
        expr.get_value(&context()).unwrap(),
        Value::from("Nikola Tesla is old, #{not this}")
    );
}

#[test]
fn test_composite_against_other_root() {
    let expr = template("#{length()} chars in '#{toString()}'");
    let value = expr.evaluate_with_root(&context(), "hello").unwrap().into_value();
    assert_eq!(value, Value::from("5 chars in 'hello'"));
}

#[test]
fn test_composite_is_read_only() {
    let ctx = context();
    let expr = template("Hi #{name}");
    assert_eq!(
        expr.set_value(&ctx, "x").unwrap_err().kind(),
        MessageKind::SetValueNotSupported
    );
    assert_eq!(expr.get_value_type(&ctx).unwrap(), Some(TypeDescriptor::String));
    assert!(!expr.is_writable(&ctx).unwrap());
}

#[rstest]
#[case("#{name", MessageKind::TemplateMissingSuffix, 0)]
#[case("x #{ } y", MessageKind::TemplateEmptyExpression, 2)]
#[case("#{ (1] }", MessageKind::TemplateUnbalancedBracket, 5)]
#[case("#{ 'abc }", MessageKind::NonTerminatingQuotedString, 3)]
fn test_template_errors(#[case] text: &str, #[case] kind: MessageKind, #[case] position: usize) {
    let err = try_template(text).unwrap_err();
    assert_eq!(err.kind(), kind, "{text}");
    assert_eq!(err.position(), Some(position), "{text}");
    assert_eq!(err.expression(), Some(text));
}

#[test]
fn test_embedded_error_points_into_template() {
    let text = "Hello #{ name..x }";
    let err = try_template(text).unwrap_err();
    assert!(err.position().is_some_and(|p| p >= 9), "{err}");
    assert_eq!(err.expression(), Some(text));
}
