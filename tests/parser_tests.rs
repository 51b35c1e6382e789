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

//! Parsing through the public facade

mod common;

use kestrel_expr::parser::parse_ast;
use kestrel_expr::{ExpressionParser, MessageKind, NodeKind, ParserConfig};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn normalized(text: &str) -> String {
    common::parse(text)
        .as_standard()
        .map(|e| e.to_string_ast())
        .unwrap_or_default()
}

#[rstest]
#[case("1 + 2 * 3", "(1 + (2 * 3))")]
#[case("a lt b", "(a < b)")]
#[case("x div 2 mod 3", "((x / 2) % 3)")]
#[case("not flag", "!flag")]
#[case("!a and b or c", "((!a and b) or c)")]
#[case("name ?: 'anon'", "name ?: 'anon'")]
#[case("age > 18 ? 'adult' : 'minor'", "((age > 18) ? 'adult' : 'minor')")]
#[case("'it''s'", "'it''s'")]
#[case("10L + 2.5f", "(10L + 2.5f)")]
#[case("inventions.?[length() > 2].![toUpperCase()]", "inventions.?[(length() > 2)].![toUpperCase()]")]
#[case("address?.city", "address?.city")]
#[case("T(Math).max(1, 2)", "T(Math).max(1,2)")]
#[case("x between {1, 5}", "(x between {1,5})")]
fn test_normalized_ast(#[case] text: &str, #[case] expected: &str) {
    assert_eq!(normalized(text), expected);
}

#[rstest]
#[case("1 +", MessageKind::RightOperandProblem)]
#[case("(1", MessageKind::Ood)]
#[case("1 2", MessageKind::MoreInput)]
#[case("'open", MessageKind::NonTerminatingQuotedString)]
#[case("99999999999", MessageKind::NotAnInteger)]
#[case("3.0L", MessageKind::RealCannotBeLong)]
#[case("new Inventor", MessageKind::MissingConstructorArgs)]
#[case("list.?[]", MessageKind::MissingSelectionExpression)]
#[case("new int[]", MessageKind::MissingArrayDimension)]
#[case("new int[2][2]{{1}}", MessageKind::MultidimArrayInitializerNotSupported)]
fn test_parse_errors(#[case] text: &str, #[case] kind: MessageKind) {
    let err = ExpressionParser::new().parse_expression(text).unwrap_err();
    assert_eq!(err.kind(), kind, "{text}: {err}");
    assert_eq!(err.expression(), Some(text));
    assert!(err.position().is_some(), "{text} has no position");
}

#[test]
fn test_error_rendering_carries_code_and_position() {
    let err = ExpressionParser::new().parse_expression("1 < 2 < 3").unwrap_err();
    assert_eq!(
        err.to_string(),
        "EL1002:(pos 6): After parsing a valid expression, there is still more data in the expression: '<'"
    );
}

#[test]
fn test_length_limit_is_configurable() {
    let text = "1".repeat(20);
    let parser = ExpressionParser::with_config(ParserConfig::new().with_maximum_expression_length(10));
    let err = parser.parse_expression(&text).unwrap_err();
    assert_eq!(err.kind(), MessageKind::MaxExpressionLengthExceeded);
    assert!(ExpressionParser::new().parse_expression(&text).is_err_and(|e| e.kind() == MessageKind::NotAnInteger));
}

#[test]
fn test_parse_ast_exposes_tree() {
    let node = parse_ast("a.b[0]").unwrap();
    let NodeKind::Compound(parts) = &node.kind else {
        panic!("expected a compound node, got {node:?}");
    };
    assert_eq!(parts.len(), 3);
    assert!(matches!(parts[2].kind, NodeKind::Indexer { null_safe: false, .. }));
    assert_eq!((node.start(), node.end()), (0, 6));
}

#[test]
fn test_expression_keeps_source_text() {
    let expr = common::parse("  1 + 1 ");
    assert_eq!(expr.expression_string(), "  1 + 1 ");
}
