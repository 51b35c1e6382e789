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

//! Compiled evaluation: thresholds, guards, fallback and agreement with interpretation

mod common;

use common::{context, init_logging, parse, parse_with, registry, tesla, Inventor};
use kestrel_expr::compiler::CompilationError;
use kestrel_expr::core::FunctionRef;
use kestrel_expr::{
    CompilationState, CompilerMode, EvaluationContext, Expression, MessageKind, ParserConfig,
    SimpleEvaluationContext, TypeDescriptor, Value,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::atomic::Ordering;

fn immediate() -> ParserConfig {
    ParserConfig::new().with_compiler_mode(CompilerMode::Immediate)
}

fn state(expr: &Expression) -> CompilationState {
    expr.as_standard()
        .map(|e| e.compilation_state())
        .expect("standard expression")
}

#[rstest]
#[case("1 + 2 * 3")]
#[case("10 / 4 + 10 % 4")]
#[case("2.5 * 4")]
#[case("100000L * 3")]
#[case("'a' + 'b' + 1")]
#[case("name.toUpperCase()")]
#[case("name.length() + age")]
#[case("inventions.size() > 2 and age < 100")]
#[case("age > 80 ? 'old' : 'young'")]
#[case("inventions.?[length() > 2]")]
#[case("inventions.^[length() < 5]")]
#[case("inventions.$[true]")]
#[case("inventions.![length()]")]
#[case("#root.name")]
#[case("{1, 2, 3}.?[#this > 1]")]
#[case("{'a': 1, 'b': 2}['b']")]
#[case("{'a': 1, 'b': 2}.size()")]
#[case("T(Math).max(2, 7)")]
#[case("T(Integer).MAX_VALUE")]
#[case("address?.city")]
#[case("address ?: 'nowhere'")]
#[case("inventions[0]")]
#[case("-age")]
#[case("!(age > 1)")]
#[case("age between {80, 90}")]
#[case("name matches 'N.*'")]
#[case("name instanceof T(String)")]
#[case("greet('Ada')")]
#[case("score(2)")]
#[case("join('a', 'b', 'c')")]
#[case("KIND")]
#[case("'abc'[1]")]
fn test_compiled_results_match_interpreted(#[case] text: &str) {
    let ctx = context();
    let expected = parse(text).get_value(&ctx).unwrap();

    let expr = parse_with(immediate(), text);
    for round in 0..3 {
        assert_eq!(expr.get_value(&ctx).unwrap(), expected, "{text} round {round}");
    }
    assert_eq!(state(&expr), CompilationState::Compiled, "{text}");
}

#[test]
fn test_off_mode_never_compiles() {
    let expr = parse("age + 1");
    let ctx = context();
    for _ in 0..5 {
        assert_eq!(expr.get_value(&ctx).unwrap(), Value::Integer(87));
    }
    assert_eq!(state(&expr), CompilationState::Uncompiled);
}

#[test]
fn test_mixed_mode_waits_for_threshold() {
    let config = ParserConfig::new()
        .with_compiler_mode(CompilerMode::Mixed)
        .with_compile_threshold(3);
    let expr = parse_with(config, "name.length()");
    let ctx = context();
    expr.get_value(&ctx).unwrap();
    expr.get_value(&ctx).unwrap();
    assert_eq!(state(&expr), CompilationState::Uncompiled);
    expr.get_value(&ctx).unwrap();
    assert_eq!(state(&expr), CompilationState::Compiled);
}

#[test]
fn test_mixed_mode_restarts_count_when_result_type_changes() {
    let config = ParserConfig::new()
        .with_compiler_mode(CompilerMode::Mixed)
        .with_compile_threshold(2);
    let expr = parse_with(config, "#v");
    let ctx = context();
    ctx.set_variable("v", Value::Integer(1));
    expr.get_value(&ctx).unwrap();
    ctx.set_variable("v", Value::from("one"));
    expr.get_value(&ctx).unwrap();
    assert_eq!(state(&expr), CompilationState::Uncompiled);
    expr.get_value(&ctx).unwrap();
    assert_eq!(state(&expr), CompilationState::Compiled);
}

#[test]
fn test_guard_miss_falls_back_and_recompiles() {
    init_logging();
    let expr = parse_with(immediate(), "toString()");
    let ctx = context();
    assert_eq!(expr.evaluate_with_root(&ctx, 42).unwrap().into_value(), Value::from("42"));
    assert_eq!(expr.evaluate_with_root(&ctx, 42).unwrap().into_value(), Value::from("42"));
    assert_eq!(state(&expr), CompilationState::Compiled);

    // a different target class still gives the right answer
    assert_eq!(
        expr.evaluate_with_root(&ctx, "abc").unwrap().into_value(),
        Value::from("abc")
    );
    assert_eq!(state(&expr), CompilationState::Uncompiled);

    expr.evaluate_with_root(&ctx, "abc").unwrap();
    assert_eq!(state(&expr), CompilationState::Compiled);
}

#[test]
fn test_repeated_guard_misses_abandon_compilation() {
    let config = immediate().with_failed_compilation_threshold(2);
    let expr = parse_with(config, "toString()");
    let ctx = context();
    let roots = [
        Value::Integer(1),
        Value::Integer(2),
        Value::from("a"),
        Value::from("b"),
        Value::from("c"),
        Value::Integer(3),
    ];
    for root in roots {
        let expected = Value::from(root.to_display_string());
        assert_eq!(expr.evaluate_with_root(&ctx, root).unwrap().into_value(), expected);
    }
    assert_eq!(state(&expr), CompilationState::Interpreted);

    assert_eq!(
        expr.evaluate_with_root(&ctx, 7).unwrap().into_value(),
        Value::from("7")
    );
    assert_eq!(state(&expr), CompilationState::Interpreted);
}

fn calls(root: &Value) -> usize {
    let Value::Object(object) = root else { unreachable!() };
    object.downcast_ref::<Inventor>().unwrap().calls.load(Ordering::SeqCst)
}

#[test]
fn test_compiled_error_keeps_compiled_form() {
    let expr = parse_with(immediate(), "10 / #d");
    let ctx = context();
    ctx.set_variable("d", Value::Integer(2));
    expr.get_value(&ctx).unwrap();
    assert_eq!(expr.get_value(&ctx).unwrap(), Value::Integer(5));
    assert_eq!(state(&expr), CompilationState::Compiled);

    ctx.set_variable("d", Value::Integer(0));
    let err = expr.get_value(&ctx).unwrap_err();
    assert_eq!(err.kind(), MessageKind::DivisionByZero);
    assert_eq!(state(&expr), CompilationState::Compiled);

    ctx.set_variable("d", Value::Integer(5));
    assert_eq!(expr.get_value(&ctx).unwrap(), Value::Integer(2));
}

#[test]
fn test_failing_compiled_run_has_side_effects_once() {
    let text = "describe().length() / #d";
    let root = tesla();
    let ctx = context().with_root(root.clone()).with_variable("d", 1);

    let interpreted = parse(text);
    ctx.set_variable("d", Value::Integer(0));
    let before = calls(&root);
    let expected = interpreted.get_value(&ctx).unwrap_err();
    assert_eq!(calls(&root) - before, 1);

    let compiled = parse_with(immediate(), text);
    ctx.set_variable("d", Value::Integer(1));
    compiled.get_value(&ctx).unwrap();
    compiled.get_value(&ctx).unwrap();
    assert_eq!(state(&compiled), CompilationState::Compiled);

    ctx.set_variable("d", Value::Integer(0));
    let before = calls(&root);
    let err = compiled.get_value(&ctx).unwrap_err();
    assert_eq!(calls(&root) - before, 1);
    assert_eq!(err.kind(), expected.kind());
    assert_eq!(err.position(), expected.position());
    assert_eq!(state(&compiled), CompilationState::Compiled);
}

fn read_only_binding() -> SimpleEvaluationContext {
    SimpleEvaluationContext::for_read_only_data_binding()
        .with_registry(registry())
        .with_root(tesla())
}

#[rstest]
#[case("class")]
#[case("getClass().name")]
#[case("describe()")]
#[case("name.length()")]
fn test_compiled_form_honors_binding_restrictions(#[case] text: &str) {
    let binding = read_only_binding();
    let expected = parse(text).get_value(&binding).unwrap_err();

    let expr = parse_with(immediate(), text);
    let ctx = context();
    let trusted = parse(text).get_value(&ctx).unwrap();
    for _ in 0..3 {
        assert_eq!(expr.get_value(&ctx).unwrap(), trusted, "{text}");
    }
    assert_eq!(state(&expr), CompilationState::Compiled, "{text}");

    let err = expr.get_value(&binding).unwrap_err();
    assert_eq!(err.kind(), expected.kind(), "{text}");
    assert_eq!(expr.get_value(&ctx).unwrap(), trusted, "{text}");
}

#[test]
fn test_context_switch_misses_guard_and_recompiles() {
    let expr = parse_with(immediate(), "describe()");
    let ctx = context();
    expr.get_value(&ctx).unwrap();
    expr.get_value(&ctx).unwrap();
    assert_eq!(state(&expr), CompilationState::Compiled);

    let binding = read_only_binding().with_instance_methods();
    assert_eq!(expr.get_value(&binding).unwrap(), Value::from("Nikola Tesla (86)"));
    assert_eq!(state(&expr), CompilationState::Uncompiled);

    expr.get_value(&binding).unwrap();
    expr.get_value(&binding).unwrap();
    assert_eq!(state(&expr), CompilationState::Compiled);
    assert_eq!(
        expr.get_value(&read_only_binding()).unwrap_err().kind(),
        MessageKind::MethodNotFound
    );
}

#[test]
fn test_compiled_function_arguments_use_root_scope() {
    let ctx = context();
    ctx.register_function(
        "reverse",
        FunctionRef::new("reverse", vec![TypeDescriptor::String], |args| {
            let text = args.first().map(Value::to_display_string).unwrap_or_default();
            Ok(Value::from(text.chars().rev().collect::<String>()))
        }),
    );
    let text = "inventions.#reverse(name)";
    let expected = parse(text).get_value(&ctx).unwrap();
    assert_eq!(expected, Value::from("alseT alokiN"));
    let expr = parse_with(immediate(), text);
    for _ in 0..3 {
        assert_eq!(expr.get_value(&ctx).unwrap(), expected);
    }
    assert_eq!(state(&expr), CompilationState::Compiled);
}

#[test]
fn test_compiled_method_runs_once_per_evaluation() {
    let root = tesla();
    let ctx = context().with_root(root.clone());
    let expr = parse_with(immediate(), "describe()");
    for _ in 0..4 {
        assert_eq!(expr.get_value(&ctx).unwrap(), Value::from("Nikola Tesla (86)"));
    }
    assert_eq!(state(&expr), CompilationState::Compiled);
    assert_eq!(calls(&root), 4);
}

#[rstest]
#[case("age = 5")]
#[case("age++")]
#[case("new Inventor('Edison')")]
#[case("new int[]{1, 2}")]
fn test_ineligible_expressions_stay_interpreted(#[case] text: &str) {
    let expr = parse_with(immediate(), text);
    let ctx = context();
    expr.get_value(&ctx).unwrap();
    assert_eq!(state(&expr), CompilationState::Interpreted, "{text}");
    let err = expr.as_standard().unwrap().compile_expression().unwrap_err();
    assert!(matches!(err, CompilationError::Unsupported(_)), "{text}: {err:?}");
}

#[test]
fn test_forced_compile_and_revert() {
    let expr = parse("inventions.size() * 2");
    let standard = expr.as_standard().unwrap();
    standard.compile_expression().unwrap();
    assert_eq!(state(&expr), CompilationState::Compiled);
    assert_eq!(expr.get_value(&context()).unwrap(), Value::Integer(6));

    standard.revert_to_interpreted();
    assert_eq!(state(&expr), CompilationState::Uncompiled);
    assert_eq!(expr.get_value(&context()).unwrap(), Value::Integer(6));
}

#[test]
fn test_compiled_expression_shared_across_threads() {
    let expr = parse_with(immediate(), "name.length() * 2 + #offset");
    let ctx = context().with_variable("offset", 1);
    expr.get_value(&ctx).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    assert_eq!(expr.get_value(&ctx).unwrap(), Value::Integer(25));
                }
            });
        }
    });
    assert_eq!(state(&expr), CompilationState::Compiled);
}
