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

//! Parse, interpreted and compiled evaluation throughput

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kestrel_expr::parser::tokenize;
use kestrel_expr::resolver::MapAccessor;
use kestrel_expr::{
    CompilerMode, ExpressionParser, ParserConfig, StandardEvaluationContext, Value,
};
use std::hint::black_box;

const EXPRESSIONS: &[(&str, &str)] = &[
    ("arithmetic", "age * 2 + 10 > 50 and age % 7 != 0"),
    ("string_concat", "name.toUpperCase() + ' is ' + age"),
    ("selection", "tags.?[length() > 3].size()"),
    ("projection", "{1, 2, 3, 4, 5}.![#this * #this]"),
    ("static_method", "T(Math).max(age, 10)"),
    ("ternary_elvis", "nickname ?: (age > 30 ? 'senior' : 'junior')"),
];

fn context() -> StandardEvaluationContext {
    let root = Value::map([
        (Value::from("name"), Value::from("Ada Lovelace")),
        (Value::from("age"), Value::Integer(36)),
        (Value::from("nickname"), Value::Null),
        (
            Value::from("tags"),
            Value::list(
                ["math", "poet", "engine", "notes"]
                    .into_iter()
                    .map(Value::from)
                    .collect(),
            ),
        ),
    ]);
    StandardEvaluationContext::new()
        .with_property_accessor(MapAccessor::new())
        .with_root(root)
}

fn bench_parse(c: &mut Criterion) {
    let parser = ExpressionParser::new();
    let mut group = c.benchmark_group("parse");
    for (name, text) in EXPRESSIONS {
        group.bench_with_input(BenchmarkId::new("tokenize", name), text, |b, text| {
            b.iter(|| black_box(tokenize(black_box(text))))
        });
        group.bench_with_input(BenchmarkId::new("parse", name), text, |b, text| {
            b.iter(|| black_box(parser.parse_expression(black_box(text))))
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let ctx = context();
    let interpreted = ExpressionParser::new();
    let compiled = ExpressionParser::with_config(
        ParserConfig::new().with_compiler_mode(CompilerMode::Immediate),
    );
    let mut group = c.benchmark_group("evaluate");
    for (name, text) in EXPRESSIONS {
        let Ok(expr) = interpreted.parse_expression(text) else {
            continue;
        };
        group.bench_function(BenchmarkId::new("interpreted", name), |b| {
            b.iter(|| black_box(expr.get_value(&ctx)))
        });

        let Ok(expr) = compiled.parse_expression(text) else {
            continue;
        };
        // warm up so the compiled routine and its caches are in place
        for _ in 0..3 {
            let _ = expr.get_value(&ctx);
        }
        group.bench_function(BenchmarkId::new("compiled", name), |b| {
            b.iter(|| black_box(expr.get_value(&ctx)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);
