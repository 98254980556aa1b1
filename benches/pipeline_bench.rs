//! Benchmark for the compilation pipeline stages.

use criterion::{criterion_group, criterion_main, Criterion};
use icedcoffee::parser::parse;
use icedcoffee::{analyze, compile, generate, optimize, CompileOptions};
use std::hint::black_box;

const PROGRAM: &str = r#"
## Sum of squares with a helper function
func square(n: int) -> int {
  return n * n
}

array[int] xs = [1, 2, 3, 4, 5, 6, 7, 8]
int total = 0
for v in xs {
  total += square(v)
}

if total > 100 {
  print("big")
} else if total > 10 {
  print("medium")
} else {
  print("small")
}

int i = 0
while i < 10 && true {
  i += 1 * 1
}
print(total + 0)
"#;

fn nested_expression(depth: usize) -> String {
    let mut source = String::from("print(");
    for _ in 0..depth {
        source.push_str("(1 + ");
    }
    source.push('1');
    for _ in 0..depth {
        source.push(')');
    }
    source.push(')');
    source
}

fn benchmark_parse(c: &mut Criterion) {
    c.bench_function("parse program", |b| {
        b.iter(|| black_box(parse(black_box(PROGRAM)).unwrap()));
    });
}

fn benchmark_analyze(c: &mut Criterion) {
    c.bench_function("analyze program", |b| {
        b.iter(|| black_box(analyze(black_box(PROGRAM)).unwrap()));
    });
}

fn benchmark_optimize_and_generate(c: &mut Criterion) {
    let program = analyze(PROGRAM).unwrap();
    c.bench_function("optimize + generate", |b| {
        b.iter(|| {
            let optimized = optimize(program.clone());
            black_box(generate(&optimized))
        });
    });
}

fn benchmark_full_compile(c: &mut Criterion) {
    let options = CompileOptions::default();
    c.bench_function("compile program", |b| {
        b.iter(|| black_box(compile(black_box(PROGRAM), &options).unwrap()));
    });
}

fn benchmark_deep_nesting(c: &mut Criterion) {
    let source = nested_expression(500);
    let options = CompileOptions::default();
    c.bench_function("compile nested expression (depth 500)", |b| {
        b.iter(|| black_box(compile(black_box(&source), &options).unwrap()));
    });
}

criterion_group!(
    benches,
    benchmark_parse,
    benchmark_analyze,
    benchmark_optimize_and_generate,
    benchmark_full_compile,
    benchmark_deep_nesting
);
criterion_main!(benches);
