//! Evaluator benchmarks
//!
//! Run with: cargo bench --bench evaluator
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use stepjs::ast::SourceType;
use stepjs::parser::Parser;
use stepjs::string_dict::StringDict;
use stepjs::{Interpreter, JsValue, Runtime, StepResult};

fn eval(source: &str) -> JsValue {
    let mut runtime = Runtime::new();
    runtime.eval_simple(source).unwrap_or_default()
}

fn generate_nested_closures(depth: usize) -> String {
    let mut code = String::new();
    for i in 0..depth {
        code.push_str(&format!("function f{}() {{ let x{} = {}; ", i, i, i));
    }
    code.push_str("return 0");
    for i in 0..depth {
        code.push_str(&format!(" + x{}", i));
    }
    code.push(';');
    for i in (0..depth).rev() {
        if i == 0 {
            code.push_str(" } f0();");
        } else {
            code.push_str(&format!(" }} return f{}(); ", i));
        }
    }
    code
}

fn bench_parse(c: &mut Criterion) {
    let program = generate_nested_closures(50);
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Bytes(program.len() as u64));
    group.bench_function("nested_closures_50", |b| {
        b.iter(|| {
            let mut dict = StringDict::new();
            let _ = Parser::new(black_box(&program), &mut dict).parse_program(SourceType::Script);
        });
    });
    group.finish();
}

fn bench_nested_closures(c: &mut Criterion) {
    let mut group = c.benchmark_group("closures");
    for depth in [1, 5, 20] {
        let code = generate_nested_closures(depth);
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::new("nested", depth), &code, |b, code| {
            b.iter(|| eval(black_box(code)));
        });
    }
    group.finish();
}

fn bench_fibonacci(c: &mut Criterion) {
    let code = "function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } fib(18)";
    c.bench_function("fibonacci_18", |b| b.iter(|| eval(black_box(code))));
}

fn bench_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("loops");
    for n in [100, 1_000, 10_000] {
        let code = format!("let sum = 0; for (let i = 0; i < {}; i++) {{ sum += i; }} sum", n);
        group.throughput(Throughput::Elements(n));
        group.bench_with_input(BenchmarkId::new("for_let", n), &code, |b, code| {
            b.iter(|| eval(black_box(code)));
        });
    }
    group.finish();
}

fn bench_array_callbacks(c: &mut Criterion) {
    let code = r#"
        const xs = Array.from({ length: 1000 }, (_, i) => i);
        xs.map(x => x * 2).filter(x => x % 3 === 0).reduce((a, b) => a + b, 0)
    "#;
    c.bench_function("array_map_filter_reduce_1000", |b| b.iter(|| eval(black_box(code))));
}

fn bench_generators(c: &mut Criterion) {
    let code = "function* range(n) { for (let i = 0; i < n; i++) yield i; } let s = 0; for (const x of range(1000)) s += x; s";
    c.bench_function("generator_1000", |b| b.iter(|| eval(black_box(code))));
}

fn bench_promise_chain(c: &mut Criterion) {
    let code = "let p = Promise.resolve(0); for (let i = 0; i < 500; i++) { p = p.then(v => v + 1); } p.then(v => { globalThis.result = v; });";
    c.bench_function("promise_chain_500", |b| b.iter(|| eval(black_box(code))));
}

fn bench_map_set(c: &mut Criterion) {
    let code = "const m = new Map(); for (let i = 0; i < 1000; i++) m.set('k' + i, i); let t = 0; for (const [k, v] of m) t += v; t";
    c.bench_function("map_1000", |b| b.iter(|| eval(black_box(code))));
}

/// Cost of the host driving the loop one step at a time
fn bench_manual_stepping(c: &mut Criterion) {
    let code = "let n = 0; while (n < 1000) n++; n";
    c.bench_function("manual_step_loop", |b| {
        b.iter(|| {
            let mut interp = Interpreter::new();
            let _ = interp.prepare(black_box(code));
            while let Ok(StepResult::Continue) = interp.step() {}
        });
    });
}

fn bench_runtime_creation(c: &mut Criterion) {
    c.bench_function("runtime_new", |b| b.iter(|| black_box(Runtime::new())));
}

criterion_group!(
    benches,
    bench_parse,
    bench_nested_closures,
    bench_fibonacci,
    bench_loops,
    bench_array_callbacks,
    bench_generators,
    bench_promise_chain,
    bench_map_set,
    bench_manual_stepping,
    bench_runtime_creation,
);

criterion_main!(benches);
