use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hsl_script::lang::tokenize;
use hsl_script::{CaptureSink, ErrorReporter, Script};
use std::sync::Arc;

const FIB: &str = r#"
fun fib(n) {
    if (n < 2) return n;
    return fib(n - 1) + fib(n - 2);
}
print fib(15);
"#;

const LOOPS: &str = r#"
class Acc {
    Acc() { this.total = 0; }
    add(n) { this.total = this.total + n; }
}
var acc = Acc();
var xs = [];
for (var i = 0; i < 500; i++) {
    acc.add(i % 7);
    push(xs, i);
}
print acc.total + len(xs);
"#;

fn bench_lexer(c: &mut Criterion) {
    let source = LOOPS.repeat(20);
    c.bench_function("lex", |b| {
        b.iter(|| {
            let mut reporter = ErrorReporter::new();
            tokenize(black_box(&source), &mut reporter)
        })
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let sink = Arc::new(CaptureSink::new());

    c.bench_function("evaluate fib", |b| {
        let mut script = Script::new(FIB).with_output(sink.clone());
        b.iter(|| {
            sink.take();
            script.evaluate()
        })
    });

    c.bench_function("evaluate loops", |b| {
        let mut script = Script::new(LOOPS).with_output(sink.clone());
        b.iter(|| {
            sink.take();
            script.evaluate()
        })
    });
}

criterion_group!(benches, bench_lexer, bench_evaluate);
criterion_main!(benches);
