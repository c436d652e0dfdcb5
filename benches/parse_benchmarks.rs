//! Criterion benchmarks for the parse + expand pipeline.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use optmodel::{Config, ModelSession};

fn generated_model(rows: usize) -> String {
    let mut model = String::new();
    model.push_str(&format!("range I = 1..{rows};\n"));
    model.push_str("dvar float+ x[I];\n");
    model.push_str("float cap[I] = ...;\n");
    model.push_str("forall(i in I) lim[i]: x[i] <= cap[i];\n");
    model.push_str("total: sum(i in I) x[i] <= 1000;\n");
    model.push_str("maximize sum(i in I) x[i];\n");
    model
}

fn generated_data(rows: usize) -> String {
    let values: Vec<String> = (1..=rows).map(|i| (i * 3).to_string()).collect();
    format!("cap = [{}];\n", values.join(", "))
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for rows in [10usize, 100, 500] {
        let model = generated_model(rows);
        let data = generated_data(rows);
        group.bench_function(format!("rows_{rows}"), |b| {
            b.iter(|| {
                let mut session = ModelSession::new(Config::default());
                session.compile(black_box(&model), Some(black_box(&data)));
                assert!(!session.has_errors());
                black_box(session.repository.equations().len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile);
criterion_main!(benches);
