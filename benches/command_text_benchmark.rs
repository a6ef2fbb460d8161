use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use db2_middleware::batch::split_batch;
use db2_middleware::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hint::black_box;

fn bench_statements() -> usize {
    std::env::var("BENCH_STATEMENTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(50)
}

// Deterministic batch of updates mixing named markers, literals and comments.
fn generate_batch(statements: usize) -> (String, Vec<Parameter>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut sql = String::with_capacity(statements * 120);
    let mut params = Vec::with_capacity(statements * 2);
    for i in 0..statements {
        let note = format!("note-{}", rng.random_range(1..1000));
        sql.push_str(&format!(
            "UPDATE ORDERS SET NOTE = :NOTE{i}, TAG = 'x:{i}' WHERE ID = @ID{i} -- :IGNORED\n;"
        ));
        params.push(Parameter::new(format!(":NOTE{i}"), note));
        params.push(Parameter::new(format!("@ID{i}"), rng.random_range(1..100_000_i64)));
    }
    (sql, params)
}

fn benchmark_rewrite(c: &mut Criterion) {
    let statements = bench_statements();
    let (sql, params) = generate_batch(statements);

    let mut group = c.benchmark_group("command_text");
    group.bench_with_input(BenchmarkId::new("rewrite_parameters", statements), &sql, |b, sql| {
        b.iter(|| rewrite_parameters(black_box(sql), true).len());
    });
    group.bench_with_input(BenchmarkId::new("split_batch", statements), &sql, |b, sql| {
        b.iter(|| split_batch(black_box(sql), &params).map(|segments| segments.len()));
    });
    group.finish();
}

criterion_group!(benches, benchmark_rewrite);
criterion_main!(benches);
