//! Criterion benchmarks for symbol collection hot paths.
//!
//! Benchmarks:
//! 1. Query combination generation (the 38-glyph cartesian product)
//! 2. Table dedup under heavy duplicate pressure
//! 3. Frame export

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use symscout_core::{combinations, combinations_up_to, SymbolRow, SymbolTable};

fn make_rows(n: usize) -> Vec<SymbolRow> {
    (0..n)
        .map(|i| SymbolRow {
            // every fourth row collides on (symbol, exchange)
            symbol: format!("SYM{}", i / 4 * 4),
            name: Some(format!("Company {i}")),
            exchange: Some(if i % 2 == 0 { "NMS" } else { "PCX" }.to_string()),
            asset_type: Some("equity".to_string()),
            industry: None,
            query: format!("q{i}"),
            valid: None,
        })
        .collect()
}

fn bench_combinations(c: &mut Criterion) {
    let mut group = c.benchmark_group("combinations");
    for len in [1usize, 2, 3] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter(|| black_box(combinations(len)));
        });
    }
    group.bench_function("up_to_2", |b| {
        b.iter(|| black_box(combinations_up_to(2)));
    });
    group.finish();
}

fn bench_table_dedup(c: &mut Criterion) {
    let rows = make_rows(20_000);
    c.bench_function("table_extend_dedup_20k", |b| {
        b.iter(|| {
            let mut table = SymbolTable::new();
            table.extend(rows.iter().cloned());
            black_box(table.len())
        });
    });
}

fn bench_to_frame(c: &mut Criterion) {
    let mut table = SymbolTable::new();
    table.extend(make_rows(20_000));
    c.bench_function("table_to_frame_20k", |b| {
        b.iter(|| black_box(table.to_frame().unwrap()));
    });
}

criterion_group!(benches, bench_combinations, bench_table_dedup, bench_to_frame);
criterion_main!(benches);
