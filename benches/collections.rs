//! Benchmarks for the dedup helpers.
//!
//! `first_unique` switches from a pairwise scan to a hash-set scan above a
//! size threshold; these benchmarks size inputs on both sides of the
//! cutover so the threshold can be re-derived when the implementations
//! change.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use modpath::collections::{first_unique, last_unique};

/// A worst-case-ish input: half the elements are duplicates, spread evenly.
fn input_with_duplicates(size: usize) -> Vec<String> {
    (0..size)
        .map(|i| format!("src/module{}/file.c", i % (size / 2).max(1)))
        .collect()
}

fn bench_first_unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_unique");
    for size in [16usize, 64, 127, 128, 129, 256, 1024] {
        let input = input_with_duplicates(size);
        group.bench_function(format!("n={}", size), |b| {
            b.iter(|| first_unique(black_box(input.clone())))
        });
    }
    group.finish();
}

fn bench_first_unique_no_duplicates(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_unique_all_unique");
    for size in [64usize, 128, 1024] {
        let input: Vec<String> = (0..size).map(|i| format!("file{}.c", i)).collect();
        group.bench_function(format!("n={}", size), |b| {
            b.iter(|| first_unique(black_box(input.clone())))
        });
    }
    group.finish();
}

fn bench_last_unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("last_unique");
    for size in [64usize, 128, 1024] {
        let input = input_with_duplicates(size);
        group.bench_function(format!("n={}", size), |b| {
            b.iter(|| last_unique(black_box(input.clone())))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_first_unique,
    bench_first_unique_no_duplicates,
    bench_last_unique
);
criterion_main!(benches);
