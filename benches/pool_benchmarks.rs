//! Pool allocator benchmarks.
//!
//! Compares small-path, large-path, and reset-cycle costs against the
//! system allocator baseline.

use std::alloc::Layout;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use regionpool::Pool;

fn bench_small_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_allocation");

    group.bench_function("pool_64b", |b| {
        let mut pool = Pool::new(64 * 1024).unwrap();
        b.iter(|| {
            let ptr = pool.palloc(64).unwrap();
            black_box(ptr);
        });
    });

    group.bench_function("system_64b", |b| {
        let layout = Layout::from_size_align(64, 8).unwrap();
        b.iter(|| unsafe {
            let ptr = std::alloc::alloc(layout);
            black_box(ptr);
            std::alloc::dealloc(ptr, layout);
        });
    });

    group.finish();
}

fn bench_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_workload");
    group.throughput(Throughput::Elements(1));

    for size in [16usize, 64, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("palloc", size), &size, |b, &size| {
            let mut pool = Pool::new(16 * 1024).unwrap();
            b.iter(|| black_box(pool.palloc(size).unwrap()));
        });
    }

    group.finish();
}

fn bench_large_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_path");

    group.bench_function("palloc_and_pfree", |b| {
        let mut pool = Pool::new(4096).unwrap();
        b.iter(|| {
            let ptr = pool.palloc(1 << 20).unwrap();
            pool.pfree(ptr).unwrap();
            black_box(ptr);
        });
    });

    group.finish();
}

fn bench_reset_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("reset_cycle");

    group.bench_function("alloc_then_reset", |b| {
        let mut pool = Pool::new(64 * 1024).unwrap();
        b.iter(|| {
            for _ in 0..64 {
                black_box(pool.palloc(128).unwrap());
            }
            pool.reset();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_small_allocation,
    bench_mixed_workload,
    bench_large_path,
    bench_reset_cycle
);
criterion_main!(benches);
