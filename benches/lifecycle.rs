//! Benchmarks for data-node lifecycle operations.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion};
use meshvec::{Config, DataNodeHandler};
use tempfile::tempdir;

fn test_config() -> Config {
    Config {
        dimension: 32,
        shard_count: 4,
        ..Default::default()
    }
}

/// Benchmark opening a fresh node directory.
fn bench_open_new(c: &mut Criterion) {
    c.bench_function("open_new_node", |b| {
        b.iter_custom(|iters| {
            let mut total = std::time::Duration::ZERO;

            for _ in 0..iters {
                let dir = tempdir().unwrap();

                let start = std::time::Instant::now();
                let handler = DataNodeHandler::open(dir.path(), test_config()).unwrap();
                total += start.elapsed();

                handler.shutdown().unwrap();
            }

            total
        });
    });
}

/// Benchmark reopening a node directory that already holds a checkpoint.
fn bench_reopen_existing(c: &mut Criterion) {
    let dir = tempdir().unwrap();

    let handler = DataNodeHandler::open(dir.path(), test_config()).unwrap();
    for i in 0..200 {
        handler
            .put(meshvec::VectorRecord::new(
                format!("k{i}"),
                vec![i as f32; 32],
            ))
            .unwrap();
    }
    handler.snapshot().unwrap();
    handler.shutdown().unwrap();

    c.bench_function("reopen_existing_node", |b| {
        b.iter(|| {
            let handler = DataNodeHandler::open(dir.path(), test_config()).unwrap();
            handler.shutdown().unwrap();
        });
    });
}

/// Benchmark a clean shutdown (final checkpoint + lock release).
fn bench_shutdown(c: &mut Criterion) {
    c.bench_function("shutdown_node", |b| {
        b.iter_custom(|iters| {
            let mut total = std::time::Duration::ZERO;

            for _ in 0..iters {
                let dir = tempdir().unwrap();
                let handler = DataNodeHandler::open(dir.path(), test_config()).unwrap();

                let start = std::time::Instant::now();
                handler.shutdown().unwrap();
                total += start.elapsed();
            }

            total
        });
    });
}

criterion_group!(benches, bench_open_new, bench_reopen_existing, bench_shutdown);
criterion_main!(benches);
