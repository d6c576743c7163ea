//! Benchmarks for the hot-path data-node operations: put, get, search.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use meshvec::{Config, DataNodeHandler, VectorRecord};
use tempfile::tempdir;

const DIM: usize = 32;

fn test_config() -> Config {
    Config {
        dimension: DIM,
        shard_count: 4,
        ..Default::default()
    }
}

fn seeded_handler(n: usize) -> (tempfile::TempDir, DataNodeHandler) {
    let dir = tempdir().unwrap();
    let handler = DataNodeHandler::open(dir.path(), test_config()).unwrap();
    for i in 0..n {
        let vector: Vec<f32> = (0..DIM).map(|d| ((i + d) % 97) as f32).collect();
        handler
            .put(VectorRecord::new(format!("k{i}"), vector))
            .unwrap();
    }
    (dir, handler)
}

/// Benchmark a single PUT against a warm index.
fn bench_put(c: &mut Criterion) {
    let (_dir, handler) = seeded_handler(5_000);
    let mut i = 5_000usize;

    c.bench_function("put_single_record", |b| {
        b.iter(|| {
            let vector: Vec<f32> = (0..DIM).map(|d| ((i + d) % 97) as f32).collect();
            handler
                .put(VectorRecord::new(format!("k{i}"), vector))
                .unwrap();
            i += 1;
        });
    });
}

/// Benchmark a point GET by key.
fn bench_get(c: &mut Criterion) {
    let (_dir, handler) = seeded_handler(5_000);

    c.bench_function("get_existing_key", |b| {
        b.iter(|| {
            black_box(handler.get("k2500").unwrap());
        });
    });
}

/// Benchmark an unfiltered nearest-neighbor search.
fn bench_search(c: &mut Criterion) {
    let (_dir, handler) = seeded_handler(5_000);
    let query: Vec<f32> = (0..DIM).map(|d| (d % 97) as f32).collect();

    c.bench_function("search_top_10", |b| {
        b.iter(|| {
            black_box(handler.search(&query, 10, None, None).unwrap());
        });
    });
}

/// Benchmark a DELETE followed by a REBUILD, the only GC path.
fn bench_delete_and_rebuild(c: &mut Criterion) {
    c.bench_function("delete_half_then_rebuild", |b| {
        b.iter_custom(|iters| {
            let mut total = std::time::Duration::ZERO;

            for _ in 0..iters {
                let (_dir, handler) = seeded_handler(2_000);
                for i in (0..2_000).step_by(2) {
                    handler.delete(&format!("k{i}")).unwrap();
                }

                let start = std::time::Instant::now();
                handler.rebuild().unwrap();
                total += start.elapsed();
            }

            total
        });
    });
}

criterion_group!(
    benches,
    bench_put,
    bench_get,
    bench_search,
    bench_delete_and_rebuild
);
criterion_main!(benches);
