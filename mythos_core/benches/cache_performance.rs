//! Cache Performance Benchmarks
//!
//! Measures the hot read path (memory hits) and the write-through path
//! across the three in-process tiers.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mythos_core::{CacheManager, Filters, GetOptions, QueryOptions, SetOptions};
use mythos_test_utils::{MockDocumentStore, seed_pantheon};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn cache() -> CacheManager {
    let store = MockDocumentStore::new();
    seed_pantheon(&store);
    CacheManager::in_memory(Arc::new(store))
}

/// Benchmark reads served from the memory tier
fn bench_memory_hits(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cache = cache();
    runtime.block_on(async {
        cache.get("deities", "zeus", GetOptions::new()).await.unwrap();
        cache
            .get_list("deities", &Filters::new(), QueryOptions::new())
            .await
            .unwrap();
    });

    let mut group = c.benchmark_group("memory_hits");
    group.bench_function("get", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(cache.get("deities", "zeus", GetOptions::new()).await.unwrap());
            })
        });
    });
    group.bench_function("get_list", |b| {
        b.iter(|| {
            runtime.block_on(async {
                black_box(
                    cache
                        .get_list("deities", &Filters::new(), QueryOptions::new())
                        .await
                        .unwrap(),
                );
            })
        });
    });
    group.finish();
}

/// Benchmark write-through for payloads of different sizes
fn bench_write_through(c: &mut Criterion) {
    let runtime = Runtime::new().unwrap();
    let cache = cache();
    let mut group = c.benchmark_group("write_through");

    for &size in &[64usize, 1024, 16 * 1024] {
        let payload = json!({ "body": "x".repeat(size) });
        group.bench_with_input(BenchmarkId::new("set", size), &payload, |b, payload| {
            b.iter(|| {
                runtime.block_on(async {
                    cache
                        .set("texts", "iliad", payload.clone(), SetOptions::default())
                        .await
                        .unwrap();
                })
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_memory_hits, bench_write_through);
criterion_main!(benches);
