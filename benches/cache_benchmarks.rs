//! Single-thread throughput of [`BoundedCache`] get/put.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use perfprims_rs::cache::BoundedCache;
use perfprims_rs::config::BoundedCacheConfig;
use perfprims_rs::Ticker;
use std::sync::Arc;

const CACHE_SIZE: usize = 1_000;

fn make_cache() -> BoundedCache<usize, usize> {
    let config = BoundedCacheConfig {
        max_objects: CACHE_SIZE,
        ..Default::default()
    };
    BoundedCache::new(config, Arc::new(Ticker::new()))
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("BoundedCache");

    {
        let mut cache = make_cache();
        for i in 0..CACHE_SIZE {
            cache.put(i, i);
        }
        group.bench_function("get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(cache.get(&(i % CACHE_SIZE)));
                }
            });
        });
        group.bench_function("get miss", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(cache.get(&(i + CACHE_SIZE)));
                }
            });
        });
    }

    {
        let mut cache = make_cache();
        group.bench_function("put new entry, steady state eviction", |b| {
            let mut next = 0usize;
            b.iter(|| {
                cache.put(next, next);
                next += 1;
            });
        });
    }

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
