//! Multi-thread throughput of [`SharedBoundedCache`] and the
//! multi-producer/multi-consumer [`FifoRing`] mode. Requires the
//! `concurrent` feature.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use perfprims_rs::cache::SharedBoundedCache;
use perfprims_rs::config::{BoundedCacheConfig, FifoConfig};
use perfprims_rs::{FifoRing, Ticker};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

const CACHE_SIZE: usize = 10_000;
const OPS_PER_THREAD: usize = 1_000;

fn bench_shared_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("SharedBoundedCache contention");

    for &threads in &[1usize, 2, 4, 8] {
        group.bench_with_input(BenchmarkId::new("put+get", threads), &threads, |b, &threads| {
            b.iter(|| {
                let config = BoundedCacheConfig {
                    max_objects: CACHE_SIZE,
                    ..Default::default()
                };
                let cache: Arc<SharedBoundedCache<usize, usize>> =
                    Arc::new(SharedBoundedCache::new(config, Arc::new(Ticker::new())));
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let cache = Arc::clone(&cache);
                        thread::spawn(move || {
                            for i in 0..OPS_PER_THREAD {
                                let key = t * OPS_PER_THREAD + i;
                                cache.put(key, key);
                                black_box(cache.get(&key));
                            }
                        })
                    })
                    .collect();
                for h in handles {
                    h.join().unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_mpmc_fifo(c: &mut Criterion) {
    let mut group = c.benchmark_group("FifoRing mpmc");

    group.bench_function("4 producers, 4 consumers", |b| {
        b.iter(|| {
            let mut config = FifoConfig::spsc(NonZeroUsize::new(256).unwrap());
            config.multi_producer = true;
            config.multi_consumer = true;
            let fifo: Arc<FifoRing<usize>> = Arc::new(FifoRing::new(config).unwrap());

            let producers: Vec<_> = (0..4)
                .map(|p| {
                    let fifo = Arc::clone(&fifo);
                    thread::spawn(move || {
                        for i in 0..OPS_PER_THREAD {
                            fifo.blocking_put(p * OPS_PER_THREAD + i).unwrap();
                        }
                    })
                })
                .collect();
            let consumers: Vec<_> = (0..4)
                .map(|_| {
                    let fifo = Arc::clone(&fifo);
                    thread::spawn(move || {
                        for _ in 0..OPS_PER_THREAD {
                            black_box(fifo.blocking_get().unwrap());
                        }
                    })
                })
                .collect();
            for p in producers {
                p.join().unwrap();
            }
            for c in consumers {
                c.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_shared_cache, bench_mpmc_fifo);
criterion_main!(benches);
