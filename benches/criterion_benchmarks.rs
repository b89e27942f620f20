//! Single-thread throughput of the lock-free FIFO fast path and the
//! indexed skip list.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use perfprims_rs::config::FifoConfig;
use perfprims_rs::{FifoRing, IndexedSkipList};
use std::num::NonZeroUsize;

fn bench_fifo_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("FifoRing spsc");

    group.bench_function("try_put/try_get round trip", |b| {
        let fifo: FifoRing<usize> = FifoRing::new(FifoConfig::spsc(NonZeroUsize::new(1024).unwrap())).unwrap();
        b.iter(|| {
            for i in 0..256 {
                fifo.try_put(i);
            }
            for _ in 0..256 {
                black_box(fifo.try_get());
            }
        });
    });

    group.finish();
}

fn bench_skiplist(c: &mut Criterion) {
    let mut group = c.benchmark_group("IndexedSkipList");

    let mut list = IndexedSkipList::new();
    for i in 0..10_000 {
        list.insert(i, i).unwrap();
    }

    group.bench_function("get middle", |b| {
        b.iter(|| black_box(list.get(5_000)));
    });

    group.bench_function("insert then remove at front", |b| {
        b.iter(|| {
            list.insert(0, usize::MAX).unwrap();
            list.remove(0).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_fifo_spsc, bench_skiplist);
criterion_main!(benches);
