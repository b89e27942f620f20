//! End-to-end coverage of [`FifoRing`]'s lock-free
//! single-producer/single-consumer mode, which is available without the
//! `concurrent` feature.

use perfprims_rs::config::FifoConfig;
use perfprims_rs::FifoRing;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

fn cap(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

#[test]
fn spsc_preserves_fifo_order_under_a_real_producer_and_consumer() {
    let fifo: Arc<FifoRing<usize>> = Arc::new(FifoRing::new(FifoConfig::spsc(cap(8))).unwrap());

    let producer = {
        let fifo = Arc::clone(&fifo);
        thread::spawn(move || {
            for i in 0..200 {
                fifo.blocking_put(i).unwrap();
            }
        })
    };
    let consumer = {
        let fifo = Arc::clone(&fifo);
        thread::spawn(move || {
            let mut seen = Vec::with_capacity(200);
            while seen.len() < 200 {
                seen.push(fifo.blocking_get().unwrap());
            }
            seen
        })
    };

    producer.join().unwrap();
    let seen = consumer.join().unwrap();
    assert_eq!(seen, (0..200).collect::<Vec<_>>());
}

#[test]
fn spsc_blocking_put_times_out_when_nothing_drains_the_queue() {
    let mut config = FifoConfig::spsc(cap(1));
    config.timeout_ms = 20;
    config.granularity_ms = 5;
    let fifo: FifoRing<i32> = FifoRing::new(config).unwrap();
    fifo.try_put(1);
    assert!(fifo.blocking_put(2).is_err());
}

#[test]
fn put_all_is_rejected_in_single_producer_single_consumer_mode() {
    let fifo: FifoRing<i32> = FifoRing::new(FifoConfig::spsc(cap(4))).unwrap();
    assert!(fifo.put_all(vec![1, 2, 3]).is_err());
}
