//! End-to-end coverage of [`WorkerPool`], including synchronous execution,
//! suspend/resume, panic containment, and graceful shrink.

use perfprims_rs::config::WorkerPoolConfig;
use perfprims_rs::WorkerPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn config(max_threads: usize, max_operations: usize) -> WorkerPoolConfig {
    WorkerPoolConfig {
        max_threads,
        max_operations,
        shutdown_deadline_ms: 1000,
    }
}

#[test]
fn scheduled_jobs_all_run_and_can_be_drained() {
    let pool = WorkerPool::new(config(4, 64));
    let completed = Arc::new(AtomicUsize::new(0));
    for _ in 0..200 {
        let completed = Arc::clone(&completed);
        pool.schedule(move || {
            completed.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert!(pool.drain(Instant::now() + Duration::from_secs(5)));
    assert_eq!(completed.load(Ordering::SeqCst), 200);
}

#[test]
fn zero_bound_pool_runs_everything_synchronously_in_the_caller() {
    let pool = WorkerPool::new(config(0, 0));
    let caller = thread::current().id();
    let observed = Arc::new(std::sync::Mutex::new(None));
    let observed2 = Arc::clone(&observed);
    pool.schedule(move || {
        *observed2.lock().unwrap() = Some(thread::current().id());
    });
    assert_eq!(*observed.lock().unwrap(), Some(caller));
}

#[test]
fn a_panicking_job_does_not_take_down_the_pool() {
    let pool = WorkerPool::new(config(2, 16));
    pool.schedule(|| panic!("deliberate test panic"));
    let completed = Arc::new(AtomicUsize::new(0));
    for _ in 0..5 {
        let completed = Arc::clone(&completed);
        pool.schedule(move || {
            completed.fetch_add(1, Ordering::SeqCst);
        });
    }
    assert!(pool.drain(Instant::now() + Duration::from_secs(5)));
    assert_eq!(completed.load(Ordering::SeqCst), 5);
}

#[test]
fn suspend_holds_queued_work_until_resume() {
    let pool = WorkerPool::new(config(1, 16));
    pool.suspend();
    let completed = Arc::new(AtomicUsize::new(0));
    for _ in 0..3 {
        let completed = Arc::clone(&completed);
        pool.schedule(move || {
            completed.fetch_add(1, Ordering::SeqCst);
        });
    }
    thread::sleep(Duration::from_millis(50));
    assert_eq!(completed.load(Ordering::SeqCst), 0);
    pool.resume();
    assert!(pool.drain(Instant::now() + Duration::from_secs(5)));
    assert_eq!(completed.load(Ordering::SeqCst), 3);
}

#[test]
fn shrinking_max_threads_reduces_the_live_worker_count() {
    let pool = WorkerPool::new(config(4, 64));
    for _ in 0..4 {
        pool.schedule(|| thread::sleep(Duration::from_millis(30)));
    }
    thread::sleep(Duration::from_millis(10));
    pool.set_max_threads(1);
    assert_eq!(pool.max_threads(), 1);
}
