//! Usage statistics accumulated by a [`FifoRing`](crate::fifo::FifoRing).

extern crate alloc;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
struct SideStats {
    tries: AtomicU64,
    successes: AtomicU64,
    waits: AtomicU64,
    wait_nanos_total: AtomicU64,
}

impl SideStats {
    fn record_try(&self, ok: bool) {
        self.tries.fetch_add(1, Ordering::Relaxed);
        if ok {
            self.successes.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_wait(&self, nanos: u64) {
        self.waits.fetch_add(1, Ordering::Relaxed);
        self.wait_nanos_total.fetch_add(nanos, Ordering::Relaxed);
    }
}

/// Per-side try/success counts, wait counts and total wait time, and a
/// histogram of wait durations bucketed by caller-supplied boundaries (in
/// ascending seconds). A wait of duration `d` falls into the lowest band
/// whose boundary exceeds `d`, or the final catch-all band.
#[derive(Debug)]
pub struct FifoStats {
    put: SideStats,
    get: SideStats,
    boundaries_secs: Vec<f64>,
    histogram: Vec<AtomicU64>,
}

impl FifoStats {
    pub(crate) fn new(boundaries_secs: &[f64]) -> Self {
        FifoStats {
            put: SideStats::default(),
            get: SideStats::default(),
            boundaries_secs: boundaries_secs.to_vec(),
            histogram: (0..=boundaries_secs.len()).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub(crate) fn record_put_try(&self, ok: bool) {
        self.put.record_try(ok);
    }

    pub(crate) fn record_get_try(&self, ok: bool) {
        self.get.record_try(ok);
    }

    pub(crate) fn record_put_wait(&self, nanos: u64) {
        self.put.record_wait(nanos);
        self.bucket(nanos);
    }

    pub(crate) fn record_get_wait(&self, nanos: u64) {
        self.get.record_wait(nanos);
        self.bucket(nanos);
    }

    fn bucket(&self, nanos: u64) {
        let secs = nanos as f64 / 1_000_000_000.0;
        let idx = self
            .boundaries_secs
            .iter()
            .position(|&boundary| secs < boundary)
            .unwrap_or(self.boundaries_secs.len());
        self.histogram[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Total produce attempts and successes.
    pub fn put_tries(&self) -> (u64, u64) {
        (
            self.put.tries.load(Ordering::Relaxed),
            self.put.successes.load(Ordering::Relaxed),
        )
    }

    /// Total consume attempts and successes.
    pub fn get_tries(&self) -> (u64, u64) {
        (
            self.get.tries.load(Ordering::Relaxed),
            self.get.successes.load(Ordering::Relaxed),
        )
    }

    /// Wait-duration histogram counts, aligned with the boundaries the
    /// FIFO was configured with.
    pub fn histogram(&self) -> Vec<u64> {
        self.histogram.iter().map(|bucket| bucket.load(Ordering::Relaxed)).collect()
    }

    /// Human-readable snapshot of the put (producer) side.
    pub fn stats_put(&self) -> String {
        Self::render("put", &self.put)
    }

    /// Human-readable snapshot of the get (consumer) side.
    pub fn stats_get(&self) -> String {
        Self::render("get", &self.get)
    }

    fn render(label: &str, side: &SideStats) -> String {
        let tries = side.tries.load(Ordering::Relaxed);
        let successes = side.successes.load(Ordering::Relaxed);
        let waits = side.waits.load(Ordering::Relaxed);
        let wait_total = side.wait_nanos_total.load(Ordering::Relaxed);
        let avg_wait_ms = if waits == 0 {
            0.0
        } else {
            (wait_total as f64 / waits as f64) / 1_000_000.0
        };
        format!("{label}: tries={tries} successes={successes} waits={waits} avg_wait_ms={avg_wait_ms:.3}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_try_counts() {
        let stats = FifoStats::new(&[]);
        stats.record_put_try(true);
        stats.record_put_try(false);
        assert_eq!(stats.put_tries(), (2, 1));
    }

    #[test]
    fn buckets_waits_by_ascending_boundary() {
        let stats = FifoStats::new(&[0.01, 0.1]);
        stats.record_get_wait(5_000_000); // 5ms -> first bucket
        stats.record_get_wait(50_000_000); // 50ms -> second bucket
        stats.record_get_wait(500_000_000); // 500ms -> overflow bucket
        assert_eq!(stats.histogram(), alloc::vec![1, 1, 1]);
    }

    #[test]
    fn renders_human_readable_summary() {
        let stats = FifoStats::new(&[]);
        stats.record_put_try(true);
        let text = stats.stats_put();
        assert!(text.contains("tries=1"));
        assert!(text.contains("successes=1"));
    }
}
