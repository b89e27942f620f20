//! Per-thread, lock-free event-duration accounting.
//!
//! A [`Throughput`] instance is meant to be owned by a single thread (a
//! `thread_local!` in the embedding application) and fed short labelled
//! durations as events complete. It keeps no lock: the owning thread is the
//! only writer, and [`description`](Throughput::description) only ever reads
//! from that same thread. Events are bucketed into fixed-length windows
//! advanced by a shared [`Ticker`], so `description()` reports "in the
//! current window" rather than "since the beginning of time".

extern crate alloc;

use crate::ticker::Ticker;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use alloc::{format, vec};
use core::fmt;

/// Accumulated count, total/min/max duration (in nanoseconds) for one label
/// within one time window.
#[derive(Debug, Clone, Copy, Default)]
struct EventStats {
    count: u64,
    total_nanos: u64,
    min_nanos: u64,
    max_nanos: u64,
}

impl EventStats {
    fn record(&mut self, nanos: u64) {
        if self.count == 0 {
            self.min_nanos = nanos;
            self.max_nanos = nanos;
        } else {
            self.min_nanos = self.min_nanos.min(nanos);
            self.max_nanos = self.max_nanos.max(nanos);
        }
        self.count += 1;
        self.total_nanos += nanos;
    }

    fn mean_nanos(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_nanos as f64 / self.count as f64
        }
    }
}

/// A retained run of per-window [`EventStats`] for a single label, holding
/// at most `capacity` of the most recent windows.
#[derive(Debug)]
struct Window {
    width_secs: u64,
    capacity: usize,
    window_start: u64,
    current: EventStats,
    history: Vec<EventStats>,
}

impl Window {
    fn new(width_secs: u64, capacity: usize, now: u64) -> Self {
        Window {
            width_secs: width_secs.max(1),
            capacity: capacity.max(1),
            window_start: now,
            current: EventStats::default(),
            history: Vec::new(),
        }
    }

    fn roll_to(&mut self, now: u64) {
        while now.saturating_sub(self.window_start) >= self.width_secs {
            self.history.push(core::mem::take(&mut self.current));
            if self.history.len() > self.capacity {
                self.history.remove(0);
            }
            self.window_start += self.width_secs;
        }
    }

    fn record(&mut self, now: u64, nanos: u64) {
        self.roll_to(now);
        self.current.record(nanos);
    }

    /// Totals across every retained window, including the current one.
    fn aggregate(&self, now: u64) -> EventStats {
        let mut rolled = Window {
            width_secs: self.width_secs,
            capacity: self.capacity,
            window_start: self.window_start,
            current: self.current,
            history: self.history.clone(),
        };
        rolled.roll_to(now);
        let mut total = EventStats::default();
        for stats in rolled.history.iter().chain(core::iter::once(&rolled.current)) {
            if stats.count == 0 {
                continue;
            }
            if total.count == 0 {
                total.min_nanos = stats.min_nanos;
                total.max_nanos = stats.max_nanos;
            } else {
                total.min_nanos = total.min_nanos.min(stats.min_nanos);
                total.max_nanos = total.max_nanos.max(stats.max_nanos);
            }
            total.count += stats.count;
            total.total_nanos += stats.total_nanos;
        }
        total
    }
}

/// Per-label event-duration accumulator, thread-local by construction.
///
/// Events are recorded with [`record`](Self::record); [`description`](Self::description)
/// renders a human-readable snapshot aggregated across the retained window
/// history.
pub struct Throughput<'a> {
    ticker: &'a Ticker,
    width_secs: u64,
    window_capacity: usize,
    labels: BTreeMap<String, Window>,
}

impl<'a> fmt::Debug for Throughput<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throughput")
            .field("labels", &self.labels.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> Throughput<'a> {
    /// Creates an accumulator driven by `ticker`, retaining `window_capacity`
    /// windows of `width_secs` seconds each per label (plus the window
    /// currently accumulating).
    #[must_use]
    pub fn new(ticker: &'a Ticker, width_secs: u64, window_capacity: usize) -> Self {
        Throughput {
            ticker,
            width_secs,
            window_capacity,
            labels: BTreeMap::new(),
        }
    }

    /// Records one occurrence of `label` taking `nanos` nanoseconds.
    pub fn record(&mut self, label: &str, nanos: u64) {
        let now = self.ticker.now();
        let width_secs = self.width_secs;
        let window_capacity = self.window_capacity;
        let window = self
            .labels
            .entry(String::from(label))
            .or_insert_with(|| Window::new(width_secs, window_capacity, now));
        window.record(now, nanos);
    }

    /// Count, mean, min, and max duration (nanoseconds) for `label` across
    /// the retained window history, or `None` if nothing has been recorded.
    pub fn snapshot(&self, label: &str) -> Option<(u64, f64, u64, u64)> {
        let now = self.ticker.now();
        let window = self.labels.get(label)?;
        let stats = window.aggregate(now);
        if stats.count == 0 {
            return None;
        }
        Some((stats.count, stats.mean_nanos(), stats.min_nanos, stats.max_nanos))
    }

    /// Human-readable snapshot of every labelled event, one line each.
    pub fn description(&self) -> String {
        let now = self.ticker.now();
        let mut lines = vec![String::from("throughput:")];
        for (label, window) in &self.labels {
            let stats = window.aggregate(now);
            lines.push(format!(
                "  {label}: count={} mean_ns={:.1} min_ns={} max_ns={}",
                stats.count,
                stats.mean_nanos(),
                stats.min_nanos,
                stats.max_nanos
            ));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_within_current_window() {
        let ticker = Ticker::new();
        let mut throughput = Throughput::new(&ticker, 60, 4);
        throughput.record("get", 100);
        throughput.record("get", 300);
        let (count, mean, min, max) = throughput.snapshot("get").unwrap();
        assert_eq!(count, 2);
        assert_eq!(mean, 200.0);
        assert_eq!(min, 100);
        assert_eq!(max, 300);
    }

    #[test]
    fn unrecorded_label_has_no_snapshot() {
        let ticker = Ticker::new();
        let throughput = Throughput::new(&ticker, 60, 4);
        assert!(throughput.snapshot("missing").is_none());
    }

    #[test]
    fn rolls_windows_forward_as_ticker_advances() {
        let ticker = Ticker::new();
        let mut throughput = Throughput::new(&ticker, 1, 2);
        throughput.record("put", 10);
        ticker.tick();
        ticker.tick();
        throughput.record("put", 20);
        let (count, _, min, max) = throughput.snapshot("put").unwrap();
        assert_eq!(count, 2);
        assert_eq!(min, 10);
        assert_eq!(max, 20);
    }

    #[test]
    fn old_windows_beyond_capacity_are_dropped() {
        let ticker = Ticker::new();
        let mut throughput = Throughput::new(&ticker, 1, 1);
        throughput.record("put", 10);
        for _ in 0..5 {
            ticker.tick();
        }
        throughput.record("put", 20);
        let (count, _, _, _) = throughput.snapshot("put").unwrap();
        // Only the current window plus one retained window of history survive.
        assert_eq!(count, 1);
    }

    #[test]
    fn description_renders_every_label() {
        let ticker = Ticker::new();
        let mut throughput = Throughput::new(&ticker, 60, 4);
        throughput.record("get", 100);
        throughput.record("put", 50);
        let text = throughput.description();
        assert!(text.contains("get:"));
        assert!(text.contains("put:"));
    }
}
