//! Cache Monitor Module
//!
//! Tracks cache performance metrics including hits, misses, evictions and
//! lookup latency. The monitor is a passive sink: the manager writes to it
//! and never reads it back for control flow.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Number of recent latency observations kept for the rolling average
pub const LATENCY_WINDOW: usize = 1000;

// == Metrics Snapshot ==
/// Point-in-time copy of the monitor's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    /// Lookups that returned a stored value
    pub hits: u64,
    /// Lookups that fell through to the producer
    pub misses: u64,
    /// Entries removed by the sweeper
    pub evictions: u64,
    /// Mean latency over the rolling window
    pub avg_latency: Duration,
    /// Time of the last recorded observation or reset
    pub last_update: DateTime<Utc>,
}

impl MetricsSnapshot {
    fn empty() -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            avg_latency: Duration::ZERO,
            last_update: Utc::now(),
        }
    }

    // == Hit Ratio ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct MonitorState {
    metrics: MetricsSnapshot,
    window: VecDeque<Duration>,
    window_total: Duration,
}

impl MonitorState {
    fn new() -> Self {
        Self {
            metrics: MetricsSnapshot::empty(),
            window: VecDeque::with_capacity(LATENCY_WINDOW),
            window_total: Duration::ZERO,
        }
    }

    fn track(&mut self, latency: Duration) {
        self.window.push_back(latency);
        self.window_total += latency;
        if self.window.len() > LATENCY_WINDOW {
            if let Some(oldest) = self.window.pop_front() {
                self.window_total -= oldest;
            }
        }

        self.metrics.avg_latency = self.window_total / self.window.len() as u32;
        self.metrics.last_update = Utc::now();
    }
}

// == Monitor ==
/// Thread-safe hit/miss recorder with a rolling latency window.
#[derive(Debug)]
pub struct Monitor {
    state: RwLock<MonitorState>,
}

impl Monitor {
    // == Constructor ==
    /// Creates a monitor with all counters at zero.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MonitorState::new()),
        }
    }

    // == Record Hit ==
    /// Counts a lookup served from the cache.
    pub fn record_hit(&self, latency: Duration) {
        let mut state = self.state.write();
        state.metrics.hits += 1;
        state.track(latency);
    }

    // == Record Miss ==
    /// Counts a lookup that fell through to the producer.
    pub fn record_miss(&self, latency: Duration) {
        let mut state = self.state.write();
        state.metrics.misses += 1;
        state.track(latency);
    }

    // == Record Eviction ==
    /// Adds `count` to the eviction counter.
    pub fn record_eviction(&self, count: u64) {
        let mut state = self.state.write();
        state.metrics.evictions += count;
        state.metrics.last_update = Utc::now();
    }

    pub fn hit_ratio(&self) -> f64 {
        self.state.read().metrics.hit_ratio()
    }

    /// Returns a copy of the current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.state.read().metrics.clone()
    }

    // == Reset ==
    /// Clears every counter and the latency window, starting a new epoch.
    pub fn reset(&self) {
        *self.state.write() = MonitorState::new();
    }
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_new() {
        let snapshot = Monitor::new().snapshot();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.misses, 0);
        assert_eq!(snapshot.evictions, 0);
        assert_eq!(snapshot.avg_latency, Duration::ZERO);
    }

    #[test]
    fn test_hit_ratio_no_requests() {
        assert_eq!(Monitor::new().hit_ratio(), 0.0);
    }

    #[test]
    fn test_hit_ratio_two_hits_one_miss() {
        let monitor = Monitor::new();
        monitor.record_hit(Duration::from_millis(10));
        monitor.record_miss(Duration::from_millis(20));
        monitor.record_hit(Duration::from_millis(15));

        assert_eq!(monitor.hit_ratio(), 2.0 / 3.0);
    }

    #[test]
    fn test_average_latency() {
        let monitor = Monitor::new();
        monitor.record_hit(Duration::from_millis(10));
        monitor.record_miss(Duration::from_millis(20));
        monitor.record_hit(Duration::from_millis(30));

        assert_eq!(monitor.snapshot().avg_latency, Duration::from_millis(20));
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let monitor = Monitor::new();
        monitor.record_miss(Duration::from_secs(100));
        for _ in 0..LATENCY_WINDOW {
            monitor.record_hit(Duration::from_millis(1));
        }

        // The slow observation has rolled out of the window
        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.avg_latency, Duration::from_millis(1));
        assert_eq!(snapshot.hits, LATENCY_WINDOW as u64);
        assert_eq!(snapshot.misses, 1);
    }

    #[test]
    fn test_record_eviction() {
        let monitor = Monitor::new();
        monitor.record_eviction(2);
        monitor.record_eviction(3);
        assert_eq!(monitor.snapshot().evictions, 5);
    }

    #[test]
    fn test_reset_starts_new_epoch() {
        let monitor = Monitor::new();
        monitor.record_hit(Duration::from_millis(5));
        monitor.record_eviction(1);
        let before = monitor.snapshot().last_update;

        monitor.reset();

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.hits, 0);
        assert_eq!(snapshot.evictions, 0);
        assert_eq!(snapshot.avg_latency, Duration::ZERO);
        assert!(snapshot.last_update >= before);
    }
}
