//! Query and build metrics.
//!
//! The collector sits behind its own mutex, never the graph lock, so recording
//! a sample does not contend with readers or writers of the graph.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

/// A sink for graph metrics. Implement this to forward samples elsewhere.
pub trait MetricsCollector: Send + Sync {
    fn record_query(&self, elapsed: Duration);
    fn record_cache_hit(&self);
    fn record_cache_miss(&self);
    fn record_nodes_loaded(&self, count: usize);
    fn record_edges_loaded(&self, count: usize);
    fn record_build(&self, elapsed: Duration);
    fn record_error(&self, kind: &str);

    /// A point-in-time copy, for collectors that keep one.
    fn snapshot(&self) -> Option<MetricsSnapshot> {
        None
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub query_count: u64,
    pub total_query_time: Duration,
    pub min_query_time: Option<Duration>,
    pub max_query_time: Option<Duration>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub nodes_loaded: u64,
    pub edges_loaded: u64,
    pub graph_build_time: Duration,
    pub errors: BTreeMap<String, u64>,
}

impl MetricsSnapshot {
    pub fn average_query_time(&self) -> Duration {
        match u32::try_from(self.query_count) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_query_time / n,
            Err(_) => {
                Duration::from_secs_f64(self.total_query_time.as_secs_f64() / self.query_count as f64)
            }
        }
    }

    /// Fraction of cache lookups that hit, or 0 with no lookups.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    pub fn error_count(&self) -> u64 {
        self.errors.values().sum()
    }
}

/// In-memory collector.
#[derive(Debug, Default)]
pub struct Metrics {
    state: Mutex<MetricsSnapshot>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        *self.state.lock() = MetricsSnapshot::default();
    }
}

impl MetricsCollector for Metrics {
    fn record_query(&self, elapsed: Duration) {
        let mut state = self.state.lock();
        state.query_count += 1;
        state.total_query_time += elapsed;
        state.min_query_time = Some(state.min_query_time.map_or(elapsed, |m| m.min(elapsed)));
        state.max_query_time = Some(state.max_query_time.map_or(elapsed, |m| m.max(elapsed)));
    }

    fn record_cache_hit(&self) {
        self.state.lock().cache_hits += 1;
    }

    fn record_cache_miss(&self) {
        self.state.lock().cache_misses += 1;
    }

    fn record_nodes_loaded(&self, count: usize) {
        self.state.lock().nodes_loaded += count as u64;
    }

    fn record_edges_loaded(&self, count: usize) {
        self.state.lock().edges_loaded += count as u64;
    }

    fn record_build(&self, elapsed: Duration) {
        self.state.lock().graph_build_time = elapsed;
    }

    fn record_error(&self, kind: &str) {
        *self.state.lock().errors.entry(kind.to_string()).or_default() += 1;
    }

    fn snapshot(&self) -> Option<MetricsSnapshot> {
        Some(self.state.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_timings_track_min_max_avg() {
        let metrics = Metrics::new();
        metrics.record_query(Duration::from_millis(10));
        metrics.record_query(Duration::from_millis(30));
        let snap = metrics.snapshot().unwrap();
        assert_eq!(snap.query_count, 2);
        assert_eq!(snap.min_query_time, Some(Duration::from_millis(10)));
        assert_eq!(snap.max_query_time, Some(Duration::from_millis(30)));
        assert_eq!(snap.average_query_time(), Duration::from_millis(20));
    }

    #[test]
    fn cache_hit_rate() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().unwrap().cache_hit_rate(), 0.0);
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        assert!((metrics.snapshot().unwrap().cache_hit_rate() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn errors_bucket_by_kind_and_reset_clears() {
        let metrics = Metrics::new();
        metrics.record_error("not_found");
        metrics.record_error("not_found");
        metrics.record_error("duplicate");
        metrics.record_nodes_loaded(5);
        let snap = metrics.snapshot().unwrap();
        assert_eq!(snap.errors.get("not_found"), Some(&2));
        assert_eq!(snap.error_count(), 3);
        assert_eq!(snap.nodes_loaded, 5);

        metrics.reset();
        assert_eq!(metrics.snapshot().unwrap(), MetricsSnapshot::default());
    }
}
