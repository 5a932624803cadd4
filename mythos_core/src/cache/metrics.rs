//! Hit/miss counters for the cache manager

use crate::cache::TierKind;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters owned by one cache manager, never reset automatically
#[derive(Debug, Default)]
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    memory_hits: AtomicU64,
    session_hits: AtomicU64,
    durable_hits: AtomicU64,
    evictions: AtomicU64,
    total_response_time_us: AtomicU64,
    response_count: AtomicU64,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub memory_hits: u64,
    pub session_hits: u64,
    pub durable_hits: u64,
    pub evictions: u64,
    pub total_response_time_ms: f64,
    pub response_count: u64,
    /// `hits / (hits + misses)` as `"NN.NN%"`
    pub hit_rate: String,
    pub avg_response_time_ms: f64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self, tier: TierKind) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        let per_tier = match tier {
            TierKind::Memory => &self.memory_hits,
            TierKind::Session => &self.session_hits,
            TierKind::Durable => &self.durable_hits,
        };
        per_tier.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_set(&self) {
        self.sets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_response(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_response_time_us
            .fetch_add(micros, Ordering::Relaxed);
        self.response_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters and derive hit rate and average latency
    pub fn snapshot(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let response_count = self.response_count.load(Ordering::Relaxed);
        let total_response_time_ms =
            self.total_response_time_us.load(Ordering::Relaxed) as f64 / 1000.0;

        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            hits as f64 / lookups as f64 * 100.0
        };
        let avg_response_time_ms = if response_count == 0 {
            0.0
        } else {
            total_response_time_ms / response_count as f64
        };

        CacheStats {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            session_hits: self.session_hits.load(Ordering::Relaxed),
            durable_hits: self.durable_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            total_response_time_ms,
            response_count,
            hit_rate: format!("{hit_rate:.2}%"),
            avg_response_time_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics_do_not_divide_by_zero() {
        let stats = CacheMetrics::new().snapshot();
        assert_eq!(stats.hit_rate, "0.00%");
        assert_eq!(stats.avg_response_time_ms, 0.0);
    }

    #[test]
    fn test_one_miss_one_hit_is_fifty_percent() {
        let metrics = CacheMetrics::new();
        metrics.record_miss();
        metrics.record_hit(TierKind::Memory);

        let stats = metrics.snapshot();
        assert_eq!(stats.hit_rate, "50.00%");
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.session_hits, 0);
    }

    #[test]
    fn test_average_response_time() {
        let metrics = CacheMetrics::new();
        metrics.record_response(Duration::from_millis(10));
        metrics.record_response(Duration::from_millis(30));

        let stats = metrics.snapshot();
        assert_eq!(stats.response_count, 2);
        assert!((stats.avg_response_time_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_rate_rounding() {
        let metrics = CacheMetrics::new();
        metrics.record_hit(TierKind::Durable);
        metrics.record_miss();
        metrics.record_miss();
        assert_eq!(metrics.snapshot().hit_rate, "33.33%");
    }
}
