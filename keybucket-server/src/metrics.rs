//! Simple metrics collection for observability
//!
//! Lightweight atomic counters, exported in Prometheus text format on
//! `GET /metrics`. Store-level numbers (tracked keys, evictions) are read from
//! the limiter at export time rather than mirrored here.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters collected by the server
pub struct Metrics {
    /// Server start time
    start_time: Instant,

    /// Total consume requests received
    pub total_requests: AtomicU64,

    /// Rate limiting decisions
    pub requests_allowed: AtomicU64,
    pub requests_denied: AtomicU64,

    /// Requests refused before reaching the limiter (bad key or quantity)
    pub requests_rejected: AtomicU64,
}

/// Store-level numbers sampled when metrics are exported
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreSnapshot {
    pub tracked_keys: usize,
    pub evicted_total: u64,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            requests_allowed: AtomicU64::new(0),
            requests_denied: AtomicU64::new(0),
            requests_rejected: AtomicU64::new(0),
        }
    }

    /// Record an allow/deny decision
    pub fn record_decision(&self, allowed: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if allowed {
            self.requests_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.requests_denied.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request refused by validation
    pub fn record_rejected(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.requests_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Seconds since the server started
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self, store: StoreSnapshot) -> String {
        let mut output = String::with_capacity(1024);

        output.push_str("# HELP keybucket_uptime_seconds Time since server start in seconds\n");
        output.push_str("# TYPE keybucket_uptime_seconds gauge\n");
        output.push_str(&format!("keybucket_uptime_seconds {}\n\n", self.uptime_seconds()));

        output.push_str("# HELP keybucket_requests_total Total number of consume requests\n");
        output.push_str("# TYPE keybucket_requests_total counter\n");
        output.push_str(&format!(
            "keybucket_requests_total {}\n\n",
            self.total_requests.load(Ordering::Relaxed)
        ));

        // Allow/Deny decisions
        output.push_str("# HELP keybucket_requests_allowed Total requests allowed\n");
        output.push_str("# TYPE keybucket_requests_allowed counter\n");
        output.push_str(&format!(
            "keybucket_requests_allowed {}\n\n",
            self.requests_allowed.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP keybucket_requests_denied Total requests denied\n");
        output.push_str("# TYPE keybucket_requests_denied counter\n");
        output.push_str(&format!(
            "keybucket_requests_denied {}\n\n",
            self.requests_denied.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP keybucket_requests_rejected Total requests failing validation\n");
        output.push_str("# TYPE keybucket_requests_rejected counter\n");
        output.push_str(&format!(
            "keybucket_requests_rejected {}\n\n",
            self.requests_rejected.load(Ordering::Relaxed)
        ));

        // Store metrics
        output.push_str("# HELP keybucket_tracked_keys Keys currently holding a bucket\n");
        output.push_str("# TYPE keybucket_tracked_keys gauge\n");
        output.push_str(&format!("keybucket_tracked_keys {}\n\n", store.tracked_keys));

        output.push_str("# HELP keybucket_evicted_buckets_total Idle buckets evicted\n");
        output.push_str("# TYPE keybucket_evicted_buckets_total counter\n");
        output.push_str(&format!("keybucket_evicted_buckets_total {}\n", store.evicted_total));

        output
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
