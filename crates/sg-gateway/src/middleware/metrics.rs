//! Request counters for the admin endpoint.

use sg_admission::Decision;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Gateway metrics
#[derive(Default)]
pub struct GatewayMetrics {
    // Request counters
    pub requests_total: AtomicU64,
    pub passthrough: AtomicU64,

    // Admission outcomes
    pub allowed: AtomicU64,
    pub denied: AtomicU64,
    pub errors: AtomicU64,

    // Forwarding failures (502)
    pub upstream_errors: AtomicU64,

    // Latency tracking (simplified - in production use histograms)
    pub total_latency_ms: AtomicU64,
    pub request_count_for_latency: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of an admission decision
    pub fn record_decision(&self, decision: &Decision) {
        let counter = match decision {
            Decision::Allow(_) => &self.allowed,
            Decision::Deny(_) => &self.denied,
            Decision::Error(_) => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request that carried no root identifier
    pub fn record_passthrough(&self) {
        self.passthrough.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed forward to the upstream
    pub fn record_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed request
    pub fn record_request(&self, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);
        self.request_count_for_latency
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Get average latency in ms
    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        let count = self.request_count_for_latency.load(Ordering::Relaxed);
        if count == 0 {
            0.0
        } else {
            total as f64 / count as f64
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "requests": {
                "total": self.requests_total.load(Ordering::Relaxed),
                "passthrough": self.passthrough.load(Ordering::Relaxed),
            },
            "admission": {
                "allowed": self.allowed.load(Ordering::Relaxed),
                "denied": self.denied.load(Ordering::Relaxed),
                "errors": self.errors.load(Ordering::Relaxed),
            },
            "upstream": {
                "errors": self.upstream_errors.load(Ordering::Relaxed),
            },
            "latency": {
                "average_ms": self.average_latency_ms(),
            }
        })
    }
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self) {
        let latency_ms = self.start.elapsed().as_millis() as u64;
        self.metrics.record_request(latency_ms);
    }
}
