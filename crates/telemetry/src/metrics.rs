//! In-process audit counters.
//!
//! Counts what the engine absorbed (missing sources, parse failures, failed
//! usage queries) so a caller can tell a clean run from a degraded one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonically increasing counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A value that can go up or down.
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        // Saturate at zero.
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }
}

/// Latency histogram for audit operations.
#[derive(Debug)]
pub struct LatencyHistogram {
    /// Buckets: 10ms, 50ms, 100ms, 500ms, 1s, 5s, 10s, 30s, 60s, +Inf
    buckets: [AtomicU64; 10],
    sum_ms: AtomicU64,
    count: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self {
            buckets: Default::default(),
            sum_ms: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }
}

impl LatencyHistogram {
    const BUCKET_BOUNDS_MS: [u64; 9] = [10, 50, 100, 500, 1_000, 5_000, 10_000, 30_000, 60_000];

    pub fn observe_ms(&self, ms: u64) {
        self.sum_ms.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS_MS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS_MS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    /// Records the time elapsed since `start`.
    pub fn observe_since(&self, start: Instant) {
        self.observe_ms(start.elapsed().as_millis() as u64);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_ms(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum_ms.load(Ordering::Relaxed) as f64 / count as f64
        }
    }

    /// Returns `(upper bound, count)` pairs; the last bound is `u64::MAX`.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS_MS
            .iter()
            .copied()
            .chain(std::iter::once(u64::MAX))
            .zip(self.buckets.iter())
            .map(|(bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Counters for the audit engine.
#[derive(Debug, Default)]
pub struct AuditMetrics {
    // Discovery
    pub discovery_runs: Counter,
    pub sources_discovered: Counter,
    pub sources_unavailable: Counter,
    pub parse_failures: Counter,
    pub cluster_errors: Counter,
    pub tenants_discovered: Counter,

    // Analysis
    pub tenants_analyzed: Counter,
    pub tenants_failed: Counter,
    pub recommendations_emitted: Counter,
    pub missing_limits_detected: Counter,
    pub coercion_failures: Counter,
    pub metrics_failures: Counter,

    // Capacity planning
    pub reports_generated: Counter,
    pub tenant_reports_failed: Counter,

    // Latency
    pub discovery_latency_ms: LatencyHistogram,
    pub analysis_latency_ms: LatencyHistogram,
    pub report_latency_ms: LatencyHistogram,

    /// Units of work currently running on worker pools.
    pub in_flight_units: Gauge,
}

/// A point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditMetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub discovery_runs: u64,
    pub sources_discovered: u64,
    pub sources_unavailable: u64,
    pub parse_failures: u64,
    pub cluster_errors: u64,
    pub tenants_discovered: u64,
    pub tenants_analyzed: u64,
    pub tenants_failed: u64,
    pub recommendations_emitted: u64,
    pub missing_limits_detected: u64,
    pub coercion_failures: u64,
    pub metrics_failures: u64,
    pub reports_generated: u64,
    pub tenant_reports_failed: u64,
    pub discovery_latency_mean_ms: f64,
    pub analysis_latency_mean_ms: f64,
    pub report_latency_mean_ms: f64,
    pub in_flight_units: u64,
}

impl AuditMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> AuditMetricsSnapshot {
        AuditMetricsSnapshot {
            timestamp: Utc::now(),
            discovery_runs: self.discovery_runs.get(),
            sources_discovered: self.sources_discovered.get(),
            sources_unavailable: self.sources_unavailable.get(),
            parse_failures: self.parse_failures.get(),
            cluster_errors: self.cluster_errors.get(),
            tenants_discovered: self.tenants_discovered.get(),
            tenants_analyzed: self.tenants_analyzed.get(),
            tenants_failed: self.tenants_failed.get(),
            recommendations_emitted: self.recommendations_emitted.get(),
            missing_limits_detected: self.missing_limits_detected.get(),
            coercion_failures: self.coercion_failures.get(),
            metrics_failures: self.metrics_failures.get(),
            reports_generated: self.reports_generated.get(),
            tenant_reports_failed: self.tenant_reports_failed.get(),
            discovery_latency_mean_ms: self.discovery_latency_ms.mean_ms(),
            analysis_latency_mean_ms: self.analysis_latency_ms.mean_ms(),
            report_latency_mean_ms: self.report_latency_ms.mean_ms(),
            in_flight_units: self.in_flight_units.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<AuditMetrics> = std::sync::LazyLock::new(AuditMetrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static AuditMetrics {
    &METRICS
}

/// Tracks one unit of pooled work; decrements the gauge on drop.
pub struct InFlightGuard;

impl InFlightGuard {
    pub fn enter() -> Self {
        metrics().in_flight_units.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        metrics().in_flight_units.dec();
    }
}
