//! Test fixtures: configuration objects and usage series.

use audit_core::{ConfigObject, SeriesPoint};
use chrono::{Duration, Utc};

use crate::mocks::{MockCluster, MockMetrics};

pub const NAMESPACE: &str = "mimir";

/// Standard trailing windows, in analyzer order.
pub const WINDOWS: [&str; 4] = ["48h", "7d", "30d", "60d"];

fn object(namespace: &str, name: &str, key: &str, text: &str) -> ConfigObject {
    ConfigObject::config_map(namespace, name, vec![(key.to_string(), text.to_string())])
}

/// Runtime overrides with a global limits block and per-tenant overrides.
pub fn runtime_overrides(body: &str) -> ConfigObject {
    object(NAMESPACE, "runtime-overrides", "overrides.yaml", body)
}

/// Main configuration with global limits and a distributor section.
pub fn main_config() -> ConfigObject {
    object(
        NAMESPACE,
        "mimir-config",
        "mimir.yaml",
        "limits:\n  ingestion_rate: 10000\n  max_global_series_per_user: 150000\ndistributor:\n  remote_timeout: 2s\n  ring:\n    kvstore: memberlist\n",
    )
}

/// A per-tenant object named after the tenant with flat keys.
pub fn tenant_object(name: &str, entries: &[(&str, &str)]) -> ConfigObject {
    ConfigObject::config_map(
        NAMESPACE,
        name,
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    )
}

/// A monitoring agent configuration sending with the given org IDs.
pub fn agent_config(namespace: &str, org_ids: &[&str]) -> ConfigObject {
    let headers: String = org_ids
        .iter()
        .map(|id| format!("    headers:\n      X-Scope-OrgID: {}\n", id))
        .collect();
    object(
        namespace,
        "grafana-agent",
        "agent.yaml",
        &format!("remote_write:\n  - url: http://mimir/api/v1/push\n{}", headers),
    )
}

/// A cluster holding the standard main config plus `runtime_body` as overrides.
pub fn cluster_with(runtime_body: &str) -> MockCluster {
    let cluster = MockCluster::new();
    cluster.insert(main_config());
    cluster.insert(runtime_overrides(runtime_body));
    cluster
}

/// Sets the same metric peak for each window, in `WINDOWS` order.
pub fn seed_peaks(metrics: &MockMetrics, tenant: &str, metric: &str, peaks: [f64; 4]) {
    for (window, peak) in WINDOWS.iter().zip(peaks) {
        metrics.set_peak(tenant, window, metric, peak);
    }
}

/// `len` evenly spaced daily points from `first` to `last`, oldest first.
pub fn linear_series(first: f64, last: f64, len: usize) -> Vec<SeriesPoint> {
    let now = Utc::now();
    let steps = len.saturating_sub(1).max(1) as f64;
    (0..len)
        .map(|i| SeriesPoint {
            timestamp: now - Duration::days((len - 1 - i) as i64),
            value: first + (last - first) * i as f64 / steps,
        })
        .collect()
}

/// A single point at the current time.
pub fn flat_point(value: f64) -> Vec<SeriesPoint> {
    vec![SeriesPoint {
        timestamp: Utc::now(),
        value,
    }]
}
