//! Metric keys read by the planner and the 24h snapshot they feed.

use std::collections::HashMap;

use audit_core::{CapacitySnapshot, SeriesPoint};

pub const INGESTION_RATE: &str = "ingestion_rate";
pub const ACTIVE_SERIES: &str = "active_series";
/// Percent of allocated memory.
pub const MEMORY_USAGE: &str = "memory_usage";
/// Percent of allocated CPU.
pub const CPU_USAGE: &str = "cpu_usage";
/// Percent of allocated storage.
pub const STORAGE_USAGE: &str = "storage_usage";
pub const QUEUE_DEPTH: &str = "queue_depth";
/// Percent of failed requests.
pub const ERROR_RATE: &str = "error_rate";

/// Metrics tried in order when computing a trend.
pub const TREND_METRICS: &[&str] = &[CPU_USAGE, MEMORY_USAGE, INGESTION_RATE];

fn mean_of(series: &HashMap<String, Vec<SeriesPoint>>, metric: &str) -> f64 {
    let values: Vec<f64> = series
        .get(metric)
        .map(|points| points.iter().map(|p| p.value).filter(|v| v.is_finite()).collect())
        .unwrap_or_default();

    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Averages each metric over the supplied series. Missing metrics read as zero.
pub fn snapshot_from_series(series: &HashMap<String, Vec<SeriesPoint>>) -> CapacitySnapshot {
    CapacitySnapshot {
        ingestion_rate: mean_of(series, INGESTION_RATE),
        active_series: mean_of(series, ACTIVE_SERIES),
        memory_usage: mean_of(series, MEMORY_USAGE),
        cpu_usage: mean_of(series, CPU_USAGE),
        storage_usage: mean_of(series, STORAGE_USAGE),
        queue_depth: mean_of(series, QUEUE_DEPTH),
        error_rate: mean_of(series, ERROR_RATE),
    }
}
