//! Usage gathering across trailing windows.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use audit_core::{CallContext, Error, MetricsSource, SeriesPoint, UsageWindow};
use serde::{Deserialize, Serialize};
use telemetry::{metrics, InFlightGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Nearest-rank percentile. `p` is a fraction in `[0, 1]`.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if p <= 0.0 {
        return sorted[0];
    }
    if p >= 1.0 {
        return sorted[sorted.len() - 1];
    }

    let index = (p * (sorted.len() - 1) as f64).round() as usize;
    sorted[index]
}

pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Usage of one metric in one window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub peak: f64,
    pub average: f64,
    pub p95: f64,
    pub p99: f64,
}

impl UsageSample {
    /// Builds a sample from a window's peak value and series.
    ///
    /// A window with a peak but no series uses the peak for every field.
    pub fn from_window(peak: Option<f64>, series: Option<&[SeriesPoint]>) -> Option<Self> {
        let values: Vec<f64> = series
            .unwrap_or_default()
            .iter()
            .map(|p| p.value)
            .filter(|v| v.is_finite())
            .collect();

        if values.is_empty() {
            return peak.map(|p| Self {
                peak: p,
                average: p,
                p95: p,
                p99: p,
            });
        }

        let series_max = values.iter().copied().fold(f64::MIN, f64::max);
        Some(Self {
            peak: peak.map_or(series_max, |p| p.max(series_max)),
            average: average(&values),
            p95: percentile(&values, 0.95),
            p99: percentile(&values, 0.99),
        })
    }
}

/// Usage of one metric aggregated across windows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub peak: f64,
    pub average: f64,
    pub p95: f64,
    pub p99: f64,
    pub windows: usize,
}

impl UsageStats {
    /// Peak and percentiles take the maximum; average is the mean of window averages.
    pub fn aggregate(samples: &[UsageSample]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let max_of = |f: fn(&UsageSample) -> f64| samples.iter().map(f).fold(f64::MIN, f64::max);
        let averages: Vec<f64> = samples.iter().map(|s| s.average).collect();

        Some(Self {
            peak: max_of(|s| s.peak),
            average: average(&averages),
            p95: max_of(|s| s.p95),
            p99: max_of(|s| s.p99),
            windows: samples.len(),
        })
    }
}

/// Raw query results for one window. Failed queries leave their map empty.
#[derive(Debug, Clone, Default)]
pub struct WindowUsage {
    pub peaks: HashMap<String, f64>,
    pub series: HashMap<String, Vec<SeriesPoint>>,
    /// At least one query for this window failed.
    pub failed: bool,
}

/// All windows gathered for one tenant, in configured window order.
#[derive(Debug, Clone, Default)]
pub struct TenantUsage {
    pub windows: Vec<(UsageWindow, WindowUsage)>,
}

impl TenantUsage {
    /// Aggregated stats for `metric`; `None` when no window returned data.
    ///
    /// A failed window without data for `metric` contributes a zero sample.
    pub fn stats_for(&self, metric: &str) -> Option<UsageStats> {
        let mut samples = Vec::with_capacity(self.windows.len());
        let mut failed = 0usize;

        for (_, w) in &self.windows {
            let sample = UsageSample::from_window(
                w.peaks.get(metric).copied(),
                w.series.get(metric).map(Vec::as_slice),
            );
            match sample {
                Some(sample) => samples.push(sample),
                None if w.failed => failed += 1,
                None => {}
            }
        }

        if samples.is_empty() {
            return None;
        }
        samples.extend(std::iter::repeat(UsageSample::default()).take(failed));
        UsageStats::aggregate(&samples)
    }

    pub fn is_empty(&self) -> bool {
        self.windows
            .iter()
            .all(|(_, w)| w.peaks.is_empty() && w.series.is_empty())
    }
}

/// Fetches every window for `tenant` concurrently.
pub async fn gather_usage(
    source: Arc<dyn MetricsSource>,
    ctx: &CallContext,
    tenant: &str,
    windows: &[UsageWindow],
    call_timeout: Duration,
    max_concurrency: usize,
) -> TenantUsage {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut tasks = JoinSet::new();

    for (index, window) in windows.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        let ctx = ctx.clone();
        let tenant = tenant.to_string();

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (index, window, WindowUsage::default());
            };
            let _guard = InFlightGuard::enter();
            let usage = fetch_window(source.as_ref(), &ctx, call_timeout, &tenant, &window).await;
            (index, window, usage)
        });
    }

    let mut gathered = Vec::with_capacity(windows.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => gathered.push(entry),
            Err(e) => warn!(tenant = tenant, error = %e, "Usage window task failed"),
        }
    }
    gathered.sort_by_key(|(index, _, _)| *index);

    TenantUsage {
        windows: gathered.into_iter().map(|(_, w, u)| (w, u)).collect(),
    }
}

async fn fetch_window(
    source: &dyn MetricsSource,
    ctx: &CallContext,
    call_timeout: Duration,
    tenant: &str,
    window: &UsageWindow,
) -> WindowUsage {
    let mut usage = WindowUsage::default();

    let call_ctx = ctx.child_with_timeout(call_timeout);
    match call_ctx
        .run("get_peak_values", source.get_peak_values(&call_ctx, tenant, window))
        .await
    {
        Ok(peaks) => usage.peaks = peaks,
        Err(e) => {
            usage.failed = true;
            report_unavailable(tenant, window, &e);
        }
    }

    let call_ctx = ctx.child_with_timeout(call_timeout);
    match call_ctx
        .run("get_tenant_series", source.get_tenant_series(&call_ctx, tenant, window))
        .await
    {
        Ok(series) => usage.series = series,
        Err(e) => {
            usage.failed = true;
            report_unavailable(tenant, window, &e);
        }
    }

    debug!(
        tenant = tenant,
        window = %window,
        peaks = usage.peaks.len(),
        series = usage.series.len(),
        "Usage window fetched"
    );
    usage
}

fn report_unavailable(tenant: &str, window: &UsageWindow, cause: &Error) {
    metrics().metrics_failures.inc();
    let err = match cause {
        Error::MetricsUnavailable { .. } => cause.to_string(),
        other => Error::metrics_unavailable(tenant, window.label.clone(), other.to_string())
            .to_string(),
    };
    warn!(tenant = tenant, window = %window, error = %err, "Usage query failed, window counts as zero");
}
