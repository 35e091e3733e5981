//! Growth trend over the report period.

use std::collections::HashMap;

use audit_core::{SeriesPoint, TrendDirection, UtilizationTrend};

use crate::signals::TREND_METRICS;

/// Growth above this is increasing; below its negation, decreasing.
pub const STABLE_BAND: f64 = 0.05;

/// `(last - first) / first`; zero when `first` is zero.
pub fn growth_rate(first: f64, last: f64) -> f64 {
    if first == 0.0 {
        0.0
    } else {
        (last - first) / first
    }
}

pub fn direction_for(growth: f64) -> TrendDirection {
    if growth > STABLE_BAND {
        TrendDirection::Increasing
    } else if growth < -STABLE_BAND {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Trend of the first metric in [`TREND_METRICS`] with at least two points.
/// Flat when none qualifies.
pub fn compute(series: &HashMap<String, Vec<SeriesPoint>>) -> UtilizationTrend {
    let Some((metric, points)) = TREND_METRICS
        .iter()
        .filter_map(|m| series.get(*m).map(|p| (*m, p)))
        .find(|(_, p)| p.len() >= 2)
    else {
        return UtilizationTrend::flat("none");
    };

    let mut ordered: Vec<&SeriesPoint> = points.iter().collect();
    ordered.sort_by_key(|p| p.timestamp);

    let first = ordered[0].value;
    let last = ordered[ordered.len() - 1].value;
    let growth = growth_rate(first, last);

    let values = ordered.iter().map(|p| p.value);
    let peak = values.clone().fold(f64::MIN, f64::max);
    let low = values.fold(f64::MAX, f64::min);

    UtilizationTrend {
        metric: metric.to_string(),
        growth_rate: growth,
        direction: direction_for(growth),
        peak_utilization: peak,
        low_utilization: low,
        samples: ordered.len(),
    }
}
