//! Linear capacity forecasts.

use audit_core::{CapacityForecast, CapacitySnapshot, HorizonForecast};
use chrono::{DateTime, Duration, Utc};

/// Forecast horizons in days. The first is the headline forecast.
pub const HORIZONS_DAYS: [u32; 3] = [30, 60, 90];
/// Exhaustion is only projected above this growth rate.
pub const EXHAUSTION_GROWTH_THRESHOLD: f64 = 0.1;
/// Projected exhaustion further out than this is dropped.
pub const EXHAUSTION_CUTOFF_DAYS: f64 = 180.0;

/// `current * (1 + growth * horizon)` for every dimension.
pub fn predict(current: &CapacitySnapshot, growth: f64, horizon_days: u32) -> CapacitySnapshot {
    current.scaled(1.0 + growth * horizon_days as f64)
}

/// Days until exhaustion: `90 / (growth * 100)`, kept only inside `(0, 180)`.
pub fn days_to_exhaustion(growth: f64) -> Option<f64> {
    if growth <= EXHAUSTION_GROWTH_THRESHOLD {
        return None;
    }
    let days = 90.0 / (growth * 100.0);
    (days > 0.0 && days < EXHAUSTION_CUTOFF_DAYS).then_some(days)
}

pub fn forecast(current: &CapacitySnapshot, growth: f64, now: DateTime<Utc>) -> CapacityForecast {
    let horizons: Vec<HorizonForecast> = HORIZONS_DAYS
        .iter()
        .map(|&horizon_days| HorizonForecast {
            horizon_days,
            predicted: predict(current, growth, horizon_days),
        })
        .collect();

    let days = days_to_exhaustion(growth);
    let exhaustion_date =
        days.map(|d| now + Duration::seconds((d * 86_400.0).round() as i64));

    CapacityForecast {
        horizon_days: HORIZONS_DAYS[0],
        predicted: horizons[0].predicted,
        horizons,
        exhaustion_date,
        days_to_exhaustion: days,
    }
}
