//! Tenant capacity risk by additive points.

use audit_core::{CapacitySnapshot, RiskLevel};

/// Points for a utilization percentage: +3 over 90, +2 over 80, +1 over 70.
fn utilization_points(percent: f64) -> u32 {
    if percent > 90.0 {
        3
    } else if percent > 80.0 {
        2
    } else if percent > 70.0 {
        1
    } else {
        0
    }
}

fn growth_points(growth: f64) -> u32 {
    if growth > 0.3 {
        2
    } else if growth > 0.1 {
        1
    } else {
        0
    }
}

fn error_points(error_rate: f64) -> u32 {
    if error_rate > 10.0 {
        2
    } else if error_rate > 5.0 {
        1
    } else {
        0
    }
}

fn exhaustion_points(days: Option<f64>) -> u32 {
    match days {
        Some(d) if d < 30.0 => 3,
        Some(d) if d < 60.0 => 2,
        Some(d) if d < 90.0 => 1,
        _ => 0,
    }
}

pub fn points(current: &CapacitySnapshot, growth: f64, days_to_exhaustion: Option<f64>) -> u32 {
    utilization_points(current.cpu_usage)
        + utilization_points(current.memory_usage)
        + growth_points(growth)
        + error_points(current.error_rate)
        + exhaustion_points(days_to_exhaustion)
}

/// >=6 critical, >=4 high, >=2 medium.
pub fn level_for(points: u32) -> RiskLevel {
    match points {
        p if p >= 6 => RiskLevel::Critical,
        p if p >= 4 => RiskLevel::High,
        p if p >= 2 => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

pub fn assess(current: &CapacitySnapshot, growth: f64, days_to_exhaustion: Option<f64>) -> RiskLevel {
    level_for(points(current, growth, days_to_exhaustion))
}
