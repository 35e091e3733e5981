//! Per-limit risk assessment.

use audit_core::{LimitCategory, Priority, RiskLevel};

use crate::usage::UsageStats;

/// Which check produced the reported level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTrigger {
    /// `p99 / current` over 0.9
    P99Ratio,
    /// `p95 / current` over 0.8
    P95High,
    /// `p95 / current` over 0.6
    P95Medium,
    /// Peak utilization band
    PeakUtilization,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitRisk {
    pub level: RiskLevel,
    pub confidence: f64,
    pub trigger: RiskTrigger,
    pub utilization_percent: f64,
}

fn ratio_assessment(current: f64, stats: &UsageStats) -> (RiskLevel, RiskTrigger) {
    if stats.p99 / current > 0.9 {
        (RiskLevel::Critical, RiskTrigger::P99Ratio)
    } else if stats.p95 / current > 0.8 {
        (RiskLevel::High, RiskTrigger::P95High)
    } else if stats.p95 / current > 0.6 {
        (RiskLevel::Medium, RiskTrigger::P95Medium)
    } else {
        (RiskLevel::Low, RiskTrigger::None)
    }
}

/// The more severe of the ratio assessment and the peak utilization band.
/// `current` must be positive.
pub fn assess(current: f64, stats: &UsageStats) -> LimitRisk {
    let utilization_percent = stats.peak / current * 100.0;
    let band = RiskLevel::from_utilization(utilization_percent);
    let (ratio_level, ratio_trigger) = ratio_assessment(current, stats);

    let (level, trigger) = if band > ratio_level {
        (band, RiskTrigger::PeakUtilization)
    } else {
        (ratio_level, ratio_trigger)
    };

    LimitRisk {
        level,
        confidence: level.confidence(),
        trigger,
        utilization_percent,
    }
}

/// Request-path categories are raised to at least medium.
pub fn priority_for(level: RiskLevel, category: LimitCategory) -> Priority {
    let priority = Priority::from(level);
    if category.is_request_path() {
        priority.max(Priority::Medium)
    } else {
        priority
    }
}
