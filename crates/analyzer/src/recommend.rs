//! Builds [`Recommendation`] records for single limits.

use audit_core::{LimitCategory, LimitDefinition, Priority, Recommendation, RiskLevel};

use crate::policy::RecommendationPolicy;
use crate::risk::{self, LimitRisk, RiskTrigger};
use crate::usage::UsageStats;

/// Headroom applied to the observed peak when a limit is not configured.
pub const MISSING_LIMIT_HEADROOM: f64 = 1.5;
/// Confidence attached to missing-limit recommendations.
pub const MISSING_LIMIT_CONFIDENCE: f64 = 0.6;
/// Confidence attached when there is nothing to measure against.
pub const NO_SIGNAL_CONFIDENCE: f64 = 0.5;

/// Recommendation for a limit with no effective value.
pub fn missing(def: &LimitDefinition, stats: Option<&UsageStats>) -> Recommendation {
    let peak = stats.map_or(0.0, |s| s.peak);
    let recommended = def.default_value.max(peak * MISSING_LIMIT_HEADROOM);

    let reason = if peak > 0.0 {
        format!(
            "{} is not configured; observed peak {:.0} {} with {}x headroom",
            def.name, peak, def.unit, MISSING_LIMIT_HEADROOM
        )
    } else {
        format!(
            "{} is not configured; falling back to the default of {} {}",
            def.name, def.default_value, def.unit
        )
    };

    Recommendation {
        limit_name: def.name.to_string(),
        category: def.category,
        current_value: None,
        recommended_value: recommended,
        observed_peak: peak,
        observed_avg: stats.map_or(0.0, |s| s.average),
        observed_p95: stats.map_or(0.0, |s| s.p95),
        observed_p99: stats.map_or(0.0, |s| s.p99),
        utilization_percent: None,
        risk_level: RiskLevel::High,
        confidence: MISSING_LIMIT_CONFIDENCE,
        reason,
        impact: impact(def.category),
        priority: Priority::Critical,
        remediation_steps: remediation_steps(def.name, recommended),
        estimated_savings: "Not applicable: limit is not configured".to_string(),
    }
}

/// Recommendation that keeps the current value because there is no usage to compare.
pub fn without_signal(def: &LimitDefinition, current: f64) -> Recommendation {
    let reason = if current <= 0.0 {
        format!("{} is disabled (0); no usage comparison possible", def.name)
    } else if def.usage_metric.is_none() {
        format!("{} has no usage metric; keeping the current value", def.name)
    } else {
        format!("No usage data observed for {}; keeping the current value", def.name)
    };

    Recommendation {
        limit_name: def.name.to_string(),
        category: def.category,
        current_value: Some(current),
        recommended_value: current,
        observed_peak: 0.0,
        observed_avg: 0.0,
        observed_p95: 0.0,
        observed_p99: 0.0,
        utilization_percent: None,
        risk_level: RiskLevel::Low,
        confidence: NO_SIGNAL_CONFIDENCE,
        reason,
        impact: impact(def.category),
        priority: risk::priority_for(RiskLevel::Low, def.category),
        remediation_steps: Vec::new(),
        estimated_savings: "No change recommended".to_string(),
    }
}

/// Recommendation driven by observed usage. `current` must be positive.
pub fn from_usage(
    def: &LimitDefinition,
    current: f64,
    stats: &UsageStats,
    policy: RecommendationPolicy,
) -> Recommendation {
    let recommended = policy.recommend(def.category, stats);
    let assessment = risk::assess(current, stats);

    Recommendation {
        limit_name: def.name.to_string(),
        category: def.category,
        current_value: Some(current),
        recommended_value: recommended,
        observed_peak: stats.peak,
        observed_avg: stats.average,
        observed_p95: stats.p95,
        observed_p99: stats.p99,
        utilization_percent: Some(assessment.utilization_percent),
        risk_level: assessment.level,
        confidence: assessment.confidence,
        reason: reason(def, current, stats, &assessment, policy),
        impact: impact(def.category),
        priority: risk::priority_for(assessment.level, def.category),
        remediation_steps: remediation_steps(def.name, recommended),
        estimated_savings: estimated_savings(current, recommended),
    }
}

fn reason(
    def: &LimitDefinition,
    current: f64,
    stats: &UsageStats,
    assessment: &LimitRisk,
    policy: RecommendationPolicy,
) -> String {
    let trigger = match assessment.trigger {
        RiskTrigger::P99Ratio => format!(
            "p99 usage {:.0} is {:.0}% of the limit (threshold 90%)",
            stats.p99,
            stats.p99 / current * 100.0
        ),
        RiskTrigger::P95High => format!(
            "p95 usage {:.0} is {:.0}% of the limit (threshold 80%)",
            stats.p95,
            stats.p95 / current * 100.0
        ),
        RiskTrigger::P95Medium => format!(
            "p95 usage {:.0} is {:.0}% of the limit (threshold 60%)",
            stats.p95,
            stats.p95 / current * 100.0
        ),
        RiskTrigger::PeakUtilization => format!(
            "peak usage {:.0} reached {:.1}% of the limit",
            stats.peak, assessment.utilization_percent
        ),
        RiskTrigger::None => format!(
            "usage stays below 60% of the limit (p95 {:.0}, peak {:.0})",
            stats.p95, stats.peak
        ),
    };

    let (basis, factor) = policy.rule(def.category);
    format!(
        "{}: {}; recommended value is {} x {}",
        def.name,
        trigger,
        basis.as_str(),
        factor
    )
}

/// Blast radius of hitting a limit in this category.
pub fn impact(category: LimitCategory) -> String {
    match category {
        LimitCategory::Ingestion => {
            "Samples over the limit are rejected at the distributor and data is lost"
        }
        LimitCategory::Query => "Queries over the limit fail or are truncated for dashboards and alerts",
        LimitCategory::Memory => {
            "New series are refused once the limit is hit; ingester memory grows with the limit"
        }
        LimitCategory::Alerting => "Rules or notifications over the limit are dropped silently",
        LimitCategory::Storage => "Retention and compaction behavior changes for stored blocks",
        LimitCategory::Sharding => "Tenant load spreads over more or fewer instances",
        LimitCategory::Instance => "Protects a single instance; hitting it affects every tenant on it",
    }
    .to_string()
}

pub fn remediation_steps(limit_name: &str, recommended: f64) -> Vec<String> {
    vec![
        format!("Update {} to {:.0} in the runtime overrides", limit_name, recommended),
        "Deploy the configuration change".to_string(),
        "Monitor rejected samples and query errors for 1 hour".to_string(),
        "Monitor utilization against the new limit for 24 hours".to_string(),
        "Adjust the value if utilization stays outside the 60-80% band".to_string(),
    ]
}

pub fn estimated_savings(current: f64, recommended: f64) -> String {
    if recommended < current && current > 0.0 {
        let pct = (current - recommended) / current * 100.0;
        format!("{:.1}% reduction in allocated capacity", pct)
    } else if recommended > current {
        "No savings; increase needed to avoid throttling".to_string()
    } else {
        "No change recommended".to_string()
    }
}
