//! Cluster-wide roll-ups of per-tenant capacity reports.

use audit_core::{
    ClusterSummary, ForecastingSummary, RiskAssessment, RiskLevel, TenantCapacityReport,
    TrendDirection, TrendSummary,
};

use crate::forecast::HORIZONS_DAYS;

/// Share of tenants that must move the same way for a global trend.
pub const GLOBAL_TREND_SHARE: f64 = 0.6;
/// Average utilization above which the report opens with an urgent banner.
pub const URGENT_UTILIZATION: f64 = 80.0;

pub fn cluster_summary(tenants: &[TenantCapacityReport]) -> ClusterSummary {
    let average_utilization = if tenants.is_empty() {
        0.0
    } else {
        tenants.iter().map(|t| t.current.utilization()).sum::<f64>() / tenants.len() as f64
    };

    ClusterSummary {
        tenant_count: tenants.len(),
        total_ingestion_rate: tenants.iter().map(|t| t.current.ingestion_rate).sum(),
        total_active_series: tenants.iter().map(|t| t.current.active_series).sum(),
        average_utilization,
    }
}

pub fn forecasting_summary(tenants: &[TenantCapacityReport]) -> ForecastingSummary {
    let exhausting: Vec<&TenantCapacityReport> = tenants
        .iter()
        .filter(|t| t.forecast.exhaustion_date.is_some())
        .collect();

    ForecastingSummary {
        horizon_days: HORIZONS_DAYS[0],
        projected_ingestion_rate: tenants.iter().map(|t| t.forecast.predicted.ingestion_rate).sum(),
        projected_active_series: tenants.iter().map(|t| t.forecast.predicted.active_series).sum(),
        tenants_with_exhaustion: exhausting.iter().map(|t| t.tenant_name.clone()).collect(),
        earliest_exhaustion: exhausting.iter().filter_map(|t| t.forecast.exhaustion_date).min(),
    }
}

pub fn risk_assessment(tenants: &[TenantCapacityReport]) -> RiskAssessment {
    let names_at = |level: RiskLevel| -> Vec<String> {
        tenants
            .iter()
            .filter(|t| t.risk_level == level)
            .map(|t| t.tenant_name.clone())
            .collect()
    };

    RiskAssessment {
        overall_risk: tenants
            .iter()
            .map(|t| t.risk_level)
            .max()
            .unwrap_or(RiskLevel::Low),
        critical_tenants: names_at(RiskLevel::Critical),
        high_risk_tenants: names_at(RiskLevel::High),
        medium_risk_tenants: names_at(RiskLevel::Medium),
        low_risk_tenants: names_at(RiskLevel::Low),
    }
}

pub fn trend_summary(tenants: &[TenantCapacityReport]) -> TrendSummary {
    let count = |d: TrendDirection| tenants.iter().filter(|t| t.trend.direction == d).count();
    let increasing = count(TrendDirection::Increasing);
    let decreasing = count(TrendDirection::Decreasing);
    let total = tenants.len() as f64;

    let global_trend = if total > 0.0 && increasing as f64 / total > GLOBAL_TREND_SHARE {
        TrendDirection::Increasing
    } else if total > 0.0 && decreasing as f64 / total > GLOBAL_TREND_SHARE {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    TrendSummary {
        global_trend,
        increasing,
        stable: count(TrendDirection::Stable),
        decreasing,
        average_growth_rate: if tenants.is_empty() {
            0.0
        } else {
            tenants.iter().map(|t| t.trend.growth_rate).sum::<f64>() / total
        },
    }
}

/// Report-level recommendations templated from the aggregates.
pub fn recommendations(
    summary: &ClusterSummary,
    forecasting: &ForecastingSummary,
    risk: &RiskAssessment,
    trends: &TrendSummary,
) -> Vec<String> {
    let mut out = Vec::new();

    if summary.average_utilization > URGENT_UTILIZATION {
        out.push(format!(
            "URGENT: average cluster utilization is {:.1}%; add capacity before onboarding new tenants",
            summary.average_utilization
        ));
    } else if summary.average_utilization > 60.0 {
        out.push(format!(
            "Average cluster utilization is {:.1}%; plan capacity for the next quarter",
            summary.average_utilization
        ));
    }

    if !risk.critical_tenants.is_empty() {
        out.push(format!(
            "Review critical tenants first: {}",
            risk.critical_tenants.join(", ")
        ));
    }

    if let Some(earliest) = forecasting.earliest_exhaustion {
        out.push(format!(
            "{} tenant(s) projected to exhaust capacity; earliest on {}",
            forecasting.tenants_with_exhaustion.len(),
            earliest.format("%Y-%m-%d")
        ));
    }

    match trends.global_trend {
        TrendDirection::Increasing => out.push(format!(
            "Usage is growing across most tenants (average growth {:.1}%); revisit global limits",
            trends.average_growth_rate * 100.0
        )),
        TrendDirection::Decreasing => out.push(
            "Usage is shrinking across most tenants; consider reclaiming over-provisioned capacity"
                .to_string(),
        ),
        TrendDirection::Stable => {}
    }

    if out.is_empty() {
        out.push("Cluster capacity is healthy; no action required".to_string());
    }
    out
}
