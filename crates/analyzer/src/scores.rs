//! Tenant-level scores derived from the recommendation set.

use audit_core::Recommendation;

/// Risk added when every evaluated limit is unconfigured, scaled by the missing fraction.
const MISSING_LIMIT_PENALTY: f64 = 0.5;
/// A limit is over-provisioned when current exceeds recommended by this factor.
const OVER_PROVISIONED_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TenantScores {
    pub risk: f64,
    pub reliability: f64,
    pub performance: f64,
    pub cost: f64,
    pub savings_opportunity: f64,
}

fn configured(recs: &[Recommendation]) -> impl Iterator<Item = (&Recommendation, f64)> {
    recs.iter()
        .filter_map(|r| r.current_value.map(|current| (r, current)))
}

/// Weighted `(1 - confidence)` over configured limits, plus a penalty
/// proportional to the share of missing limits.
pub fn risk_score(recs: &[Recommendation], missing: usize) -> f64 {
    let (weighted, total_weight) = configured(recs).fold((0.0, 0.0), |(sum, weights), (r, _)| {
        let w = r.risk_level.weight();
        (sum + (1.0 - r.confidence) * w, weights + w)
    });

    let base = if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    };
    let evaluated = recs.len().max(missing);
    let missing_share = if evaluated > 0 {
        missing as f64 / evaluated as f64
    } else {
        0.0
    };
    (base + MISSING_LIMIT_PENALTY * missing_share).clamp(0.0, 1.0)
}

/// `1 - 0.5 * missing/total - 0.3 * high_or_critical/total`, floored at zero.
pub fn reliability_score(recs: &[Recommendation], missing: usize) -> f64 {
    let total = recs.len();
    if total == 0 {
        return 1.0;
    }
    let high_or_critical = configured(recs)
        .filter(|(r, _)| r.risk_level.is_high_or_critical())
        .count();

    let total = total as f64;
    (1.0 - 0.5 * missing as f64 / total - 0.3 * high_or_critical as f64 / total).max(0.0)
}

/// Penalizes limits running hot on average and limits that sit mostly idle.
pub fn performance_score(recs: &[Recommendation]) -> f64 {
    let mut hot = 0usize;
    let mut idle = 0usize;

    for (r, current) in configured(recs) {
        if current <= 0.0 || r.utilization_percent.is_none() {
            continue;
        }
        let ratio = r.observed_avg / current;
        if ratio > 0.8 {
            hot += 1;
        } else if ratio < 0.2 {
            idle += 1;
        }
    }

    (1.0 - 0.1 * hot as f64 - 0.05 * idle as f64).clamp(0.0, 1.0)
}

fn over_provisioned(recs: &[Recommendation]) -> usize {
    configured(recs)
        .filter(|(r, current)| *current > r.recommended_value * OVER_PROVISIONED_FACTOR)
        .count()
}

/// Starts at 1.0 and adds 0.1 per over-provisioned limit, capped at 1.0.
pub fn cost_score(recs: &[Recommendation]) -> f64 {
    (1.0 + 0.1 * over_provisioned(recs) as f64).min(1.0)
}

/// 0.1 per over-provisioned limit, capped at 1.0.
pub fn savings_opportunity(recs: &[Recommendation]) -> f64 {
    (0.1 * over_provisioned(recs) as f64).min(1.0)
}

pub fn compute(recs: &[Recommendation], missing: usize) -> TenantScores {
    TenantScores {
        risk: risk_score(recs, missing),
        reliability: reliability_score(recs, missing),
        performance: performance_score(recs),
        cost: cost_score(recs),
        savings_opportunity: savings_opportunity(recs),
    }
}
