//! Recommendation and per-tenant analysis types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::LimitCategory;
use crate::tenant::LimitMap;

/// Four-tier severity. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Maps a usage-to-limit percentage onto a band: >=95 critical, >=80 high, >=60 medium.
    pub fn from_utilization(percent: f64) -> Self {
        if percent >= 95.0 {
            Self::Critical
        } else if percent >= 80.0 {
            Self::High
        } else if percent >= 60.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Weight used when aggregating risk scores.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Critical => 4.0,
            Self::High => 3.0,
            Self::Medium => 2.0,
            Self::Low => 1.0,
        }
    }

    /// Confidence attached to an assessment at this level.
    pub fn confidence(&self) -> f64 {
        match self {
            Self::Critical => 0.95,
            Self::High => 0.85,
            Self::Medium => 0.75,
            Self::Low => 0.65,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn is_high_or_critical(&self) -> bool {
        *self >= Self::High
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action priority for a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl From<RiskLevel> for Priority {
    fn from(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Low => Self::Low,
            RiskLevel::Medium => Self::Medium,
            RiskLevel::High => Self::High,
            RiskLevel::Critical => Self::Critical,
        }
    }
}

/// Recommendation for one (tenant, limit) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub limit_name: String,
    pub category: LimitCategory,
    /// Absent when the limit is not configured.
    pub current_value: Option<f64>,
    pub recommended_value: f64,
    pub observed_peak: f64,
    pub observed_avg: f64,
    pub observed_p95: f64,
    pub observed_p99: f64,
    /// Peak as a percentage of the current value.
    pub utilization_percent: Option<f64>,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub reason: String,
    pub impact: String,
    pub priority: Priority,
    pub remediation_steps: Vec<String>,
    pub estimated_savings: String,
}

/// Full analysis of one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantAnalysis {
    pub tenant_name: String,
    pub current_limits: LimitMap,
    pub missing_limits: Vec<String>,
    /// Configured limits whose value could not be read as a number.
    pub skipped_limits: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub risk_score: f64,
    pub reliability_score: f64,
    pub performance_score: f64,
    pub cost_score: f64,
    /// Share of limits that could be lowered, 0.1 per over-provisioned limit.
    pub savings_opportunity: f64,
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

impl TenantAnalysis {
    /// Recommendations at or above the given level.
    pub fn at_least(&self, level: RiskLevel) -> impl Iterator<Item = &Recommendation> {
        self.recommendations
            .iter()
            .filter(move |r| r.risk_level >= level)
    }

    pub fn recommendation(&self, limit_name: &str) -> Option<&Recommendation> {
        self.recommendations
            .iter()
            .find(|r| r.limit_name == limit_name)
    }
}
