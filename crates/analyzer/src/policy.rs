//! Recommended-value policies.

use std::str::FromStr;

use audit_core::{Error, LimitCategory, LimitTier};
use serde::{Deserialize, Serialize};

use crate::usage::UsageStats;

/// How a recommended value is derived from observed usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPolicy {
    /// Category-specific percentile times a headroom factor.
    #[default]
    Percentile,
    /// Peak times a buffer chosen by the category's tier.
    TieredBuffer,
}

/// Statistic a recommendation is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Peak,
    P95,
    P99,
}

impl Basis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Peak => "peak",
            Self::P95 => "p95",
            Self::P99 => "p99",
        }
    }

    pub fn pick(&self, stats: &UsageStats) -> f64 {
        match self {
            Self::Peak => stats.peak,
            Self::P95 => stats.p95,
            Self::P99 => stats.p99,
        }
    }
}

impl RecommendationPolicy {
    /// Basis statistic and headroom multiplier for a category.
    pub fn rule(&self, category: LimitCategory) -> (Basis, f64) {
        match self {
            Self::Percentile => match category {
                LimitCategory::Ingestion => (Basis::P99, 1.2),
                LimitCategory::Query => (Basis::P95, 1.3),
                LimitCategory::Memory => (Basis::Peak, 1.25),
                LimitCategory::Alerting => (Basis::Peak, 1.5),
                _ => (Basis::P95, 1.25),
            },
            Self::TieredBuffer => match category.tier() {
                LimitTier::Critical => (Basis::Peak, 1.20),
                LimitTier::Important => (Basis::Peak, 1.15),
                LimitTier::Regular => (Basis::Peak, 1.10),
            },
        }
    }

    pub fn recommend(&self, category: LimitCategory, stats: &UsageStats) -> f64 {
        let (basis, factor) = self.rule(category);
        basis.pick(stats) * factor
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentile => "percentile",
            Self::TieredBuffer => "tiered_buffer",
        }
    }
}

impl FromStr for RecommendationPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "percentile" => Ok(Self::Percentile),
            "tiered_buffer" | "tiered" => Ok(Self::TieredBuffer),
            other => Err(Error::configuration(format!(
                "unknown recommendation policy '{}'",
                other
            ))),
        }
    }
}
