//! Capacity planning report types.

use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::RiskLevel;

/// Report cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Weekly,
    Monthly,
    Quarterly,
}

impl ReportType {
    /// Resolves the trailing period ending at `now`.
    pub fn period_ending(&self, now: DateTime<Utc>) -> ReportPeriod {
        let start = match self {
            Self::Weekly => now - chrono::Duration::days(7),
            Self::Monthly => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - chrono::Duration::days(30)),
            Self::Quarterly => now - chrono::Duration::days(90),
        };
        ReportPeriod {
            start,
            end: now,
            label: self.as_str().to_string(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
        }
    }
}

impl std::str::FromStr for ReportType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            other => Err(crate::Error::configuration(format!(
                "unknown report type '{}'",
                other
            ))),
        }
    }
}

/// Time range covered by a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,
}

impl ReportPeriod {
    pub fn days(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 86_400.0
    }
}

/// Point-in-time capacity figures. Usage and error figures are percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    pub ingestion_rate: f64,
    pub active_series: f64,
    pub memory_usage: f64,
    pub cpu_usage: f64,
    pub storage_usage: f64,
    pub queue_depth: f64,
    pub error_rate: f64,
}

impl CapacitySnapshot {
    /// Multiplies every dimension by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            ingestion_rate: self.ingestion_rate * factor,
            active_series: self.active_series * factor,
            memory_usage: self.memory_usage * factor,
            cpu_usage: self.cpu_usage * factor,
            storage_usage: self.storage_usage * factor,
            queue_depth: self.queue_depth * factor,
            error_rate: self.error_rate * factor,
        }
    }

    /// `(cpu + memory) / 2`.
    pub fn utilization(&self) -> f64 {
        (self.cpu_usage + self.memory_usage) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Stable,
    Decreasing,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Stable => "stable",
            Self::Decreasing => "decreasing",
        }
    }
}

/// Growth over the report period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilizationTrend {
    /// Metric the trend was computed from.
    pub metric: String,
    pub growth_rate: f64,
    pub direction: TrendDirection,
    pub peak_utilization: f64,
    pub low_utilization: f64,
    pub samples: usize,
}

impl UtilizationTrend {
    pub fn flat(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            growth_rate: 0.0,
            direction: TrendDirection::Stable,
            peak_utilization: 0.0,
            low_utilization: 0.0,
            samples: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonForecast {
    pub horizon_days: u32,
    pub predicted: CapacitySnapshot,
}

/// Linear extrapolation of the current snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityForecast {
    pub horizon_days: u32,
    pub predicted: CapacitySnapshot,
    pub horizons: Vec<HorizonForecast>,
    pub exhaustion_date: Option<DateTime<Utc>>,
    pub days_to_exhaustion: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BottleneckResource {
    #[serde(rename = "CPU")]
    Cpu,
    Memory,
    Storage,
    ErrorRate,
}

impl fmt::Display for BottleneckResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cpu => "CPU",
            Self::Memory => "Memory",
            Self::Storage => "Storage",
            Self::ErrorRate => "ErrorRate",
        })
    }
}

/// Which resource constrains a tenant's headroom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleneckAnalysis {
    pub primary: Option<BottleneckResource>,
    /// Resources over their flag threshold, most constrained first.
    pub flagged: Vec<BottleneckResource>,
    pub remediation: Vec<String>,
}

/// Per-tenant section of a capacity report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantCapacityReport {
    pub tenant_name: String,
    pub current: CapacitySnapshot,
    pub trend: UtilizationTrend,
    pub forecast: CapacityForecast,
    pub bottleneck: BottleneckAnalysis,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Cluster-wide aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub tenant_count: usize,
    pub total_ingestion_rate: f64,
    pub total_active_series: f64,
    pub average_utilization: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastingSummary {
    pub horizon_days: u32,
    pub projected_ingestion_rate: f64,
    pub projected_active_series: f64,
    pub tenants_with_exhaustion: Vec<String>,
    pub earliest_exhaustion: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub overall_risk: RiskLevel,
    pub critical_tenants: Vec<String>,
    pub high_risk_tenants: Vec<String>,
    pub medium_risk_tenants: Vec<String>,
    pub low_risk_tenants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub global_trend: TrendDirection,
    pub increasing: usize,
    pub stable: usize,
    pub decreasing: usize,
    pub average_growth_rate: f64,
}

/// Immutable capacity report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityReport {
    pub id: Uuid,
    pub report_type: ReportType,
    pub generated_at: DateTime<Utc>,
    pub period: ReportPeriod,
    pub summary: ClusterSummary,
    pub per_tenant: Vec<TenantCapacityReport>,
    pub forecasting_summary: ForecastingSummary,
    pub risk_assessment: RiskAssessment,
    pub trend_analysis: TrendSummary,
    pub recommendations: Vec<String>,
    /// Tenants excluded because their data could not be gathered.
    pub failed_tenants: Vec<String>,
}
