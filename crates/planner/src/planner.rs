//! Capacity report generation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use audit_core::{
    CallContext, CapacityReport, MetricsSource, ReportPeriod, ReportType, Result, RiskLevel,
    SeriesPoint, TenantCapacityReport, TrendDirection, UsageWindow,
};
use chrono::{DateTime, Utc};
use telemetry::{metrics, InFlightGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{bottleneck, forecast, risk, signals, summary, trend};

/// Planner configuration.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Upper bound on tenants processed at once
    pub max_concurrency: usize,
    /// Deadline applied to each metrics query
    pub call_timeout: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Builds capacity reports from tenant usage series.
#[derive(Clone)]
pub struct CapacityPlanner {
    source: Arc<dyn MetricsSource>,
    config: PlannerConfig,
}

impl CapacityPlanner {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self {
            source,
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(source: Arc<dyn MetricsSource>, config: PlannerConfig) -> Self {
        Self { source, config }
    }

    /// Generates a report for `tenant_ids`. Tenants whose data cannot be
    /// gathered are excluded and listed in `failed_tenants`.
    pub async fn generate_report(
        &self,
        ctx: &CallContext,
        report_type: ReportType,
        tenant_ids: &[String],
    ) -> CapacityReport {
        let started = Instant::now();
        let now = Utc::now();
        let period = report_type.period_ending(now);
        info!(
            report_type = report_type.as_str(),
            tenants = tenant_ids.len(),
            "Generating capacity report"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, tenant_id) in tenant_ids.iter().cloned().enumerate() {
            let planner = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            let period = period.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, tenant_id, None);
                };
                let _guard = InFlightGuard::enter();
                let result = planner.tenant_report(&ctx, &tenant_id, &period, now).await;
                match result {
                    Ok(report) => (index, tenant_id, Some(report)),
                    Err(e) => {
                        warn!(tenant = %tenant_id, error = %e, "Tenant excluded from capacity report");
                        (index, tenant_id, None)
                    }
                }
            });
        }

        let mut per_tenant = Vec::with_capacity(tenant_ids.len());
        let mut failed_tenants = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Some(report))) => per_tenant.push((index, report)),
                Ok((index, tenant_id, None)) => failed_tenants.push((index, tenant_id)),
                Err(e) => warn!(error = %e, "Capacity report task failed"),
            }
        }
        per_tenant.sort_by_key(|(index, _)| *index);
        failed_tenants.sort_by_key(|(index, _)| *index);
        metrics()
            .tenant_reports_failed
            .inc_by(failed_tenants.len() as u64);

        let per_tenant: Vec<TenantCapacityReport> =
            per_tenant.into_iter().map(|(_, r)| r).collect();

        let cluster = summary::cluster_summary(&per_tenant);
        let forecasting = summary::forecasting_summary(&per_tenant);
        let risk_assessment = summary::risk_assessment(&per_tenant);
        let trends = summary::trend_summary(&per_tenant);
        let recommendations =
            summary::recommendations(&cluster, &forecasting, &risk_assessment, &trends);

        metrics().reports_generated.inc();
        metrics().report_latency_ms.observe_since(started);
        info!(
            report_type = report_type.as_str(),
            tenants = per_tenant.len(),
            failed = failed_tenants.len(),
            overall_risk = %risk_assessment.overall_risk,
            "Capacity report generated"
        );

        CapacityReport {
            id: Uuid::new_v4(),
            report_type,
            generated_at: now,
            period,
            summary: cluster,
            per_tenant,
            forecasting_summary: forecasting,
            risk_assessment,
            trend_analysis: trends,
            recommendations,
            failed_tenants: failed_tenants.into_iter().map(|(_, id)| id).collect(),
        }
    }

    async fn tenant_report(
        &self,
        ctx: &CallContext,
        tenant_id: &str,
        period: &ReportPeriod,
        now: DateTime<Utc>,
    ) -> Result<TenantCapacityReport> {
        let recent = self
            .series(ctx, tenant_id, &UsageWindow::hours(24))
            .await?;
        let current = signals::snapshot_from_series(&recent);

        let seconds = (period.end - period.start).num_seconds().max(0) as u64;
        let period_window = UsageWindow {
            label: format!("{}d", (seconds as f64 / 86_400.0).round()),
            seconds,
        };
        let history = self.series(ctx, tenant_id, &period_window).await?;

        let trend = trend::compute(&history);
        let forecast = forecast::forecast(&current, trend.growth_rate, now);
        let bottleneck = bottleneck::analyze(&current);
        let risk_level = risk::assess(&current, trend.growth_rate, forecast.days_to_exhaustion);

        debug!(
            tenant = tenant_id,
            growth = trend.growth_rate,
            risk = %risk_level,
            primary_bottleneck = ?bottleneck.primary,
            "Tenant capacity assessed"
        );

        let mut report = TenantCapacityReport {
            tenant_name: tenant_id.to_string(),
            current,
            trend,
            forecast,
            bottleneck,
            risk_level,
            recommendations: Vec::new(),
        };
        report.recommendations = tenant_recommendations(&report);
        Ok(report)
    }

    async fn series(
        &self,
        ctx: &CallContext,
        tenant_id: &str,
        window: &UsageWindow,
    ) -> Result<HashMap<String, Vec<SeriesPoint>>> {
        let call_ctx = ctx.child_with_timeout(self.config.call_timeout);
        call_ctx
            .run(
                "get_tenant_series",
                self.source.get_tenant_series(&call_ctx, tenant_id, window),
            )
            .await
            .inspect_err(|_| metrics().metrics_failures.inc())
    }
}

fn tenant_recommendations(report: &TenantCapacityReport) -> Vec<String> {
    let mut out = Vec::new();

    if let Some(primary) = report.bottleneck.primary {
        out.push(format!("Primary bottleneck is {}", primary));
        out.extend(report.bottleneck.remediation.iter().cloned());
    }

    if let (Some(date), Some(days)) = (
        report.forecast.exhaustion_date,
        report.forecast.days_to_exhaustion,
    ) {
        out.push(format!(
            "Capacity projected to run out in {:.0} days ({})",
            days,
            date.format("%Y-%m-%d")
        ));
    }

    if report.trend.direction == TrendDirection::Increasing {
        out.push(format!(
            "{} grew {:.1}% over the period; review limits before the next cycle",
            report.trend.metric,
            report.trend.growth_rate * 100.0
        ));
    }

    if report.risk_level >= RiskLevel::High {
        out.push("Schedule a capacity review for this tenant".to_string());
    }
    out
}
