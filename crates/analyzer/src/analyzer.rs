//! Per-tenant usage analysis.

use std::sync::Arc;
use std::time::{Duration, Instant};

use audit_core::{
    catalog, CallContext, DiscoveredLimits, Error, MetricsSource, Recommendation, Result,
    RiskLevel, TenantAnalysis, UsageWindow,
};
use chrono::Utc;
use telemetry::{metrics, InFlightGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::policy::RecommendationPolicy;
use crate::recommend;
use crate::scores;
use crate::usage::{self, TenantUsage};

/// Analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Trailing windows queried for usage
    pub windows: Vec<UsageWindow>,
    pub policy: RecommendationPolicy,
    /// Upper bound on concurrent windows or tenants
    pub max_concurrency: usize,
    /// Deadline applied to each metrics query
    pub call_timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            windows: default_windows(),
            policy: RecommendationPolicy::default(),
            max_concurrency: 8,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// 48h, 7d, 30d and 60d.
pub fn default_windows() -> Vec<UsageWindow> {
    vec![
        UsageWindow::hours(48),
        UsageWindow::days(7),
        UsageWindow::days(30),
        UsageWindow::days(60),
    ]
}

/// Compares configured limits against observed usage.
#[derive(Clone)]
pub struct UsageAnalyzer {
    source: Arc<dyn MetricsSource>,
    config: AnalyzerConfig,
}

impl UsageAnalyzer {
    pub fn new(source: Arc<dyn MetricsSource>) -> Self {
        Self {
            source,
            config: AnalyzerConfig::default(),
        }
    }

    pub fn with_config(source: Arc<dyn MetricsSource>, config: AnalyzerConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyzes one tenant against every catalog limit.
    ///
    /// Fails only when the tenant ID is blank or no limits are known at all.
    pub async fn analyze_tenant(
        &self,
        ctx: &CallContext,
        discovered: &DiscoveredLimits,
        tenant_id: &str,
    ) -> Result<TenantAnalysis> {
        let started = Instant::now();

        if tenant_id.trim().is_empty() {
            return Err(Error::config_resolution(tenant_id, "tenant ID is blank"));
        }

        let effective = discovered.effective_config(tenant_id);
        if effective.is_empty() {
            return Err(Error::config_resolution(
                tenant_id,
                "no tenant or global limits discovered",
            ));
        }
        debug!(
            tenant = tenant_id,
            resolved_from = ?effective.resolved_from,
            limits = effective.limits.len(),
            "Effective configuration resolved"
        );

        let usage = usage::gather_usage(
            Arc::clone(&self.source),
            ctx,
            tenant_id,
            &self.config.windows,
            self.config.call_timeout,
            self.config.max_concurrency,
        )
        .await;

        let mut recommendations = Vec::new();
        let mut missing_limits = Vec::new();
        let mut skipped_limits = Vec::new();

        for def in catalog::catalog() {
            let stats = def.usage_metric.and_then(|m| usage.stats_for(m));

            let Some(value) = effective.get(def.name) else {
                missing_limits.push(def.name.to_string());
                recommendations.push(recommend::missing(def, stats.as_ref()));
                continue;
            };

            let current = match value.as_f64(def.name) {
                Ok(current) => current,
                Err(e) => {
                    metrics().coercion_failures.inc();
                    warn!(tenant = tenant_id, limit = def.name, error = %e, "Skipping limit with unreadable value");
                    skipped_limits.push(def.name.to_string());
                    continue;
                }
            };

            let rec = match stats {
                Some(stats) if current > 0.0 => {
                    recommend::from_usage(def, current, &stats, self.config.policy)
                }
                _ => recommend::without_signal(def, current),
            };
            recommendations.push(rec);
        }

        let scores = scores::compute(&recommendations, missing_limits.len());
        let summary = summarize(tenant_id, &recommendations, &missing_limits, &usage, scores.risk);

        metrics().tenants_analyzed.inc();
        metrics()
            .recommendations_emitted
            .inc_by(recommendations.len() as u64);
        metrics()
            .missing_limits_detected
            .inc_by(missing_limits.len() as u64);
        metrics().analysis_latency_ms.observe_since(started);

        info!(
            tenant = tenant_id,
            recommendations = recommendations.len(),
            missing = missing_limits.len(),
            skipped = skipped_limits.len(),
            risk_score = scores.risk,
            "Tenant analysis complete"
        );

        Ok(TenantAnalysis {
            tenant_name: tenant_id.to_string(),
            current_limits: effective.limits,
            missing_limits,
            skipped_limits,
            recommendations,
            risk_score: scores.risk,
            reliability_score: scores.reliability,
            performance_score: scores.performance,
            cost_score: scores.cost,
            savings_opportunity: scores.savings_opportunity,
            summary,
            generated_at: Utc::now(),
        })
    }

    /// Analyzes tenants on a bounded worker pool. Failed tenants are logged and dropped.
    /// Results keep the input order.
    pub async fn analyze_tenants(
        &self,
        ctx: &CallContext,
        discovered: &DiscoveredLimits,
        tenant_ids: &[String],
    ) -> Vec<TenantAnalysis> {
        let discovered = Arc::new(discovered.clone());
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, tenant_id) in tenant_ids.iter().cloned().enumerate() {
            let analyzer = self.clone();
            let discovered = Arc::clone(&discovered);
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, tenant_id, Err(Error::internal("worker pool closed")));
                };
                let _guard = InFlightGuard::enter();
                let result = analyzer.analyze_tenant(&ctx, &discovered, &tenant_id).await;
                (index, tenant_id, result)
            });
        }

        let mut analyses = Vec::with_capacity(tenant_ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(analysis))) => analyses.push((index, analysis)),
                Ok((_, tenant_id, Err(e))) => {
                    metrics().tenants_failed.inc();
                    warn!(tenant = %tenant_id, error = %e, code = e.error_code(), "Tenant analysis failed");
                }
                Err(e) => {
                    metrics().tenants_failed.inc();
                    warn!(error = %e, "Tenant analysis task failed");
                }
            }
        }

        analyses.sort_by_key(|(index, _)| *index);
        analyses.into_iter().map(|(_, a)| a).collect()
    }
}

fn summarize(
    tenant_id: &str,
    recs: &[Recommendation],
    missing: &[String],
    usage: &TenantUsage,
    risk_score: f64,
) -> String {
    let critical = recs
        .iter()
        .filter(|r| r.current_value.is_some() && r.risk_level == RiskLevel::Critical)
        .count();
    let high = recs
        .iter()
        .filter(|r| r.current_value.is_some() && r.risk_level == RiskLevel::High)
        .count();

    let mut summary = format!(
        "Tenant {}: {} limits analyzed, {} missing, {} critical, {} high risk; risk score {:.2}",
        tenant_id,
        recs.len(),
        missing.len(),
        critical,
        high,
        risk_score
    );
    if usage.is_empty() {
        summary.push_str(". No usage data was available");
    }
    summary
}
