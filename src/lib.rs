//! Limits audit engine for multi-tenant Mimir/Cortex clusters.
//!
//! - Discovers global and per-tenant limits from cluster configuration objects
//! - Recommends limit values from observed usage and scores tenant risk
//! - Produces capacity reports with trends, forecasts and bottlenecks
//!
//! [`Auditor`] wires the three stages to the cluster and metrics collaborators.

pub mod config;

use std::sync::Arc;

use audit_core::{
    CallContext, CapacityReport, ClusterResources, DiscoveredLimits, MetricsSource, ReportType,
    Result, TenantAnalysis,
};
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::info;

pub use analyzer::{RecommendationPolicy, UsageAnalyzer};
pub use crate::config::{load_config, AuditConfig};
pub use discovery::ConfigDiscoverer;
pub use planner::CapacityPlanner;
pub use telemetry::{init_tracing, metrics, AuditMetricsSnapshot};

/// Entry point tying discovery, analysis and capacity planning together.
pub struct Auditor {
    discoverer: ConfigDiscoverer,
    analyzer: UsageAnalyzer,
    planner: CapacityPlanner,
    config: AuditConfig,
    /// Shared by every call; cancelling it stops in-flight work.
    root: CallContext,
    latest: RwLock<Option<Arc<DiscoveredLimits>>>,
    /// Held while the first discovery runs so concurrent callers share it.
    first_discovery: Mutex<()>,
}

impl Auditor {
    pub fn new(
        cluster: Arc<dyn ClusterResources>,
        metrics_source: Arc<dyn MetricsSource>,
        config: AuditConfig,
    ) -> Result<Self> {
        let analyzer_config = config.analyzer_config()?;

        Ok(Self {
            discoverer: ConfigDiscoverer::with_config(cluster, config.discovery_config()),
            analyzer: UsageAnalyzer::with_config(Arc::clone(&metrics_source), analyzer_config),
            planner: CapacityPlanner::with_config(metrics_source, config.planner_config()),
            config,
            root: CallContext::background(),
            latest: RwLock::new(None),
            first_discovery: Mutex::new(()),
        })
    }

    /// Loads configuration from the environment, installs tracing and builds the auditor.
    pub fn from_env(
        cluster: Arc<dyn ClusterResources>,
        metrics_source: Arc<dyn MetricsSource>,
    ) -> anyhow::Result<Self> {
        let config = load_config()?;
        init_tracing(&config.tracing);
        info!(
            namespace = %config.namespace,
            policy = config.policy.as_str(),
            windows = ?config.windows,
            "Audit configuration loaded"
        );
        Ok(Self::new(cluster, metrics_source, config)?)
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Discovers limits in `namespace` and keeps the result for later analysis.
    pub async fn discover_all_limits(&self, namespace: &str) -> DiscoveredLimits {
        let discovered = self.discoverer.discover_all(&self.root, namespace).await;
        *self.latest.write() = Some(Arc::new(discovered.clone()));
        discovered
    }

    /// Analyzes one tenant. Runs discovery on the configured namespace first
    /// when nothing has been discovered yet.
    pub async fn analyze_tenant(&self, tenant_id: &str) -> Result<TenantAnalysis> {
        let discovered = self.discovered().await;
        self.analyzer
            .analyze_tenant(&self.root, &discovered, tenant_id)
            .await
    }

    /// Analyzes several tenants concurrently. Failed tenants are dropped.
    pub async fn analyze_tenants(&self, tenant_ids: &[String]) -> Vec<TenantAnalysis> {
        let discovered = self.discovered().await;
        self.analyzer
            .analyze_tenants(&self.root, &discovered, tenant_ids)
            .await
    }

    pub async fn generate_capacity_report(
        &self,
        report_type: ReportType,
        tenant_ids: &[String],
    ) -> CapacityReport {
        self.planner
            .generate_report(&self.root, report_type, tenant_ids)
            .await
    }

    /// Cancels all in-flight and future calls on this auditor.
    pub fn cancel(&self) {
        self.root.cancel();
    }

    pub fn metrics_snapshot(&self) -> AuditMetricsSnapshot {
        metrics().snapshot()
    }

    fn cached(&self) -> Option<Arc<DiscoveredLimits>> {
        self.latest.read().clone()
    }

    async fn discovered(&self) -> Arc<DiscoveredLimits> {
        if let Some(existing) = self.cached() {
            return existing;
        }
        let _first = self.first_discovery.lock().await;
        if let Some(existing) = self.cached() {
            return existing;
        }
        let namespace = self.config.namespace.clone();
        Arc::new(self.discover_all_limits(&namespace).await)
    }
}
