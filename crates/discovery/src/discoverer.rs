//! Multi-source limit discovery.
//!
//! Discovery runs four ordered stages against one namespace:
//! 1. Probe runtime-override objects (tenant overrides and global defaults)
//! 2. Probe the main Mimir configuration (global limits and subsystem limits)
//! 3. Scan tenant-named configuration objects
//! 4. Scan other namespaces' monitoring agents for `X-Scope-OrgID` headers
//!
//! Every cluster call is recoverable. A stage that fails finds nothing and the
//! pass continues; `discover_all` always returns what it collected.

use std::sync::Arc;
use std::time::{Duration, Instant};

use audit_core::{
    CallContext, ClusterResources, ConfigObject, ConfigSource, DiscoveredLimits, LimitMap,
    LimitValue, ObjectKind, Result, SourceKind, TenantLimitSet,
};
use chrono::Utc;
use telemetry::{metrics, InFlightGuard};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::payload::{self, KeyFilter};
use crate::rules;

/// Discovery configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Upper bound on namespaces scanned at once
    pub max_concurrency: usize,
    /// Deadline applied to each cluster call
    pub call_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Tenant ID found in an agent configuration.
#[derive(Debug, Clone)]
struct OrgIdFinding {
    tenant_id: String,
    source: ConfigSource,
}

/// Discovers limit configuration from cluster objects.
pub struct ConfigDiscoverer {
    cluster: Arc<dyn ClusterResources>,
    config: DiscoveryConfig,
}

impl ConfigDiscoverer {
    pub fn new(cluster: Arc<dyn ClusterResources>) -> Self {
        Self {
            cluster,
            config: DiscoveryConfig::default(),
        }
    }

    pub fn with_config(cluster: Arc<dyn ClusterResources>, config: DiscoveryConfig) -> Self {
        Self { cluster, config }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Runs all four stages against `namespace`.
    pub async fn discover_all(&self, ctx: &CallContext, namespace: &str) -> DiscoveredLimits {
        let started = Instant::now();
        metrics().discovery_runs.inc();
        info!(namespace = namespace, "Starting limit discovery");

        let mut acc = DiscoveredLimits::new();
        let mut consumed: Vec<String> = Vec::new();

        if let Some(name) = self.probe_runtime_overrides(ctx, namespace, &mut acc).await {
            consumed.push(name);
        }
        if let Some(name) = self.probe_main_config(ctx, namespace, &mut acc).await {
            consumed.push(name);
        }
        self.scan_tenant_configs(ctx, namespace, &consumed, &mut acc)
            .await;
        self.scan_namespaces(ctx, &mut acc).await;

        acc.timestamp = Utc::now();
        metrics()
            .tenants_discovered
            .inc_by(acc.tenant_limits.len() as u64);
        metrics().discovery_latency_ms.observe_since(started);

        info!(
            namespace = namespace,
            global_limits = acc.global_limits.len(),
            tenants = acc.tenant_limits.len(),
            sources = acc.sources.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Limit discovery complete"
        );
        acc
    }

    /// Stage 1. Returns the name of the object consumed.
    async fn probe_runtime_overrides(
        &self,
        ctx: &CallContext,
        namespace: &str,
        acc: &mut DiscoveredLimits,
    ) -> Option<String> {
        let object = self
            .first_available(ctx, namespace, rules::RUNTIME_OVERRIDE_CANDIDATES)
            .await?;
        let source_name = object.qualified_name();

        let Some(mapping) = self.structured_mapping(&object) else {
            return Some(object.name);
        };

        let mut keys = Vec::new();

        if let Some(section) = payload::section(&mapping, rules::TENANT_OVERRIDES_SECTION) {
            for (tenant_id, limits) in payload::tenant_overrides(section) {
                keys.extend(limits.keys().map(|k| format!("{}.{}", tenant_id, k)));
                let mut set = TenantLimitSet::new(&tenant_id, &source_name);
                set.limits = limits;
                acc.merge_tenant(set);
            }
        }

        for section_name in rules::GLOBAL_LIMIT_SECTIONS {
            if let Some(section) = payload::section(&mapping, section_name) {
                self.apply_globals(acc, payload::flatten(None, section, KeyFilter::All), &mut keys);
            }
        }

        let mut excluded: Vec<&str> = rules::GLOBAL_LIMIT_SECTIONS.to_vec();
        excluded.push(rules::TENANT_OVERRIDES_SECTION);
        self.apply_globals(acc, payload::hoisted_scalars(&mapping, &excluded), &mut keys);

        info!(
            source = %source_name,
            tenants = acc.tenant_limits.len(),
            global_limits = acc.global_limits.len(),
            "Runtime overrides loaded"
        );
        acc.add_source(provenance(&object, SourceKind::RuntimeOverride, keys));
        Some(object.name)
    }

    /// Stage 2. Returns the name of the object consumed.
    async fn probe_main_config(
        &self,
        ctx: &CallContext,
        namespace: &str,
        acc: &mut DiscoveredLimits,
    ) -> Option<String> {
        let object = self
            .first_available(ctx, namespace, rules::MAIN_CONFIG_CANDIDATES)
            .await?;
        let source_name = object.qualified_name();

        let Some(mapping) = self.structured_mapping(&object) else {
            return Some(object.name);
        };

        let mut keys = Vec::new();

        if let Some(limits) = payload::section(&mapping, "limits") {
            self.apply_globals(acc, payload::flatten(None, limits, KeyFilter::All), &mut keys);
        }

        for &subsystem in rules::SUBSYSTEM_SECTIONS {
            if let Some(section) = payload::section(&mapping, subsystem) {
                let flat = payload::flatten(Some(subsystem), section, KeyFilter::LimitKeysOnly);
                self.apply_globals(acc, flat, &mut keys);
            }
        }

        info!(
            source = %source_name,
            keys = keys.len(),
            "Main configuration loaded"
        );
        acc.add_source(provenance(&object, kind_of(&object), keys));
        Some(object.name)
    }

    /// Stage 3.
    async fn scan_tenant_configs(
        &self,
        ctx: &CallContext,
        namespace: &str,
        consumed: &[String],
        acc: &mut DiscoveredLimits,
    ) {
        let objects = match self.list_objects(ctx, namespace).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!(namespace = namespace, error = %e, "Tenant config scan skipped");
                return;
            }
        };

        let mut found = 0usize;
        for object in objects {
            if consumed.contains(&object.name) || !rules::is_tenant_config_name(&object.name) {
                continue;
            }

            let tenant_id = rules::extract_tenant_id(&object.name);
            let source_name = object.qualified_name();
            let limits = self.tenant_object_limits(&object);

            debug!(
                source = %source_name,
                tenant = %tenant_id,
                rule = rules::matching_tenant_rule(&object.name).unwrap_or("none"),
                keys = limits.len(),
                "Tenant config object parsed"
            );

            let keys: Vec<String> = limits.keys().cloned().collect();
            let mut set = TenantLimitSet::new(&tenant_id, &source_name);
            set.limits = limits;
            acc.merge_tenant(set);
            acc.add_source(provenance(&object, kind_of(&object), keys));
            metrics().sources_discovered.inc();
            found += 1;
        }

        info!(namespace = namespace, objects = found, "Tenant config scan complete");
    }

    /// Limits held by one tenant-named object.
    fn tenant_object_limits(&self, object: &ConfigObject) -> LimitMap {
        let source_name = object.qualified_name();
        let mut limits = LimitMap::new();

        for (key, text) in &object.data {
            let structured = rules::is_structured_key(key) || payload::parses_as_mapping(text);

            if structured {
                match payload::parse_mapping(&source_name, text) {
                    Ok(mapping) => {
                        // A `limits:` wrapper is unwrapped; otherwise the document is the limit map.
                        let section = payload::section(&mapping, "limits").unwrap_or(&mapping);
                        limits.extend(payload::flatten(None, section, KeyFilter::All));
                    }
                    Err(e) => {
                        metrics().parse_failures.inc();
                        warn!(source = %source_name, key = %key, error = %e, "Skipping unparseable entry");
                    }
                }
            } else if rules::is_limit_key(key) {
                limits.insert(key.clone(), LimitValue::coerce(text));
            }
        }
        limits
    }

    /// Stage 4.
    async fn scan_namespaces(&self, ctx: &CallContext, acc: &mut DiscoveredLimits) {
        let call_ctx = ctx.child_with_timeout(self.config.call_timeout);
        let namespaces = match call_ctx
            .run("list_namespaces", self.cluster.list_namespaces(&call_ctx))
            .await
        {
            Ok(namespaces) => namespaces,
            Err(e) => {
                metrics().cluster_errors.inc();
                warn!(error = %e, "Namespace listing failed, cross-namespace scan skipped");
                return;
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for namespace in namespaces
            .into_iter()
            .filter(|ns| !rules::is_system_namespace(ns))
        {
            let cluster = Arc::clone(&self.cluster);
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            let timeout = self.config.call_timeout;

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Vec::new();
                };
                let _guard = InFlightGuard::enter();
                scan_agent_configs(cluster.as_ref(), &ctx, timeout, &namespace).await
            });
        }

        let mut findings = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(found) => findings.extend(found),
                Err(e) => warn!(error = %e, "Namespace scan task failed"),
            }
        }

        // Merge in a stable order regardless of which worker finished first.
        findings.sort_by(|a, b| {
            (&a.source.namespace, &a.source.name, &a.tenant_id)
                .cmp(&(&b.source.namespace, &b.source.name, &b.tenant_id))
        });

        let mut seen_sources: Vec<(String, String)> = Vec::new();
        for finding in &findings {
            let source_name = format!("{}/{}", finding.source.namespace, finding.source.name);
            acc.note_tenant(&finding.tenant_id, &source_name);

            let id = (finding.source.namespace.clone(), finding.source.name.clone());
            if !seen_sources.contains(&id) {
                seen_sources.push(id);
                acc.add_source(finding.source.clone());
            }
        }

        info!(
            tenants_seen = findings.len(),
            sources = seen_sources.len(),
            "Cross-namespace scan complete"
        );
    }

    /// First candidate object that exists.
    async fn first_available(
        &self,
        ctx: &CallContext,
        namespace: &str,
        candidates: &[&str],
    ) -> Option<ConfigObject> {
        for name in candidates {
            let call_ctx = ctx.child_with_timeout(self.config.call_timeout);
            match call_ctx
                .run(
                    "get_config_object",
                    self.cluster.get_config_object(&call_ctx, namespace, name),
                )
                .await
            {
                Ok(object) => {
                    metrics().sources_discovered.inc();
                    debug!(namespace = namespace, name = *name, "Candidate found");
                    return Some(object);
                }
                Err(e) if e.is_not_found() => {
                    metrics().sources_unavailable.inc();
                    debug!(namespace = namespace, name = *name, "Candidate not present");
                }
                Err(e) => {
                    metrics().cluster_errors.inc();
                    warn!(namespace = namespace, name = *name, error = %e, "Candidate probe failed");
                }
            }
        }
        None
    }

    async fn list_objects(&self, ctx: &CallContext, namespace: &str) -> Result<Vec<ConfigObject>> {
        let call_ctx = ctx.child_with_timeout(self.config.call_timeout);
        call_ctx
            .run(
                "list_config_objects",
                self.cluster.list_config_objects(&call_ctx, namespace),
            )
            .await
            .inspect_err(|_| metrics().cluster_errors.inc())
    }

    /// Parses the object's structured entry; logs and returns `None` on failure.
    fn structured_mapping(&self, object: &ConfigObject) -> Option<serde_yaml::Mapping> {
        let source_name = object.qualified_name();
        let Some((key, text)) = payload::select_structured_entry(&object.data) else {
            warn!(source = %source_name, "No structured payload found");
            return None;
        };

        match payload::parse_mapping(&source_name, text) {
            Ok(mapping) => Some(mapping),
            Err(e) => {
                metrics().parse_failures.inc();
                warn!(source = %source_name, key = %key, error = %e, "Skipping unparseable source");
                None
            }
        }
    }

    fn apply_globals(&self, acc: &mut DiscoveredLimits, limits: LimitMap, keys: &mut Vec<String>) {
        for (key, value) in limits {
            keys.push(key.clone());
            acc.set_global(key, value);
        }
    }
}

/// Scans one namespace's monitoring-agent objects for tenant IDs.
async fn scan_agent_configs(
    cluster: &dyn ClusterResources,
    ctx: &CallContext,
    timeout: Duration,
    namespace: &str,
) -> Vec<OrgIdFinding> {
    let call_ctx = ctx.child_with_timeout(timeout);
    let objects = match call_ctx
        .run(
            "list_config_objects",
            cluster.list_config_objects(&call_ctx, namespace),
        )
        .await
    {
        Ok(objects) => objects,
        Err(e) => {
            metrics().cluster_errors.inc();
            warn!(namespace = namespace, error = %e, "Namespace scan failed");
            return Vec::new();
        }
    };

    let mut findings = Vec::new();
    for object in objects
        .iter()
        .filter(|o| rules::is_monitoring_agent_config(&o.name))
    {
        let mut ids: Vec<String> = Vec::new();
        let mut keys: Vec<String> = Vec::new();
        for (key, text) in &object.data {
            let found = rules::extract_org_ids(text);
            if !found.is_empty() {
                keys.push(key.clone());
            }
            for id in found {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }

        if ids.is_empty() {
            continue;
        }

        debug!(
            source = %object.qualified_name(),
            tenants = ?ids,
            "Tenant IDs found in agent config"
        );
        let source = provenance(object, kind_of(object), keys);
        findings.extend(ids.into_iter().map(|tenant_id| OrgIdFinding {
            tenant_id,
            source: source.clone(),
        }));
    }
    findings
}

fn kind_of(object: &ConfigObject) -> SourceKind {
    match object.kind {
        ObjectKind::ConfigMap => SourceKind::Configmap,
        ObjectKind::Secret => SourceKind::Secret,
    }
}

fn provenance(object: &ConfigObject, kind: SourceKind, discovered_keys: Vec<String>) -> ConfigSource {
    ConfigSource {
        name: object.name.clone(),
        namespace: object.namespace.clone(),
        kind,
        discovered_keys,
        last_seen: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use audit_core::Error;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    /// In-memory cluster keyed by namespace.
    #[derive(Default)]
    struct FakeCluster {
        objects: BTreeMap<String, Vec<ConfigObject>>,
        list_namespaces_fails: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCluster {
        fn with(mut self, namespace: &str, name: &str, entries: &[(&str, &str)]) -> Self {
            let object = ConfigObject::config_map(
                namespace,
                name,
                entries.iter().map(|(k, v)| (k.to_string(), v.to_string())),
            );
            self.objects
                .entry(namespace.to_string())
                .or_default()
                .push(object);
            self
        }
    }

    #[async_trait]
    impl ClusterResources for FakeCluster {
        async fn get_config_object(
            &self,
            _ctx: &CallContext,
            namespace: &str,
            name: &str,
        ) -> Result<ConfigObject> {
            self.calls.lock().push(format!("get {}/{}", namespace, name));
            self.objects
                .get(namespace)
                .and_then(|objs| objs.iter().find(|o| o.name == name))
                .cloned()
                .ok_or_else(|| Error::source_unavailable(namespace, name))
        }

        async fn list_config_objects(
            &self,
            _ctx: &CallContext,
            namespace: &str,
        ) -> Result<Vec<ConfigObject>> {
            Ok(self.objects.get(namespace).cloned().unwrap_or_default())
        }

        async fn list_namespaces(&self, _ctx: &CallContext) -> Result<Vec<String>> {
            if self.list_namespaces_fails {
                return Err(Error::cluster("forbidden"));
            }
            Ok(self.objects.keys().cloned().collect())
        }
    }

    fn discoverer(cluster: FakeCluster) -> ConfigDiscoverer {
        ConfigDiscoverer::new(Arc::new(cluster))
    }

    #[tokio::test]
    async fn test_runtime_overrides_populate_tenants_and_globals() {
        let cluster = FakeCluster::default().with(
            "mimir",
            "mimir-runtime-config",
            &[(
                "runtime.yaml",
                "overrides:\n  acme:\n    ingestion_rate: 20000\nlimits:\n  ingestion_burst_size: 300000\nmax_global_series_per_user: 150000\n",
            )],
        );
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        assert_eq!(
            found.tenant_limits["acme"].limits["ingestion_rate"],
            LimitValue::Number(20_000.0)
        );
        assert_eq!(found.tenant_limits["acme"].source, "mimir/mimir-runtime-config");
        assert_eq!(
            found.global_limits["ingestion_burst_size"],
            LimitValue::Number(300_000.0)
        );
        assert_eq!(
            found.global_limits["max_global_series_per_user"],
            LimitValue::Number(150_000.0)
        );
        assert_eq!(found.sources[0].kind, SourceKind::RuntimeOverride);
    }

    #[tokio::test]
    async fn test_first_runtime_candidate_wins() {
        let cluster = FakeCluster::default()
            .with("mimir", "runtime-overrides", &[("o.yaml", "limits:\n  ingestion_rate: 1\n")])
            .with("mimir", "overrides", &[("o.yaml", "limits:\n  ingestion_rate: 2\n")]);
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        assert_eq!(found.global_limits["ingestion_rate"], LimitValue::Number(1.0));
    }

    #[tokio::test]
    async fn test_main_config_prefixes_subsystems() {
        let cluster = FakeCluster::default().with(
            "mimir",
            "mimir-config",
            &[(
                "mimir.yaml",
                "limits:\n  ingestion_rate: 15000\ningester:\n  instance_limits:\n    max_series: 1500000\n  ring:\n    replication_factor: 3\nquerier:\n  max_concurrent: 20\n  timeout: 2m\n",
            )],
        );
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        let g = &found.global_limits;
        assert_eq!(g["ingestion_rate"], LimitValue::Number(15_000.0));
        assert_eq!(
            g["ingester.instance_limits.max_series"],
            LimitValue::Number(1_500_000.0)
        );
        assert_eq!(g["querier.max_concurrent"], LimitValue::Number(20.0));
        assert_eq!(g["querier.timeout"], LimitValue::Duration(120.0));
        assert!(!g.contains_key("ingester.ring.replication_factor"));
    }

    #[tokio::test]
    async fn test_tenant_scan_flat_and_structured_entries() {
        let cluster = FakeCluster::default()
            .with(
                "mimir",
                "tenant-acme",
                &[("ingestion_rate", "25000"), ("owner", "team-a"), ("retention_period", "30d")],
            )
            .with(
                "mimir",
                "globex-limits",
                &[("limits.yaml", "limits:\n  max_global_series_per_user: 500000\n")],
            )
            .with("mimir", "grafana-dashboards", &[("ingestion_rate", "1")]);
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        let acme = &found.tenant_limits["acme"];
        assert_eq!(acme.limits["ingestion_rate"], LimitValue::Number(25_000.0));
        assert_eq!(acme.limits["retention_period"], LimitValue::Duration(30.0 * 86_400.0));
        assert!(!acme.limits.contains_key("owner"));

        let globex = &found.tenant_limits["globex"];
        assert_eq!(
            globex.limits["max_global_series_per_user"],
            LimitValue::Number(500_000.0)
        );
        assert!(!found.tenant_limits.contains_key("grafana-dashboards"));
    }

    #[tokio::test]
    async fn test_consumed_object_not_rescanned() {
        // `mimir-overrides` matches the overrides-suffix rule but was consumed by stage 1.
        let cluster = FakeCluster::default().with(
            "mimir",
            "mimir-overrides",
            &[("o.yaml", "overrides:\n  acme:\n    ingestion_rate: 1\n")],
        );
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        assert!(!found.tenant_limits.contains_key("mimir"));
        assert!(found.tenant_limits.contains_key("acme"));
    }

    #[tokio::test]
    async fn test_parse_failure_is_absorbed() {
        let cluster = FakeCluster::default()
            .with("mimir", "runtime-overrides", &[("o.yaml", "overrides: [unclosed")])
            .with("mimir", "tenant-acme", &[("ingestion_rate", "100")]);
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        assert!(found.global_limits.is_empty());
        assert_eq!(
            found.tenant_limits["acme"].limits["ingestion_rate"],
            LimitValue::Number(100.0)
        );
    }

    #[tokio::test]
    async fn test_cross_namespace_scan_seeds_and_appends() {
        let cluster = FakeCluster::default()
            .with("mimir", "tenant-acme", &[("ingestion_rate", "100")])
            .with(
                "payments",
                "alloy-config",
                &[("config.alloy", "headers = {\n  \"X-Scope-OrgID\" = \"acme\",\n}\n")],
            )
            .with(
                "search",
                "prometheus-server",
                &[("prometheus.yml", "remote_write:\n- headers:\n    X-Scope-OrgID: search-team\n")],
            )
            .with(
                "kube-system",
                "prometheus-agent",
                &[("p.yml", "X-Scope-OrgID: hidden")],
            );
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        let acme = &found.tenant_limits["acme"];
        assert_eq!(acme.limits["ingestion_rate"], LimitValue::Number(100.0));
        assert_eq!(acme.source, "mimir/tenant-acme; payments/alloy-config");

        let search = &found.tenant_limits["search-team"];
        assert!(search.limits.is_empty());
        assert_eq!(search.source, "search/prometheus-server");

        assert!(!found.tenant_limits.contains_key("hidden"));
    }

    #[tokio::test]
    async fn test_namespace_listing_failure_degrades() {
        let mut cluster = FakeCluster::default()
            .with("mimir", "tenant-acme", &[("ingestion_rate", "100")]);
        cluster.list_namespaces_fails = true;
        let found = discoverer(cluster)
            .discover_all(&CallContext::background(), "mimir")
            .await;

        assert_eq!(found.tenant_limits.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_namespace_yields_empty_result() {
        let found = discoverer(FakeCluster::default())
            .discover_all(&CallContext::background(), "nothing-here")
            .await;

        assert!(found.global_limits.is_empty());
        assert!(found.tenant_limits.is_empty());
        assert!(found.sources.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_context_finds_nothing() {
        let cluster = FakeCluster::default()
            .with("mimir", "runtime-overrides", &[("o.yaml", "limits:\n  ingestion_rate: 1\n")]);
        let ctx = CallContext::background();
        ctx.cancel();
        let found = discoverer(cluster).discover_all(&ctx, "mimir").await;

        assert!(found.global_limits.is_empty());
    }

    #[test]
    fn test_discovery_config_defaults() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.call_timeout, Duration::from_secs(30));
    }
}
