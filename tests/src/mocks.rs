//! Mock implementations of the cluster and metrics collaborators.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use audit_core::{
    CallContext, ClusterResources, ConfigObject, Error, MetricsSource, Result, SeriesPoint,
    UsageWindow,
};
use parking_lot::Mutex;

/// In-memory cluster holding configuration objects per namespace.
///
/// Implements the same `ClusterResources` trait the engine uses against a
/// real cluster, so discovery runs its full code path without network access.
#[derive(Clone, Default)]
pub struct MockCluster {
    objects: Arc<Mutex<BTreeMap<String, Vec<ConfigObject>>>>,
    /// Simulate an unreachable cluster if set.
    should_fail: Arc<Mutex<bool>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object, replacing any object with the same namespace and name.
    pub fn insert(&self, object: ConfigObject) {
        let mut objects = self.objects.lock();
        let bucket = objects.entry(object.namespace.clone()).or_default();
        bucket.retain(|o| o.name != object.name);
        bucket.push(object);
    }

    /// Creates an empty namespace so it shows up in listings.
    pub fn add_namespace(&self, namespace: &str) {
        self.objects.lock().entry(namespace.to_string()).or_default();
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// Every call made so far, as `op:namespace[/name]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().push(call);
        if *self.should_fail.lock() {
            return Err(Error::cluster("Mock cluster failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterResources for MockCluster {
    async fn get_config_object(
        &self,
        ctx: &CallContext,
        namespace: &str,
        name: &str,
    ) -> Result<ConfigObject> {
        ctx.check("get_config_object")?;
        self.record(format!("get:{}/{}", namespace, name))?;
        self.objects
            .lock()
            .get(namespace)
            .and_then(|objs| objs.iter().find(|o| o.name == name).cloned())
            .ok_or_else(|| Error::source_unavailable(namespace, name))
    }

    async fn list_config_objects(
        &self,
        ctx: &CallContext,
        namespace: &str,
    ) -> Result<Vec<ConfigObject>> {
        ctx.check("list_config_objects")?;
        self.record(format!("list:{}", namespace))?;
        Ok(self.objects.lock().get(namespace).cloned().unwrap_or_default())
    }

    async fn list_namespaces(&self, ctx: &CallContext) -> Result<Vec<String>> {
        ctx.check("list_namespaces")?;
        self.record("namespaces".to_string())?;
        Ok(self.objects.lock().keys().cloned().collect())
    }
}

/// Canned tenant usage keyed by tenant and window label.
#[derive(Clone, Default)]
pub struct MockMetrics {
    peaks: Arc<Mutex<HashMap<(String, String), HashMap<String, f64>>>>,
    series: Arc<Mutex<HashMap<(String, String), HashMap<String, Vec<SeriesPoint>>>>>,
    failing_tenants: Arc<Mutex<HashSet<String>>>,
    /// Fail every query if set.
    should_fail: Arc<Mutex<bool>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_peak(&self, tenant: &str, window: &str, metric: &str, value: f64) {
        self.peaks
            .lock()
            .entry((tenant.to_string(), window.to_string()))
            .or_default()
            .insert(metric.to_string(), value);
    }

    pub fn set_series(&self, tenant: &str, window: &str, metric: &str, points: Vec<SeriesPoint>) {
        self.series
            .lock()
            .entry((tenant.to_string(), window.to_string()))
            .or_default()
            .insert(metric.to_string(), points);
    }

    /// Every query for `tenant` fails with `MetricsUnavailable`.
    pub fn fail_tenant(&self, tenant: &str) {
        self.failing_tenants.lock().insert(tenant.to_string());
    }

    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// Every query made so far, as `kind:tenant:window`.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    fn record(&self, kind: &str, tenant: &str, window: &UsageWindow) -> Result<()> {
        self.queries
            .lock()
            .push(format!("{}:{}:{}", kind, tenant, window.label));
        if *self.should_fail.lock() || self.failing_tenants.lock().contains(tenant) {
            return Err(Error::metrics_unavailable(
                tenant,
                window.label.clone(),
                "Mock metrics failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsSource for MockMetrics {
    async fn get_peak_values(
        &self,
        ctx: &CallContext,
        tenant: &str,
        window: &UsageWindow,
    ) -> Result<HashMap<String, f64>> {
        ctx.check("get_peak_values")?;
        self.record("peak", tenant, window)?;
        Ok(self
            .peaks
            .lock()
            .get(&(tenant.to_string(), window.label.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_tenant_series(
        &self,
        ctx: &CallContext,
        tenant: &str,
        window: &UsageWindow,
    ) -> Result<HashMap<String, Vec<SeriesPoint>>> {
        ctx.check("get_tenant_series")?;
        self.record("series", tenant, window)?;
        Ok(self
            .series
            .lock()
            .get(&(tenant.to_string(), window.label.clone()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_cluster_replaces_objects() {
        let cluster = MockCluster::new();
        let ctx = CallContext::background();
        cluster.insert(ConfigObject::config_map("mimir", "a", vec![("k".to_string(), "1".to_string())]));
        cluster.insert(ConfigObject::config_map("mimir", "a", vec![("k".to_string(), "2".to_string())]));

        let objects = cluster.list_config_objects(&ctx, "mimir").await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].data["k"], "2");

        let err = cluster.get_config_object(&ctx, "mimir", "b").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_mock_cluster_failure_mode() {
        let cluster = MockCluster::new();
        cluster.set_should_fail(true);
        let err = cluster
            .list_namespaces(&CallContext::background())
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(cluster.calls(), vec!["namespaces"]);
    }

    #[tokio::test]
    async fn test_mock_metrics_failing_tenant() {
        let metrics = MockMetrics::new();
        metrics.set_peak("acme", "48h", "ingestion_rate", 10.0);
        metrics.fail_tenant("ghost");
        let ctx = CallContext::background();

        let peaks = metrics
            .get_peak_values(&ctx, "acme", &UsageWindow::hours(48))
            .await
            .unwrap();
        assert_eq!(peaks["ingestion_rate"], 10.0);
        assert!(metrics
            .get_peak_values(&ctx, "ghost", &UsageWindow::hours(48))
            .await
            .is_err());
        assert_eq!(metrics.queries(), vec!["peak:acme:48h", "peak:ghost:48h"]);
    }
}
