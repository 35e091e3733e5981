//! End-to-end tests for limit discovery.
//!
//! These run the full four-stage discovery against `MockCluster`, which
//! implements the same `ClusterResources` trait a real cluster adapter does.

use std::sync::Arc;

use audit_core::{CallContext, LimitValue, SourceKind};
use discovery::ConfigDiscoverer;
use integration_tests::{fixtures, mocks::MockCluster};

const RUNTIME: &str = "\
overrides:
  acme:
    ingestion_rate: 20000
    max_global_series_per_user: 300000
  tenant-Acme:
    ingestion_rate: 12000
limits:
  ingestion_burst_size: 300000
";

async fn discover(cluster: &MockCluster) -> audit_core::DiscoveredLimits {
    ConfigDiscoverer::new(Arc::new(cluster.clone()))
        .discover_all(&CallContext::background(), fixtures::NAMESPACE)
        .await
}

#[tokio::test]
async fn test_tenant_value_beats_global() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let found = discover(&cluster).await;

    assert_eq!(
        found.global_limits["ingestion_rate"],
        LimitValue::Number(10_000.0)
    );
    let effective = found.effective_config("acme");
    assert_eq!(
        effective.get("ingestion_rate"),
        Some(&LimitValue::Number(20_000.0))
    );
    // Keys the tenant does not override fall through to the global value.
    assert_eq!(
        effective.get("ingestion_burst_size"),
        Some(&LimitValue::Number(300_000.0))
    );
    assert_eq!(effective.get("max_fetched_series_per_query"), None);
}

#[tokio::test]
async fn test_prefixed_tenant_entry_resolves() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let found = discover(&cluster).await;

    let effective = found.effective_config("Acme");
    assert_eq!(effective.resolved_from.as_deref(), Some("tenant-Acme"));
    assert_eq!(
        effective.get("ingestion_rate"),
        Some(&LimitValue::Number(12_000.0))
    );
}

#[tokio::test]
async fn test_agent_sighting_does_not_mask_prefixed_overrides() {
    let cluster = fixtures::cluster_with(RUNTIME);
    cluster.insert(fixtures::agent_config("observability", &["Acme"]));
    let found = discover(&cluster).await;

    assert!(found.tenant_limits["Acme"].limits.is_empty());
    let effective = found.effective_config("Acme");
    assert_eq!(effective.resolved_from.as_deref(), Some("tenant-Acme"));
    assert_eq!(
        effective.get("ingestion_rate"),
        Some(&LimitValue::Number(12_000.0))
    );
}

#[tokio::test]
async fn test_main_config_subsystem_keys_are_prefixed() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let found = discover(&cluster).await;

    assert!(found.global_limits.contains_key("distributor.remote_timeout"));
    assert!(!found.global_limits.contains_key("distributor.ring.kvstore"));

    let kinds: Vec<SourceKind> = found.sources.iter().map(|s| s.kind).collect();
    assert_eq!(&kinds[..2], &[SourceKind::RuntimeOverride, SourceKind::Configmap]);
}

#[tokio::test]
async fn test_tenant_objects_and_agent_headers() {
    let cluster = fixtures::cluster_with(RUNTIME);
    cluster.insert(fixtures::tenant_object(
        "globex-limits",
        &[("ingestion_rate", "5000"), ("owner", "team-globex")],
    ));
    cluster.insert(fixtures::agent_config("observability", &["initech", "acme"]));
    cluster.insert(fixtures::agent_config("kube-system", &["hidden"]));

    let found = discover(&cluster).await;

    let globex = &found.tenant_limits["globex"];
    assert_eq!(globex.limits["ingestion_rate"], LimitValue::Number(5_000.0));
    assert!(!globex.limits.contains_key("owner"));

    // Seen only in an agent header: present with no limits of its own.
    assert!(found.tenant_limits["initech"].limits.is_empty());
    assert!(!found.tenant_limits.contains_key("hidden"));

    // An agent sighting never drops configured limits.
    let acme = &found.tenant_limits["acme"];
    assert_eq!(acme.limits["ingestion_rate"], LimitValue::Number(20_000.0));
    assert!(acme.source.contains("observability/grafana-agent"));
}

#[tokio::test]
async fn test_unavailable_cluster_yields_empty_result() {
    let cluster = fixtures::cluster_with(RUNTIME);
    cluster.set_should_fail(true);

    let found = discover(&cluster).await;

    assert!(found.global_limits.is_empty());
    assert!(found.tenant_limits.is_empty());
    assert!(found.sources.is_empty());
}

#[tokio::test]
async fn test_malformed_overrides_do_not_stop_discovery() {
    let cluster = MockCluster::new();
    cluster.insert(fixtures::runtime_overrides("overrides: [unclosed"));
    cluster.insert(fixtures::main_config());

    let found = discover(&cluster).await;

    assert!(found.tenant_limits.is_empty());
    assert_eq!(
        found.global_limits["max_global_series_per_user"],
        LimitValue::Number(150_000.0)
    );
}
