//! End-to-end tests for usage analysis through the `Auditor` facade.
//!
//! Discovery runs against `MockCluster` and usage comes from `MockMetrics`,
//! so every stage between configuration objects and recommendations is real.

use std::sync::Arc;

use audit_core::{
    catalog::{self, usage_metrics},
    Error, Priority, RiskLevel,
};
use integration_tests::{
    fixtures,
    mocks::{MockCluster, MockMetrics},
};
use limits_audit::{AuditConfig, Auditor, RecommendationPolicy};

const RUNTIME: &str = "\
overrides:
  acme:
    ingestion_rate: 10000
  globex:
    ingestion_rate: 50000
    max_global_series_per_user: many
";

fn auditor(cluster: &MockCluster, metrics: &MockMetrics) -> Auditor {
    Auditor::new(
        Arc::new(cluster.clone()),
        Arc::new(metrics.clone()),
        AuditConfig::default(),
    )
    .unwrap()
}

fn acme_metrics() -> MockMetrics {
    let metrics = MockMetrics::new();
    fixtures::seed_peaks(
        &metrics,
        "acme",
        usage_metrics::INGESTION_RATE,
        [9_500.0, 8_000.0, 7_000.0, 6_000.0],
    );
    metrics
}

#[tokio::test]
async fn test_hot_ingestion_rate_is_critical() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &acme_metrics());

    let analysis = auditor.analyze_tenant("acme").await.unwrap();
    let rec = analysis.recommendation("ingestion_rate").unwrap();

    assert_eq!(rec.current_value, Some(10_000.0));
    assert_eq!(rec.observed_peak, 9_500.0);
    assert_eq!(rec.utilization_percent, Some(95.0));
    assert_eq!(rec.risk_level, RiskLevel::Critical);
    assert_eq!(rec.priority, Priority::Critical);
    assert!((rec.recommended_value - 11_400.0).abs() < 1e-6);
    assert!(!analysis.missing_limits.contains(&"ingestion_rate".to_string()));

    for score in [
        analysis.risk_score,
        analysis.reliability_score,
        analysis.performance_score,
        analysis.cost_score,
        analysis.savings_opportunity,
    ] {
        assert!((0.0..=1.0).contains(&score), "score out of range: {}", score);
    }
    assert!(!analysis.summary.is_empty());
}

#[tokio::test]
async fn test_acme_scores() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &acme_metrics());

    let analysis = auditor.analyze_tenant("acme").await.unwrap();
    let total = analysis.recommendations.len() as f64;
    let missing = analysis.missing_limits.len() as f64;

    // Only ingestion_rate and max_global_series_per_user are configured.
    assert_eq!(total, catalog::catalog().len() as f64);
    assert_eq!(missing, total - 2.0);

    // One critical limit among the configured ones.
    let reliability = 1.0 - 0.5 * missing / total - 0.3 / total;
    assert!((analysis.reliability_score - reliability).abs() < 1e-9);

    // 7625 average against 10000 is neither hot nor idle; the series limit has no usage.
    assert_eq!(analysis.performance_score, 1.0);

    // Critical at 0.95 and a no-signal limit at 0.5, plus the missing share.
    let risk = (0.05 * 4.0 + 0.5) / 5.0 + 0.5 * missing / total;
    assert!((analysis.risk_score - risk).abs() < 1e-9);

    assert_eq!(analysis.cost_score, 1.0);
    assert_eq!(analysis.savings_opportunity, 0.0);
}

#[tokio::test]
async fn test_analysis_discovers_configured_namespace_once() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &acme_metrics());

    auditor.analyze_tenant("acme").await.unwrap();
    let after_first = cluster.calls().len();
    auditor.analyze_tenant("acme").await.unwrap();

    assert!(after_first > 0);
    assert_eq!(cluster.calls().len(), after_first);
}

#[tokio::test]
async fn test_concurrent_first_calls_share_one_discovery() {
    let single = fixtures::cluster_with(RUNTIME);
    auditor(&single, &acme_metrics())
        .analyze_tenant("acme")
        .await
        .unwrap();

    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &acme_metrics());
    let (first, second) = tokio::join!(
        auditor.analyze_tenant("acme"),
        auditor.analyze_tenant("globex")
    );

    assert!(first.is_ok() && second.is_ok());
    assert_eq!(cluster.calls().len(), single.calls().len());
}

#[tokio::test]
async fn test_unreadable_limit_is_skipped_not_fatal() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &MockMetrics::new());

    let analysis = auditor.analyze_tenant("globex").await.unwrap();

    assert!(analysis
        .skipped_limits
        .contains(&"max_global_series_per_user".to_string()));
    assert!(analysis.recommendation("ingestion_rate").is_some());
}

#[tokio::test]
async fn test_metrics_outage_keeps_current_values() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let metrics = acme_metrics();
    metrics.set_should_fail(true);
    let auditor = auditor(&cluster, &metrics);

    let analysis = auditor.analyze_tenant("acme").await.unwrap();
    let rec = analysis.recommendation("ingestion_rate").unwrap();

    assert_eq!(rec.recommended_value, 10_000.0);
    assert_eq!(rec.observed_peak, 0.0);
}

#[tokio::test]
async fn test_batch_keeps_order_and_drops_failures() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &acme_metrics());
    let ids = vec![
        "globex".to_string(),
        " ".to_string(),
        "acme".to_string(),
    ];

    let analyses = auditor.analyze_tenants(&ids).await;
    let names: Vec<&str> = analyses.iter().map(|a| a.tenant_name.as_str()).collect();

    assert_eq!(names, vec!["globex", "acme"]);
}

#[tokio::test]
async fn test_empty_cluster_is_resolution_error() {
    let auditor = auditor(&MockCluster::new(), &acme_metrics());

    let err = auditor.analyze_tenant("acme").await.unwrap_err();

    assert!(matches!(err, Error::ConfigResolution { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_cancelled_auditor_resolves_nothing() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &acme_metrics());
    auditor.cancel();

    assert!(auditor.analyze_tenant("acme").await.is_err());
    assert!(cluster.calls().is_empty());
}

#[tokio::test]
async fn test_tiered_policy_from_config() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let config = AuditConfig {
        policy: RecommendationPolicy::TieredBuffer,
        ..AuditConfig::default()
    };
    let auditor = Auditor::new(Arc::new(cluster), Arc::new(acme_metrics()), config).unwrap();

    let analysis = auditor.analyze_tenant("acme").await.unwrap();
    let rec = analysis.recommendation("ingestion_rate").unwrap();

    assert!(rec.recommended_value > rec.observed_peak);
    assert_eq!(auditor.config().policy, RecommendationPolicy::TieredBuffer);
}

#[tokio::test]
async fn test_counters_advance() {
    let cluster = fixtures::cluster_with(RUNTIME);
    let auditor = auditor(&cluster, &acme_metrics());
    let before = auditor.metrics_snapshot();

    auditor.analyze_tenant("acme").await.unwrap();
    let after = auditor.metrics_snapshot();

    assert!(after.discovery_runs > before.discovery_runs);
    assert!(after.tenants_analyzed > before.tenants_analyzed);
    assert!(serde_json::to_string(&after).is_ok());
}
