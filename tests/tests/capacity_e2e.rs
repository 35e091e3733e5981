//! End-to-end tests for capacity reports through the `Auditor` facade.

use std::sync::Arc;

use audit_core::{BottleneckResource, ReportType, RiskLevel};
use integration_tests::{
    fixtures,
    mocks::{MockCluster, MockMetrics},
};
use limits_audit::{AuditConfig, Auditor};
use planner::signals;

/// Seeds the last day and the weekly period for one tenant.
fn seed_tenant(metrics: &MockMetrics, tenant: &str, now: [f64; 4], cpu_first: f64, cpu_last: f64) {
    let [cpu, memory, storage, errors] = now;
    metrics.set_series(tenant, "24h", signals::CPU_USAGE, fixtures::flat_point(cpu));
    metrics.set_series(tenant, "24h", signals::MEMORY_USAGE, fixtures::flat_point(memory));
    metrics.set_series(tenant, "24h", signals::STORAGE_USAGE, fixtures::flat_point(storage));
    metrics.set_series(tenant, "24h", signals::ERROR_RATE, fixtures::flat_point(errors));
    metrics.set_series(tenant, "24h", signals::INGESTION_RATE, fixtures::flat_point(1_000.0));
    metrics.set_series(
        tenant,
        "7d",
        signals::CPU_USAGE,
        fixtures::linear_series(cpu_first, cpu_last, 8),
    );
}

fn seeded_metrics() -> MockMetrics {
    let metrics = MockMetrics::new();
    seed_tenant(&metrics, "acme", [85.0, 60.0, 30.0, 2.0], 50.0, 75.0);
    seed_tenant(&metrics, "steady", [40.0, 40.0, 10.0, 0.0], 40.0, 40.0);
    seed_tenant(&metrics, "slow", [40.0, 40.0, 10.0, 0.0], 100.0, 105.0);
    metrics.fail_tenant("ghost");
    metrics
}

fn auditor(metrics: &MockMetrics) -> Auditor {
    Auditor::new(
        Arc::new(MockCluster::new()),
        Arc::new(metrics.clone()),
        AuditConfig::default(),
    )
    .unwrap()
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn test_weekly_report_end_to_end() {
    let metrics = seeded_metrics();
    let auditor = auditor(&metrics);

    let report = auditor
        .generate_capacity_report(ReportType::Weekly, &ids(&["acme", "ghost", "steady", "slow"]))
        .await;

    let names: Vec<&str> = report.per_tenant.iter().map(|t| t.tenant_name.as_str()).collect();
    assert_eq!(names, vec!["acme", "steady", "slow"]);
    assert_eq!(report.failed_tenants, vec!["ghost"]);
    assert_eq!(report.summary.tenant_count, 3);
    assert_eq!(report.summary.total_ingestion_rate, 3_000.0);
    assert_eq!(report.period.label, "weekly");
    assert!(!report.recommendations.is_empty());
}

#[tokio::test]
async fn test_hot_cpu_is_primary_bottleneck() {
    let auditor = auditor(&seeded_metrics());

    let report = auditor
        .generate_capacity_report(ReportType::Weekly, &ids(&["acme"]))
        .await;
    let acme = &report.per_tenant[0];

    assert_eq!(acme.bottleneck.primary, Some(BottleneckResource::Cpu));
    assert_eq!(acme.trend.growth_rate, 0.5);
    // cpu +2, growth +2, exhaustion +3
    assert_eq!(acme.risk_level, RiskLevel::Critical);
    assert_eq!(report.risk_assessment.critical_tenants, vec!["acme"]);
}

#[tokio::test]
async fn test_zero_growth_forecast_equals_current() {
    let auditor = auditor(&seeded_metrics());

    let report = auditor
        .generate_capacity_report(ReportType::Weekly, &ids(&["steady"]))
        .await;
    let steady = &report.per_tenant[0];

    assert_eq!(steady.trend.growth_rate, 0.0);
    assert_eq!(steady.forecast.predicted, steady.current);
    assert!(steady.forecast.exhaustion_date.is_none());
    assert_eq!(steady.bottleneck.primary, None);
}

#[tokio::test]
async fn test_exhaustion_needs_meaningful_growth() {
    let auditor = auditor(&seeded_metrics());

    let report = auditor
        .generate_capacity_report(ReportType::Weekly, &ids(&["acme", "slow"]))
        .await;
    let acme = &report.per_tenant[0];
    let slow = &report.per_tenant[1];

    assert!((slow.trend.growth_rate - 0.05).abs() < 1e-9);
    assert!(slow.forecast.exhaustion_date.is_none());

    let days = acme.forecast.days_to_exhaustion.unwrap();
    assert!(days > 0.0 && days < 180.0);
    assert!(acme.forecast.exhaustion_date.unwrap() > report.generated_at);
    assert_eq!(report.forecasting_summary.tenants_with_exhaustion, vec!["acme"]);
}

#[tokio::test]
async fn test_period_window_per_report_type() {
    let metrics = seeded_metrics();
    let auditor = auditor(&metrics);

    auditor
        .generate_capacity_report(ReportType::Quarterly, &ids(&["steady"]))
        .await;

    assert_eq!(
        metrics.queries(),
        vec!["series:steady:24h", "series:steady:90d"]
    );
}

#[tokio::test]
async fn test_metrics_outage_gives_empty_report() {
    let metrics = seeded_metrics();
    metrics.set_should_fail(true);
    let auditor = auditor(&metrics);

    let report = auditor
        .generate_capacity_report(ReportType::Monthly, &ids(&["acme", "steady"]))
        .await;

    assert!(report.per_tenant.is_empty());
    assert_eq!(report.failed_tenants, vec!["acme", "steady"]);
    assert_eq!(report.risk_assessment.overall_risk, RiskLevel::Low);
    assert!(serde_json::to_value(&report).is_ok());
}
