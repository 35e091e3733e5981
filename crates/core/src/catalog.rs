//! Registry of known Mimir/Cortex tenant and instance limits.
//!
//! The catalog is static and read-only. Durations are expressed in seconds.
//! A default of `0` means "disabled / unlimited" in Mimir.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Category of a limit. Selects the recommendation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitCategory {
    Ingestion,
    Query,
    Memory,
    Alerting,
    Storage,
    Sharding,
    Instance,
}

impl LimitCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ingestion => "ingestion",
            Self::Query => "query",
            Self::Memory => "memory",
            Self::Alerting => "alerting",
            Self::Storage => "storage",
            Self::Sharding => "sharding",
            Self::Instance => "instance",
        }
    }

    /// Coarse tier used by the tiered-buffer policy.
    pub fn tier(&self) -> LimitTier {
        match self {
            Self::Ingestion | Self::Memory => LimitTier::Critical,
            Self::Query | Self::Alerting => LimitTier::Important,
            Self::Storage | Self::Sharding | Self::Instance => LimitTier::Regular,
        }
    }

    /// Ingestion and query limits sit on the request path.
    pub fn is_request_path(&self) -> bool {
        matches!(self, Self::Ingestion | Self::Query)
    }
}

/// Legacy three-level importance tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitTier {
    Critical,
    Important,
    Regular,
}

/// A known limit.
#[derive(Debug, Clone, Serialize)]
pub struct LimitDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub default_value: f64,
    pub unit: &'static str,
    pub category: LimitCategory,
    /// Metric key holding observed usage for this limit.
    pub usage_metric: Option<&'static str>,
}

const fn def(
    name: &'static str,
    description: &'static str,
    default_value: f64,
    unit: &'static str,
    category: LimitCategory,
    usage_metric: Option<&'static str>,
) -> LimitDefinition {
    LimitDefinition {
        name,
        description,
        default_value,
        unit,
        category,
        usage_metric,
    }
}

/// Usage metric keys returned by the metrics collaborator.
pub mod usage_metrics {
    pub const INGESTION_RATE: &str = "ingestion_rate";
    pub const REQUEST_RATE: &str = "request_rate";
    pub const ACTIVE_SERIES: &str = "active_series";
    pub const SERIES_PER_METRIC: &str = "max_series_per_metric";
    pub const METADATA: &str = "metadata_count";
    pub const EXEMPLARS: &str = "exemplars_in_memory";
    pub const LABEL_NAMES_PER_SERIES: &str = "label_names_per_series";
    pub const FETCHED_CHUNKS: &str = "fetched_chunks_per_query";
    pub const FETCHED_SERIES: &str = "fetched_series_per_query";
    pub const FETCHED_CHUNK_BYTES: &str = "fetched_chunk_bytes_per_query";
    pub const QUERY_PARALLELISM: &str = "query_parallelism";
    pub const QUERY_MEMORY: &str = "query_memory_bytes";
    pub const SAMPLES_PER_QUERY: &str = "samples_per_query";
    pub const RULES_PER_GROUP: &str = "rules_per_group";
    pub const RULE_GROUPS: &str = "rule_groups";
    pub const ALERTS: &str = "alerts_count";
    pub const NOTIFICATION_RATE: &str = "notification_rate";
    pub const AGGREGATION_GROUPS: &str = "aggregation_groups";
    pub const INFLIGHT_PUSH: &str = "inflight_push_requests";
    pub const TENANTS_PER_INGESTER: &str = "tenants_per_ingester";
}

use usage_metrics as m;
use LimitCategory::*;

/// Every known limit definition.
#[rustfmt::skip]
pub static LIMIT_CATALOG: &[LimitDefinition] = &[
    // Ingestion
    def("ingestion_rate", "Per-tenant ingestion rate limit in samples per second", 10_000.0, "samples/s", Ingestion, Some(m::INGESTION_RATE)),
    def("ingestion_burst_size", "Allowed ingestion burst size in samples", 200_000.0, "samples", Ingestion, Some(m::INGESTION_RATE)),
    def("request_rate", "Per-tenant push request rate limit", 0.0, "requests/s", Ingestion, Some(m::REQUEST_RATE)),
    def("request_burst_size", "Allowed push request burst size", 0.0, "requests", Ingestion, Some(m::REQUEST_RATE)),
    def("max_label_names_per_series", "Maximum number of label names per series", 30.0, "labels", Ingestion, Some(m::LABEL_NAMES_PER_SERIES)),
    def("max_label_name_length", "Maximum length accepted for label names", 1_024.0, "bytes", Ingestion, None),
    def("max_label_value_length", "Maximum length accepted for label values", 2_048.0, "bytes", Ingestion, None),
    def("max_metadata_length", "Maximum length accepted for metric metadata", 1_024.0, "bytes", Ingestion, None),
    def("max_native_histogram_buckets", "Maximum number of buckets per native histogram sample", 0.0, "buckets", Ingestion, None),
    def("creation_grace_period", "How far into the future samples are accepted", 600.0, "seconds", Ingestion, None),
    def("past_grace_period", "How far into the past samples are accepted", 0.0, "seconds", Ingestion, None),
    def("out_of_order_time_window", "Window in which out-of-order samples are accepted", 0.0, "seconds", Ingestion, None),
    def("ha_max_clusters", "Maximum number of HA clusters per tenant", 100.0, "clusters", Ingestion, None),
    def("max_exemplars_per_series_per_request", "Maximum exemplars per series in a single push", 0.0, "exemplars", Ingestion, None),
    def("otel_metric_suffixes_max", "Maximum OTLP metric suffix variants per metric", 0.0, "suffixes", Ingestion, None),
    // Memory
    def("max_global_series_per_user", "Maximum in-memory series per tenant across the cluster", 150_000.0, "series", Memory, Some(m::ACTIVE_SERIES)),
    def("max_global_series_per_metric", "Maximum in-memory series per metric name across the cluster", 0.0, "series", Memory, Some(m::SERIES_PER_METRIC)),
    def("max_global_metadata_per_user", "Maximum metric metadata entries per tenant across the cluster", 0.0, "entries", Memory, Some(m::METADATA)),
    def("max_global_metadata_per_metric", "Maximum metadata entries per metric name across the cluster", 0.0, "entries", Memory, None),
    def("max_global_exemplars_per_user", "Maximum exemplars kept in memory per tenant", 0.0, "exemplars", Memory, Some(m::EXEMPLARS)),
    def("max_series_per_user", "Maximum in-memory series per tenant per ingester", 5_000_000.0, "series", Memory, Some(m::ACTIVE_SERIES)),
    def("max_series_per_metric", "Maximum in-memory series per metric per ingester", 50_000.0, "series", Memory, Some(m::SERIES_PER_METRIC)),
    def("max_metadata_per_user", "Maximum metadata entries per tenant per ingester", 8_000.0, "entries", Memory, Some(m::METADATA)),
    def("max_metadata_per_metric", "Maximum metadata entries per metric per ingester", 10.0, "entries", Memory, None),
    def("max_estimated_memory_consumption_per_query", "Maximum estimated memory a single query may use", 0.0, "bytes", Memory, Some(m::QUERY_MEMORY)),
    def("active_series_results_max_size_bytes", "Maximum response size for active series requests", 419_430_400.0, "bytes", Memory, None),
    // Query
    def("max_fetched_chunks_per_query", "Maximum chunks fetched by a single query", 2_000_000.0, "chunks", Query, Some(m::FETCHED_CHUNKS)),
    def("max_fetched_series_per_query", "Maximum series fetched by a single query", 0.0, "series", Query, Some(m::FETCHED_SERIES)),
    def("max_fetched_chunk_bytes_per_query", "Maximum chunk bytes fetched by a single query", 0.0, "bytes", Query, Some(m::FETCHED_CHUNK_BYTES)),
    def("max_estimated_fetched_chunks_per_query_multiplier", "Multiplier applied to estimated chunks when limiting queries", 0.0, "ratio", Query, None),
    def("max_query_lookback", "How far back in time queries may look", 0.0, "seconds", Query, None),
    def("max_partial_query_length", "Maximum time range of a partial query", 0.0, "seconds", Query, None),
    def("max_total_query_length", "Maximum time range of a whole query", 0.0, "seconds", Query, None),
    def("max_query_parallelism", "Maximum sub-queries scheduled in parallel per query", 14.0, "queries", Query, Some(m::QUERY_PARALLELISM)),
    def("max_labels_query_length", "Maximum time range of label name/value queries", 0.0, "seconds", Query, None),
    def("max_cache_freshness", "Most recent window never served from the results cache", 60.0, "seconds", Query, None),
    def("max_query_expression_size_bytes", "Maximum size of a PromQL expression", 0.0, "bytes", Query, None),
    def("query_sharding_total_shards", "Total number of shards used by query sharding", 16.0, "shards", Query, None),
    def("query_sharding_max_sharded_queries", "Maximum sharded queries per partial query", 128.0, "queries", Query, None),
    def("query_sharding_max_regexp_size_bytes", "Largest regexp that still allows query sharding", 4_096.0, "bytes", Query, None),
    def("split_instant_queries_by_interval", "Interval used to split instant queries", 0.0, "seconds", Query, None),
    def("label_names_and_values_results_max_size_bytes", "Maximum response size for label name/value requests", 419_430_400.0, "bytes", Query, None),
    def("label_values_max_cardinality_label_names_per_request", "Maximum label names per cardinality request", 100.0, "labels", Query, None),
    def("results_cache_ttl", "TTL of cached query results", 604_800.0, "seconds", Query, None),
    def("results_cache_ttl_for_out_of_order_time_window", "TTL of cached results inside the out-of-order window", 600.0, "seconds", Query, None),
    def("results_cache_ttl_for_cardinality_query", "TTL of cached cardinality query results", 0.0, "seconds", Query, None),
    def("results_cache_ttl_for_labels_query", "TTL of cached label query results", 0.0, "seconds", Query, None),
    def("query_ingesters_within", "Queries newer than this hit ingesters", 46_800.0, "seconds", Query, None),
    def("querier.max_concurrent", "Maximum concurrent queries per querier", 20.0, "queries", Query, None),
    def("querier.timeout", "Query evaluation timeout", 120.0, "seconds", Query, None),
    def("querier.max_samples", "Maximum samples a single query may load", 50_000_000.0, "samples", Query, Some(m::SAMPLES_PER_QUERY)),
    // Alerting
    def("ruler_evaluation_delay_duration", "Delay applied to rule evaluation timestamps", 60.0, "seconds", Alerting, None),
    def("ruler_max_rules_per_rule_group", "Maximum rules in a single rule group", 20.0, "rules", Alerting, Some(m::RULES_PER_GROUP)),
    def("ruler_max_rule_groups_per_tenant", "Maximum rule groups per tenant", 70.0, "groups", Alerting, Some(m::RULE_GROUPS)),
    def("ruler_max_independent_rule_evaluation_concurrency_per_tenant", "Concurrent independent rule evaluations per tenant", 4.0, "evaluations", Alerting, None),
    def("alertmanager_notification_rate_limit", "Notifications per second per integration", 0.0, "notifications/s", Alerting, Some(m::NOTIFICATION_RATE)),
    def("alertmanager_max_dispatcher_aggregation_groups", "Maximum dispatcher aggregation groups", 0.0, "groups", Alerting, Some(m::AGGREGATION_GROUPS)),
    def("alertmanager_max_alerts_count", "Maximum alerts held per tenant", 0.0, "alerts", Alerting, Some(m::ALERTS)),
    def("alertmanager_max_alerts_size_bytes", "Maximum total size of alerts per tenant", 0.0, "bytes", Alerting, None),
    def("alertmanager_max_config_size_bytes", "Maximum Alertmanager configuration size", 0.0, "bytes", Alerting, None),
    def("alertmanager_max_templates_count", "Maximum Alertmanager templates", 0.0, "templates", Alerting, None),
    def("alertmanager_max_template_size_bytes", "Maximum size of a single template", 0.0, "bytes", Alerting, None),
    def("alertmanager_max_silences_count", "Maximum active and pending silences", 0.0, "silences", Alerting, None),
    def("alertmanager_max_silence_size_bytes", "Maximum size of a single silence", 0.0, "bytes", Alerting, None),
    // Storage
    def("compactor_blocks_retention_period", "Retention period for tenant blocks", 0.0, "seconds", Storage, None),
    def("compactor_split_and_merge_shards", "Shards used by split-and-merge compaction", 0.0, "shards", Storage, None),
    def("compactor_split_groups", "Groups used by the split compaction stage", 1.0, "groups", Storage, None),
    def("compactor_partial_block_deletion_delay", "Delay before partial blocks are deleted", 86_400.0, "seconds", Storage, None),
    def("compactor_max_lookback", "How far back the compactor plans jobs", 0.0, "seconds", Storage, None),
    def("compactor_block_upload_max_block_size_bytes", "Maximum size of an uploaded block", 0.0, "bytes", Storage, None),
    def("max_total_query_bytes", "Maximum bytes fetched from long-term storage per query", 0.0, "bytes", Storage, None),
    // Sharding
    def("ingestion_tenant_shard_size", "Ingesters receiving a tenant's series", 0.0, "instances", Sharding, None),
    def("ingestion_partitions_tenant_shard_size", "Partitions receiving a tenant's series", 0.0, "partitions", Sharding, None),
    def("max_queriers_per_tenant", "Queriers that may serve a tenant", 0.0, "instances", Sharding, None),
    def("store_gateway_tenant_shard_size", "Store-gateways holding a tenant's blocks", 0.0, "instances", Sharding, None),
    def("compactor_tenant_shard_size", "Compactors planning a tenant's jobs", 0.0, "instances", Sharding, None),
    def("ruler_tenant_shard_size", "Rulers evaluating a tenant's rules", 0.0, "instances", Sharding, None),
    def("alertmanager_tenant_shard_size", "Alertmanagers serving a tenant", 0.0, "instances", Sharding, None),
    // Instance limits (distributor / ingester)
    def("distributor.instance_limits.max_ingestion_rate", "Ingestion rate a single distributor accepts", 0.0, "samples/s", Instance, Some(m::INGESTION_RATE)),
    def("distributor.instance_limits.max_inflight_push_requests", "In-flight push requests per distributor", 2_000.0, "requests", Instance, Some(m::INFLIGHT_PUSH)),
    def("ingester.instance_limits.max_series", "In-memory series a single ingester holds", 0.0, "series", Instance, Some(m::ACTIVE_SERIES)),
    def("ingester.instance_limits.max_tenants", "Tenants a single ingester serves", 0.0, "tenants", Instance, Some(m::TENANTS_PER_INGESTER)),
    def("ingester.instance_limits.max_ingestion_rate", "Ingestion rate a single ingester accepts", 0.0, "samples/s", Instance, Some(m::INGESTION_RATE)),
    def("ingester.instance_limits.max_inflight_push_requests", "In-flight push requests per ingester", 30_000.0, "requests", Instance, Some(m::INFLIGHT_PUSH)),
];

static CATALOG_INDEX: LazyLock<HashMap<&'static str, &'static LimitDefinition>> =
    LazyLock::new(|| LIMIT_CATALOG.iter().map(|d| (d.name, d)).collect());

/// Returns the full catalog.
pub fn catalog() -> &'static [LimitDefinition] {
    LIMIT_CATALOG
}

/// Looks up a definition by exact name.
pub fn find(name: &str) -> Option<&'static LimitDefinition> {
    CATALOG_INDEX.get(name).copied()
}

/// All definitions in a category, in catalog order.
pub fn by_category(category: LimitCategory) -> impl Iterator<Item = &'static LimitDefinition> {
    LIMIT_CATALOG.iter().filter(move |d| d.category == category)
}
