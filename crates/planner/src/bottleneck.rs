//! Bottleneck detection.

use audit_core::{BottleneckAnalysis, BottleneckResource, CapacitySnapshot};

/// Utilization percentage above which a resource is flagged.
pub const UTILIZATION_FLAG: f64 = 70.0;
/// Error-rate percentage above which errors are considered.
pub const ERROR_RATE_FLAG: f64 = 5.0;

/// Flags constrained resources and picks the primary one.
///
/// Primary is the highest raw utilization among CPU, memory and storage,
/// reported once anything is flagged. The error rate takes over when its
/// raw value exceeds that utilization.
pub fn analyze(snapshot: &CapacitySnapshot) -> BottleneckAnalysis {
    let mut utilization = [
        (BottleneckResource::Cpu, snapshot.cpu_usage),
        (BottleneckResource::Memory, snapshot.memory_usage),
        (BottleneckResource::Storage, snapshot.storage_usage),
    ];
    // Stable sort keeps cpu, memory, storage order on ties.
    utilization.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let (highest, max_utilization) = utilization[0];

    let mut flagged: Vec<BottleneckResource> = utilization
        .iter()
        .filter(|(_, value)| *value > UTILIZATION_FLAG)
        .map(|(resource, _)| *resource)
        .collect();
    let errors_flagged = snapshot.error_rate > ERROR_RATE_FLAG;
    if errors_flagged {
        flagged.push(BottleneckResource::ErrorRate);
    }

    let primary = if flagged.is_empty() {
        None
    } else if errors_flagged && snapshot.error_rate > max_utilization {
        Some(BottleneckResource::ErrorRate)
    } else {
        Some(highest)
    };

    BottleneckAnalysis {
        primary,
        flagged,
        remediation: primary.map(remediation).unwrap_or_default(),
    }
}

/// Fixed checklist for a primary bottleneck.
pub fn remediation(resource: BottleneckResource) -> Vec<String> {
    let steps: &[&str] = match resource {
        BottleneckResource::Cpu => &[
            "Scale out distributors and ingesters horizontally",
            "Review per-tenant ingestion and query rate limits",
            "Enable query result caching in the query frontend",
            "Audit expensive recording and alerting rules",
        ],
        BottleneckResource::Memory => &[
            "Lower max_global_series_per_user for the largest tenants",
            "Scale ingesters or raise their memory requests",
            "Find and drop high-cardinality labels",
            "Check ingester instance limits for series and inflight requests",
        ],
        BottleneckResource::Storage => &[
            "Review compactor_blocks_retention_period per tenant",
            "Expand object storage and cache capacity",
            "Verify the compactor keeps up with new blocks",
        ],
        BottleneckResource::ErrorRate => &[
            "Inspect distributor and ingester error logs",
            "Check discarded-samples reasons for limit rejections",
            "Verify ring membership and object storage health",
        ],
    };
    steps.iter().map(|s| s.to_string()).collect()
}
