//! Unified error types for the limits audit engine.
//!
//! Error codes:
//! - SRC_001: Candidate config object not found
//! - PARSE_001: Malformed structured payload
//! - METRICS_001: Usage query failed
//! - CONFIG_001: Tenant effective configuration could not be built
//! - COERCE_001: Limit value is not numeric
//! - CLUSTER_001: Cluster API call failed
//! - CTX_001-002: Deadline exceeded / cancelled
//!
//! Only `ConfigResolution` is surfaced to callers. Everything else is
//! absorbed by the component that hit it and logged.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the audit engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A candidate configuration object does not exist.
    #[error("[SRC_001] config object {namespace}/{name} not found")]
    SourceUnavailable { namespace: String, name: String },

    /// A structured payload could not be parsed.
    #[error("[PARSE_001] failed to parse {source_name}: {reason}")]
    ParseFailure { source_name: String, reason: String },

    /// A usage query against the metrics backend failed.
    #[error("[METRICS_001] metrics unavailable for tenant {tenant} over {window}: {reason}")]
    MetricsUnavailable {
        tenant: String,
        window: String,
        reason: String,
    },

    /// A tenant's effective configuration cannot be built at all.
    #[error("[CONFIG_001] cannot resolve configuration for tenant '{tenant}': {reason}")]
    ConfigResolution { tenant: String, reason: String },

    /// A stored limit value cannot be read as a number.
    #[error("[COERCE_001] limit '{key}' has non-numeric value {value} (expected {expected})")]
    TypeCoercion {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("[CLUSTER_001] cluster API error: {0}")]
    Cluster(String),

    #[error("[CTX_001] {operation} exceeded its deadline")]
    Timeout { operation: String },

    #[error("[CTX_002] {operation} was cancelled")]
    Cancelled { operation: String },

    #[error("[CFG_001] configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("[INTERNAL_001] internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn source_unavailable(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn parse_failure(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn metrics_unavailable(
        tenant: impl Into<String>,
        window: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MetricsUnavailable {
            tenant: tenant.into(),
            window: window.into(),
            reason: reason.into(),
        }
    }

    pub fn config_resolution(tenant: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigResolution {
            tenant: tenant.into(),
            reason: reason.into(),
        }
    }

    pub fn type_coercion(
        key: impl Into<String>,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        Self::TypeCoercion {
            key: key.into(),
            value: value.into(),
            expected,
        }
    }

    pub fn cluster(msg: impl Into<String>) -> Self {
        Self::Cluster(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the stable error code string.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "SRC_001",
            Self::ParseFailure { .. } => "PARSE_001",
            Self::MetricsUnavailable { .. } => "METRICS_001",
            Self::ConfigResolution { .. } => "CONFIG_001",
            Self::TypeCoercion { .. } => "COERCE_001",
            Self::Cluster(_) => "CLUSTER_001",
            Self::Timeout { .. } => "CTX_001",
            Self::Cancelled { .. } => "CTX_002",
            Self::Configuration(_) => "CFG_001",
            Self::Serialization(_) => "PARSE_002",
            Self::Internal(_) => "INTERNAL_001",
        }
    }

    /// Whether this error must be surfaced to the caller instead of absorbed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigResolution { .. } | Self::Configuration(_))
    }

    /// Whether this error means the object simply was not there.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. })
    }
}
