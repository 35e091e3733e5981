//! Boundaries to the external collaborators: the cluster API and the
//! metrics query backend.
//!
//! Implementations must honor the [`CallContext`] they receive. The engine
//! additionally wraps every call in [`CallContext::run`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::value::parse_duration_secs;

/// Kind of cluster object holding configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    ConfigMap,
    Secret,
}

/// A configuration object with its keyed text payload (secrets already decoded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigObject {
    pub name: String,
    pub namespace: String,
    pub kind: ObjectKind,
    pub data: BTreeMap<String, String>,
}

impl ConfigObject {
    pub fn config_map(
        namespace: impl Into<String>,
        name: impl Into<String>,
        data: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind: ObjectKind::ConfigMap,
            data: data.into_iter().collect(),
        }
    }

    /// `namespace/name`, used in provenance strings.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// One point of a usage time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// A trailing time window for usage queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageWindow {
    pub label: String,
    pub seconds: u64,
}

impl UsageWindow {
    pub fn hours(h: u64) -> Self {
        Self {
            label: format!("{}h", h),
            seconds: h * 3_600,
        }
    }

    pub fn days(d: u64) -> Self {
        Self {
            label: format!("{}d", d),
            seconds: d * 86_400,
        }
    }

    /// Parses `48h`, `7d`, `1w` style labels.
    pub fn parse(label: &str) -> Result<Self> {
        let secs = parse_duration_secs(label)
            .filter(|s| *s >= 1.0)
            .ok_or_else(|| Error::configuration(format!("invalid usage window '{}'", label)))?;
        Ok(Self {
            label: label.trim().to_string(),
            seconds: secs as u64,
        })
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.seconds as i64)
    }
}

impl fmt::Display for UsageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Read-only access to cluster configuration objects.
#[async_trait]
pub trait ClusterResources: Send + Sync {
    /// Fetches one object. A missing object is `Error::SourceUnavailable`.
    async fn get_config_object(
        &self,
        ctx: &CallContext,
        namespace: &str,
        name: &str,
    ) -> Result<ConfigObject>;

    /// Lists every configuration object (config maps and secrets) in a namespace.
    async fn list_config_objects(&self, ctx: &CallContext, namespace: &str)
        -> Result<Vec<ConfigObject>>;

    async fn list_namespaces(&self, ctx: &CallContext) -> Result<Vec<String>>;
}

/// Tenant usage queries.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Peak value of each usage metric over the window.
    async fn get_peak_values(
        &self,
        ctx: &CallContext,
        tenant: &str,
        window: &UsageWindow,
    ) -> Result<HashMap<String, f64>>;

    /// Time series of each usage metric over the window.
    async fn get_tenant_series(
        &self,
        ctx: &CallContext,
        tenant: &str,
        window: &UsageWindow,
    ) -> Result<HashMap<String, Vec<SeriesPoint>>>;
}
