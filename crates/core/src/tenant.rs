//! Discovered limit configuration and per-tenant resolution.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::LimitValue;

/// Map of limit key to configured value.
pub type LimitMap = BTreeMap<String, LimitValue>;

/// Where a configuration source was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Configmap,
    Secret,
    RuntimeOverride,
}

/// Provenance record for one configuration object read during discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub name: String,
    pub namespace: String,
    pub kind: SourceKind,
    pub discovered_keys: Vec<String>,
    pub last_seen: DateTime<Utc>,
}

/// Limits configured for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantLimitSet {
    pub tenant_id: String,
    pub limits: LimitMap,
    /// Provenance; multiple sources are joined with `"; "`.
    pub source: String,
    pub last_updated: DateTime<Utc>,
}

impl TenantLimitSet {
    pub fn new(tenant_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            limits: LimitMap::new(),
            source: source.into(),
            last_updated: Utc::now(),
        }
    }

    /// Appends a provenance entry unless already recorded.
    pub fn append_source(&mut self, source: &str) {
        if source.is_empty() || self.source.split("; ").any(|s| s == source) {
            return;
        }
        if self.source.is_empty() {
            self.source = source.to_string();
        } else {
            self.source.push_str("; ");
            self.source.push_str(source);
        }
    }
}

/// Result of one discovery pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredLimits {
    pub global_limits: LimitMap,
    pub tenant_limits: BTreeMap<String, TenantLimitSet>,
    pub sources: Vec<ConfigSource>,
    pub timestamp: DateTime<Utc>,
}

impl Default for DiscoveredLimits {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveredLimits {
    pub fn new() -> Self {
        Self {
            global_limits: LimitMap::new(),
            tenant_limits: BTreeMap::new(),
            sources: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Sets a global limit. Later writes win.
    pub fn set_global(&mut self, key: impl Into<String>, value: LimitValue) {
        self.global_limits.insert(key.into(), value);
    }

    /// Sets a tenant limit, creating the tenant entry if needed. Later writes win.
    pub fn set_tenant_limit(
        &mut self,
        tenant_id: &str,
        key: impl Into<String>,
        value: LimitValue,
        source: &str,
    ) {
        let entry = self
            .tenant_limits
            .entry(tenant_id.to_string())
            .or_insert_with(|| TenantLimitSet::new(tenant_id, source));
        entry.append_source(source);
        entry.limits.insert(key.into(), value);
        entry.last_updated = Utc::now();
    }

    /// Merges a tenant set by ID. Limits are unioned with incoming keys
    /// overwriting; an existing populated set is never replaced by an empty one.
    pub fn merge_tenant(&mut self, incoming: TenantLimitSet) {
        match self.tenant_limits.get_mut(&incoming.tenant_id) {
            Some(existing) => {
                existing.append_source(&incoming.source);
                if !incoming.limits.is_empty() {
                    existing.limits.extend(incoming.limits);
                    existing.last_updated = incoming.last_updated;
                }
            }
            None => {
                self.tenant_limits
                    .insert(incoming.tenant_id.clone(), incoming);
            }
        }
    }

    /// Records that a tenant exists without adding limits.
    pub fn note_tenant(&mut self, tenant_id: &str, source: &str) {
        self.merge_tenant(TenantLimitSet::new(tenant_id, source));
    }

    pub fn add_source(&mut self, source: ConfigSource) {
        self.sources.push(source);
    }

    /// Finds the tenant entry for `tenant_id`, trying naming variants in order:
    /// exact, `tenant-{id}`, `{id}-tenant`, lower-case, upper-case.
    ///
    /// Entries without limits are passed over while a later variant carries
    /// some. The exact entry is still returned when no variant has limits.
    pub fn resolve_tenant(&self, tenant_id: &str) -> Option<(&str, &TenantLimitSet)> {
        let candidates = tenant_name_variants(tenant_id);
        candidates
            .iter()
            .filter_map(|candidate| self.tenant_limits.get_key_value(candidate.as_str()))
            .find(|(_, set)| !set.limits.is_empty())
            .or_else(|| self.tenant_limits.get_key_value(tenant_id))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Builds the effective configuration: globals overlaid with the tenant's limits.
    pub fn effective_config(&self, tenant_id: &str) -> EffectiveConfig {
        let mut limits = self.global_limits.clone();
        let resolved_from = match self.resolve_tenant(tenant_id) {
            Some((key, set)) => {
                limits.extend(set.limits.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(key.to_string())
            }
            None => None,
        };

        EffectiveConfig {
            tenant_id: tenant_id.to_string(),
            limits,
            resolved_from,
        }
    }

    pub fn tenant_ids(&self) -> impl Iterator<Item = &str> {
        self.tenant_limits.keys().map(String::as_str)
    }
}

/// Candidate keys for a tenant, in resolution order, without duplicates.
pub fn tenant_name_variants(tenant_id: &str) -> Vec<String> {
    let candidates = [
        tenant_id.to_string(),
        format!("tenant-{}", tenant_id),
        format!("{}-tenant", tenant_id),
        tenant_id.to_lowercase(),
        tenant_id.to_uppercase(),
    ];

    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// A tenant's resolved configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub tenant_id: String,
    pub limits: LimitMap,
    /// Key of the tenant entry that was overlaid, if any.
    pub resolved_from: Option<String>,
}

impl EffectiveConfig {
    /// Explicitly absent when the key is not configured.
    pub fn get(&self, key: &str) -> Option<&LimitValue> {
        self.limits.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}
