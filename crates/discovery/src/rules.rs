//! Name and content heuristics used by discovery.
//!
//! Every heuristic is a named table so each rule can be tested on its own.

use std::sync::LazyLock;

use regex::Regex;

/// Object names probed for runtime overrides, in priority order.
pub const RUNTIME_OVERRIDE_CANDIDATES: &[&str] = &[
    "runtime-overrides",
    "mimir-runtime-overrides",
    "mimir-runtime-config",
    "runtime-config",
    "mimir-overrides",
    "overrides",
];

/// Object names probed for the main configuration, in priority order.
pub const MAIN_CONFIG_CANDIDATES: &[&str] = &[
    "mimir-config",
    "mimir",
    "mimir-distributed-config",
    "cortex-config",
    "config",
];

/// Main-config sections whose limit-like keys are prefixed with the section name.
pub const SUBSYSTEM_SECTIONS: &[&str] = &["distributor", "ingester", "querier"];

/// Runtime-override sections.
pub const TENANT_OVERRIDES_SECTION: &str = "overrides";
pub const GLOBAL_LIMIT_SECTIONS: &[&str] = &["limits", "defaults"];

/// Substrings that mark a key as a limit.
pub const LIMIT_KEY_KEYWORDS: &[&str] = &[
    "rate",
    "burst",
    "series",
    "max",
    "limit",
    "retention",
    "size",
    "length",
    "period",
    "timeout",
    "shard",
    "concurren",
    "parallelism",
    "ttl",
    "lookback",
    "grace",
    "window",
    "freshness",
    "within",
    "delay",
    "bytes",
    "chunks",
    "samples",
    "exemplars",
    "metadata",
];

/// Keys that contain a keyword but never hold a limit.
pub const LIMIT_KEY_EXCLUSIONS: &[&str] = &["maxprocs", "max_idle_conns_per_host"];

/// Namespaces skipped by the cross-namespace scan.
pub const SYSTEM_NAMESPACES: &[&str] = &[
    "kube-system",
    "kube-public",
    "kube-node-lease",
    "cert-manager",
    "ingress-nginx",
    "local-path-storage",
    "gatekeeper-system",
    "calico-system",
    "tigera-operator",
];

/// Substrings identifying monitoring-agent configuration objects.
pub const MONITORING_AGENT_RULES: &[&str] = &[
    "alloy",
    "grafana-agent",
    "prometheus",
    "otel-collector",
    "opentelemetry",
    "promtail",
    "vector",
];

/// A rule extracting a tenant ID from an object name.
#[derive(Debug, Clone, Copy)]
pub struct TenantNameRule {
    pub name: &'static str,
    pub pattern: &'static str,
}

/// Tenant-naming rules, in priority order. The first capture group is the tenant ID.
pub const TENANT_NAME_RULES: &[TenantNameRule] = &[
    TenantNameRule { name: "tenant-prefix", pattern: r"^tenant-(.+)$" },
    TenantNameRule { name: "tenant-suffix", pattern: r"^(.+)-tenant$" },
    TenantNameRule { name: "limits-suffix", pattern: r"^(.+)-limits$" },
    TenantNameRule { name: "overrides-suffix", pattern: r"^(.+)-overrides$" },
    TenantNameRule { name: "user-prefix", pattern: r"^user-(.+)$" },
    TenantNameRule { name: "org-prefix", pattern: r"^org-(.+)$" },
];

static COMPILED_TENANT_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    TENANT_NAME_RULES
        .iter()
        .map(|r| (r.name, Regex::new(r.pattern).expect("valid tenant rule")))
        .collect()
});

/// `X-Scope-OrgID: acme` (YAML) or `"X-Scope-OrgID" = "acme"` (Alloy).
static ORG_ID_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)x-scope-orgid["']?\s*[:=]\s*["']?([^\s"',}\]]+)"#)
        .expect("valid org id regex")
});

/// Whether a configuration key looks like a limit.
pub fn is_limit_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    if LIMIT_KEY_EXCLUSIONS.iter().any(|ex| key.contains(ex)) {
        return false;
    }
    LIMIT_KEY_KEYWORDS.iter().any(|kw| key.contains(kw))
}

/// Whether an object name matches any tenant-naming rule.
pub fn is_tenant_config_name(name: &str) -> bool {
    COMPILED_TENANT_RULES.iter().any(|(_, re)| re.is_match(name))
}

/// Name of the first tenant rule matching `name`.
pub fn matching_tenant_rule(name: &str) -> Option<&'static str> {
    COMPILED_TENANT_RULES
        .iter()
        .find(|(_, re)| re.is_match(name))
        .map(|(rule, _)| *rule)
}

/// Tenant ID from an object name; the full name when no rule matches.
pub fn extract_tenant_id(name: &str) -> String {
    COMPILED_TENANT_RULES
        .iter()
        .find_map(|(_, re)| re.captures(name))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn is_system_namespace(namespace: &str) -> bool {
    SYSTEM_NAMESPACES.contains(&namespace)
}

pub fn is_monitoring_agent_config(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    MONITORING_AGENT_RULES.iter().any(|rule| name.contains(rule))
}

/// Tenant IDs sent via the `X-Scope-OrgID` header in agent configuration text.
pub fn extract_org_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in ORG_ID_HEADER.captures_iter(text) {
        let id = caps[1].trim_matches(|c| c == '"' || c == '\'').to_string();
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Whether a data key names a structured document.
pub fn is_structured_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.ends_with(".yaml") || key.ends_with(".yml")
}
