//! Audit configuration.

use std::time::Duration;

use analyzer::{AnalyzerConfig, RecommendationPolicy};
use anyhow::{Context, Result};
use audit_core::UsageWindow;
use discovery::DiscoveryConfig;
use planner::PlannerConfig;
use serde::{Deserialize, Serialize};
use telemetry::TracingConfig;
use validator::Validate;

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuditConfig {
    /// Namespace holding the Mimir deployment
    #[serde(default = "default_namespace")]
    #[validate(length(min = 1))]
    pub namespace: String,

    /// Upper bound on concurrent namespaces, windows or tenants
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1, max = 64))]
    pub max_concurrency: usize,

    /// Deadline for each collaborator call
    #[serde(default = "default_call_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub call_timeout_secs: u64,

    /// Trailing usage windows (`48h`, `7d`, ...)
    #[serde(default = "default_windows")]
    #[validate(length(min = 1))]
    pub windows: Vec<String>,

    #[serde(default)]
    pub policy: RecommendationPolicy,

    #[serde(default)]
    pub tracing: TracingConfig,
}

fn default_namespace() -> String {
    "mimir".to_string()
}

fn default_max_concurrency() -> usize {
    8
}

fn default_call_timeout_secs() -> u64 {
    30
}

fn default_windows() -> Vec<String> {
    analyzer::default_windows()
        .into_iter()
        .map(|w| w.label)
        .collect()
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            max_concurrency: default_max_concurrency(),
            call_timeout_secs: default_call_timeout_secs(),
            windows: default_windows(),
            policy: RecommendationPolicy::default(),
            tracing: TracingConfig::default(),
        }
    }
}

impl AuditConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn usage_windows(&self) -> audit_core::Result<Vec<UsageWindow>> {
        self.windows.iter().map(|w| UsageWindow::parse(w)).collect()
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            max_concurrency: self.max_concurrency,
            call_timeout: self.call_timeout(),
        }
    }

    pub fn analyzer_config(&self) -> audit_core::Result<AnalyzerConfig> {
        Ok(AnalyzerConfig {
            windows: self.usage_windows()?,
            policy: self.policy,
            max_concurrency: self.max_concurrency,
            call_timeout: self.call_timeout(),
        })
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_concurrency: self.max_concurrency,
            call_timeout: self.call_timeout(),
        }
    }

    /// Checks ranges and that every window label parses.
    pub fn check(&self) -> Result<()> {
        self.validate().context("Invalid audit configuration")?;
        self.usage_windows()
            .context("Invalid usage window in audit configuration")?;
        Ok(())
    }
}

/// Load configuration from defaults, `config/default.toml` and `AUDIT__*` variables.
pub fn load_config() -> Result<AuditConfig> {
    dotenvy::dotenv().ok();

    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&AuditConfig::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("AUDIT")
                .prefix_separator("__")
                .list_separator(",")
                .with_list_parse_key("windows")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let config: AuditConfig = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    config.check()?;
    Ok(config)
}
