//! Usage-driven limit recommendations.
//!
//! [`UsageAnalyzer`] resolves a tenant's effective limits, gathers usage over
//! several trailing windows and emits one [`audit_core::Recommendation`] per
//! catalog limit together with tenant-level scores.

pub mod analyzer;
pub mod policy;
pub mod recommend;
pub mod risk;
pub mod scores;
pub mod usage;

pub use analyzer::{default_windows, AnalyzerConfig, UsageAnalyzer};
pub use policy::RecommendationPolicy;
pub use usage::{UsageSample, UsageStats};
