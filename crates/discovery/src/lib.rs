//! Limit discovery for Mimir/Cortex clusters.
//!
//! Reads configuration objects from the cluster and assembles global and
//! per-tenant limits. See [`ConfigDiscoverer::discover_all`].

pub mod discoverer;
pub mod payload;
pub mod rules;

pub use discoverer::{ConfigDiscoverer, DiscoveryConfig};
