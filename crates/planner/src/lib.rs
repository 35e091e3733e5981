//! Capacity planning for Mimir tenants.
//!
//! [`CapacityPlanner::generate_report`] builds a per-tenant snapshot, trend,
//! forecast, bottleneck and risk assessment, then rolls them up cluster-wide.

pub mod bottleneck;
pub mod forecast;
pub mod planner;
pub mod risk;
pub mod signals;
pub mod summary;
pub mod trend;

pub use planner::{CapacityPlanner, PlannerConfig};
