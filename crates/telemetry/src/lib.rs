//! Structured logging and in-process counters for the limits audit engine.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
