//! Core types, limit catalog, and collaborator ports for the limits audit engine.

pub mod analysis;
pub mod capacity;
pub mod catalog;
pub mod context;
pub mod error;
pub mod ports;
pub mod tenant;
pub mod value;

pub use analysis::*;
pub use capacity::*;
pub use catalog::{LimitCategory, LimitDefinition, LimitTier};
pub use context::{CallContext, CancellationToken};
pub use error::{Error, Result};
pub use ports::*;
pub use tenant::*;
pub use value::LimitValue;
