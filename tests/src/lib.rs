//! Shared helpers for the limits audit integration tests.

pub mod fixtures;
pub mod mocks;
