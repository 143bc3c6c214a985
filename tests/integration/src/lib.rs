//! Integration test utilities for the clinic auth server
//!
//! Spawns the real router on a local port over in-memory adapters and drives
//! it over HTTP.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
