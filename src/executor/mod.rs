//! Command execution module
//!
//! Provides the execution orchestrator with:
//! - Concurrent stdout/stderr draining with per-line callbacks
//! - Cooperative cancellation (token and/or timeout)
//! - Environment variable injection
//! - Working directory control

pub mod runner;

pub use runner::*;
